//! Registration, login, one-time codes and profile management.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use promoflow_auth::catalog::names_match;
use promoflow_auth::{
    IssuedToken, OneTimeCode, Principal, TokenIssuer, hash_password, normalize_email, validate_password,
    verify_otp, verify_password,
};
use promoflow_core::{DomainError, DomainResult, RoleId, UserId};
use promoflow_promotions::VENDOR_ROLE;

use super::access::{effective_names, load_principal};
use super::finish;
use crate::store::{CatalogRepository, Store, StoreError, UnitOfWork, UserRecord, UserRepository, constraints};

const INVALID_CREDENTIALS: &str = "invalid credentials";
const EMAIL_TAKEN: &str = "email already registered";
const PHONE_TAKEN: &str = "phone number already registered";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Registration {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role_id: Option<RoleId>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub business_license: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisteredUser {
    pub user_id: UserId,
    pub email: String,
    pub role: Option<String>,
    pub permissions: Vec<String>,
    /// Returned instead of being delivered out of band.
    pub otp: OneTimeCode,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProfileUpdate {
    pub phone_number: Option<String>,
    pub business_license: Option<String>,
}

/// What a user sees about themselves. Never includes secrets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    pub role: Option<String>,
    pub permissions: Vec<String>,
    pub phone_number: Option<String>,
    pub phone_verified: bool,
    pub business_license: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct CredentialService {
    store: Arc<dyn Store>,
    tokens: TokenIssuer,
    default_role_name: String,
    /// Verified against when the email is unknown so both login failures cost the same.
    dummy_hash: Arc<str>,
}

impl CredentialService {
    pub fn new(store: Arc<dyn Store>, tokens: TokenIssuer, default_role_name: String) -> DomainResult<Self> {
        let dummy_hash = hash_password("promoflow-timing-equalizer")?;
        Ok(Self {
            store,
            tokens,
            default_role_name,
            dummy_hash: dummy_hash.into(),
        })
    }

    #[instrument(skip_all)]
    pub async fn register(&self, registration: Registration) -> DomainResult<RegisteredUser> {
        let email = normalize_email(&registration.email)?;
        validate_password(&registration.password)?;
        let phone_number = non_blank(registration.phone_number);
        let business_license = non_blank(registration.business_license);
        let password_hash = hash_blocking(registration.password).await?;

        let mut uow = self.store.begin().await?;
        let result = async {
            if uow.find_user_by_email(&email).await?.is_some() {
                return Err(DomainError::conflict(EMAIL_TAKEN));
            }
            if let Some(phone) = &phone_number {
                if uow.find_user_by_phone(phone).await?.is_some() {
                    return Err(DomainError::conflict(PHONE_TAKEN));
                }
            }

            let role = match registration.role_id {
                Some(role_id) => Some(
                    uow.find_role(role_id)
                        .await?
                        .ok_or_else(|| DomainError::not_found("role not found"))?,
                ),
                None => {
                    let fallback = uow.find_role_by_name_ci(&self.default_role_name).await?;
                    if fallback.is_none() {
                        tracing::warn!(role = %self.default_role_name, "default role missing, registering without a role");
                    }
                    fallback
                }
            };
            if role.as_ref().is_some_and(|r| names_match(&r.name, VENDOR_ROLE))
                && (business_license.is_none() || phone_number.is_none())
            {
                return Err(DomainError::validation(
                    "vendors must provide a business license and a phone number",
                ));
            }

            let now = Utc::now();
            let otp = OneTimeCode::generate(now);
            let user = UserRecord {
                id: UserId::new(),
                email: email.clone(),
                password_hash,
                role_id: role.as_ref().map(|r| r.id),
                phone_number: phone_number.clone(),
                phone_verified: false,
                business_license: business_license.clone(),
                otp_code: Some(otp.code.clone()),
                otp_expiry: Some(otp.expires_at),
                created_at: now,
                updated_at: now,
            };
            uow.insert_user(&user).await.map_err(user_conflict)?;

            let principal = load_principal(uow.as_mut(), &user).await?;
            tracing::info!(user_id = %user.id, role = ?principal.role_name(), "user registered");
            Ok(RegisteredUser {
                user_id: user.id,
                email: user.email,
                role: principal.role_name().map(str::to_string),
                permissions: effective_names(&principal),
                otp,
            })
        }
        .await;
        finish(uow, result, "register").await
    }

    /// Unknown email and wrong password fail identically.
    #[instrument(skip_all)]
    pub async fn login(&self, credentials: LoginCredentials) -> DomainResult<IssuedToken> {
        let user = match normalize_email(&credentials.email) {
            Ok(email) => {
                let mut uow = self.store.begin().await?;
                let result = async { Ok::<_, DomainError>(uow.find_user_by_email(&email).await?) }.await;
                finish(uow, result, "login").await?
            }
            Err(_) => None,
        };

        let encoded = match &user {
            Some(user) => user.password_hash.clone(),
            None => self.dummy_hash.to_string(),
        };
        let matches = verify_blocking(credentials.password, encoded).await?;

        match user {
            Some(user) if matches => {
                tracing::info!(user_id = %user.id, "login succeeded");
                Ok(self.tokens.issue(user.id, &user.email, Utc::now())?)
            }
            _ => {
                tracing::info!("login refused");
                Err(DomainError::unauthorized(INVALID_CREDENTIALS))
            }
        }
    }

    /// Issue a fresh code, replacing any pending one.
    #[instrument(skip_all)]
    pub async fn forgot_password(&self, email: &str) -> DomainResult<OneTimeCode> {
        let email = normalize_email(email)?;
        let mut uow = self.store.begin().await?;
        let result = async {
            let mut user = find_by_email(uow.as_mut(), &email).await?;
            let now = Utc::now();
            let otp = OneTimeCode::generate(now);
            user.otp_code = Some(otp.code.clone());
            user.otp_expiry = Some(otp.expires_at);
            user.updated_at = now;
            uow.update_user(&user).await?;
            Ok::<_, DomainError>(otp)
        }
        .await;
        finish(uow, result, "forgot_password").await
    }

    /// Check a code without consuming it.
    #[instrument(skip_all)]
    pub async fn verify_otp(&self, email: &str, code: &str) -> DomainResult<()> {
        let email = normalize_email(email)?;
        let mut uow = self.store.begin().await?;
        let result = async {
            let user = find_by_email(uow.as_mut(), &email).await?;
            verify_otp(user.otp_code.as_deref(), user.otp_expiry, code, Utc::now())?;
            Ok::<_, DomainError>(())
        }
        .await;
        finish(uow, result, "verify_otp").await
    }

    /// Set a new password and clear any pending code.
    #[instrument(skip_all)]
    pub async fn reset_password(&self, email: &str, new_password: &str) -> DomainResult<()> {
        let email = normalize_email(email)?;
        validate_password(new_password)?;
        let password_hash = hash_blocking(new_password.to_string()).await?;

        let mut uow = self.store.begin().await?;
        let result = async {
            let mut user = find_by_email(uow.as_mut(), &email).await?;
            user.password_hash = password_hash;
            user.otp_code = None;
            user.otp_expiry = None;
            user.updated_at = Utc::now();
            uow.update_user(&user).await?;
            tracing::info!(user_id = %user.id, "password reset");
            Ok::<_, DomainError>(())
        }
        .await;
        finish(uow, result, "reset_password").await
    }

    pub async fn get_profile(&self, principal: &Principal) -> DomainResult<UserProfile> {
        let mut uow = self.store.begin().await?;
        let result = async {
            let user = find_by_id(uow.as_mut(), principal.user_id).await?;
            profile(uow.as_mut(), &user).await
        }
        .await;
        finish(uow, result, "get_profile").await
    }

    /// Changing the phone number resets its verification flag.
    #[instrument(skip_all, fields(user_id = %principal.user_id))]
    pub async fn update_profile(&self, principal: &Principal, update: ProfileUpdate) -> DomainResult<UserProfile> {
        let phone_number = non_blank(update.phone_number);
        let business_license = non_blank(update.business_license);

        let mut uow = self.store.begin().await?;
        let result = async {
            let mut user = find_by_id(uow.as_mut(), principal.user_id).await?;
            if let Some(phone) = phone_number {
                if user.phone_number.as_deref() != Some(phone.as_str()) {
                    if let Some(other) = uow.find_user_by_phone(&phone).await? {
                        if other.id != user.id {
                            return Err(DomainError::conflict(PHONE_TAKEN));
                        }
                    }
                    user.phone_number = Some(phone);
                    user.phone_verified = false;
                }
            }
            if let Some(license) = business_license {
                user.business_license = Some(license);
            }
            user.updated_at = Utc::now();
            uow.update_user(&user).await.map_err(user_conflict)?;
            profile(uow.as_mut(), &user).await
        }
        .await;
        finish(uow, result, "update_profile").await
    }

    /// Hard delete of the caller's account and everything it owns.
    #[instrument(skip_all, fields(user_id = %principal.user_id))]
    pub async fn delete_profile(&self, principal: &Principal) -> DomainResult<()> {
        let mut uow = self.store.begin().await?;
        let result = async {
            if !uow.delete_user(principal.user_id).await? {
                return Err(DomainError::not_found("user not found"));
            }
            tracing::info!(user_id = %principal.user_id, "user deleted");
            Ok(())
        }
        .await;
        finish(uow, result, "delete_profile").await
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn user_conflict(err: StoreError) -> DomainError {
    if err.is_unique_violation(constraints::USER_EMAIL) {
        DomainError::conflict(EMAIL_TAKEN)
    } else if err.is_unique_violation(constraints::USER_PHONE) {
        DomainError::conflict(PHONE_TAKEN)
    } else {
        err.into()
    }
}

async fn find_by_email(uow: &mut dyn UnitOfWork, email: &str) -> DomainResult<UserRecord> {
    uow.find_user_by_email(email)
        .await?
        .ok_or_else(|| DomainError::not_found("user not found"))
}

async fn find_by_id(uow: &mut dyn UnitOfWork, id: UserId) -> DomainResult<UserRecord> {
    uow.find_user(id)
        .await?
        .ok_or_else(|| DomainError::not_found("user not found"))
}

async fn profile(uow: &mut dyn UnitOfWork, user: &UserRecord) -> DomainResult<UserProfile> {
    let principal = load_principal(uow, user).await?;
    Ok(UserProfile {
        id: user.id,
        email: user.email.clone(),
        role: principal.role_name().map(str::to_string),
        permissions: effective_names(&principal),
        phone_number: user.phone_number.clone(),
        phone_verified: user.phone_verified,
        business_license: user.business_license.clone(),
        created_at: user.created_at,
        updated_at: user.updated_at,
    })
}

async fn hash_blocking(plain: String) -> DomainResult<String> {
    tokio::task::spawn_blocking(move || hash_password(&plain))
        .await
        .map_err(|e| DomainError::internal(format!("hashing task failed: {e}")))?
        .map_err(DomainError::from)
}

async fn verify_blocking(plain: String, encoded: String) -> DomainResult<bool> {
    tokio::task::spawn_blocking(move || verify_password(&plain, &encoded))
        .await
        .map_err(|e| DomainError::internal(format!("verification task failed: {e}")))?
        .map_err(DomainError::from)
}
