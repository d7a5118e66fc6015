//! Identity resolution and permission checks.
//!
//! Nothing is cached: every check re-reads the caller's grants inside its own
//! unit of work, so a revoked grant is refused on the very next request.

use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use promoflow_auth::{GrantSource, GrantedPermission, PermissionGate, Principal, RoleGrant, TokenIssuer, authorize};
use promoflow_core::{Diagnostics, DomainError, DomainResult, UserId};

use super::finish;
use crate::store::{CatalogRepository, Store, UnitOfWork, UserRecord, UserRepository};

#[derive(Clone)]
pub struct AccessService {
    store: Arc<dyn Store>,
    tokens: TokenIssuer,
}

impl AccessService {
    pub fn new(store: Arc<dyn Store>, tokens: TokenIssuer) -> Self {
        Self { store, tokens }
    }

    /// Bearer token → fully loaded principal.
    #[instrument(skip_all)]
    pub async fn resolve_identity(&self, bearer: Option<&str>) -> DomainResult<Principal> {
        let token = bearer
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| DomainError::unauthorized("missing bearer token"))?;
        let claims = self.tokens.verify(token, Utc::now())?;

        let mut uow = self.store.begin().await?;
        let result = async {
            let user = uow
                .find_user(claims.uid)
                .await?
                .ok_or_else(|| DomainError::not_found("user not found"))?;
            load_principal(uow.as_mut(), &user).await
        }
        .await;
        finish(uow, result, "resolve_identity").await
    }

    /// Decide `module.permission` for `principal` against the current grants.
    #[instrument(skip(self, principal), fields(user_id = %principal.user_id))]
    pub async fn has_permission(
        &self,
        principal: &Principal,
        module: &str,
        permission: &str,
    ) -> DomainResult<GrantSource> {
        let mut uow = self.store.begin().await?;
        let result = check_in(uow.as_mut(), principal.user_id, module, permission).await;
        finish(uow, result, "has_permission").await
    }

    /// Run a route gate for `principal`.
    pub async fn check(&self, gate: &PermissionGate, principal: &Principal) -> DomainResult<GrantSource> {
        self.has_permission(principal, gate.module(), gate.permission()).await
    }

    /// Sorted names of role ∪ direct grants, read fresh from the store.
    pub async fn effective_permissions(&self, principal: &Principal) -> DomainResult<Vec<String>> {
        let mut uow = self.store.begin().await?;
        let result = async {
            let fresh = reload(uow.as_mut(), principal.user_id).await?;
            Ok::<_, DomainError>(effective_names(&fresh))
        }
        .await;
        finish(uow, result, "effective_permissions").await
    }
}

/// Names of the effective grant set, sorted and deduplicated.
pub(crate) fn effective_names(principal: &Principal) -> Vec<String> {
    let mut names = principal.effective_permission_names();
    names.sort();
    names.dedup();
    names
}

/// Build a principal with role and direct grants loaded eagerly.
pub(crate) async fn load_principal(uow: &mut dyn UnitOfWork, user: &UserRecord) -> DomainResult<Principal> {
    let role = match user.role_id {
        Some(role_id) => match uow.find_role(role_id).await? {
            Some(role) => Some(RoleGrant {
                id: role.id,
                permissions: uow.role_permissions(role.id).await?,
                name: role.name,
            }),
            None => None,
        },
        None => None,
    };
    let direct_permissions: Vec<GrantedPermission> = uow.user_permissions(user.id).await?;

    Ok(Principal {
        user_id: user.id,
        email: user.email.clone(),
        role,
        direct_permissions,
    })
}

async fn reload(uow: &mut dyn UnitOfWork, user_id: UserId) -> DomainResult<Principal> {
    let user = uow
        .find_user(user_id)
        .await?
        .ok_or_else(|| DomainError::not_found("user not found"))?;
    load_principal(uow, &user).await
}

async fn check_in(
    uow: &mut dyn UnitOfWork,
    user_id: UserId,
    module_name: &str,
    permission_name: &str,
) -> DomainResult<GrantSource> {
    let module = uow
        .find_module_ci(module_name.trim())
        .await?
        .ok_or_else(|| DomainError::not_found(format!("module '{}' not found", module_name.trim())))?;

    let Some(permission) = uow.find_permission_ci(module.id, permission_name.trim()).await? else {
        let mut available: Vec<String> = uow
            .list_module_permissions(module.id)
            .await?
            .into_iter()
            .map(|p| p.name)
            .collect();
        available.sort();
        return Err(DomainError::not_found_with(
            format!(
                "permission '{}' not found in module '{}'",
                permission_name.trim(),
                module.name
            ),
            Diagnostics::AvailablePermissions(available),
        ));
    };

    let principal = reload(uow, user_id).await?;
    let source = authorize(&principal, &module, &permission)?;
    tracing::debug!(
        user_id = %user_id,
        module = %module.name,
        permission = %permission.name,
        source = ?source,
        "permission granted"
    );
    Ok(source)
}
