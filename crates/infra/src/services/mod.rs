//! Application services.
//!
//! Each public operation opens one unit of work, runs domain logic against it
//! and hands the outcome to [`finish`], which commits on success and rolls
//! back on any error.

pub mod access;
pub mod bootstrap;
pub mod catalog;
pub mod credentials;
pub mod promotions;

use std::sync::Arc;

use chrono::Duration;

use promoflow_auth::TokenIssuer;
use promoflow_core::{DomainResult, ErrorKind};

use crate::store::{Store, UnitOfWork};

pub use access::AccessService;
pub use bootstrap::{gates, seed_default_roles};
pub use catalog::CatalogService;
pub use credentials::{CredentialService, LoginCredentials, ProfileUpdate, RegisteredUser, Registration, UserProfile};
pub use promotions::{PromotionService, SaveReceipt};

/// Settings the services need from the process configuration.
#[derive(Debug, Clone)]
pub struct ServicesConfig {
    pub jwt_secret: String,
    pub token_ttl: Duration,
    /// Role assigned at registration when the caller names none.
    pub default_role_name: String,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "dev-secret".to_string(),
            token_ttl: Duration::minutes(60),
            default_role_name: "customer".to_string(),
        }
    }
}

/// All services over one shared store.
#[derive(Clone)]
pub struct Services {
    pub catalog: CatalogService,
    pub access: AccessService,
    pub promotions: PromotionService,
    pub credentials: CredentialService,
}

impl Services {
    pub fn new(store: Arc<dyn Store>, config: &ServicesConfig) -> DomainResult<Self> {
        let tokens = TokenIssuer::new(config.jwt_secret.as_bytes(), config.token_ttl);
        Ok(Self {
            catalog: CatalogService::new(store.clone()),
            access: AccessService::new(store.clone(), tokens.clone()),
            promotions: PromotionService::new(store.clone()),
            credentials: CredentialService::new(store, tokens, config.default_role_name.clone())?,
        })
    }
}

/// Commit on `Ok`, roll back on `Err`. Exactly one of the two happens.
pub(crate) async fn finish<T>(
    uow: Box<dyn UnitOfWork>,
    result: DomainResult<T>,
    operation: &'static str,
) -> DomainResult<T> {
    match result {
        Ok(value) => {
            uow.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback) = uow.rollback().await {
                tracing::error!(operation, error = %rollback, "rollback failed");
            }
            match err.kind() {
                ErrorKind::Internal => tracing::error!(operation, error = %err, "operation failed"),
                kind => tracing::warn!(operation, kind = kind.as_str(), message = err.message(), "operation refused"),
            }
            Err(err)
        }
    }
}
