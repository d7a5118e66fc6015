//! Relational store abstractions.
//!
//! One request runs inside one [`UnitOfWork`]: a store transaction exposing the
//! typed repositories. It is committed or rolled back exactly once; dropping it
//! without committing rolls back.

pub mod in_memory;
pub mod postgres;
pub mod repository;

pub use in_memory::InMemoryStore;
pub use postgres::PgStore;
pub use repository::{
    CatalogRepository, PromotionRepository, SavedPromotion, Store, UnitOfWork, UserRecord, UserRepository,
};

use thiserror::Error;

use promoflow_core::DomainError;

/// Unique constraint names shared by every store implementation.
pub mod constraints {
    pub const USER_EMAIL: &str = "users_email_key";
    pub const USER_PHONE: &str = "users_phone_number_key";
    pub const ROLE_NAME: &str = "roles_name_lower_key";
    pub const PROMO_CODE: &str = "promotions_promo_code_key";
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint rejected a write (constraint name attached).
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("database error in {operation}: {source}")]
    Database {
        operation: &'static str,
        #[source]
        source: sqlx::Error,
    },

    /// A stored row could not be mapped back to a domain value.
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn is_unique_violation(&self, constraint: &str) -> bool {
        matches!(self, StoreError::UniqueViolation(c) if c == constraint)
    }
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        tracing::error!(error = %err, "store operation failed");
        DomainError::internal("storage failure")
    }
}

/// Map a unique violation on `constraint` to a Conflict; anything else stays Internal.
pub fn conflict_on(err: StoreError, constraint: &str, message: &str) -> DomainError {
    if err.is_unique_violation(constraint) {
        DomainError::conflict(message)
    } else {
        err.into()
    }
}
