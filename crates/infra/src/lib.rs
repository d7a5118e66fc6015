//! Infrastructure layer: relational store adapters and the application services
//! that run domain logic inside store transactions.

pub mod services;
pub mod store;

pub use services::{
    AccessService, CatalogService, CredentialService, LoginCredentials, ProfileUpdate, PromotionService, Registration,
    SaveReceipt, Services, ServicesConfig, gates, seed_default_roles,
};
pub use store::{InMemoryStore, PgStore, Store, StoreError, UnitOfWork};
