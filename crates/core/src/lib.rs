//! `promoflow-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the shared error taxonomy and the aggregate/event contracts.

pub mod aggregate;
pub mod error;
pub mod event;
pub mod id;

pub use aggregate::{Aggregate, AggregateRoot};
pub use error::{Diagnostics, DomainError, DomainResult, ErrorKind};
pub use event::Event;
pub use id::{ModuleId, PermissionId, PromotionId, RoleId, UserId};
