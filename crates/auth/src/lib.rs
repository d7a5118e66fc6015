//! `promoflow-auth`: pure authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: it knows how to
//! decide, hash, sign and verify, but never where the data lives.

pub mod authorize;
pub mod catalog;
pub mod claims;
pub mod credentials;
pub mod gate;
pub mod otp;
pub mod principal;
pub mod token;

pub use authorize::{AuthzError, GrantSource, authorize};
pub use catalog::{Module, ModuleGrant, Permission, Role, RoleView};
pub use claims::{SessionClaims, TokenValidationError, validate_claims};
pub use credentials::{CredentialError, hash_password, normalize_email, validate_password, verify_password};
pub use gate::PermissionGate;
pub use otp::{OneTimeCode, OtpError, verify_otp};
pub use principal::{GrantedPermission, Principal, RoleGrant};
pub use token::{IssuedToken, TokenError, TokenIssuer};
