use serde::Serialize;
use thiserror::Error;

use promoflow_core::{Diagnostics, DomainError};

use crate::catalog::{Module, Permission};
use crate::principal::Principal;

/// Which grant satisfied an authorization check.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GrantSource {
    Direct,
    Role,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("permission '{permission}' in module '{module}' is not granted")]
    Forbidden {
        module: String,
        permission: String,
        /// Names granted by the caller's role (empty without a role).
        role_permissions: Vec<String>,
    },
}

impl From<AuthzError> for DomainError {
    fn from(err: AuthzError) -> Self {
        let message = err.to_string();
        match err {
            AuthzError::Forbidden { role_permissions, .. } => {
                DomainError::forbidden_with(message, Diagnostics::RolePermissions(role_permissions))
            }
        }
    }
}

/// Decide whether `principal` holds `required` (already resolved in the catalog).
///
/// - No IO
/// - No panics
/// - Never grants on missing data: only an exact permission id match counts
///
/// Direct grants are checked first, so a permission held both ways reports
/// [`GrantSource::Direct`].
pub fn authorize(
    principal: &Principal,
    module: &Module,
    required: &Permission,
) -> Result<GrantSource, AuthzError> {
    if principal.has_direct(required.id) {
        return Ok(GrantSource::Direct);
    }
    if principal.has_via_role(required.id) {
        return Ok(GrantSource::Role);
    }
    Err(AuthzError::Forbidden {
        module: module.name.clone(),
        permission: required.name.clone(),
        role_permissions: principal.role_permission_names(),
    })
}
