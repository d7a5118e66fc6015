use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// A (module, permission) precondition attached to a protected operation.
///
/// Names are matched case-insensitively against the catalog at check time, so
/// gates can be declared as constants and stay valid as the catalog grows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionGate {
    module: Cow<'static, str>,
    permission: Cow<'static, str>,
}

impl PermissionGate {
    pub const fn new(module: &'static str, permission: &'static str) -> Self {
        Self {
            module: Cow::Borrowed(module),
            permission: Cow::Borrowed(permission),
        }
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn permission(&self) -> &str {
        &self.permission
    }
}

impl core::fmt::Display for PermissionGate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{}", self.module, self.permission)
    }
}
