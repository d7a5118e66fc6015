//! Permission catalog entities: modules, permissions and roles.
//!
//! Rows are created lazily by the catalog service. This module only holds the
//! shapes and the name rules shared by every store.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use promoflow_core::{DomainError, DomainResult, ModuleId, PermissionId, RoleId};

use crate::principal::GrantedPermission;

/// A named namespace for permissions (e.g. "promotions").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub id: ModuleId,
    pub name: String,
}

/// A named action scoped to exactly one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: PermissionId,
    pub module_id: ModuleId,
    pub name: String,
}

/// A named bundle of permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request-side grant: a module name and the permission names under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleGrant {
    pub module: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl ModuleGrant {
    pub fn new<I, S>(module: impl Into<String>, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            module: module.into(),
            permissions: permissions.into_iter().map(Into::into).collect(),
        }
    }
}

/// Read-side view of a role with its grants grouped by module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleView {
    pub id: RoleId,
    pub name: String,
    pub modules: Vec<ModuleGrant>,
}

impl RoleView {
    pub fn new(role: &Role, permissions: &[GrantedPermission]) -> Self {
        Self {
            id: role.id,
            name: role.name.clone(),
            modules: group_by_module(permissions),
        }
    }
}

/// Case-insensitive name comparison used for role and catalog lookups.
pub fn names_match(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// Trim a catalog name and reject empty input.
pub fn normalize_name(what: &str, raw: &str) -> DomainResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(DomainError::validation(format!("{what} name must not be empty")));
    }
    Ok(name.to_string())
}

/// Normalize every module and permission name of a grant list.
///
/// Repeated module entries are merged and repeated permission names collapse.
pub fn normalize_grants(grants: &[ModuleGrant]) -> DomainResult<Vec<ModuleGrant>> {
    let mut merged: Vec<ModuleGrant> = Vec::new();
    for grant in grants {
        let module = normalize_name("module", &grant.module)?;
        let idx = match merged.iter().position(|g| g.module == module) {
            Some(idx) => idx,
            None => {
                merged.push(ModuleGrant {
                    module,
                    permissions: Vec::new(),
                });
                merged.len() - 1
            }
        };
        for raw in &grant.permissions {
            let name = normalize_name("permission", raw)?;
            if !merged[idx].permissions.contains(&name) {
                merged[idx].permissions.push(name);
            }
        }
    }
    Ok(merged)
}

/// Group granted permissions by module name (both levels sorted).
pub fn group_by_module(permissions: &[GrantedPermission]) -> Vec<ModuleGrant> {
    let mut grouped: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for p in permissions {
        grouped.entry(p.module.as_str()).or_default().push(p.name.clone());
    }
    grouped
        .into_iter()
        .map(|(module, mut names)| {
            names.sort();
            names.dedup();
            ModuleGrant {
                module: module.to_string(),
                permissions: names,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn granted(module: &str, name: &str) -> GrantedPermission {
        GrantedPermission {
            id: PermissionId::new(),
            module: module.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn names_match_ignores_case_and_padding() {
        assert!(names_match("Vendor", " vendor"));
        assert!(!names_match("vendor", "vendors"));
    }

    #[test]
    fn normalize_name_rejects_blank() {
        let err = normalize_name("role", "   ").unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("role name")));
    }

    #[test]
    fn normalize_grants_merges_duplicates() {
        let grants = vec![
            ModuleGrant::new("promotions", ["create_promotion", " create_promotion"]),
            ModuleGrant::new(" promotions ", ["submit_promotion"]),
        ];
        let merged = normalize_grants(&grants).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].permissions, vec!["create_promotion", "submit_promotion"]);
    }

    #[test]
    fn normalize_grants_rejects_blank_permission() {
        let grants = vec![ModuleGrant::new("promotions", [""])];
        assert!(normalize_grants(&grants).is_err());
    }

    #[test]
    fn group_by_module_sorts_both_levels() {
        let perms = vec![
            granted("promotions", "submit_promotion"),
            granted("roles", "manage_roles"),
            granted("promotions", "create_promotion"),
        ];
        let grouped = group_by_module(&perms);
        assert_eq!(grouped[0].module, "promotions");
        assert_eq!(grouped[0].permissions, vec!["create_promotion", "submit_promotion"]);
        assert_eq!(grouped[1].module, "roles");
    }
}
