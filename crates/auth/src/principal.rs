use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use promoflow_core::{PermissionId, RoleId, UserId};

/// A permission as seen from a grant: identity plus its module and action names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GrantedPermission {
    pub id: PermissionId,
    pub module: String,
    pub name: String,
}

/// The role a principal holds, with the role's permissions loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleGrant {
    pub id: RoleId,
    pub name: String,
    pub permissions: Vec<GrantedPermission>,
}

/// A fully resolved principal for authorization decisions.
///
/// Built from storage once per request; every grant is loaded eagerly so the
/// decision functions stay pure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: UserId,
    pub email: String,
    pub role: Option<RoleGrant>,
    pub direct_permissions: Vec<GrantedPermission>,
}

impl Principal {
    pub fn role_name(&self) -> Option<&str> {
        self.role.as_ref().map(|r| r.name.as_str())
    }

    pub fn role_permissions(&self) -> &[GrantedPermission] {
        self.role.as_ref().map(|r| r.permissions.as_slice()).unwrap_or(&[])
    }

    /// Sorted, deduplicated names of the role's permissions.
    pub fn role_permission_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.role_permissions().iter().map(|p| p.name.clone()).collect();
        names.sort();
        names.dedup();
        names
    }

    pub fn has_direct(&self, id: PermissionId) -> bool {
        self.direct_permissions.iter().any(|p| p.id == id)
    }

    pub fn has_via_role(&self, id: PermissionId) -> bool {
        self.role_permissions().iter().any(|p| p.id == id)
    }

    /// Role grants ∪ direct grants, deduplicated by permission identity.
    ///
    /// Ordered by (module, name) so the result does not depend on grant order.
    pub fn effective_permissions(&self) -> Vec<GrantedPermission> {
        let mut by_id: BTreeMap<PermissionId, &GrantedPermission> = BTreeMap::new();
        for p in self.role_permissions().iter().chain(self.direct_permissions.iter()) {
            by_id.entry(p.id).or_insert(p);
        }
        let mut out: Vec<GrantedPermission> = by_id.into_values().cloned().collect();
        out.sort_by(|a, b| (a.module.as_str(), a.name.as_str(), a.id).cmp(&(b.module.as_str(), b.name.as_str(), b.id)));
        out
    }

    pub fn effective_permission_names(&self) -> Vec<String> {
        self.effective_permissions().into_iter().map(|p| p.name).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use proptest::prelude::*;

    use super::*;

    fn perm(module: &str, name: &str) -> GrantedPermission {
        GrantedPermission {
            id: PermissionId::new(),
            module: module.to_string(),
            name: name.to_string(),
        }
    }

    fn principal(role: Option<Vec<GrantedPermission>>, direct: Vec<GrantedPermission>) -> Principal {
        Principal {
            user_id: UserId::new(),
            email: "someone@example.com".to_string(),
            role: role.map(|permissions| RoleGrant {
                id: RoleId::new(),
                name: "Vendor".to_string(),
                permissions,
            }),
            direct_permissions: direct,
        }
    }

    #[test]
    fn principal_without_role_has_no_role_permissions() {
        let direct = perm("promotions", "get_promotion");
        let p = principal(None, vec![direct.clone()]);
        assert!(p.role_permission_names().is_empty());
        assert_eq!(p.effective_permissions(), vec![direct]);
    }

    #[test]
    fn shared_grant_appears_once() {
        let shared = perm("promotions", "create_promotion");
        let p = principal(Some(vec![shared.clone()]), vec![shared.clone()]);
        assert_eq!(p.effective_permissions(), vec![shared]);
    }

    #[test]
    fn same_name_in_two_modules_is_two_permissions() {
        let a = perm("promotions", "view");
        let b = perm("reports", "view");
        let p = principal(Some(vec![a]), vec![b]);
        assert_eq!(p.effective_permission_names(), vec!["view", "view"]);
    }

    fn pool() -> Vec<GrantedPermission> {
        ["a", "b", "c", "d", "e", "f", "g", "h"]
            .iter()
            .enumerate()
            .map(|(i, n)| perm(if i % 2 == 0 { "promotions" } else { "roles" }, n))
            .collect()
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 256, .. ProptestConfig::default() })]

        #[test]
        fn effective_set_is_union_of_role_and_direct(
            role_idx in proptest::collection::vec(0usize..8, 0..12),
            direct_idx in proptest::collection::vec(0usize..8, 0..12),
            has_role in any::<bool>(),
        ) {
            let pool = pool();
            let role_perms: Vec<_> = role_idx.iter().map(|i| pool[*i].clone()).collect();
            let direct_perms: Vec<_> = direct_idx.iter().map(|i| pool[*i].clone()).collect();

            let p = principal(has_role.then(|| role_perms.clone()), direct_perms.clone());
            let effective = p.effective_permissions();

            let got: BTreeSet<PermissionId> = effective.iter().map(|g| g.id).collect();
            prop_assert_eq!(got.len(), effective.len(), "no duplicates");

            let mut expected: BTreeSet<PermissionId> = direct_perms.iter().map(|g| g.id).collect();
            if has_role {
                expected.extend(role_perms.iter().map(|g| g.id));
            }
            prop_assert_eq!(got, expected);
        }

        #[test]
        fn effective_set_ignores_grant_order(
            role_idx in proptest::collection::vec(0usize..8, 0..12),
            direct_idx in proptest::collection::vec(0usize..8, 0..12),
        ) {
            let pool = pool();
            let role_perms: Vec<_> = role_idx.iter().map(|i| pool[*i].clone()).collect();
            let direct_perms: Vec<_> = direct_idx.iter().map(|i| pool[*i].clone()).collect();

            let forward = principal(Some(role_perms.clone()), direct_perms.clone());

            let mut role_rev = role_perms;
            role_rev.reverse();
            let mut direct_rev = direct_perms;
            direct_rev.reverse();
            let backward = principal(Some(role_rev), direct_rev);

            prop_assert_eq!(forward.effective_permissions(), backward.effective_permissions());
        }
    }
}
