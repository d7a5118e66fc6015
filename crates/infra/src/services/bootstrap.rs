//! Route gates and the roles seeded on first start.

use promoflow_auth::ModuleGrant;
use promoflow_core::DomainResult;
use promoflow_promotions::{ADMIN_ROLE, VENDOR_ROLE};

use super::CatalogService;

pub const CUSTOMER_ROLE: &str = "customer";

/// Gates checked in front of protected routes.
pub mod gates {
    use promoflow_auth::PermissionGate;

    pub const PROMOTIONS: &str = "promotions";
    pub const ROLES: &str = "roles";

    pub const CREATE_PROMOTION: PermissionGate = PermissionGate::new(PROMOTIONS, "create_promotion");
    pub const GET_PROMOTION: PermissionGate = PermissionGate::new(PROMOTIONS, "get_promotion");
    pub const UPDATE_PROMOTION: PermissionGate = PermissionGate::new(PROMOTIONS, "update_promotion");
    pub const DELETE_PROMOTION: PermissionGate = PermissionGate::new(PROMOTIONS, "delete_promotion");
    pub const TOGGLE_PROMOTION: PermissionGate = PermissionGate::new(PROMOTIONS, "toggle_promotion");
    pub const SUBMIT_PROMOTION: PermissionGate = PermissionGate::new(PROMOTIONS, "submit_promotion");
    pub const APPROVE_PROMOTION: PermissionGate = PermissionGate::new(PROMOTIONS, "approve_promotion");
    pub const REJECT_PROMOTION: PermissionGate = PermissionGate::new(PROMOTIONS, "reject_promotion");
    pub const MANAGE_ROLES: PermissionGate = PermissionGate::new(ROLES, "manage_roles");
}

fn default_roles() -> Vec<(&'static str, Vec<ModuleGrant>)> {
    vec![
        (
            ADMIN_ROLE,
            vec![
                ModuleGrant::new(
                    gates::PROMOTIONS,
                    ["get_promotion", "approve_promotion", "reject_promotion"],
                ),
                ModuleGrant::new(gates::ROLES, ["manage_roles"]),
            ],
        ),
        (
            VENDOR_ROLE,
            vec![ModuleGrant::new(
                gates::PROMOTIONS,
                [
                    "create_promotion",
                    "get_promotion",
                    "update_promotion",
                    "delete_promotion",
                    "toggle_promotion",
                    "submit_promotion",
                ],
            )],
        ),
        (
            CUSTOMER_ROLE,
            vec![ModuleGrant::new(gates::PROMOTIONS, ["get_promotion"])],
        ),
    ]
}

/// Create the admin, vendor and customer roles when they do not exist yet.
///
/// Existing roles are left untouched, so edits made through the API survive restarts.
pub async fn seed_default_roles(catalog: &CatalogService) -> DomainResult<()> {
    for (name, grants) in default_roles() {
        if catalog.ensure_role(name, &grants).await? {
            tracing::info!(role = name, "seeded default role");
        }
    }
    Ok(())
}
