//! Permission catalog: modules, permissions, roles and grant replacement.

use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use promoflow_auth::catalog::{group_by_module, normalize_grants, normalize_name};
use promoflow_auth::{Module, ModuleGrant, Permission, Role, RoleView};
use promoflow_core::{DomainError, DomainResult, ModuleId, PermissionId, RoleId, UserId};

use super::finish;
use crate::store::{CatalogRepository, Store, UnitOfWork, UserRepository, conflict_on, constraints};

pub const DEFAULT_ROLE_OFFSET: u32 = 0;
pub const DEFAULT_ROLE_LIMIT: u32 = 100;

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn Store>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn find_or_create_module(&self, name: &str) -> DomainResult<Module> {
        let mut uow = self.store.begin().await?;
        let result = async {
            let name = normalize_name("module", name)?;
            Ok::<_, DomainError>(uow.upsert_module(&name).await?)
        }
        .await;
        finish(uow, result, "find_or_create_module").await
    }

    pub async fn find_or_create_permission(&self, name: &str, module_id: ModuleId) -> DomainResult<Permission> {
        let mut uow = self.store.begin().await?;
        let result = async {
            let name = normalize_name("permission", name)?;
            Ok::<_, DomainError>(uow.upsert_permission(module_id, &name).await?)
        }
        .await;
        finish(uow, result, "find_or_create_permission").await
    }

    #[instrument(skip(self, grants), fields(role = %name))]
    pub async fn create_role(&self, name: &str, grants: &[ModuleGrant]) -> DomainResult<RoleView> {
        let mut uow = self.store.begin().await?;
        let result = create_role_in(uow.as_mut(), name, grants).await;
        finish(uow, result, "create_role").await
    }

    pub async fn list_roles(&self, offset: Option<u32>, limit: Option<u32>) -> DomainResult<Vec<RoleView>> {
        let mut uow = self.store.begin().await?;
        let result = async {
            let roles = uow
                .list_roles(
                    offset.unwrap_or(DEFAULT_ROLE_OFFSET),
                    limit.unwrap_or(DEFAULT_ROLE_LIMIT),
                )
                .await?;
            let mut views = Vec::with_capacity(roles.len());
            for role in &roles {
                let permissions = uow.role_permissions(role.id).await?;
                views.push(RoleView::new(role, &permissions));
            }
            Ok::<_, DomainError>(views)
        }
        .await;
        finish(uow, result, "list_roles").await
    }

    pub async fn get_role(&self, id: RoleId) -> DomainResult<RoleView> {
        let mut uow = self.store.begin().await?;
        let result = async {
            let role = load_role(uow.as_mut(), id).await?;
            role_view(uow.as_mut(), &role).await
        }
        .await;
        finish(uow, result, "get_role").await
    }

    /// Rename and/or replace the permission set. `None` leaves that part alone.
    #[instrument(skip(self, name, grants))]
    pub async fn update_role(
        &self,
        id: RoleId,
        name: Option<&str>,
        grants: Option<&[ModuleGrant]>,
    ) -> DomainResult<RoleView> {
        let mut uow = self.store.begin().await?;
        let result = async {
            let mut role = load_role(uow.as_mut(), id).await?;
            if let Some(raw) = name {
                let name = normalize_name("role", raw)?;
                if let Some(other) = uow.find_role_by_name_ci(&name).await? {
                    if other.id != role.id {
                        return Err(role_exists(&name));
                    }
                }
                role.name = name;
                role.updated_at = Utc::now();
                uow.update_role(&role)
                    .await
                    .map_err(|e| conflict_on(e, constraints::ROLE_NAME, &format!("role '{}' already exists", role.name)))?;
            }
            if let Some(grants) = grants {
                replace_role_grants(uow.as_mut(), role.id, grants).await?;
            }
            role_view(uow.as_mut(), &role).await
        }
        .await;
        finish(uow, result, "update_role").await
    }

    #[instrument(skip(self))]
    pub async fn delete_role(&self, id: RoleId) -> DomainResult<()> {
        let mut uow = self.store.begin().await?;
        let result = async {
            if !uow.delete_role(id).await? {
                return Err(DomainError::not_found("role not found"));
            }
            tracing::info!(role_id = %id, "role deleted");
            Ok(())
        }
        .await;
        finish(uow, result, "delete_role").await
    }

    /// Replace the role's whole permission set, creating catalog rows on demand.
    #[instrument(skip(self, grants))]
    pub async fn set_role_permissions(&self, id: RoleId, grants: &[ModuleGrant]) -> DomainResult<RoleView> {
        let mut uow = self.store.begin().await?;
        let result = async {
            let role = load_role(uow.as_mut(), id).await?;
            replace_role_grants(uow.as_mut(), role.id, grants).await?;
            role_view(uow.as_mut(), &role).await
        }
        .await;
        finish(uow, result, "set_role_permissions").await
    }

    /// Replace a user's direct grants. Returns them grouped by module.
    #[instrument(skip(self, grants))]
    pub async fn set_user_permissions(&self, user_id: UserId, grants: &[ModuleGrant]) -> DomainResult<Vec<ModuleGrant>> {
        let mut uow = self.store.begin().await?;
        let result = async {
            if uow.find_user(user_id).await?.is_none() {
                return Err(DomainError::not_found("user not found"));
            }
            let ids = resolve_grants(uow.as_mut(), grants).await?;
            uow.replace_user_permissions(user_id, &ids).await?;
            let granted = uow.user_permissions(user_id).await?;
            Ok(group_by_module(&granted))
        }
        .await;
        finish(uow, result, "set_user_permissions").await
    }

    /// Create the role with `grants` unless a role with that name exists.
    ///
    /// Returns `true` when the role was created.
    pub async fn ensure_role(&self, name: &str, grants: &[ModuleGrant]) -> DomainResult<bool> {
        let mut uow = self.store.begin().await?;
        let result = async {
            if uow.find_role_by_name_ci(name).await?.is_some() {
                return Ok(false);
            }
            create_role_in(uow.as_mut(), name, grants).await?;
            Ok::<_, DomainError>(true)
        }
        .await;
        finish(uow, result, "ensure_role").await
    }
}

fn role_exists(name: &str) -> DomainError {
    DomainError::conflict(format!("role '{name}' already exists"))
}

async fn create_role_in(uow: &mut dyn UnitOfWork, name: &str, grants: &[ModuleGrant]) -> DomainResult<RoleView> {
    let name = normalize_name("role", name)?;
    if uow.find_role_by_name_ci(&name).await?.is_some() {
        return Err(role_exists(&name));
    }

    let now = Utc::now();
    let role = Role {
        id: RoleId::new(),
        name,
        created_at: now,
        updated_at: now,
    };
    uow.insert_role(&role)
        .await
        .map_err(|e| conflict_on(e, constraints::ROLE_NAME, &format!("role '{}' already exists", role.name)))?;
    replace_role_grants(uow, role.id, grants).await?;

    tracing::info!(role_id = %role.id, role = %role.name, "role created");
    role_view(uow, &role).await
}

async fn load_role(uow: &mut dyn UnitOfWork, id: RoleId) -> DomainResult<Role> {
    uow.find_role(id)
        .await?
        .ok_or_else(|| DomainError::not_found("role not found"))
}

async fn role_view(uow: &mut dyn UnitOfWork, role: &Role) -> DomainResult<RoleView> {
    let permissions = uow.role_permissions(role.id).await?;
    Ok(RoleView::new(role, &permissions))
}

async fn replace_role_grants(uow: &mut dyn UnitOfWork, role_id: RoleId, grants: &[ModuleGrant]) -> DomainResult<()> {
    let ids = resolve_grants(uow, grants).await?;
    uow.replace_role_permissions(role_id, &ids).await?;
    Ok(())
}

/// Resolve-or-create every (module, permission) pair named by `grants`.
pub(crate) async fn resolve_grants(uow: &mut dyn UnitOfWork, grants: &[ModuleGrant]) -> DomainResult<Vec<PermissionId>> {
    let grants = normalize_grants(grants)?;
    let mut ids = Vec::new();
    for grant in &grants {
        let module = uow.upsert_module(&grant.module).await?;
        for name in &grant.permissions {
            let permission = uow.upsert_permission(module.id, name).await?;
            if !ids.contains(&permission.id) {
                ids.push(permission.id);
            }
        }
    }
    Ok(ids)
}
