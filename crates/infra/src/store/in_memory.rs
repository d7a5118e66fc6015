//! In-memory store for tests/dev.
//!
//! Transactions are serialized: a unit of work holds the store lock from
//! `begin` until it is committed, rolled back or dropped. Reads go straight to
//! the locked state; the first write copies it, and only that copy replaces the
//! shared state on commit.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use promoflow_auth::{GrantedPermission, Module, Permission, Role};
use promoflow_core::{ModuleId, PermissionId, PromotionId, RoleId, UserId};
use promoflow_promotions::{PromotionRecord, PromotionStatus};

use super::constraints;
use super::repository::{
    CatalogRepository, PromotionRepository, SavedPromotion, Store, UnitOfWork, UserRecord, UserRepository,
};
use super::StoreError;

#[derive(Debug, Clone, Default)]
struct MemoryState {
    modules: BTreeMap<ModuleId, Module>,
    permissions: BTreeMap<PermissionId, Permission>,
    roles: BTreeMap<RoleId, Role>,
    role_permissions: BTreeSet<(RoleId, PermissionId)>,
    users: BTreeMap<UserId, UserRecord>,
    user_permissions: BTreeSet<(UserId, PermissionId)>,
    promotions: BTreeMap<PromotionId, PromotionRecord>,
    saved: BTreeMap<(UserId, PromotionId), SavedPromotion>,
}

impl MemoryState {
    fn granted(&self, permission_id: PermissionId) -> Option<GrantedPermission> {
        let permission = self.permissions.get(&permission_id)?;
        let module = self.modules.get(&permission.module_id)?;
        Some(GrantedPermission {
            id: permission.id,
            module: module.name.clone(),
            name: permission.name.clone(),
        })
    }

    fn check_role_name(&self, role: &Role) -> Result<(), StoreError> {
        let lower = role.name.to_lowercase();
        let taken = self
            .roles
            .values()
            .any(|r| r.id != role.id && r.name.to_lowercase() == lower);
        if taken {
            return Err(StoreError::UniqueViolation(constraints::ROLE_NAME.to_string()));
        }
        Ok(())
    }

    fn check_user_unique(&self, user: &UserRecord) -> Result<(), StoreError> {
        for other in self.users.values().filter(|u| u.id != user.id) {
            if other.email == user.email {
                return Err(StoreError::UniqueViolation(constraints::USER_EMAIL.to_string()));
            }
            if user.phone_number.is_some() && other.phone_number == user.phone_number {
                return Err(StoreError::UniqueViolation(constraints::USER_PHONE.to_string()));
            }
        }
        Ok(())
    }

    fn check_promo_code(&self, promotion: &PromotionRecord) -> Result<(), StoreError> {
        let taken = self
            .promotions
            .values()
            .any(|p| p.id != promotion.id && p.promo_code == promotion.promo_code);
        if taken {
            return Err(StoreError::UniqueViolation(constraints::PROMO_CODE.to_string()));
        }
        Ok(())
    }

    fn remove_promotion(&mut self, id: PromotionId) -> bool {
        self.saved.retain(|(_, promotion_id), _| *promotion_id != id);
        self.promotions.remove(&id).is_some()
    }
}

/// In-memory [`Store`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let guard = self.state.clone().lock_owned().await;
        Ok(Box::new(InMemoryUnitOfWork { guard, working: None }))
    }
}

struct InMemoryUnitOfWork {
    guard: OwnedMutexGuard<MemoryState>,
    /// Copy-on-write; `None` until the unit of work first mutates something.
    working: Option<MemoryState>,
}

impl InMemoryUnitOfWork {
    fn read(&self) -> &MemoryState {
        self.working.as_ref().unwrap_or(&*self.guard)
    }

    fn write(&mut self) -> &mut MemoryState {
        let guard = &self.guard;
        self.working.get_or_insert_with(|| MemoryState::clone(guard))
    }
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let InMemoryUnitOfWork { mut guard, working } = *self;
        if let Some(working) = working {
            *guard = working;
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl CatalogRepository for InMemoryUnitOfWork {
    async fn upsert_module(&mut self, name: &str) -> Result<Module, StoreError> {
        if let Some(existing) = self.read().modules.values().find(|m| m.name == name) {
            return Ok(existing.clone());
        }
        let module = Module {
            id: ModuleId::new(),
            name: name.to_string(),
        };
        self.write().modules.insert(module.id, module.clone());
        Ok(module)
    }

    async fn upsert_permission(&mut self, module_id: ModuleId, name: &str) -> Result<Permission, StoreError> {
        if let Some(existing) = self
            .read()
            .permissions
            .values()
            .find(|p| p.module_id == module_id && p.name == name)
        {
            return Ok(existing.clone());
        }
        let permission = Permission {
            id: PermissionId::new(),
            module_id,
            name: name.to_string(),
        };
        self.write().permissions.insert(permission.id, permission.clone());
        Ok(permission)
    }

    async fn find_module_ci(&mut self, name: &str) -> Result<Option<Module>, StoreError> {
        let lower = name.to_lowercase();
        Ok(self
            .read()
            .modules
            .values()
            .find(|m| m.name.to_lowercase() == lower)
            .cloned())
    }

    async fn find_permission_ci(&mut self, module_id: ModuleId, name: &str) -> Result<Option<Permission>, StoreError> {
        let lower = name.to_lowercase();
        Ok(self
            .read()
            .permissions
            .values()
            .find(|p| p.module_id == module_id && p.name.to_lowercase() == lower)
            .cloned())
    }

    async fn list_module_permissions(&mut self, module_id: ModuleId) -> Result<Vec<Permission>, StoreError> {
        Ok(self
            .read()
            .permissions
            .values()
            .filter(|p| p.module_id == module_id)
            .cloned()
            .collect())
    }

    async fn find_role(&mut self, id: RoleId) -> Result<Option<Role>, StoreError> {
        Ok(self.read().roles.get(&id).cloned())
    }

    async fn find_role_by_name_ci(&mut self, name: &str) -> Result<Option<Role>, StoreError> {
        let lower = name.trim().to_lowercase();
        Ok(self
            .read()
            .roles
            .values()
            .find(|r| r.name.to_lowercase() == lower)
            .cloned())
    }

    async fn list_roles(&mut self, offset: u32, limit: u32) -> Result<Vec<Role>, StoreError> {
        Ok(self
            .read()
            .roles
            .values()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn insert_role(&mut self, role: &Role) -> Result<(), StoreError> {
        self.read().check_role_name(role)?;
        self.write().roles.insert(role.id, role.clone());
        Ok(())
    }

    async fn update_role(&mut self, role: &Role) -> Result<(), StoreError> {
        self.read().check_role_name(role)?;
        if let Some(existing) = self.write().roles.get_mut(&role.id) {
            *existing = role.clone();
        }
        Ok(())
    }

    async fn delete_role(&mut self, id: RoleId) -> Result<bool, StoreError> {
        if !self.read().roles.contains_key(&id) {
            return Ok(false);
        }
        self.write().roles.remove(&id);
        self.write().role_permissions.retain(|(role_id, _)| *role_id != id);
        for user in self.write().users.values_mut() {
            if user.role_id == Some(id) {
                user.role_id = None;
            }
        }
        Ok(true)
    }

    async fn role_permissions(&mut self, role_id: RoleId) -> Result<Vec<GrantedPermission>, StoreError> {
        Ok(self
            .read()
            .role_permissions
            .iter()
            .filter(|(r, _)| *r == role_id)
            .filter_map(|(_, p)| self.read().granted(*p))
            .collect())
    }

    async fn replace_role_permissions(&mut self, role_id: RoleId, permissions: &[PermissionId]) -> Result<(), StoreError> {
        self.write().role_permissions.retain(|(r, _)| *r != role_id);
        self.write()
            .role_permissions
            .extend(permissions.iter().map(|p| (role_id, *p)));
        Ok(())
    }

    async fn user_permissions(&mut self, user_id: UserId) -> Result<Vec<GrantedPermission>, StoreError> {
        Ok(self
            .read()
            .user_permissions
            .iter()
            .filter(|(u, _)| *u == user_id)
            .filter_map(|(_, p)| self.read().granted(*p))
            .collect())
    }

    async fn replace_user_permissions(&mut self, user_id: UserId, permissions: &[PermissionId]) -> Result<(), StoreError> {
        self.write().user_permissions.retain(|(u, _)| *u != user_id);
        self.write()
            .user_permissions
            .extend(permissions.iter().map(|p| (user_id, *p)));
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryUnitOfWork {
    async fn find_user(&mut self, id: UserId) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.read().users.get(&id).cloned())
    }

    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.read().users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_phone(&mut self, phone: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self
            .read()
            .users
            .values()
            .find(|u| u.phone_number.as_deref() == Some(phone))
            .cloned())
    }

    async fn insert_user(&mut self, user: &UserRecord) -> Result<(), StoreError> {
        self.read().check_user_unique(user)?;
        self.write().users.insert(user.id, user.clone());
        Ok(())
    }

    async fn update_user(&mut self, user: &UserRecord) -> Result<(), StoreError> {
        self.read().check_user_unique(user)?;
        if let Some(existing) = self.write().users.get_mut(&user.id) {
            *existing = user.clone();
        }
        Ok(())
    }

    async fn delete_user(&mut self, id: UserId) -> Result<bool, StoreError> {
        if !self.read().users.contains_key(&id) {
            return Ok(false);
        }
        self.write().users.remove(&id);
        self.write().user_permissions.retain(|(u, _)| *u != id);
        self.write().saved.retain(|(u, _), _| *u != id);
        let owned: Vec<PromotionId> = self
            .read()
            .promotions
            .values()
            .filter(|p| p.created_by == id)
            .map(|p| p.id)
            .collect();
        for promotion_id in owned {
            self.write().remove_promotion(promotion_id);
        }
        Ok(true)
    }
}

#[async_trait]
impl PromotionRepository for InMemoryUnitOfWork {
    async fn find_promotion(&mut self, id: PromotionId) -> Result<Option<PromotionRecord>, StoreError> {
        Ok(self.read().promotions.get(&id).cloned())
    }

    async fn find_promotion_for_update(&mut self, id: PromotionId) -> Result<Option<PromotionRecord>, StoreError> {
        // The whole store is already locked for this unit of work.
        self.find_promotion(id).await
    }

    async fn find_promotion_by_code(&mut self, code: &str) -> Result<Option<PromotionRecord>, StoreError> {
        Ok(self
            .read()
            .promotions
            .values()
            .find(|p| p.promo_code == code)
            .cloned())
    }

    async fn list_promotions(&mut self, statuses: &[PromotionStatus]) -> Result<Vec<PromotionRecord>, StoreError> {
        let mut out: Vec<PromotionRecord> = self
            .read()
            .promotions
            .values()
            .filter(|p| statuses.is_empty() || statuses.contains(&p.status))
            .cloned()
            .collect();
        out.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        Ok(out)
    }

    async fn insert_promotion(&mut self, promotion: &PromotionRecord) -> Result<(), StoreError> {
        self.read().check_promo_code(promotion)?;
        self.write().promotions.insert(promotion.id, promotion.clone());
        Ok(())
    }

    async fn update_promotion(&mut self, promotion: &PromotionRecord) -> Result<(), StoreError> {
        self.read().check_promo_code(promotion)?;
        if let Some(existing) = self.write().promotions.get_mut(&promotion.id) {
            *existing = promotion.clone();
        }
        Ok(())
    }

    async fn delete_promotion(&mut self, id: PromotionId) -> Result<bool, StoreError> {
        if !self.read().promotions.contains_key(&id) {
            return Ok(false);
        }
        Ok(self.write().remove_promotion(id))
    }

    async fn find_saved(&mut self, user_id: UserId, promotion_id: PromotionId) -> Result<Option<SavedPromotion>, StoreError> {
        Ok(self.read().saved.get(&(user_id, promotion_id)).cloned())
    }

    async fn insert_saved(&mut self, saved: &SavedPromotion) -> Result<bool, StoreError> {
        let key = (saved.user_id, saved.promotion_id);
        if self.read().saved.contains_key(&key) {
            return Ok(false);
        }
        self.write().saved.insert(key, saved.clone());
        Ok(true)
    }
}
