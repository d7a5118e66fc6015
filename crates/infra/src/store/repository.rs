use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use promoflow_auth::{GrantedPermission, Module, Permission, Role};
use promoflow_core::{ModuleId, PermissionId, PromotionId, RoleId, UserId};
use promoflow_promotions::{PromotionRecord, PromotionStatus};

use super::StoreError;

/// Stored user row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    /// Always trimmed + lowercased.
    pub email: String,
    pub password_hash: String,
    pub role_id: Option<RoleId>,
    pub phone_number: Option<String>,
    pub phone_verified: bool,
    pub business_license: Option<String>,
    pub otp_code: Option<String>,
    pub otp_expiry: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user's bookmark of a promotion. Unique per (user, promotion).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedPromotion {
    pub user_id: UserId,
    pub promotion_id: PromotionId,
    pub saved_at: DateTime<Utc>,
}

/// Modules, permissions, roles and the two grant relations.
#[async_trait]
pub trait CatalogRepository: Send {
    /// Return the module with exactly this name, creating it when absent.
    async fn upsert_module(&mut self, name: &str) -> Result<Module, StoreError>;

    /// Return the permission `(name, module_id)`, creating it when absent.
    async fn upsert_permission(&mut self, module_id: ModuleId, name: &str) -> Result<Permission, StoreError>;

    /// Case-insensitive module lookup (oldest match wins if names differ only by case).
    async fn find_module_ci(&mut self, name: &str) -> Result<Option<Module>, StoreError>;

    /// Case-insensitive permission lookup within one module.
    async fn find_permission_ci(&mut self, module_id: ModuleId, name: &str) -> Result<Option<Permission>, StoreError>;

    async fn list_module_permissions(&mut self, module_id: ModuleId) -> Result<Vec<Permission>, StoreError>;

    async fn find_role(&mut self, id: RoleId) -> Result<Option<Role>, StoreError>;
    async fn find_role_by_name_ci(&mut self, name: &str) -> Result<Option<Role>, StoreError>;
    async fn list_roles(&mut self, offset: u32, limit: u32) -> Result<Vec<Role>, StoreError>;
    async fn insert_role(&mut self, role: &Role) -> Result<(), StoreError>;
    async fn update_role(&mut self, role: &Role) -> Result<(), StoreError>;

    /// Hard delete. Drops the role's grants and clears it from users; returns false if absent.
    async fn delete_role(&mut self, id: RoleId) -> Result<bool, StoreError>;

    async fn role_permissions(&mut self, role_id: RoleId) -> Result<Vec<GrantedPermission>, StoreError>;
    async fn replace_role_permissions(&mut self, role_id: RoleId, permissions: &[PermissionId]) -> Result<(), StoreError>;

    async fn user_permissions(&mut self, user_id: UserId) -> Result<Vec<GrantedPermission>, StoreError>;
    async fn replace_user_permissions(&mut self, user_id: UserId, permissions: &[PermissionId]) -> Result<(), StoreError>;
}

#[async_trait]
pub trait UserRepository: Send {
    async fn find_user(&mut self, id: UserId) -> Result<Option<UserRecord>, StoreError>;
    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<UserRecord>, StoreError>;
    async fn find_user_by_phone(&mut self, phone: &str) -> Result<Option<UserRecord>, StoreError>;
    async fn insert_user(&mut self, user: &UserRecord) -> Result<(), StoreError>;
    async fn update_user(&mut self, user: &UserRecord) -> Result<(), StoreError>;

    /// Hard delete, cascading to direct grants, bookmarks and created promotions.
    async fn delete_user(&mut self, id: UserId) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait PromotionRepository: Send {
    async fn find_promotion(&mut self, id: PromotionId) -> Result<Option<PromotionRecord>, StoreError>;

    /// Load and lock the row until the unit of work ends.
    async fn find_promotion_for_update(&mut self, id: PromotionId) -> Result<Option<PromotionRecord>, StoreError>;

    /// Exact match on the (already uppercased) code.
    async fn find_promotion_by_code(&mut self, code: &str) -> Result<Option<PromotionRecord>, StoreError>;

    /// Promotions in creation order; an empty `statuses` slice means all.
    async fn list_promotions(&mut self, statuses: &[PromotionStatus]) -> Result<Vec<PromotionRecord>, StoreError>;

    async fn insert_promotion(&mut self, promotion: &PromotionRecord) -> Result<(), StoreError>;
    async fn update_promotion(&mut self, promotion: &PromotionRecord) -> Result<(), StoreError>;

    /// Hard delete, cascading to bookmarks.
    async fn delete_promotion(&mut self, id: PromotionId) -> Result<bool, StoreError>;

    async fn find_saved(&mut self, user_id: UserId, promotion_id: PromotionId) -> Result<Option<SavedPromotion>, StoreError>;
    /// Returns `false` when the bookmark already existed; the stored row is left as is.
    async fn insert_saved(&mut self, saved: &SavedPromotion) -> Result<bool, StoreError>;
}

/// One store transaction.
#[async_trait]
pub trait UnitOfWork: CatalogRepository + UserRepository + PromotionRepository + Send {
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

/// Transaction factory.
#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError>;
}
