//! Postgres-backed store.
//!
//! Each [`UnitOfWork`] wraps one SQL transaction. Promotion transitions lock
//! their row with `SELECT ... FOR UPDATE`, so two reviewers racing on the same
//! pending promotion serialize and the loser sees the committed status.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `UniqueViolation(constraint)` |
//! | Anything else | N/A | `Database { operation, source }` |

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use promoflow_auth::{GrantedPermission, Module, Permission, Role};
use promoflow_core::{ModuleId, PermissionId, PromotionId, RoleId, UserId};
use promoflow_promotions::{PromotionDetails, PromotionRecord, PromotionStatus};

use super::repository::{
    CatalogRepository, PromotionRepository, SavedPromotion, Store, UnitOfWork, UserRecord, UserRepository,
};
use super::StoreError;

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

const PROMOTION_COLUMNS: &str = "id, created_by, title, description, terms, image_url, start_date, end_date, \
     discount, target_segments, promo_code, status, approval_comments, created_at, updated_at, updated_by, version";

const USER_COLUMNS: &str = "id, email, password_hash, role_id, phone_number, phone_verified, business_license, \
     otp_code, otp_expiry, created_at, updated_at";

/// Postgres [`Store`] over a shared connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str, max_connections: u32, acquire_timeout: Duration) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create missing tables and indexes. Idempotent.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }
}

struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx
            .rollback()
            .await
            .map_err(|e| map_sqlx_error("rollback", e))
    }
}

#[async_trait]
impl CatalogRepository for PgUnitOfWork {
    #[instrument(level = "debug", skip(self), err)]
    async fn upsert_module(&mut self, name: &str) -> Result<Module, StoreError> {
        sqlx::query("INSERT INTO modules (id, name) VALUES ($1, $2) ON CONFLICT (name) DO NOTHING")
            .bind(ModuleId::new().as_uuid())
            .bind(name)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("insert_module", e))?;

        let row = sqlx::query("SELECT id, name FROM modules WHERE name = $1")
            .bind(name)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("load_module", e))?;
        module_from_row(&row)
    }

    #[instrument(level = "debug", skip(self), err)]
    async fn upsert_permission(&mut self, module_id: ModuleId, name: &str) -> Result<Permission, StoreError> {
        sqlx::query(
            "INSERT INTO permissions (id, module_id, name) VALUES ($1, $2, $3) \
             ON CONFLICT (module_id, name) DO NOTHING",
        )
        .bind(PermissionId::new().as_uuid())
        .bind(module_id.as_uuid())
        .bind(name)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_permission", e))?;

        let row = sqlx::query("SELECT id, module_id, name FROM permissions WHERE module_id = $1 AND name = $2")
            .bind(module_id.as_uuid())
            .bind(name)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("load_permission", e))?;
        permission_from_row(&row)
    }

    async fn find_module_ci(&mut self, name: &str) -> Result<Option<Module>, StoreError> {
        let row = sqlx::query(
            "SELECT id, name FROM modules WHERE lower(name) = lower($1) ORDER BY created_at, id LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("find_module", e))?;
        row.as_ref().map(module_from_row).transpose()
    }

    async fn find_permission_ci(&mut self, module_id: ModuleId, name: &str) -> Result<Option<Permission>, StoreError> {
        let row = sqlx::query(
            "SELECT id, module_id, name FROM permissions \
             WHERE module_id = $1 AND lower(name) = lower($2) ORDER BY created_at, id LIMIT 1",
        )
        .bind(module_id.as_uuid())
        .bind(name)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("find_permission", e))?;
        row.as_ref().map(permission_from_row).transpose()
    }

    async fn list_module_permissions(&mut self, module_id: ModuleId) -> Result<Vec<Permission>, StoreError> {
        let rows = sqlx::query("SELECT id, module_id, name FROM permissions WHERE module_id = $1 ORDER BY name")
            .bind(module_id.as_uuid())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("list_module_permissions", e))?;
        rows.iter().map(permission_from_row).collect()
    }

    async fn find_role(&mut self, id: RoleId) -> Result<Option<Role>, StoreError> {
        let row = sqlx::query("SELECT id, name, created_at, updated_at FROM roles WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("find_role", e))?;
        row.as_ref().map(role_from_row).transpose()
    }

    async fn find_role_by_name_ci(&mut self, name: &str) -> Result<Option<Role>, StoreError> {
        let row = sqlx::query("SELECT id, name, created_at, updated_at FROM roles WHERE lower(name) = lower($1)")
            .bind(name.trim())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("find_role_by_name", e))?;
        row.as_ref().map(role_from_row).transpose()
    }

    async fn list_roles(&mut self, offset: u32, limit: u32) -> Result<Vec<Role>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, name, created_at, updated_at FROM roles ORDER BY created_at, id OFFSET $1 LIMIT $2",
        )
        .bind(i64::from(offset))
        .bind(i64::from(limit))
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("list_roles", e))?;
        rows.iter().map(role_from_row).collect()
    }

    #[instrument(level = "debug", skip(self, role), fields(role_id = %role.id), err)]
    async fn insert_role(&mut self, role: &Role) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO roles (id, name, created_at, updated_at) VALUES ($1, $2, $3, $4)")
            .bind(role.id.as_uuid())
            .bind(&role.name)
            .bind(role.created_at)
            .bind(role.updated_at)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("insert_role", e))?;
        Ok(())
    }

    async fn update_role(&mut self, role: &Role) -> Result<(), StoreError> {
        sqlx::query("UPDATE roles SET name = $2, updated_at = $3 WHERE id = $1")
            .bind(role.id.as_uuid())
            .bind(&role.name)
            .bind(role.updated_at)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("update_role", e))?;
        Ok(())
    }

    async fn delete_role(&mut self, id: RoleId) -> Result<bool, StoreError> {
        // role_permissions cascades; users.role_id is set to NULL.
        let result = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_role", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn role_permissions(&mut self, role_id: RoleId) -> Result<Vec<GrantedPermission>, StoreError> {
        let rows = sqlx::query(
            "SELECT p.id, m.name AS module, p.name FROM role_permissions rp \
             JOIN permissions p ON p.id = rp.permission_id \
             JOIN modules m ON m.id = p.module_id \
             WHERE rp.role_id = $1",
        )
        .bind(role_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("role_permissions", e))?;
        rows.iter().map(granted_from_row).collect()
    }

    async fn replace_role_permissions(&mut self, role_id: RoleId, permissions: &[PermissionId]) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
            .bind(role_id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("clear_role_permissions", e))?;

        let ids: Vec<Uuid> = permissions.iter().map(|p| *p.as_uuid()).collect();
        sqlx::query(
            "INSERT INTO role_permissions (role_id, permission_id) \
             SELECT $1, unnest($2::uuid[]) ON CONFLICT DO NOTHING",
        )
        .bind(role_id.as_uuid())
        .bind(&ids)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_role_permissions", e))?;
        Ok(())
    }

    async fn user_permissions(&mut self, user_id: UserId) -> Result<Vec<GrantedPermission>, StoreError> {
        let rows = sqlx::query(
            "SELECT p.id, m.name AS module, p.name FROM user_permissions up \
             JOIN permissions p ON p.id = up.permission_id \
             JOIN modules m ON m.id = p.module_id \
             WHERE up.user_id = $1",
        )
        .bind(user_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("user_permissions", e))?;
        rows.iter().map(granted_from_row).collect()
    }

    async fn replace_user_permissions(&mut self, user_id: UserId, permissions: &[PermissionId]) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM user_permissions WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("clear_user_permissions", e))?;

        let ids: Vec<Uuid> = permissions.iter().map(|p| *p.as_uuid()).collect();
        sqlx::query(
            "INSERT INTO user_permissions (user_id, permission_id) \
             SELECT $1, unnest($2::uuid[]) ON CONFLICT DO NOTHING",
        )
        .bind(user_id.as_uuid())
        .bind(&ids)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_user_permissions", e))?;
        Ok(())
    }
}

#[async_trait]
impl UserRepository for PgUnitOfWork {
    async fn find_user(&mut self, id: UserId) -> Result<Option<UserRecord>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("find_user", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row = sqlx::query(&sql)
            .bind(email)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_email", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_user_by_phone(&mut self, phone: &str) -> Result<Option<UserRecord>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE phone_number = $1");
        let row = sqlx::query(&sql)
            .bind(phone)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_phone", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    #[instrument(level = "debug", skip(self, user), fields(user_id = %user.id), err)]
    async fn insert_user(&mut self, user: &UserRecord) -> Result<(), StoreError> {
        let sql = format!(
            "INSERT INTO users ({USER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
        );
        bind_user(sqlx::query(&sql), user)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("insert_user", e))?;
        Ok(())
    }

    async fn update_user(&mut self, user: &UserRecord) -> Result<(), StoreError> {
        let sql = "UPDATE users SET email = $2, password_hash = $3, role_id = $4, phone_number = $5, \
                   phone_verified = $6, business_license = $7, otp_code = $8, otp_expiry = $9, \
                   created_at = $10, updated_at = $11 WHERE id = $1";
        bind_user(sqlx::query(sql), user)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("update_user", e))?;
        Ok(())
    }

    async fn delete_user(&mut self, id: UserId) -> Result<bool, StoreError> {
        // Grants, bookmarks and created promotions cascade.
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_user", e))?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl PromotionRepository for PgUnitOfWork {
    async fn find_promotion(&mut self, id: PromotionId) -> Result<Option<PromotionRecord>, StoreError> {
        let sql = format!("SELECT {PROMOTION_COLUMNS} FROM promotions WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("find_promotion", e))?;
        row.as_ref().map(promotion_from_row).transpose()
    }

    async fn find_promotion_for_update(&mut self, id: PromotionId) -> Result<Option<PromotionRecord>, StoreError> {
        let sql = format!("SELECT {PROMOTION_COLUMNS} FROM promotions WHERE id = $1 FOR UPDATE");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("lock_promotion", e))?;
        row.as_ref().map(promotion_from_row).transpose()
    }

    async fn find_promotion_by_code(&mut self, code: &str) -> Result<Option<PromotionRecord>, StoreError> {
        let sql = format!("SELECT {PROMOTION_COLUMNS} FROM promotions WHERE promo_code = $1");
        let row = sqlx::query(&sql)
            .bind(code)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("find_promotion_by_code", e))?;
        row.as_ref().map(promotion_from_row).transpose()
    }

    async fn list_promotions(&mut self, statuses: &[PromotionStatus]) -> Result<Vec<PromotionRecord>, StoreError> {
        let names: Vec<&str> = statuses.iter().map(|s| s.as_str()).collect();
        let sql = format!(
            "SELECT {PROMOTION_COLUMNS} FROM promotions \
             WHERE cardinality($1::text[]) = 0 OR status = ANY($1) ORDER BY created_at, id"
        );
        let rows = sqlx::query(&sql)
            .bind(&names)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("list_promotions", e))?;
        rows.iter().map(promotion_from_row).collect()
    }

    #[instrument(level = "debug", skip(self, promotion), fields(promotion_id = %promotion.id), err)]
    async fn insert_promotion(&mut self, promotion: &PromotionRecord) -> Result<(), StoreError> {
        let sql = format!(
            "INSERT INTO promotions ({PROMOTION_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)"
        );
        bind_promotion(sqlx::query(&sql), promotion)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("insert_promotion", e))?;
        Ok(())
    }

    #[instrument(level = "debug", skip(self, promotion), fields(promotion_id = %promotion.id), err)]
    async fn update_promotion(&mut self, promotion: &PromotionRecord) -> Result<(), StoreError> {
        let sql = "UPDATE promotions SET created_by = $2, title = $3, description = $4, terms = $5, \
                   image_url = $6, start_date = $7, end_date = $8, discount = $9, target_segments = $10, \
                   promo_code = $11, status = $12, approval_comments = $13, created_at = $14, \
                   updated_at = $15, updated_by = $16, version = $17 WHERE id = $1";
        bind_promotion(sqlx::query(sql), promotion)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("update_promotion", e))?;
        Ok(())
    }

    async fn delete_promotion(&mut self, id: PromotionId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM promotions WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_promotion", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_saved(&mut self, user_id: UserId, promotion_id: PromotionId) -> Result<Option<SavedPromotion>, StoreError> {
        let row = sqlx::query(
            "SELECT user_id, promotion_id, saved_at FROM saved_promotions WHERE user_id = $1 AND promotion_id = $2",
        )
        .bind(user_id.as_uuid())
        .bind(promotion_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("find_saved", e))?;

        row.map(|row| -> Result<SavedPromotion, StoreError> {
            Ok(SavedPromotion {
                user_id: UserId::from_uuid(get(&row, "user_id")?),
                promotion_id: PromotionId::from_uuid(get(&row, "promotion_id")?),
                saved_at: get(&row, "saved_at")?,
            })
        })
        .transpose()
    }

    async fn insert_saved(&mut self, saved: &SavedPromotion) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "INSERT INTO saved_promotions (user_id, promotion_id, saved_at) VALUES ($1, $2, $3) \
             ON CONFLICT DO NOTHING",
        )
        .bind(saved.user_id.as_uuid())
        .bind(saved.promotion_id.as_uuid())
        .bind(saved.saved_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_saved", e))?;
        Ok(result.rows_affected() == 1)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Row mapping
// ─────────────────────────────────────────────────────────────────────────────

type PgQuery<'q> = sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments>;

fn get<'r, T>(row: &'r PgRow, column: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(column)
        .map_err(|e| StoreError::Corrupt(format!("column {column}: {e}")))
}

fn module_from_row(row: &PgRow) -> Result<Module, StoreError> {
    Ok(Module {
        id: ModuleId::from_uuid(get(row, "id")?),
        name: get(row, "name")?,
    })
}

fn permission_from_row(row: &PgRow) -> Result<Permission, StoreError> {
    Ok(Permission {
        id: PermissionId::from_uuid(get(row, "id")?),
        module_id: ModuleId::from_uuid(get(row, "module_id")?),
        name: get(row, "name")?,
    })
}

fn role_from_row(row: &PgRow) -> Result<Role, StoreError> {
    Ok(Role {
        id: RoleId::from_uuid(get(row, "id")?),
        name: get(row, "name")?,
        created_at: get(row, "created_at")?,
        updated_at: get(row, "updated_at")?,
    })
}

fn granted_from_row(row: &PgRow) -> Result<GrantedPermission, StoreError> {
    Ok(GrantedPermission {
        id: PermissionId::from_uuid(get(row, "id")?),
        module: get(row, "module")?,
        name: get(row, "name")?,
    })
}

fn user_from_row(row: &PgRow) -> Result<UserRecord, StoreError> {
    let role_id: Option<Uuid> = get(row, "role_id")?;
    Ok(UserRecord {
        id: UserId::from_uuid(get(row, "id")?),
        email: get(row, "email")?,
        password_hash: get(row, "password_hash")?,
        role_id: role_id.map(RoleId::from_uuid),
        phone_number: get(row, "phone_number")?,
        phone_verified: get(row, "phone_verified")?,
        business_license: get(row, "business_license")?,
        otp_code: get(row, "otp_code")?,
        otp_expiry: get(row, "otp_expiry")?,
        created_at: get(row, "created_at")?,
        updated_at: get(row, "updated_at")?,
    })
}

fn bind_user<'q>(query: PgQuery<'q>, user: &'q UserRecord) -> PgQuery<'q> {
    query
        .bind(user.id.as_uuid())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role_id.map(|r| *r.as_uuid()))
        .bind(&user.phone_number)
        .bind(user.phone_verified)
        .bind(&user.business_license)
        .bind(&user.otp_code)
        .bind(user.otp_expiry)
        .bind(user.created_at)
        .bind(user.updated_at)
}

fn promotion_from_row(row: &PgRow) -> Result<PromotionRecord, StoreError> {
    let status: String = get(row, "status")?;
    let status = status
        .parse::<PromotionStatus>()
        .map_err(|e| StoreError::Corrupt(e.to_string()))?;
    let version: i64 = get(row, "version")?;
    let updated_by: Option<Uuid> = get(row, "updated_by")?;

    Ok(PromotionRecord {
        id: PromotionId::from_uuid(get(row, "id")?),
        created_by: UserId::from_uuid(get(row, "created_by")?),
        details: PromotionDetails {
            title: get(row, "title")?,
            description: get(row, "description")?,
            terms: get(row, "terms")?,
            image_url: get(row, "image_url")?,
            start_date: get(row, "start_date")?,
            end_date: get(row, "end_date")?,
            discount: get(row, "discount")?,
            target_segments: get(row, "target_segments")?,
        },
        promo_code: get(row, "promo_code")?,
        status,
        approval_comments: get(row, "approval_comments")?,
        created_at: get(row, "created_at")?,
        updated_at: get(row, "updated_at")?,
        updated_by: updated_by.map(UserId::from_uuid),
        version: u64::try_from(version).map_err(|_| StoreError::Corrupt(format!("negative version {version}")))?,
    })
}

fn bind_promotion<'q>(query: PgQuery<'q>, p: &'q PromotionRecord) -> PgQuery<'q> {
    query
        .bind(p.id.as_uuid())
        .bind(p.created_by.as_uuid())
        .bind(&p.details.title)
        .bind(&p.details.description)
        .bind(&p.details.terms)
        .bind(&p.details.image_url)
        .bind(p.details.start_date)
        .bind(p.details.end_date)
        .bind(p.details.discount)
        .bind(&p.details.target_segments)
        .bind(&p.promo_code)
        .bind(p.status.as_str())
        .bind(&p.approval_comments)
        .bind(p.created_at)
        .bind(p.updated_at)
        .bind(p.updated_by.map(|u| *u.as_uuid()))
        .bind(i64::try_from(p.version).unwrap_or(i64::MAX))
}

fn map_sqlx_error(operation: &'static str, err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            let constraint = db_err.constraint().unwrap_or("unknown").to_string();
            return StoreError::UniqueViolation(constraint);
        }
    }
    StoreError::Database {
        operation,
        source: err,
    }
}
