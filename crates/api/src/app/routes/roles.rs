//! Role and permission administration. Every route needs `roles.manage_roles`.

use axum::{
    Router,
    extract::{Extension, Path, Query},
    response::Response,
    routing::{get, put},
};

use promoflow_auth::Principal;
use promoflow_core::{RoleId, UserId};
use promoflow_infra::{Services, gates};

use crate::app::dto::{self, CreateRoleRequest, JsonBody, Pagination, UpdateRoleRequest, UserPermissionsRequest};
use crate::app::errors::ApiError;
use crate::app::routes::common::require;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_roles).post(create_role))
        .route("/:id", get(get_role).put(update_role).delete(delete_role))
        .route("/users/:user_id/permissions", put(set_user_permissions))
}

pub async fn create_role(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<Principal>,
    JsonBody(body): JsonBody<CreateRoleRequest>,
) -> Result<Response, ApiError> {
    require(&services, &principal, &gates::MANAGE_ROLES).await?;
    let role = services.catalog.create_role(&body.name, &body.modules).await?;
    Ok(dto::created("role created", role))
}

pub async fn list_roles(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<Principal>,
    Query(page): Query<Pagination>,
) -> Result<Response, ApiError> {
    require(&services, &principal, &gates::MANAGE_ROLES).await?;
    let roles = services.catalog.list_roles(page.offset, page.limit).await?;
    Ok(dto::ok("roles", roles))
}

pub async fn get_role(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    require(&services, &principal, &gates::MANAGE_ROLES).await?;
    let id: RoleId = id.parse()?;
    let role = services.catalog.get_role(id).await?;
    Ok(dto::ok("role", role))
}

/// Rename and/or replace the permission set; omitted fields are left alone.
pub async fn update_role(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<UpdateRoleRequest>,
) -> Result<Response, ApiError> {
    require(&services, &principal, &gates::MANAGE_ROLES).await?;
    let id: RoleId = id.parse()?;
    let role = services
        .catalog
        .update_role(id, body.name.as_deref(), body.modules.as_deref())
        .await?;
    Ok(dto::ok("role updated", role))
}

pub async fn delete_role(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    require(&services, &principal, &gates::MANAGE_ROLES).await?;
    let id: RoleId = id.parse()?;
    services.catalog.delete_role(id).await?;
    Ok(dto::ok("role deleted", serde_json::Value::Null))
}

/// Replace a user's direct grants.
pub async fn set_user_permissions(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<Principal>,
    Path(user_id): Path<String>,
    JsonBody(body): JsonBody<UserPermissionsRequest>,
) -> Result<Response, ApiError> {
    require(&services, &principal, &gates::MANAGE_ROLES).await?;
    let user_id: UserId = user_id.parse()?;
    let modules = services.catalog.set_user_permissions(user_id, &body.modules).await?;
    Ok(dto::ok("user permissions updated", modules))
}
