//! Promotion workflow endpoints.
//!
//! Gates decide whether a caller may attempt an action at all; ownership and
//! status rules are enforced by the workflow itself.

use axum::{
    Router,
    extract::{Extension, Path, Query},
    response::Response,
    routing::{get, post, put},
};

use promoflow_auth::Principal;
use promoflow_core::PromotionId;
use promoflow_infra::{Services, gates};
use promoflow_promotions::PromotionPatch;

use crate::app::dto::{self, CreatePromotionRequest, JsonBody, RedeemRequest, ReviewRequest, StatusFilter};
use crate::app::errors::ApiError;
use crate::app::routes::common::require;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create).get(list_all))
        .route("/:id", get(get_one).put(update).delete(delete))
        .route("/:id/toggle", post(toggle))
        .route("/:id/submit", post(submit))
        .route("/:id/approve", put(approve))
        .route("/:id/reject", put(reject))
        .route("/public/promotions/:id/save", post(save))
}

fn promotion_id(raw: &str) -> Result<PromotionId, ApiError> {
    Ok(raw.parse()?)
}

pub async fn create(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<Principal>,
    JsonBody(body): JsonBody<CreatePromotionRequest>,
) -> Result<Response, ApiError> {
    require(&services, &principal, &gates::CREATE_PROMOTION).await?;
    let promotion = services
        .promotions
        .create(&principal, body.details, body.promo_code.as_deref())
        .await?;
    Ok(dto::created("promotion created", promotion))
}

pub async fn list_all(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<Principal>,
    Query(filter): Query<StatusFilter>,
) -> Result<Response, ApiError> {
    require(&services, &principal, &gates::GET_PROMOTION).await?;
    let promotions = services.promotions.list_all(filter.status.as_deref()).await?;
    Ok(dto::ok("promotions", promotions))
}

pub async fn get_one(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    require(&services, &principal, &gates::GET_PROMOTION).await?;
    let promotion = services.promotions.get(promotion_id(&id)?).await?;
    Ok(dto::ok("promotion", promotion))
}

pub async fn update(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    JsonBody(patch): JsonBody<PromotionPatch>,
) -> Result<Response, ApiError> {
    require(&services, &principal, &gates::UPDATE_PROMOTION).await?;
    let promotion = services
        .promotions
        .update(&principal, promotion_id(&id)?, patch)
        .await?;
    Ok(dto::ok("promotion updated", promotion))
}

pub async fn delete(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    require(&services, &principal, &gates::DELETE_PROMOTION).await?;
    services.promotions.delete(&principal, promotion_id(&id)?).await?;
    Ok(dto::ok("promotion deleted", serde_json::Value::Null))
}

pub async fn toggle(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    require(&services, &principal, &gates::TOGGLE_PROMOTION).await?;
    let promotion = services.promotions.toggle(&principal, promotion_id(&id)?).await?;
    Ok(dto::ok("promotion toggled", promotion))
}

pub async fn submit(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    require(&services, &principal, &gates::SUBMIT_PROMOTION).await?;
    let promotion = services.promotions.submit(&principal, promotion_id(&id)?).await?;
    Ok(dto::ok("promotion submitted", promotion))
}

/// The review body is optional; an empty request approves without comments.
pub async fn approve(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    body: Option<JsonBody<ReviewRequest>>,
) -> Result<Response, ApiError> {
    require(&services, &principal, &gates::APPROVE_PROMOTION).await?;
    let comments = body.and_then(|JsonBody(b)| b.comments);
    let promotion = services
        .promotions
        .approve(&principal, promotion_id(&id)?, comments)
        .await?;
    Ok(dto::ok("promotion approved", promotion))
}

pub async fn reject(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    body: Option<JsonBody<ReviewRequest>>,
) -> Result<Response, ApiError> {
    require(&services, &principal, &gates::REJECT_PROMOTION).await?;
    let comments = body.and_then(|JsonBody(b)| b.comments);
    let promotion = services
        .promotions
        .reject(&principal, promotion_id(&id)?, comments)
        .await?;
    Ok(dto::ok("promotion rejected", promotion))
}

// ─────────────────────────────────────────────────────────────────────────────
// Public catalogue
// ─────────────────────────────────────────────────────────────────────────────

pub async fn list_public(Extension(services): Extension<Services>) -> Result<Response, ApiError> {
    let promotions = services.promotions.list_public().await?;
    Ok(dto::ok("public promotions", promotions))
}

/// Bookmark for the caller. Saving twice returns the existing bookmark.
pub async fn save(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let receipt = services.promotions.save(&principal, promotion_id(&id)?).await?;
    let message = if receipt.already_saved {
        "promotion already saved"
    } else {
        "promotion saved"
    };
    Ok(dto::ok(message, receipt.saved))
}

pub async fn redeem(
    Extension(services): Extension<Services>,
    JsonBody(body): JsonBody<RedeemRequest>,
) -> Result<Response, ApiError> {
    let promotion = services.promotions.redeem(&body.promo_code).await?;
    Ok(dto::ok("promo code valid", promotion))
}
