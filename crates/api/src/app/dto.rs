use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, async_trait};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use promoflow_auth::ModuleGrant;
use promoflow_core::DomainError;

use crate::app::errors::ApiError;

// ─────────────────────────────────────────────────────────────────────────────
// Envelopes
// ─────────────────────────────────────────────────────────────────────────────

/// `{"message", "data"}` success body.
pub fn ok<T: Serialize>(message: &str, data: T) -> Response {
    respond(StatusCode::OK, message, data)
}

pub fn created<T: Serialize>(message: &str, data: T) -> Response {
    respond(StatusCode::CREATED, message, data)
}

fn respond<T: Serialize>(status: StatusCode, message: &str, data: T) -> Response {
    match serde_json::to_value(data) {
        Ok(data) => (status, Json(serde_json::json!({ "message": message, "data": data }))).into_response(),
        Err(err) => ApiError(DomainError::internal(format!("response encoding failed: {err}"))).into_response(),
    }
}

/// JSON body extractor whose rejections use the error envelope.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError(DomainError::validation(rejection.body_text())))?;
        Ok(Self(value))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Request DTOs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub otp: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateRoleRequest {
    pub name: String,
    #[serde(default)]
    pub modules: Vec<ModuleGrant>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub name: Option<String>,
    pub modules: Option<Vec<ModuleGrant>>,
}

#[derive(Debug, Deserialize)]
pub struct UserPermissionsRequest {
    #[serde(default)]
    pub modules: Vec<ModuleGrant>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Pagination {
    pub offset: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePromotionRequest {
    #[serde(flatten)]
    pub details: promoflow_promotions::PromotionDetails,
    pub promo_code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReviewRequest {
    pub comments: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusFilter {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RedeemRequest {
    pub promo_code: String,
}
