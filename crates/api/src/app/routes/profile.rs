use axum::{extract::Extension, response::Response};

use promoflow_auth::Principal;
use promoflow_infra::{ProfileUpdate, Services};

use crate::app::dto::{self, JsonBody};
use crate::app::errors::ApiError;

pub async fn get_profile(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<Principal>,
) -> Result<Response, ApiError> {
    let profile = services.credentials.get_profile(&principal).await?;
    Ok(dto::ok("profile", profile))
}

/// Changing the phone number clears its verified flag.
pub async fn update_profile(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<Principal>,
    JsonBody(body): JsonBody<ProfileUpdate>,
) -> Result<Response, ApiError> {
    let profile = services.credentials.update_profile(&principal, body).await?;
    Ok(dto::ok("profile updated", profile))
}

pub async fn delete_profile(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<Principal>,
) -> Result<Response, ApiError> {
    services.credentials.delete_profile(&principal).await?;
    Ok(dto::ok("account deleted", serde_json::Value::Null))
}
