//! Registration, login and password recovery.

use axum::{extract::Extension, response::Response};
use serde_json::json;

use promoflow_auth::Principal;
use promoflow_infra::{LoginCredentials, Registration, Services};

use crate::app::dto::{self, EmailRequest, JsonBody, ResetPasswordRequest, VerifyOtpRequest};
use crate::app::errors::ApiError;

pub async fn register(
    Extension(services): Extension<Services>,
    JsonBody(body): JsonBody<Registration>,
) -> Result<Response, ApiError> {
    let user = services.credentials.register(body).await?;
    Ok(dto::created("user registered", user))
}

pub async fn login(
    Extension(services): Extension<Services>,
    JsonBody(body): JsonBody<LoginCredentials>,
) -> Result<Response, ApiError> {
    let token = services.credentials.login(body).await?;
    Ok(dto::ok("login successful", token))
}

/// The OTP is returned in the body; there is no delivery channel.
pub async fn forgot_password(
    Extension(services): Extension<Services>,
    JsonBody(body): JsonBody<EmailRequest>,
) -> Result<Response, ApiError> {
    let otp = services.credentials.forgot_password(&body.email).await?;
    Ok(dto::ok("otp generated", otp))
}

pub async fn verify_otp(
    Extension(services): Extension<Services>,
    JsonBody(body): JsonBody<VerifyOtpRequest>,
) -> Result<Response, ApiError> {
    services.credentials.verify_otp(&body.email, &body.otp).await?;
    Ok(dto::ok("otp verified", serde_json::Value::Null))
}

pub async fn reset_password(
    Extension(services): Extension<Services>,
    JsonBody(body): JsonBody<ResetPasswordRequest>,
) -> Result<Response, ApiError> {
    services
        .credentials
        .reset_password(&body.email, &body.new_password)
        .await?;
    Ok(dto::ok("password reset", serde_json::Value::Null))
}

pub async fn me(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<Principal>,
) -> Result<Response, ApiError> {
    let permissions = services.access.effective_permissions(&principal).await?;
    Ok(dto::ok(
        "current user",
        json!({
            "user_id": principal.user_id,
            "email": principal.email,
            "role": principal.role_name(),
            "permissions": permissions,
        }),
    ))
}
