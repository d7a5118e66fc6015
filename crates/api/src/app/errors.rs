use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use promoflow_core::{DomainError, ErrorKind};

/// A domain failure on its way out as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::InvalidState => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let data = match self.0.diagnostics() {
            Some(diagnostics) => json!(diagnostics),
            None => serde_json::Value::Null,
        };
        json_error(status_for(kind), kind.as_str(), self.0.message(), data)
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>, data: serde_json::Value) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
            "data": data,
        })),
    )
        .into_response()
}
