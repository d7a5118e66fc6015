use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use promoflow_core::UserId;
use promoflow_infra::AccessService;

use crate::app::errors::ApiError;

#[derive(Clone)]
pub struct AuthState {
    pub access: AccessService,
}

/// Set on the response once the caller is known, for the request log.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser(pub UserId);

/// Resolve the bearer token into a [`promoflow_auth::Principal`] extension.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = state.access.resolve_identity(extract_bearer(req.headers())).await?;
    let user_id = principal.user_id;
    req.extensions_mut().insert(principal);

    let mut response = next.run(req).await;
    response.extensions_mut().insert(AuthenticatedUser(user_id));
    Ok(response)
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

pub async fn request_log(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(req).await;

    let user = response
        .extensions()
        .get::<AuthenticatedUser>()
        .map(|u| u.0.to_string())
        .unwrap_or_else(|| "anonymous".to_string());
    tracing::info!(
        method = %method,
        path = %path,
        user = %user,
        status = response.status().as_u16(),
        latency_ms = started.elapsed().as_millis() as u64,
        "request"
    );
    response
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderValue, header::AUTHORIZATION};

    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn bearer_prefix_is_required() {
        assert_eq!(extract_bearer(&headers("Bearer abc.def")), Some("abc.def"));
        assert_eq!(extract_bearer(&headers("Basic abc")), None);
        assert_eq!(extract_bearer(&headers("Bearer   ")), None);
        assert_eq!(extract_bearer(&HeaderMap::new()), None);
    }
}
