//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request DTOs and the success envelope
//! - `errors.rs`: consistent error responses

use axum::{Extension, Router, middleware::from_fn};
use tower::ServiceBuilder;

use promoflow_infra::Services;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;

/// Build the full HTTP router (public entrypoint used by `main.rs` and the black-box tests).
pub fn build_app(services: Services) -> Router {
    let auth_state = middleware::AuthState {
        access: services.access.clone(),
    };

    // Protected routes: require a bearer token that resolves to a live user.
    let protected = routes::protected_router().layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::auth_middleware,
    ));

    Router::new()
        .merge(routes::public_router())
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(from_fn(middleware::request_log))
                .layer(Extension(services)),
        )
}
