use axum::{
    Router,
    routing::{get, post},
};

pub mod auth;
pub mod common;
pub mod profile;
pub mod promotions;
pub mod roles;
pub mod system;

/// Endpoints reachable without a token.
pub fn public_router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route("/auth/verify-otp", post(auth::verify_otp))
        .route("/auth/reset-password", post(auth::reset_password))
        .route("/promotions/public/promotions", get(promotions::list_public))
        .route("/promotions/public/promotions/redeem", post(promotions::redeem))
}

/// Router for all authenticated endpoints.
pub fn protected_router() -> Router {
    Router::new()
        .route("/auth/me", get(auth::me))
        .route(
            "/user/profile",
            get(profile::get_profile)
                .put(profile::update_profile)
                .delete(profile::delete_profile),
        )
        .nest("/roles", roles::router())
        .nest("/promotions", promotions::router())
}
