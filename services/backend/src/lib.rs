// Library interface for the promo backend - exposes modules for testing

pub mod config;
pub mod domain;
pub mod errors;
pub mod extractors;
pub mod handlers;
pub mod repository;
pub mod services;
pub mod state;
pub mod views;

use axum::{
    routing::{get, post},
    Router,
};
use state::AppState;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/healthz", get(handlers::health::healthz))
        // Redemption
        .route("/promo/redeem", post(handlers::promo::redeem_promo))
        // Admin
        .route("/admin", get(handlers::admin::admin_form))
        .route("/admin/create", post(handlers::admin::create_codes))
        .route("/admin/codes/:code", get(handlers::admin::code_status))
        // State
        .with_state(state)
        // Middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)),
        )
}
