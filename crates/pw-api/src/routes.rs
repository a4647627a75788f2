//! # Routes
//!
//! Axum router configuration for the pingwall API.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - API:
///   - POST /api/v1/widget - Create a signed widget URL
///   - GET  /api/v1/products - List active products
///
/// - Pingbacks:
///   - GET  /pingback - Pingback as query parameters
///   - POST /pingback - Pingback as form body
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/widget", post(handlers::create_widget))
        .route("/products", get(handlers::list_products));

    Router::new()
        // Health check at root
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        // API v1
        .nest("/api/v1", api_routes)
        // Gateway pingbacks
        .route(
            "/pingback",
            get(handlers::pingback_query).post(handlers::pingback_form),
        )
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        // State
        .with_state(state)
}
