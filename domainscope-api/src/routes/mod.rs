//! REST API Routes Module
//!
//! All HTTP route handlers:
//! - Health check endpoints (Kubernetes-compatible)
//! - Schema capability discovery
//! - Domain search (criteria -> paginated results)
//! - Domain verification (reputation + archive)
//! - CORS support for browser-based clients

pub mod health;
pub mod schema;
pub mod search;
pub mod verify;

use std::time::Duration;

use axum::{
    http::{header, HeaderValue, Method},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::state::AppState;

// Re-export route creation functions for convenience
pub use health::create_router as health_router;
pub use schema::create_router as schema_router;
pub use search::create_router as search_router;
pub use verify::create_router as verify_router;

/// Build the complete application router.
///
/// Health endpoints live at the root; everything else is nested under
/// /api/v1. CORS is the outermost layer so preflight requests never reach
/// the handlers.
pub fn create_api_router(state: AppState, config: &ApiConfig) -> Router {
    let api_routes = Router::new()
        .merge(schema::create_router())
        .merge(search::create_router())
        .merge(verify::create_router());

    Router::new()
        .nest("/api/v1", api_routes)
        .nest("/health", health::create_router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(config))
}

/// Build the CORS layer from ApiConfig.
///
/// In development mode (empty origins), allows all origins.
/// In production mode, only allows configured origins.
fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .max_age(Duration::from_secs(3600));

    if !config.is_production() {
        tracing::warn!("CORS: allowing all origins (development mode)");
        cors.allow_origin(Any).allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        tracing::info!(origins = ?config.cors_origins, "CORS: restricting origins");
        cors.allow_origin(origins)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    }
}
