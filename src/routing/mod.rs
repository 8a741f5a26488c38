//! Static route table.
//!
//! # Routes
//! ```text
//! GET /v1/                 → welcome
//! GET /v1/health/          → health
//! GET /v1/health/metrics   → metrics
//! anything else            → 404 / 405
//! ```
//!
//! # Design Decisions
//! - Paths match exactly; `/v1/health` and `/v1/health/` are different routes
//! - HEAD is answered by the GET handlers

use axum::{routing::get, Router};

use crate::http::handlers;
use crate::http::server::AppState;

pub const WELCOME_PATH: &str = "/v1/";
pub const HEALTH_PATH: &str = "/v1/health/";
pub const METRICS_PATH: &str = "/v1/health/metrics";

/// Build the versioned API routes. Middleware is applied by the server.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route(WELCOME_PATH, get(handlers::welcome))
        .route(HEALTH_PATH, get(handlers::health))
        .route(METRICS_PATH, get(handlers::metrics))
        .fallback(handlers::not_found)
        .method_not_allowed_fallback(handlers::method_not_allowed)
}
