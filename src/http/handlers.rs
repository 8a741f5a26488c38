//! Endpoint handlers.

use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
};

use crate::http::response::{write_json, ApiError, Envelope};
use crate::http::server::AppState;

const METRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// `GET /v1/`
pub async fn welcome(State(state): State<AppState>) -> Response {
    let envelope = Envelope::new().with("status", format!("welcome to {}", state.config.api.name));
    write_json(StatusCode::OK, &envelope)
}

/// `GET /v1/health/`
pub async fn health() -> Response {
    write_json(StatusCode::OK, &Envelope::new().with("status", "healthy"))
}

/// `GET /v1/health/metrics`
pub async fn metrics(State(state): State<AppState>) -> Response {
    let mut response = state.metrics.render().into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(METRICS_CONTENT_TYPE),
    );
    response
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound
}

pub async fn method_not_allowed(method: Method) -> ApiError {
    ApiError::MethodNotAllowed(method)
}
