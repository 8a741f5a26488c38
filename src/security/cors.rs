//! CORS gate.
//!
//! # Responsibilities
//! - Echo `Access-Control-Allow-Origin` for trusted origins only
//! - Answer preflight requests without reaching the router
//! - Always vary caches on `Origin`
//!
//! # Design Decisions
//! - Default deny: unknown origins get no CORS headers and no error, the
//!   browser enforces the omission
//! - Exact string match on the origin, no wildcards

use std::collections::HashSet;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::CorsConfig;
use crate::http::server::AppState;

const ALLOWED_METHODS: &str = "OPTIONS, PUT, PATCH, DELETE";
const ALLOWED_HEADERS: &str = "Authorization, Content-Type";

/// Set of origins allowed to make cross-origin requests.
#[derive(Debug, Clone, Default)]
pub struct TrustedOrigins {
    origins: HashSet<String>,
}

impl TrustedOrigins {
    pub fn new(config: &CorsConfig) -> Self {
        Self {
            origins: config.trusted_origins.iter().cloned().collect(),
        }
    }

    pub fn is_trusted(&self, origin: &str) -> bool {
        self.origins.contains(origin)
    }

    /// Returns the request origin if it is trusted.
    fn allowed<'a>(&self, headers: &'a HeaderMap) -> Option<&'a HeaderValue> {
        headers
            .get(header::ORIGIN)
            .filter(|v| v.to_str().map(|o| self.is_trusted(o)).unwrap_or(false))
    }
}

fn is_preflight<B>(request: &Request<B>) -> bool {
    request.method() == Method::OPTIONS
        && request.headers().contains_key(header::ACCESS_CONTROL_REQUEST_METHOD)
}

/// Middleware applying the CORS policy.
pub async fn cors_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let allowed_origin = state.origins.allowed(request.headers()).cloned();

    if is_preflight(&request) {
        tracing::debug!(
            origin = ?request.headers().get(header::ORIGIN),
            trusted = allowed_origin.is_some(),
            "CORS preflight"
        );

        let mut response = StatusCode::OK.into_response();
        let headers = response.headers_mut();
        headers.append(header::VARY, HeaderValue::from_static("Origin"));
        headers.append(
            header::VARY,
            HeaderValue::from_static("Access-Control-Request-Method"),
        );
        if let Some(origin) = allowed_origin {
            headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static(ALLOWED_METHODS),
            );
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static(ALLOWED_HEADERS),
            );
        }
        return response;
    }

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.append(header::VARY, HeaderValue::from_static("Origin"));
    if let Some(origin) = allowed_origin {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    }
    response
}
