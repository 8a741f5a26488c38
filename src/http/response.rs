//! Response envelopes and error mapping.
//!
//! # Responsibilities
//! - Serialize envelopes as tab-indented JSON with a trailing newline
//! - Map API errors to status codes and `{"error": ...}` envelopes
//!
//! # Design Decisions
//! - Every JSON body, success or error, goes through [`write_json`]
//! - Server-side failures are logged here, with the detail kept out of the body

use std::collections::BTreeMap;

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{ser::PrettyFormatter, Serializer, Value};
use thiserror::Error;

/// Top-level JSON object wrapping a handler's payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Envelope(BTreeMap<String, Value>);

impl Envelope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }
}

/// Encode `data` the way every endpoint does: tab indent, trailing newline.
pub fn encode_json<T: Serialize + ?Sized>(data: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut buf = Vec::with_capacity(64);
    let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"\t"));
    data.serialize(&mut ser)?;
    buf.push(b'\n');
    Ok(buf)
}

/// Build a JSON response, or a 500 if encoding fails.
pub fn write_json<T: Serialize + ?Sized>(status: StatusCode, data: &T) -> Response {
    match encode_json(data) {
        Ok(body) => json_response(status, body),
        Err(e) => ApiError::Encode(e).into_response(),
    }
}

fn json_response(status: StatusCode, body: Vec<u8>) -> Response {
    let mut response = (status, body).into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}

/// Errors surfaced to HTTP clients.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("the requested resource could not be found")]
    NotFound,

    #[error("the {0} method is not supported for this resource")]
    MethodNotAllowed(Method),

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("{0}")]
    Internal(String),
}

const SERVER_ERROR_MESSAGE: &str =
    "the server encountered a problem and could not process your request";

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Encode(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message placed in the `error` field of the envelope.
    pub fn client_message(&self) -> String {
        match self {
            ApiError::Encode(_) | ApiError::Internal(_) => SERVER_ERROR_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let envelope = Envelope::new().with("error", self.client_message());
        // A string-only map cannot fail to encode.
        let body = encode_json(&envelope).unwrap_or_default();
        json_response(status, body)
    }
}
