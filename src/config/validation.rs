//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde and clap handle syntactic checks)
//! - Validate value ranges (port, limiter rate and burst, timeouts)
//! - Check that trusted CORS origins look like `scheme://host[:port]`
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: `&ApiConfig → Result<(), Vec<ValidationError>>`
//! - Runs before the config is accepted into the system

use thiserror::Error;

use crate::config::schema::ApiConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("port must be between 1 and 65535")]
    InvalidPort,

    #[error("limiter rps must be a positive number, got {0}")]
    InvalidRps(f64),

    #[error("limiter burst must be greater than zero")]
    InvalidBurst,

    #[error("api name must not be empty")]
    EmptyApiName,

    #[error("trusted origin '{0}' must be of the form scheme://host[:port]")]
    InvalidOrigin(String),

    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &ApiConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.port == 0 {
        errors.push(ValidationError::InvalidPort);
    }

    if !(config.limiter.rps.is_finite() && config.limiter.rps > 0.0) {
        errors.push(ValidationError::InvalidRps(config.limiter.rps));
    }

    if config.limiter.burst == 0 {
        errors.push(ValidationError::InvalidBurst);
    }

    if config.api.name.trim().is_empty() {
        errors.push(ValidationError::EmptyApiName);
    }

    for origin in &config.cors.trusted_origins {
        if !is_valid_origin(origin) {
            errors.push(ValidationError::InvalidOrigin(origin.clone()));
        }
    }

    if config.limiter.idle_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("limiter idle timeout"));
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("request timeout"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

// Browsers send the origin without a path or trailing slash.
fn is_valid_origin(origin: &str) -> bool {
    let Some((scheme, rest)) = origin.split_once("://") else {
        return false;
    };
    !scheme.is_empty()
        && scheme.chars().all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.')
        && !rest.is_empty()
        && !rest.contains('/')
        && !rest.chars().any(char::is_whitespace)
}
