//! inko-moko API library.
//!
//! A small versioned HTTP API (welcome, health, metrics) behind a CORS gate
//! and a token-bucket rate limiter.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod security;

pub use config::schema::ApiConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
