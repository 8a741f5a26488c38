//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (assign request ID)
//!     → [CORS gate, rate limiter] (security)
//!     → [route table] (routing)
//!     → handlers.rs (welcome, health, metrics)
//!     → response.rs (envelope encoding, error mapping)
//!     → Send to client
//! ```

pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use response::{ApiError, Envelope};
pub use server::{AppState, HttpServer};
