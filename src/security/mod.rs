//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → cors.rs (answer preflight, tag trusted origins)
//!     → rate_limit.rs (token bucket per client or global)
//!     → Pass to routing
//! ```
//!
//! # Design Decisions
//! - Both gates are axum `from_fn_with_state` middleware over `AppState`
//! - Limiter state is owned by the app, never a process-wide singleton

pub mod cors;
pub mod rate_limit;

pub use cors::{cors_middleware, TrustedOrigins};
pub use rate_limit::{rate_limit_middleware, RateLimiter};
