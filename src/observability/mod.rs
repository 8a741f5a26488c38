//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → GET /v1/health/metrics (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing outside development
//! - Request ID flows through every response
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;

pub use metrics::Metrics;
