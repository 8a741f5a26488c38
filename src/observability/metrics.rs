//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define API metrics (request count, latency, rate limiting)
//! - Render the Prometheus text exposition for the metrics endpoint
//!
//! # Metrics
//! - `http_requests_total` (counter): requests by method, status
//! - `http_request_duration_seconds` (histogram): latency distribution
//! - `http_rate_limited_total` (counter): requests rejected by the limiter
//! - `app_info` (gauge): always 1, labelled with version and environment
//!
//! # Design Decisions
//! - Each `Metrics` owns its own recorder; nothing is installed globally, so
//!   several apps can live in one process
//! - Histogram buckets tuned for small, fast handlers

use std::time::Instant;

use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram,
    with_local_recorder, Unit,
};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder};

use crate::config::Environment;

pub const REQUESTS_TOTAL: &str = "http_requests_total";
pub const REQUEST_DURATION: &str = "http_request_duration_seconds";
pub const RATE_LIMITED_TOTAL: &str = "http_rate_limited_total";
pub const APP_INFO: &str = "app_info";

const LATENCY_BUCKETS: &[f64] = &[
    0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
];

/// Metrics registry owned by the application state.
pub struct Metrics {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
}

impl Metrics {
    pub fn new(env: Environment) -> Result<Self, BuildError> {
        let recorder = PrometheusBuilder::new()
            .set_buckets_for_metric(Matcher::Full(REQUEST_DURATION.to_string()), LATENCY_BUCKETS)?
            .build_recorder();
        let handle = recorder.handle();
        let metrics = Self { recorder, handle };

        metrics.with(|| {
            describe_counter!(REQUESTS_TOTAL, "Total HTTP requests by method and status.");
            describe_histogram!(
                REQUEST_DURATION,
                Unit::Seconds,
                "HTTP request latency by method and status."
            );
            describe_counter!(RATE_LIMITED_TOTAL, "Requests rejected by the rate limiter.");
            describe_gauge!(APP_INFO, "Build and environment information.");

            gauge!(APP_INFO, "version" => env!("CARGO_PKG_VERSION"), "env" => env.as_str()).set(1.0);
            counter!(RATE_LIMITED_TOTAL).absolute(0);
        });

        Ok(metrics)
    }

    fn with<T>(&self, f: impl FnOnce() -> T) -> T {
        with_local_recorder(&self.recorder, f)
    }

    /// Record a completed request.
    pub fn record_request(&self, method: &str, status: u16, start: Instant) {
        let elapsed = start.elapsed().as_secs_f64();
        let method = method.to_string();
        let status = status.to_string();
        self.with(|| {
            counter!(REQUESTS_TOTAL, "method" => method.clone(), "status" => status.clone()).increment(1);
            histogram!(REQUEST_DURATION, "method" => method, "status" => status).record(elapsed);
        });
    }

    /// Record a request rejected by the rate limiter.
    pub fn record_rate_limited(&self) {
        self.with(|| counter!(RATE_LIMITED_TOTAL).increment(1));
    }

    /// Current registry state in the Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}
