//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the application state (config, CORS allow-list, limiter, metrics)
//! - Wire up middleware in order: request id, tracing, metrics, panic
//!   recovery, timeout, CORS, rate limiting
//! - Serve on a listener until shutdown is signalled
//! - Run the idle-bucket sweeper alongside the server

use std::any::Any;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};
use metrics_exporter_prometheus::BuildError;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{catch_panic::CatchPanicLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ApiConfig;
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::http::response::ApiError;
use crate::observability::Metrics;
use crate::routing::api_routes;
use crate::security::{cors_middleware, rate_limit, rate_limit_middleware, RateLimiter, TrustedOrigins};

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Application state injected into handlers and middleware.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ApiConfig>,
    pub origins: Arc<TrustedOrigins>,
    pub limiter: Arc<RateLimiter>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(config: ApiConfig) -> Result<Self, BuildError> {
        let metrics = Metrics::new(config.env)?;
        Ok(Self {
            origins: Arc::new(TrustedOrigins::new(&config.cors)),
            limiter: Arc::new(RateLimiter::new(&config.limiter)),
            metrics: Arc::new(metrics),
            config: Arc::new(config),
        })
    }
}

/// HTTP server for the API.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ApiConfig) -> Result<Self, BuildError> {
        let state = AppState::new(config)?;
        Ok(Self::with_state(state))
    }

    pub fn with_state(state: AppState) -> Self {
        let router = Self::build_router(state.clone());
        Self { router, state }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Layers added last run first, so the list below reads inside-out.
    #[allow(deprecated)]
    pub fn build_router(state: AppState) -> Router {
        let timeout = Duration::from_secs(state.config.server.request_timeout_secs);

        api_routes()
            .layer(middleware::from_fn_with_state(state.clone(), rate_limit_middleware))
            .layer(middleware::from_fn_with_state(state.clone(), cors_middleware))
            .layer(TimeoutLayer::new(timeout))
            .layer(CatchPanicLayer::custom(handle_panic))
            .layer(middleware::from_fn_with_state(state.clone(), track_metrics))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = %request_id(request),
                )
            }))
            .layer(set_request_id_layer())
            .with_state(state)
    }

    /// The router, for driving the app without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener until a
    /// shutdown signal arrives.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let sweeper = self.state.limiter.enabled().then(|| {
            tokio::spawn(rate_limit::run_sweeper(
                self.state.limiter.clone(),
                SWEEP_INTERVAL,
            ))
        });

        let mut drain = shutdown.resubscribe();
        let drain_timeout = Duration::from_secs(self.state.config.server.shutdown_timeout_secs);

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        let serve = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .into_future();

        let result = tokio::select! {
            result = serve => result,
            _ = async {
                let _ = drain.recv().await;
                tokio::time::sleep(drain_timeout).await;
            } => {
                tracing::warn!(timeout_secs = drain_timeout.as_secs(), "Graceful shutdown timed out");
                Ok(())
            }
        };

        if let Some(sweeper) = sweeper {
            sweeper.abort();
        }

        tracing::info!("HTTP server stopped");
        result
    }
}

/// Count every response, including rejections from the gates.
async fn track_metrics(State(state): State<AppState>, request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();

    let response = next.run(request).await;
    state
        .metrics
        .record_request(method.as_str(), response.status().as_u16(), start);
    response
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    ApiError::Internal(format!("handler panicked: {}", detail)).into_response()
}
