//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize subsystems in dependency order
//! - Bind the listener and begin accepting traffic
//! - Hold the process until shutdown completes
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The listener binds last (traffic only when ready)

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::ApiConfig;
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};

/// Fatal errors before or while serving.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to build metrics registry: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Build the server, bind, and serve until SIGINT/SIGTERM.
pub async fn run(config: ApiConfig) -> Result<(), StartupError> {
    let address = config.bind_address();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        env = %config.env,
        port = config.port,
        api = %config.api.name,
        "Configuration loaded"
    );
    tracing::info!(
        enabled = config.limiter.enabled,
        rps = config.limiter.rps,
        burst = config.limiter.burst,
        scope = ?config.limiter.scope,
        trusted_origins = ?config.cors.trusted_origins,
        "Gates configured"
    );

    let server = HttpServer::new(config)?;

    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.clone(),
            source,
        })?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    signals::forward_to(shutdown.clone());

    server.run(listener, server_shutdown).await.map_err(StartupError::Serve)
}
