//! inko-moko API server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ request id ─▶ trace ─▶ metrics ─▶ catch panic ─▶ timeout
//!                                                                        │
//!                                                                        ▼
//!     Client Response                                                CORS gate
//!     ◀──────────────  JSON envelope ◀── handler ◀── router ◀── rate limiter
//! ```
//!
//! Configuration comes from flags, environment variables and an optional
//! TOML file; see `inko-moko-api --help`.

use std::process::ExitCode;

use clap::Parser;

use inko_moko_api::config::Cli;
use inko_moko_api::lifecycle::startup;
use inko_moko_api::observability::logging;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Cli::parse().into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // No logger exists yet if this fails.
    if let Err(e) = logging::init_logging(config.env) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    match startup::run(config).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Fatal startup error");
            ExitCode::FAILURE
        }
    }
}
