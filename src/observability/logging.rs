//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the global tracing subscriber once at startup
//! - Pick the output format from the environment
//!
//! # Design Decisions
//! - Uses the tracing crate for structured logging
//! - JSON format for staging/production, pretty format otherwise
//! - `RUST_LOG` overrides the default filter

use thiserror::Error;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Environment;

#[derive(Debug, Error)]
#[error("failed to initialize logging: {0}")]
pub struct LoggingError(#[from] tracing_subscriber::util::TryInitError);

/// Default filter directives for an environment.
pub fn default_directives(env: Environment) -> &'static str {
    match env {
        Environment::Development => "inko_moko_api=debug,tower_http=debug",
        Environment::Test => "inko_moko_api=warn",
        Environment::Staging | Environment::Production => "inko_moko_api=info,tower_http=info",
    }
}

/// Install the global subscriber.
pub fn init_logging(env: Environment) -> Result<(), LoggingError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_directives(env).into());

    let json = env.structured_logs();
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json().with_current_span(false)))
        .with((!json).then(fmt::layer))
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directives_parse() {
        for env in [
            Environment::Development,
            Environment::Staging,
            Environment::Production,
            Environment::Test,
        ] {
            assert!(EnvFilter::try_new(default_directives(env)).is_ok());
        }
    }
}
