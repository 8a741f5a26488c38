//! Command-line flags.
//!
//! Every flag is optional and may also come from an environment variable.
//! Values given here override the config file, which overrides the defaults.

use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::config::loader::{load_config_file, ConfigError};
use crate::config::schema::{ApiConfig, Environment, LimiterScope};
use crate::config::validation::validate_config;

#[derive(Debug, Default, Parser)]
#[command(name = "inko-moko-api")]
#[command(version, about = "Welcome, health and metrics API with CORS and rate limiting", long_about = None)]
pub struct Cli {
    /// Optional TOML config file
    #[arg(long, env = "API_CONFIG")]
    pub config: Option<PathBuf>,

    /// API server port [default: 4000]
    #[arg(long, env = "API_PORT")]
    pub port: Option<u16>,

    /// Environment (development|staging|production|test) [default: development]
    #[arg(long, env = "API_ENV")]
    pub env: Option<Environment>,

    /// API name shown in the welcome message [default: inko_moko]
    #[arg(long, env = "API_NAME")]
    pub api_name: Option<String>,

    /// API author
    #[arg(long, env = "API_AUTHOR")]
    pub api_author: Option<String>,

    /// Trusted CORS origins (space separated)
    #[arg(long, env = "API_CORS_TRUSTED_ORIGINS")]
    pub cors_trusted_origins: Option<String>,

    /// Rate limiter maximum requests per second [default: 5]
    #[arg(long, env = "API_LIMITER_RPS")]
    pub limiter_rps: Option<f64>,

    /// Rate limiter maximum burst [default: 10]
    #[arg(long, env = "API_LIMITER_BURST")]
    pub limiter_burst: Option<u32>,

    /// Enable rate limiter [default: true]
    #[arg(long, env = "API_LIMITER_ENABLED", action = ArgAction::Set)]
    pub limiter_enabled: Option<bool>,

    /// Rate limiter keying (per-client|global) [default: per-client]
    #[arg(long, env = "API_LIMITER_SCOPE")]
    pub limiter_scope: Option<LimiterScope>,
}

impl Cli {
    /// Resolve the final configuration: defaults, then file, then flags.
    pub fn into_config(self) -> Result<ApiConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config_file(path)?,
            None => ApiConfig::default(),
        };

        self.apply(&mut config);
        validate_config(&config).map_err(ConfigError::Validation)?;

        Ok(config)
    }

    fn apply(self, config: &mut ApiConfig) {
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(env) = self.env {
            config.env = env;
        }
        if let Some(name) = self.api_name {
            config.api.name = name;
        }
        if let Some(author) = self.api_author {
            config.api.author = author;
        }
        if let Some(origins) = self.cors_trusted_origins {
            config.cors.trusted_origins = origins.split_whitespace().map(String::from).collect();
        }
        if let Some(rps) = self.limiter_rps {
            config.limiter.rps = rps;
        }
        if let Some(burst) = self.limiter_burst {
            config.limiter.burst = burst;
        }
        if let Some(enabled) = self.limiter_enabled {
            config.limiter.enabled = enabled;
        }
        if let Some(scope) = self.limiter_scope {
            config.limiter.scope = scope;
        }
    }
}
