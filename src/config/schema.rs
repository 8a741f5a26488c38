//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the API.
//! All types derive Serde traits so a config file may supply any subset of
//! fields; command-line flags are layered on top (see `cli.rs`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Root configuration for the API server.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    /// TCP port to listen on.
    pub port: u16,

    /// Deployment environment.
    pub env: Environment,

    /// Display metadata for the API.
    pub api: ApiInfo,

    /// Cross-origin settings.
    pub cors: CorsConfig,

    /// Rate limiting settings.
    pub limiter: LimiterConfig,

    /// Timeouts for the HTTP server.
    pub server: ServerConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: 4000,
            env: Environment::default(),
            api: ApiInfo::default(),
            cors: CorsConfig::default(),
            limiter: LimiterConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl ApiConfig {
    /// Address the listener binds to.
    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
    Test,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
            Environment::Test => "test",
        }
    }

    /// Whether logs should be emitted as JSON lines.
    pub fn structured_logs(&self) -> bool {
        matches!(self, Environment::Staging | Environment::Production)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "production" => Ok(Environment::Production),
            "test" => Ok(Environment::Test),
            other => Err(format!(
                "unknown environment '{}' (expected development|staging|production|test)",
                other
            )),
        }
    }
}

/// API display metadata.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ApiInfo {
    /// Name shown in the welcome message.
    pub name: String,

    /// Author of the API.
    pub author: String,
}

impl Default for ApiInfo {
    fn default() -> Self {
        Self {
            name: "inko_moko".to_string(),
            author: String::new(),
        }
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct CorsConfig {
    /// Origins allowed to read responses. Empty means deny all.
    pub trusted_origins: Vec<String>,
}

/// How rate limiter buckets are keyed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LimiterScope {
    /// One bucket per client IP address.
    #[default]
    PerClient,
    /// A single bucket shared by every client.
    Global,
}

impl FromStr for LimiterScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "per-client" => Ok(LimiterScope::PerClient),
            "global" => Ok(LimiterScope::Global),
            other => Err(format!(
                "unknown limiter scope '{}' (expected per-client|global)",
                other
            )),
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LimiterConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Token refill rate per second.
    pub rps: f64,

    /// Bucket capacity.
    pub burst: u32,

    /// Bucket keying strategy.
    pub scope: LimiterScope,

    /// Buckets idle for longer than this are dropped.
    pub idle_timeout_secs: u64,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rps: 5.0,
            burst: 10,
            scope: LimiterScope::PerClient,
            idle_timeout_secs: 180,
        }
    }
}

/// HTTP server timeouts.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Total time allowed for a single request, in seconds.
    pub request_timeout_secs: u64,

    /// Time allowed for in-flight requests to drain on shutdown, in seconds.
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            shutdown_timeout_secs: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.port, 4000);
        assert_eq!(config.env, Environment::Development);
        assert_eq!(config.api.name, "inko_moko");
        assert!(config.cors.trusted_origins.is_empty());
        assert!(config.limiter.enabled);
        assert_eq!(config.limiter.rps, 5.0);
        assert_eq!(config.limiter.burst, 10);
        assert_eq!(config.limiter.scope, LimiterScope::PerClient);
    }

    #[test]
    fn test_environment_parse() {
        assert_eq!("production".parse::<Environment>(), Ok(Environment::Production));
        assert_eq!("TEST".parse::<Environment>(), Ok(Environment::Test));
        assert!("qa".parse::<Environment>().is_err());
        assert!(Environment::Production.structured_logs());
        assert!(!Environment::Development.structured_logs());
    }

    #[test]
    fn test_limiter_scope_parse() {
        assert_eq!("per-client".parse::<LimiterScope>(), Ok(LimiterScope::PerClient));
        assert_eq!("Global".parse::<LimiterScope>(), Ok(LimiterScope::Global));
        assert!("client".parse::<LimiterScope>().is_err());
    }

    #[test]
    fn test_partial_toml() {
        let config: ApiConfig = toml::from_str(
            r#"
            env = "staging"

            [limiter]
            burst = 3
            scope = "global"
            "#,
        )
        .unwrap();

        assert_eq!(config.env, Environment::Staging);
        assert_eq!(config.limiter.burst, 3);
        assert_eq!(config.limiter.scope, LimiterScope::Global);
        assert_eq!(config.limiter.rps, 5.0);
        assert_eq!(config.api.name, "inko_moko");
    }
}
