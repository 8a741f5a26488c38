//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults (schema.rs)
//!     → optional TOML file (loader.rs)
//!     → command-line flags / env vars (cli.rs)
//!     → validation.rs (semantic checks)
//!     → ApiConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults so the server starts with no flags at all
//! - Validation separates syntactic (serde/clap) from semantic checks

pub mod cli;
pub mod loader;
pub mod schema;
pub mod validation;

pub use cli::Cli;
pub use loader::ConfigError;
pub use schema::{ApiConfig, ApiInfo, CorsConfig, Environment, LimiterConfig, LimiterScope, ServerConfig};
pub use validation::{validate_config, ValidationError};
