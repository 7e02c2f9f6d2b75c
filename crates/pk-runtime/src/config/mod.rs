//! Configuration module for the PluralKit runtime.
//!
//! Layered loading (defaults, TOML files, `PK_*` environment variables,
//! programmatic overrides) with validation, plus the bot token read from
//! the environment.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Credentials, Profile, load_config};
pub use schema::{
    BotConfig, CommandConfig, DatabaseConfig, GatewaySettings, LogFormat, LogLevel, LogOutput,
    LoggingConfig,
};
pub use validation::validate_config;

// Providers for `ConfigLoader::merge`.
pub use figment::providers::Serialized;
