//! PluralKit Runtime - orchestration layer for the PluralKit bot.
//!
//! This crate provides:
//! - Layered configuration (`config`) and the bot token from `TOKEN`
//! - Logging setup (`logging`)
//! - The Postgres connection pool (`Database`)
//! - The runtime that connects the gateway to the dispatcher (`BotRuntime`)
//!
//! ```ignore
//! use pk_runtime::{BotRuntime, config::{Credentials, load_config}};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = BotRuntime::builder()
//!         .config(load_config()?)
//!         .commands(commands())
//!         .proxy(ProxyEngine::default())
//!         .connect(Credentials::from_env()?)
//!         .await?;
//!
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod runtime;

pub use config::{BotConfig, ConfigError, ConfigLoader, ConfigResult, Credentials};
pub use db::{Database, DbConnection};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::LoggingBuilder;
pub use runtime::{BotRuntime, BotRuntimeBuilder, StartupHook};

// Re-export tracing for use by other crates
pub use tracing;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
