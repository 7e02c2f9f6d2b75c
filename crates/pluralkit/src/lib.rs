//! # PluralKit
//!
//! Event routing for the PluralKit proxy bot.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────┐  raw frame   ┌────────────┐  reaction added   ┌──────────────┐
//! │ Gateway │─────────────▶│            │──────────────────▶│ ProxyHandler │
//! │         │  message     │ Dispatcher │  no command       │              │
//! └─────────┘─────────────▶│            │──────────────────▶└──────────────┘
//!                          │            │  `pk;<keyword>`   ┌──────────────┐
//!                          └────────────┘──────────────────▶│   Command    │
//!                                 │                         └──────────────┘
//!                                 ▼ one connection per event
//!                          ┌────────────────┐
//!                          │ ConnectionPool │
//!                          └────────────────┘
//! ```
//!
//! - **Gateway**: keeps the session alive and forwards every frame
//! - **Dispatcher**: matches commands (longest keyword first), extracts
//!   reactions, leases a connection, and reports failures without stopping
//! - **Runtime**: config, logging, the Postgres pool, and one task per event
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pluralkit::prelude::*;
//!
//! struct Help;
//!
//! #[async_trait::async_trait]
//! impl CommandHandler<DbConnection> for Help {
//!     async fn call(&self, conn: &mut DbConnection, event: &MessageEvent, args: Vec<String>) -> HandlerResult {
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config()?;
//!     let runtime = BotRuntime::builder()
//!         .config(config)
//!         .command(CommandDescriptor::new("help", Help))
//!         .proxy(ProxyEngine::default())
//!         .connect(Credentials::from_env()?)
//!         .await?;
//!
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: TOML configuration files (default)
//! - `json-log`: JSON log output

pub use pk_core as core;
pub use pk_framework as framework;
pub use pk_gateway as gateway;
pub use pk_runtime as runtime;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use pk_core::{
        Author, CommandDescriptor, CommandHandler, CommandRegistry, ConnectionPool,
        HandlerResult, InboundEvent, MessageEvent, ProxyHandler, RawFrame,
    };

    pub use pk_framework::{DispatchError, Dispatcher, Outcome};

    pub use pk_runtime::config::{BotConfig, ConfigLoader, Credentials, load_config};
    pub use pk_runtime::{BotRuntime, Database, DbConnection, StartupHook};

    pub use pk_runtime::tracing::{debug, error, info, trace, warn};
}
