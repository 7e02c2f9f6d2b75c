//! Runtime error types.

use thiserror::Error;

use crate::config::ConfigError;
use pk_core::PoolError;
use pk_gateway::GatewayError;

/// Errors that stop the bot from starting or running.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The database pool could not be opened.
    #[error("Failed to connect to the database: {0}")]
    Database(#[from] sqlx::Error),

    /// No connection could be leased for the startup hook.
    #[error("Failed to acquire a startup connection: {0}")]
    Pool(#[from] PoolError),

    /// The startup hook failed.
    #[error("Startup hook failed")]
    Startup(#[source] anyhow::Error),

    /// The builder was finished without a proxy handler.
    #[error("No proxy handler registered")]
    MissingProxyHandler,

    /// The gateway session ended with an error.
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
