//! Error types shared by the collaborator contracts.
//!
//! Dispatch-level errors live in `pk-framework`; this module only defines
//! what a pool or a handler can report back.

use thiserror::Error;

// =============================================================================
// Pool Errors
// =============================================================================

/// Errors raised while leasing a connection from the pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Every connection is leased and the wait timed out.
    #[error("timed out waiting for a pooled connection")]
    Timeout,

    /// The pool has been shut down.
    #[error("connection pool is closed")]
    Closed,

    /// The backend refused or dropped the connection.
    #[error("database error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl PoolError {
    /// Wraps a backend error.
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Box::new(err))
    }
}

// =============================================================================
// Handler Errors
// =============================================================================

/// Error type returned by command and proxy handlers.
///
/// Handlers hold arbitrary business logic, so any error is accepted.
pub type HandlerError = anyhow::Error;

/// Result type for command and proxy handlers.
pub type HandlerResult = Result<(), HandlerError>;

/// Result type for pool operations.
pub type PoolResult<T> = Result<T, PoolError>;
