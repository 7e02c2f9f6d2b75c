//! Error types for event dispatch.

use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

use crate::reaction::ReactionError;
use pk_core::{HandlerError, PoolError};

/// Errors that abort the dispatch of a single event.
///
/// None of these stop the dispatcher itself; the event-error hook logs them
/// and the next event is processed normally.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No connection could be leased.
    #[error("failed to acquire a database connection")]
    Pool(#[from] PoolError),

    /// A command handler returned an error.
    #[error("command `{keyword}` failed")]
    Command {
        /// The keyword of the failing command.
        keyword: String,
        /// The handler's error.
        #[source]
        source: HandlerError,
    },

    /// The proxy fallthrough path returned an error.
    #[error("proxy handler failed")]
    Proxy(#[source] HandlerError),

    /// The proxy reaction path returned an error.
    #[error("reaction handler failed")]
    Reaction(#[source] HandlerError),

    /// A reaction-added payload was missing an expected field.
    #[error("malformed reaction payload")]
    MalformedReaction(#[from] ReactionError),
}

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Displays an error followed by each of its sources.
///
/// `command `help` failed: connection reset by peer`
pub struct ErrorChain<'a>(pub &'a (dyn StdError + 'static));

impl fmt::Display for ErrorChain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)?;
        let mut source = self.0.source();
        while let Some(err) = source {
            write!(f, ": {err}")?;
            source = err.source();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_chain_includes_sources() {
        let err = DispatchError::Command {
            keyword: "help".into(),
            source: anyhow::anyhow!("connection reset"),
        };
        assert_eq!(
            ErrorChain(&err).to_string(),
            "command `help` failed: connection reset"
        );
    }

    #[test]
    fn test_pool_errors_convert() {
        let err: DispatchError = PoolError::Timeout.into();
        assert_eq!(
            ErrorChain(&err).to_string(),
            "failed to acquire a database connection: timed out waiting for a pooled connection"
        );
    }
}
