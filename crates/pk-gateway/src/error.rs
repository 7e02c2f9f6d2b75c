//! Gateway errors.

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Errors that end a gateway session.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The WebSocket handshake failed.
    #[error("failed to connect to {url}")]
    Connect {
        /// The endpoint.
        url: String,
        /// The underlying error.
        #[source]
        source: tungstenite::Error,
    },

    /// The socket failed after the connection was established.
    #[error("gateway socket error")]
    Socket(#[from] tungstenite::Error),

    /// A payload could not be encoded or decoded.
    #[error("invalid gateway payload")]
    Payload(#[from] serde_json::Error),

    /// The server closed the session and reconnection is disabled or exhausted.
    #[error("gateway connection closed: {0}")]
    Closed(String),
}

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;
