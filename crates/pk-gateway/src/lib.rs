//! # PluralKit Gateway
//!
//! WebSocket client for the chat gateway.
//!
//! The client keeps one session alive (hello, identify, heartbeat), forwards
//! every received frame raw, decodes the dispatches the bot cares about
//! (`READY`, `MESSAGE_CREATE`), and reconnects with exponential backoff when
//! the session is lost.

pub mod client;
pub mod config;
pub mod error;
pub mod payload;

pub use client::{Gateway, GatewayHandler};
pub use config::{DEFAULT_GATEWAY_URL, DEFAULT_INTENTS, GatewayConfig};
pub use error::{GatewayError, GatewayResult};
pub use payload::{CurrentUser, GatewayPayload};
