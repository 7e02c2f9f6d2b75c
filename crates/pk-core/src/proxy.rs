//! Proxy handler contract.
//!
//! The proxy engine decides whether a message should be reposted under a
//! member persona, and reacts to emoji on previously proxied messages. Both
//! entry points receive a connection leased for the duration of the call.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::HandlerResult;
use crate::event::MessageEvent;

/// Entry points of the proxying engine.
#[async_trait]
pub trait ProxyHandler<C>: Send + Sync {
    /// Handles a message that did not invoke any command.
    async fn handle_proxying(&self, conn: &mut C, event: &MessageEvent) -> HandlerResult;

    /// Handles a reaction added to any message, cached or not.
    async fn handle_reaction(
        &self,
        conn: &mut C,
        user_id: &str,
        message_id: &str,
        emoji_name: &str,
    ) -> HandlerResult;
}

/// A type-erased proxy handler.
pub type BoxedProxyHandler<C> = Arc<dyn ProxyHandler<C>>;
