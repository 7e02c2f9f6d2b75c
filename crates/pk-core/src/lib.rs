//! # PluralKit Core
//!
//! Core types for the PluralKit event routing substrate.
//!
//! This crate defines the data that flows through the dispatcher and the
//! contracts of the collaborators plugged into it:
//!
//! - **Events**: typed message events and raw transport frames
//!   ([`MessageEvent`], [`RawFrame`], [`InboundEvent`])
//! - **Command Registry**: keyword to handler mapping ([`CommandRegistry`])
//! - **Connection Pool**: scoped acquisition of database connections
//!   ([`ConnectionPool`])
//! - **Proxy Handler**: the fallthrough and reaction entry points of the
//!   proxying engine ([`ProxyHandler`])
//!
//! ```text
//! ┌─────────┐     ┌────────────┐     ┌──────────────────┐
//! │ Gateway │────▶│ Dispatcher │────▶│ CommandHandler   │
//! └─────────┘     └────────────┘────▶│ ProxyHandler     │
//!                       │            └──────────────────┘
//!                       ▼
//!                ┌────────────────┐
//!                │ ConnectionPool │
//!                └────────────────┘
//! ```

pub mod error;
pub mod event;
pub mod pool;
pub mod proxy;
pub mod registry;

pub use error::{HandlerError, HandlerResult, PoolError, PoolResult};
pub use event::{Author, InboundEvent, MessageEvent, RawFrame};
pub use pool::ConnectionPool;
pub use proxy::{BoxedProxyHandler, ProxyHandler};
pub use registry::{BoxedCommandHandler, CommandDescriptor, CommandHandler, CommandRegistry};

/// Prelude for common imports.
pub mod prelude {
    pub use super::{
        Author, CommandDescriptor, CommandHandler, CommandRegistry, ConnectionPool,
        HandlerResult, MessageEvent, ProxyHandler, RawFrame,
    };
}
