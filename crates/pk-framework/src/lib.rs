//! # PluralKit Framework
//!
//! Event routing for the PluralKit bot.
//!
//! This layer provides:
//! - The command matcher (`pk;` prefix, longest keyword first)
//! - The raw reaction extractor for `MESSAGE_REACTION_ADD` frames
//! - The dispatcher, which leases exactly one connection per routed event
//!   and hands it to a command or to the proxy handler
//!
//! The collaborator contracts (pool, registry, proxy handler) live in
//! `pk-core`; nothing here knows about the gateway or the database driver.

pub mod dispatcher;
pub mod error;
pub mod matcher;
pub mod reaction;

pub use dispatcher::{Dispatcher, Outcome, report_event_error};
pub use error::{DispatchError, DispatchResult, ErrorChain};
pub use matcher::{CommandMatch, CommandMatcher, DEFAULT_PREFIX, match_command, split_args};
pub use reaction::{REACTION_ADD, ReactionAdd, ReactionError, extract_reaction};

/// Prelude for common imports.
pub mod prelude {
    pub use super::{CommandMatcher, DispatchError, Dispatcher, Outcome};
}
