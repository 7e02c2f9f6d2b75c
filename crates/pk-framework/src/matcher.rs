//! Command matching.
//!
//! A message invokes a command when its text starts with the command prefix
//! immediately followed by a registered keyword. Keywords are tried longest
//! first, so `pk;register` resolves to `register` even when `reg` is also
//! registered.
//!
//! # Example
//!
//! ```rust,ignore
//! use pk_framework::CommandMatcher;
//!
//! let matcher = CommandMatcher::default(); // prefix "pk;"
//! if let Some(found) = matcher.match_registry("pk;member new Alice", &registry) {
//!     assert_eq!(found.command.keyword(), "member");
//!     assert_eq!(found.args, ["new", "Alice"]);
//! }
//! ```

use std::fmt;

use tracing::trace;

use pk_core::{CommandDescriptor, CommandRegistry};

/// The command prefix used when none is configured.
pub const DEFAULT_PREFIX: &str = "pk;";

/// A successful command match.
pub struct CommandMatch<'a, C> {
    /// The matched registry entry.
    pub command: &'a CommandDescriptor<C>,
    /// Argument tokens following the keyword.
    pub args: Vec<String>,
}

impl<C> fmt::Debug for CommandMatch<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandMatch")
            .field("keyword", &self.command.keyword())
            .field("args", &self.args)
            .finish()
    }
}

/// Resolves message text against the command registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandMatcher {
    prefix: String,
}

impl Default for CommandMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl CommandMatcher {
    /// Creates a matcher for the given prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Returns the command prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Matches `text` against the registry's length-descending view.
    ///
    /// The view is rebuilt on every call.
    pub fn match_registry<'a, C>(
        &self,
        text: &str,
        registry: &'a CommandRegistry<C>,
    ) -> Option<CommandMatch<'a, C>> {
        self.find(text, &registry.by_length_desc())
    }

    /// Returns the first command of `view` whose `prefix + keyword` is a
    /// literal prefix of `text`.
    ///
    /// `view` must already be ordered longest keyword first; no match is a
    /// normal outcome and yields `None`.
    pub fn find<'a, C>(
        &self,
        text: &str,
        view: &[&'a CommandDescriptor<C>],
    ) -> Option<CommandMatch<'a, C>> {
        match_command(&self.prefix, text, view)
    }
}

/// Returns the first command of `view` whose `prefix + keyword` is a
/// literal prefix of `text`, with the argument tokens that follow it.
pub fn match_command<'a, C>(
    prefix: &str,
    text: &str,
    view: &[&'a CommandDescriptor<C>],
) -> Option<CommandMatch<'a, C>> {
    let rest = text.strip_prefix(prefix)?;

    view.iter().copied().find_map(|command| {
        let remainder = rest.strip_prefix(command.keyword())?;
        trace!(keyword = command.keyword(), "Command keyword matched");
        Some(CommandMatch {
            command,
            args: split_args(remainder),
        })
    })
}

/// Splits the text following a command keyword into argument tokens.
///
/// The remainder is trimmed, then split on single spaces; consecutive spaces
/// produce empty tokens. A remainder that is empty after trimming yields no
/// arguments rather than one empty argument.
pub fn split_args(remainder: &str) -> Vec<String> {
    let mut args: Vec<String> = remainder.trim().split(' ').map(str::to_owned).collect();

    if args.len() == 1 && args[0].is_empty() {
        args.clear();
    }

    args
}
