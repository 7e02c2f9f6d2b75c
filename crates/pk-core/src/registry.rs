//! Command registry.
//!
//! The registry maps a command keyword to its handler and two opaque metadata
//! fields (usage and description). The dispatcher only reads the keyword and
//! the handler; the metadata is carried for help output.
//!
//! # Example
//!
//! ```rust,ignore
//! use pk_core::{CommandDescriptor, CommandRegistry};
//!
//! let registry = CommandRegistry::new()
//!     .with(CommandDescriptor::new("system", SystemInfo).usage("[system]"))
//!     .with(CommandDescriptor::new("system new", SystemNew).usage("<name>"));
//! ```

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::HandlerResult;
use crate::event::MessageEvent;

// ============================================================================
// Handler Trait
// ============================================================================

/// A registered command implementation.
///
/// `C` is the pool's connection type. The connection is leased by the
/// dispatcher and released after `call` returns, whatever the result.
#[async_trait]
pub trait CommandHandler<C>: Send + Sync {
    /// Runs the command with the argument tokens that followed its keyword.
    async fn call(&self, conn: &mut C, event: &MessageEvent, args: Vec<String>) -> HandlerResult;
}

/// A type-erased command handler.
pub type BoxedCommandHandler<C> = Arc<dyn CommandHandler<C>>;

// ============================================================================
// Descriptor
// ============================================================================

/// A named registry entry.
pub struct CommandDescriptor<C> {
    keyword: String,
    handler: BoxedCommandHandler<C>,
    usage: Option<String>,
    description: Option<String>,
}

impl<C> CommandDescriptor<C> {
    /// Creates a descriptor for `keyword`.
    ///
    /// Keywords are matched case-sensitively right after the command prefix.
    pub fn new<H>(keyword: impl Into<String>, handler: H) -> Self
    where
        H: CommandHandler<C> + 'static,
    {
        Self::from_boxed(keyword, Arc::new(handler))
    }

    /// Creates a descriptor from a pre-built boxed handler.
    pub fn from_boxed(keyword: impl Into<String>, handler: BoxedCommandHandler<C>) -> Self {
        Self {
            keyword: keyword.into(),
            handler,
            usage: None,
            description: None,
        }
    }

    /// Sets the usage string.
    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
        self
    }

    /// Sets the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Returns the command keyword.
    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// Returns the handler.
    pub fn handler(&self) -> &BoxedCommandHandler<C> {
        &self.handler
    }

    /// Returns the usage string, if set.
    pub fn get_usage(&self) -> Option<&str> {
        self.usage.as_deref()
    }

    /// Returns the description, if set.
    pub fn get_description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

impl<C> Clone for CommandDescriptor<C> {
    fn clone(&self) -> Self {
        Self {
            keyword: self.keyword.clone(),
            handler: Arc::clone(&self.handler),
            usage: self.usage.clone(),
            description: self.description.clone(),
        }
    }
}

impl<C> fmt::Debug for CommandDescriptor<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("keyword", &self.keyword)
            .field("usage", &self.usage)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Registry
// ============================================================================

/// The set of registered commands, in registration order.
pub struct CommandRegistry<C> {
    commands: Vec<CommandDescriptor<C>>,
}

impl<C> Default for CommandRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> CommandRegistry<C> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    /// Adds a command.
    ///
    /// Registering a keyword twice replaces the earlier entry in place.
    pub fn register(&mut self, descriptor: CommandDescriptor<C>) {
        match self
            .commands
            .iter_mut()
            .find(|existing| existing.keyword == descriptor.keyword)
        {
            Some(existing) => *existing = descriptor,
            None => self.commands.push(descriptor),
        }
    }

    /// Adds a command (builder pattern).
    pub fn with(mut self, descriptor: CommandDescriptor<C>) -> Self {
        self.register(descriptor);
        self
    }

    /// Looks up a command by its exact keyword.
    pub fn get(&self, keyword: &str) -> Option<&CommandDescriptor<C>> {
        self.commands.iter().find(|c| c.keyword == keyword)
    }

    /// Iterates over commands in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &CommandDescriptor<C>> {
        self.commands.iter()
    }

    /// Returns the number of registered commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns whether no command is registered.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Returns the lookup view: commands ordered by keyword length, longest
    /// first.
    ///
    /// A keyword must be tried before any shorter keyword that is a string
    /// prefix of it. The sort is stable, so equal-length keywords keep their
    /// registration order.
    pub fn by_length_desc(&self) -> Vec<&CommandDescriptor<C>> {
        let mut view: Vec<_> = self.commands.iter().collect();
        view.sort_by(|a, b| b.keyword.len().cmp(&a.keyword.len()));
        view
    }
}

impl<C> Clone for CommandRegistry<C> {
    fn clone(&self) -> Self {
        Self {
            commands: self.commands.clone(),
        }
    }
}

impl<C> fmt::Debug for CommandRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.commands.iter().map(|c| &c.keyword))
            .finish()
    }
}
