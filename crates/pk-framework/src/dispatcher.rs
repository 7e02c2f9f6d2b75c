//! Event dispatcher.
//!
//! The [`Dispatcher`] is the context object every inbound event goes
//! through. It is built once at startup with its collaborators (pool,
//! command registry, proxy handler) and shared by reference across the
//! per-event tasks.
//!
//! # Routing
//!
//! For a message event:
//!
//! 1. Messages from automated authors are dropped without touching the pool
//! 2. The command matcher runs against the message text
//! 3. A matched command is called with a leased connection; dispatch stops
//! 4. Otherwise the proxy handler's fallthrough path gets the connection
//!
//! For a raw frame, the reaction extractor runs and a complete reaction is
//! handed to the proxy handler's reaction path.
//!
//! Exactly one connection is leased per routed event and dropped (returned)
//! before the dispatch call returns, whatever the handler's result.
//!
//! ```rust,ignore
//! use pk_framework::Dispatcher;
//!
//! let dispatcher = Dispatcher::new(pool, registry, Arc::new(proxy)).with_prefix("pk;");
//! dispatcher.handle(&InboundEvent::Message(event)).await;
//! ```

use std::fmt;

use tracing::{Instrument, debug, debug_span, error, trace};

use crate::error::{DispatchError, DispatchResult, ErrorChain};
use crate::matcher::CommandMatcher;
use crate::reaction::{ReactionAdd, extract_reaction};
use pk_core::{
    BoxedProxyHandler, CommandRegistry, ConnectionPool, InboundEvent, MessageEvent, RawFrame,
};

/// How an event was routed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The event carried nothing to route.
    Ignored,
    /// The command with this keyword ran.
    Command(String),
    /// The message fell through to the proxy handler.
    Proxied,
    /// The reaction was handed to the proxy handler.
    Reaction(ReactionAdd),
}

/// Routes inbound events to commands or the proxy handler.
pub struct Dispatcher<P: ConnectionPool> {
    pool: P,
    registry: CommandRegistry<P::Connection>,
    proxy: BoxedProxyHandler<P::Connection>,
    matcher: CommandMatcher,
}

impl<P: ConnectionPool> Dispatcher<P> {
    /// Creates a dispatcher using the default `pk;` prefix.
    pub fn new(
        pool: P,
        registry: CommandRegistry<P::Connection>,
        proxy: BoxedProxyHandler<P::Connection>,
    ) -> Self {
        Self {
            pool,
            registry,
            proxy,
            matcher: CommandMatcher::default(),
        }
    }

    /// Sets the command prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.matcher = CommandMatcher::new(prefix);
        self
    }

    /// Returns the command prefix.
    pub fn prefix(&self) -> &str {
        self.matcher.prefix()
    }

    /// Returns the connection pool.
    pub fn pool(&self) -> &P {
        &self.pool
    }

    /// Returns the command registry.
    pub fn registry(&self) -> &CommandRegistry<P::Connection> {
        &self.registry
    }

    /// Routes one event and reports failures through the event-error hook.
    ///
    /// Failures are logged with the event name and its arguments and then
    /// swallowed, so the caller can move on to the next event. Returns the
    /// outcome, or `None` if dispatch failed.
    pub async fn handle(&self, event: &InboundEvent) -> Option<Outcome> {
        let event_name = event.event_name();
        let span = debug_span!("dispatch", event_name);

        async {
            match self.dispatch(event).await {
                Ok(outcome) => {
                    trace!(?outcome, "Event dispatched");
                    Some(outcome)
                }
                Err(e) => {
                    report_event_error(event_name, event, &ErrorChain(&e));
                    None
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Routes one event.
    pub async fn dispatch(&self, event: &InboundEvent) -> DispatchResult<Outcome> {
        match event {
            InboundEvent::Message(message) => self.dispatch_message(message).await,
            InboundEvent::Raw(frame) => self.dispatch_raw(frame).await,
        }
    }

    /// Routes a message event to a command or to the proxy handler.
    pub async fn dispatch_message(&self, event: &MessageEvent) -> DispatchResult<Outcome> {
        if event.is_from_bot() {
            trace!(author = %event.author.id, "Ignoring message from automated author");
            return Ok(Outcome::Ignored);
        }

        if let Some(found) = self.matcher.match_registry(&event.content, &self.registry) {
            let keyword = found.command.keyword();
            debug!(command = keyword, args = ?found.args, "Command matched");

            let mut conn = self.pool.acquire().await?;
            found
                .command
                .handler()
                .call(&mut conn, event, found.args)
                .await
                .map_err(|source| DispatchError::Command {
                    keyword: keyword.to_owned(),
                    source,
                })?;

            return Ok(Outcome::Command(keyword.to_owned()));
        }

        let mut conn = self.pool.acquire().await?;
        self.proxy
            .handle_proxying(&mut conn, event)
            .await
            .map_err(DispatchError::Proxy)?;

        Ok(Outcome::Proxied)
    }

    /// Routes a raw frame to the proxy handler's reaction path.
    pub async fn dispatch_raw(&self, frame: &RawFrame) -> DispatchResult<Outcome> {
        let Some(reaction) = extract_reaction(frame)? else {
            return Ok(Outcome::Ignored);
        };

        debug!(
            user_id = %reaction.user_id,
            message_id = %reaction.message_id,
            emoji = %reaction.emoji_name,
            "Reaction added"
        );

        let mut conn = self.pool.acquire().await?;
        self.proxy
            .handle_reaction(
                &mut conn,
                &reaction.user_id,
                &reaction.message_id,
                &reaction.emoji_name,
            )
            .await
            .map_err(DispatchError::Reaction)?;

        Ok(Outcome::Reaction(reaction))
    }
}

impl<P: ConnectionPool> fmt::Debug for Dispatcher<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("prefix", &self.matcher.prefix())
            .field("commands", &self.registry)
            .finish_non_exhaustive()
    }
}

/// The event-error hook: logs a failed event with its name and arguments.
pub fn report_event_error(event_name: &str, args: &dyn fmt::Debug, error: &dyn fmt::Display) {
    error!(
        event = event_name,
        args = ?args,
        error = %error,
        "Error while handling event"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use futures::future::join_all;
    use parking_lot::Mutex;
    use tokio_test::{assert_err, assert_ok};

    use pk_core::{
        Author, CommandDescriptor, CommandHandler, HandlerResult, PoolError, PoolResult,
        ProxyHandler,
    };

    use crate::reaction::ReactionError;

    // ------------------------------------------------------------------------
    // Mocks
    // ------------------------------------------------------------------------

    #[derive(Default)]
    struct Counters {
        acquired: AtomicUsize,
        released: AtomicUsize,
    }

    impl Counters {
        fn acquired(&self) -> usize {
            self.acquired.load(Ordering::SeqCst)
        }

        fn released(&self) -> usize {
            self.released.load(Ordering::SeqCst)
        }
    }

    struct MockConn {
        counters: Arc<Counters>,
    }

    impl Drop for MockConn {
        fn drop(&mut self) {
            self.counters.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct MockPool {
        counters: Arc<Counters>,
        fail: bool,
    }

    #[async_trait]
    impl ConnectionPool for MockPool {
        type Connection = MockConn;

        async fn acquire(&self) -> PoolResult<MockConn> {
            if self.fail {
                return Err(PoolError::Timeout);
            }
            tokio::task::yield_now().await;
            self.counters.acquired.fetch_add(1, Ordering::SeqCst);
            Ok(MockConn {
                counters: Arc::clone(&self.counters),
            })
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Command(&'static str, Vec<String>),
        Proxy(String),
        Reaction(String, String, String),
    }

    type Calls = Arc<Mutex<Vec<Call>>>;

    struct RecordingCommand {
        name: &'static str,
        calls: Calls,
        fail: bool,
    }

    #[async_trait]
    impl CommandHandler<MockConn> for RecordingCommand {
        async fn call(
            &self,
            _conn: &mut MockConn,
            _event: &MessageEvent,
            args: Vec<String>,
        ) -> HandlerResult {
            tokio::task::yield_now().await;
            self.calls.lock().push(Call::Command(self.name, args));
            if self.fail {
                anyhow::bail!("{} exploded", self.name);
            }
            Ok(())
        }
    }

    struct RecordingProxy {
        calls: Calls,
    }

    #[async_trait]
    impl ProxyHandler<MockConn> for RecordingProxy {
        async fn handle_proxying(&self, _conn: &mut MockConn, event: &MessageEvent) -> HandlerResult {
            self.calls.lock().push(Call::Proxy(event.content.clone()));
            if event.content == "boom" {
                anyhow::bail!("proxy exploded");
            }
            Ok(())
        }

        async fn handle_reaction(
            &self,
            _conn: &mut MockConn,
            user_id: &str,
            message_id: &str,
            emoji_name: &str,
        ) -> HandlerResult {
            self.calls.lock().push(Call::Reaction(
                user_id.to_owned(),
                message_id.to_owned(),
                emoji_name.to_owned(),
            ));
            Ok(())
        }
    }

    struct Fixture {
        dispatcher: Dispatcher<MockPool>,
        counters: Arc<Counters>,
        calls: Calls,
    }

    fn fixture(pool_fails: bool) -> Fixture {
        let counters = Arc::new(Counters::default());
        let calls: Calls = Arc::default();

        let command = |name, fail| RecordingCommand {
            name,
            calls: Arc::clone(&calls),
            fail,
        };
        let registry = CommandRegistry::new()
            .with(CommandDescriptor::new("reg", command("reg", false)))
            .with(CommandDescriptor::new("register", command("register", false)))
            .with(CommandDescriptor::new("help", command("help", false)))
            .with(CommandDescriptor::new("fail", command("fail", true)));

        let pool = MockPool {
            counters: Arc::clone(&counters),
            fail: pool_fails,
        };
        let proxy = Arc::new(RecordingProxy {
            calls: Arc::clone(&calls),
        });

        Fixture {
            dispatcher: Dispatcher::new(pool, registry, proxy),
            counters,
            calls,
        }
    }

    fn message(content: &str) -> MessageEvent {
        MessageEvent::new("100", "200", Author::new("42", "alice"), content)
    }

    fn bot_message(content: &str) -> MessageEvent {
        MessageEvent::new("101", "200", Author::new("43", "webhook").automated(), content)
    }

    fn reaction_frame(user_id: &str, message_id: &str, emoji: &str) -> RawFrame {
        RawFrame::Text(
            serde_json::json!({
                "op": 0,
                "t": "MESSAGE_REACTION_ADD",
                "d": { "user_id": user_id, "message_id": message_id, "emoji": { "name": emoji } }
            })
            .to_string(),
        )
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    // ------------------------------------------------------------------------
    // Message routing
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_longest_command_is_invoked() {
        let f = fixture(false);
        let outcome = assert_ok!(f.dispatcher.dispatch_message(&message("pk;register foo")).await);

        assert_eq!(outcome, Outcome::Command("register".into()));
        assert_eq!(*f.calls.lock(), vec![Call::Command("register", args(&["foo"]))]);
    }

    #[tokio::test]
    async fn test_command_without_arguments_gets_empty_args() {
        let f = fixture(false);
        assert_ok!(f.dispatcher.dispatch_message(&message("pk;help")).await);

        assert_eq!(*f.calls.lock(), vec![Call::Command("help", Vec::new())]);
    }

    #[tokio::test]
    async fn test_unprefixed_message_falls_through_to_proxy() {
        let f = fixture(false);
        let outcome = assert_ok!(f.dispatcher.dispatch_message(&message("help me")).await);

        assert_eq!(outcome, Outcome::Proxied);
        assert_eq!(*f.calls.lock(), vec![Call::Proxy("help me".into())]);
    }

    #[tokio::test]
    async fn test_unknown_command_falls_through_to_proxy() {
        let f = fixture(false);
        let outcome = assert_ok!(f.dispatcher.dispatch_message(&message("pk;unknown")).await);

        assert_eq!(outcome, Outcome::Proxied);
        assert_eq!(f.counters.acquired(), 1);
    }

    #[tokio::test]
    async fn test_automated_author_is_ignored() {
        let f = fixture(false);
        for content in ["pk;help", "hello"] {
            let outcome = assert_ok!(f.dispatcher.dispatch_message(&bot_message(content)).await);
            assert_eq!(outcome, Outcome::Ignored);
        }

        assert!(f.calls.lock().is_empty());
        assert_eq!(f.counters.acquired(), 0);
    }

    #[tokio::test]
    async fn test_custom_prefix() {
        let f = fixture(false);
        let dispatcher = f.dispatcher.with_prefix("!");

        let outcome = assert_ok!(dispatcher.dispatch_message(&message("!help")).await);
        assert_eq!(outcome, Outcome::Command("help".into()));

        let outcome = assert_ok!(dispatcher.dispatch_message(&message("pk;help")).await);
        assert_eq!(outcome, Outcome::Proxied);
    }

    // ------------------------------------------------------------------------
    // Connection scoping
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_connection_released_after_command() {
        let f = fixture(false);
        assert_ok!(f.dispatcher.dispatch_message(&message("pk;help")).await);

        assert_eq!(f.counters.acquired(), 1);
        assert_eq!(f.counters.released(), 1);
    }

    #[tokio::test]
    async fn test_connection_released_after_failing_command() {
        let f = fixture(false);
        let err = assert_err!(f.dispatcher.dispatch_message(&message("pk;fail now")).await);

        assert!(matches!(err, DispatchError::Command { ref keyword, .. } if keyword == "fail"));
        assert_eq!(f.counters.acquired(), 1);
        assert_eq!(f.counters.released(), 1);
    }

    #[tokio::test]
    async fn test_connection_released_after_failing_proxy() {
        let f = fixture(false);
        let err = assert_err!(f.dispatcher.dispatch_message(&message("boom")).await);

        assert!(matches!(err, DispatchError::Proxy(_)));
        assert_eq!(f.counters.acquired(), 1);
        assert_eq!(f.counters.released(), 1);
    }

    #[tokio::test]
    async fn test_pool_failure_skips_handlers() {
        let f = fixture(true);

        let err = assert_err!(f.dispatcher.dispatch_message(&message("pk;help")).await);
        assert!(matches!(err, DispatchError::Pool(PoolError::Timeout)));

        let err = assert_err!(f.dispatcher.dispatch_raw(&reaction_frame("1", "2", "x")).await);
        assert!(matches!(err, DispatchError::Pool(_)));

        assert!(f.calls.lock().is_empty());
        assert_eq!(f.counters.released(), 0);
    }

    #[tokio::test]
    async fn test_acquire_release_pairs_across_interleaved_events() {
        let f = fixture(false);

        let events: Vec<InboundEvent> = vec![
            message("pk;help").into(),
            message("pk;fail").into(),
            message("just talking").into(),
            message("boom").into(),
            bot_message("pk;help").into(),
            reaction_frame("1", "2", "❌").into(),
            RawFrame::from("pong").into(),
            message("pk;register a b").into(),
            message("pk;fail again").into(),
        ];

        let results = join_all(events.iter().map(|e| f.dispatcher.dispatch(e))).await;

        let failures = results.iter().filter(|r| r.is_err()).count();
        let ignored = results
            .iter()
            .filter(|r| matches!(r, Ok(Outcome::Ignored)))
            .count();

        assert_eq!(failures, 3);
        assert_eq!(ignored, 2);
        assert_eq!(f.counters.acquired(), events.len() - ignored);
        assert_eq!(f.counters.acquired(), f.counters.released());
    }

    // ------------------------------------------------------------------------
    // Raw frames
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_non_json_frame_takes_no_action() {
        let f = fixture(false);
        let outcome = assert_ok!(f.dispatcher.dispatch_raw(&RawFrame::from("pong")).await);

        assert_eq!(outcome, Outcome::Ignored);
        assert!(f.calls.lock().is_empty());
        assert_eq!(f.counters.acquired(), 0);
    }

    #[tokio::test]
    async fn test_reaction_frame_reaches_reaction_path_once() {
        let f = fixture(false);
        let outcome = assert_ok!(f.dispatcher.dispatch_raw(&reaction_frame("1", "2", "👍")).await);

        assert!(matches!(outcome, Outcome::Reaction(_)));
        assert_eq!(
            *f.calls.lock(),
            vec![Call::Reaction("1".into(), "2".into(), "👍".into())]
        );
        assert_eq!(f.counters.acquired(), 1);
        assert_eq!(f.counters.released(), 1);
    }

    #[tokio::test]
    async fn test_malformed_reaction_is_dropped_without_connection() {
        let f = fixture(false);
        let frame = RawFrame::from(r#"{"t":"MESSAGE_REACTION_ADD","d":{"user_id":"1"}}"#);

        let err = assert_err!(f.dispatcher.dispatch_raw(&frame).await);
        assert!(matches!(err, DispatchError::MalformedReaction(_)));
        assert_eq!(f.counters.acquired(), 0);
    }

    #[tokio::test]
    async fn test_non_object_reaction_data_is_reported() {
        let f = fixture(false);
        let frame = RawFrame::from(r#"{"t":"MESSAGE_REACTION_ADD","d":"1"}"#);

        let err = assert_err!(f.dispatcher.dispatch_raw(&frame).await);
        assert!(matches!(
            err,
            DispatchError::MalformedReaction(ReactionError::NotAnObject)
        ));
        assert_eq!(f.counters.acquired(), 0);
    }

    // ------------------------------------------------------------------------
    // Error hook
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_handle_swallows_failures_and_continues() {
        let f = fixture(false);

        assert_eq!(f.dispatcher.handle(&message("pk;fail").into()).await, None);
        assert_eq!(
            f.dispatcher.handle(&message("pk;help").into()).await,
            Some(Outcome::Command("help".into()))
        );
        assert_eq!(f.counters.acquired(), 2);
        assert_eq!(f.counters.released(), 2);
    }

    #[test]
    fn test_debug_lists_commands() {
        let f = fixture(false);
        let debug = format!("{:?}", f.dispatcher);
        assert!(debug.contains("pk;"));
        assert!(debug.contains("register"));
    }
}
