//! Bot runtime: wires config, pool, dispatcher and gateway together.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use pk_runtime::{BotRuntime, config::{Credentials, load_config}};
//!
//! let runtime = BotRuntime::builder()
//!     .config(load_config()?)
//!     .command(CommandDescriptor::new("help", Help).usage("[command]"))
//!     .proxy(ProxyEngine::new())
//!     .on_startup(CreateTables)
//!     .connect(Credentials::from_env()?)
//!     .await?;
//!
//! // Runs until Ctrl+C or SIGTERM
//! runtime.run().await?;
//! ```
//!
//! Every event the gateway delivers is dispatched in its own task, so a slow
//! handler never holds up the socket or other events.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{BotConfig, Credentials};
use crate::db::{Database, DbConnection};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;
use pk_core::{
    BoxedProxyHandler, CommandDescriptor, CommandRegistry, ConnectionPool, InboundEvent,
    MessageEvent, ProxyHandler, RawFrame,
};
use pk_framework::{Dispatcher, report_event_error};
use pk_gateway::{CurrentUser, Gateway, GatewayHandler};

// =============================================================================
// Startup Hook
// =============================================================================

/// Work that needs a connection before the first event, such as creating
/// tables.
#[async_trait]
pub trait StartupHook<C>: Send + Sync {
    async fn run(&self, conn: &mut C) -> anyhow::Result<()>;
}

// =============================================================================
// Event Forwarding
// =============================================================================

/// Gateway handler that spawns one dispatch task per event.
pub(crate) struct EventForwarder<P: ConnectionPool> {
    dispatcher: Arc<Dispatcher<P>>,
}

impl<P: ConnectionPool> EventForwarder<P> {
    pub(crate) fn new(dispatcher: Arc<Dispatcher<P>>) -> Self {
        Self { dispatcher }
    }

    /// Dispatches `event` on a new task. A panic inside the task is caught
    /// and reported like a handler error.
    pub(crate) fn spawn(&self, event: InboundEvent) -> JoinHandle<()> {
        let dispatcher = Arc::clone(&self.dispatcher);
        tokio::spawn(async move {
            let result = AssertUnwindSafe(dispatcher.handle(&event))
                .catch_unwind()
                .await;

            if let Err(panic) = result {
                let message = format!("handler panicked: {}", panic_message(panic.as_ref()));
                report_event_error(event.event_name(), &event, &message);
            }
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic payload"
    }
}

#[async_trait]
impl<P: ConnectionPool> GatewayHandler for EventForwarder<P> {
    async fn on_raw_frame(&self, frame: RawFrame) {
        self.spawn(InboundEvent::Raw(frame));
    }

    async fn on_ready(&self, user: CurrentUser) {
        info!(
            username = %user.username,
            discriminator = user.discriminator.as_deref().unwrap_or("0"),
            id = %user.id,
            "Logged in"
        );
    }

    async fn on_message(&self, event: MessageEvent) {
        self.spawn(InboundEvent::Message(event));
    }
}

// =============================================================================
// BotRuntime
// =============================================================================

/// The running bot.
pub struct BotRuntime<P: ConnectionPool> {
    config: BotConfig,
    credentials: Credentials,
    dispatcher: Arc<Dispatcher<P>>,
    shutdown: CancellationToken,
}

impl BotRuntime<Database> {
    /// Creates a builder for a Postgres-backed runtime.
    pub fn builder() -> BotRuntimeBuilder<DbConnection> {
        BotRuntimeBuilder::new()
    }
}

impl<P: ConnectionPool> BotRuntime<P> {
    /// Returns the configuration.
    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    /// Returns the dispatcher.
    pub fn dispatcher(&self) -> &Arc<Dispatcher<P>> {
        &self.dispatcher
    }

    /// Returns a token that stops the runtime when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Runs until Ctrl+C or SIGTERM.
    pub async fn run(&self) -> RuntimeResult<()> {
        info!("PluralKit is now running. Press Ctrl+C to stop.");
        self.run_until(wait_for_shutdown()).await
    }

    /// Runs until `shutdown` completes, the shutdown token is cancelled, or
    /// the gateway gives up.
    pub async fn run_until<F>(&self, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        let forwarder = Arc::new(EventForwarder::new(Arc::clone(&self.dispatcher)));
        let gateway = Gateway::new(
            self.config.gateway.to_gateway_config(&self.credentials.token),
            forwarder,
        )
        .with_shutdown(self.shutdown.clone());

        info!(
            prefix = %self.dispatcher.prefix(),
            commands = self.dispatcher.registry().len(),
            "Starting PluralKit runtime"
        );

        let session = gateway.run();
        tokio::pin!(session);

        tokio::select! {
            result = &mut session => return result.map_err(RuntimeError::from),
            _ = shutdown => {}
        }

        self.shutdown.cancel();
        session.await?;

        info!("Runtime stopped");
        Ok(())
    }
}

impl<P: ConnectionPool> std::fmt::Debug for BotRuntime<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotRuntime")
            .field("dispatcher", &self.dispatcher)
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

/// Waits for shutdown signals (Ctrl+C or SIGTERM).
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = signal::ctrl_c() => info!("Received Ctrl+C, shutting down"),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                }
                return;
            }
            Err(e) => warn!(error = %e, "Failed to register SIGTERM handler"),
        }
    }

    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}

// =============================================================================
// BotRuntimeBuilder
// =============================================================================

/// Collects the commands and collaborators of a runtime.
pub struct BotRuntimeBuilder<C> {
    config: BotConfig,
    prefix: Option<String>,
    registry: CommandRegistry<C>,
    proxy: Option<BoxedProxyHandler<C>>,
    startup: Option<Arc<dyn StartupHook<C>>>,
}

impl<C> Default for BotRuntimeBuilder<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> BotRuntimeBuilder<C> {
    /// Creates a builder with the default configuration.
    pub fn new() -> Self {
        Self {
            config: BotConfig::default(),
            prefix: None,
            registry: CommandRegistry::new(),
            proxy: None,
            startup: None,
        }
    }

    /// Uses a loaded configuration.
    pub fn config(mut self, config: BotConfig) -> Self {
        self.config = config;
        self
    }

    /// Overrides the configured command prefix.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Registers a command.
    pub fn command(mut self, descriptor: CommandDescriptor<C>) -> Self {
        self.registry.register(descriptor);
        self
    }

    /// Registers every command of `registry`.
    pub fn commands(mut self, registry: CommandRegistry<C>) -> Self {
        for descriptor in registry.iter() {
            self.registry.register(descriptor.clone());
        }
        self
    }

    /// Sets the proxy handler.
    pub fn proxy<H>(mut self, handler: H) -> Self
    where
        H: ProxyHandler<C> + 'static,
    {
        self.proxy = Some(Arc::new(handler));
        self
    }

    /// Sets a hook to run with one connection before events are accepted.
    pub fn on_startup<H>(mut self, hook: H) -> Self
    where
        H: StartupHook<C> + 'static,
    {
        self.startup = Some(Arc::new(hook));
        self
    }

    /// Builds the runtime on top of an existing pool.
    pub async fn build_with_pool<P>(
        self,
        pool: P,
        credentials: Credentials,
    ) -> RuntimeResult<BotRuntime<P>>
    where
        P: ConnectionPool<Connection = C>,
    {
        logging::init_from_config(&self.config.logging);

        let proxy = self.proxy.ok_or(RuntimeError::MissingProxyHandler)?;

        if let Some(hook) = &self.startup {
            debug!("Running startup hook");
            let mut conn = pool.acquire().await?;
            hook.run(&mut conn).await.map_err(RuntimeError::Startup)?;
        }

        let prefix = self
            .prefix
            .unwrap_or_else(|| self.config.bot.prefix.clone());
        let dispatcher = Dispatcher::new(pool, self.registry, proxy).with_prefix(prefix);

        debug!(?dispatcher, "Dispatcher ready");

        Ok(BotRuntime {
            config: self.config,
            credentials,
            dispatcher: Arc::new(dispatcher),
            shutdown: CancellationToken::new(),
        })
    }
}

impl BotRuntimeBuilder<DbConnection> {
    /// Opens the Postgres pool from the database config and builds the
    /// runtime.
    pub async fn connect(self, credentials: Credentials) -> RuntimeResult<BotRuntime<Database>> {
        logging::init_from_config(&self.config.logging);
        let database = Database::connect(&self.config.database).await?;
        self.build_with_pool(database, credentials).await
    }
}
