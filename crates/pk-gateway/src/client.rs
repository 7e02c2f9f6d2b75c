//! Gateway WebSocket client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::{Instant, Interval, interval_at};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::payload::{CurrentUser, GatewayPayload, event, opcode, parse_message};
use pk_core::{MessageEvent, RawFrame};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Receives what the gateway delivers.
///
/// Every text or binary frame goes to `on_raw_frame` first; decoded
/// `READY` and `MESSAGE_CREATE` dispatches follow on their typed callbacks.
/// Implementations should return quickly: the socket is not read while a
/// callback runs.
#[async_trait]
pub trait GatewayHandler: Send + Sync + 'static {
    /// Called for every frame received.
    async fn on_raw_frame(&self, frame: RawFrame);

    /// Called when the session is ready.
    async fn on_ready(&self, user: CurrentUser) {
        let _ = user;
    }

    /// Called for every created message.
    async fn on_message(&self, event: MessageEvent);
}

/// Why a session ended.
enum SessionEnd {
    Shutdown,
    Lost(String),
}

/// Per-connection state.
struct Session<'a> {
    handler: &'a dyn GatewayHandler,
    config: &'a GatewayConfig,
    ws_tx: WsSink,
    ws_rx: WsSource,
    sequence: Option<u64>,
    heartbeat: Option<Interval>,
    received: bool,
}

impl<'a> Session<'a> {
    fn new(handler: &'a dyn GatewayHandler, config: &'a GatewayConfig, stream: WsStream) -> Self {
        let (ws_tx, ws_rx) = stream.split();
        Self {
            handler,
            config,
            ws_tx,
            ws_rx,
            sequence: None,
            heartbeat: None,
            received: false,
        }
    }

    async fn send(&mut self, payload: &GatewayPayload) -> GatewayResult<()> {
        let text = payload.encode()?;
        self.ws_tx.send(Message::Text(text.into())).await?;
        Ok(())
    }

    async fn send_heartbeat(&mut self) -> GatewayResult<()> {
        trace!(sequence = ?self.sequence, "Sending heartbeat");
        self.send(&GatewayPayload::heartbeat(self.sequence)).await
    }

    async fn next_heartbeat(heartbeat: &mut Option<Interval>) -> Instant {
        match heartbeat {
            Some(interval) => interval.tick().await,
            None => std::future::pending().await,
        }
    }

    async fn run(&mut self, shutdown: &CancellationToken) -> GatewayResult<SessionEnd> {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Logging out");
                    let _ = self.ws_tx.send(Message::Close(None)).await;
                    let _ = self.ws_tx.close().await;
                    return Ok(SessionEnd::Shutdown);
                }

                _ = Self::next_heartbeat(&mut self.heartbeat) => {
                    self.send_heartbeat().await?;
                }

                msg = self.ws_rx.next() => {
                    if let Some(end) = self.handle_message(msg).await? {
                        return Ok(end);
                    }
                }
            }
        }
    }

    /// Handles one socket message. Returns `Some` when the session is over.
    async fn handle_message(
        &mut self,
        msg: Option<Result<Message, tungstenite::Error>>,
    ) -> GatewayResult<Option<SessionEnd>> {
        match msg {
            Some(Ok(Message::Text(text))) => {
                trace!(len = text.len(), "Received text frame");
                self.received = true;
                self.handler
                    .on_raw_frame(RawFrame::Text(text.as_str().to_owned()))
                    .await;
                match GatewayPayload::decode(text.as_str()) {
                    Ok(payload) => self.handle_payload(payload).await,
                    Err(e) => {
                        debug!(error = %e, "Ignoring undecodable gateway frame");
                        Ok(None)
                    }
                }
            }
            Some(Ok(Message::Binary(data))) => {
                trace!(len = data.len(), "Received binary frame");
                self.received = true;
                self.handler.on_raw_frame(RawFrame::Binary(data.to_vec())).await;
                Ok(None)
            }
            // tungstenite queues the pong itself
            Some(Ok(Message::Ping(_))) => {
                trace!("Received ping");
                Ok(None)
            }
            Some(Ok(Message::Pong(_))) | Some(Ok(Message::Frame(_))) => Ok(None),
            Some(Ok(Message::Close(frame))) => {
                let reason = match frame {
                    Some(frame) => format!("closed by server ({} {})", frame.code, frame.reason.as_str()),
                    None => "closed by server".to_string(),
                };
                Ok(Some(SessionEnd::Lost(reason)))
            }
            Some(Err(e)) => Err(GatewayError::Socket(e)),
            None => Ok(Some(SessionEnd::Lost("stream ended".to_string()))),
        }
    }

    async fn handle_payload(&mut self, payload: GatewayPayload) -> GatewayResult<Option<SessionEnd>> {
        match payload.op {
            opcode::HELLO => {
                let period = Duration::from_millis(payload.heartbeat_interval().unwrap_or(41_250));
                debug!(?period, "Received hello, identifying");
                self.heartbeat = Some(interval_at(Instant::now() + period, period));
                let identify = GatewayPayload::identify(&self.config.token, self.config.intents);
                self.send(&identify).await?;
            }
            opcode::HEARTBEAT => self.send_heartbeat().await?,
            opcode::HEARTBEAT_ACK => trace!("Heartbeat acknowledged"),
            opcode::RECONNECT => {
                return Ok(Some(SessionEnd::Lost("server requested reconnect".to_string())));
            }
            opcode::INVALID_SESSION => {
                return Ok(Some(SessionEnd::Lost("invalid session".to_string())));
            }
            opcode::DISPATCH => {
                if payload.s.is_some() {
                    self.sequence = payload.s;
                }
                self.handle_dispatch(payload).await;
            }
            op => trace!(op, "Ignoring gateway opcode"),
        }
        Ok(None)
    }

    async fn handle_dispatch(&mut self, payload: GatewayPayload) {
        match payload.t.as_deref() {
            Some(event::READY) => match CurrentUser::from_ready(&payload.d) {
                Ok(user) => self.handler.on_ready(user).await,
                Err(e) => warn!(error = %e, "Malformed READY payload"),
            },
            Some(event::MESSAGE_CREATE) => match parse_message(payload.d) {
                Ok(message) => self.handler.on_message(message).await,
                Err(e) => warn!(error = %e, "Malformed MESSAGE_CREATE payload"),
            },
            _ => {}
        }
    }
}

/// The gateway client.
///
/// `run` connects, identifies, and forwards events to the handler until the
/// shutdown token is cancelled. Lost connections are re-established with
/// exponential backoff unless `auto_reconnect` is off.
pub struct Gateway {
    config: GatewayConfig,
    handler: Arc<dyn GatewayHandler>,
    shutdown: CancellationToken,
}

impl Gateway {
    /// Creates a client.
    pub fn new(config: GatewayConfig, handler: Arc<dyn GatewayHandler>) -> Self {
        Self {
            config,
            handler,
            shutdown: CancellationToken::new(),
        }
    }

    /// Uses an external shutdown token.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Returns the shutdown token.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    async fn connect(&self) -> GatewayResult<WsStream> {
        info!(url = %self.config.url, "Connecting to gateway");
        let (stream, _response) =
            connect_async(self.config.url.as_str())
                .await
                .map_err(|source| GatewayError::Connect {
                    url: self.config.url.clone(),
                    source,
                })?;
        info!("Gateway connected");
        Ok(stream)
    }

    /// Runs the client until shutdown, or until the connection is lost and
    /// cannot be re-established.
    pub async fn run(&self) -> GatewayResult<()> {
        let mut retry_count = 0u32;
        let mut current_delay = self.config.initial_delay;

        loop {
            let connected = tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("Logging out");
                    return Ok(());
                }
                connected = self.connect() => connected,
            };

            let failure = match connected {
                Ok(stream) => {
                    let mut session = Session::new(self.handler.as_ref(), &self.config, stream);
                    let result = session.run(&self.shutdown).await;
                    if session.received {
                        retry_count = 0;
                        current_delay = self.config.initial_delay;
                    }
                    match result {
                        Ok(SessionEnd::Shutdown) => return Ok(()),
                        Ok(SessionEnd::Lost(reason)) => GatewayError::Closed(reason),
                        Err(e) => e,
                    }
                }
                Err(e) => e,
            };

            if self.shutdown.is_cancelled() {
                return Ok(());
            }

            if !self.config.auto_reconnect {
                return Err(failure);
            }

            if let Some(max) = self.config.max_retries {
                if retry_count >= max {
                    error!(error = %failure, "Max retries reached, giving up");
                    return Err(failure);
                }
            }

            warn!(error = %failure, delay = ?current_delay, "Gateway connection lost, reconnecting");
            tokio::select! {
                _ = self.shutdown.cancelled() => return Ok(()),
                _ = tokio::time::sleep(current_delay) => {}
            }

            retry_count += 1;
            current_delay = self.config.next_delay(current_delay);
        }
    }
}
