//! Async driver for the connection state machine.
//!
//! [`ConnectionManager::open`] spawns one tokio task that owns the socket, the
//! in-flight dial and the retry [`Interval`]. The manager handle talks to it
//! over an mpsc channel; decoded frames and state changes come back on the
//! update channel returned by `open`.
//!
//! Every dial is bounded by the retry interval. A handshake that has not
//! completed by then counts as a failed attempt and enters the retry path.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use reqwest::Url;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::machine::{Action, ConnectionMachine, Signal};
use super::ConnectionState;
use crate::error::ChatError;
use crate::protocol::{decode_frame, InboundFrame, OutboundFrame};

/// Fixed period between reconnect attempts.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(3);

/// Upper bound on the close handshake when dropping a socket.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type DialFuture = Pin<Box<dyn Future<Output = Result<WsStream, ChatError>> + Send>>;

#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Socket endpoint, e.g. `ws://host/ws/chat/<id>/`.
    pub url: Url,
    /// Period of the retry timer, and the deadline of each dial.
    pub retry_interval: Duration,
}

impl ConnectionConfig {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            retry_interval: DEFAULT_RETRY_INTERVAL,
        }
    }

    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }
}

/// What the driver reports back to its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionUpdate {
    State(ConnectionState),
    Frame(InboundFrame),
}

enum Request {
    Send(String),
    ForceClose,
    Dispose,
}

/// Handle to a running connection driver.
///
/// Dropping the handle disposes the driver.
pub struct ConnectionManager {
    requests: mpsc::UnboundedSender<Request>,
    state: watch::Receiver<ConnectionState>,
    task: JoinHandle<()>,
}

impl ConnectionManager {
    /// Spawn the driver and start connecting.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(config: ConnectionConfig) -> (Self, mpsc::UnboundedReceiver<ConnectionUpdate>) {
        let (req_tx, req_rx) = mpsc::unbounded_channel();
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);

        let driver = Driver {
            config,
            machine: ConnectionMachine::new(),
            socket: None,
            dial: None,
            retry: None,
            requests: req_rx,
            updates: update_tx,
            state: state_tx,
            stopped: false,
        };
        let task = tokio::spawn(driver.run());

        (
            Self {
                requests: req_tx,
                state: state_rx,
                task,
            },
            update_rx,
        )
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// A receiver that observes every state change.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Send a text message. Fire-and-forget: nothing is queued or retried.
    ///
    /// # Errors
    /// - [`ChatError::BlankMessage`] for empty or whitespace-only text.
    /// - [`ChatError::NotConnected`] unless the channel is open.
    /// - [`ChatError::DriverClosed`] after dispose.
    pub fn send(&self, text: &str) -> Result<(), ChatError> {
        if text.trim().is_empty() {
            return Err(ChatError::BlankMessage);
        }
        if self.state() != ConnectionState::Open {
            return Err(ChatError::NotConnected);
        }
        let frame = OutboundFrame::new(text).encode()?;
        self.requests
            .send(Request::Send(frame))
            .map_err(|_| ChatError::DriverClosed)
    }

    /// Drop the current socket; the regular retry path reconnects.
    pub fn close(&self) -> Result<(), ChatError> {
        self.requests
            .send(Request::ForceClose)
            .map_err(|_| ChatError::DriverClosed)
    }

    /// Cancel the retry timer, close the socket and wait for the driver to stop.
    pub async fn dispose(self) {
        let _ = self.requests.send(Request::Dispose);
        if let Err(e) = self.task.await {
            warn!(error = %e, "connection driver ended abnormally");
        }
    }
}

struct Driver {
    config: ConnectionConfig,
    machine: ConnectionMachine,
    socket: Option<WsStream>,
    dial: Option<DialFuture>,
    retry: Option<Interval>,
    requests: mpsc::UnboundedReceiver<Request>,
    updates: mpsc::UnboundedSender<ConnectionUpdate>,
    state: watch::Sender<ConnectionState>,
    stopped: bool,
}

impl Driver {
    async fn run(mut self) {
        self.signal(Signal::Connect).await;

        while !self.stopped {
            tokio::select! {
                request = self.requests.recv() => match request {
                    Some(Request::Send(frame)) => self.send_frame(frame).await,
                    Some(Request::ForceClose) => {
                        if self.socket.is_some() {
                            debug!("closing socket on request");
                            self.signal(Signal::Errored).await;
                        }
                    }
                    Some(Request::Dispose) | None => self.signal(Signal::Dispose).await,
                },
                result = next_dial(&mut self.dial) => {
                    self.dial = None;
                    match result {
                        Ok(ws) => {
                            info!(url = %self.config.url, "connected");
                            self.socket = Some(ws);
                            self.signal(Signal::Opened).await;
                        }
                        Err(e) => {
                            warn!(error = %e, "connect attempt failed");
                            self.signal(Signal::Closed).await;
                        }
                    }
                },
                incoming = next_message(&mut self.socket) => self.on_incoming(incoming).await,
                _ = next_tick(&mut self.retry) => {
                    debug!("retry timer fired, reconnecting");
                    self.signal(Signal::RetryTick).await;
                },
            }
        }
        debug!("connection driver stopped");
    }

    async fn on_incoming(&mut self, incoming: Option<Result<WsMessage, tokio_tungstenite::tungstenite::Error>>) {
        match incoming {
            Some(Ok(WsMessage::Text(text))) => match decode_frame(&text) {
                Ok(frame) => {
                    let _ = self.updates.send(ConnectionUpdate::Frame(frame));
                }
                Err(e) => {
                    warn!(error = %e, len = text.len(), "dropping malformed frame");
                }
            },
            Some(Ok(WsMessage::Close(_))) | None => {
                self.socket = None;
                warn!("socket closed, reconnecting");
                self.signal(Signal::Closed).await;
            }
            Some(Ok(_)) => {} // binary / ping / pong
            Some(Err(e)) => {
                warn!(error = %e, "socket error");
                self.signal(Signal::Errored).await;
            }
        }
    }

    async fn send_frame(&mut self, frame: String) {
        let Some(ws) = self.socket.as_mut() else {
            debug!("dropping outbound message, socket not open");
            return;
        };
        if let Err(e) = ws.send(WsMessage::Text(frame)).await {
            warn!(error = %e, "send failed");
            self.signal(Signal::Errored).await;
        }
    }

    async fn signal(&mut self, signal: Signal) {
        for action in self.machine.handle(signal) {
            match action {
                Action::Dial => {
                    if self.dial.is_some() {
                        debug!("abandoning in-flight connect attempt");
                    }
                    self.dial = Some(dial(self.config.url.to_string(), self.config.retry_interval));
                }
                Action::CloseSocket => {
                    self.dial = None;
                    if let Some(mut ws) = self.socket.take() {
                        let _ = tokio::time::timeout(CLOSE_TIMEOUT, ws.close(None)).await;
                    }
                }
                Action::ArmRetry => {
                    let period = self.config.retry_interval;
                    let mut ticker = interval_at(Instant::now() + period, period);
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                    self.retry = Some(ticker);
                }
                Action::CancelRetry => self.retry = None,
                Action::Indicate(state) => {
                    self.state.send_replace(state);
                    let _ = self.updates.send(ConnectionUpdate::State(state));
                }
                Action::Shutdown => self.stopped = true,
            }
        }
    }
}

fn dial(url: String, deadline: Duration) -> DialFuture {
    Box::pin(async move {
        match tokio::time::timeout(deadline, tokio_tungstenite::connect_async(url.as_str())).await {
            Ok(Ok((ws, _response))) => Ok(ws),
            Ok(Err(e)) => Err(ChatError::Dial {
                url,
                detail: e.to_string(),
            }),
            Err(_) => Err(ChatError::Dial {
                url,
                detail: format!("handshake not completed within {deadline:?}"),
            }),
        }
    })
}

async fn next_dial(dial: &mut Option<DialFuture>) -> Result<WsStream, ChatError> {
    match dial {
        Some(fut) => fut.await,
        None => std::future::pending().await,
    }
}

async fn next_message(
    socket: &mut Option<WsStream>,
) -> Option<Result<WsMessage, tokio_tungstenite::tungstenite::Error>> {
    match socket {
        Some(ws) => ws.next().await,
        None => std::future::pending().await,
    }
}

async fn next_tick(retry: &mut Option<Interval>) {
    match retry {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}
