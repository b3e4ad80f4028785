//! Reconnecting client
//!
//! ```text
//!            connect ok                 connection lost
//! Connecting ----------> Connected ----------------------+
//!     ^   |                                              |
//!     |   | connect failed                               v
//!     |   +-----------------------------------------> Disconnected
//!     |                                                  |
//!     +------------------- retry interval ---------------+
//! ```

use bytes::Bytes;
use cortex_core::{frame, Message};
use cortex_transport::{
    TransportError, TransportEvent, TransportReceiver, TransportSender, WebSocketSender,
    WebSocketTransport,
};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{ClientError, Result};

/// Delay between connection attempts
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(3);

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Events delivered to the application
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// A message relayed by the bridge
    Message(Message),
    /// The connection state changed
    State(ConnectionState),
}

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub url: String,
    pub retry_interval: Duration,
    /// Events buffered for the application
    pub event_capacity: usize,
}

impl ClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            retry_interval: DEFAULT_RETRY_INTERVAL,
            event_capacity: 256,
        }
    }

    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }
}

type SenderSlot = Arc<RwLock<Option<Arc<WebSocketSender>>>>;

/// Handle to a running client
pub struct CortexClient {
    state: watch::Receiver<ConnectionState>,
    sender: SenderSlot,
    shutdown: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl CortexClient {
    /// Start connecting in the background.
    ///
    /// The returned receiver yields inbound messages and state changes; it
    /// should be drained, since the client waits for room in it.
    pub fn spawn(config: ClientConfig) -> (Self, mpsc::Receiver<ClientEvent>) {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (event_tx, event_rx) = mpsc::channel(config.event_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let sender: SenderSlot = Arc::new(RwLock::new(None));

        let task = tokio::spawn(run(
            config,
            Link {
                state: state_tx,
                events: event_tx,
                sender: sender.clone(),
            },
            shutdown_rx,
        ));

        let client = Self {
            state: state_rx,
            sender,
            shutdown: shutdown_tx,
            task: Mutex::new(Some(task)),
        };
        (client, event_rx)
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Wait until connected. Returns false on timeout.
    pub async fn wait_connected(&self, timeout: Duration) -> bool {
        let mut state = self.state.clone();
        let connected = matches!(
            tokio::time::timeout(
                timeout,
                state.wait_for(|s| *s == ConnectionState::Connected)
            )
            .await,
            Ok(Ok(_))
        );
        connected
    }

    /// Send a message with plain JSON scalar arguments.
    ///
    /// The bridge infers each argument's wire type.
    pub async fn send(&self, address: &str, args: Vec<serde_json::Value>) -> Result<()> {
        let frame = serde_json::json!({ "address": address, "args": args });
        self.send_text(frame.to_string()).await
    }

    /// Send a typed message; argument types are kept exactly
    pub async fn send_message(&self, message: &Message) -> Result<()> {
        let text = frame::to_json(message)?;
        self.send_text(text).await
    }

    async fn send_text(&self, text: String) -> Result<()> {
        if *self.shutdown.borrow() {
            return Err(ClientError::Closed);
        }
        let sender = self.sender.read().clone();
        let Some(sender) = sender else {
            return Err(ClientError::NotConnected);
        };

        sender.send(Bytes::from(text)).await.map_err(|e| match e {
            TransportError::NotConnected | TransportError::ConnectionClosed => {
                ClientError::NotConnected
            }
            other => ClientError::Transport(other),
        })
    }

    /// Disconnect and stop reconnecting. Later sends fail with
    /// [`ClientError::Closed`].
    pub async fn close(&self) {
        self.shutdown.send_replace(true);
        let Some(task) = self.task.lock().take() else {
            return;
        };
        if tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .is_err()
        {
            warn!("Client task did not stop in time");
        }
    }
}

/// What the connection task shares with the handle
struct Link {
    state: watch::Sender<ConnectionState>,
    events: mpsc::Sender<ClientEvent>,
    sender: SenderSlot,
}

impl Link {
    async fn set_state(&self, state: ConnectionState) {
        if *self.state.borrow() == state {
            return;
        }
        self.state.send_replace(state);
        let _ = self.events.send(ClientEvent::State(state)).await;
    }
}

async fn run(config: ClientConfig, link: Link, mut shutdown: watch::Receiver<bool>) {
    let transport = WebSocketTransport::new();

    loop {
        link.set_state(ConnectionState::Connecting).await;

        let attempt = tokio::select! {
            attempt = transport.open(&config.url) => attempt,
            _ = shutdown.changed() => break,
        };

        match attempt {
            Ok((sender, receiver)) => {
                let sender = Arc::new(sender);
                *link.sender.write() = Some(sender.clone());
                info!("Connected to {}", config.url);
                link.set_state(ConnectionState::Connected).await;

                let stopped = pump(&link, receiver, &mut shutdown).await;

                link.sender.write().take();
                if stopped {
                    let _ = sender.close().await;
                    break;
                }
                info!("Connection to {} lost", config.url);
            }
            Err(e) => {
                debug!("Connecting to {} failed: {}", config.url, e);
            }
        }

        link.set_state(ConnectionState::Disconnected).await;

        tokio::select! {
            _ = tokio::time::sleep(config.retry_interval) => {}
            _ = shutdown.changed() => break,
        }
    }

    link.sender.write().take();
    link.set_state(ConnectionState::Disconnected).await;
    debug!("Client for {} stopped", config.url);
}

/// Deliver inbound frames until the connection ends.
///
/// Returns true if the client was shut down.
async fn pump<R: TransportReceiver>(
    link: &Link,
    mut receiver: R,
    shutdown: &mut watch::Receiver<bool>,
) -> bool {
    loop {
        tokio::select! {
            event = receiver.recv() => match event {
                Some(TransportEvent::Data(data)) => {
                    let parsed = std::str::from_utf8(&data)
                        .map_err(|e| e.to_string())
                        .and_then(|text| frame::parse(text).map_err(|e| e.to_string()));
                    match parsed {
                        Ok(msg) => {
                            let _ = link.events.send(ClientEvent::Message(msg)).await;
                        }
                        Err(e) => warn!("Ignoring frame from bridge: {}", e),
                    }
                }
                Some(TransportEvent::Connected) => {}
                Some(TransportEvent::Error(e)) => debug!("Connection error: {}", e),
                Some(TransportEvent::Disconnected { .. }) | None => return false,
            },
            _ = shutdown.changed() => return true,
        }
    }
}
