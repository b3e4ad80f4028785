//! WebSocket transport implementation
//!
//! Both directions run on dedicated tasks: a writer draining a bounded queue
//! and a reader forwarding frames as [`TransportEvent`]s. Text and binary
//! frames are both delivered as `Data`; outgoing data is sent as text frames
//! when it is valid UTF-8.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::{
    connect_async,
    tungstenite::protocol::{Message as WsMessage, WebSocketConfig as WsProtocolConfig},
    WebSocketStream,
};
use tracing::{debug, error, info};

use crate::error::{Result, TransportError};
use crate::traits::{
    Transport, TransportEvent, TransportReceiver, TransportSender, TransportServer,
};

/// WebSocket configuration
#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    /// Maximum message size
    pub max_message_size: usize,
    /// Outgoing frames buffered per connection before `try_send` reports a full queue
    pub send_queue_capacity: usize,
    /// Time allowed for the opening handshake
    pub handshake_timeout: Duration,
    /// Time allowed for the closing handshake
    pub close_timeout: Duration,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            max_message_size: 64 * 1024,
            send_queue_capacity: 256,
            handshake_timeout: Duration::from_secs(5),
            close_timeout: Duration::from_secs(1),
        }
    }
}

impl WebSocketConfig {
    fn protocol_config(&self) -> WsProtocolConfig {
        let mut config = WsProtocolConfig::default();
        config.max_message_size = Some(self.max_message_size);
        config
    }
}

/// WebSocket sender
pub struct WebSocketSender {
    tx: mpsc::Sender<WsMessage>,
    open: Arc<watch::Sender<bool>>,
}

impl WebSocketSender {
    fn frame(data: Bytes) -> WsMessage {
        match String::from_utf8(data.to_vec()) {
            Ok(text) => WsMessage::Text(text),
            Err(e) => WsMessage::Binary(e.into_bytes()),
        }
    }
}

#[async_trait]
impl TransportSender for WebSocketSender {
    async fn send(&self, data: Bytes) -> Result<()> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }

        self.tx
            .send(Self::frame(data))
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    fn try_send(&self, data: Bytes) -> Result<()> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }

        self.tx.try_send(Self::frame(data)).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => TransportError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => TransportError::ConnectionClosed,
        })
    }

    fn is_connected(&self) -> bool {
        *self.open.borrow()
    }

    async fn close(&self) -> Result<()> {
        self.open.send_replace(false);
        Ok(())
    }
}

/// WebSocket receiver
pub struct WebSocketReceiver {
    rx: mpsc::Receiver<TransportEvent>,
}

#[async_trait]
impl TransportReceiver for WebSocketReceiver {
    async fn recv(&mut self) -> Option<TransportEvent> {
        self.rx.recv().await
    }
}

/// Resolves once the connection has been marked closed
async fn closed(mut open: watch::Receiver<bool>) {
    while *open.borrow_and_update() {
        if open.changed().await.is_err() {
            return;
        }
    }
}

/// Spawn reader and writer tasks for an established WebSocket stream
fn spawn_io<S>(
    ws_stream: WebSocketStream<S>,
    config: &WebSocketConfig,
) -> (WebSocketSender, WebSocketReceiver)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut write, mut read) = ws_stream.split();

    let (send_tx, mut send_rx) = mpsc::channel::<WsMessage>(config.send_queue_capacity.max(1));
    let (event_tx, event_rx) = mpsc::channel::<TransportEvent>(100);
    let (open_tx, _) = watch::channel(true);
    let open = Arc::new(open_tx);
    let close_timeout = config.close_timeout;

    // Writer task
    let open_write = open.clone();
    let writer_closed = closed(open.subscribe());
    tokio::spawn(async move {
        tokio::pin!(writer_closed);

        loop {
            tokio::select! {
                msg = send_rx.recv() => {
                    let Some(msg) = msg else { break };
                    tokio::select! {
                        result = write.send(msg) => {
                            if let Err(e) = result {
                                debug!("WebSocket write error: {}", e);
                                break;
                            }
                        }
                        _ = &mut writer_closed => break,
                    }
                }
                _ = &mut writer_closed => {
                    let _ = tokio::time::timeout(close_timeout, write.close()).await;
                    break;
                }
            }
        }

        open_write.send_replace(false);
    });

    // Reader task
    let open_read = open.clone();
    let reader_closed = closed(open.subscribe());
    tokio::spawn(async move {
        tokio::pin!(reader_closed);

        let _ = event_tx.send(TransportEvent::Connected).await;

        let reason = loop {
            tokio::select! {
                next = read.next() => match next {
                    Some(Ok(WsMessage::Text(text))) => {
                        if event_tx.send(TransportEvent::Data(Bytes::from(text))).await.is_err() {
                            break None;
                        }
                    }
                    Some(Ok(WsMessage::Binary(data))) => {
                        if event_tx.send(TransportEvent::Data(Bytes::from(data))).await.is_err() {
                            break None;
                        }
                    }
                    Some(Ok(WsMessage::Close(frame))) => {
                        break frame.map(|f| f.reason.to_string());
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        let _ = event_tx.send(TransportEvent::Error(e.to_string())).await;
                        break Some(e.to_string());
                    }
                    None => break None,
                },
                _ = &mut reader_closed => break Some("closed locally".to_string()),
            }
        };

        open_read.send_replace(false);
        let _ = event_tx.send(TransportEvent::Disconnected { reason }).await;
    });

    let sender = WebSocketSender { tx: send_tx, open };
    let receiver = WebSocketReceiver { rx: event_rx };

    (sender, receiver)
}

/// WebSocket client connector
pub struct WebSocketTransport {
    config: WebSocketConfig,
}

impl WebSocketTransport {
    pub fn new() -> Self {
        Self {
            config: WebSocketConfig::default(),
        }
    }

    pub fn with_config(config: WebSocketConfig) -> Self {
        Self { config }
    }

    /// Connect using this connector's configuration
    pub async fn open(&self, url: &str) -> Result<(WebSocketSender, WebSocketReceiver)> {
        let parsed = url::Url::parse(url).map_err(|e| TransportError::InvalidUrl(e.to_string()))?;
        if !matches!(parsed.scheme(), "ws" | "wss") {
            return Err(TransportError::InvalidUrl(format!(
                "unsupported scheme: {}",
                parsed.scheme()
            )));
        }

        info!("Connecting to WebSocket: {}", url);

        let (ws_stream, response) = connect_async(url)
            .await
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        debug!("WebSocket connected, response: {:?}", response.status());

        Ok(spawn_io(ws_stream, &self.config))
    }
}

impl Default for WebSocketTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    type Sender = WebSocketSender;
    type Receiver = WebSocketReceiver;

    async fn connect(url: &str) -> Result<(Self::Sender, Self::Receiver)> {
        WebSocketTransport::new().open(url).await
    }
}

/// WebSocket server
pub struct WebSocketServer {
    listener: tokio::net::TcpListener,
    config: WebSocketConfig,
}

impl WebSocketServer {
    pub async fn bind(addr: &str) -> Result<Self> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| TransportError::ConnectionFailed(format!("{}: {}", addr, e)))?;

        info!("WebSocket server listening on {}", addr);

        Ok(Self {
            listener,
            config: WebSocketConfig::default(),
        })
    }

    pub fn with_config(mut self, config: WebSocketConfig) -> Self {
        self.config = config;
        self
    }

    /// Accept a TCP connection without performing the WebSocket handshake.
    ///
    /// The handshake runs in [`PendingConnection::upgrade`], so callers can
    /// run it on a separate task and keep accepting while it is in progress.
    pub async fn accept_pending(&mut self) -> Result<PendingConnection> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        debug!("Accepted TCP connection from {}", peer);

        Ok(PendingConnection {
            stream,
            peer,
            config: self.config.clone(),
        })
    }
}

/// A TCP connection waiting for its WebSocket handshake
pub struct PendingConnection {
    stream: tokio::net::TcpStream,
    peer: SocketAddr,
    config: WebSocketConfig,
}

impl PendingConnection {
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Run the opening handshake, bounded by the handshake timeout
    pub async fn upgrade(self) -> Result<(WebSocketSender, WebSocketReceiver)> {
        let peer = self.peer;
        let handshake = tokio_tungstenite::accept_async_with_config(
            self.stream,
            Some(self.config.protocol_config()),
        );
        let ws_stream = tokio::time::timeout(self.config.handshake_timeout, handshake)
            .await
            .map_err(|_| TransportError::Timeout)?
            .map_err(|e| {
                error!("WebSocket handshake with {} failed: {}", peer, e);
                TransportError::ConnectionFailed(e.to_string())
            })?;

        info!("WebSocket client connected from {}", peer);

        Ok(spawn_io(ws_stream, &self.config))
    }
}

#[async_trait]
impl TransportServer for WebSocketServer {
    type Sender = WebSocketSender;
    type Receiver = WebSocketReceiver;

    async fn accept(&mut self) -> Result<(Self::Sender, Self::Receiver, SocketAddr)> {
        let pending = self.accept_pending().await?;
        let peer = pending.peer();
        let (sender, receiver) = pending.upgrade().await?;
        Ok((sender, receiver, peer))
    }

    fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr().map_err(TransportError::Io)
    }
}
