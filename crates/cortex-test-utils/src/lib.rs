//! Common test helpers for Cortex tests
//!
//! This crate provides:
//! - Condition-based waiting (no hardcoded sleeps)
//! - A fake synthesis engine speaking OSC over UDP
//! - A raw browser client speaking JSON frames over WebSocket
//! - A bridge on ephemeral ports that stops on drop

use bytes::Bytes;
use cortex_bridge::{Bridge, BridgeConfig, BridgeHandle, Broadcaster, Registry};
use cortex_core::{codec, Message, TransportFrame};
use cortex_transport::{
    TransportEvent, TransportReceiver, TransportSender, WebSocketReceiver, WebSocketSender,
    WebSocketTransport,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::time::timeout;

/// Default test timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default condition check interval
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_millis(10);

// ============================================================================
// Port Allocation
// ============================================================================

/// Find an available TCP port for testing
pub async fn find_available_port() -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

/// Find an available UDP port for testing
pub fn find_available_udp_port() -> u16 {
    let socket = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
    socket.local_addr().unwrap().port()
}

// ============================================================================
// Condition-Based Waiting
// ============================================================================

/// Wait for a condition with timeout - condition-based, not time-based
pub async fn wait_for<F, Fut>(check: F, interval: Duration, max_wait: Duration) -> bool
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let start = Instant::now();
    while start.elapsed() < max_wait {
        if check().await {
            return true;
        }
        tokio::time::sleep(interval).await;
    }
    false
}

// ============================================================================
// Fake Engine
// ============================================================================

/// UDP peer standing in for the synthesis engine
pub struct FakeEngine {
    socket: UdpSocket,
}

impl FakeEngine {
    pub async fn bind() -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        Self { socket }
    }

    pub fn addr(&self) -> SocketAddr {
        self.socket.local_addr().unwrap()
    }

    /// Send a message as an OSC datagram
    pub async fn send(&self, msg: &Message, to: SocketAddr) {
        let bytes = codec::encode(msg).unwrap();
        self.send_raw(&bytes, to).await;
    }

    pub async fn send_raw(&self, bytes: &[u8], to: SocketAddr) {
        self.socket.send_to(bytes, to).await.unwrap();
    }

    /// Next datagram received, if one arrives within `max_wait`
    pub async fn recv_raw(&self, max_wait: Duration) -> Option<Vec<u8>> {
        let mut buf = vec![0u8; 65536];
        match timeout(max_wait, self.socket.recv_from(&mut buf)).await {
            Ok(Ok((len, _))) => {
                buf.truncate(len);
                Some(buf)
            }
            _ => None,
        }
    }

    /// Next datagram decoded as a message
    pub async fn recv(&self, max_wait: Duration) -> Option<Message> {
        let bytes = self.recv_raw(max_wait).await?;
        Some(codec::decode(&bytes).expect("engine received a malformed datagram"))
    }
}

// ============================================================================
// Browser Client
// ============================================================================

/// Raw WebSocket client exchanging JSON frames, like the browser UI
pub struct BrowserClient {
    sender: WebSocketSender,
    receiver: WebSocketReceiver,
}

impl BrowserClient {
    pub async fn connect(url: &str) -> Self {
        let (sender, receiver) = WebSocketTransport::new().open(url).await.unwrap();
        Self { sender, receiver }
    }

    pub async fn send_text(&self, text: &str) {
        self.sender
            .send(Bytes::from(text.to_string()))
            .await
            .unwrap();
    }

    pub async fn send_json(&self, value: &serde_json::Value) {
        self.send_text(&value.to_string()).await;
    }

    /// Next frame as JSON, or `None` on timeout or disconnect
    pub async fn recv_frame(&mut self, max_wait: Duration) -> Option<serde_json::Value> {
        let deadline = Instant::now() + max_wait;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match timeout(remaining, self.receiver.recv()).await {
                Ok(Some(TransportEvent::Data(data))) => {
                    return Some(serde_json::from_slice(&data).expect("frame is not JSON"));
                }
                Ok(Some(TransportEvent::Connected)) => continue,
                Ok(Some(TransportEvent::Error(_))) => continue,
                _ => return None,
            }
        }
    }

    /// Next frame decoded as a message
    pub async fn recv_message(&mut self, max_wait: Duration) -> Option<Message> {
        let value = self.recv_frame(max_wait).await?;
        let frame: TransportFrame = serde_json::from_value(value).expect("frame has wrong shape");
        Some(Message::with_args(frame.address, frame.args))
    }

    /// True once the server has closed the connection
    pub async fn wait_disconnected(&mut self, max_wait: Duration) -> bool {
        let deadline = Instant::now() + max_wait;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match timeout(remaining, self.receiver.recv()).await {
                Ok(Some(TransportEvent::Disconnected { .. })) | Ok(None) => return true,
                Ok(Some(_)) => continue,
                Err(_) => return false,
            }
        }
    }

    pub fn sender(&self) -> &WebSocketSender {
        &self.sender
    }

    pub async fn close(&self) {
        let _ = self.sender.close().await;
    }
}

// ============================================================================
// Test Bridge - RAII wrapper with proper cleanup
// ============================================================================

/// A bridge on ephemeral loopback ports talking to a [`FakeEngine`].
///
/// The bridge stops when this is dropped.
pub struct TestBridge {
    handle: Option<BridgeHandle>,
    engine: FakeEngine,
}

impl TestBridge {
    /// Start a bridge with the default whitelist
    pub async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    /// Start a bridge after adjusting its configuration
    pub async fn start_with<F>(configure: F) -> Self
    where
        F: FnOnce(&mut BridgeConfig),
    {
        let engine = FakeEngine::bind().await;
        let mut config = BridgeConfig {
            osc_listen: "127.0.0.1:0".to_string(),
            osc_send_bind: "127.0.0.1:0".to_string(),
            engine_addr: engine.addr().to_string(),
            ws_listen: "127.0.0.1:0".to_string(),
            http_listen: Some("127.0.0.1:0".to_string()),
            ..Default::default()
        };
        configure(&mut config);

        let handle = Bridge::new(config).start().await.unwrap();
        Self {
            handle: Some(handle),
            engine,
        }
    }

    pub fn handle(&self) -> &BridgeHandle {
        self.handle.as_ref().expect("bridge already stopped")
    }

    pub fn engine(&self) -> &FakeEngine {
        &self.engine
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.handle().ws_addr())
    }

    /// Base URL of the HTTP surface
    pub fn http_url(&self) -> String {
        let addr = self.handle().http_addr().expect("HTTP disabled");
        format!("http://{}", addr)
    }

    pub fn registry(&self) -> Arc<Registry> {
        self.handle().registry()
    }

    pub fn broadcaster(&self) -> Arc<Broadcaster> {
        self.handle().broadcaster()
    }

    /// Send a message from the engine to the bridge
    pub async fn emit(&self, msg: &Message) {
        self.engine.send(msg, self.handle().osc_addr()).await;
    }

    /// Send raw bytes from the engine to the bridge
    pub async fn emit_raw(&self, bytes: &[u8]) {
        self.engine.send_raw(bytes, self.handle().osc_addr()).await;
    }

    /// Connect a browser client and wait until the bridge has registered it
    pub async fn connect_client(&self) -> BrowserClient {
        let before = self.broadcaster().len();
        let client = BrowserClient::connect(&self.ws_url()).await;
        assert!(
            self.wait_for_clients(before + 1).await,
            "bridge did not register the client"
        );
        client
    }

    /// Wait until exactly `count` clients are registered
    pub async fn wait_for_clients(&self, count: usize) -> bool {
        let broadcaster = self.broadcaster();
        wait_for(
            || {
                let broadcaster = broadcaster.clone();
                async move { broadcaster.len() == count }
            },
            DEFAULT_CHECK_INTERVAL,
            DEFAULT_TIMEOUT,
        )
        .await
    }

    /// Wait until the registry holds `count` modules
    pub async fn wait_for_modules(&self, count: usize) -> bool {
        let registry = self.registry();
        wait_for(
            || {
                let registry = registry.clone();
                async move { registry.module_count() == count }
            },
            DEFAULT_CHECK_INTERVAL,
            DEFAULT_TIMEOUT,
        )
        .await
    }

    /// Stop the bridge and wait for its loops to finish
    pub async fn shutdown(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.shutdown().await;
        }
    }
}
