//! Bridge core and lifecycle
//!
//! [`BridgeCore`] holds the per-message pipelines:
//! - engine datagram: decode, update registry, broadcast to clients
//! - client frame: parse, filter, encode, send to engine
//!
//! [`Bridge`] binds the sockets and runs the loops that feed the core.

use bytes::Bytes;
use cortex_core::{codec, frame, AccessFilter, Message};
use cortex_transport::{
    TransportEvent, TransportSender, TransportServer, UdpConfig, UdpReceiver, UdpTransport,
    WebSocketConfig, WebSocketServer,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::broadcast::{BroadcastReport, Broadcaster};
use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::registry::{Registry, RegistryAddresses};
use crate::session;

/// What happened to a client frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Sent to the engine
    Forwarded,
    /// Address not whitelisted; dropped
    Filtered,
}

/// Message pipelines shared by the receive loop and all sessions
pub struct BridgeCore {
    filter: AccessFilter,
    registry_addresses: RegistryAddresses,
    registry: Arc<Registry>,
    broadcaster: Arc<Broadcaster>,
    upstream: Arc<dyn TransportSender>,
}

impl BridgeCore {
    pub fn new(
        filter: AccessFilter,
        registry_addresses: RegistryAddresses,
        registry: Arc<Registry>,
        broadcaster: Arc<Broadcaster>,
        upstream: Arc<dyn TransportSender>,
    ) -> Self {
        Self {
            filter,
            registry_addresses,
            registry,
            broadcaster,
            upstream,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn broadcaster(&self) -> &Arc<Broadcaster> {
        &self.broadcaster
    }

    pub fn filter(&self) -> &AccessFilter {
        &self.filter
    }

    /// Handle one datagram from the engine.
    ///
    /// Returns the number of messages relayed; a malformed datagram is logged
    /// and relays nothing.
    pub async fn on_datagram(&self, bytes: &[u8]) -> usize {
        let messages = match codec::decode_packet(bytes) {
            Ok(messages) => messages,
            Err(e) => {
                warn!("Dropping datagram ({} bytes): {}", bytes.len(), e);
                return 0;
            }
        };

        for msg in &messages {
            self.relay(msg).await;
        }
        messages.len()
    }

    /// Update the registry from a message and broadcast it
    pub async fn relay(&self, msg: &Message) -> BroadcastReport {
        if let Some(observation) = self.registry.observe(msg, &self.registry_addresses) {
            debug!("Registry updated: {:?}", observation);
        }

        let report = self.broadcaster.broadcast(msg).await;
        debug!(
            "Relayed {} to {} clients ({} dropped)",
            msg.address,
            report.delivered,
            report.dropped.len()
        );
        report
    }

    /// Handle one text frame from a client
    pub async fn on_client_frame(&self, text: &str) -> Result<Disposition> {
        let msg = frame::parse(text)?;
        self.forward(&msg).await
    }

    /// Send a message to the engine if its address is whitelisted
    pub async fn forward(&self, msg: &Message) -> Result<Disposition> {
        if !self.filter.is_allowed(&msg.address) {
            debug!("Filtered {}", msg.address);
            return Ok(Disposition::Filtered);
        }

        let bytes = codec::encode(msg)?;
        self.upstream.send(Bytes::from(bytes)).await?;
        debug!("Forwarded {} [{}]", msg.address, msg.type_tags());
        Ok(Disposition::Forwarded)
    }
}

/// OSC/WebSocket bridge
pub struct Bridge {
    config: BridgeConfig,
    registry: Arc<Registry>,
    broadcaster: Arc<Broadcaster>,
}

impl Bridge {
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            registry: Arc::new(Registry::new()),
            broadcaster: Arc::new(Broadcaster::new()),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Bind all endpoints and start the loops.
    ///
    /// Fails if any endpoint cannot be bound; nothing is left running in that
    /// case.
    pub async fn start(self) -> Result<BridgeHandle> {
        let config = self.config;
        config.validate()?;
        let engine_addr = config.engine_socket_addr()?;

        let osc = UdpTransport::bind_with_config(
            &config.osc_listen,
            UdpConfig {
                max_packet_size: config.max_datagram_size,
                ..Default::default()
            },
        )
        .await
        .map_err(|e| BridgeError::bind("OSC listener", &config.osc_listen, e))?;
        let osc_addr = osc.local_addr()?;

        let upstream = UdpTransport::bind(&config.osc_send_bind)
            .await
            .map_err(|e| BridgeError::bind("OSC sender", &config.osc_send_bind, e))?;
        let upstream_addr = upstream.local_addr()?;

        let ws = WebSocketServer::bind(&config.ws_listen)
            .await
            .map_err(|e| BridgeError::bind("WebSocket listener", &config.ws_listen, e))?
            .with_config(WebSocketConfig {
                send_queue_capacity: config.client_queue_capacity,
                ..Default::default()
            });
        let ws_addr = ws.local_addr()?;

        #[cfg(feature = "http")]
        let http_listener = match config.http_addr() {
            Some(addr) => Some(
                tokio::net::TcpListener::bind(addr)
                    .await
                    .map_err(|e| BridgeError::bind("HTTP listener", addr, e))?,
            ),
            None => None,
        };
        #[cfg(feature = "http")]
        let http_addr = match &http_listener {
            Some(listener) => Some(listener.local_addr()?),
            None => None,
        };
        #[cfg(not(feature = "http"))]
        let http_addr = None;

        let core = Arc::new(BridgeCore::new(
            AccessFilter::new(config.allowed_prefixes.iter().cloned()),
            RegistryAddresses::new(&config.registry_namespace),
            self.registry.clone(),
            self.broadcaster.clone(),
            Arc::new(upstream.sender_to(engine_addr)),
        ));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut tasks = Vec::new();

        tasks.push(tokio::spawn(receive_loop(
            core.clone(),
            osc.start_receiver(),
            shutdown_rx.clone(),
        )));
        tasks.push(tokio::spawn(accept_loop(
            core.clone(),
            ws,
            shutdown_rx.clone(),
        )));

        #[cfg(feature = "http")]
        {
            if let Some(listener) = http_listener {
                let router = crate::http::router(
                    self.registry.clone(),
                    self.broadcaster.clone(),
                    &crate::http::HttpOptions {
                        cors: config.cors,
                        static_dir: config.static_dir.clone(),
                    },
                );
                let mut shutdown = shutdown_rx.clone();
                tasks.push(tokio::spawn(async move {
                    let signal = async move {
                        let _ = shutdown.changed().await;
                    };
                    if let Err(e) = crate::http::serve(listener, router, signal).await {
                        error!("HTTP server error: {}", e);
                    }
                }));
            }
        }

        info!(
            "Bridge started: OSC {} -> engine {} (from {}), WebSocket {}",
            osc_addr, engine_addr, upstream_addr, ws_addr
        );
        if let Some(addr) = http_addr {
            info!("HTTP query surface on {}", addr);
        }

        Ok(BridgeHandle {
            osc_addr,
            upstream_addr,
            ws_addr,
            http_addr,
            core,
            shutdown_tx,
            tasks,
        })
    }
}

/// Receive engine datagrams until shutdown
async fn receive_loop(
    core: Arc<BridgeCore>,
    mut receiver: UdpReceiver,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            event = receiver.recv_from() => match event {
                Some((TransportEvent::Data(data), from)) => {
                    debug!("Datagram from {} ({} bytes)", from, data.len());
                    core.on_datagram(&data).await;
                }
                Some((TransportEvent::Error(e), _)) => {
                    error!("OSC receive error: {}", e);
                }
                Some(_) => {}
                None => break,
            },
            _ = shutdown.changed() => break,
        }
    }
    info!("OSC receive loop stopped");
}

/// Accept client connections until shutdown.
///
/// Only the TCP accept runs here. Each handshake runs on its own task so a
/// peer that never completes it cannot hold up the next connection.
async fn accept_loop(
    core: Arc<BridgeCore>,
    mut server: WebSocketServer,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            accepted = server.accept_pending() => match accepted {
                Ok(pending) => {
                    let core = core.clone();
                    let shutdown = shutdown.clone();
                    tokio::spawn(async move {
                        let peer = pending.peer();
                        match pending.upgrade().await {
                            Ok((sender, receiver)) => {
                                if *shutdown.borrow() {
                                    sender.close().await.ok();
                                    return;
                                }
                                session::spawn_session(core, Arc::new(sender), receiver, peer);
                            }
                            Err(e) => {
                                warn!("Handshake with {} failed: {}", peer, e);
                            }
                        }
                    });
                }
                Err(e) => {
                    warn!("Accept error: {}", e);
                }
            },
            _ = shutdown.changed() => break,
        }
    }
    info!("WebSocket accept loop stopped");
}

/// Handle to a running bridge
pub struct BridgeHandle {
    osc_addr: SocketAddr,
    upstream_addr: SocketAddr,
    ws_addr: SocketAddr,
    http_addr: Option<SocketAddr>,
    core: Arc<BridgeCore>,
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl BridgeHandle {
    /// Address the engine sends to
    pub fn osc_addr(&self) -> SocketAddr {
        self.osc_addr
    }

    /// Local address datagrams to the engine are sent from
    pub fn upstream_addr(&self) -> SocketAddr {
        self.upstream_addr
    }

    pub fn ws_addr(&self) -> SocketAddr {
        self.ws_addr
    }

    pub fn http_addr(&self) -> Option<SocketAddr> {
        self.http_addr
    }

    pub fn core(&self) -> &Arc<BridgeCore> {
        &self.core
    }

    pub fn registry(&self) -> Arc<Registry> {
        self.core.registry().clone()
    }

    pub fn broadcaster(&self) -> Arc<Broadcaster> {
        self.core.broadcaster().clone()
    }

    /// Signal the loops to stop without waiting for them
    pub fn stop(&self) {
        self.shutdown_tx.send_replace(true);
    }

    /// Stop the loops, close every session and release the sockets
    pub async fn shutdown(mut self) {
        info!("Bridge shutting down");
        self.stop();
        self.core.broadcaster().close_all().await;

        for task in std::mem::take(&mut self.tasks) {
            if tokio::time::timeout(Duration::from_secs(5), task).await.is_err() {
                warn!("Bridge task did not stop in time");
            }
        }
        info!("Bridge stopped");
    }
}

impl Drop for BridgeHandle {
    fn drop(&mut self) {
        self.shutdown_tx.send_replace(true);
    }
}
