//! Client sessions

use bytes::Bytes;
use cortex_transport::{TransportError, TransportEvent, TransportReceiver, TransportSender};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::bridge::BridgeCore;

/// Session identifier
pub type SessionId = String;

/// A connected browser client
pub struct Session {
    /// Unique session ID
    pub id: SessionId,
    /// Remote address
    pub peer: SocketAddr,
    /// Transport sender for this session
    sender: Arc<dyn TransportSender>,
    /// Session creation time
    pub created_at: Instant,
}

impl Session {
    pub fn new(sender: Arc<dyn TransportSender>, peer: SocketAddr) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            peer,
            sender,
            created_at: Instant::now(),
        }
    }

    /// Queue a frame without waiting
    pub fn try_send(&self, data: Bytes) -> Result<(), TransportError> {
        if !self.is_open() {
            return Err(TransportError::ConnectionClosed);
        }
        self.sender.try_send(data)
    }

    pub fn is_open(&self) -> bool {
        self.sender.is_connected()
    }

    pub async fn close(&self) {
        if let Err(e) = self.sender.close().await {
            debug!("Error closing session {}: {}", self.id, e);
        }
    }
}

/// Register a session for an accepted connection and spawn its reader task.
///
/// The session is in the broadcast set when this returns. It leaves the set
/// when the connection ends.
pub fn spawn_session<R>(
    core: Arc<BridgeCore>,
    sender: Arc<dyn TransportSender>,
    mut receiver: R,
    peer: SocketAddr,
) -> JoinHandle<()>
where
    R: TransportReceiver + 'static,
{
    let session = Arc::new(Session::new(sender, peer));
    core.broadcaster().register(session.clone());
    info!("Client {} connected from {}", session.id, peer);

    tokio::spawn(async move {
        while let Some(event) = receiver.recv().await {
            match event {
                TransportEvent::Data(data) => {
                    handle_frame(&core, &session, &data).await;
                }
                TransportEvent::Disconnected { reason } => {
                    info!(
                        "Client {} disconnected after {:?}: {}",
                        session.id,
                        session.created_at.elapsed(),
                        reason.as_deref().unwrap_or("connection closed")
                    );
                    break;
                }
                TransportEvent::Error(e) => {
                    warn!("Client {} transport error: {}", session.id, e);
                    break;
                }
                TransportEvent::Connected => {}
            }
        }

        core.broadcaster().deregister(&session.id);
        session.close().await;
    })
}

async fn handle_frame(core: &BridgeCore, session: &Session, data: &[u8]) {
    let text = match std::str::from_utf8(data) {
        Ok(text) => text,
        Err(_) => {
            warn!("Client {} sent a frame that is not UTF-8", session.id);
            return;
        }
    };

    if let Err(e) = core.on_client_frame(text).await {
        warn!("Client {} frame rejected: {}", session.id, e);
    }
}
