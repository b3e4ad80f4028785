//! Cortex Transport Layer
//!
//! Provides the two transports the bridge sits between:
//! - UDP (the synthesis engine's OSC endpoint)
//! - WebSocket (browser clients, plus a client connector for tools and tests)

pub mod error;
pub mod traits;

#[cfg(feature = "udp")]
pub mod udp;

#[cfg(feature = "websocket")]
pub mod websocket;

pub use error::{Result, TransportError};
pub use traits::{Transport, TransportEvent, TransportReceiver, TransportSender, TransportServer};

#[cfg(feature = "udp")]
pub use udp::{UdpConfig, UdpReceiver, UdpSender, UdpTransport};

#[cfg(feature = "websocket")]
pub use websocket::{
    PendingConnection, WebSocketConfig, WebSocketReceiver, WebSocketSender, WebSocketServer,
    WebSocketTransport,
};
