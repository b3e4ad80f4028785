//! Cortex Bridge
//!
//! The bridge sits between the synthesis engine (OSC over UDP) and browser
//! clients (JSON over WebSocket):
//! - Relays every engine broadcast to every connected client
//! - Caches module/parameter metadata announced by the engine
//! - Forwards client messages to the engine when their address is whitelisted
//! - Exposes the cached registry over HTTP
//!
//! # Example
//!
//! ```no_run
//! use cortex_bridge::{Bridge, BridgeConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let handle = Bridge::new(BridgeConfig::default()).start().await?;
//!     tokio::signal::ctrl_c().await?;
//!     handle.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod bridge;
pub mod broadcast;
pub mod config;
pub mod error;
pub mod registry;
pub mod session;

#[cfg(feature = "http")]
pub mod http;

pub use bridge::{Bridge, BridgeCore, BridgeHandle, Disposition};
pub use broadcast::{BroadcastReport, Broadcaster};
pub use config::BridgeConfig;
pub use error::{BridgeError, Result};
pub use registry::{Observation, Registry, RegistryAddresses};
pub use session::{Session, SessionId};
