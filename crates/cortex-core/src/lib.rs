//! Cortex Core
//!
//! Message model and encodings shared by every part of the Cortex bridge:
//! - Addressed, typed-argument messages ([`Message`], [`Arg`])
//! - OSC wire encoding/decoding for the engine side ([`codec`])
//! - JSON transport frames for the browser side ([`frame`])
//! - Address-prefix access control ([`AccessFilter`])
//! - Registry descriptors announced by the engine ([`ModuleDescriptor`], [`ParamDescriptor`])

pub mod codec;
pub mod error;
pub mod filter;
pub mod frame;
pub mod types;

pub use codec::{decode, decode_packet, encode};
pub use error::{Error, Result};
pub use filter::{AccessFilter, DEFAULT_ALLOWED_PREFIXES};
pub use frame::TransportFrame;
pub use types::*;

/// Port the bridge listens on for engine broadcasts
pub const DEFAULT_OSC_LISTEN_PORT: u16 = 57122;

/// Port the synthesis engine listens on
pub const DEFAULT_ENGINE_PORT: u16 = 57120;

/// HTTP query surface port
pub const DEFAULT_HTTP_PORT: u16 = 3000;

/// WebSocket client port
pub const DEFAULT_WS_PORT: u16 = 3001;

/// Address namespace of the engine's registry broadcasts
pub const DEFAULT_REGISTRY_NAMESPACE: &str = "/brahma/registry";
