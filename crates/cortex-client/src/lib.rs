//! Cortex Client
//!
//! WebSocket client for the Cortex bridge with the same behavior as the
//! browser UI: it reconnects on a fixed interval, never buffers messages
//! while disconnected, and reports every state change.
//!
//! # Example
//!
//! ```no_run
//! use cortex_client::{ClientConfig, ClientEvent, CortexClient};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (client, mut events) = CortexClient::spawn(ClientConfig::new("ws://localhost:3001"));
//!     client.wait_connected(Duration::from_secs(5)).await;
//!
//!     client
//!         .send("/daemon/lorenz/create", vec!["lorenz1".into(), 10.into()])
//!         .await?;
//!
//!     while let Some(event) = events.recv().await {
//!         if let ClientEvent::Message(msg) = event {
//!             println!("{}", msg);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;

pub use client::{ClientConfig, ClientEvent, ConnectionState, CortexClient, DEFAULT_RETRY_INTERVAL};
pub use error::{ClientError, Result};
