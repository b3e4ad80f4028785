//! Bridge error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BridgeError>;

#[derive(Error, Debug)]
pub enum BridgeError {
    /// A listening or sending endpoint could not be established
    #[error("failed to bind {what} on {addr}: {source}")]
    Bind {
        what: &'static str,
        addr: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("codec error: {0}")]
    Core(#[from] cortex_core::Error),

    #[error("transport error: {0}")]
    Transport(#[from] cortex_transport::TransportError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    pub(crate) fn bind<E>(what: &'static str, addr: &str, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        BridgeError::Bind {
            what,
            addr: addr.to_string(),
            source: source.into(),
        }
    }
}
