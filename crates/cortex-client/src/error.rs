//! Client error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("not connected")]
    NotConnected,

    #[error("codec error: {0}")]
    Core(#[from] cortex_core::Error),

    #[error("transport error: {0}")]
    Transport(#[from] cortex_transport::TransportError),

    #[error("client closed")]
    Closed,
}
