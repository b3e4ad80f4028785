//! Error types for Cortex

use thiserror::Error;

/// Result type alias for Cortex codec operations
pub type Result<T> = std::result::Result<T, Error>;

/// Cortex codec error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// UDP payload that is not a well-formed OSC message
    #[error("malformed wire message: {0}")]
    MalformedWireMessage(String),

    /// Client frame that is not a well-formed `{address, args}` object
    #[error("malformed transport frame: {0}")]
    MalformedTransportFrame(String),

    /// Message could not be encoded
    #[error("encode error: {0}")]
    Encode(String),
}

impl Error {
    pub(crate) fn wire(msg: impl Into<String>) -> Self {
        Error::MalformedWireMessage(msg.into())
    }

    pub(crate) fn frame(msg: impl Into<String>) -> Self {
        Error::MalformedTransportFrame(msg.into())
    }
}

impl From<rosc::OscError> for Error {
    fn from(e: rosc::OscError) -> Self {
        Error::MalformedWireMessage(format!("{:?}", e))
    }
}
