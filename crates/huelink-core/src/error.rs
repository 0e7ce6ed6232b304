//! Error types for huelink

use thiserror::Error;

/// Result type alias for huelink operations
pub type Result<T> = std::result::Result<T, Error>;

/// huelink error types
#[derive(Error, Debug)]
pub enum Error {
    /// Hub reply was not the expected JSON shape
    #[error("malformed hub reply: {0}")]
    MalformedReply(String),

    /// Hub reply array carried no elements
    #[error("empty hub reply")]
    EmptyReply,

    /// JSON decoding error
    #[error("decode error: {0}")]
    DecodeError(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::DecodeError(e.to_string())
    }
}
