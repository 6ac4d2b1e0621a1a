//! Error types for the protocol crate

use thiserror::Error;

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors that can occur while decoding wire messages
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Line was not a valid JSON-encoded ingest message
    #[error("invalid ingest message: {0}")]
    Decode(#[from] serde_json::Error),

    /// Line was empty after trimming
    #[error("empty line")]
    EmptyLine,
}
