//! Error types for the tap crate

use thiserror::Error;

/// Result type for tap operations
pub type Result<T> = std::result::Result<T, TapError>;

/// Errors that can occur in the fan-out system
#[derive(Debug, Error)]
pub enum TapError {
    /// Maximum subscribers reached
    #[error("maximum subscribers reached ({max})")]
    MaxSubscribers { max: usize },
}
