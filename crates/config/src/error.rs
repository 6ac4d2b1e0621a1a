//! Configuration error types

use std::io;
use thiserror::Error;

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur when loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("failed to read config file '{path}': {source}")]
    IoError {
        /// Path to the file
        path: String,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Validation error - same port used by multiple servers
    #[error("port {port} is used by both the ingest and API servers")]
    DuplicatePort {
        /// The conflicting port
        port: u16,
    },

    /// Validation error - invalid value
    #[error("{section}.{field} is invalid: {message}")]
    InvalidValue {
        /// Config section
        section: &'static str,
        /// Field name
        field: &'static str,
        /// Error message
        message: String,
    },
}

impl ConfigError {
    /// Create an InvalidValue error
    pub fn invalid_value(
        section: &'static str,
        field: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            section,
            field,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_port_error() {
        let err = ConfigError::DuplicatePort { port: 9000 };
        assert!(err.to_string().contains("9000"));
    }

    #[test]
    fn test_invalid_value_error() {
        let err = ConfigError::invalid_value("buffer", "capacity", "must be greater than zero");
        assert!(err.to_string().contains("buffer.capacity"));
        assert!(err.to_string().contains("greater than zero"));
    }
}
