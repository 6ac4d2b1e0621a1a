//! Ingestion server configuration

use serde::Deserialize;
use std::time::Duration;

/// Ingestion server configuration
///
/// Agents connect here and push newline-delimited JSON log messages.
///
/// # Example
///
/// ```toml
/// [ingest]
/// port = 9999
/// max_line_length = 65536
/// connection_timeout = "0s"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Bind address
    /// Default: "0.0.0.0"
    pub address: String,

    /// Listen port
    /// Default: 9999
    pub port: u16,

    /// Read buffer size per connection (bytes)
    /// Default: 262144 (256KB)
    pub buffer_size: usize,

    /// Maximum line length; longer lines are dropped
    /// Default: 65536 (64KB)
    pub max_line_length: usize,

    /// Enable TCP_NODELAY
    /// Default: true
    pub nodelay: bool,

    /// Enable TCP keepalive
    /// Default: true
    pub keepalive: bool,

    /// Idle connection timeout (0 = no timeout)
    /// Default: 0s
    #[serde(with = "humantime_serde")]
    pub connection_timeout: Duration,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".into(),
            port: 9999,
            buffer_size: 256 * 1024,
            max_line_length: 64 * 1024,
            nodelay: true,
            keepalive: true,
            connection_timeout: Duration::ZERO,
        }
    }
}
