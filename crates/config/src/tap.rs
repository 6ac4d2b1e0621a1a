//! Live fan-out configuration

use serde::Deserialize;
use std::time::Duration;

/// Live fan-out limits
///
/// # Example
///
/// ```toml
/// [tap]
/// max_subscribers = 100
/// channel_buffer = 256
/// ping_interval = "30s"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TapConfig {
    /// Maximum concurrent WebSocket subscribers
    /// Default: 100
    pub max_subscribers: usize,

    /// Per-subscriber channel buffer; a subscriber this far behind is
    /// dropped
    /// Default: 256
    pub channel_buffer: usize,

    /// WebSocket liveness ping interval
    /// Default: 30s
    #[serde(with = "humantime_serde")]
    pub ping_interval: Duration,
}

impl Default for TapConfig {
    fn default() -> Self {
        Self {
            max_subscribers: 100,
            channel_buffer: 256,
            ping_interval: Duration::from_secs(30),
        }
    }
}
