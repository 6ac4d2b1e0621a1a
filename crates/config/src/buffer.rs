//! Record buffer configuration

use serde::Deserialize;

/// Record buffer sizing
///
/// # Example
///
/// ```toml
/// [buffer]
/// capacity = 1000
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Maximum records retained; the oldest is evicted beyond this
    /// Default: 1000
    pub capacity: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self { capacity: 1000 }
    }
}
