//! API server configuration

use serde::Deserialize;

/// API server configuration
///
/// Serves the query endpoints and the `/ws` subscription endpoint.
///
/// # Example
///
/// ```toml
/// [api]
/// address = "0.0.0.0"
/// port = 8000
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Bind address
    /// Default: "0.0.0.0"
    pub address: String,

    /// Listen port
    /// Default: 8000
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".into(),
            port: 8000,
        }
    }
}
