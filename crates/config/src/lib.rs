//! Shepherd Configuration
//!
//! TOML-based configuration loading with sensible defaults. A minimal (or
//! absent) config just works - only specify what you need to change.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use shepherd_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[ingest]\nport = 9999").unwrap();
//! assert_eq!(config.ingest.port, 9999);
//! ```
//!
//! # Example Full Config
//!
//! ```toml
//! [log]
//! level = "info"
//! format = "console"
//!
//! [ingest]
//! address = "0.0.0.0"
//! port = 9999
//! max_line_length = 65536
//!
//! [api]
//! port = 8000
//!
//! [buffer]
//! capacity = 1000
//!
//! [tap]
//! max_subscribers = 100
//! ping_interval = "30s"
//! ```

mod api;
mod buffer;
mod error;
mod ingest;
mod logging;
mod tap;
mod validation;

use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

pub use api::ApiConfig;
pub use buffer::BufferConfig;
pub use error::{ConfigError, Result};
pub use ingest::IngestConfig;
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use tap::TapConfig;

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub log: LogConfig,

    /// Ingestion server (agent connections)
    pub ingest: IngestConfig,

    /// API server (queries and WebSocket subscribers)
    pub api: ApiConfig,

    /// Record buffer sizing
    pub buffer: BufferConfig,

    /// Live fan-out limits
    pub tap: TapConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or contains invalid TOML.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config.ingest.port, 9999);
        assert_eq!(config.api.port, 8000);
        assert_eq!(config.buffer.capacity, 1000);
    }

    #[test]
    fn test_minimal_config() {
        let toml = r#"
[ingest]
port = 15000
"#;
        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.ingest.port, 15000);
        // Untouched sections keep defaults
        assert_eq!(config.api.port, 8000);
    }

    #[test]
    fn test_full_config_parse() {
        let toml = r#"
[log]
level = "debug"
format = "json"

[ingest]
address = "127.0.0.1"
port = 15000
max_line_length = 32768
connection_timeout = "60s"

[api]
address = "127.0.0.1"
port = 15001

[buffer]
capacity = 5000

[tap]
max_subscribers = 50
channel_buffer = 128
ping_interval = "10s"
"#;
        let config = Config::from_str(toml).unwrap();

        assert_eq!(config.log.level, LogLevel::Debug);
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.ingest.address, "127.0.0.1");
        assert_eq!(config.ingest.max_line_length, 32768);
        assert_eq!(
            config.ingest.connection_timeout,
            std::time::Duration::from_secs(60)
        );
        assert_eq!(config.api.port, 15001);
        assert_eq!(config.buffer.capacity, 5000);
        assert_eq!(config.tap.max_subscribers, 50);
        assert_eq!(
            config.tap.ping_interval,
            std::time::Duration::from_secs(10)
        );
    }

    #[test]
    fn test_invalid_toml() {
        let result = Config::from_str("invalid { toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_port_conflict_rejected() {
        let toml = r#"
[ingest]
port = 9000

[api]
port = 9000
"#;
        assert!(matches!(
            Config::from_str(toml),
            Err(ConfigError::DuplicatePort { port: 9000 })
        ));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let toml = r#"
[buffer]
capacity = 0
"#;
        assert!(Config::from_str(toml).is_err());
    }
}
