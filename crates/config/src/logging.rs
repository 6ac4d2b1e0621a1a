//! Logging configuration
//!
//! Controls the internal logging behavior of Shepherd.

use serde::Deserialize;

/// Log level
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level - very verbose
    Trace,
    /// Debug level - debugging information
    Debug,
    /// Info level - normal operation (default)
    #[default]
    Info,
    /// Warn level - warnings only
    Warn,
    /// Error level - errors only
    Error,
}

impl LogLevel {
    /// Convert to tracing level filter string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable console output (default)
    #[default]
    Console,
    /// JSON structured logging
    Json,
}

/// Logging configuration
///
/// # Example
///
/// ```toml
/// [log]
/// level = "info"
/// format = "console"
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    /// Default: info
    pub level: LogLevel,

    /// Output format (console, json)
    /// Default: console
    pub format: LogFormat,
}
