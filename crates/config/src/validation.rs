//! Configuration validation
//!
//! Catches configurations that would fail at startup anyway, with a clearer
//! message than a bind error.

use crate::error::{ConfigError, Result};
use crate::Config;

/// Validate a parsed configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.ingest.port == config.api.port {
        return Err(ConfigError::DuplicatePort {
            port: config.ingest.port,
        });
    }

    if config.buffer.capacity == 0 {
        return Err(ConfigError::invalid_value(
            "buffer",
            "capacity",
            "must be greater than zero",
        ));
    }

    if config.ingest.max_line_length == 0 {
        return Err(ConfigError::invalid_value(
            "ingest",
            "max_line_length",
            "must be greater than zero",
        ));
    }

    if config.tap.max_subscribers == 0 {
        return Err(ConfigError::invalid_value(
            "tap",
            "max_subscribers",
            "must be greater than zero",
        ));
    }

    Ok(())
}
