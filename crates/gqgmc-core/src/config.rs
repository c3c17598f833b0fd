//! Connection configuration
//!
//! Stored as JSON, e.g. `gqgmc.json`:
//!
//! ```json
//! { "port": "/dev/ttyUSB0", "byte_timeout_ms": 500 }
//! ```
//!
//! Missing keys fall back to the counter's defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::protocol::{CLEAR_MAX_TRIES, DEFAULT_BAUD_RATE, DEFAULT_BYTE_TIMEOUT_MS};

/// Errors loading or saving a [`DeviceConfig`]
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Connection settings for one counter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Serial device path, e.g. `/dev/ttyUSB0`
    pub port: String,

    /// Line speed. The GMC-300 only talks at 57600.
    pub baud_rate: u32,

    /// Per-byte read timeout in milliseconds
    pub byte_timeout_ms: u64,

    /// Bytes discarded before giving up on a quiet input line
    pub clear_max_tries: usize,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            port: "/dev/gqgmc".to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            byte_timeout_ms: DEFAULT_BYTE_TIMEOUT_MS,
            clear_max_tries: CLEAR_MAX_TRIES,
        }
    }
}

impl DeviceConfig {
    /// Default settings for `port`
    pub fn for_port(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            ..Self::default()
        }
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse settings from a JSON string
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: DeviceConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save settings as pretty-printed JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings that would make every exchange fail
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port.is_empty() {
            return Err(ConfigError::Invalid("port must not be empty".to_string()));
        }
        if self.baud_rate == 0 {
            return Err(ConfigError::Invalid("baud_rate must be non-zero".to_string()));
        }
        if self.byte_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "byte_timeout_ms must be non-zero".to_string(),
            ));
        }
        if self.clear_max_tries == 0 {
            return Err(ConfigError::Invalid(
                "clear_max_tries must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
