//! Configuration file for the CLI
//!
//! Every field is optional:
//!
//! ```json
//! { "key_size_limit": 100, "include_tombstones": true, "compression": "gzip" }
//! ```
//!
//! A `--compress-type` given on the command line overrides `compression`.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::errors::{CliError, CliResult};
use crate::container::{CompressionType, ScannerConfig, DEFAULT_KEY_SIZE_LIMIT};
use crate::observability::{log_event_with_fields, Event};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Upper bound for record key sizes (default 100)
    #[serde(default = "default_key_size_limit")]
    pub key_size_limit: i32,

    /// Whether count and list include tombstones (default true)
    #[serde(default = "default_include_tombstones")]
    pub include_tombstones: bool,

    /// Container compression when none is given on the command line
    #[serde(default)]
    pub compression: Option<CompressionType>,
}

fn default_key_size_limit() -> i32 {
    DEFAULT_KEY_SIZE_LIMIT
}
fn default_include_tombstones() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            key_size_limit: default_key_size_limit(),
            include_tombstones: default_include_tombstones(),
            compression: None,
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config = Self::from_json(&content)?;

        let path_str = path.display().to_string();
        log_event_with_fields(Event::ConfigLoaded, &[("path", path_str.as_str())]);

        Ok(config)
    }

    /// Parse and validate configuration JSON
    pub fn from_json(content: &str) -> CliResult<Self> {
        let config: Config = serde_json::from_str(content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> CliResult<()> {
        if self.key_size_limit <= 0 {
            return Err(CliError::config_error(format!(
                "key_size_limit must be > 0, got {}",
                self.key_size_limit
            )));
        }
        Ok(())
    }

    /// Scanner settings derived from this configuration
    pub fn scanner_config(&self) -> ScannerConfig {
        ScannerConfig {
            key_size_limit: self.key_size_limit,
            include_tombstones: self.include_tombstones,
        }
    }

    /// Compression to use: command line first, then file, then gzip
    pub fn resolve_compression(&self, cli: Option<CompressionType>) -> CompressionType {
        cli.or(self.compression).unwrap_or_default()
    }
}
