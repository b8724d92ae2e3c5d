//! Configuration module for lightmon
//!
//! The bridge is configured from a single TOML file. Every section is
//! optional; missing sections and fields fall back to defaults that match
//! the stock gateway firmware (115200 baud, `/dev/ttyACM*` ports).
//!
//! # Config Location
//!
//! Unless a path is given explicitly, the config is read from the
//! platform-appropriate config directory under `lightmon`:
//! - **Linux**: `~/.config/lightmon/config.toml`
//! - **macOS**: `~/Library/Application Support/lightmon/config.toml`
//! - **Windows**: `%APPDATA%\lightmon\config.toml`
//!
//! # Example
//!
//! ```toml
//! [serial]
//! candidates = ["/dev/ttyACM0"]
//! read_timeout_ms = 250
//!
//! [storage]
//! nodes_file = "/var/lib/lightmon/nodes.txt"
//!
//! [aggregator]
//! timestamp_zone = "utc"
//! ```

pub mod settings;

pub use settings::*;

use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for config directories
pub const APP_ID: &str = "lightmon";

/// Config filename
pub const CONFIG_FILE: &str = "config.toml";

/// Default baud rate of the gateway shell
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default bounded read timeout in milliseconds
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 500;

/// Default delay after opening a port in milliseconds
pub const DEFAULT_SETTLE_MS: u64 = 500;

/// Default path of the durable node log
pub const DEFAULT_NODES_FILE: &str = "data/nodes_file.txt";

/// Default cap on a single buffered line
pub const DEFAULT_MAX_LINE_BYTES: usize = 4096;

/// Default delay between node-list commands in milliseconds
pub const DEFAULT_COMMAND_SPACING_MS: u64 = 100;

/// Default tracing filter
pub const DEFAULT_LOG_FILTER: &str = "info,lightmon=debug";

/// Get the default config file path
pub fn default_config_path() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID).join(CONFIG_FILE))
}

/// Complete bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Serial link and handshake
    #[serde(default)]
    pub serial: SerialConfig,

    /// Durable node log
    #[serde(default)]
    pub storage: StorageConfig,

    /// Read loop and node-list sync
    #[serde(default)]
    pub bridge: BridgeConfig,

    /// Log aggregator
    #[serde(default)]
    pub aggregator: AggregatorConfig,

    /// Tracing output
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| BridgeError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            BridgeError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        Self::from_toml_str(&content).map_err(|e| e.with_context(format!("{:?}", path)))
    }

    /// Load a configuration file, returning defaults if it is missing or invalid
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("No config at {:?}, using defaults", path);
            return Self::default();
        }

        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save the configuration as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    BridgeError::Config(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| BridgeError::Serialization(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| BridgeError::Config(format!("Failed to write config: {}", e)))
    }
}
