//! Configuration sections
//!
//! Each section of the TOML config file maps to one struct here. Every
//! field has a default so a partial (or missing) file still yields a
//! usable configuration.
//!
//! # Main Types
//!
//! - [`SerialConfig`] - Candidate ports, baud rate, read timeout, handshake
//! - [`StorageConfig`] - Location of the durable node log
//! - [`BridgeConfig`] - Read loop limits and node-list sync behaviour
//! - [`AggregatorConfig`] - Timestamp formatting and polling of the log channel
//! - [`LoggingConfig`] - Tracing filter and optional log directory

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::protocol::Command;

use super::{
    DEFAULT_BAUD_RATE, DEFAULT_COMMAND_SPACING_MS, DEFAULT_LOG_FILTER, DEFAULT_MAX_LINE_BYTES,
    DEFAULT_NODES_FILE, DEFAULT_READ_TIMEOUT_MS, DEFAULT_SETTLE_MS,
};

/// Serial link configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Ports tried in order. Empty means every port the OS reports.
    pub candidates: Vec<String>,

    /// Baud rate
    pub baud_rate: u32,

    /// Bounded wait for a single read, in milliseconds
    pub read_timeout_ms: u64,

    /// Delay after opening a port before the handshake, in milliseconds
    pub settle_ms: u64,

    /// Liveness command sent to each candidate
    pub handshake_command: String,

    /// Substring expected in the reply to the liveness command
    pub handshake_reply: String,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            candidates: (0..5).map(|i| format!("/dev/ttyACM{}", i)).collect(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            settle_ms: DEFAULT_SETTLE_MS,
            handshake_command: Command::PortOk.to_string(),
            handshake_reply: "PORTOK".to_string(),
        }
    }
}

impl SerialConfig {
    /// Read timeout as a Duration
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Settle delay as a Duration
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

/// Durable storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Newline-delimited file of known node identifiers
    pub nodes_file: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            nodes_file: PathBuf::from(DEFAULT_NODES_FILE),
        }
    }
}

/// Read loop and gateway interaction settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// A partial line longer than this is discarded
    pub max_line_bytes: usize,

    /// Push the registered node list to the gateway after startup
    pub sync_nodes_on_start: bool,

    /// Delay between consecutive node-list commands, in milliseconds
    pub command_spacing_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            sync_nodes_on_start: true,
            command_spacing_ms: DEFAULT_COMMAND_SPACING_MS,
        }
    }
}

impl BridgeConfig {
    /// Command spacing as a Duration
    pub fn command_spacing(&self) -> Duration {
        Duration::from_millis(self.command_spacing_ms)
    }
}

/// Time zone used when formatting log timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimestampZone {
    /// Host local time
    #[default]
    Local,
    /// UTC
    Utc,
}

impl std::fmt::Display for TimestampZone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimestampZone::Local => write!(f, "local"),
            TimestampZone::Utc => write!(f, "utc"),
        }
    }
}

/// Log aggregator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Zone for the formatted timestamp keys of the result table
    pub timestamp_zone: TimestampZone,

    /// How long the aggregator thread waits on the log channel per tick
    pub poll_interval_ms: u64,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            timestamp_zone: TimestampZone::default(),
            poll_interval_ms: 100,
        }
    }
}

impl AggregatorConfig {
    /// Poll interval as a Duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Tracing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// EnvFilter directive used when RUST_LOG is unset
    pub filter: String,

    /// Directory for daily-rolling log files (console only when unset)
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            log_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_defaults() {
        let serial = SerialConfig::default();
        assert_eq!(serial.candidates.len(), 5);
        assert_eq!(serial.candidates[0], "/dev/ttyACM0");
        assert_eq!(serial.baud_rate, 115_200);
        assert_eq!(serial.read_timeout(), Duration::from_millis(500));
        assert_eq!(serial.handshake_command, "monitor portok");
        assert_eq!(serial.handshake_reply, "PORTOK");
    }

    #[test]
    fn test_timestamp_zone_serde() {
        let zone: TimestampZone = serde_json::from_str("\"utc\"").unwrap();
        assert_eq!(zone, TimestampZone::Utc);
        assert_eq!(serde_json::to_string(&TimestampZone::Local).unwrap(), "\"local\"");
    }

    #[test]
    fn test_bridge_defaults() {
        let bridge = BridgeConfig::default();
        assert!(bridge.sync_nodes_on_start);
        assert_eq!(bridge.command_spacing(), Duration::from_millis(100));
    }
}
