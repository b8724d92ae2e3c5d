//! Error handling for lightmon
//!
//! This module defines the crate error type and a Result alias used
//! throughout the bridge.

use thiserror::Error;

/// Main error type for bridge operations
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Errors raised by the serial port layer
    #[error("Serial error: {0}")]
    Serial(#[from] serialport::Error),

    /// IO errors (device link, node log)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors related to the durable node log
    #[error("Registry error: {0}")]
    Registry(String),

    /// A node identifier that cannot be registered
    #[error("Invalid node identifier: {0:?}")]
    InvalidNode(String),

    /// Errors related to channel communication
    #[error("Channel error: {0}")]
    Channel(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Console input that could not be understood
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// No candidate port answered the handshake
    #[error("No device answered on any of: {0}")]
    NoDevice(String),

    /// The device link reported end of stream
    #[error("Device connection closed")]
    ConnectionClosed,

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<BridgeError>,
    },
}

impl BridgeError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        BridgeError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Whether this error means the device link is gone for good
    pub fn is_connection_fatal(&self) -> bool {
        match self {
            BridgeError::ConnectionClosed | BridgeError::Serial(_) | BridgeError::Io(_) => true,
            BridgeError::WithContext { source, .. } => source.is_connection_fatal(),
            _ => false,
        }
    }
}

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::io::Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| BridgeError::from(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| BridgeError::from(e).with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BridgeError::InvalidNode("".to_string());
        assert_eq!(err.to_string(), "Invalid node identifier: \"\"");
    }

    #[test]
    fn test_error_with_context() {
        let err = BridgeError::Registry("disk full".to_string());
        let with_ctx = err.with_context("Failed to append node 17");
        assert!(with_ctx.to_string().contains("Failed to append node 17"));
        assert!(with_ctx.to_string().contains("disk full"));
    }

    #[test]
    fn test_connection_fatal_classification() {
        assert!(BridgeError::ConnectionClosed.is_connection_fatal());
        assert!(BridgeError::ConnectionClosed
            .with_context("reading line")
            .is_connection_fatal());
        assert!(!BridgeError::Config("bad".into()).is_connection_fatal());
    }

    #[test]
    fn test_io_result_context() {
        let res: std::io::Result<()> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing",
        ));
        let err = res.context("opening node log").unwrap_err();
        assert!(err.to_string().starts_with("opening node log"));
    }
}
