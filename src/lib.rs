//! # lightmon: serial bridge for light-monitor gateways
//!
//! A light-monitor gateway is a mesh controller that exposes a text shell on
//! a USB serial port. It reports node status, test results, acknowledgements,
//! node discovery and stored log entries as prefixed lines, mixed with shell
//! prompts and terminal escape codes. This crate reads that stream, turns it
//! into typed events, and keeps a durable list of discovered nodes.
//!
//! ## Architecture
//!
//! - **Protocol**: [`protocol::LineDecoder`] cleans raw lines,
//!   [`protocol::classify`] maps them to [`Message`]s
//! - **Backend**: a single read loop thread owns the port and routes messages
//!   into three unbounded crossbeam channels (status, result, log)
//! - **Registry**: [`NodeRegistry`] keeps discovered node ids, appending each
//!   new one to a text file before it becomes visible
//! - **Aggregator**: [`LogAggregator`] folds log entries into a per-node,
//!   per-timestamp [`ResultTable`]
//! - **Controller**: [`MonitorController`] sends `monitor ...` commands
//! - **Console**: [`console::Console`] runs the operator prompt of the binary
//!
//! ## Example
//!
//! ```ignore
//! use lightmon::{
//!     backend::{discover_port, Bridge},
//!     config::AppConfig,
//!     registry::{FileNodeStore, NodeRegistry},
//!     LogAggregator,
//! };
//! use std::sync::Arc;
//!
//! let config = AppConfig::default();
//! let (link, writer, _port) = discover_port(&config.serial, config.bridge.max_line_bytes)?;
//! let registry = Arc::new(NodeRegistry::load(FileNodeStore::new(&config.storage.nodes_file))?);
//! let (bridge, handle) = Bridge::new(Box::new(link), writer, registry);
//! let reader = bridge.spawn()?;
//!
//! let aggregator = LogAggregator::new(handle.events.log.clone(), &config.aggregator);
//! aggregator.pump();
//! println!("{}", aggregator.snapshot_json()?);
//! ```

pub mod aggregator;
pub mod backend;
pub mod config;
pub mod console;
pub mod controller;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod types;

// Re-export commonly used types
pub use aggregator::{LogAggregator, LogEntry, ResultTable};
pub use backend::{Bridge, BridgeHandle};
pub use config::AppConfig;
pub use controller::MonitorController;
pub use error::{BridgeError, Result};
pub use registry::NodeRegistry;
pub use types::{BridgeStats, LinkState, Message, NodeId};
