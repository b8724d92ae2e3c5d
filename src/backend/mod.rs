//! Backend module: the serial read loop and its consumer handle
//!
//! The backend runs in a dedicated thread that owns the device link. It
//! hands events to the rest of the process through three unbounded
//! crossbeam channels and never waits on a consumer.
//!
//! # Architecture
//!
//! - [`Bridge`] - Owns the link and runs the [`BridgeWorker`] read loop
//! - [`BridgeHandle`] - Consumer side: channel drains, command writer,
//!   node registry, statistics and the stop flag
//! - [`EventRouter`] - Pushes classified messages to channels and
//!   registers discovered nodes
//! - [`DeviceLink`] - Line source trait, implemented by [`SerialLink`] for
//!   hardware and [`MockLink`] for tests
//!
//! # Example
//!
//! ```ignore
//! use lightmon::backend::{discover_port, Bridge};
//! use lightmon::config::AppConfig;
//! use lightmon::registry::{FileNodeStore, NodeRegistry};
//! use std::sync::Arc;
//!
//! let config = AppConfig::default();
//! let (link, writer, _port) = discover_port(&config.serial, config.bridge.max_line_bytes)?;
//! let registry = Arc::new(NodeRegistry::load(FileNodeStore::new(&config.storage.nodes_file))?);
//! let (bridge, handle) = Bridge::new(Box::new(link), writer, registry);
//!
//! std::thread::spawn(move || bridge.run());
//!
//! for (node, status) in handle.status_updates() {
//!     println!("{node}: {status}");
//! }
//! ```

pub mod channels;
pub mod link;
pub mod mock_link;
pub mod router;
pub mod worker;

pub use channels::{event_channels, ChannelClosed, ChannelDrain, EventKind, EventReceivers, EventSenders};
pub use link::{discover_port, find_gateway, handshake, CommandWriter, DeviceLink, LineRead, SerialLink};
pub use mock_link::{MockFeed, MockLink, SharedBuffer};
pub use router::{EventRouter, Routed};
pub use worker::{BridgeWorker, Tick};

use crate::error::Result;
use crate::protocol::{node_update, LineDecoder};
use crate::registry::NodeRegistry;
use crate::types::{BridgeCounters, BridgeStats, LinkState, NodeId};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Consumer-side handle to a running bridge
#[derive(Debug, Clone)]
pub struct BridgeHandle {
    /// Status, result and log drains
    pub events: EventReceivers,
    /// Outbound command writer
    pub writer: CommandWriter,
    /// Shared node registry
    pub registry: Arc<NodeRegistry>,
    counters: Arc<BridgeCounters>,
    running: Arc<AtomicBool>,
}

impl BridgeHandle {
    /// Drain queued status payloads into a node → status map.
    ///
    /// Later reports for the same node replace earlier ones.
    pub fn status_updates(&self) -> BTreeMap<NodeId, String> {
        Self::fold_updates(&self.events.status)
    }

    /// Drain queued result payloads into a node → result map
    pub fn result_updates(&self) -> BTreeMap<NodeId, String> {
        Self::fold_updates(&self.events.result)
    }

    fn fold_updates(drain: &ChannelDrain) -> BTreeMap<NodeId, String> {
        let mut updates = BTreeMap::new();
        for payload in drain.drain() {
            match node_update(&payload) {
                Some((node, value)) => {
                    updates.insert(node.to_string(), value.to_string());
                }
                None => tracing::debug!("Skipping malformed {} payload: {}", drain.kind(), payload),
            }
        }
        updates
    }

    /// Send a raw line to the device
    pub fn send_line(&self, line: &str) -> Result<()> {
        self.writer.send_line(line)
    }

    /// Snapshot of the read loop counters
    pub fn stats(&self) -> BridgeStats {
        self.counters.snapshot()
    }

    /// Whether the read loop is still running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Ask the read loop to stop; it notices within one read timeout
    pub fn shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Shared stop flag, for other workers that should stop with the bridge
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }
}

/// The read loop, ready to be moved into its own thread
pub struct Bridge {
    worker: BridgeWorker,
}

impl Bridge {
    /// Wire a link, writer and registry into a bridge and its handle
    pub fn new(
        link: Box<dyn DeviceLink>,
        writer: CommandWriter,
        registry: Arc<NodeRegistry>,
    ) -> (Self, BridgeHandle) {
        Self::with_decoder(link, writer, registry, LineDecoder::new())
    }

    /// Same as [`Bridge::new`] with a custom line decoder
    pub fn with_decoder(
        link: Box<dyn DeviceLink>,
        writer: CommandWriter,
        registry: Arc<NodeRegistry>,
        decoder: LineDecoder,
    ) -> (Self, BridgeHandle) {
        let (senders, receivers) = event_channels();
        let counters = Arc::new(BridgeCounters::default());
        let running = Arc::new(AtomicBool::new(true));

        let router = EventRouter::new(senders, registry.clone(), counters.clone());
        let worker = BridgeWorker::new(link, decoder, router, running.clone(), counters.clone());

        let handle = BridgeHandle {
            events: receivers,
            writer,
            registry,
            counters,
            running,
        };

        (Self { worker }, handle)
    }

    /// Run the read loop until the link closes or shutdown is requested
    pub fn run(mut self) -> LinkState {
        self.worker.run()
    }

    /// Run the read loop on a new named thread
    pub fn spawn(self) -> Result<std::thread::JoinHandle<LinkState>> {
        let handle = std::thread::Builder::new()
            .name("lightmon-read-loop".to_string())
            .spawn(move || self.run())?;
        Ok(handle)
    }
}
