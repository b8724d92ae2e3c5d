//! Mock construction helpers

use lightmon::backend::{Bridge, BridgeHandle, CommandWriter, MockFeed, MockLink, SharedBuffer};
use lightmon::registry::{FileNodeStore, MemoryNodeStore, NodeRegistry, NodeStore};
use std::path::Path;
use std::sync::Arc;

/// A bridge wired to a mock link and an in-memory writer
pub struct MockBridge {
    pub bridge: Bridge,
    pub handle: BridgeHandle,
    pub feed: MockFeed,
    pub sink: SharedBuffer,
}

/// Build a bridge over a mock link backed by `store`
pub fn create_mock_bridge(store: impl NodeStore + 'static) -> MockBridge {
    let (link, feed) = MockLink::new("mock-gateway");
    let sink = SharedBuffer::default();
    let registry = Arc::new(NodeRegistry::load(store).expect("registry should load"));
    let (bridge, handle) = Bridge::new(Box::new(link), CommandWriter::new(sink.clone()), registry);

    MockBridge {
        bridge,
        handle,
        feed,
        sink,
    }
}

/// Bridge with an empty in-memory registry
pub fn create_memory_bridge() -> MockBridge {
    create_mock_bridge(MemoryNodeStore::new())
}

/// Bridge whose registry persists to `nodes_file`
pub fn create_file_bridge(nodes_file: &Path) -> MockBridge {
    create_mock_bridge(FileNodeStore::new(nodes_file))
}
