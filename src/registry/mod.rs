//! Node registry
//!
//! Ordered set of node identifiers the gateway has reported, backed by an
//! append-only durable log. The registry is shared between the read loop
//! (which registers nodes as `acking`/`nodeok` lines arrive) and consumers
//! (which enumerate nodes to build commands and pending-result maps).
//!
//! # Write ordering
//!
//! A new identifier is appended to the durable log before it becomes
//! visible in memory. If the append fails the node stays unknown and the
//! next report of it retries the append. A crash between the append and
//! the in-memory insert loses nothing: the next startup reloads the log.
//!
//! Registration is serialized by a mutex so two threads reporting the same
//! node cannot both append it. Lookups only take a read lock.

pub mod store;

pub use store::{FileNodeStore, MemoryNodeStore};

use crate::error::{BridgeError, Result};
use crate::types::NodeId;
use std::collections::HashSet;
use std::sync::{Mutex, RwLock};

/// Durable backing for the node registry
#[cfg_attr(test, mockall::automock)]
pub trait NodeStore: Send + Sync {
    /// Read every stored identifier in file order
    fn load(&self) -> Result<Vec<NodeId>>;

    /// Durably append one identifier
    fn append(&self, node: &str) -> Result<()>;
}

#[derive(Debug, Default)]
struct NodeSet {
    order: Vec<NodeId>,
    index: HashSet<NodeId>,
}

impl NodeSet {
    fn from_entries(entries: Vec<NodeId>) -> Self {
        let mut set = Self::default();
        for entry in entries {
            let entry = entry.trim();
            if entry.is_empty() || set.index.contains(entry) {
                continue;
            }
            set.insert(entry.to_string());
        }
        set
    }

    fn insert(&mut self, node: NodeId) {
        self.index.insert(node.clone());
        self.order.push(node);
    }
}

/// In-memory node set with durable append-only backing
pub struct NodeRegistry {
    store: Box<dyn NodeStore>,
    nodes: RwLock<NodeSet>,
    write_lock: Mutex<()>,
}

impl std::fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRegistry")
            .field("nodes", &self.all())
            .finish_non_exhaustive()
    }
}

impl NodeRegistry {
    /// Build the registry from everything already in the durable log
    pub fn load(store: impl NodeStore + 'static) -> Result<Self> {
        let entries = store.load()?;
        let nodes = NodeSet::from_entries(entries);
        tracing::info!("Loaded {} known node(s)", nodes.order.len());

        Ok(Self {
            store: Box::new(store),
            nodes: RwLock::new(nodes),
            write_lock: Mutex::new(()),
        })
    }

    /// Re-read the durable log, replacing the in-memory set
    pub fn reload(&self) -> Result<Vec<NodeId>> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| BridgeError::Registry(format!("Registry lock poisoned: {}", e)))?;

        let nodes = NodeSet::from_entries(self.store.load()?);
        let order = nodes.order.clone();
        *self.nodes.write().unwrap_or_else(|e| e.into_inner()) = nodes;
        Ok(order)
    }

    /// Whether `node` is already known
    pub fn contains(&self, node: &str) -> bool {
        self.nodes
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .index
            .contains(node)
    }

    /// Register `node`, returning `true` if it was not known before.
    ///
    /// Known nodes are a no-op with no durable write.
    pub fn register(&self, node: &str) -> Result<bool> {
        if node.is_empty() || node.chars().any(char::is_whitespace) {
            return Err(BridgeError::InvalidNode(node.to_string()));
        }

        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| BridgeError::Registry(format!("Registry lock poisoned: {}", e)))?;

        if self.contains(node) {
            return Ok(false);
        }

        self.store.append(node)?;
        self.nodes
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(node.to_string());

        tracing::info!("Registered new node {}", node);
        Ok(true)
    }

    /// All known nodes in registration order
    pub fn all(&self) -> Vec<NodeId> {
        self.nodes
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .order
            .clone()
    }

    /// Number of known nodes
    pub fn len(&self) -> usize {
        self.nodes.read().unwrap_or_else(|e| e.into_inner()).order.len()
    }

    /// Whether no nodes are known
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
