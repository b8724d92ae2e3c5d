//! Node store implementations

use super::NodeStore;
use crate::error::{BridgeError, Result, ResultExt};
use crate::types::NodeId;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Newline-delimited text file, one identifier per line
#[derive(Debug, Clone)]
pub struct FileNodeStore {
    path: PathBuf,
}

impl FileNodeStore {
    /// Use the node log at `path` (created on first append)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the node log
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl NodeStore for FileNodeStore {
    fn load(&self) -> Result<Vec<NodeId>> {
        if !self.path.exists() {
            tracing::debug!("Node log {:?} does not exist yet", self.path);
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read node log {:?}", self.path))?;

        Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn append(&self, node: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {:?}", parent))?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open node log {:?}", self.path))?;

        writeln!(file, "{}", node)
            .and_then(|_| file.sync_data())
            .with_context(|| format!("Failed to append node {} to {:?}", node, self.path))
    }
}

/// Volatile store, for tests and runs without persistence
#[derive(Debug, Clone, Default)]
pub struct MemoryNodeStore {
    entries: Arc<Mutex<Vec<NodeId>>>,
}

impl MemoryNodeStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-filled with `entries`
    pub fn with_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<NodeId>,
    {
        Self {
            entries: Arc::new(Mutex::new(entries.into_iter().map(Into::into).collect())),
        }
    }

    /// Every appended line, duplicates included
    pub fn entries(&self) -> Vec<NodeId> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl NodeStore for MemoryNodeStore {
    fn load(&self) -> Result<Vec<NodeId>> {
        Ok(self.entries())
    }

    fn append(&self, node: &str) -> Result<()> {
        self.entries
            .lock()
            .map_err(|e| BridgeError::Registry(format!("Store lock poisoned: {}", e)))?
            .push(node.to_string());
        Ok(())
    }
}
