//! Gateway control from the consumer side
//!
//! [`MonitorController`] issues `monitor ...` commands through the bridge's
//! [`CommandWriter`]. Writes are serialized by the writer and never touch
//! the read loop.

use crate::backend::CommandWriter;
use crate::error::Result;
use crate::protocol::Command;
use crate::registry::NodeRegistry;
use crate::types::NodeId;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Placeholder result for nodes that have not reported yet
pub const NO_RESPONSE: &str = "No response";

/// Issues gateway commands
#[derive(Debug, Clone)]
pub struct MonitorController {
    writer: CommandWriter,
    registry: Arc<NodeRegistry>,
    spacing: Duration,
}

impl MonitorController {
    /// Create a controller; `spacing` separates consecutive node-list commands
    pub fn new(writer: CommandWriter, registry: Arc<NodeRegistry>, spacing: Duration) -> Self {
        Self {
            writer,
            registry,
            spacing,
        }
    }

    /// Send a command
    pub fn send(&self, command: &Command) -> Result<()> {
        self.writer.send_line(&command.to_string())
    }

    /// Send arbitrary text
    pub fn send_raw(&self, line: &str) -> Result<()> {
        self.writer.send_line(line)
    }

    /// Submit an empty line so a half-typed shell input does not swallow
    /// the next command
    fn clear_input(&self) -> Result<()> {
        self.writer.send_line("")
    }

    /// Ask every node for its status
    pub fn request_status(&self) -> Result<()> {
        self.clear_input()?;
        self.send(&Command::Status)
    }

    /// Start a test of `duration_secs`, stamped with the current time.
    ///
    /// Returns every registered node mapped to [`NO_RESPONSE`], the
    /// starting point of the result view for this test.
    pub fn start_test(&self, duration_secs: u32) -> Result<BTreeMap<NodeId, String>> {
        self.start_test_at(duration_secs, chrono::Utc::now().timestamp())
    }

    /// Start a test with an explicit epoch timestamp
    pub fn start_test_at(&self, duration_secs: u32, epoch_secs: i64) -> Result<BTreeMap<NodeId, String>> {
        self.clear_input()?;
        self.send(&Command::Start {
            duration_secs,
            epoch_secs,
        })?;
        tracing::info!("Started {}s test at {}", duration_secs, epoch_secs);

        Ok(self
            .registry
            .all()
            .into_iter()
            .map(|node| (node, NO_RESPONSE.to_string()))
            .collect())
    }

    /// Replace the gateway's node list with the registry contents.
    ///
    /// Returns the nodes sent, in order. Does nothing when no node is known.
    pub fn sync_nodes(&self) -> Result<Vec<NodeId>> {
        let nodes = self.registry.all();
        let Some((first, rest)) = nodes.split_first() else {
            tracing::debug!("No known nodes to sync");
            return Ok(nodes);
        };

        self.clear_input()?;
        self.send(&Command::ResetNodes)?;
        self.send(&Command::AddFirstNode(first.clone()))?;
        for node in rest {
            std::thread::sleep(self.spacing);
            self.send(&Command::AddNode(node.clone()))?;
        }

        tracing::info!("Synced {} node(s) to the gateway", nodes.len());
        Ok(nodes)
    }

    /// Set the light sensor calibration threshold
    pub fn calibrate(&self, value: &str) -> Result<()> {
        self.send(&Command::Calibrate(value.to_string()))
    }

    /// Ask nodes to replay stored log entry `index`
    pub fn request_log(&self, index: u32) -> Result<()> {
        self.send(&Command::Log(index))
    }

    /// Ask `node` to acknowledge
    pub fn request_ack(&self, node: &str) -> Result<()> {
        self.send(&Command::Ack(node.to_string()))
    }

    /// Ask the gateway to print its node list (answered with `nodeok` lines)
    pub fn request_node_list(&self) -> Result<()> {
        self.send(&Command::NodesList)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SharedBuffer;
    use crate::registry::MemoryNodeStore;

    fn controller(nodes: &[&str]) -> (MonitorController, SharedBuffer) {
        let sink = SharedBuffer::default();
        let store = MemoryNodeStore::with_entries(nodes.iter().copied());
        let registry = Arc::new(NodeRegistry::load(store).unwrap());
        (
            MonitorController::new(CommandWriter::new(sink.clone()), registry, Duration::ZERO),
            sink,
        )
    }

    #[test]
    fn test_request_status_clears_input_first() {
        let (ctl, sink) = controller(&[]);
        ctl.request_status().unwrap();
        assert_eq!(sink.contents(), "\nmonitor status\n");
    }

    #[test]
    fn test_start_test_returns_pending_nodes() {
        let (ctl, sink) = controller(&["3", "1"]);
        let pending = ctl.start_test_at(60, 1_700_000_000).unwrap();

        assert_eq!(sink.contents(), "\nmonitor start 60 1700000000\n");
        assert_eq!(pending.len(), 2);
        assert_eq!(pending["3"], NO_RESPONSE);
        assert_eq!(pending["1"], NO_RESPONSE);
    }

    #[test]
    fn test_sync_nodes_order() {
        let (ctl, sink) = controller(&["5", "9", "2"]);
        assert_eq!(ctl.sync_nodes().unwrap(), vec!["5", "9", "2"]);
        assert_eq!(
            sink.lines(),
            vec![
                "",
                "monitor reset_nodes",
                "monitor add_first_node 5",
                "monitor add_node 9",
                "monitor add_node 2",
            ]
        );
    }

    #[test]
    fn test_sync_nodes_empty_registry() {
        let (ctl, sink) = controller(&[]);
        assert!(ctl.sync_nodes().unwrap().is_empty());
        assert!(sink.contents().is_empty());
    }

    #[test]
    fn test_simple_commands() {
        let (ctl, sink) = controller(&[]);
        ctl.calibrate("350").unwrap();
        ctl.request_log(1).unwrap();
        ctl.request_ack("4").unwrap();
        ctl.request_node_list().unwrap();
        ctl.send_raw("help").unwrap();

        assert_eq!(
            sink.lines(),
            vec![
                "monitor calibrate 350",
                "monitor log 1",
                "monitor ack 4",
                "monitor nodeslist",
                "help",
            ]
        );
    }
}
