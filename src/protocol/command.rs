//! Outbound gateway commands
//!
//! The gateway exposes its functions as `monitor <subcommand>` shell
//! commands. The bridge itself forwards arbitrary text; this enum is the
//! typed vocabulary used by [`crate::controller::MonitorController`].

use crate::types::NodeId;

/// Shell command group on the gateway
pub const COMMAND_GROUP: &str = "monitor";

/// A `monitor` shell command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Ask every node for its status
    Status,
    /// Start a test of `duration_secs` stamped with `epoch_secs`
    Start { duration_secs: u32, epoch_secs: i64 },
    /// Fetch stored log entry `index` from every node
    Log(u32),
    /// Ask a single node to acknowledge
    Ack(NodeId),
    /// Print the node list held by the gateway
    NodesList,
    /// Liveness check used during port discovery
    PortOk,
    /// Clear the gateway's node list
    ResetNodes,
    /// Add the first node to an empty list
    AddFirstNode(NodeId),
    /// Append a node to a non-empty list
    AddNode(NodeId),
    /// Set the light sensor calibration threshold
    Calibrate(String),
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ", COMMAND_GROUP)?;
        match self {
            Command::Status => write!(f, "status"),
            Command::Start {
                duration_secs,
                epoch_secs,
            } => write!(f, "start {} {}", duration_secs, epoch_secs),
            Command::Log(index) => write!(f, "log {}", index),
            Command::Ack(node) => write!(f, "ack {}", node),
            Command::NodesList => write!(f, "nodeslist"),
            Command::PortOk => write!(f, "portok"),
            Command::ResetNodes => write!(f, "reset_nodes"),
            Command::AddFirstNode(node) => write!(f, "add_first_node {}", node),
            Command::AddNode(node) => write!(f, "add_node {}", node),
            Command::Calibrate(value) => write!(f, "calibrate {}", value),
        }
    }
}
