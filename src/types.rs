//! Core data types for lightmon
//!
//! # Main Types
//!
//! - [`Message`] - A classified line from the gateway shell
//! - [`LinkState`] - Read loop state (Running / Stopped)
//! - [`BridgeStats`] - Snapshot of read loop counters
//! - [`BridgeCounters`] - Lock-free counters updated by the read loop

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier of a mesh node (the gateway reports unicast addresses)
pub type NodeId = String;

/// A line from the device after classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// `status <node> <value>` - whole line
    Status(String),
    /// `result <node> <passed|failed>` - whole line
    Result(String),
    /// `acking <node> ...` - the node acknowledged a test start
    Acking {
        /// Node identifier (empty when the line carried none)
        node: NodeId,
        /// Whole line, surfaced on the result channel
        payload: String,
    },
    /// `nodeok <node>` - the gateway reports a provisioned node
    NodeOk {
        /// Node identifier (empty when the line carried none)
        node: NodeId,
        /// Whole line
        payload: String,
    },
    /// `logged <result> <timestamp> <node>` - payload after the keyword
    Logged(String),
    /// Non-empty line with an unknown leading token
    Unclassified(String),
    /// Raw bytes that were not valid text
    Undecodable,
}

impl Message {
    /// Short name of the variant, used in log output
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Status(_) => "status",
            Message::Result(_) => "result",
            Message::Acking { .. } => "acking",
            Message::NodeOk { .. } => "nodeok",
            Message::Logged(_) => "logged",
            Message::Unclassified(_) => "unclassified",
            Message::Undecodable => "undecodable",
        }
    }
}

/// State of the read loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LinkState {
    /// Reading lines from the device
    #[default]
    Running,
    /// Terminal: link closed, failed, or shutdown requested
    Stopped,
}

impl std::fmt::Display for LinkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkState::Running => write!(f, "Running"),
            LinkState::Stopped => write!(f, "Stopped"),
        }
    }
}

/// Statistics about the read loop
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BridgeStats {
    /// Raw lines received from the link
    pub lines_read: u64,
    /// Lines that were not valid UTF-8
    pub undecodable_lines: u64,
    /// Non-empty lines with an unknown leading token
    pub unclassified_lines: u64,
    /// Partial lines discarded for exceeding the length limit
    pub oversize_lines: u64,
    /// Payloads pushed to the status channel
    pub status_events: u64,
    /// Payloads pushed to the result channel
    pub result_events: u64,
    /// Payloads pushed to the log channel
    pub log_events: u64,
    /// Nodes newly registered during this run
    pub nodes_registered: u64,
    /// Failed durable appends
    pub registry_failures: u64,
}

/// Counters shared between the read loop and consumers
#[derive(Debug, Default)]
pub struct BridgeCounters {
    pub(crate) lines_read: AtomicU64,
    pub(crate) undecodable_lines: AtomicU64,
    pub(crate) unclassified_lines: AtomicU64,
    pub(crate) oversize_lines: AtomicU64,
    pub(crate) status_events: AtomicU64,
    pub(crate) result_events: AtomicU64,
    pub(crate) log_events: AtomicU64,
    pub(crate) nodes_registered: AtomicU64,
    pub(crate) registry_failures: AtomicU64,
}

impl BridgeCounters {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a point-in-time copy of all counters
    pub fn snapshot(&self) -> BridgeStats {
        BridgeStats {
            lines_read: self.lines_read.load(Ordering::Relaxed),
            undecodable_lines: self.undecodable_lines.load(Ordering::Relaxed),
            unclassified_lines: self.unclassified_lines.load(Ordering::Relaxed),
            oversize_lines: self.oversize_lines.load(Ordering::Relaxed),
            status_events: self.status_events.load(Ordering::Relaxed),
            result_events: self.result_events.load(Ordering::Relaxed),
            log_events: self.log_events.load(Ordering::Relaxed),
            nodes_registered: self.nodes_registered.load(Ordering::Relaxed),
            registry_failures: self.registry_failures.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_kind() {
        assert_eq!(Message::Status("status 1 2".into()).kind(), "status");
        assert_eq!(
            Message::Acking {
                node: "5".into(),
                payload: "acking 5 waiting".into()
            }
            .kind(),
            "acking"
        );
        assert_eq!(Message::Undecodable.kind(), "undecodable");
    }

    #[test]
    fn test_link_state_default_is_running() {
        assert_eq!(LinkState::default(), LinkState::Running);
        assert_eq!(LinkState::Stopped.to_string(), "Stopped");
    }

    #[test]
    fn test_counters_snapshot() {
        let counters = BridgeCounters::default();
        BridgeCounters::bump(&counters.lines_read);
        BridgeCounters::bump(&counters.lines_read);
        BridgeCounters::bump(&counters.log_events);

        let stats = counters.snapshot();
        assert_eq!(stats.lines_read, 2);
        assert_eq!(stats.log_events, 1);
        assert_eq!(stats.status_events, 0);
    }
}
