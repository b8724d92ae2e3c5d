//! Event router
//!
//! Dispatches each classified [`Message`] to its channel and performs the
//! node registry side effects of discovery messages. Registry writes finish
//! before [`EventRouter::dispatch`] returns, so the next message always sees
//! the effects of the previous one.

use super::channels::{EventKind, EventSenders};
use crate::registry::NodeRegistry;
use crate::types::{BridgeCounters, Message};
use std::sync::Arc;

/// What the router did with a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Routed {
    /// Channel the payload went to, if any
    pub channel: Option<EventKind>,
    /// Whether a previously unknown node was registered
    pub registered: bool,
}

impl Routed {
    fn to(channel: EventKind) -> Self {
        Self {
            channel: Some(channel),
            registered: false,
        }
    }

    fn nowhere() -> Self {
        Self {
            channel: None,
            registered: false,
        }
    }
}

/// Routes messages to channels and the node registry
pub struct EventRouter {
    senders: EventSenders,
    registry: Arc<NodeRegistry>,
    counters: Arc<BridgeCounters>,
}

impl EventRouter {
    /// Create a router over the given channels and registry
    pub fn new(
        senders: EventSenders,
        registry: Arc<NodeRegistry>,
        counters: Arc<BridgeCounters>,
    ) -> Self {
        Self {
            senders,
            registry,
            counters,
        }
    }

    /// Route one message
    pub fn dispatch(&self, message: Message) -> Routed {
        match message {
            Message::Status(payload) => self.push(EventKind::Status, payload),
            Message::Result(payload) => self.push(EventKind::Result, payload),
            Message::Acking { node, payload } => {
                let mut routed = self.push(EventKind::Result, payload);
                routed.registered = self.discover(&node);
                routed
            }
            Message::NodeOk { node, .. } => Routed {
                channel: None,
                registered: self.discover(&node),
            },
            Message::Logged(payload) => self.push(EventKind::Log, payload),
            Message::Unclassified(line) => {
                BridgeCounters::bump(&self.counters.unclassified_lines);
                tracing::info!("gateway: {}", line);
                Routed::nowhere()
            }
            Message::Undecodable => {
                BridgeCounters::bump(&self.counters.undecodable_lines);
                tracing::warn!("Got a line that could not be decoded");
                Routed::nowhere()
            }
        }
    }

    fn push(&self, kind: EventKind, payload: String) -> Routed {
        tracing::trace!("{} <- {}", kind, payload);
        if !self.senders.push(kind, payload) {
            tracing::debug!("No consumer left for {} events", kind);
        }

        let counter = match kind {
            EventKind::Status => &self.counters.status_events,
            EventKind::Result => &self.counters.result_events,
            EventKind::Log => &self.counters.log_events,
        };
        BridgeCounters::bump(counter);

        Routed::to(kind)
    }

    fn discover(&self, node: &str) -> bool {
        if node.is_empty() || self.registry.contains(node) {
            return false;
        }

        match self.registry.register(node) {
            Ok(registered) => {
                if registered {
                    BridgeCounters::bump(&self.counters.nodes_registered);
                }
                registered
            }
            Err(e) => {
                BridgeCounters::bump(&self.counters.registry_failures);
                tracing::error!("Failed to register node {}: {}", node, e);
                false
            }
        }
    }
}
