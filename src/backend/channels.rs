//! Event channels between the read loop and its consumers
//!
//! Three unbounded crossbeam channels carry status, result and log
//! payloads. The read loop never blocks on a send; a consumer that stops
//! draining makes its queue grow instead.

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

/// Which event stream a payload belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Node status reports
    Status,
    /// Test results and acknowledgements
    Result,
    /// Stored log entries
    Log,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Status => write!(f, "status"),
            EventKind::Result => write!(f, "result"),
            EventKind::Log => write!(f, "log"),
        }
    }
}

/// Create the three event channels
pub fn event_channels() -> (EventSenders, EventReceivers) {
    let (status_tx, status_rx) = unbounded();
    let (result_tx, result_rx) = unbounded();
    let (log_tx, log_rx) = unbounded();

    (
        EventSenders {
            status: status_tx,
            result: result_tx,
            log: log_tx,
        },
        EventReceivers {
            status: ChannelDrain::new(EventKind::Status, status_rx),
            result: ChannelDrain::new(EventKind::Result, result_rx),
            log: ChannelDrain::new(EventKind::Log, log_rx),
        },
    )
}

/// Producer side, owned by the event router
#[derive(Debug, Clone)]
pub struct EventSenders {
    status: Sender<String>,
    result: Sender<String>,
    log: Sender<String>,
}

impl EventSenders {
    /// Push a payload; returns false if every consumer is gone
    pub fn push(&self, kind: EventKind, payload: String) -> bool {
        let sender = match kind {
            EventKind::Status => &self.status,
            EventKind::Result => &self.result,
            EventKind::Log => &self.log,
        };
        sender.send(payload).is_ok()
    }
}

/// Consumer side of all three channels
#[derive(Debug, Clone)]
pub struct EventReceivers {
    /// Status reports
    pub status: ChannelDrain,
    /// Results and acknowledgements
    pub result: ChannelDrain,
    /// Log entries
    pub log: ChannelDrain,
}

/// Non-blocking consumer handle for one channel
#[derive(Debug, Clone)]
pub struct ChannelDrain {
    kind: EventKind,
    receiver: Receiver<String>,
}

impl ChannelDrain {
    fn new(kind: EventKind, receiver: Receiver<String>) -> Self {
        Self { kind, receiver }
    }

    /// Which stream this drains
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Try to receive one payload without blocking
    pub fn try_recv(&self) -> Option<String> {
        self.receiver.try_recv().ok()
    }

    /// Wait up to `timeout` for one payload.
    ///
    /// Returns `Ok(None)` on timeout and `Err` once the producer is gone
    /// and the queue is empty.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<String>, ChannelClosed> {
        match self.receiver.recv_timeout(timeout) {
            Ok(payload) => Ok(Some(payload)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(ChannelClosed(self.kind)),
        }
    }

    /// Receive all pending payloads in arrival order
    pub fn drain(&self) -> Vec<String> {
        self.receiver.try_iter().collect()
    }

    /// Number of queued payloads
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Whether nothing is queued
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

/// The producer side of a channel has been dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelClosed(pub EventKind);

impl std::fmt::Display for ChannelClosed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} channel closed", self.0)
    }
}

impl std::error::Error for ChannelClosed {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_twice() {
        let (tx, rx) = event_channels();
        assert!(tx.push(EventKind::Status, "status 1 2".into()));
        assert!(tx.push(EventKind::Status, "status 3 4".into()));

        assert_eq!(rx.status.drain(), vec!["status 1 2", "status 3 4"]);
        assert!(rx.status.drain().is_empty());
    }

    #[test]
    fn test_channels_are_independent() {
        let (tx, rx) = event_channels();
        tx.push(EventKind::Result, "result 4 passed".into());
        tx.push(EventKind::Log, "1 1700000000 4".into());

        assert!(rx.status.is_empty());
        assert_eq!(rx.result.len(), 1);
        assert_eq!(rx.log.try_recv().as_deref(), Some("1 1700000000 4"));
        assert!(rx.log.is_empty());
    }

    #[test]
    fn test_push_never_blocks() {
        let (tx, rx) = event_channels();
        for i in 0..50_000 {
            assert!(tx.push(EventKind::Log, i.to_string()));
        }
        assert_eq!(rx.log.len(), 50_000);
        assert_eq!(rx.log.drain().first().map(String::as_str), Some("0"));
    }

    #[test]
    fn test_recv_timeout_and_close() {
        let (tx, rx) = event_channels();
        assert_eq!(rx.log.recv_timeout(Duration::from_millis(10)), Ok(None));

        tx.push(EventKind::Log, "x".into());
        drop(tx);
        assert_eq!(
            rx.log.recv_timeout(Duration::from_millis(10)),
            Ok(Some("x".to_string()))
        );
        assert_eq!(
            rx.log.recv_timeout(Duration::from_millis(10)),
            Err(ChannelClosed(EventKind::Log))
        );
    }

    #[test]
    fn test_push_after_consumers_dropped() {
        let (tx, rx) = event_channels();
        drop(rx);
        assert!(!tx.push(EventKind::Status, "status 1 2".into()));
    }
}
