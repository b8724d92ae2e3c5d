//! Log aggregator
//!
//! Folds `logged` payloads (`<result> <epoch seconds> <node>`) into a
//! per-node, per-timestamp result table. The gateway replays stored log
//! entries on request, so the same entry routinely arrives more than once:
//! the first result recorded for a `(node, timestamp)` pair is kept and
//! later ones are ignored.

use crate::backend::ChannelDrain;
use crate::config::{AggregatorConfig, TimestampZone};
use crate::error::{BridgeError, Result};
use crate::types::NodeId;
use chrono::{DateTime, Local, TimeZone, Utc};
use serde::Serialize;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Format of the timestamp keys in the result table
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One parsed `logged` payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Result reported by the node
    pub result: String,
    /// Epoch seconds of the test
    pub timestamp: i64,
    /// Reporting node
    pub node: NodeId,
}

impl LogEntry {
    /// Parse `result timestamp node`; any other shape is rejected
    pub fn parse(payload: &str) -> Option<Self> {
        let tokens: Vec<&str> = payload.split_whitespace().collect();
        let [result, timestamp, node] = tokens.as_slice() else {
            return None;
        };

        Some(Self {
            result: result.to_string(),
            timestamp: timestamp.parse().ok()?,
            node: node.to_string(),
        })
    }

    /// Timestamp rendered for use as a table key
    pub fn formatted_timestamp(&self, zone: TimestampZone) -> Option<String> {
        format_timestamp(self.timestamp, zone)
    }
}

/// Render epoch seconds as `YYYY-MM-DD HH:MM:SS` in `zone`
pub fn format_timestamp(epoch_secs: i64, zone: TimestampZone) -> Option<String> {
    let utc: DateTime<Utc> = Utc.timestamp_opt(epoch_secs, 0).single()?;
    let formatted = match zone {
        TimestampZone::Utc => utc.format(TIMESTAMP_FORMAT).to_string(),
        TimestampZone::Local => utc.with_timezone(&Local).format(TIMESTAMP_FORMAT).to_string(),
    };
    Some(formatted)
}

/// node → (formatted timestamp → result)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ResultTable(BTreeMap<NodeId, BTreeMap<String, String>>);

impl ResultTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `result` unless `(node, timestamp)` is already present
    pub fn record(&mut self, node: &str, timestamp: String, result: &str) -> bool {
        let per_node = self.0.entry(node.to_string()).or_default();
        match per_node.entry(timestamp) {
            Entry::Vacant(slot) => {
                slot.insert(result.to_string());
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Results recorded for `node`
    pub fn node(&self, node: &str) -> Option<&BTreeMap<String, String>> {
        self.0.get(node)
    }

    /// Result recorded for `(node, timestamp)`
    pub fn get(&self, node: &str, timestamp: &str) -> Option<&str> {
        self.0.get(node)?.get(timestamp).map(String::as_str)
    }

    /// Nodes with at least one recorded result
    pub fn nodes(&self) -> impl Iterator<Item = &NodeId> {
        self.0.keys()
    }

    /// Total number of recorded results
    pub fn len(&self) -> usize {
        self.0.values().map(BTreeMap::len).sum()
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrow the underlying map
    pub fn as_map(&self) -> &BTreeMap<NodeId, BTreeMap<String, String>> {
        &self.0
    }

    /// Serialize as a nested JSON object
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| BridgeError::Serialization(format!("Failed to serialize results: {}", e)))
    }
}

/// Consumes the log channel into a [`ResultTable`]
#[derive(Debug)]
pub struct LogAggregator {
    source: ChannelDrain,
    table: RwLock<ResultTable>,
    zone: TimestampZone,
    poll_interval: Duration,
}

impl LogAggregator {
    /// Aggregate payloads from `source`
    pub fn new(source: ChannelDrain, config: &AggregatorConfig) -> Self {
        Self {
            source,
            table: RwLock::new(ResultTable::new()),
            zone: config.timestamp_zone,
            poll_interval: config.poll_interval(),
        }
    }

    /// Fold one payload into the table; returns whether it was recorded
    pub fn ingest(&self, payload: &str) -> bool {
        let Some(entry) = LogEntry::parse(payload) else {
            tracing::debug!("Dropping malformed log payload: {:?}", payload);
            return false;
        };
        let Some(timestamp) = entry.formatted_timestamp(self.zone) else {
            tracing::debug!("Dropping log entry with out-of-range timestamp {}", entry.timestamp);
            return false;
        };

        let recorded = self
            .table
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .record(&entry.node, timestamp, &entry.result);

        if !recorded {
            tracing::trace!("Duplicate log entry for node {} at {}", entry.node, entry.timestamp);
        }
        recorded
    }

    /// Ingest everything currently queued, without blocking.
    ///
    /// Returns the number of payloads consumed.
    pub fn pump(&self) -> usize {
        let payloads = self.source.drain();
        for payload in &payloads {
            self.ingest(payload);
        }
        payloads.len()
    }

    /// Consume the log channel until `running` is cleared or the producer is gone
    pub fn run(&self, running: Arc<AtomicBool>) {
        tracing::info!("Log aggregator started");

        while running.load(Ordering::SeqCst) {
            match self.source.recv_timeout(self.poll_interval) {
                Ok(Some(payload)) => {
                    self.ingest(&payload);
                }
                Ok(None) => {}
                Err(closed) => {
                    tracing::debug!("{}", closed);
                    break;
                }
            }
        }

        // Whatever is still queued belongs in the final table
        self.pump();
        tracing::info!("Log aggregator stopped");
    }

    /// Copy of the current table
    pub fn snapshot(&self) -> ResultTable {
        self.table.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Current table as JSON
    pub fn snapshot_json(&self) -> Result<String> {
        self.snapshot().to_json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{event_channels, EventKind};

    fn utc_config() -> AggregatorConfig {
        AggregatorConfig {
            timestamp_zone: TimestampZone::Utc,
            poll_interval_ms: 5,
        }
    }

    fn aggregator() -> (LogAggregator, crate::backend::EventSenders) {
        let (tx, rx) = event_channels();
        (LogAggregator::new(rx.log, &utc_config()), tx)
    }

    #[test]
    fn test_parse_entry() {
        assert_eq!(
            LogEntry::parse("PASS 1700000000 NODE7"),
            Some(LogEntry {
                result: "PASS".into(),
                timestamp: 1_700_000_000,
                node: "NODE7".into()
            })
        );
        assert_eq!(LogEntry::parse("PASS NODE7"), None);
        assert_eq!(LogEntry::parse("PASS 1700000000 NODE7 extra"), None);
        assert_eq!(LogEntry::parse("PASS soon NODE7"), None);
        assert_eq!(LogEntry::parse(""), None);
    }

    #[test]
    fn test_format_timestamp_utc() {
        assert_eq!(
            format_timestamp(1_700_000_000, TimestampZone::Utc).as_deref(),
            Some("2023-11-14 22:13:20")
        );
        assert_eq!(format_timestamp(i64::MAX, TimestampZone::Utc), None);
    }

    #[test]
    fn test_local_format_shape() {
        let formatted = format_timestamp(1_700_000_000, TimestampZone::Local).unwrap();
        assert_eq!(formatted.len(), "2023-11-14 22:13:20".len());
    }

    #[test]
    fn test_ingest_records_entry() {
        let (agg, _tx) = aggregator();
        assert!(agg.ingest("PASS 1700000000 NODE7"));

        let table = agg.snapshot();
        assert_eq!(table.get("NODE7", "2023-11-14 22:13:20"), Some("PASS"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_first_write_wins() {
        let (agg, _tx) = aggregator();
        assert!(agg.ingest("PASS 1700000000 NODE7"));
        assert!(!agg.ingest("FAIL 1700000000 NODE7"));

        assert_eq!(agg.snapshot().get("NODE7", "2023-11-14 22:13:20"), Some("PASS"));
    }

    #[test]
    fn test_malformed_payload_is_ignored() {
        let (agg, _tx) = aggregator();
        assert!(!agg.ingest("PASS NODE7"));
        assert!(agg.snapshot().is_empty());
    }

    #[test]
    fn test_pump_drains_channel() {
        let (agg, tx) = aggregator();
        tx.push(EventKind::Log, "1 1700000000 4".into());
        tx.push(EventKind::Log, "0 1700000060 4".into());
        tx.push(EventKind::Log, "bogus".into());

        assert_eq!(agg.pump(), 3);
        assert_eq!(agg.pump(), 0);

        let table = agg.snapshot();
        assert_eq!(table.node("4").map(BTreeMap::len), Some(2));
    }

    #[test]
    fn test_snapshot_json_shape() {
        let (agg, _tx) = aggregator();
        agg.ingest("PASS 1700000000 NODE7");

        let value: serde_json::Value = serde_json::from_str(&agg.snapshot_json().unwrap()).unwrap();
        assert_eq!(value["NODE7"]["2023-11-14 22:13:20"], "PASS");
    }

    #[test]
    fn test_run_exits_when_producer_dropped() {
        let (agg, tx) = aggregator();
        tx.push(EventKind::Log, "1 1700000000 9".into());
        drop(tx);

        agg.run(Arc::new(AtomicBool::new(true)));
        assert_eq!(agg.snapshot().get("9", "2023-11-14 22:13:20"), Some("1"));
    }
}
