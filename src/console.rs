//! Operator console
//!
//! Lines starting with `:` are handled locally; anything else is forwarded
//! to the gateway unchanged. Input arrives over a channel fed by a stdin
//! reader thread, so the console also notices when the read loop stops
//! while the operator is idle.
//!
//! A command that fails is logged and the console keeps going. Only
//! `:quit`, end of input, or a stopped read loop end it.

use crate::aggregator::LogAggregator;
use crate::backend::BridgeHandle;
use crate::controller::MonitorController;
use crate::error::{BridgeError, Result};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError};
use serde::Serialize;
use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

/// Test length used by `:start` without an argument
pub const DEFAULT_TEST_SECS: u32 = 60;

const HELP: &str = "\
:status          drain status updates
:results         drain result updates
:log             print the aggregated log table as JSON
:nodes           list known nodes
:stats           print read loop counters
:start <secs>    start a test
:sync            push the node list to the gateway
:quit            exit
anything else is sent to the gateway as-is";

/// What the console should do after a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleAction {
    Continue,
    Quit,
}

/// Why the console stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleExit {
    /// The operator typed `:quit`
    Quit,
    /// Input closed
    EndOfInput,
    /// The read loop stopped (link closed or shutdown requested)
    LinkStopped,
}

/// Interactive front end over a running bridge
pub struct Console {
    handle: BridgeHandle,
    controller: MonitorController,
    aggregator: Arc<LogAggregator>,
    poll_interval: Duration,
}

impl Console {
    pub fn new(handle: BridgeHandle, controller: MonitorController, aggregator: Arc<LogAggregator>) -> Self {
        Self {
            handle,
            controller,
            aggregator,
            poll_interval: Duration::from_millis(100),
        }
    }

    /// How often to check the read loop while waiting for input
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Handle lines from `input` until quit, end of input or link loss
    pub fn run(&self, input: &Receiver<String>, out: &mut impl Write) -> ConsoleExit {
        loop {
            if !self.handle.is_running() {
                tracing::warn!("Read loop has stopped");
                return ConsoleExit::LinkStopped;
            }

            let line = match input.recv_timeout(self.poll_interval) {
                Ok(line) => line,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return ConsoleExit::EndOfInput,
            };

            match self.execute(&line, out) {
                Ok(ConsoleAction::Continue) => {}
                Ok(ConsoleAction::Quit) => return ConsoleExit::Quit,
                Err(e) => tracing::warn!("{:?} failed: {}", line.trim(), e),
            }
        }
    }

    /// Handle one line of input
    pub fn execute(&self, line: &str, out: &mut impl Write) -> Result<ConsoleAction> {
        let line = line.trim();
        let mut words = line.split_whitespace();

        match words.next() {
            None => {}
            Some(":quit") => return Ok(ConsoleAction::Quit),
            Some(":status") => writeln!(out, "{}", to_json(&self.handle.status_updates())?)?,
            Some(":results") => writeln!(out, "{}", to_json(&self.handle.result_updates())?)?,
            Some(":log") => writeln!(out, "{}", self.aggregator.snapshot_json()?)?,
            Some(":nodes") => writeln!(out, "{}", self.handle.registry.all().join(" "))?,
            Some(":stats") => writeln!(out, "{}", to_json(&self.handle.stats())?)?,
            Some(":start") => {
                let duration = match words.next() {
                    Some(secs) => secs
                        .parse()
                        .map_err(|_| BridgeError::InvalidCommand(format!("not a duration: {}", secs)))?,
                    None => DEFAULT_TEST_SECS,
                };
                let pending = self.controller.start_test(duration)?;
                writeln!(out, "{}", to_json(&pending)?)?;
            }
            Some(":sync") => {
                let nodes = self.controller.sync_nodes()?;
                writeln!(out, "synced {} node(s)", nodes.len())?;
            }
            Some(":help") => writeln!(out, "{}", HELP)?,
            Some(other) if other.starts_with(':') => {
                writeln!(out, "{}", HELP)?;
                return Err(BridgeError::InvalidCommand(other.to_string()));
            }
            Some(_) => self.controller.send_raw(line)?,
        }

        Ok(ConsoleAction::Continue)
    }
}

fn to_json(value: &impl Serialize) -> Result<String> {
    serde_json::to_string(value).map_err(|e| BridgeError::Serialization(e.to_string()))
}

/// Read stdin lines on a background thread.
///
/// The channel disconnects at end of input or on a read error.
pub fn spawn_stdin_reader() -> Result<Receiver<String>> {
    let (tx, rx) = unbounded();
    std::thread::Builder::new()
        .name("lightmon-stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Failed to read stdin: {}", e);
                        break;
                    }
                }
            }
        })?;
    Ok(rx)
}
