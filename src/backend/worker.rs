//! Read loop
//!
//! The worker owns the device link and is the only reader of it. Each tick
//! reads at most one line (bounded by the link's read timeout), then runs
//! it through decode, classify and route before reading the next.
//!
//! # States
//!
//! - **Running** - initial state, loops while the shared running flag is set
//! - **Stopped** - terminal; entered when the link closes or fails with a
//!   connection error, or when the running flag is cleared
//!
//! Undecodable lines, unknown prefixes and oversize lines are logged and
//! skipped; they never change the state.

use super::link::{DeviceLink, LineRead};
use super::router::EventRouter;
use crate::protocol::{classify, DecodedLine, LineDecoder};
use crate::types::{BridgeCounters, LinkState, Message};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Outcome of one read loop tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// A line was read and handled
    Line,
    /// Nothing arrived within the read timeout
    Idle,
    /// The link is gone
    Closed,
}

/// The read loop
pub struct BridgeWorker {
    /// Device link, dropped when the loop stops
    link: Option<Box<dyn DeviceLink>>,
    /// Line decoder
    decoder: LineDecoder,
    /// Message router
    router: EventRouter,
    /// Running flag shared with the handle
    running: Arc<AtomicBool>,
    /// Current state
    state: LinkState,
    /// Counters shared with the handle
    counters: Arc<BridgeCounters>,
}

impl BridgeWorker {
    /// Create a worker over an open, validated link
    pub fn new(
        link: Box<dyn DeviceLink>,
        decoder: LineDecoder,
        router: EventRouter,
        running: Arc<AtomicBool>,
        counters: Arc<BridgeCounters>,
    ) -> Self {
        Self {
            link: Some(link),
            decoder,
            router,
            running,
            state: LinkState::Running,
            counters,
        }
    }

    /// Current state
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Run until the link closes or the running flag is cleared
    pub fn run(&mut self) -> LinkState {
        let name = self
            .link
            .as_ref()
            .map(|link| link.name())
            .unwrap_or_default();
        tracing::info!("Read loop started on {}", name);

        while self.state == LinkState::Running {
            if !self.running.load(Ordering::SeqCst) {
                tracing::info!("Shutdown requested");
                self.stop();
                break;
            }

            if self.tick() == Tick::Closed {
                self.stop();
            }
        }

        tracing::info!("Read loop on {} stopped", name);
        self.state
    }

    /// Read and handle at most one line
    pub fn tick(&mut self) -> Tick {
        let Some(link) = self.link.as_mut() else {
            return Tick::Closed;
        };

        match link.read_line() {
            Ok(LineRead::Line(raw)) => {
                BridgeCounters::bump(&self.counters.lines_read);
                self.handle_line(&raw);
                Tick::Line
            }
            Ok(LineRead::Idle) => Tick::Idle,
            Ok(LineRead::Discarded(len)) => {
                BridgeCounters::bump(&self.counters.oversize_lines);
                tracing::warn!("Discarded a {}-byte line without terminator", len);
                Tick::Idle
            }
            Ok(LineRead::Closed) => {
                tracing::warn!("Device closed the connection");
                Tick::Closed
            }
            Err(e) if e.is_connection_fatal() => {
                tracing::error!("Device link failed: {}", e);
                Tick::Closed
            }
            Err(e) => {
                tracing::warn!("Read error on {}: {}", link.name(), e);
                Tick::Idle
            }
        }
    }

    /// Decode, classify and route one raw line
    pub fn handle_line(&self, raw: &[u8]) {
        let message = match self.decoder.decode(raw) {
            DecodedLine::Undecodable => Message::Undecodable,
            DecodedLine::Clean(line) => match classify(&line) {
                Some(message) => message,
                None => return,
            },
        };

        tracing::trace!("<- {}", message.kind());
        self.router.dispatch(message);
    }

    fn stop(&mut self) {
        self.state = LinkState::Stopped;
        self.running.store(false, Ordering::SeqCst);
        self.link = None;
    }
}
