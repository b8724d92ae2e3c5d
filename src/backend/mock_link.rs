//! In-process device link for tests and hardware-free runs
//!
//! [`MockLink`] implements [`DeviceLink`] over a crossbeam channel: the
//! paired [`MockFeed`] plays the gateway, pushing lines, raw bytes, I/O
//! failures or end-of-stream. [`SharedBuffer`] captures what the bridge
//! writes back.

use super::link::{DeviceLink, LineRead};
use crate::error::{BridgeError, Result};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Read timeout of a mock link
pub const MOCK_READ_TIMEOUT: Duration = Duration::from_millis(20);

#[derive(Debug)]
enum Feed {
    Bytes(Vec<u8>),
    Fail(String),
    Close,
}

/// Scripted device link
#[derive(Debug)]
pub struct MockLink {
    name: String,
    rx: Receiver<Feed>,
    timeout: Duration,
    closed: bool,
}

impl MockLink {
    /// Create a link and the feed that drives it
    pub fn new(name: impl Into<String>) -> (Self, MockFeed) {
        let (tx, rx) = unbounded();
        (
            Self {
                name: name.into(),
                rx,
                timeout: MOCK_READ_TIMEOUT,
                closed: false,
            },
            MockFeed { tx },
        )
    }

    /// Override the per-read timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl DeviceLink for MockLink {
    fn read_line(&mut self) -> Result<LineRead> {
        if self.closed {
            return Ok(LineRead::Closed);
        }

        match self.rx.recv_timeout(self.timeout) {
            Ok(Feed::Bytes(bytes)) => Ok(LineRead::Line(bytes)),
            Ok(Feed::Fail(message)) => Err(BridgeError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                message,
            ))),
            Ok(Feed::Close) | Err(RecvTimeoutError::Disconnected) => {
                self.closed = true;
                Ok(LineRead::Closed)
            }
            Err(RecvTimeoutError::Timeout) => Ok(LineRead::Idle),
        }
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}

/// Gateway side of a [`MockLink`]
#[derive(Debug, Clone)]
pub struct MockFeed {
    tx: Sender<Feed>,
}

impl MockFeed {
    /// Deliver one text line
    pub fn line(&self, line: &str) {
        self.bytes(line.as_bytes().to_vec());
    }

    /// Deliver one raw line
    pub fn bytes(&self, bytes: Vec<u8>) {
        let _ = self.tx.send(Feed::Bytes(bytes));
    }

    /// Make the next read fail with an I/O error
    pub fn fail(&self, message: &str) {
        let _ = self.tx.send(Feed::Fail(message.to_string()));
    }

    /// End the stream
    pub fn close(&self) {
        let _ = self.tx.send(Feed::Close);
    }
}

/// Cloneable in-memory writer
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    /// Everything written so far, lossily decoded
    pub fn contents(&self) -> String {
        let bytes = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Written text split into lines
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_link_sequence() {
        let (mut link, feed) = MockLink::new("mock0");
        feed.line("status 1 2");
        feed.fail("unplugged");
        feed.close();

        assert_eq!(
            link.read_line().unwrap(),
            LineRead::Line(b"status 1 2".to_vec())
        );
        assert!(link.read_line().is_err());
        assert_eq!(link.read_line().unwrap(), LineRead::Closed);
        assert_eq!(link.read_line().unwrap(), LineRead::Closed);
    }

    #[test]
    fn test_mock_link_idle_then_disconnect() {
        let (link, feed) = MockLink::new("mock0");
        let mut link = link.with_timeout(Duration::from_millis(1));
        assert_eq!(link.read_line().unwrap(), LineRead::Idle);

        drop(feed);
        assert_eq!(link.read_line().unwrap(), LineRead::Closed);
    }
}
