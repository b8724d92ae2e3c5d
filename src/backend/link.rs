//! Device link
//!
//! The read loop talks to the gateway through the [`DeviceLink`] trait:
//! one call reads at most one line, waiting no longer than the link's read
//! timeout. Outbound commands go through a separate [`CommandWriter`] that
//! wraps a cloned port handle, so writes never contend with the reader.

use crate::config::SerialConfig;
use crate::error::{BridgeError, Result};
use crate::protocol::LineDecoder;
use serialport::SerialPort;
use std::io::{BufRead, BufReader, ErrorKind, Read, Write};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Outcome of one line read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineRead {
    /// A complete line (without its newline)
    Line(Vec<u8>),
    /// The read timed out before a newline arrived
    Idle,
    /// A partial line grew past the limit and was thrown away
    Discarded(usize),
    /// The device closed the connection
    Closed,
}

/// Line-oriented source of device output
pub trait DeviceLink: Send {
    /// Read at most one line, waiting no longer than the read timeout
    fn read_line(&mut self) -> Result<LineRead>;

    /// Human-readable name of the link (port path, mock name)
    fn name(&self) -> String;
}

/// Accumulates bytes across timed-out reads until a newline arrives.
///
/// At most `max_len` bytes of one line are held. A longer line is reported
/// once as [`LineRead::Discarded`] and its remainder is skipped up to the
/// next newline.
#[derive(Debug)]
pub(crate) struct LineBuffer {
    pending: Vec<u8>,
    max_len: usize,
    skipping: bool,
}

impl LineBuffer {
    pub(crate) fn new(max_len: usize) -> Self {
        Self {
            pending: Vec::new(),
            max_len,
            skipping: false,
        }
    }

    /// Pull one line out of `reader`
    pub(crate) fn read_from<R: BufRead>(&mut self, reader: &mut R) -> Result<LineRead> {
        let budget = (self.max_len + 1).saturating_sub(self.pending.len()) as u64;

        match reader.by_ref().take(budget).read_until(b'\n', &mut self.pending) {
            Ok(_) if self.pending.last() == Some(&b'\n') => {
                if self.skipping {
                    self.skipping = false;
                    self.pending.clear();
                    return Ok(LineRead::Idle);
                }
                self.pending.pop();
                if self.pending.last() == Some(&b'\r') {
                    self.pending.pop();
                }
                Ok(LineRead::Line(std::mem::take(&mut self.pending)))
            }
            Ok(_) if self.pending.len() > self.max_len => {
                let dropped = self.pending.len();
                self.pending.clear();
                if self.skipping {
                    return Ok(LineRead::Idle);
                }
                self.skipping = true;
                Ok(LineRead::Discarded(dropped))
            }
            Ok(0) if self.pending.is_empty() => Ok(LineRead::Closed),
            // EOF in the middle of a line: hand over what we have
            Ok(_) => {
                let rest = std::mem::take(&mut self.pending);
                if std::mem::take(&mut self.skipping) {
                    return Ok(LineRead::Idle);
                }
                Ok(LineRead::Line(rest))
            }
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted) => {
                Ok(LineRead::Idle)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Serial port link to the gateway
pub struct SerialLink {
    name: String,
    reader: BufReader<Box<dyn SerialPort>>,
    buffer: LineBuffer,
}

impl SerialLink {
    /// Open `port_name` with the configured baud rate and read timeout.
    ///
    /// Returns the reading link and a writer sharing the same port.
    pub fn open(port_name: &str, config: &SerialConfig, max_line_bytes: usize) -> Result<(Self, CommandWriter)> {
        let port = serialport::new(port_name, config.baud_rate)
            .timeout(config.read_timeout())
            .open()
            .map_err(|e| BridgeError::from(e).with_context(format!("Failed to open {}", port_name)))?;

        let writer = port.try_clone()?;
        tracing::debug!("Opened {} @ {} baud", port_name, config.baud_rate);

        Ok((
            Self {
                name: port_name.to_string(),
                reader: BufReader::new(port),
                buffer: LineBuffer::new(max_line_bytes),
            },
            CommandWriter::new(writer),
        ))
    }
}

impl DeviceLink for SerialLink {
    fn read_line(&mut self) -> Result<LineRead> {
        self.buffer.read_from(&mut self.reader)
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}

/// Serialized writer for outbound command lines
#[derive(Clone)]
pub struct CommandWriter {
    inner: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl std::fmt::Debug for CommandWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandWriter").finish_non_exhaustive()
    }
}

impl CommandWriter {
    /// Wrap any writer
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// Send one line of text; a newline is appended
    pub fn send_line(&self, line: &str) -> Result<()> {
        let mut writer = self
            .inner
            .lock()
            .map_err(|e| BridgeError::Channel(format!("Writer lock poisoned: {}", e)))?;

        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        tracing::debug!("-> {}", line);
        Ok(())
    }
}

/// Find the gateway among the candidate ports.
///
/// Candidates come from the config, or from every port the OS reports when
/// that list is empty. Returns the link, its writer and the selected path.
pub fn discover_port(
    config: &SerialConfig,
    max_line_bytes: usize,
) -> Result<(SerialLink, CommandWriter, String)> {
    let candidates: Vec<String> = if config.candidates.is_empty() {
        serialport::available_ports()?
            .into_iter()
            .map(|p| p.port_name)
            .collect()
    } else {
        config.candidates.clone()
    };

    find_gateway(&candidates, config, |candidate| {
        SerialLink::open(candidate, config, max_line_bytes)
    })
}

/// Open each candidate in turn and keep the first that answers the handshake.
///
/// A candidate that fails to open or to answer is logged and skipped.
pub fn find_gateway<L, F>(
    candidates: &[String],
    config: &SerialConfig,
    mut open: F,
) -> Result<(L, CommandWriter, String)>
where
    L: DeviceLink,
    F: FnMut(&str) -> Result<(L, CommandWriter)>,
{
    for candidate in candidates {
        let (mut link, writer) = match open(candidate) {
            Ok(opened) => opened,
            Err(e) => {
                tracing::debug!("{} not usable: {}", candidate, e);
                continue;
            }
        };

        std::thread::sleep(config.settle_delay());

        match handshake(&mut link, &writer, config) {
            Ok(true) => {
                tracing::info!("Gateway found on {}", candidate);
                return Ok((link, writer, candidate.clone()));
            }
            Ok(false) => tracing::debug!("{} did not answer the handshake", candidate),
            Err(e) => tracing::debug!("Handshake on {} failed: {}", candidate, e),
        }
    }

    Err(BridgeError::NoDevice(candidates.join(", ")))
}

/// Send the liveness command and wait for the reply
pub fn handshake(
    link: &mut dyn DeviceLink,
    writer: &CommandWriter,
    config: &SerialConfig,
) -> Result<bool> {
    let decoder = LineDecoder::new();
    writer.send_line(&config.handshake_command)?;

    // One read timeout for the echo plus one for the reply
    let deadline = Instant::now() + config.read_timeout() * 2 + config.settle_delay();
    while Instant::now() < deadline {
        match link.read_line()? {
            LineRead::Line(raw) => {
                let Some(text) = decoder.decode(&raw).text().map(str::to_string) else {
                    continue;
                };
                if text == config.handshake_command {
                    continue;
                }
                tracing::trace!("Handshake reply on {}: {}", link.name(), text);
                return Ok(text.contains(&config.handshake_reply));
            }
            LineRead::Idle | LineRead::Discarded(_) => continue,
            LineRead::Closed => return Err(BridgeError::ConnectionClosed),
        }
    }

    Ok(false)
}
