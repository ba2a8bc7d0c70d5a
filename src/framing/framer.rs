//! Two-phase message framing.
//!
//! # Data Flow
//! ```text
//! socket
//!     → 1 byte under the first-byte timeout      (EmptyInitialRead on nothing)
//!     → reader::read_until(delimiter, window)    (remainder, maybe partial)
//!     → probe literal?                           → Frame::Probe
//!     → wrap in <multiEvent>, strip prologs, parse → Frame::Document
//! ```

use std::io;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use crate::config::ReceiveConfig;
use crate::framing::document::{Document, DocumentError};
use crate::framing::probe::ProbeDetector;
use crate::framing::FrameError;
use crate::net::reader::{self, ReadWindow, TimedRead};

/// Synthetic root wrapped around the received bytes.
pub const ROOT_ELEMENT: &str = "multiEvent";

static PROLOG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<\?xml(?:\s.*?)?\?>").expect("invalid prolog pattern"));

/// What a successfully framed message turned out to be.
#[derive(Debug)]
pub enum Frame {
    /// The peer sent the liveness probe literal.
    Probe,
    /// The peer sent XML; the document has a synthetic `multiEvent` root.
    Document(Document),
}

/// Reads and classifies one message from a connection.
#[derive(Debug, Clone)]
pub struct Framer {
    first_byte_timeout: Duration,
    window: ReadWindow,
    buffer_size: usize,
    probe: ProbeDetector,
    delimiter: Vec<u8>,
}

impl Framer {
    pub fn new(config: &ReceiveConfig) -> Self {
        Self {
            first_byte_timeout: config.first_byte_timeout(),
            window: ReadWindow::new(config.post_probe_timeout(), config.receive_deadline()),
            buffer_size: config.read_buffer_size,
            probe: ProbeDetector::new(config.probe_literal.as_bytes()),
            delimiter: config.delimiter.as_bytes().to_vec(),
        }
    }

    /// Frame the next message on `stream`.
    ///
    /// Whatever was consumed stays consumed on failure; calling again
    /// continues from the current stream position.
    pub fn frame<S: TimedRead + ?Sized>(&self, stream: &mut S) -> Result<Frame, FrameError> {
        let first = self.read_first_byte(stream)?;
        let rest = reader::read_until(stream, &self.delimiter, self.window, self.buffer_size);

        if self.probe.matches(first, &rest) {
            return Ok(Frame::Probe);
        }

        let saw_delimiter = reader::contains(&rest, &self.delimiter);

        let mut bytes = Vec::with_capacity(rest.len() + 1);
        bytes.push(first);
        bytes.extend_from_slice(&rest);
        let received = bytes.len();

        let parsed = String::from_utf8(bytes)
            .map_err(DocumentError::from)
            .and_then(|text| Document::parse(&wrap(&text)));

        match parsed {
            Ok(document) => Ok(Frame::Document(document)),
            Err(reason) if !saw_delimiter => Err(FrameError::FramingTimeout { received, reason }),
            Err(reason) => Err(FrameError::MalformedDocument(reason)),
        }
    }

    fn read_first_byte<S: TimedRead + ?Sized>(&self, stream: &mut S) -> Result<u8, FrameError> {
        stream.set_read_timeout(Some(self.first_byte_timeout))?;
        let mut byte = [0u8; 1];
        loop {
            match stream.read(&mut byte) {
                Ok(0) => return Err(FrameError::EmptyInitialRead),
                Ok(_) => return Ok(byte[0]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                    return Err(FrameError::EmptyInitialRead);
                }
                Err(e) => return Err(FrameError::Io(e)),
            }
        }
    }
}

/// Wrap `text` in the synthetic root and remove every XML declaration.
pub fn wrap(text: &str) -> String {
    let wrapped = format!("<{ROOT_ELEMENT}>{text}</{ROOT_ELEMENT}>");
    PROLOG.replace_all(&wrapped, "").into_owned()
}
