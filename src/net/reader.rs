//! Deadline-bounded delimiter scanning.
//!
//! # Responsibilities
//! - Accumulate bytes until a delimiter is seen or an overall deadline passes
//! - Bound each receive by a short per-read timeout
//! - Never fail: the absence of the delimiter is the caller's signal

use std::io::{self, Read};
use std::net::TcpStream;
use std::time::{Duration, Instant};

/// A byte source whose blocking reads can be bounded by a timeout.
pub trait TimedRead: Read {
    /// Bound subsequent reads; `None` blocks indefinitely.
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()>;
}

impl TimedRead for TcpStream {
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        TcpStream::set_read_timeout(self, timeout)
    }
}

/// Timing for one delimited read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadWindow {
    /// Upper bound for a single receive call.
    pub per_read: Duration,
    /// Overall budget for the whole scan, measured from its start.
    pub deadline: Duration,
}

impl ReadWindow {
    pub fn new(per_read: Duration, deadline: Duration) -> Self {
        Self { per_read, deadline }
    }
}

/// Read from `stream` until `delimiter` appears in the accumulated bytes or
/// `window.deadline` elapses.
///
/// Any receive error, a per-read timeout included, ends the scan and returns
/// what has been collected. End of stream does the same.
pub fn read_until<S: TimedRead + ?Sized>(
    stream: &mut S,
    delimiter: &[u8],
    window: ReadWindow,
    buffer_size: usize,
) -> Vec<u8> {
    let started = Instant::now();
    let mut message = Vec::new();
    let mut chunk = vec![0u8; buffer_size.max(1)];
    // The delimiter can straddle two reads, so each search starts a little
    // before the newly appended bytes.
    let mut scanned = 0;

    loop {
        if contains(&message[scanned..], delimiter) {
            break;
        }
        scanned = message.len().saturating_sub(delimiter.len().saturating_sub(1));

        let remaining = window.deadline.saturating_sub(started.elapsed());
        if remaining.is_zero() {
            tracing::trace!(received = message.len(), "receive deadline elapsed");
            break;
        }
        if let Err(e) = stream.set_read_timeout(Some(window.per_read.min(remaining))) {
            tracing::debug!(error = %e, "failed to set read timeout");
            break;
        }

        match stream.read(&mut chunk) {
            Ok(0) => {
                tracing::trace!(received = message.len(), "peer closed before delimiter");
                break;
            }
            Ok(n) => message.extend_from_slice(&chunk[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::trace!(error = %e, received = message.len(), "receive ended");
                break;
            }
        }
    }

    message
}

pub(crate) fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|w| w == needle)
}

#[cfg(test)]
impl TimedRead for io::Cursor<Vec<u8>> {
    fn set_read_timeout(&mut self, _timeout: Option<Duration>) -> io::Result<()> {
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::scripted::{ScriptedStream, Step};
    use super::*;

    const DELIM: &[u8] = b"</event>";

    fn window() -> ReadWindow {
        ReadWindow::new(Duration::from_millis(50), Duration::from_secs(2))
    }

    #[test]
    fn stops_at_delimiter() {
        let mut stream = ScriptedStream::new(vec![
            Step::Data(b"<event>X</event>"),
            Step::Data(b"<event>Y</event>"),
        ]);
        let bytes = read_until(&mut stream, DELIM, window(), 1024);
        assert_eq!(bytes, b"<event>X</event>");
        assert_eq!(stream.reads, 1);
    }

    #[test]
    fn finds_delimiter_split_across_reads() {
        let mut stream = ScriptedStream::new(vec![
            Step::Data(b"<event>X</ev"),
            Step::Data(b"ent>"),
            Step::Data(b"never read"),
        ]);
        let bytes = read_until(&mut stream, DELIM, window(), 1024);
        assert_eq!(bytes, b"<event>X</event>");
    }

    #[test]
    fn small_buffer_accumulates_across_reads() {
        let mut stream = ScriptedStream::new(vec![Step::Data(b"<event>X</event>")]);
        let bytes = read_until(&mut stream, DELIM, window(), 3);
        assert_eq!(bytes, b"<event>X</event>");
        assert_eq!(stream.reads, 6);
    }

    #[test]
    fn returns_partial_bytes_on_error() {
        let mut stream = ScriptedStream::new(vec![
            Step::Data(b"<event>"),
            Step::Error(io::ErrorKind::WouldBlock),
            Step::Data(b"X</event>"),
        ]);
        let bytes = read_until(&mut stream, DELIM, window(), 1024);
        assert_eq!(bytes, b"<event>");
    }

    #[test]
    fn returns_partial_bytes_on_eof() {
        let mut stream = ScriptedStream::new(vec![Step::Data(b"<event>X")]);
        let bytes = read_until(&mut stream, DELIM, window(), 1024);
        assert_eq!(bytes, b"<event>X");
    }

    #[test]
    fn empty_when_nothing_received() {
        let mut stream = ScriptedStream::new(vec![Step::Error(io::ErrorKind::TimedOut)]);
        assert!(read_until(&mut stream, DELIM, window(), 1024).is_empty());
    }

    #[test]
    fn retries_interrupted_reads() {
        let mut stream = ScriptedStream::new(vec![
            Step::Error(io::ErrorKind::Interrupted),
            Step::Data(b"<event/></event>"),
        ]);
        let bytes = read_until(&mut stream, DELIM, window(), 1024);
        assert_eq!(bytes, b"<event/></event>");
    }

    #[test]
    fn per_read_timeout_is_capped_by_deadline() {
        let mut stream = ScriptedStream::new(vec![Step::Data(b"x")]);
        let window = ReadWindow::new(Duration::from_secs(4), Duration::from_millis(500));
        read_until(&mut stream, DELIM, window, 1024);

        let first = stream.timeouts[0].unwrap();
        assert!(first <= Duration::from_millis(500));
        assert!(first > Duration::ZERO);
    }

    #[test]
    fn stops_once_deadline_elapses() {
        let mut stream = ScriptedStream::new(vec![
            Step::Data(b"<event>"),
            Step::Data(b"X"),
        ]);
        let window = ReadWindow::new(Duration::from_millis(10), Duration::ZERO);
        let bytes = read_until(&mut stream, DELIM, window, 1024);
        assert!(bytes.is_empty());
        assert_eq!(stream.reads, 0);
    }

    #[test]
    fn deadline_holds_against_a_trickling_peer() {
        use std::io::Write;
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let writer = std::thread::spawn(move || {
            let mut client = TcpStream::connect(addr).unwrap();
            // one byte every 20ms, well inside the per-read timeout
            for _ in 0..50 {
                if client.write_all(b"x").is_err() {
                    break;
                }
                std::thread::sleep(Duration::from_millis(20));
            }
        });
        let (mut server, _) = listener.accept().unwrap();

        let window = ReadWindow::new(Duration::from_millis(100), Duration::from_millis(300));
        let started = Instant::now();
        let bytes = read_until(&mut server, DELIM, window, 1024);
        let elapsed = started.elapsed();

        assert!(elapsed < Duration::from_millis(400), "{elapsed:?}");
        assert!(elapsed >= Duration::from_millis(250), "{elapsed:?}");
        assert!(!bytes.is_empty());
        assert!(!contains(&bytes, DELIM));

        drop(server);
        writer.join().unwrap();
    }
}
