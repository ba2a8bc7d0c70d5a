//! Single accept-and-frame cycle.
//!
//! # Responsibilities
//! - Apply the backlog and accept one connection from a listening socket
//! - Frame it, retrying once on the same stream
//! - Close the socket on every failure, hand it off on success
//!
//! # Connection States
//! ```text
//! ACCEPTED → AWAITING_FIRST_BYTE → AWAITING_DELIMITER → PROBE | PARSED | FAILED
//! FAILED (first)  → AWAITING_FIRST_BYTE
//! FAILED (second) → CLOSED
//! PARSED → VALIDATED (handed off) | CLOSED (no event, empty payload)
//! PROBE  → CLOSED (reported as Accepted::Probe)
//! ```

use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::time::Instant;

use socket2::SockRef;

use crate::config::ReceiveConfig;
use crate::framing::{DocumentError, Frame, FrameError, Framer};
use crate::net::connection::PendingConnection;
use crate::net::record::{self, ConnectionRecord};
use crate::observability::metrics;
use crate::resilience::retries;

/// Framing attempts per connection: the first try plus one retry.
pub const FRAME_ATTEMPTS: usize = 2;

/// Why an accept cycle produced no connection.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    /// Applying the backlog or accepting failed.
    #[error("accept failed: {0}")]
    Accept(#[source] io::Error),

    /// Every framing attempt failed; causes are in attempt order.
    #[error("framing failed after {} attempt(s): {}", .causes.len(), join_causes(.causes))]
    Framing { causes: Vec<FrameError> },

    /// The document parsed but has no `event` child.
    #[error("document contains no event element")]
    MissingEventElement,

    /// The event element could not be written back out.
    #[error("event could not be serialized: {0}")]
    Serialize(DocumentError),

    /// The event serialized to nothing.
    #[error("extracted event payload is empty")]
    EmptyPayload,

    /// The socket could not be prepared for its consumer.
    #[error("socket handoff failed: {0}")]
    Handoff(#[source] io::Error),
}

impl IntakeError {
    /// Outcome label for metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::Accept(_) => "accept_failed",
            Self::Framing { .. } => "framing_failed",
            Self::MissingEventElement => "missing_event",
            Self::Serialize(_) => "serialize_failed",
            Self::EmptyPayload => "empty_payload",
            Self::Handoff(_) => "handoff_failed",
        }
    }
}

fn join_causes(causes: &[FrameError]) -> String {
    causes
        .iter()
        .enumerate()
        .map(|(i, e)| format!("[{}] {e}", i + 1))
        .collect::<Vec<_>>()
        .join("; ")
}

/// A successful accept cycle.
#[derive(Debug)]
pub enum Accepted {
    /// An event connection, socket handed to the caller.
    Record(ConnectionRecord),
    /// A liveness probe; its socket has been closed.
    Probe { peer: SocketAddr },
}

impl Accepted {
    pub fn peer(&self) -> SocketAddr {
        match self {
            Self::Record(record) => record.peer,
            Self::Probe { peer } => *peer,
        }
    }

    fn outcome(&self) -> &'static str {
        match self {
            Self::Record(_) => "record",
            Self::Probe { .. } => "probe",
        }
    }
}

/// Accepts and frames connections for one listening socket.
#[derive(Debug, Clone)]
pub struct Acceptor {
    name: String,
    framer: Framer,
    backlog: i32,
}

impl Acceptor {
    pub fn new(name: impl Into<String>, config: &ReceiveConfig) -> Self {
        Self {
            name: name.into(),
            framer: Framer::new(config),
            backlog: i32::try_from(config.listen_backlog).unwrap_or(i32::MAX),
        }
    }

    /// Listener name used in logs and metrics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Accept one connection from `listener` and frame it.
    ///
    /// Blocks until a connection arrives. Every `Err` has already been
    /// logged and any accepted socket is closed.
    pub fn accept_one(&self, listener: &TcpListener) -> Result<Accepted, IntakeError> {
        let (stream, peer) = match self.accept(listener) {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::warn!(listener = %self.name, error = %e, "Failed to accept connection");
                metrics::record_outcome(&self.name, e.outcome());
                return Err(e);
            }
        };
        self.process(PendingConnection::new(stream, peer))
    }

    /// Frame an already-accepted connection.
    pub fn process(&self, mut pending: PendingConnection) -> Result<Accepted, IntakeError> {
        let (id, peer) = (pending.id(), pending.peer());
        let started = Instant::now();

        let result = match self.frame(&mut pending) {
            // dropping `pending` closes the probe socket
            Ok(Frame::Probe) => Ok(Accepted::Probe { peer }),
            Ok(Frame::Document(document)) => record::build(pending, &document).map(Accepted::Record),
            Err(e) => Err(e),
        };
        metrics::record_frame_duration(started.elapsed());

        match &result {
            Ok(Accepted::Record(record)) => {
                tracing::info!(
                    listener = %self.name,
                    connection_id = %id,
                    %peer,
                    payload_bytes = record.payload.len(),
                    "Client accepted"
                );
                metrics::record_outcome(&self.name, "record");
            }
            Ok(accepted) => {
                tracing::debug!(listener = %self.name, connection_id = %id, %peer, "Liveness probe received");
                metrics::record_outcome(&self.name, accepted.outcome());
            }
            Err(e) => {
                tracing::warn!(
                    listener = %self.name,
                    connection_id = %id,
                    %peer,
                    error = %e,
                    "Receiving connection data from client failed"
                );
                metrics::record_outcome(&self.name, e.outcome());
            }
        }

        result
    }

    fn accept(&self, listener: &TcpListener) -> Result<(TcpStream, SocketAddr), IntakeError> {
        SockRef::from(listener)
            .listen(self.backlog)
            .map_err(IntakeError::Accept)?;
        listener.accept().map_err(IntakeError::Accept)
    }

    fn frame(&self, pending: &mut PendingConnection) -> Result<Frame, IntakeError> {
        let (id, peer) = (pending.id(), pending.peer());
        retries::bounded(FRAME_ATTEMPTS, |attempt| {
            let result = pending
                .stream_mut()
                .map_err(FrameError::from)
                .and_then(|stream| self.framer.frame(stream));
            match &result {
                Ok(_) => metrics::record_frame_attempt("ok"),
                Err(e) => {
                    metrics::record_frame_attempt(e.kind());
                    tracing::debug!(connection_id = %id, %peer, attempt, error = %e, "Framing attempt failed");
                }
            }
            result
        })
        .map_err(|causes| IntakeError::Framing { causes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn framing_error_lists_every_cause() {
        let err = IntakeError::Framing {
            causes: vec![
                FrameError::EmptyInitialRead,
                FrameError::Io(io::ErrorKind::ConnectionReset.into()),
            ],
        };
        let message = err.to_string();
        assert!(message.starts_with("framing failed after 2 attempt(s)"));
        assert!(message.contains("[1] empty data"));
        assert!(message.contains("[2] receive failed"));
    }

    #[test]
    fn outcome_labels() {
        assert_eq!(IntakeError::EmptyPayload.outcome(), "empty_payload");
        assert_eq!(IntakeError::MissingEventElement.outcome(), "missing_event");
        assert_eq!(
            IntakeError::Framing { causes: Vec::new() }.outcome(),
            "framing_failed"
        );
    }

    #[test]
    fn backlog_saturates() {
        let config = ReceiveConfig {
            listen_backlog: u32::MAX,
            ..ReceiveConfig::default()
        };
        assert_eq!(Acceptor::new("cot", &config).backlog, i32::MAX);
    }
}
