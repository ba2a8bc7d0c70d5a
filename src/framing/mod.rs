//! Message framing subsystem.
//!
//! # Data Flow
//! ```text
//! accepted socket
//!     → framer.rs (first byte, delimited remainder)
//!     → probe.rs (exact probe literal?)
//!     → document.rs (wrap, strip prolog, parse)
//!     → Frame::Probe | Frame::Document
//! ```
//!
//! # Design Decisions
//! - The wire carries no length prefix; `</event>` ends a message
//! - Probe vs. event is decided once, by byte equality, before any parsing
//! - A missing delimiter is not detected by the reader; the parse fails and
//!   the error records that the delimiter never arrived

pub mod document;
pub mod framer;
pub mod probe;

pub use document::{Document, DocumentError, Element};
pub use framer::{Frame, Framer};
pub use probe::ProbeDetector;

/// Why one framing attempt failed.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The peer closed or stayed silent before sending a single byte.
    #[error("empty data: nothing received before the first-byte timeout")]
    EmptyInitialRead,

    /// The delimiter never arrived, leaving an unparseable fragment.
    #[error("delimiter not received before the deadline ({received} bytes): {reason}")]
    FramingTimeout {
        /// Bytes received including the first byte.
        received: usize,
        /// Parse failure of the incomplete fragment.
        reason: DocumentError,
    },

    /// The message was complete but is not well-formed XML.
    #[error("malformed document: {0}")]
    MalformedDocument(DocumentError),

    /// The socket failed before the first byte arrived.
    #[error("receive failed: {0}")]
    Io(#[from] std::io::Error),
}

impl FrameError {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EmptyInitialRead => "empty_initial_read",
            Self::FramingTimeout { .. } => "framing_timeout",
            Self::MalformedDocument(_) => "malformed_document",
            Self::Io(_) => "io",
        }
    }
}
