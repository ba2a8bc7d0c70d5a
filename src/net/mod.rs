//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Listening socket
//!     → acceptor.rs (backlog, accept, bounded framing retry)
//!     → connection.rs (owned socket, closed unless handed off)
//!     → reader.rs (delimiter scan under a deadline, used by framing)
//!     → record.rs (first event element → ConnectionRecord)
//!     → Hand off to the downstream consumer
//! ```
//!
//! # Design Decisions
//! - Blocking std sockets with explicit read timeouts, one cycle per call
//! - Ownership of the socket is the close discipline: drop closes it
//! - Every failure resolves to `Err(IntakeError)`, never a panic

pub mod acceptor;
pub mod connection;
pub mod reader;
pub mod record;

pub use acceptor::{Accepted, Acceptor, IntakeError, FRAME_ATTEMPTS};
pub use connection::{ConnectionGuard, ConnectionId, ConnectionTracker, PendingConnection};
pub use reader::{read_until, ReadWindow, TimedRead};
pub use record::ConnectionRecord;
