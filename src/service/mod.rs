//! Intake service: the accept loop that drives the core per listener.
//!
//! # Data Flow
//! ```text
//! IntakeConfig.listeners
//!     → intake.rs (bind, one accept thread each, Acceptor::accept_one)
//!     → mpsc channel (Intake { listener, accepted })
//!     → session.rs (hold handed-off socket until close/shutdown)
//! ```

pub mod intake;
pub mod session;

pub use intake::{Intake, IntakeHandle, IntakeService, ServeSummary};
