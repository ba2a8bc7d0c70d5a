//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain handed-off sessions → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config, logging, metrics, then listeners
//! - Shutdown has timeout: sessions still open after the grace period are dropped

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
