//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Framing an accepted connection:
//!     → retries.rs (bounded attempts on the same stream, all causes kept)
//!
//! Accept loop hitting socket errors:
//!     → backoff.rs (jittered exponential delay before the next accept)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every receive has a deadline
//! - Retry counts are fixed and visible at the call site
//! - Framing failures never back off; only accept errors do

pub mod backoff;
pub mod retries;
