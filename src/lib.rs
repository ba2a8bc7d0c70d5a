//! Cursor-on-Target TCP intake.
//!
//! Accepts raw TCP connections, frames one `</event>`-terminated XML message
//! per connection under a deadline, tells liveness probes apart from events,
//! and hands the socket plus the first event to a downstream consumer.

pub mod config;
pub mod framing;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod resilience;
pub mod service;

pub use config::IntakeConfig;
pub use net::{Accepted, Acceptor, ConnectionRecord, IntakeError};
pub use service::IntakeService;
