//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → IntakeConfig (validated, immutable)
//!     → cloned into the acceptor of every listener thread
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the receive constants are read-only
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    IntakeConfig, ListenerConfig, LogFormat, ObservabilityConfig, ReceiveConfig, ServiceConfig,
};
pub use validation::{validate_config, ValidationError};
