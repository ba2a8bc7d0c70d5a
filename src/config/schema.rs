//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the intake
//! service. All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the intake service.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IntakeConfig {
    /// Listening sockets, one accept thread each.
    pub listeners: Vec<ListenerConfig>,

    /// Receive-side framing constants.
    pub receive: ReceiveConfig,

    /// Outer accept loop and handoff settings.
    pub service: ServiceConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            listeners: vec![ListenerConfig::default()],
            receive: ReceiveConfig::default(),
            service: ServiceConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl IntakeConfig {
    /// Configuration with a single listener on the given address.
    pub fn with_listener(name: impl Into<String>, bind_address: impl Into<String>) -> Self {
        Self {
            listeners: vec![ListenerConfig {
                name: name.into(),
                bind_address: bind_address.into(),
            }],
            ..Self::default()
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Listener identifier for logging/metrics.
    pub name: String,

    /// Bind address (e.g., "0.0.0.0:8087").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            name: "cot".to_string(),
            bind_address: "0.0.0.0:8087".to_string(),
        }
    }
}

/// Constants consumed read-only by the acceptor and framer.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReceiveConfig {
    /// How long to wait for the first byte of a new connection.
    pub first_byte_timeout_ms: u64,

    /// Per-receive timeout once the first byte has arrived.
    pub post_probe_timeout_ms: u64,

    /// Overall deadline for collecting the delimited remainder.
    pub receive_deadline_ms: u64,

    /// Bytes requested per receive call.
    pub read_buffer_size: usize,

    /// Pending-connection backlog applied to the listening socket.
    pub listen_backlog: u32,

    /// Exact text a liveness check sends.
    pub probe_literal: String,

    /// Closing tag marking the end of one event element.
    pub delimiter: String,
}

impl Default for ReceiveConfig {
    fn default() -> Self {
        Self {
            first_byte_timeout_ms: 1_000,
            post_probe_timeout_ms: 4_000,
            receive_deadline_ms: 5_000,
            read_buffer_size: 1024,
            listen_backlog: 2000,
            probe_literal: "TEST".to_string(),
            delimiter: "</event>".to_string(),
        }
    }
}

impl ReceiveConfig {
    pub fn first_byte_timeout(&self) -> Duration {
        Duration::from_millis(self.first_byte_timeout_ms)
    }

    pub fn post_probe_timeout(&self) -> Duration {
        Duration::from_millis(self.post_probe_timeout_ms)
    }

    pub fn receive_deadline(&self) -> Duration {
        Duration::from_millis(self.receive_deadline_ms)
    }
}

/// Outer accept loop configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Accepted connections buffered between accept threads and the consumer.
    pub channel_capacity: usize,

    /// How long shutdown waits for handed-off connections to close.
    pub shutdown_grace_secs: u64,

    /// Base delay for backing off after consecutive accept errors.
    pub accept_backoff_base_ms: u64,

    /// Maximum accept backoff delay.
    pub accept_backoff_max_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
            shutdown_grace_secs: 5,
            accept_backoff_base_ms: 50,
            accept_backoff_max_ms: 2_000,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output for development.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
