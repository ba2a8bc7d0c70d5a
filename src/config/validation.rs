//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, backlog fits the OS type)
//! - Check that listener names and addresses are usable
//! - Reject a probe literal the framer could never tell apart from an event
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: IntakeConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use crate::config::schema::IntakeConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    /// What is wrong with it.
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration, collecting every problem.
pub fn validate_config(config: &IntakeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listeners.is_empty() {
        errors.push(ValidationError::new("listeners", "at least one listener is required"));
    }

    let mut names = HashSet::new();
    for (i, listener) in config.listeners.iter().enumerate() {
        if listener.name.is_empty() {
            errors.push(ValidationError::new(format!("listeners[{i}].name"), "must not be empty"));
        } else if !names.insert(listener.name.as_str()) {
            errors.push(ValidationError::new(
                format!("listeners[{i}].name"),
                format!("duplicate listener name '{}'", listener.name),
            ));
        }
        if listener.bind_address.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::new(
                format!("listeners[{i}].bind_address"),
                format!("'{}' is not a socket address", listener.bind_address),
            ));
        }
    }

    let receive = &config.receive;
    for (field, value) in [
        ("receive.first_byte_timeout_ms", receive.first_byte_timeout_ms),
        ("receive.post_probe_timeout_ms", receive.post_probe_timeout_ms),
        ("receive.receive_deadline_ms", receive.receive_deadline_ms),
    ] {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than zero"));
        }
    }
    if receive.read_buffer_size == 0 {
        errors.push(ValidationError::new("receive.read_buffer_size", "must be greater than zero"));
    }
    if receive.listen_backlog == 0 || i32::try_from(receive.listen_backlog).is_err() {
        errors.push(ValidationError::new(
            "receive.listen_backlog",
            format!("must be between 1 and {}", i32::MAX),
        ));
    }
    if receive.probe_literal.is_empty() {
        errors.push(ValidationError::new("receive.probe_literal", "must not be empty"));
    }
    if receive.delimiter.is_empty() {
        errors.push(ValidationError::new("receive.delimiter", "must not be empty"));
    } else if receive.probe_literal.contains(&receive.delimiter) {
        errors.push(ValidationError::new(
            "receive.probe_literal",
            "must not contain the delimiter",
        ));
    }

    let service = &config.service;
    if service.channel_capacity == 0 {
        errors.push(ValidationError::new("service.channel_capacity", "must be greater than zero"));
    }
    if service.accept_backoff_base_ms > service.accept_backoff_max_ms {
        errors.push(ValidationError::new(
            "service.accept_backoff_base_ms",
            "must not exceed accept_backoff_max_ms",
        ));
    }

    let observability = &config.observability;
    if observability.metrics_enabled && observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ListenerConfig;

    fn fields(errors: &[ValidationError]) -> Vec<&str> {
        errors.iter().map(|e| e.field.as_str()).collect()
    }

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&IntakeConfig::default()).is_ok());
    }

    #[test]
    fn collects_every_error() {
        let mut config = IntakeConfig::default();
        config.receive.first_byte_timeout_ms = 0;
        config.receive.read_buffer_size = 0;
        config.listeners[0].bind_address = "not-an-address".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        let fields = fields(&errors);
        assert!(fields.contains(&"receive.first_byte_timeout_ms"));
        assert!(fields.contains(&"receive.read_buffer_size"));
        assert!(fields.contains(&"listeners[0].bind_address"));
    }

    #[test]
    fn rejects_probe_containing_delimiter() {
        let mut config = IntakeConfig::default();
        config.receive.probe_literal = "ping</event>".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(fields(&errors), vec!["receive.probe_literal"]);
    }

    #[test]
    fn rejects_duplicate_listener_names() {
        let mut config = IntakeConfig::default();
        config.listeners.push(ListenerConfig {
            name: "cot".into(),
            bind_address: "127.0.0.1:8089".into(),
        });

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(fields(&errors), vec!["listeners[1].name"]);
    }

    #[test]
    fn rejects_oversized_backlog() {
        let mut config = IntakeConfig::default();
        config.receive.listen_backlog = u32::MAX;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn metrics_address_checked_only_when_enabled() {
        let mut config = IntakeConfig::default();
        config.observability.metrics_address = "nope".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(fields(&errors), vec!["observability.metrics_address"]);
    }
}
