//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check addresses parse and the log level is known
//! - Detect malformed or conflicting static mounts
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: MapesConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::MapesConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid {field} '{value}': expected host:port")]
    InvalidAddress { field: &'static str, value: String },

    #[error("unknown log level '{0}'")]
    UnknownLogLevel(String),

    #[error("static mount prefix '{0}' must start with '/'")]
    InvalidMountPrefix(String),

    #[error("static mount '{0}' has an empty root")]
    EmptyMountRoot(String),

    #[error("static mount prefix '{0}' is configured more than once")]
    DuplicateMountPrefix(String),
}

/// Check a parsed configuration.
pub fn validate_config(config: &MapesConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    let obs = &config.observability;
    if !LOG_LEVELS.contains(&obs.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::UnknownLogLevel(obs.log_level.clone()));
    }
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: obs.metrics_address.clone(),
        });
    }

    let mut seen = HashSet::new();
    for mount in &config.static_mounts {
        if !mount.prefix.starts_with('/') {
            errors.push(ValidationError::InvalidMountPrefix(mount.prefix.clone()));
        }
        if mount.root.trim().is_empty() {
            errors.push(ValidationError::EmptyMountRoot(mount.prefix.clone()));
        }
        let normalized = mount.prefix.trim_end_matches('/');
        if !seen.insert(normalized.to_string()) {
            errors.push(ValidationError::DuplicateMountPrefix(mount.prefix.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
