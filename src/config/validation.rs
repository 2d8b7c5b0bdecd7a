//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (worker count, intervals)
//! - Check that the log level and diagnostics address parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AgentConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::AgentConfig;
use crate::logging::parse_level;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check a parsed configuration for semantic errors.
pub fn validate_config(config: &AgentConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(e) = parse_level(&config.common.log_level) {
        errors.push(ValidationError::new("common.log_level", e.to_string()));
    }

    if config.common.max_cpu == 0 {
        errors.push(ValidationError::new("common.max_cpu", "must be at least 1"));
    }

    if config.common.metric_interval_secs == 0 {
        errors.push(ValidationError::new(
            "common.metric_interval_secs",
            "must be greater than 0",
        ));
    }

    if config.diagnostics.enabled && config.diagnostics.listen.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "diagnostics.listen",
            format!("invalid socket address {:?}", config.diagnostics.listen),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
