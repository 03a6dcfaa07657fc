//! Configuration validation.
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: PublisherConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::PublisherConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
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

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Check value ranges and cross-field constraints.
pub fn validate_config(config: &PublisherConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.registry.retention_secs == 0 {
        errors.push(ValidationError::new("registry.retention_secs", "must be greater than 0"));
    }
    if config.registry.sweep_interval_secs == 0 {
        errors.push(ValidationError::new("registry.sweep_interval_secs", "must be greater than 0"));
    }
    if config.registry.notification_buffer == 0 {
        errors.push(ValidationError::new("registry.notification_buffer", "must be greater than 0"));
    }
    if config.fees.max_fee_rate_per_byte == 0 {
        errors.push(ValidationError::new("fees.max_fee_rate_per_byte", "must be greater than 0"));
    }
    let cents = config.pricing.submission_fee_cents;
    if !cents.is_finite() || cents <= 0.0 {
        errors.push(ValidationError::new("pricing.submission_fee_cents", "must be a positive number"));
    }
    if !LOG_LEVELS.contains(&config.observability.log_level.to_lowercase().as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level '{}'", config.observability.log_level),
        ));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("invalid socket address '{}'", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
