//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, page size > 0)
//! - Check node ids and the mirror URL parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: Config → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;

use crate::config::schema::Config;
use crate::ledger::amount::MAX_WHOLE_HBARS;
use crate::ledger::ids::AccountId;

/// A single semantic problem in a config.
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

pub fn validate_config(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.network.name.trim().is_empty() {
        errors.push(ValidationError::new("network.name", "must not be empty"));
    }
    if config.network.nodes.is_empty() {
        errors.push(ValidationError::new("network.nodes", "at least one node is required"));
    }
    for node in &config.network.nodes {
        if node.parse::<AccountId>().is_err() {
            errors.push(ValidationError::new(
                "network.nodes",
                format!("'{}' is not a shard.realm.num account id", node),
            ));
        }
    }
    if config.network.max_transaction_fee_hbar > MAX_WHOLE_HBARS {
        errors.push(ValidationError::new(
            "network.max_transaction_fee_hbar",
            format!("must be at most {}", MAX_WHOLE_HBARS),
        ));
    }
    if let Err(e) = url::Url::parse(&config.network.mirror_url) {
        errors.push(ValidationError::new(
            "network.mirror_url",
            format!("'{}' is not a valid URL: {}", config.network.mirror_url, e),
        ));
    }

    if config.timeouts.receipt_secs == 0 {
        errors.push(ValidationError::new("timeouts.receipt_secs", "must be greater than zero"));
    }
    if config.timeouts.query_secs == 0 {
        errors.push(ValidationError::new("timeouts.query_secs", "must be greater than zero"));
    }
    if config.timeouts.receipt_poll_interval_ms == 0 {
        errors.push(ValidationError::new(
            "timeouts.receipt_poll_interval_ms",
            "must be greater than zero",
        ));
    }

    if config.retries.max_attempts == 0 {
        errors.push(ValidationError::new("retries.max_attempts", "must be at least 1"));
    }
    if config.retries.base_delay_ms > config.retries.max_delay_ms {
        errors.push(ValidationError::new(
            "retries.base_delay_ms",
            format!(
                "{} exceeds retries.max_delay_ms ({})",
                config.retries.base_delay_ms, config.retries.max_delay_ms
            ),
        ));
    }

    if config.subscription.poll_interval_ms == 0 {
        errors.push(ValidationError::new("subscription.poll_interval_ms", "must be greater than zero"));
    }
    if config.subscription.page_size == 0 {
        errors.push(ValidationError::new("subscription.page_size", "must be greater than zero"));
    }

    if config.sandbox.operator_balance_hbar > MAX_WHOLE_HBARS {
        errors.push(ValidationError::new(
            "sandbox.operator_balance_hbar",
            format!("must be at most {}", MAX_WHOLE_HBARS),
        ));
    }
    if config.sandbox.transaction_fee_tinybar < 0 {
        errors.push(ValidationError::new("sandbox.transaction_fee_tinybar", "must not be negative"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
