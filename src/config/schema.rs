//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for a run.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Config {
    /// Network identity and the nodes transactions are frozen against.
    pub network: NetworkConfig,

    /// Receipt and query deadlines.
    pub timeouts: TimeoutConfig,

    /// Retry policy for read-only queries.
    pub retries: RetryConfig,

    /// Topic subscription polling.
    pub subscription: SubscriptionConfig,

    /// In-process ledger settings.
    pub sandbox: SandboxConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Network configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Label used in logs and context fingerprints.
    pub name: String,

    /// Node account ids (e.g., "0.0.3").
    pub nodes: Vec<String>,

    /// Mirror node REST base URL for read-only commands.
    pub mirror_url: String,

    /// Default fee ceiling per transaction, in hbar.
    pub max_transaction_fee_hbar: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            name: "sandbox".to_string(),
            nodes: vec!["0.0.3".to_string()],
            mirror_url: "https://testnet.mirrornode.hedera.com".to_string(),
            max_transaction_fee_hbar: 2,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// How long to wait for a receipt before reporting an unknown outcome.
    pub receipt_secs: u64,

    /// Per-attempt query timeout in seconds.
    pub query_secs: u64,

    /// Receipt polling interval in milliseconds.
    pub receipt_poll_interval_ms: u64,
}

impl TimeoutConfig {
    pub fn receipt(&self) -> Duration {
        Duration::from_secs(self.receipt_secs)
    }

    pub fn query(&self) -> Duration {
        Duration::from_secs(self.query_secs)
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            receipt_secs: 30,
            query_secs: 10,
            receipt_poll_interval_ms: 250,
        }
    }
}

/// Retry configuration. Applies to queries only; mutations are never
/// resubmitted automatically.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 2000,
        }
    }
}

/// Subscription configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SubscriptionConfig {
    /// Delay between feed polls in milliseconds.
    pub poll_interval_ms: u64,

    /// Messages requested per poll.
    pub page_size: usize,
}

impl SubscriptionConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            page_size: 25,
        }
    }
}

/// Sandbox ledger configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Genesis balance of the operator account, in hbar.
    pub operator_balance_hbar: u64,

    /// Delay before a receipt becomes visible, in milliseconds.
    pub consensus_delay_ms: u64,

    /// Flat fee charged to the payer of every transaction.
    pub transaction_fee_tinybar: i64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            operator_balance_hbar: 1000,
            consensus_delay_ms: 20,
            transaction_fee_tinybar: 5_000_000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins.
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
