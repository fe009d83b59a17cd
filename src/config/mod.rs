//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML), --config or LEDGER_FLOW_CONFIG
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → Config (validated, immutable)
//!     → ExecutionContext, SubmissionPolicy, SandboxNetwork, logging
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, resolve_config, ConfigError};
pub use schema::{
    Config, NetworkConfig, ObservabilityConfig, RetryConfig, SandboxConfig, SubscriptionConfig, TimeoutConfig,
};
