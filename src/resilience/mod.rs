//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Read-only call to the network:
//!     → timeouts.rs (per-attempt deadline)
//!     → On transport failure: retries.rs (retry with backoff.rs delays)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Retries only for idempotent reads; submissions are never resent

pub mod backoff;
pub mod retries;
pub mod timeouts;

pub use retries::{retry_idempotent, RetryPolicy};
