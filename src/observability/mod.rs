//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! submission, chain, subscription produce:
//!     → logging.rs (structured tracing events on stderr)
//!     → metrics.rs (counters, histograms via the metrics facade)
//! ```
//!
//! # Design Decisions
//! - Structured fields (transaction_id, kind, status, step) on every event
//! - Metrics are cheap (no-op without a recorder)

pub mod logging;
pub mod metrics;
