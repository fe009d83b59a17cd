//! In-process ledger network for tests, demos and offline runs.
//!
//! # Data Flow
//! ```text
//! SignedTransaction
//!     → network.rs (fault injection, duplicate check, node check)
//!     → rules.rs precheck (signatures, payer, fee)  → RemoteRejection on failure
//!     → fee charged, rules.rs apply on a copy of state.rs
//!     → Receipt published after the consensus delay
//! ```
//!
//! # Design Decisions
//! - One node, one mutex; throughput is not a goal
//! - Statuses mirror the ones a real network reports so callers can be
//!   tested against rejections

pub mod network;
pub mod rules;
pub mod state;

pub use network::{SandboxNetwork, GENESIS_OPERATOR, SANDBOX_NODE};
pub use rules::{Effects, Signers, MAX_MESSAGE_BYTES};
pub use state::LedgerState;
