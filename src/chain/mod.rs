//! Dependency chains: sequenced mutations fed by earlier receipts.
//!
//! # Data Flow
//! ```text
//! for step i in 1..=N:
//!     builder(Receipts of steps 1..i)  → OperationDescriptor
//!     → freeze(ctx) → sign declared roles (keyring, operator fallback)
//!     → SubmissionClient::execute → Receipt
//!     → appended, visible to steps i+1..N
//! any error → ChainOutcome::Failed { step i, .. }; steps i+1..N never built
//! ```
//!
//! # Design Decisions
//! - Strictly sequential; a receipt is the only hand-off between steps
//! - Fail fast with no compensation; already applied steps stay applied
//! - `ChainRun` lets a caller interleave reads between steps

pub mod receipts;
pub mod run;

pub use receipts::Receipts;
pub use run::{sign_declared, ChainFailure, ChainOutcome, ChainRun, DependencyChain};
