//! Submission subsystem.
//!
//! # Data Flow
//! ```text
//! SignedTransaction
//!     → client.rs submit() (fully signed? first time?)
//!     → Gateway::submit
//!     → handle.rs PendingHandle
//!     → client.rs await_receipt() (poll Gateway::receipt until final or deadline)
//!     → Receipt | RemoteRejection | Timeout
//! ```

pub mod client;
pub mod handle;

pub use client::{SubmissionClient, SubmissionPolicy};
pub use handle::PendingHandle;
