//! Transaction construction subsystem.
//!
//! # Data Flow
//! ```text
//! fields.rs (OperationKind, Field, FieldValue)
//!     → descriptor.rs (validated OperationDescriptor)
//!     → freeze against context.rs (ExecutionContext)
//!     → frozen.rs (FrozenTransaction, fixed body bytes)
//!     → signing.rs (SigningCoordinator → SignedTransaction)
//!     → submission::SubmissionClient
//! ```

pub mod context;
pub mod descriptor;
pub mod fields;
pub mod frozen;
pub mod signing;

pub use context::ExecutionContext;
pub use descriptor::{DescriptorBuilder, OperationDescriptor};
pub use fields::{Field, FieldChanges, FieldValue, OperationKind, ResourceKind};
pub use frozen::{FrozenTransaction, SignatureEntry, SignedTransaction, TransactionBody};
pub use signing::SigningCoordinator;
