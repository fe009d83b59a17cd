//! Key material subsystem.
//!
//! # Data Flow
//! ```text
//! Environment (OPERATOR_ID, OPERATOR_KEY)
//!     → operator.rs (operator identity)
//! Generated per role (admin, submit, supply, fee-schedule, owner)
//!     → material.rs (KeyMaterial, Keyring)
//!     → transaction::signing (signatures over frozen bodies)
//! ```
//!
//! # Security Constraints
//! - Private keys only come from the environment or fresh generation
//! - Keys live for the process run and are never persisted
//! - Never log private keys; `Debug` shows the public key only

pub mod material;
pub mod operator;
pub mod private_key;

pub use material::{KeyMaterial, KeyRole, Keyring};
pub use operator::Operator;
pub use private_key::{KeyAlgorithm, PrivateKey, PublicKey};
