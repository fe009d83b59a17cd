//! Transaction orchestration and receipt confirmation for a hashgraph-style
//! ledger.
//!
//! # Architecture Overview
//!
//! ```text
//!   OperationDescriptor ──freeze(ctx)──▶ FrozenTransaction ──sign(keys)──▶ SignedTransaction
//!          ▲                                                                     │
//!          │ identifiers from earlier receipts                                   ▼
//!   DependencyChain ◀──────────── Receipt ◀──await_receipt── SubmissionClient ──submit──▶ Gateway
//!
//!   SubscriptionReader ◀──pages── MessageFeed        SubmissionClient::query ──▶ QueryService
//!
//!   Gateway / QueryService / MessageFeed: sandbox (in process) or mirror (REST, read-only)
//! ```
//!
//! Cross-cutting: `config` (TOML), `observability` (tracing, metrics),
//! `resilience` (backoff, retries, deadlines).

// Domain
pub mod keys;
pub mod ledger;
pub mod transaction;

// Orchestration
pub mod chain;
pub mod submission;
pub mod subscription;

// Networks
pub mod mirror;
pub mod sandbox;

// Workflows
pub mod flows;

// Cross-cutting concerns
pub mod config;
pub mod observability;
pub mod resilience;

pub use chain::{ChainOutcome, DependencyChain};
pub use config::Config;
pub use keys::{KeyMaterial, KeyRole, Keyring, Operator};
pub use ledger::{LedgerError, LedgerResult, Receipt, Status};
pub use submission::SubmissionClient;
pub use subscription::SubscriptionReader;
pub use transaction::{ExecutionContext, OperationDescriptor, SigningCoordinator};
