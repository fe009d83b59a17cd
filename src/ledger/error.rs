//! Error taxonomy for orchestration against the ledger.

use std::time::Duration;
use thiserror::Error;

use crate::ledger::ids::TransactionId;
use crate::ledger::status::Status;

/// Errors that can occur while building, signing, submitting or querying.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// Malformed operation descriptor. Never reaches the network.
    #[error("validation error: {0}")]
    Validation(String),

    /// Misuse of the freeze/sign/submit ordering contracts.
    #[error("state error: {0}")]
    State(String),

    /// A key was offered for a role the operation does not require.
    #[error("authorization error: {0}")]
    Authorization(String),

    /// Transport failure before the network accepted the operation.
    #[error("network error: {0}")]
    Network(String),

    /// No terminal status within the deadline. The mutation may still
    /// reach consensus after this error is returned.
    #[error(
        "no receipt for {transaction_id} after {}ms; outcome unknown, the transaction may still reach consensus",
        waited.as_millis()
    )]
    Timeout {
        transaction_id: TransactionId,
        waited: Duration,
    },

    /// The network finalized (or prechecked) the operation with a failure status.
    #[error("{transaction_id} rejected by the network: {status}")]
    RemoteRejection {
        status: Status,
        transaction_id: TransactionId,
    },

    /// A chain step referenced a receipt or identifier that is not available.
    #[error("step {step} has no {wanted} available")]
    UnresolvedDependency { step: usize, wanted: &'static str },

    /// Key material could not be parsed or used.
    #[error("key error: {0}")]
    Key(String),

    /// A read-only query failed for a reason other than transport.
    #[error("query error: {0}")]
    Query(String),
}

impl LedgerError {
    /// Only transport failures are safe to retry, and only with a freshly
    /// built transaction.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Network(_))
    }

    /// The ledger status carried by a rejection, if any.
    pub fn status(&self) -> Option<Status> {
        match self {
            LedgerError::RemoteRejection { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Short machine-friendly label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::Validation(_) => "validation",
            LedgerError::State(_) => "state",
            LedgerError::Authorization(_) => "authorization",
            LedgerError::Network(_) => "network",
            LedgerError::Timeout { .. } => "timeout",
            LedgerError::RemoteRejection { .. } => "remote_rejection",
            LedgerError::UnresolvedDependency { .. } => "unresolved_dependency",
            LedgerError::Key(_) => "key",
            LedgerError::Query(_) => "query",
        }
    }
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
