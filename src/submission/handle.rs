//! Handles for submitted, not yet finalized transactions.

use std::time::Instant;

use crate::ledger::ids::{AccountId, TransactionId};
use crate::transaction::fields::OperationKind;

/// Proof that a transaction was accepted for consensus.
///
/// Dropping a handle without awaiting it leaves the outcome unobserved; the
/// mutation still applies remotely.
#[must_use = "a submitted transaction should be awaited or reconciled with check_receipt"]
#[derive(Debug, Clone)]
pub struct PendingHandle {
    pub(crate) transaction_id: TransactionId,
    pub(crate) kind: OperationKind,
    pub(crate) node_account_id: AccountId,
    pub(crate) submitted_at: Instant,
}

impl PendingHandle {
    pub fn transaction_id(&self) -> TransactionId {
        self.transaction_id
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn node_account_id(&self) -> AccountId {
        self.node_account_id
    }

    pub fn submitted_at(&self) -> Instant {
        self.submitted_at
    }
}
