//! Read access to the receipts of earlier chain steps.

use crate::ledger::error::{LedgerError, LedgerResult};
use crate::ledger::ids::{AccountId, TokenId, TopicId};
use crate::ledger::receipt::Receipt;

/// Receipts visible to the step currently being built.
///
/// Steps are numbered from 1. A step may only read steps before it.
#[derive(Debug, Clone, Copy)]
pub struct Receipts<'a> {
    completed: &'a [Receipt],
    current: usize,
}

impl<'a> Receipts<'a> {
    pub(crate) fn new(completed: &'a [Receipt], current: usize) -> Self {
        Self { completed, current }
    }

    /// Number of the step being built.
    pub fn current_step(&self) -> usize {
        self.current
    }

    pub fn all(&self) -> &'a [Receipt] {
        self.completed
    }

    pub fn receipt(&self, step: usize) -> LedgerResult<&'a Receipt> {
        if step == 0 || step >= self.current {
            return Err(LedgerError::UnresolvedDependency { step, wanted: "receipt" });
        }
        self.completed
            .get(step - 1)
            .ok_or(LedgerError::UnresolvedDependency { step, wanted: "receipt" })
    }

    pub fn topic_id(&self, step: usize) -> LedgerResult<TopicId> {
        self.receipt(step)?
            .topic_id()
            .ok_or(LedgerError::UnresolvedDependency { step, wanted: "topic id" })
    }

    pub fn token_id(&self, step: usize) -> LedgerResult<TokenId> {
        self.receipt(step)?
            .token_id()
            .ok_or(LedgerError::UnresolvedDependency { step, wanted: "token id" })
    }

    pub fn account_id(&self, step: usize) -> LedgerResult<AccountId> {
        self.receipt(step)?
            .account_id()
            .ok_or(LedgerError::UnresolvedDependency { step, wanted: "account id" })
    }

    /// NFT serials minted by `step`.
    pub fn serials(&self, step: usize) -> LedgerResult<&'a [u64]> {
        let receipt = self.receipt(step)?;
        if receipt.serials.is_empty() {
            return Err(LedgerError::UnresolvedDependency { step, wanted: "minted serials" });
        }
        Ok(&receipt.serials)
    }
}
