//! Execution context: operator identity plus the network it talks to.

use crate::config::schema::NetworkConfig;
use crate::keys::{KeyMaterial, Operator};
use crate::ledger::amount::Hbar;
use crate::ledger::error::{LedgerError, LedgerResult};
use crate::ledger::ids::{AccountId, TransactionId};

/// Read-only state shared by every step of a run.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    network: String,
    operator: Operator,
    nodes: Vec<AccountId>,
    max_transaction_fee: Hbar,
}

/// The parts of a context a frozen transaction depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextFingerprint {
    pub network: String,
    pub operator: AccountId,
    pub nodes: Vec<AccountId>,
    pub max_transaction_fee: Hbar,
}

impl ExecutionContext {
    pub fn new(network: impl Into<String>, operator: Operator, nodes: Vec<AccountId>) -> Self {
        Self {
            network: network.into(),
            operator,
            nodes,
            max_transaction_fee: Hbar::new(2),
        }
    }

    /// Build from the `[network]` config section.
    pub fn from_config(config: &NetworkConfig, operator: Operator) -> LedgerResult<Self> {
        let nodes = config
            .nodes
            .iter()
            .map(|n| n.parse())
            .collect::<LedgerResult<Vec<AccountId>>>()?;
        let max_transaction_fee = Hbar::from_whole_hbars(config.max_transaction_fee_hbar)?;
        Ok(Self::new(config.name.clone(), operator, nodes).with_max_transaction_fee(max_transaction_fee))
    }

    pub fn with_max_transaction_fee(mut self, fee: Hbar) -> Self {
        self.max_transaction_fee = fee;
        self
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    pub fn operator_account(&self) -> AccountId {
        self.operator.account_id
    }

    /// The default signer.
    pub fn operator_key(&self) -> &KeyMaterial {
        &self.operator.key
    }

    pub fn nodes(&self) -> &[AccountId] {
        &self.nodes
    }

    pub fn max_transaction_fee(&self) -> Hbar {
        self.max_transaction_fee
    }

    /// Node a transaction is frozen against. Deterministic in the
    /// transaction id so refreezing picks the same node.
    pub fn node_for(&self, transaction_id: &TransactionId) -> LedgerResult<AccountId> {
        if self.nodes.is_empty() {
            return Err(LedgerError::State(format!(
                "network '{}' has no reachable node to freeze against",
                self.network
            )));
        }
        let idx = transaction_id.valid_start.as_nanos().unsigned_abs() as usize % self.nodes.len();
        Ok(self.nodes[idx])
    }

    pub fn fingerprint(&self) -> ContextFingerprint {
        ContextFingerprint {
            network: self.network.clone(),
            operator: self.operator.account_id,
            nodes: self.nodes.clone(),
            max_transaction_fee: self.max_transaction_fee,
        }
    }
}
