//! In-process ledger network.
//!
//! # Responsibilities
//! - Accept signed transactions, precheck them and reach "consensus"
//! - Publish receipts after a configurable consensus delay
//! - Serve balance, topic, token and NFT queries plus topic message pages
//! - Inject faults for tests: dropped submissions, failing reads and
//!   withheld receipts
//!
//! # Design Decisions
//! - A transaction is applied at submit time; only its receipt is delayed
//! - The payer is charged the flat fee even when the body fails, as a real
//!   network charges for failed transactions

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::config::SandboxConfig;
use crate::keys::PublicKey;
use crate::ledger::amount::Hbar;
use crate::ledger::error::{LedgerError, LedgerResult};
use crate::ledger::ids::{AccountId, Timestamp, TopicId, TransactionId};
use crate::ledger::network::{Gateway, MessageFeed, Query, QueryResponse, QueryService, Since};
use crate::ledger::receipt::Receipt;
use crate::ledger::status::Status;
use crate::ledger::types::TopicMessage;
use crate::sandbox::rules::{self, Effects};
use crate::sandbox::state::LedgerState;
use crate::transaction::frozen::SignedTransaction;

/// Conventional operator account of a fresh network.
pub const GENESIS_OPERATOR: AccountId = AccountId::new(0, 0, 2);

/// The single node of the sandbox.
pub const SANDBOX_NODE: AccountId = AccountId::new(0, 0, 3);

struct PendingReceipt {
    receipt: Receipt,
    ready_at: Instant,
}

/// A single-node ledger living in process memory.
pub struct SandboxNetwork {
    state: Mutex<LedgerState>,
    receipts: DashMap<TransactionId, PendingReceipt>,
    nodes: Vec<AccountId>,
    fee: Hbar,
    consensus_delay: Duration,
    fail_submissions: AtomicU32,
    fail_reads: AtomicU32,
    withhold: AtomicBool,
}

impl SandboxNetwork {
    pub fn new(config: &SandboxConfig) -> Self {
        Self {
            state: Mutex::new(LedgerState::default()),
            receipts: DashMap::new(),
            nodes: vec![SANDBOX_NODE],
            fee: Hbar::from_tinybars(config.transaction_fee_tinybar),
            consensus_delay: Duration::from_millis(config.consensus_delay_ms),
            fail_submissions: AtomicU32::new(0),
            fail_reads: AtomicU32::new(0),
            withhold: AtomicBool::new(false),
        }
    }

    /// A network where `account_id`, owned by `operator_key`, holds the
    /// genesis balance from `config`.
    pub fn with_operator(
        config: &SandboxConfig,
        account_id: AccountId,
        operator_key: PublicKey,
    ) -> LedgerResult<Self> {
        let balance = Hbar::from_whole_hbars(config.operator_balance_hbar)?;
        let network = Self::new(config);
        network.create_account(account_id, operator_key, balance);
        tracing::info!(
            operator = %account_id,
            balance = %balance,
            "Sandbox network initialized"
        );
        Ok(network)
    }

    /// Accept transactions frozen against any of `nodes`.
    pub fn with_nodes(mut self, nodes: Vec<AccountId>) -> Self {
        self.nodes = nodes;
        self
    }

    /// Create an account out of thin air.
    pub fn create_account(&self, id: AccountId, key: PublicKey, balance: Hbar) {
        self.lock().insert_account(id, key, balance);
    }

    pub fn nodes(&self) -> &[AccountId] {
        &self.nodes
    }

    pub fn fee(&self) -> Hbar {
        self.fee
    }

    /// The next `n` submissions fail with a network error before reaching
    /// the node.
    pub fn fail_next_submissions(&self, n: u32) {
        self.fail_submissions.store(n, Ordering::SeqCst);
    }

    /// The next `n` queries or message pages fail with a network error.
    pub fn fail_next_reads(&self, n: u32) {
        self.fail_reads.store(n, Ordering::SeqCst);
    }

    /// While set, transactions still reach consensus but receipt lookups
    /// report them as pending.
    pub fn withhold_receipts(&self, withhold: bool) {
        self.withhold.store(withhold, Ordering::SeqCst);
    }

    /// Copy of the current ledger state.
    pub fn snapshot(&self) -> LedgerState {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LedgerState> {
        // state is only replaced wholesale, so a poisoned lock still holds a
        // consistent value
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn take_fault(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    /// Precheck, charge and apply under the state lock, then record the
    /// receipt before the lock is released.
    fn consensus(&self, transaction: &SignedTransaction) -> Result<Status, Status> {
        let mut state = self.lock();
        if self.receipts.contains_key(&transaction.transaction_id()) {
            return Err(Status::DuplicateTransaction);
        }
        let signers = rules::precheck(&state, transaction, self.fee)?;
        let consensus_timestamp = Timestamp::unique_now();

        let payer = transaction.transaction_id().payer;
        if let Some(account) = state.accounts.get_mut(&payer) {
            account.balance = account.balance - self.fee;
        }

        let mut next = state.clone();
        let (status, effects) = match rules::apply(&mut next, transaction, &signers, consensus_timestamp) {
            Ok(effects) => {
                *state = next;
                (Status::Success, effects)
            }
            Err(status) => (status, Effects::default()),
        };

        let receipt = Receipt {
            transaction_id: transaction.transaction_id(),
            status,
            assigned: effects.assigned,
            serials: effects.serials,
            total_supply: effects.total_supply,
            topic_sequence_number: effects.topic_sequence_number,
            consensus_timestamp,
        };
        self.receipts.insert(
            receipt.transaction_id,
            PendingReceipt {
                receipt,
                ready_at: Instant::now() + self.consensus_delay,
            },
        );
        Ok(status)
    }
}

#[async_trait]
impl Gateway for SandboxNetwork {
    async fn submit(&self, transaction: &SignedTransaction) -> LedgerResult<()> {
        let transaction_id = transaction.transaction_id();
        if Self::take_fault(&self.fail_submissions) {
            return Err(LedgerError::Network(format!(
                "connection to node reset while submitting {}",
                transaction_id
            )));
        }

        let node = transaction.frozen().body().node_account_id;
        if !self.nodes.contains(&node) {
            return Err(LedgerError::Network(format!("unknown node {}", node)));
        }

        let status = self
            .consensus(transaction)
            .map_err(|status| LedgerError::RemoteRejection { status, transaction_id })?;

        tracing::debug!(
            transaction_id = %transaction_id,
            kind = %transaction.kind(),
            status = %status,
            "Sandbox consensus reached"
        );
        Ok(())
    }

    async fn receipt(&self, transaction_id: &TransactionId) -> LedgerResult<Option<Receipt>> {
        if self.withhold.load(Ordering::SeqCst) {
            return Ok(None);
        }
        Ok(self
            .receipts
            .get(transaction_id)
            .filter(|pending| Instant::now() >= pending.ready_at)
            .map(|pending| pending.receipt.clone()))
    }
}

#[async_trait]
impl QueryService for SandboxNetwork {
    async fn query(&self, query: &Query) -> LedgerResult<QueryResponse> {
        if Self::take_fault(&self.fail_reads) {
            return Err(LedgerError::Network(format!("{} query dropped", query.name())));
        }
        let state = self.lock();
        let not_found = || LedgerError::Query(format!("{} not found", query));
        let response = match query {
            Query::AccountBalance(id) => QueryResponse::AccountBalance(state.account_balance(id).ok_or_else(not_found)?),
            Query::TopicInfo(id) => QueryResponse::TopicInfo(state.topic_info(id).ok_or_else(not_found)?),
            Query::TokenInfo(id) => QueryResponse::TokenInfo(state.token_info(id).ok_or_else(not_found)?),
            Query::NftInfo(id) => QueryResponse::NftInfo(state.nft_info(id).ok_or_else(not_found)?),
        };
        Ok(response)
    }
}

#[async_trait]
impl MessageFeed for SandboxNetwork {
    async fn messages(&self, topic_id: TopicId, since: Since, limit: usize) -> LedgerResult<Vec<TopicMessage>> {
        if Self::take_fault(&self.fail_reads) {
            return Err(LedgerError::Network(format!("message page for {} dropped", topic_id)));
        }
        let state = self.lock();
        let topic = state
            .topics
            .get(&topic_id)
            .ok_or_else(|| LedgerError::Query(format!("topic {} not found", topic_id)))?;
        Ok(topic
            .messages
            .iter()
            .filter(|m| since.admits(m.consensus_timestamp))
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{KeyMaterial, KeyRole, Operator};
    use crate::transaction::context::ExecutionContext;
    use crate::transaction::fields::{Field, FieldValue, OperationKind};

    fn setup() -> (SandboxNetwork, ExecutionContext) {
        let key = KeyMaterial::generate(KeyRole::Operator);
        let config = SandboxConfig {
            consensus_delay_ms: 0,
            ..Default::default()
        };
        let network = SandboxNetwork::with_operator(&config, GENESIS_OPERATOR, key.public_key()).unwrap();
        let ctx = ExecutionContext::new(
            "sandbox",
            Operator {
                account_id: GENESIS_OPERATOR,
                key,
            },
            network.nodes().to_vec(),
        );
        (network, ctx)
    }

    fn create_topic(ctx: &ExecutionContext) -> SignedTransaction {
        let mut descriptor = OperationKind::TopicCreate
            .builder()
            .set(Field::Memo, "sandbox")
            .signer(KeyRole::Operator)
            .build()
            .unwrap();
        descriptor.freeze(ctx).unwrap().sign(ctx.operator_key()).unwrap()
    }

    #[tokio::test]
    async fn test_submit_then_receipt() {
        let (network, ctx) = setup();
        let signed = create_topic(&ctx);
        network.submit(&signed).await.unwrap();

        let receipt = network.receipt(&signed.transaction_id()).await.unwrap().unwrap();
        assert_eq!(receipt.status, Status::Success);
        assert_eq!(receipt.topic_id(), Some(TopicId::new(0, 0, 1001)));

        let balance = network
            .query(&Query::AccountBalance(GENESIS_OPERATOR))
            .await
            .unwrap()
            .into_account_balance()
            .unwrap();
        assert_eq!(balance.hbars, Hbar::new(1000) - network.fee());
    }

    #[tokio::test]
    async fn test_duplicate_submission_rejected() {
        let (network, ctx) = setup();
        let signed = create_topic(&ctx);
        network.submit(&signed).await.unwrap();

        let err = network.submit(&signed).await.unwrap_err();
        assert_eq!(err.status(), Some(Status::DuplicateTransaction));
    }

    #[tokio::test]
    async fn test_failed_body_still_charges_fee() {
        let (network, ctx) = setup();
        let mut descriptor = OperationKind::TopicMessageSubmit
            .builder()
            .set(Field::TopicId, TopicId::new(0, 0, 4242))
            .set(Field::Message, FieldValue::bytes("nowhere"))
            .signer(KeyRole::Operator)
            .build()
            .unwrap();
        let signed = descriptor.freeze(&ctx).unwrap().sign(ctx.operator_key()).unwrap();
        network.submit(&signed).await.unwrap();

        let receipt = network.receipt(&signed.transaction_id()).await.unwrap().unwrap();
        assert_eq!(receipt.status, Status::InvalidTopicId);
        assert_eq!(
            network.snapshot().accounts[&GENESIS_OPERATOR].balance,
            Hbar::new(1000) - network.fee()
        );
    }

    #[tokio::test]
    async fn test_faults() {
        let (network, ctx) = setup();
        network.fail_next_submissions(1);
        let signed = create_topic(&ctx);
        assert!(network.submit(&signed).await.unwrap_err().is_retryable());
        assert!(network.snapshot().topics.is_empty());

        network.withhold_receipts(true);
        let signed = create_topic(&ctx);
        network.submit(&signed).await.unwrap();
        assert!(network.receipt(&signed.transaction_id()).await.unwrap().is_none());
        network.withhold_receipts(false);
        assert!(network.receipt(&signed.transaction_id()).await.unwrap().is_some());

        network.fail_next_reads(1);
        let query = Query::AccountBalance(GENESIS_OPERATOR);
        assert!(network.query(&query).await.is_err());
        assert!(network.query(&query).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_payer_rejected_at_precheck() {
        let network = SandboxNetwork::new(&SandboxConfig::default());
        let key = KeyMaterial::generate(KeyRole::Operator);
        let ctx = ExecutionContext::new(
            "sandbox",
            Operator {
                account_id: AccountId::new(0, 0, 77),
                key,
            },
            vec![SANDBOX_NODE],
        );
        let err = network.submit(&create_topic(&ctx)).await.unwrap_err();
        assert_eq!(err.status(), Some(Status::PayerAccountNotFound));
    }
}
