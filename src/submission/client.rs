//! Submission and receipt confirmation.
//!
//! # Responsibilities
//! - Send fully signed transactions to the gateway, once per transaction id
//! - Poll for the finalized receipt with a caller-supplied deadline
//! - Run read-only queries with per-attempt deadlines and retries
//!
//! # Design Decisions
//! - Submissions are never retried: a lost response does not prove the
//!   mutation was dropped, so a retry could apply it twice
//! - A receipt wait that runs out of time reports an unknown outcome
//!   (`LedgerError::Timeout`); `check_receipt` is the reconciliation path
//! - Transport errors while polling are logged and polling continues until
//!   the deadline

use dashmap::DashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::{interval, timeout, MissedTickBehavior};

use crate::config::schema::Config;
use crate::ledger::error::{LedgerError, LedgerResult};
use crate::ledger::ids::TransactionId;
use crate::ledger::network::{Gateway, Query, QueryResponse, QueryService};
use crate::ledger::receipt::Receipt;
use crate::observability::metrics;
use crate::resilience::retries::{retry_idempotent, RetryPolicy};
use crate::resilience::timeouts::with_deadline;
use crate::submission::handle::PendingHandle;
use crate::transaction::frozen::SignedTransaction;

/// Polling and retry knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionPolicy {
    pub poll_interval: Duration,
    pub query_timeout: Duration,
    pub retry: RetryPolicy,
}

impl SubmissionPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            poll_interval: config.timeouts.receipt_poll_interval(),
            query_timeout: config.timeouts.query(),
            retry: RetryPolicy::from(&config.retries),
        }
    }
}

impl Default for SubmissionPolicy {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Sends signed transactions and waits for their receipts.
///
/// Every id this client sends is kept for the client's lifetime, so the set
/// grows by one entry per submission. Long-running processes should build a
/// fresh client per batch of work rather than share one indefinitely.
#[derive(Clone)]
pub struct SubmissionClient {
    gateway: Arc<dyn Gateway>,
    queries: Arc<dyn QueryService>,
    // never pruned: a signed payload must not be resent, whatever its outcome
    submitted: Arc<DashSet<TransactionId>>,
    policy: SubmissionPolicy,
}

impl SubmissionClient {
    pub fn new(gateway: Arc<dyn Gateway>, queries: Arc<dyn QueryService>) -> Self {
        Self {
            gateway,
            queries,
            submitted: Arc::new(DashSet::new()),
            policy: SubmissionPolicy::default(),
        }
    }

    /// Client over a network that serves both submissions and queries.
    pub fn for_network<N>(network: Arc<N>) -> Self
    where
        N: Gateway + QueryService + 'static,
    {
        Self::new(network.clone(), network)
    }

    pub fn with_policy(mut self, policy: SubmissionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &SubmissionPolicy {
        &self.policy
    }

    /// Whether this client has already sent `transaction_id`.
    pub fn was_submitted(&self, transaction_id: &TransactionId) -> bool {
        self.submitted.contains(transaction_id)
    }

    /// Send a fully signed transaction.
    ///
    /// The transaction id is recorded before the gateway call, so a failed
    /// send cannot be repeated with the same signed payload.
    pub async fn submit(&self, signed: SignedTransaction) -> LedgerResult<PendingHandle> {
        let transaction_id = signed.transaction_id();
        let kind = signed.kind();

        if !signed.is_fully_signed() {
            let missing: Vec<String> = signed.missing_signers().iter().map(|r| r.to_string()).collect();
            return Err(LedgerError::State(format!(
                "{} is missing signatures from: {}",
                transaction_id,
                missing.join(", ")
            )));
        }
        if !self.submitted.insert(transaction_id) {
            return Err(LedgerError::State(format!(
                "{} was already submitted; build a new transaction to retry",
                transaction_id
            )));
        }

        match self.gateway.submit(&signed).await {
            Ok(()) => {
                metrics::record_submission(kind.as_str());
                tracing::info!(
                    transaction_id = %transaction_id,
                    kind = %kind,
                    node = %signed.frozen().body().node_account_id,
                    "Transaction submitted"
                );
                Ok(PendingHandle {
                    transaction_id,
                    kind,
                    node_account_id: signed.frozen().body().node_account_id,
                    submitted_at: Instant::now(),
                })
            }
            Err(e) => {
                tracing::warn!(
                    transaction_id = %transaction_id,
                    kind = %kind,
                    error = %e,
                    "Submission failed"
                );
                Err(e)
            }
        }
    }

    /// Wait for the receipt of a submitted transaction.
    ///
    /// Returns the receipt on `SUCCESS`, `RemoteRejection` for any other
    /// terminal status, and `Timeout` when `deadline` passes first.
    pub async fn await_receipt(&self, handle: PendingHandle, deadline: Duration) -> LedgerResult<Receipt> {
        let transaction_id = handle.transaction_id;
        let poll_interval = self.policy.poll_interval;

        let result = timeout(deadline, async {
            let mut ticker = interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                match self.gateway.receipt(&transaction_id).await {
                    Ok(Some(receipt)) if receipt.status.is_terminal() => return receipt,
                    Ok(_) => {
                        tracing::debug!(transaction_id = %transaction_id, "Receipt pending");
                    }
                    Err(e) => {
                        tracing::warn!(
                            transaction_id = %transaction_id,
                            error = %e,
                            "Receipt lookup failed, polling again"
                        );
                    }
                }
            }
        })
        .await;

        let receipt = match result {
            Ok(receipt) => receipt,
            Err(_) => {
                tracing::warn!(
                    transaction_id = %transaction_id,
                    kind = %handle.kind,
                    waited_ms = deadline.as_millis() as u64,
                    "Receipt wait timed out; outcome unknown"
                );
                return Err(LedgerError::Timeout {
                    transaction_id,
                    waited: deadline,
                });
            }
        };

        metrics::record_receipt(handle.kind.as_str(), receipt.status.as_str(), handle.submitted_at);

        if receipt.status.is_success() {
            tracing::info!(
                transaction_id = %transaction_id,
                kind = %handle.kind,
                status = %receipt.status,
                "Receipt received"
            );
            Ok(receipt)
        } else {
            tracing::warn!(
                transaction_id = %transaction_id,
                kind = %handle.kind,
                status = %receipt.status,
                "Transaction failed"
            );
            Err(LedgerError::RemoteRejection {
                status: receipt.status,
                transaction_id,
            })
        }
    }

    /// Submit and wait for the receipt.
    pub async fn execute(&self, signed: SignedTransaction, deadline: Duration) -> LedgerResult<Receipt> {
        let handle = self.submit(signed).await?;
        self.await_receipt(handle, deadline).await
    }

    /// One lookup of a receipt, for reconciling after a timed-out wait.
    /// `None` means the network has no final outcome yet.
    pub async fn check_receipt(&self, transaction_id: &TransactionId) -> LedgerResult<Option<Receipt>> {
        let gateway = &self.gateway;
        let deadline = self.policy.query_timeout;
        let receipt = retry_idempotent(&self.policy.retry, "receipt lookup", move || {
            with_deadline(deadline, "receipt lookup", gateway.receipt(transaction_id))
        })
        .await?;
        Ok(receipt.filter(|r| r.status.is_terminal()))
    }

    /// Run a read-only query.
    pub async fn query(&self, query: &Query) -> LedgerResult<QueryResponse> {
        let queries = &self.queries;
        let deadline = self.policy.query_timeout;
        let name = query.name();

        let result = retry_idempotent(&self.policy.retry, name, move || {
            with_deadline(deadline, name, queries.query(query))
        })
        .await;

        match &result {
            Ok(_) => {
                metrics::record_query(name, "ok");
                tracing::debug!(query = %query, "Query answered");
            }
            Err(e) => {
                metrics::record_query(name, e.kind());
                tracing::warn!(query = %query, error = %e, "Query failed");
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{KeyMaterial, KeyRole, Operator, PrivateKey};
    use crate::ledger::ids::{AccountId, Timestamp};
    use crate::ledger::status::Status;
    use crate::transaction::context::ExecutionContext;
    use crate::transaction::fields::{Field, OperationKind};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Gateway whose receipts appear after a number of polls.
    struct ScriptedGateway {
        pending_polls: u32,
        status: Status,
        polls: AtomicU32,
        submissions: AtomicU32,
        fail_submit: bool,
        last: Mutex<Option<TransactionId>>,
    }

    impl ScriptedGateway {
        fn new(pending_polls: u32, status: Status) -> Self {
            Self {
                pending_polls,
                status,
                polls: AtomicU32::new(0),
                submissions: AtomicU32::new(0),
                fail_submit: false,
                last: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl Gateway for ScriptedGateway {
        async fn submit(&self, transaction: &SignedTransaction) -> LedgerResult<()> {
            self.submissions.fetch_add(1, Ordering::SeqCst);
            if self.fail_submit {
                return Err(LedgerError::Network("connection refused".into()));
            }
            *self.last.lock().unwrap() = Some(transaction.transaction_id());
            Ok(())
        }

        async fn receipt(&self, transaction_id: &TransactionId) -> LedgerResult<Option<Receipt>> {
            let n = self.polls.fetch_add(1, Ordering::SeqCst);
            if n < self.pending_polls {
                return Ok(None);
            }
            Ok(Some(Receipt {
                transaction_id: *transaction_id,
                status: self.status,
                assigned: None,
                serials: Vec::new(),
                total_supply: None,
                topic_sequence_number: None,
                consensus_timestamp: Timestamp::now(),
            }))
        }
    }

    #[async_trait]
    impl QueryService for ScriptedGateway {
        async fn query(&self, _query: &Query) -> LedgerResult<QueryResponse> {
            Err(LedgerError::Network("mirror unavailable".into()))
        }
    }

    fn fast_policy() -> SubmissionPolicy {
        SubmissionPolicy {
            poll_interval: Duration::from_millis(5),
            query_timeout: Duration::from_millis(200),
            retry: RetryPolicy {
                max_attempts: 2,
                base_delay_ms: 1,
                max_delay_ms: 2,
            },
        }
    }

    fn client(gateway: ScriptedGateway) -> (SubmissionClient, Arc<ScriptedGateway>) {
        let gateway = Arc::new(gateway);
        (SubmissionClient::for_network(gateway.clone()).with_policy(fast_policy()), gateway)
    }

    fn signed_message(signers: Vec<KeyRole>, keys: &[KeyMaterial]) -> SignedTransaction {
        let operator = Operator::new(AccountId::new(0, 0, 2), PrivateKey::generate_ed25519());
        let ctx = ExecutionContext::new("sandbox", operator, vec![AccountId::new(0, 0, 3)]);
        let frozen = OperationKind::TopicMessageSubmit
            .builder()
            .set(Field::TopicId, "0.0.1001".parse::<crate::ledger::ids::TopicId>().unwrap())
            .set(Field::Message, crate::transaction::fields::FieldValue::bytes("Hello, this is my first message!"))
            .signers(signers)
            .build()
            .unwrap()
            .freeze(&ctx)
            .unwrap();
        let mut signed = SignedTransaction::from(frozen);
        for key in keys {
            signed = signed.sign(key).unwrap();
        }
        signed
    }

    #[tokio::test]
    async fn test_partially_signed_is_rejected_before_network() {
        let (client, gateway) = client(ScriptedGateway::new(0, Status::Success));
        let signed = signed_message(vec![KeyRole::Submit, KeyRole::Operator], &[KeyMaterial::generate(KeyRole::Submit)]);

        let err = client.submit(signed).await.unwrap_err();
        assert!(matches!(err, LedgerError::State(ref m) if m.contains("operator")));
        assert_eq!(gateway.submissions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_resubmission_is_a_state_error() {
        let (client, gateway) = client(ScriptedGateway::new(0, Status::Success));
        let signed = signed_message(vec![KeyRole::Submit], &[KeyMaterial::generate(KeyRole::Submit)]);

        let _handle = client.submit(signed.clone()).await.unwrap();
        assert!(matches!(client.submit(signed).await, Err(LedgerError::State(_))));
        assert_eq!(gateway.submissions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_is_not_retried() {
        let mut scripted = ScriptedGateway::new(0, Status::Success);
        scripted.fail_submit = true;
        let (client, gateway) = client(scripted);
        let signed = signed_message(vec![KeyRole::Submit], &[KeyMaterial::generate(KeyRole::Submit)]);
        let id = signed.transaction_id();

        assert!(matches!(client.submit(signed).await, Err(LedgerError::Network(_))));
        assert_eq!(gateway.submissions.load(Ordering::SeqCst), 1);
        assert!(client.was_submitted(&id));
    }

    #[tokio::test]
    async fn test_await_receipt_polls_until_final() {
        let (client, gateway) = client(ScriptedGateway::new(3, Status::Success));
        let signed = signed_message(vec![KeyRole::Submit], &[KeyMaterial::generate(KeyRole::Submit)]);
        let id = signed.transaction_id();

        let receipt = client.execute(signed, Duration::from_secs(2)).await.unwrap();
        assert_eq!(receipt.transaction_id, id);
        assert_eq!(receipt.status, Status::Success);
        assert_eq!(gateway.polls.load(Ordering::SeqCst), 4);
        assert_eq!(*gateway.last.lock().unwrap(), Some(id));
    }

    #[tokio::test]
    async fn test_failure_status_is_remote_rejection() {
        let (client, _) = client(ScriptedGateway::new(0, Status::InvalidSignature));
        let signed = signed_message(vec![KeyRole::Submit], &[KeyMaterial::generate(KeyRole::Submit)]);

        let err = client.execute(signed, Duration::from_secs(2)).await.unwrap_err();
        assert_eq!(err.status(), Some(Status::InvalidSignature));
    }

    #[tokio::test]
    async fn test_deadline_reports_unknown_outcome() {
        let (client, _) = client(ScriptedGateway::new(u32::MAX, Status::Success));
        let signed = signed_message(vec![KeyRole::Submit], &[KeyMaterial::generate(KeyRole::Submit)]);
        let id = signed.transaction_id();

        let handle = client.submit(signed).await.unwrap();
        let err = client.await_receipt(handle, Duration::from_millis(40)).await.unwrap_err();
        match err {
            LedgerError::Timeout { transaction_id, waited } => {
                assert_eq!(transaction_id, id);
                assert_eq!(waited, Duration::from_millis(40));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
        assert!(client.check_receipt(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_query_gives_up_after_retries() {
        let (client, _) = client(ScriptedGateway::new(0, Status::Success));
        let query = Query::AccountBalance(AccountId::new(0, 0, 2));
        assert!(matches!(client.query(&query).await, Err(LedgerError::Network(_))));
    }
}
