//! Dependency chains and their step-by-step execution.

use std::fmt;
use std::time::Duration;

use crate::chain::receipts::Receipts;
use crate::keys::{KeyRole, Keyring};
use crate::ledger::error::{LedgerError, LedgerResult};
use crate::ledger::receipt::Receipt;
use crate::submission::client::SubmissionClient;
use crate::transaction::context::ExecutionContext;
use crate::transaction::descriptor::OperationDescriptor;
use crate::transaction::fields::OperationKind;
use crate::transaction::frozen::{FrozenTransaction, SignedTransaction};
use crate::transaction::signing::SigningCoordinator;

type StepBuilder = Box<dyn Fn(&Receipts<'_>) -> LedgerResult<OperationDescriptor> + Send + Sync>;

struct ChainStep {
    label: String,
    build: StepBuilder,
}

/// Ordered steps where later descriptors may use identifiers from earlier
/// receipts. A step's builder runs only once every earlier step succeeded.
#[derive(Default)]
pub struct DependencyChain {
    steps: Vec<ChainStep>,
}

impl DependencyChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step. `build` receives the receipts of the steps before it.
    pub fn step<F>(mut self, label: impl Into<String>, build: F) -> Self
    where
        F: Fn(&Receipts<'_>) -> LedgerResult<OperationDescriptor> + Send + Sync + 'static,
    {
        self.steps.push(ChainStep {
            label: label.into(),
            build: Box::new(build),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|s| s.label.as_str())
    }

    /// Begin a run that the caller drives with [`ChainRun::advance`].
    pub fn start<'a>(
        &'a self,
        client: &'a SubmissionClient,
        keyring: &'a Keyring,
        ctx: &'a ExecutionContext,
        timeout: Duration,
    ) -> ChainRun<'a> {
        ChainRun {
            chain: self,
            client,
            keyring,
            ctx,
            timeout,
            receipts: Vec::new(),
            failure: None,
        }
    }

    /// Run every step in order, stopping at the first failure.
    pub async fn execute(
        &self,
        client: &SubmissionClient,
        keyring: &Keyring,
        ctx: &ExecutionContext,
        timeout: Duration,
    ) -> ChainOutcome {
        let mut run = self.start(client, keyring, ctx, timeout);
        while run.advance().await.is_some() {}
        run.into_outcome()
    }
}

/// Why a run stopped early.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainFailure {
    /// 1-based number of the failed step.
    pub step: usize,
    pub label: String,
    /// `None` when the step failed before producing a descriptor.
    pub kind: Option<OperationKind>,
    pub reason: LedgerError,
}

impl fmt::Display for ChainFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            Some(kind) => write!(f, "step {} ({}, {}) failed: {}", self.step, self.label, kind, self.reason),
            None => write!(f, "step {} ({}) failed: {}", self.step, self.label, self.reason),
        }
    }
}

/// Terminal state of a chain run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainOutcome {
    Completed(Vec<Receipt>),
    Failed {
        failure: ChainFailure,
        /// Receipts of the steps before the failed one.
        receipts: Vec<Receipt>,
    },
}

impl ChainOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, ChainOutcome::Completed(_))
    }

    pub fn receipts(&self) -> &[Receipt] {
        match self {
            ChainOutcome::Completed(receipts) | ChainOutcome::Failed { receipts, .. } => receipts,
        }
    }

    pub fn failure(&self) -> Option<&ChainFailure> {
        match self {
            ChainOutcome::Completed(_) => None,
            ChainOutcome::Failed { failure, .. } => Some(failure),
        }
    }
}

/// An in-progress chain run.
pub struct ChainRun<'a> {
    chain: &'a DependencyChain,
    client: &'a SubmissionClient,
    keyring: &'a Keyring,
    ctx: &'a ExecutionContext,
    timeout: Duration,
    receipts: Vec<Receipt>,
    failure: Option<ChainFailure>,
}

impl<'a> ChainRun<'a> {
    /// Number of the step the next `advance` runs.
    pub fn next_step(&self) -> usize {
        self.receipts.len() + 1
    }

    pub fn receipts(&self) -> &[Receipt] {
        &self.receipts
    }

    pub fn is_finished(&self) -> bool {
        self.failure.is_some() || self.receipts.len() == self.chain.steps.len()
    }

    /// Run the next step. `None` once the chain completed or failed.
    pub async fn advance(&mut self) -> Option<Result<&Receipt, &ChainFailure>> {
        if self.is_finished() {
            return None;
        }
        let chain = self.chain;
        let number = self.next_step();
        let step = &chain.steps[number - 1];

        match self.run_step(number, step).await {
            Ok(receipt) => {
                tracing::info!(
                    step = number,
                    label = %step.label,
                    transaction_id = %receipt.transaction_id,
                    status = %receipt.status,
                    "Chain step completed"
                );
                self.receipts.push(receipt);
                self.receipts.last().map(Ok)
            }
            Err((kind, reason)) => {
                tracing::error!(
                    step = number,
                    label = %step.label,
                    kind = kind.map(|k| k.as_str()).unwrap_or("none"),
                    error = %reason,
                    "Chain halted"
                );
                self.failure = Some(ChainFailure {
                    step: number,
                    label: step.label.clone(),
                    kind,
                    reason,
                });
                self.failure.as_ref().map(Err)
            }
        }
    }

    async fn run_step(
        &self,
        number: usize,
        step: &ChainStep,
    ) -> Result<Receipt, (Option<OperationKind>, LedgerError)> {
        let mut descriptor = (step.build)(&Receipts::new(&self.receipts, number)).map_err(|e| (None, e))?;
        let kind = descriptor.kind();
        let fail = move |e: LedgerError| (Some(kind), e);

        let frozen = descriptor.freeze(self.ctx).map_err(fail)?;
        let signed = sign_declared(&frozen, self.keyring, self.ctx).map_err(fail)?;
        self.client.execute(signed, self.timeout).await.map_err(fail)
    }

    pub fn into_outcome(self) -> ChainOutcome {
        match self.failure {
            Some(failure) => ChainOutcome::Failed {
                failure,
                receipts: self.receipts,
            },
            None => ChainOutcome::Completed(self.receipts),
        }
    }
}

/// Sign with every declared role. The operator role falls back to the
/// context's operator key when the keyring has none.
pub fn sign_declared(
    frozen: &FrozenTransaction,
    keyring: &Keyring,
    ctx: &ExecutionContext,
) -> LedgerResult<SignedTransaction> {
    let mut signed = SignedTransaction::from(frozen.clone());
    for role in frozen.required_signers() {
        let key = match (keyring.get(role), role) {
            (Some(key), _) => key,
            (None, KeyRole::Operator) => ctx.operator_key(),
            (None, _) => keyring.require(role)?,
        };
        signed = SigningCoordinator::sign(&signed, key)?;
    }
    Ok(signed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{KeyMaterial, Operator, PrivateKey};
    use crate::ledger::ids::{AccountId, Timestamp, TopicId, TransactionId};
    use crate::ledger::network::{Gateway, Query, QueryResponse, QueryService};
    use crate::ledger::receipt::AssignedId;
    use crate::ledger::status::Status;
    use crate::transaction::fields::Field;
    use async_trait::async_trait;
    use dashmap::DashMap;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Assigns a fresh topic id to every topic create; fails on `fail_at`.
    #[derive(Default)]
    struct TopicGateway {
        next: AtomicU64,
        submitted: AtomicUsize,
        fail_at: Option<usize>,
        receipts: DashMap<TransactionId, Receipt>,
    }

    #[async_trait]
    impl Gateway for TopicGateway {
        async fn submit(&self, transaction: &SignedTransaction) -> LedgerResult<()> {
            let n = self.submitted.fetch_add(1, Ordering::SeqCst) + 1;
            let status = if Some(n) == self.fail_at {
                Status::InvalidTopicId
            } else {
                Status::Success
            };
            let assigned = match transaction.kind() {
                OperationKind::TopicCreate if status.is_success() => {
                    Some(AssignedId::Topic(TopicId::new(0, 0, 1000 + self.next.fetch_add(1, Ordering::SeqCst))))
                }
                _ => None,
            };
            self.receipts.insert(
                transaction.transaction_id(),
                Receipt {
                    transaction_id: transaction.transaction_id(),
                    status,
                    assigned,
                    serials: Vec::new(),
                    total_supply: None,
                    topic_sequence_number: None,
                    consensus_timestamp: Timestamp::now(),
                },
            );
            Ok(())
        }

        async fn receipt(&self, transaction_id: &TransactionId) -> LedgerResult<Option<Receipt>> {
            Ok(self.receipts.get(transaction_id).map(|r| r.clone()))
        }
    }

    #[async_trait]
    impl QueryService for TopicGateway {
        async fn query(&self, query: &Query) -> LedgerResult<QueryResponse> {
            Err(LedgerError::Query(format!("unsupported: {}", query)))
        }
    }

    fn setup(fail_at: Option<usize>) -> (SubmissionClient, ExecutionContext) {
        let gateway = Arc::new(TopicGateway {
            fail_at,
            ..Default::default()
        });
        let mut policy = crate::submission::client::SubmissionPolicy::default();
        policy.poll_interval = Duration::from_millis(2);
        let client = SubmissionClient::for_network(gateway).with_policy(policy);
        let operator = Operator::new(AccountId::new(0, 0, 2), PrivateKey::generate_ed25519());
        (client, ExecutionContext::new("sandbox", operator, vec![AccountId::new(0, 0, 3)]))
    }

    fn create_then_update(built: Arc<AtomicUsize>) -> DependencyChain {
        let counter = built.clone();
        DependencyChain::new()
            .step("create topic", move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                OperationKind::TopicCreate
                    .builder()
                    .set(Field::Memo, "My first topic")
                    .signer(KeyRole::Admin)
                    .build()
            })
            .step("update topic", move |prior| {
                built.fetch_add(1, Ordering::SeqCst);
                OperationKind::TopicUpdate
                    .builder()
                    .set(Field::TopicId, prior.topic_id(1)?)
                    .set(Field::Memo, "Updated topic")
                    .signer(KeyRole::Admin)
                    .build()
            })
    }

    #[tokio::test]
    async fn test_later_step_uses_earlier_receipt() {
        let (client, ctx) = setup(None);
        let keyring = Keyring::new().with(KeyMaterial::generate(KeyRole::Admin));
        let built = Arc::new(AtomicUsize::new(0));

        let outcome = create_then_update(built.clone())
            .execute(&client, &keyring, &ctx, Duration::from_secs(2))
            .await;

        assert!(outcome.is_completed());
        assert_eq!(outcome.receipts().len(), 2);
        assert_eq!(built.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failure_halts_before_building_next_step() {
        let (client, ctx) = setup(Some(1));
        let keyring = Keyring::new().with(KeyMaterial::generate(KeyRole::Admin));
        let built = Arc::new(AtomicUsize::new(0));

        let outcome = create_then_update(built.clone())
            .execute(&client, &keyring, &ctx, Duration::from_secs(2))
            .await;

        let failure = outcome.failure().unwrap();
        assert_eq!(failure.step, 1);
        assert_eq!(failure.kind, Some(OperationKind::TopicCreate));
        assert_eq!(failure.reason.status(), Some(Status::InvalidTopicId));
        assert!(outcome.receipts().is_empty());
        assert_eq!(built.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_key_fails_the_step() {
        let (client, ctx) = setup(None);
        let built = Arc::new(AtomicUsize::new(0));

        let outcome = create_then_update(built)
            .execute(&client, &Keyring::new(), &ctx, Duration::from_secs(2))
            .await;

        let failure = outcome.failure().unwrap();
        assert_eq!(failure.step, 1);
        assert!(matches!(failure.reason, LedgerError::Authorization(_)));
    }

    #[tokio::test]
    async fn test_advance_yields_each_receipt_then_none() {
        let (client, ctx) = setup(None);
        let keyring = Keyring::new().with(KeyMaterial::generate(KeyRole::Admin));
        let chain = create_then_update(Arc::new(AtomicUsize::new(0)));

        let mut run = chain.start(&client, &keyring, &ctx, Duration::from_secs(2));
        assert_eq!(run.next_step(), 1);
        let first = run.advance().await.unwrap().unwrap().clone();
        assert!(first.topic_id().is_some());
        assert_eq!(run.next_step(), 2);
        assert!(run.advance().await.unwrap().is_ok());
        assert!(run.advance().await.is_none());
        assert!(run.is_finished());
    }

    #[test]
    fn test_operator_role_falls_back_to_context_key() {
        let (_, ctx) = setup(None);
        let frozen = OperationKind::TopicCreate
            .builder()
            .signer(KeyRole::Operator)
            .build()
            .unwrap()
            .freeze(&ctx)
            .unwrap();
        let signed = sign_declared(&frozen, &Keyring::new(), &ctx).unwrap();
        assert!(signed.is_fully_signed());
        assert_eq!(signed.signatures()[0].public_key, ctx.operator_key().public_key());
    }
}
