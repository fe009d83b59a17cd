//! End-to-end workflows driven from the CLI.
//!
//! # Responsibilities
//! - Topic flow: create, inspect, update, publish, then read back
//! - Token flow: accounts, an NFT collection with a royalty fee, mints,
//!   associations and royalty-bearing transfers
//!
//! # Data Flow
//! ```text
//! Config + Operator → FlowEnv (client, context, reader)
//!     → DependencyChain driven step by step (ChainRun)
//!     → queries between steps for the status lines on stdout
//! ```

pub mod token;
pub mod topic;

use std::sync::Arc;
use std::time::Duration;

use crate::chain::{ChainFailure, ChainRun};
use crate::config::Config;
use crate::keys::Operator;
use crate::ledger::error::{LedgerError, LedgerResult};
use crate::ledger::ids::{AccountId, TokenId};
use crate::ledger::network::{AccountBalance, Query};
use crate::ledger::receipt::Receipt;
use crate::ledger::status::Status;
use crate::sandbox::SandboxNetwork;
use crate::submission::{SubmissionClient, SubmissionPolicy};
use crate::subscription::SubscriptionReader;
use crate::transaction::context::ExecutionContext;
use crate::transaction::fields::OperationKind;

/// Why a flow stopped.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("{0}")]
    Step(ChainFailure),

    #[error("{what} failed: {source}")]
    Ledger {
        what: &'static str,
        #[source]
        source: LedgerError,
    },
}

impl FlowError {
    fn ledger(what: &'static str) -> impl FnOnce(LedgerError) -> FlowError {
        move |source| FlowError::Ledger { what, source }
    }

    /// 1-based step number, for failures inside a chain.
    pub fn step(&self) -> Option<usize> {
        match self {
            FlowError::Step(failure) => Some(failure.step),
            FlowError::Ledger { .. } => None,
        }
    }

    pub fn kind(&self) -> Option<OperationKind> {
        match self {
            FlowError::Step(failure) => failure.kind,
            FlowError::Ledger { .. } => None,
        }
    }

    pub fn status(&self) -> Option<Status> {
        match self {
            FlowError::Step(failure) => failure.reason.status(),
            FlowError::Ledger { source, .. } => source.status(),
        }
    }
}

/// Everything a flow needs to talk to a network.
pub struct FlowEnv {
    pub client: SubmissionClient,
    pub ctx: ExecutionContext,
    pub reader: SubscriptionReader,
    pub receipt_timeout: Duration,
}

impl FlowEnv {
    pub fn new(
        client: SubmissionClient,
        ctx: ExecutionContext,
        reader: SubscriptionReader,
        receipt_timeout: Duration,
    ) -> Self {
        Self {
            client,
            ctx,
            reader,
            receipt_timeout,
        }
    }

    /// Wire a fresh sandbox network where the operator holds the genesis
    /// balance. The network is returned for inspection.
    pub fn sandbox(config: &Config, operator: Operator) -> LedgerResult<(Self, Arc<SandboxNetwork>)> {
        let operator_account = operator.account_id;
        let operator_key = operator.key.public_key();
        let ctx = ExecutionContext::from_config(&config.network, operator)?;

        let network = Arc::new(
            SandboxNetwork::with_operator(&config.sandbox, operator_account, operator_key)?
                .with_nodes(ctx.nodes().to_vec()),
        );
        let client = SubmissionClient::for_network(network.clone()).with_policy(SubmissionPolicy::from_config(config));
        let reader = SubscriptionReader::from_config(network.clone(), &config.subscription, &config.retries);

        Ok((Self::new(client, ctx, reader, config.timeouts.receipt()), network))
    }

    pub async fn balance(&self, account_id: AccountId) -> LedgerResult<AccountBalance> {
        self.client
            .query(&Query::AccountBalance(account_id))
            .await?
            .into_account_balance()
    }

    /// Print the hbar balance of each account, plus its `token_id` holding
    /// when associated.
    pub async fn print_balances(&self, accounts: &[(&str, AccountId)], token_id: Option<TokenId>) -> Result<(), FlowError> {
        println!("------Accounts balances------");
        for (name, account_id) in accounts {
            let balance = self.balance(*account_id).await.map_err(FlowError::ledger("balance query"))?;
            println!("The hbar account balance for {} ({}) is {}", name, account_id, balance.hbars);
            if let Some((token_id, held)) = token_id.and_then(|t| balance.tokens.get(&t).map(|h| (t, h))) {
                println!("The token account balance with id: {} for {} is {}", token_id, name, held);
            }
        }
        println!("-----------------------------");
        Ok(())
    }
}

/// Advance `run` by one step, returning an owned receipt.
pub(crate) async fn next_receipt(run: &mut ChainRun<'_>) -> Result<Receipt, FlowError> {
    match run.advance().await {
        Some(Ok(receipt)) => Ok(receipt.clone()),
        Some(Err(failure)) => Err(FlowError::Step(failure.clone())),
        None => Err(FlowError::Ledger {
            what: "chain",
            source: LedgerError::State("no steps left to run".to_string()),
        }),
    }
}
