//! ledger-flow command line.
//!
//! `topic` and `token` run the demo workflows against an in-process sandbox
//! ledger funded for the operator from `OPERATOR_ID` / `OPERATOR_KEY`.
//! `watch` and `balance` read from the configured mirror node.

use clap::{Parser, Subcommand};
use futures_util::StreamExt;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use ledger_flow::config::{resolve_config, Config};
use ledger_flow::flows::{self, FlowEnv, FlowError};
use ledger_flow::keys::operator::{OPERATOR_ID_ENV_VAR, OPERATOR_KEY_ENV_VAR};
use ledger_flow::keys::Operator;
use ledger_flow::ledger::{AccountId, LedgerError, Query, QueryService, Timestamp, TopicId};
use ledger_flow::mirror::MirrorClient;
use ledger_flow::observability::logging;
use ledger_flow::resilience::retries::{retry_idempotent, RetryPolicy};
use ledger_flow::subscription::SubscriptionReader;

/// Exit code for unusable configuration or credentials.
const EXIT_CONFIG: u8 = 2;

#[derive(Parser)]
#[command(name = "ledger-flow")]
#[command(about = "Ledger transaction workflows with receipt confirmation", long_about = None)]
struct Cli {
    /// TOML config file. Falls back to $LEDGER_FLOW_CONFIG, then defaults.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create, update and publish to a topic, then read the message back
    Topic,
    /// Create an NFT collection with a royalty fee and trade it between accounts
    Token,
    /// Stream messages of a topic from the mirror node
    Watch {
        #[arg(long)]
        topic: TopicId,
        /// Stop after this many messages
        #[arg(long)]
        limit: Option<usize>,
        /// Earliest consensus timestamp, as seconds[.nanos]
        #[arg(long, default_value = "0")]
        start: Timestamp,
    },
    /// Show an account's hbar and token balances from the mirror node
    Balance {
        #[arg(long)]
        account: AccountId,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match resolve_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_CONFIG);
        }
    };
    logging::init(&config.observability.log_level);

    tracing::info!(
        network = %config.network.name,
        nodes = ?config.network.nodes,
        mirror_url = %config.network.mirror_url,
        "Configuration loaded"
    );

    match &cli.command {
        command @ (Commands::Topic | Commands::Token) => run_flow(&config, command).await,
        Commands::Watch { topic, limit, start } => watch(&config, *topic, *limit, *start).await,
        Commands::Balance { account } => balance(&config, *account).await,
    }
}

async fn run_flow(config: &Config, command: &Commands) -> ExitCode {
    let operator = match Operator::from_env() {
        Ok(Some(operator)) => operator,
        Ok(None) => {
            println!(
                "Please set the operator id and key ({} and {})",
                OPERATOR_ID_ENV_VAR, OPERATOR_KEY_ENV_VAR
            );
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    let (env, _network) = match FlowEnv::sandbox(config, operator) {
        Ok(wired) => wired,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    let result = match command {
        Commands::Token => flows::token::run(&env).await.map(|report| {
            tracing::info!(token_id = %report.token_id, steps = report.receipts.len(), "Token flow finished");
        }),
        _ => flows::topic::run(&env).await.map(|report| {
            tracing::info!(topic_id = %report.topic_id, "Topic flow finished");
        }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_failure(&e);
            ExitCode::FAILURE
        }
    }
}

fn report_failure(error: &FlowError) {
    eprintln!("Error: {}", error);
    if let Some(step) = error.step() {
        eprintln!("  step:   {}", step);
    }
    if let Some(kind) = error.kind() {
        eprintln!("  kind:   {}", kind);
    }
    if let Some(status) = error.status() {
        eprintln!("  status: {}", status);
    }
}

fn mirror(config: &Config) -> Result<MirrorClient, LedgerError> {
    MirrorClient::from_config(&config.network, config.timeouts.query())
}

async fn watch(config: &Config, topic: TopicId, limit: Option<usize>, start: Timestamp) -> ExitCode {
    let mirror = match mirror(config) {
        Ok(mirror) => Arc::new(mirror),
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_CONFIG);
        }
    };
    let reader = SubscriptionReader::from_config(mirror, &config.subscription, &config.retries);
    let (handle, messages) = reader.stream(topic, start, limit);
    futures_util::pin_mut!(messages);

    loop {
        tokio::select! {
            message = messages.next() => match message {
                Some(message) => println!(
                    "[{}] #{} {}",
                    message.consensus_timestamp,
                    message.sequence_number,
                    message.contents_lossy()
                ),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!(topic_id = %topic, "Interrupted, closing subscription");
                handle.cancel();
                break;
            }
        }
    }

    match handle.join().await {
        Ok(summary) => {
            println!("{} message(s) received ({:?})", summary.delivered, summary.reason);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn balance(config: &Config, account: AccountId) -> ExitCode {
    let mirror = match mirror(config) {
        Ok(mirror) => mirror,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_CONFIG);
        }
    };
    let query = Query::AccountBalance(account);
    let policy = RetryPolicy::from(&config.retries);
    let result = retry_idempotent(&policy, "balance query", || mirror.query(&query))
        .await
        .and_then(|response| response.into_account_balance());

    match result {
        Ok(balance) => {
            println!("The hbar account balance for {} is {}", account, balance.hbars);
            for (token_id, held) in &balance.tokens {
                println!("The token account balance with id: {} for {} is {}", token_id, account, held);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
