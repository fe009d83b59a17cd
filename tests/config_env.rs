//! Config files driving a sandbox environment.

use std::io::Write;

use ledger_flow::config::{load_config, ConfigError};
use ledger_flow::flows::FlowEnv;
use ledger_flow::ledger::amount::Hbar;
use ledger_flow::ledger::error::LedgerError;
use ledger_flow::ledger::ids::AccountId;
use ledger_flow::sandbox::GENESIS_OPERATOR;

mod common;

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{}", content).unwrap();
    file
}

#[tokio::test]
async fn test_sandbox_settings_come_from_file() {
    let file = write_config(
        r#"
[network]
name = "localnet"
nodes = ["0.0.5", "0.0.6"]

[sandbox]
operator_balance_hbar = 42
consensus_delay_ms = 1
transaction_fee_tinybar = 100
"#,
    );
    let config = load_config(file.path()).unwrap();

    let (env, network) = FlowEnv::sandbox(&config, common::test_operator()).unwrap();

    assert_eq!(env.ctx.nodes(), &[AccountId::new(0, 0, 5), AccountId::new(0, 0, 6)]);
    assert_eq!(network.nodes(), env.ctx.nodes());
    assert_eq!(network.fee(), Hbar::from_tinybars(100));

    let balance = env.balance(GENESIS_OPERATOR).await.unwrap();
    assert_eq!(balance.hbars, Hbar::new(42));
}

#[test]
fn test_every_invalid_field_is_reported() {
    let file = write_config(
        r#"
[network]
name = ""
nodes = []

[retries]
max_attempts = 0
"#,
    );

    match load_config(file.path()) {
        Err(ConfigError::Validation(errors)) => {
            let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
            assert!(fields.contains(&"network.name"));
            assert!(fields.contains(&"network.nodes"));
            assert!(fields.contains(&"retries.max_attempts"));
        }
        other => panic!("expected validation errors, got {:?}", other),
    }
}

#[test]
fn test_malformed_toml_is_a_parse_error() {
    let file = write_config("[network\nname = 1");
    assert!(matches!(load_config(file.path()), Err(ConfigError::Parse(_))));
}

#[test]
fn test_oversized_hbar_amounts_fail_without_panicking() {
    let mut config = common::fast_config();
    config.sandbox.operator_balance_hbar = 100_000_000_000;
    assert!(matches!(
        FlowEnv::sandbox(&config, common::test_operator()),
        Err(LedgerError::Validation(_))
    ));

    let mut config = common::fast_config();
    config.network.max_transaction_fee_hbar = u64::MAX;
    assert!(matches!(
        FlowEnv::sandbox(&config, common::test_operator()),
        Err(LedgerError::Validation(_))
    ));
}
