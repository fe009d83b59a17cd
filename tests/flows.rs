//! End-to-end workflow tests against the in-process sandbox.

use ledger_flow::flows::{token, topic};
use ledger_flow::ledger::amount::Hbar;
use ledger_flow::ledger::ids::{AccountId, NftId};
use ledger_flow::ledger::status::Status;

mod common;

#[tokio::test]
async fn test_topic_flow_reads_back_its_message() {
    let (env, network) = common::sandbox_env();

    let report = topic::run(&env).await.expect("topic flow");

    assert_eq!(report.created_memo, topic::INITIAL_MEMO);
    assert_eq!(report.updated_memo, topic::UPDATED_MEMO);
    assert_eq!(report.sequence_number, 1);
    assert_eq!(report.received.topic_id, report.topic_id);
    assert_eq!(report.received.sequence_number, 1);
    assert_eq!(report.received.contents, topic::FIRST_MESSAGE.as_bytes());

    let info = network.snapshot().topic_info(&report.topic_id).expect("topic exists");
    assert_eq!(info.memo, topic::UPDATED_MEMO);
    assert_eq!(info.sequence_number, 1);
}

#[tokio::test]
async fn test_token_flow_settles_royalties() {
    let (env, network) = common::sandbox_env();
    let operator = env.ctx.operator_account();

    let report = token::run(&env).await.expect("token flow");

    assert_eq!(report.receipts.len(), 11);
    assert!(report.receipts.iter().all(|r| r.status == Status::Success));
    assert_eq!(report.receipts[3].serials, vec![1, 2]);

    let state = network.snapshot();
    let balance = |id: AccountId| state.account_balance(&id).expect("account exists");

    // B: 10 - 5 + (5 - 0.25) + (5 - 0.5); C: 10 - 5 + (5 - 0.5) - 5
    assert_eq!(balance(report.account_b).hbars, Hbar::from_tinybars(1_425_000_000));
    assert_eq!(balance(report.account_c).hbars, Hbar::from_tinybars(450_000_000));

    assert_eq!(balance(operator).tokens.get(&report.token_id), Some(&1));
    assert_eq!(balance(report.account_b).tokens.get(&report.token_id), Some(&0));
    assert_eq!(balance(report.account_c).tokens.get(&report.token_id), Some(&1));

    let owner = |serial: u64| {
        state
            .nft_info(&NftId::new(report.token_id, serial))
            .expect("serial minted")
            .owner
    };
    assert_eq!(owner(1), report.account_c);
    assert_eq!(owner(2), operator);

    let info = state.token_info(&report.token_id).expect("token exists");
    assert_eq!(info.total_supply, 2);
    assert_eq!(info.max_supply, token::MAX_SUPPLY);
    assert_eq!(info.name, token::TOKEN_NAME);
}

#[tokio::test]
async fn test_operator_pays_every_fee() {
    let (env, network) = common::sandbox_env();
    let operator = env.ctx.operator_account();
    let before = common::hbar_balance(&network, operator);

    topic::run(&env).await.expect("topic flow");

    let after = common::hbar_balance(&network, operator);
    let fees = Hbar::from_tinybars(network.fee().to_tinybars() * 3);
    assert_eq!(after, before - fees);
}
