//! Failure injection tests: dropped submissions, withheld receipts and
//! flaky reads.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use ledger_flow::keys::{KeyMaterial, KeyRole, Keyring, PrivateKey};
use ledger_flow::ledger::error::LedgerError;
use ledger_flow::ledger::ids::{Timestamp, TopicId};
use ledger_flow::ledger::network::Query;
use ledger_flow::ledger::status::Status;
use ledger_flow::sandbox::{SandboxNetwork, GENESIS_OPERATOR, SANDBOX_NODE};
use ledger_flow::submission::SubmissionClient;
use ledger_flow::transaction::context::ExecutionContext;
use ledger_flow::transaction::fields::{Field, FieldValue, OperationKind};
use ledger_flow::transaction::frozen::SignedTransaction;
use ledger_flow::transaction::signing::SigningCoordinator;

mod common;

fn signed_topic_create(ctx: &ExecutionContext) -> SignedTransaction {
    let mut descriptor = OperationKind::TopicCreate
        .builder()
        .set(Field::Memo, "fault injection")
        .signer(KeyRole::Operator)
        .build()
        .unwrap();
    let frozen = descriptor.freeze(ctx).unwrap();
    let keyring = Keyring::new().with(ctx.operator_key().clone());
    SigningCoordinator::sign_all(&frozen, &keyring).unwrap()
}

#[tokio::test]
async fn test_dropped_submission_is_not_resent() {
    let (env, network) = common::sandbox_env();
    network.fail_next_submissions(1);
    let signed = signed_topic_create(&env.ctx);
    let transaction_id = signed.transaction_id();

    let first = env.client.submit(signed.clone()).await;
    assert!(matches!(first, Err(LedgerError::Network(_))));
    assert!(first.unwrap_err().is_retryable());
    assert!(env.client.was_submitted(&transaction_id));

    // the same signed payload is refused; a retry needs a new transaction
    let second = env.client.submit(signed).await;
    assert!(matches!(second, Err(LedgerError::State(_))));
    assert!(network.snapshot().topics.is_empty());

    let receipt = env
        .client
        .execute(signed_topic_create(&env.ctx), env.receipt_timeout)
        .await
        .unwrap();
    assert_eq!(receipt.status, Status::Success);
}

#[tokio::test]
async fn test_receipt_timeout_reconciles_with_check_receipt() {
    let (env, network) = common::sandbox_env();
    network.withhold_receipts(true);
    let signed = signed_topic_create(&env.ctx);
    let transaction_id = signed.transaction_id();

    let result = env.client.execute(signed, Duration::from_millis(50)).await;
    match result {
        Err(LedgerError::Timeout {
            transaction_id: timed_out,
            ..
        }) => assert_eq!(timed_out, transaction_id),
        other => panic!("expected a timeout, got {:?}", other),
    }

    // the outcome is unknown to the caller but the ledger applied it
    assert_eq!(env.client.check_receipt(&transaction_id).await.unwrap(), None);
    assert_eq!(network.snapshot().topics.len(), 1);

    network.withhold_receipts(false);
    tokio::time::sleep(Duration::from_millis(20)).await;
    let receipt = env
        .client
        .check_receipt(&transaction_id)
        .await
        .unwrap()
        .expect("receipt published");
    assert_eq!(receipt.status, Status::Success);
    assert!(receipt.topic_id().is_some());
}

#[tokio::test]
async fn test_unknown_operator_key_is_rejected_at_precheck() {
    let config = common::fast_config();
    let registered = PrivateKey::generate_ed25519();
    let network = Arc::new(SandboxNetwork::with_operator(
        &config.sandbox,
        GENESIS_OPERATOR,
        registered.public_key(),
    )
    .unwrap());
    let client = SubmissionClient::for_network(network.clone());
    let ctx = ExecutionContext::new("sandbox", common::test_operator(), vec![SANDBOX_NODE]);

    let result = client.submit(signed_topic_create(&ctx)).await;

    match result {
        Err(LedgerError::RemoteRejection { status, .. }) => assert_eq!(status, Status::InvalidSignature),
        other => panic!("expected a precheck rejection, got {:?}", other),
    }
    assert_eq!(common::hbar_balance(&network, GENESIS_OPERATOR).to_tinybars(), 1000 * 100_000_000);
}

#[tokio::test]
async fn test_queries_retry_through_flaky_reads() {
    let (env, network) = common::sandbox_env();
    network.fail_next_reads(2);

    let balance = env
        .client
        .query(&Query::AccountBalance(env.ctx.operator_account()))
        .await
        .and_then(|r| r.into_account_balance())
        .unwrap();
    assert_eq!(balance.account_id, env.ctx.operator_account());
}

#[tokio::test]
async fn test_queries_give_up_after_max_attempts() {
    let (env, network) = common::sandbox_env();
    network.fail_next_reads(10);

    let result = env.client.query(&Query::AccountBalance(env.ctx.operator_account())).await;
    assert!(matches!(result, Err(LedgerError::Network(_))));
}

#[tokio::test]
async fn test_missing_entity_is_not_retried() {
    let (env, _network) = common::sandbox_env();
    let result = env.client.query(&Query::TopicInfo(TopicId::new(0, 0, 9999))).await;
    assert!(matches!(result, Err(LedgerError::Query(_))));
}

#[tokio::test]
async fn test_subscription_survives_failed_pages() {
    let (env, network) = common::sandbox_env();
    let submit = KeyMaterial::generate(KeyRole::Submit);

    let mut create = OperationKind::TopicCreate
        .builder()
        .set(Field::SubmitKey, submit.public_key())
        .signer(KeyRole::Operator)
        .build()
        .unwrap();
    let keyring = Keyring::new().with(env.ctx.operator_key().clone()).with(submit);
    let frozen = create.freeze(&env.ctx).unwrap();
    let receipt = env
        .client
        .execute(SigningCoordinator::sign_all(&frozen, &keyring).unwrap(), env.receipt_timeout)
        .await
        .unwrap();
    let topic_id = receipt.topic_id().unwrap();

    for text in ["one", "two"] {
        let mut message = OperationKind::TopicMessageSubmit
            .builder()
            .set(Field::TopicId, topic_id)
            .set(Field::Message, FieldValue::bytes(text))
            .signer(KeyRole::Submit)
            .build()
            .unwrap();
        let frozen = message.freeze(&env.ctx).unwrap();
        env.client
            .execute(SigningCoordinator::sign_all(&frozen, &keyring).unwrap(), env.receipt_timeout)
            .await
            .unwrap();
    }

    network.fail_next_reads(2);
    let (handle, messages) = env.reader.stream(topic_id, Timestamp::EPOCH, Some(2));
    let received: Vec<_> = tokio::time::timeout(env.receipt_timeout, messages.collect::<Vec<_>>())
        .await
        .expect("messages within the deadline");

    assert_eq!(received.len(), 2);
    assert_eq!(received[0].contents, b"one");
    assert_eq!(received[1].sequence_number, 2);
    assert_eq!(handle.join().await.unwrap().delivered, 2);
}

#[tokio::test]
async fn test_confirmed_transaction_stays_recorded() {
    let (env, network) = common::sandbox_env();
    let signed = signed_topic_create(&env.ctx);
    let transaction_id = signed.transaction_id();

    let receipt = env.client.execute(signed.clone(), env.receipt_timeout).await.unwrap();
    assert_eq!(receipt.status, Status::Success);
    assert!(env.client.was_submitted(&transaction_id));

    // clones share the record
    let clone = env.client.clone();
    assert!(matches!(clone.submit(signed).await, Err(LedgerError::State(_))));
    assert_eq!(network.snapshot().topics.len(), 1);

    let fresh = SubmissionClient::for_network(network.clone());
    assert!(!fresh.was_submitted(&transaction_id));
}
