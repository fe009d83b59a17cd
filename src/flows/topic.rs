//! Topic workflow: create, update, publish, read back.

use futures_util::StreamExt;
use tokio::time::timeout;

use crate::chain::DependencyChain;
use crate::flows::{next_receipt, FlowEnv, FlowError};
use crate::keys::{KeyMaterial, KeyRole, Keyring};
use crate::ledger::error::LedgerError;
use crate::ledger::ids::{Timestamp, TopicId};
use crate::ledger::network::{Query, TopicInfo};
use crate::ledger::types::TopicMessage;
use crate::transaction::fields::{Field, FieldValue, OperationKind};

pub const INITIAL_MEMO: &str = "My first topic";
pub const UPDATED_MEMO: &str = "Updated topic";
pub const FIRST_MESSAGE: &str = "Hello, this is my first message!";

/// How many messages the read-back subscription asks for.
const READ_LIMIT: usize = 5;

/// What the topic flow observed.
#[derive(Debug, Clone)]
pub struct TopicReport {
    pub topic_id: TopicId,
    pub created_memo: String,
    pub updated_memo: String,
    pub sequence_number: u64,
    pub received: TopicMessage,
}

/// Create topic → update memo → submit message, each step reading the
/// topic id from the create receipt.
pub fn topic_chain(admin: &KeyMaterial, submit: &KeyMaterial) -> DependencyChain {
    let admin_key = admin.public_key();
    let submit_key = submit.public_key();

    DependencyChain::new()
        .step("create topic", move |_| {
            OperationKind::TopicCreate
                .builder()
                .set(Field::AdminKey, admin_key)
                .set(Field::SubmitKey, submit_key)
                .set(Field::Memo, INITIAL_MEMO)
                .signer(KeyRole::Admin)
                .build()
        })
        .step("update topic", |receipts| {
            OperationKind::TopicUpdate
                .builder()
                .set(Field::TopicId, receipts.topic_id(1)?)
                .set(Field::Memo, UPDATED_MEMO)
                .signer(KeyRole::Admin)
                .build()
        })
        .step("submit message", |receipts| {
            OperationKind::TopicMessageSubmit
                .builder()
                .set(Field::TopicId, receipts.topic_id(1)?)
                .set(Field::Message, FieldValue::bytes(FIRST_MESSAGE))
                .signer(KeyRole::Submit)
                .build()
        })
}

async fn topic_info(env: &FlowEnv, topic_id: TopicId) -> Result<TopicInfo, FlowError> {
    env.client
        .query(&Query::TopicInfo(topic_id))
        .await
        .and_then(|r| r.into_topic_info())
        .map_err(FlowError::ledger("topic info query"))
}

pub async fn run(env: &FlowEnv) -> Result<TopicReport, FlowError> {
    println!("--------------------Creation of the topic--------------------");
    let admin = KeyMaterial::generate(KeyRole::Admin);
    let submit = KeyMaterial::generate(KeyRole::Submit);
    println!("Submit public key: {}", submit.public_key());

    let chain = topic_chain(&admin, &submit);
    let keyring = Keyring::new().with(admin).with(submit);
    let mut run = chain.start(&env.client, &keyring, &env.ctx, env.receipt_timeout);

    let created = next_receipt(&mut run).await?;
    let topic_id = created.topic_id().ok_or_else(|| FlowError::Ledger {
        what: "create topic",
        source: LedgerError::UnresolvedDependency {
            step: 1,
            wanted: "topic id",
        },
    })?;
    println!("Create Topic transaction status: {}", created.status);
    println!("Id of the created topic: {}", topic_id);
    let created_memo = topic_info(env, topic_id).await?.memo;
    println!("Topic Memo: {}", created_memo);

    println!("--------------------Modification of the topic--------------------");
    let updated = next_receipt(&mut run).await?;
    println!("Update Topic transaction status: {}", updated.status);
    let updated_memo = topic_info(env, topic_id).await?.memo;
    println!("Updated Topic Memo: {}", updated_memo);

    println!("--------------------Submit a message to the topic--------------------");
    let submitted = next_receipt(&mut run).await?;
    println!("Submit message to the Topic transaction status: {}", submitted.status);

    println!("--------------------Read a message from the topic--------------------");
    let (handle, messages) = env.reader.stream(topic_id, Timestamp::EPOCH, Some(READ_LIMIT));
    futures_util::pin_mut!(messages);
    let received = timeout(env.receipt_timeout, messages.next()).await;
    handle.cancel();
    let summary = handle.join().await.map_err(FlowError::ledger("subscription"))?;
    tracing::debug!(delivered = summary.delivered, reason = ?summary.reason, "Read-back subscription ended");

    let received = match received {
        Ok(Some(message)) => message,
        Ok(None) => {
            return Err(FlowError::Ledger {
                what: "subscription",
                source: LedgerError::State(format!("subscription to {} ended without a message", topic_id)),
            })
        }
        Err(_) => {
            return Err(FlowError::Ledger {
                what: "subscription",
                source: LedgerError::Network(format!(
                    "no message from {} within {:?}",
                    topic_id, env.receipt_timeout
                )),
            })
        }
    };
    println!("Received: {}", received.contents_lossy());

    Ok(TopicReport {
        topic_id,
        created_memo,
        updated_memo,
        sequence_number: submitted.topic_sequence_number.unwrap_or_default(),
        received,
    })
}
