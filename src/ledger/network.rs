//! Capability interfaces for the remote network.
//!
//! The orchestration core never talks to a concrete SDK. It is handed
//! implementations of these traits: the in-process sandbox implements all
//! three, the mirror node client implements the read-only ones.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::keys::PublicKey;
use crate::ledger::amount::Hbar;
use crate::ledger::error::{LedgerError, LedgerResult};
use crate::ledger::ids::{AccountId, NftId, Timestamp, TokenId, TopicId, TransactionId};
use crate::ledger::receipt::Receipt;
use crate::ledger::types::{CustomFee, SupplyType, TokenType, TopicMessage};
use crate::transaction::frozen::SignedTransaction;

/// Submission and receipt lookup.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Hand a signed transaction to its node.
    ///
    /// `Ok` means the node accepted it for consensus. Transport failures are
    /// `LedgerError::Network`; precheck failures are
    /// `LedgerError::RemoteRejection`.
    async fn submit(&self, transaction: &SignedTransaction) -> LedgerResult<()>;

    /// The receipt, or `None` while the transaction is not yet final.
    async fn receipt(&self, transaction_id: &TransactionId) -> LedgerResult<Option<Receipt>>;
}

/// Read-only queries. No signatures involved.
#[async_trait]
pub trait QueryService: Send + Sync {
    async fn query(&self, query: &Query) -> LedgerResult<QueryResponse>;
}

/// Where a page of topic messages starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Since {
    AtOrAfter(Timestamp),
    After(Timestamp),
}

impl Since {
    pub fn admits(&self, ts: Timestamp) -> bool {
        match self {
            Since::AtOrAfter(start) => ts >= *start,
            Since::After(start) => ts > *start,
        }
    }
}

/// Pages of finalized topic messages.
///
/// A page holds every visible message admitted by `since`, at most `limit`
/// of them, with the earliest consensus timestamps first. Implementations
/// may return them unsorted; readers sort.
#[async_trait]
pub trait MessageFeed: Send + Sync {
    async fn messages(&self, topic_id: TopicId, since: Since, limit: usize) -> LedgerResult<Vec<TopicMessage>>;
}

/// A read-only request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "query", content = "id", rename_all = "snake_case")]
pub enum Query {
    AccountBalance(AccountId),
    TopicInfo(TopicId),
    TokenInfo(TokenId),
    NftInfo(NftId),
}

impl Query {
    pub fn name(&self) -> &'static str {
        match self {
            Query::AccountBalance(_) => "account_balance",
            Query::TopicInfo(_) => "topic_info",
            Query::TokenInfo(_) => "token_info",
            Query::NftInfo(_) => "nft_info",
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::AccountBalance(id) => write!(f, "account_balance({})", id),
            Query::TopicInfo(id) => write!(f, "topic_info({})", id),
            Query::TokenInfo(id) => write!(f, "token_info({})", id),
            Query::NftInfo(id) => write!(f, "nft_info({})", id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    pub account_id: AccountId,
    pub hbars: Hbar,
    /// Fungible units, or number of NFTs held for a collection.
    pub tokens: BTreeMap<TokenId, u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicInfo {
    pub topic_id: TopicId,
    pub memo: String,
    pub sequence_number: u64,
    pub admin_key: Option<PublicKey>,
    pub submit_key: Option<PublicKey>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub token_id: TokenId,
    pub name: String,
    pub symbol: String,
    pub memo: String,
    pub token_type: TokenType,
    pub supply_type: SupplyType,
    pub total_supply: u64,
    pub max_supply: u64,
    pub treasury: AccountId,
    pub custom_fees: Vec<CustomFee>,
    pub admin_key: Option<PublicKey>,
    pub supply_key: Option<PublicKey>,
    pub fee_schedule_key: Option<PublicKey>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftInfo {
    pub nft_id: NftId,
    pub owner: AccountId,
    pub metadata: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueryResponse {
    AccountBalance(AccountBalance),
    TopicInfo(TopicInfo),
    TokenInfo(TokenInfo),
    NftInfo(NftInfo),
}

impl QueryResponse {
    pub fn into_account_balance(self) -> LedgerResult<AccountBalance> {
        match self {
            QueryResponse::AccountBalance(b) => Ok(b),
            other => Err(unexpected("account balance", &other)),
        }
    }

    pub fn into_topic_info(self) -> LedgerResult<TopicInfo> {
        match self {
            QueryResponse::TopicInfo(t) => Ok(t),
            other => Err(unexpected("topic info", &other)),
        }
    }

    pub fn into_token_info(self) -> LedgerResult<TokenInfo> {
        match self {
            QueryResponse::TokenInfo(t) => Ok(t),
            other => Err(unexpected("token info", &other)),
        }
    }

    pub fn into_nft_info(self) -> LedgerResult<NftInfo> {
        match self {
            QueryResponse::NftInfo(n) => Ok(n),
            other => Err(unexpected("nft info", &other)),
        }
    }
}

fn unexpected(wanted: &str, got: &QueryResponse) -> LedgerError {
    let got = match got {
        QueryResponse::AccountBalance(_) => "account balance",
        QueryResponse::TopicInfo(_) => "topic info",
        QueryResponse::TokenInfo(_) => "token info",
        QueryResponse::NftInfo(_) => "nft info",
    };
    LedgerError::Query(format!("expected {} response, got {}", wanted, got))
}
