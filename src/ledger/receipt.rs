//! Finalized transaction outcomes.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ledger::ids::{AccountId, Timestamp, TokenId, TopicId, TransactionId};
use crate::ledger::status::Status;

/// An identifier created by a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum AssignedId {
    Account(AccountId),
    Topic(TopicId),
    Token(TokenId),
}

impl fmt::Display for AssignedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssignedId::Account(id) => write!(f, "account {}", id),
            AssignedId::Topic(id) => write!(f, "topic {}", id),
            AssignedId::Token(id) => write!(f, "token {}", id),
        }
    }
}

/// The finalized outcome record for a submitted transaction.
///
/// A receipt is terminal: its transaction id can never be submitted again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub transaction_id: TransactionId,
    pub status: Status,
    pub assigned: Option<AssignedId>,
    /// Serial numbers created by an NFT mint.
    #[serde(default)]
    pub serials: Vec<u64>,
    /// Token total supply after a mint.
    #[serde(default)]
    pub total_supply: Option<u64>,
    /// Sequence number of a submitted topic message.
    #[serde(default)]
    pub topic_sequence_number: Option<u64>,
    pub consensus_timestamp: Timestamp,
}

impl Receipt {
    pub fn account_id(&self) -> Option<AccountId> {
        match self.assigned {
            Some(AssignedId::Account(id)) => Some(id),
            _ => None,
        }
    }

    pub fn topic_id(&self) -> Option<TopicId> {
        match self.assigned {
            Some(AssignedId::Topic(id)) => Some(id),
            _ => None,
        }
    }

    pub fn token_id(&self) -> Option<TokenId> {
        match self.assigned {
            Some(AssignedId::Token(id)) => Some(id),
            _ => None,
        }
    }
}
