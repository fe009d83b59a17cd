//! Token, fee, transfer and message value types.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ledger::amount::Hbar;
use crate::ledger::ids::{AccountId, NftId, Timestamp, TokenId, TopicId};

/// Fungible tokens or unique (NFT) collections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    #[default]
    FungibleCommon,
    NonFungibleUnique,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupplyType {
    #[default]
    Infinite,
    Finite,
}

/// A custom fee attached to a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CustomFee {
    /// A flat hbar fee charged per transfer of the token.
    Fixed { amount: Hbar, collector: AccountId },
    /// A fraction of the fungible value exchanged for an NFT.
    Royalty {
        numerator: u64,
        denominator: u64,
        collector: AccountId,
    },
}

impl CustomFee {
    /// Royalty fee of `numerator / denominator`.
    pub fn royalty(numerator: u64, denominator: u64, collector: AccountId) -> Self {
        CustomFee::Royalty {
            numerator,
            denominator,
            collector,
        }
    }

    pub fn collector(&self) -> AccountId {
        match self {
            CustomFee::Fixed { collector, .. } | CustomFee::Royalty { collector, .. } => *collector,
        }
    }
}

impl fmt::Display for CustomFee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CustomFee::Fixed { amount, collector } => {
                write!(f, "fixed {} to {}", amount, collector)
            }
            CustomFee::Royalty {
                numerator,
                denominator,
                collector,
            } => write!(f, "royalty {}/{} to {}", numerator, denominator, collector),
        }
    }
}

/// One leg of an hbar transfer. Negative amounts debit the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HbarTransfer {
    pub account_id: AccountId,
    pub amount: Hbar,
}

/// One leg of a fungible token transfer. Negative amounts debit the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenTransfer {
    pub token_id: TokenId,
    pub account_id: AccountId,
    pub amount: i64,
}

/// Movement of a single NFT between two accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftTransfer {
    pub nft_id: NftId,
    pub sender: AccountId,
    pub receiver: AccountId,
}

impl NftTransfer {
    pub fn new(token_id: TokenId, serial: u64, sender: AccountId, receiver: AccountId) -> Self {
        Self {
            nft_id: NftId::new(token_id, serial),
            sender,
            receiver,
        }
    }
}

/// A message delivered on a topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicMessage {
    pub topic_id: TopicId,
    pub sequence_number: u64,
    pub consensus_timestamp: Timestamp,
    pub contents: Vec<u8>,
}

impl TopicMessage {
    /// Contents decoded as UTF-8, lossy.
    pub fn contents_lossy(&self) -> String {
        String::from_utf8_lossy(&self.contents).into_owned()
    }
}
