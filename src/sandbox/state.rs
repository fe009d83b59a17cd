//! Sandbox ledger state.

use std::collections::BTreeMap;

use crate::keys::PublicKey;
use crate::ledger::amount::Hbar;
use crate::ledger::ids::{AccountId, NftId, TokenId, TopicId};
use crate::ledger::network::{AccountBalance, NftInfo, TokenInfo, TopicInfo};
use crate::ledger::types::{CustomFee, SupplyType, TokenType, TopicMessage};

/// First number handed out to created entities.
pub const FIRST_ENTITY_NUM: u64 = 1001;

#[derive(Debug, Clone)]
pub struct Account {
    pub id: AccountId,
    pub key: PublicKey,
    pub balance: Hbar,
    pub memo: String,
    /// Associated tokens with the fungible balance or number of NFTs held.
    pub tokens: BTreeMap<TokenId, u64>,
}

#[derive(Debug, Clone)]
pub struct Topic {
    pub id: TopicId,
    pub memo: String,
    pub admin_key: Option<PublicKey>,
    pub submit_key: Option<PublicKey>,
    pub sequence_number: u64,
    pub messages: Vec<TopicMessage>,
}

#[derive(Debug, Clone)]
pub struct Nft {
    pub owner: AccountId,
    pub metadata: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub id: TokenId,
    pub name: String,
    pub symbol: String,
    pub memo: String,
    pub token_type: TokenType,
    pub supply_type: SupplyType,
    pub max_supply: u64,
    pub total_supply: u64,
    pub decimals: u64,
    pub treasury: AccountId,
    pub admin_key: Option<PublicKey>,
    pub supply_key: Option<PublicKey>,
    pub fee_schedule_key: Option<PublicKey>,
    pub custom_fees: Vec<CustomFee>,
    pub nfts: BTreeMap<u64, Nft>,
    pub next_serial: u64,
}

impl Token {
    pub fn is_nft(&self) -> bool {
        self.token_type == TokenType::NonFungibleUnique
    }
}

/// Everything the sandbox ledger knows. Cloned before each transaction is
/// applied; a failed transaction leaves the original untouched.
#[derive(Debug, Clone)]
pub struct LedgerState {
    pub accounts: BTreeMap<AccountId, Account>,
    pub topics: BTreeMap<TopicId, Topic>,
    pub tokens: BTreeMap<TokenId, Token>,
    next_num: u64,
}

impl Default for LedgerState {
    fn default() -> Self {
        Self {
            accounts: BTreeMap::new(),
            topics: BTreeMap::new(),
            tokens: BTreeMap::new(),
            next_num: FIRST_ENTITY_NUM,
        }
    }
}

impl LedgerState {
    /// Entity numbers are shared by accounts, topics and tokens.
    pub fn next_entity_num(&mut self) -> u64 {
        let num = self.next_num;
        self.next_num += 1;
        num
    }

    pub fn insert_account(&mut self, id: AccountId, key: PublicKey, balance: Hbar) {
        if id.entity().num >= self.next_num {
            self.next_num = id.entity().num + 1;
        }
        self.accounts.insert(
            id,
            Account {
                id,
                key,
                balance,
                memo: String::new(),
                tokens: BTreeMap::new(),
            },
        );
    }

    pub fn account_balance(&self, id: &AccountId) -> Option<AccountBalance> {
        self.accounts.get(id).map(|a| AccountBalance {
            account_id: a.id,
            hbars: a.balance,
            tokens: a.tokens.clone(),
        })
    }

    pub fn topic_info(&self, id: &TopicId) -> Option<TopicInfo> {
        self.topics.get(id).map(|t| TopicInfo {
            topic_id: t.id,
            memo: t.memo.clone(),
            sequence_number: t.sequence_number,
            admin_key: t.admin_key,
            submit_key: t.submit_key,
        })
    }

    pub fn token_info(&self, id: &TokenId) -> Option<TokenInfo> {
        self.tokens.get(id).map(|t| TokenInfo {
            token_id: t.id,
            name: t.name.clone(),
            symbol: t.symbol.clone(),
            memo: t.memo.clone(),
            token_type: t.token_type,
            supply_type: t.supply_type,
            total_supply: t.total_supply,
            max_supply: t.max_supply,
            treasury: t.treasury,
            custom_fees: t.custom_fees.clone(),
            admin_key: t.admin_key,
            supply_key: t.supply_key,
            fee_schedule_key: t.fee_schedule_key,
        })
    }

    pub fn nft_info(&self, id: &NftId) -> Option<NftInfo> {
        self.tokens
            .get(&id.token_id)
            .and_then(|t| t.nfts.get(&id.serial))
            .map(|n| NftInfo {
                nft_id: *id,
                owner: n.owner,
                metadata: n.metadata.clone(),
            })
    }

    /// Sum of every account balance.
    pub fn total_hbar(&self) -> Hbar {
        self.accounts.values().fold(Hbar::ZERO, |sum, a| sum + a.balance)
    }
}
