//! Mirror node REST payloads and their conversion to domain types.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::keys::PublicKey;
use crate::ledger::amount::Hbar;
use crate::ledger::error::{LedgerError, LedgerResult};
use crate::ledger::ids::{AccountId, NftId, Timestamp, TokenId, TopicId};
use crate::ledger::network::{AccountBalance, NftInfo, TokenInfo, TopicInfo};
use crate::ledger::types::{CustomFee, SupplyType, TokenType, TopicMessage};

/// Mirror nodes render some integers as strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Numeric {
    Number(u64),
    Text(String),
}

impl Numeric {
    fn value(&self, what: &str) -> LedgerResult<u64> {
        match self {
            Numeric::Number(n) => Ok(*n),
            Numeric::Text(s) => s
                .parse()
                .map_err(|_| LedgerError::Query(format!("{} is not a number: '{}'", what, s))),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WireKey {
    #[serde(rename = "_type")]
    pub key_type: String,
    pub key: String,
}

impl WireKey {
    /// Ed25519 keys convert directly. Other key types are reported as absent.
    fn to_public_key(&self) -> Option<PublicKey> {
        if self.key_type != "ED25519" {
            tracing::debug!(key_type = %self.key_type, "Skipping unsupported mirror key type");
            return None;
        }
        self.key.parse().ok()
    }
}

fn key(wire: &Option<WireKey>) -> Option<PublicKey> {
    wire.as_ref().and_then(WireKey::to_public_key)
}

fn decode_base64(what: &str, encoded: &str) -> LedgerResult<Vec<u8>> {
    BASE64
        .decode(encoded)
        .map_err(|e| LedgerError::Query(format!("{} is not valid base64: {}", what, e)))
}

#[derive(Debug, Deserialize)]
pub struct Links {
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WireTokenBalance {
    pub token_id: TokenId,
    pub balance: u64,
}

#[derive(Debug, Deserialize)]
pub struct WireBalance {
    pub account: AccountId,
    pub balance: i64,
    #[serde(default)]
    pub tokens: Vec<WireTokenBalance>,
}

#[derive(Debug, Deserialize)]
pub struct BalancesPage {
    pub balances: Vec<WireBalance>,
}

impl BalancesPage {
    pub fn into_balance(self, account_id: AccountId) -> Option<AccountBalance> {
        self.balances
            .into_iter()
            .find(|b| b.account == account_id)
            .map(|b| AccountBalance {
                account_id: b.account,
                hbars: Hbar::from_tinybars(b.balance),
                tokens: b.tokens.into_iter().map(|t| (t.token_id, t.balance)).collect::<BTreeMap<_, _>>(),
            })
    }
}

#[derive(Debug, Deserialize)]
pub struct WireTopic {
    pub topic_id: TopicId,
    #[serde(default)]
    pub memo: String,
    pub admin_key: Option<WireKey>,
    pub submit_key: Option<WireKey>,
}

impl WireTopic {
    pub fn into_info(self, sequence_number: u64) -> TopicInfo {
        TopicInfo {
            topic_id: self.topic_id,
            memo: self.memo,
            sequence_number,
            admin_key: key(&self.admin_key),
            submit_key: key(&self.submit_key),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WireMessage {
    pub topic_id: TopicId,
    pub sequence_number: u64,
    pub consensus_timestamp: Timestamp,
    pub message: String,
}

impl WireMessage {
    pub fn into_message(self) -> LedgerResult<TopicMessage> {
        Ok(TopicMessage {
            contents: decode_base64("message", &self.message)?,
            topic_id: self.topic_id,
            sequence_number: self.sequence_number,
            consensus_timestamp: self.consensus_timestamp,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct MessagesPage {
    pub messages: Vec<WireMessage>,
    pub links: Option<Links>,
}

#[derive(Debug, Deserialize)]
pub struct WireFraction {
    pub numerator: u64,
    pub denominator: u64,
}

#[derive(Debug, Deserialize)]
pub struct WireFixedFee {
    pub amount: i64,
    pub collector_account_id: AccountId,
    pub denominating_token_id: Option<TokenId>,
}

#[derive(Debug, Deserialize)]
pub struct WireRoyaltyFee {
    pub amount: WireFraction,
    pub collector_account_id: AccountId,
}

#[derive(Debug, Default, Deserialize)]
pub struct WireCustomFees {
    #[serde(default)]
    pub fixed_fees: Vec<WireFixedFee>,
    #[serde(default)]
    pub royalty_fees: Vec<WireRoyaltyFee>,
}

impl WireCustomFees {
    /// Fixed fees denominated in another token have no domain counterpart
    /// and are left out.
    fn into_fees(self) -> Vec<CustomFee> {
        let fixed = self
            .fixed_fees
            .into_iter()
            .filter(|f| f.denominating_token_id.is_none())
            .map(|f| CustomFee::Fixed {
                amount: Hbar::from_tinybars(f.amount),
                collector: f.collector_account_id,
            });
        let royalty = self
            .royalty_fees
            .into_iter()
            .map(|f| CustomFee::royalty(f.amount.numerator, f.amount.denominator, f.collector_account_id));
        fixed.chain(royalty).collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct WireToken {
    pub token_id: TokenId,
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub memo: String,
    #[serde(rename = "type")]
    pub token_type: String,
    pub supply_type: String,
    pub total_supply: Numeric,
    pub max_supply: Numeric,
    pub treasury_account_id: AccountId,
    pub admin_key: Option<WireKey>,
    pub supply_key: Option<WireKey>,
    pub fee_schedule_key: Option<WireKey>,
    #[serde(default)]
    pub custom_fees: WireCustomFees,
}

impl WireToken {
    pub fn into_info(self) -> LedgerResult<TokenInfo> {
        let token_type = match self.token_type.as_str() {
            "FUNGIBLE_COMMON" => TokenType::FungibleCommon,
            "NON_FUNGIBLE_UNIQUE" => TokenType::NonFungibleUnique,
            other => return Err(LedgerError::Query(format!("unknown token type '{}'", other))),
        };
        let supply_type = match self.supply_type.as_str() {
            "INFINITE" => SupplyType::Infinite,
            "FINITE" => SupplyType::Finite,
            other => return Err(LedgerError::Query(format!("unknown supply type '{}'", other))),
        };
        Ok(TokenInfo {
            token_id: self.token_id,
            name: self.name,
            symbol: self.symbol,
            memo: self.memo,
            token_type,
            supply_type,
            total_supply: self.total_supply.value("total_supply")?,
            max_supply: self.max_supply.value("max_supply")?,
            treasury: self.treasury_account_id,
            admin_key: key(&self.admin_key),
            supply_key: key(&self.supply_key),
            fee_schedule_key: key(&self.fee_schedule_key),
            custom_fees: self.custom_fees.into_fees(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct WireNft {
    pub token_id: TokenId,
    pub serial_number: u64,
    pub account_id: AccountId,
    #[serde(default)]
    pub metadata: String,
}

impl WireNft {
    pub fn into_info(self) -> LedgerResult<NftInfo> {
        Ok(NftInfo {
            nft_id: NftId::new(self.token_id, self.serial_number),
            owner: self.account_id,
            metadata: decode_base64("metadata", &self.metadata)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_payload() {
        let json = r#"{
            "token_id": "0.0.1003",
            "name": "MyNFT",
            "symbol": "MNFT",
            "memo": "",
            "type": "NON_FUNGIBLE_UNIQUE",
            "supply_type": "FINITE",
            "total_supply": "2",
            "max_supply": "5",
            "decimals": "0",
            "treasury_account_id": "0.0.2",
            "admin_key": null,
            "supply_key": {"_type": "ProtobufEncoded", "key": "0a"},
            "fee_schedule_key": null,
            "custom_fees": {
                "created_timestamp": "1700000000.000000001",
                "fixed_fees": [
                    {"amount": 10, "collector_account_id": "0.0.2", "denominating_token_id": "0.0.9"}
                ],
                "royalty_fees": [
                    {"amount": {"numerator": 1, "denominator": 20}, "collector_account_id": "0.0.2"}
                ]
            }
        }"#;
        let info = serde_json::from_str::<WireToken>(json).unwrap().into_info().unwrap();
        assert_eq!(info.token_type, TokenType::NonFungibleUnique);
        assert_eq!(info.total_supply, 2);
        assert_eq!(info.max_supply, 5);
        assert!(info.supply_key.is_none());
        assert_eq!(info.custom_fees, vec![CustomFee::royalty(1, 20, AccountId::new(0, 0, 2))]);
    }

    #[test]
    fn test_message_payload() {
        let json = r#"{
            "messages": [{
                "consensus_timestamp": "1700000000.000000042",
                "message": "SGVsbG8=",
                "running_hash": "ignored",
                "sequence_number": 1,
                "topic_id": "0.0.1001"
            }],
            "links": {"next": null}
        }"#;
        let page: MessagesPage = serde_json::from_str(json).unwrap();
        let message = page.messages.into_iter().next().unwrap().into_message().unwrap();
        assert_eq!(message.contents, b"Hello");
        assert_eq!(message.consensus_timestamp, Timestamp::new(1_700_000_000, 42));
    }

    #[test]
    fn test_balance_payload() {
        let json = r#"{
            "timestamp": "1700000000.000000000",
            "balances": [{"account": "0.0.1001", "balance": 1000000000, "tokens": [{"token_id": "0.0.1003", "balance": 1}]}]
        }"#;
        let page: BalancesPage = serde_json::from_str(json).unwrap();
        let balance = page.into_balance(AccountId::new(0, 0, 1001)).unwrap();
        assert_eq!(balance.hbars, Hbar::new(10));
        assert_eq!(balance.tokens[&TokenId::new(0, 0, 1003)], 1);
    }

    #[test]
    fn test_bad_base64_is_a_query_error() {
        let nft = WireNft {
            token_id: TokenId::new(0, 0, 1),
            serial_number: 1,
            account_id: AccountId::new(0, 0, 2),
            metadata: "***".to_string(),
        };
        assert!(matches!(nft.into_info(), Err(LedgerError::Query(_))));
    }
}
