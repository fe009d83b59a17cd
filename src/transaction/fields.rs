//! Operation kinds, fields and their values.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::keys::PublicKey;
use crate::ledger::amount::Hbar;
use crate::ledger::ids::{AccountId, TokenId, TopicId};
use crate::ledger::types::{CustomFee, HbarTransfer, NftTransfer, SupplyType, TokenTransfer, TokenType};

/// The kind of resource an operation mutates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Topic,
    Token,
    Account,
    Transfer,
}

/// Every mutation this crate knows how to describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    TopicCreate,
    TopicUpdate,
    TopicMessageSubmit,
    AccountCreate,
    TokenCreate,
    TokenMint,
    TokenAssociate,
    TokenFeeScheduleUpdate,
    Transfer,
}

impl OperationKind {
    pub fn resource(self) -> ResourceKind {
        match self {
            OperationKind::TopicCreate
            | OperationKind::TopicUpdate
            | OperationKind::TopicMessageSubmit => ResourceKind::Topic,
            OperationKind::AccountCreate => ResourceKind::Account,
            OperationKind::TokenCreate
            | OperationKind::TokenMint
            | OperationKind::TokenAssociate
            | OperationKind::TokenFeeScheduleUpdate => ResourceKind::Token,
            OperationKind::Transfer => ResourceKind::Transfer,
        }
    }

    /// Fields that must be present for the kind.
    pub fn mandatory_fields(self) -> &'static [Field] {
        match self {
            OperationKind::TopicCreate => &[],
            OperationKind::TopicUpdate => &[Field::TopicId],
            OperationKind::TopicMessageSubmit => &[Field::TopicId, Field::Message],
            OperationKind::AccountCreate => &[Field::Key],
            OperationKind::TokenCreate => &[Field::TokenName, Field::TokenSymbol, Field::Treasury],
            OperationKind::TokenMint => &[Field::TokenId],
            OperationKind::TokenAssociate => &[Field::AccountId, Field::TokenIds],
            OperationKind::TokenFeeScheduleUpdate => &[Field::TokenId, Field::CustomFees],
            OperationKind::Transfer => &[],
        }
    }

    /// Fields that may be present for the kind, besides the mandatory ones
    /// and the common transaction fields.
    pub fn optional_fields(self) -> &'static [Field] {
        match self {
            OperationKind::TopicCreate => &[Field::Memo, Field::AdminKey, Field::SubmitKey],
            OperationKind::TopicUpdate => &[Field::Memo, Field::AdminKey, Field::SubmitKey],
            OperationKind::TopicMessageSubmit => &[],
            OperationKind::AccountCreate => &[Field::InitialBalance, Field::Memo],
            OperationKind::TokenCreate => &[
                Field::TokenMemo,
                Field::TokenType,
                Field::SupplyType,
                Field::MaxSupply,
                Field::InitialSupply,
                Field::Decimals,
                Field::AdminKey,
                Field::SupplyKey,
                Field::FeeScheduleKey,
                Field::CustomFees,
            ],
            OperationKind::TokenMint => &[Field::Metadata, Field::Amount],
            OperationKind::TokenAssociate => &[],
            OperationKind::TokenFeeScheduleUpdate => &[],
            OperationKind::Transfer => &[Field::HbarTransfers, Field::TokenTransfers, Field::NftTransfers],
        }
    }

    pub fn accepts(self, field: Field) -> bool {
        field.is_common()
            || self.mandatory_fields().contains(&field)
            || self.optional_fields().contains(&field)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::TopicCreate => "topic_create",
            OperationKind::TopicUpdate => "topic_update",
            OperationKind::TopicMessageSubmit => "topic_message_submit",
            OperationKind::AccountCreate => "account_create",
            OperationKind::TokenCreate => "token_create",
            OperationKind::TokenMint => "token_mint",
            OperationKind::TokenAssociate => "token_associate",
            OperationKind::TokenFeeScheduleUpdate => "token_fee_schedule_update",
            OperationKind::Transfer => "transfer",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A settable field of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Memo,
    AdminKey,
    SubmitKey,
    TopicId,
    Message,
    Key,
    InitialBalance,
    TokenName,
    TokenSymbol,
    TokenMemo,
    TokenType,
    SupplyType,
    MaxSupply,
    InitialSupply,
    Decimals,
    Treasury,
    SupplyKey,
    FeeScheduleKey,
    CustomFees,
    TokenId,
    Metadata,
    Amount,
    AccountId,
    TokenIds,
    HbarTransfers,
    TokenTransfers,
    NftTransfers,
    MaxTransactionFee,
    TransactionMemo,
}

impl Field {
    /// Fields every operation kind accepts.
    pub fn is_common(self) -> bool {
        matches!(self, Field::MaxTransactionFee | Field::TransactionMemo)
    }

    /// Whether `value` has the type this field expects.
    pub fn accepts(self, value: &FieldValue) -> bool {
        use FieldValue as V;
        match self {
            Field::Memo | Field::TokenName | Field::TokenSymbol | Field::TokenMemo | Field::TransactionMemo => {
                matches!(value, V::Text(_))
            }
            Field::AdminKey | Field::SubmitKey | Field::Key | Field::SupplyKey | Field::FeeScheduleKey => {
                matches!(value, V::Key(_))
            }
            Field::TopicId => matches!(value, V::Topic(_)),
            Field::Message => matches!(value, V::Bytes(_)),
            Field::InitialBalance | Field::MaxTransactionFee => matches!(value, V::Hbar(_)),
            Field::TokenType => matches!(value, V::TokenType(_)),
            Field::SupplyType => matches!(value, V::SupplyType(_)),
            Field::MaxSupply | Field::InitialSupply | Field::Decimals | Field::Amount => {
                matches!(value, V::Number(_))
            }
            Field::Treasury | Field::AccountId => matches!(value, V::Account(_)),
            Field::CustomFees => matches!(value, V::CustomFees(_)),
            Field::TokenId => matches!(value, V::Token(_)),
            Field::Metadata => matches!(value, V::BytesList(_)),
            Field::TokenIds => matches!(value, V::Tokens(_)),
            Field::HbarTransfers => matches!(value, V::HbarTransfers(_)),
            Field::TokenTransfers => matches!(value, V::TokenTransfers(_)),
            Field::NftTransfers => matches!(value, V::NftTransfers(_)),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // serde names double as display names
        let name = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(str::to_owned))
            .unwrap_or_else(|| format!("{:?}", self));
        f.write_str(&name)
    }
}

/// A typed field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Bytes(Vec<u8>),
    BytesList(Vec<Vec<u8>>),
    Number(u64),
    Hbar(Hbar),
    Key(PublicKey),
    Account(AccountId),
    Topic(TopicId),
    Token(TokenId),
    Tokens(Vec<TokenId>),
    TokenType(TokenType),
    SupplyType(SupplyType),
    CustomFees(Vec<CustomFee>),
    HbarTransfers(Vec<HbarTransfer>),
    TokenTransfers(Vec<TokenTransfer>),
    NftTransfers(Vec<NftTransfer>),
}

impl FieldValue {
    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        FieldValue::Bytes(bytes.into())
    }
}

macro_rules! field_value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for FieldValue {
                fn from(v: $ty) -> Self {
                    FieldValue::$variant(v.into())
                }
            }
        )*
    };
}

field_value_from!(
    String => Text,
    &str => Text,
    u64 => Number,
    Hbar => Hbar,
    PublicKey => Key,
    AccountId => Account,
    TopicId => Topic,
    TokenId => Token,
    Vec<TokenId> => Tokens,
    Vec<Vec<u8>> => BytesList,
    TokenType => TokenType,
    SupplyType => SupplyType,
    Vec<CustomFee> => CustomFees,
    Vec<HbarTransfer> => HbarTransfers,
    Vec<TokenTransfer> => TokenTransfers,
    Vec<NftTransfer> => NftTransfers,
);

/// Ordered mapping of field to value. Setting an existing field replaces its
/// value in place, keeping the original position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldChanges(Vec<(Field, FieldValue)>);

impl FieldChanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, field: Field, value: impl Into<FieldValue>) {
        let value = value.into();
        match self.0.iter_mut().find(|(f, _)| *f == field) {
            Some(slot) => slot.1 = value,
            None => self.0.push((field, value)),
        }
    }

    pub fn with(mut self, field: Field, value: impl Into<FieldValue>) -> Self {
        self.set(field, value);
        self
    }

    pub fn get(&self, field: Field) -> Option<&FieldValue> {
        self.0.iter().find(|(f, _)| *f == field).map(|(_, v)| v)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.get(field).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Field, FieldValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn text(&self, field: Field) -> Option<&str> {
        match self.get(field) {
            Some(FieldValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn bytes(&self, field: Field) -> Option<&[u8]> {
        match self.get(field) {
            Some(FieldValue::Bytes(b)) => Some(b),
            _ => None,
        }
    }

    pub fn bytes_list(&self, field: Field) -> Option<&[Vec<u8>]> {
        match self.get(field) {
            Some(FieldValue::BytesList(b)) => Some(b),
            _ => None,
        }
    }

    pub fn number(&self, field: Field) -> Option<u64> {
        match self.get(field) {
            Some(FieldValue::Number(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn hbar(&self, field: Field) -> Option<Hbar> {
        match self.get(field) {
            Some(FieldValue::Hbar(h)) => Some(*h),
            _ => None,
        }
    }

    pub fn key(&self, field: Field) -> Option<PublicKey> {
        match self.get(field) {
            Some(FieldValue::Key(k)) => Some(*k),
            _ => None,
        }
    }

    pub fn account(&self, field: Field) -> Option<AccountId> {
        match self.get(field) {
            Some(FieldValue::Account(a)) => Some(*a),
            _ => None,
        }
    }

    pub fn topic(&self, field: Field) -> Option<TopicId> {
        match self.get(field) {
            Some(FieldValue::Topic(t)) => Some(*t),
            _ => None,
        }
    }

    pub fn token(&self, field: Field) -> Option<TokenId> {
        match self.get(field) {
            Some(FieldValue::Token(t)) => Some(*t),
            _ => None,
        }
    }

    pub fn tokens(&self, field: Field) -> Option<&[TokenId]> {
        match self.get(field) {
            Some(FieldValue::Tokens(t)) => Some(t),
            _ => None,
        }
    }

    pub fn token_type(&self) -> Option<TokenType> {
        match self.get(Field::TokenType) {
            Some(FieldValue::TokenType(t)) => Some(*t),
            _ => None,
        }
    }

    pub fn supply_type(&self) -> Option<SupplyType> {
        match self.get(Field::SupplyType) {
            Some(FieldValue::SupplyType(t)) => Some(*t),
            _ => None,
        }
    }

    pub fn custom_fees(&self) -> Option<&[CustomFee]> {
        match self.get(Field::CustomFees) {
            Some(FieldValue::CustomFees(f)) => Some(f),
            _ => None,
        }
    }

    pub fn hbar_transfers(&self) -> &[HbarTransfer] {
        match self.get(Field::HbarTransfers) {
            Some(FieldValue::HbarTransfers(t)) => t,
            _ => &[],
        }
    }

    pub fn token_transfers(&self) -> &[TokenTransfer] {
        match self.get(Field::TokenTransfers) {
            Some(FieldValue::TokenTransfers(t)) => t,
            _ => &[],
        }
    }

    pub fn nft_transfers(&self) -> &[NftTransfer] {
        match self.get(Field::NftTransfers) {
            Some(FieldValue::NftTransfers(t)) => t,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_replaces_in_place() {
        let mut fields = FieldChanges::new()
            .with(Field::Memo, "first")
            .with(Field::TopicId, TopicId::new(0, 0, 5));
        fields.set(Field::Memo, "second");

        let order: Vec<Field> = fields.iter().map(|(f, _)| *f).collect();
        assert_eq!(order, vec![Field::Memo, Field::TopicId]);
        assert_eq!(fields.text(Field::Memo), Some("second"));
    }

    #[test]
    fn test_field_type_checks() {
        assert!(Field::TokenName.accepts(&FieldValue::from("MyNFT")));
        assert!(!Field::TokenName.accepts(&FieldValue::from(5u64)));
        assert!(Field::Message.accepts(&FieldValue::bytes("hi")));
    }

    #[test]
    fn test_kind_field_applicability() {
        assert!(OperationKind::TopicCreate.accepts(Field::SubmitKey));
        assert!(OperationKind::TopicCreate.accepts(Field::MaxTransactionFee));
        assert!(!OperationKind::TopicCreate.accepts(Field::TokenName));
        assert_eq!(OperationKind::TokenMint.resource(), ResourceKind::Token);
    }

    #[test]
    fn test_field_display_uses_snake_case() {
        assert_eq!(Field::FeeScheduleKey.to_string(), "fee_schedule_key");
    }
}
