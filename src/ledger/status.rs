//! Ledger response codes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status reported by the network in a precheck response or a receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Success,
    /// Not yet final. Never a terminal status.
    Unknown,
    DuplicateTransaction,
    PayerAccountNotFound,
    InsufficientPayerBalance,
    InsufficientTxFee,
    InvalidSignature,
    InvalidAccountId,
    InvalidTopicId,
    InvalidTokenId,
    InvalidNftId,
    Unauthorized,
    MessageSizeTooBig,
    InsufficientAccountBalance,
    InvalidAccountAmounts,
    TransfersNotZeroSumForToken,
    InsufficientTokenBalance,
    TokenNotAssociatedToAccount,
    TokenAlreadyAssociatedToAccount,
    TokenHasNoSupplyKey,
    TokenHasNoFeeScheduleKey,
    TokenMaxSupplyReached,
    SenderDoesNotOwnNftSerialNo,
    InvalidTokenMaxSupply,
    InvalidTokenInitialSupply,
    InvalidCustomFeeCollector,
    FractionDividesByZero,
    RoyaltyFractionCannotExceedOne,
    CustomRoyaltyFeeOnlyAllowedForNonFungibleUnique,
    InvalidTransactionBody,
}

impl Status {
    pub fn is_success(self) -> bool {
        self == Status::Success
    }

    /// Whether the status is final for a receipt.
    pub fn is_terminal(self) -> bool {
        self != Status::Unknown
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Success => "SUCCESS",
            Status::Unknown => "UNKNOWN",
            Status::DuplicateTransaction => "DUPLICATE_TRANSACTION",
            Status::PayerAccountNotFound => "PAYER_ACCOUNT_NOT_FOUND",
            Status::InsufficientPayerBalance => "INSUFFICIENT_PAYER_BALANCE",
            Status::InsufficientTxFee => "INSUFFICIENT_TX_FEE",
            Status::InvalidSignature => "INVALID_SIGNATURE",
            Status::InvalidAccountId => "INVALID_ACCOUNT_ID",
            Status::InvalidTopicId => "INVALID_TOPIC_ID",
            Status::InvalidTokenId => "INVALID_TOKEN_ID",
            Status::InvalidNftId => "INVALID_NFT_ID",
            Status::Unauthorized => "UNAUTHORIZED",
            Status::MessageSizeTooBig => "MESSAGE_SIZE_TOO_BIG",
            Status::InsufficientAccountBalance => "INSUFFICIENT_ACCOUNT_BALANCE",
            Status::InvalidAccountAmounts => "INVALID_ACCOUNT_AMOUNTS",
            Status::TransfersNotZeroSumForToken => "TRANSFERS_NOT_ZERO_SUM_FOR_TOKEN",
            Status::InsufficientTokenBalance => "INSUFFICIENT_TOKEN_BALANCE",
            Status::TokenNotAssociatedToAccount => "TOKEN_NOT_ASSOCIATED_TO_ACCOUNT",
            Status::TokenAlreadyAssociatedToAccount => "TOKEN_ALREADY_ASSOCIATED_TO_ACCOUNT",
            Status::TokenHasNoSupplyKey => "TOKEN_HAS_NO_SUPPLY_KEY",
            Status::TokenHasNoFeeScheduleKey => "TOKEN_HAS_NO_FEE_SCHEDULE_KEY",
            Status::TokenMaxSupplyReached => "TOKEN_MAX_SUPPLY_REACHED",
            Status::SenderDoesNotOwnNftSerialNo => "SENDER_DOES_NOT_OWN_NFT_SERIAL_NO",
            Status::InvalidTokenMaxSupply => "INVALID_TOKEN_MAX_SUPPLY",
            Status::InvalidTokenInitialSupply => "INVALID_TOKEN_INITIAL_SUPPLY",
            Status::InvalidCustomFeeCollector => "INVALID_CUSTOM_FEE_COLLECTOR",
            Status::FractionDividesByZero => "FRACTION_DIVIDES_BY_ZERO",
            Status::RoyaltyFractionCannotExceedOne => "ROYALTY_FRACTION_CANNOT_EXCEED_ONE",
            Status::CustomRoyaltyFeeOnlyAllowedForNonFungibleUnique => {
                "CUSTOM_ROYALTY_FEE_ONLY_ALLOWED_FOR_NON_FUNGIBLE_UNIQUE"
            }
            Status::InvalidTransactionBody => "INVALID_TRANSACTION_BODY",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
