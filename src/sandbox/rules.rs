//! Transaction rules of the sandbox ledger.
//!
//! # Responsibilities
//! - Precheck: signatures, payer, fee ceiling, payer balance
//! - Apply each operation kind to a `LedgerState`, or reject it with the
//!   status a real network would report
//!
//! # Design Decisions
//! - Required keys are checked by public key, not by role label
//! - `apply` may leave a half-updated state on error; callers apply to a
//!   copy and keep it only on success

use std::collections::{BTreeMap, BTreeSet};

use crate::keys::PublicKey;
use crate::ledger::amount::Hbar;
use crate::ledger::ids::{AccountId, Timestamp, TokenId, TopicId};
use crate::ledger::receipt::AssignedId;
use crate::ledger::status::Status;
use crate::ledger::types::{CustomFee, SupplyType, TokenType, TopicMessage};
use crate::sandbox::state::{Account, LedgerState, Nft, Token, Topic};
use crate::transaction::fields::{Field, FieldChanges, OperationKind};
use crate::transaction::frozen::SignedTransaction;

/// Largest topic message accepted, in bytes.
pub const MAX_MESSAGE_BYTES: usize = 1024;

type Rule<T> = Result<T, Status>;

/// Public keys whose signatures verified over the body bytes.
#[derive(Debug, Clone, Default)]
pub struct Signers(BTreeSet<PublicKey>);

impl Signers {
    pub fn has(&self, key: &PublicKey) -> bool {
        self.0.contains(key)
    }

    fn require(&self, key: &PublicKey) -> Rule<()> {
        if self.has(key) {
            Ok(())
        } else {
            Err(Status::InvalidSignature)
        }
    }
}

/// What a successful transaction reports in its receipt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Effects {
    pub assigned: Option<AssignedId>,
    pub serials: Vec<u64>,
    pub total_supply: Option<u64>,
    pub topic_sequence_number: Option<u64>,
}

/// Node-side checks before a transaction is accepted for consensus.
pub fn precheck(state: &LedgerState, tx: &SignedTransaction, fee: Hbar) -> Rule<Signers> {
    let frozen = tx.frozen();
    let body = frozen.body_bytes();

    let mut verified = BTreeSet::new();
    for entry in std::iter::once(frozen.payer_signature()).chain(tx.signatures()) {
        if !entry.public_key.verify(body, &entry.signature) {
            return Err(Status::InvalidSignature);
        }
        verified.insert(entry.public_key);
    }
    let signers = Signers(verified);

    let payer = state
        .accounts
        .get(&tx.transaction_id().payer)
        .ok_or(Status::PayerAccountNotFound)?;
    signers.require(&payer.key)?;

    if fee > frozen.body().max_transaction_fee {
        return Err(Status::InsufficientTxFee);
    }
    if payer.balance < fee {
        return Err(Status::InsufficientPayerBalance);
    }
    Ok(signers)
}

/// Apply a prechecked transaction whose fee has already been charged.
pub fn apply(
    state: &mut LedgerState,
    tx: &SignedTransaction,
    signers: &Signers,
    consensus: Timestamp,
) -> Rule<Effects> {
    let fields = tx.frozen().fields();
    let payer = tx.transaction_id().payer;
    match tx.kind() {
        OperationKind::AccountCreate => account_create(state, fields, payer),
        OperationKind::TopicCreate => topic_create(state, fields, signers),
        OperationKind::TopicUpdate => topic_update(state, fields, signers),
        OperationKind::TopicMessageSubmit => topic_message_submit(state, fields, signers, consensus),
        OperationKind::TokenCreate => token_create(state, fields, signers),
        OperationKind::TokenMint => token_mint(state, fields, signers),
        OperationKind::TokenAssociate => token_associate(state, fields, signers),
        OperationKind::TokenFeeScheduleUpdate => token_fee_schedule_update(state, fields, signers),
        OperationKind::Transfer => transfer(state, fields, signers),
    }
}

fn account<'a>(state: &'a LedgerState, id: &AccountId) -> Rule<&'a Account> {
    state.accounts.get(id).ok_or(Status::InvalidAccountId)
}

fn account_mut<'a>(state: &'a mut LedgerState, id: &AccountId) -> Rule<&'a mut Account> {
    state.accounts.get_mut(id).ok_or(Status::InvalidAccountId)
}

fn topic_mut<'a>(state: &'a mut LedgerState, id: Option<TopicId>) -> Rule<&'a mut Topic> {
    id.and_then(|id| state.topics.get_mut(&id)).ok_or(Status::InvalidTopicId)
}

fn token<'a>(state: &'a LedgerState, id: Option<TokenId>) -> Rule<&'a Token> {
    id.and_then(|id| state.tokens.get(&id)).ok_or(Status::InvalidTokenId)
}

fn token_mut<'a>(state: &'a mut LedgerState, id: Option<TokenId>) -> Rule<&'a mut Token> {
    id.and_then(|id| state.tokens.get_mut(&id)).ok_or(Status::InvalidTokenId)
}

fn credit(state: &mut LedgerState, id: &AccountId, amount: Hbar) -> Rule<()> {
    let account = account_mut(state, id)?;
    let balance = account.balance.checked_add(amount).ok_or(Status::InvalidAccountAmounts)?;
    if balance.is_negative() {
        return Err(Status::InsufficientAccountBalance);
    }
    account.balance = balance;
    Ok(())
}

fn account_create(state: &mut LedgerState, fields: &FieldChanges, payer: AccountId) -> Rule<Effects> {
    let key = fields.key(Field::Key).ok_or(Status::InvalidTransactionBody)?;
    let initial = fields.hbar(Field::InitialBalance).unwrap_or(Hbar::ZERO);
    if initial.is_negative() {
        return Err(Status::InvalidAccountAmounts);
    }
    credit(state, &payer, -initial).map_err(|_| Status::InsufficientPayerBalance)?;

    let id = AccountId::new(0, 0, state.next_entity_num());
    state.insert_account(id, key, initial);
    if let Some(memo) = fields.text(Field::Memo) {
        account_mut(state, &id)?.memo = memo.to_string();
    }
    Ok(Effects {
        assigned: Some(AssignedId::Account(id)),
        ..Default::default()
    })
}

fn topic_create(state: &mut LedgerState, fields: &FieldChanges, signers: &Signers) -> Rule<Effects> {
    let admin_key = fields.key(Field::AdminKey);
    if let Some(key) = &admin_key {
        signers.require(key)?;
    }
    let id = TopicId::new(0, 0, state.next_entity_num());
    state.topics.insert(
        id,
        Topic {
            id,
            memo: fields.text(Field::Memo).unwrap_or_default().to_string(),
            admin_key,
            submit_key: fields.key(Field::SubmitKey),
            sequence_number: 0,
            messages: Vec::new(),
        },
    );
    Ok(Effects {
        assigned: Some(AssignedId::Topic(id)),
        ..Default::default()
    })
}

fn topic_update(state: &mut LedgerState, fields: &FieldChanges, signers: &Signers) -> Rule<Effects> {
    let topic = topic_mut(state, fields.topic(Field::TopicId))?;
    let admin_key = topic.admin_key.ok_or(Status::Unauthorized)?;
    signers.require(&admin_key)?;
    if let Some(new_admin) = fields.key(Field::AdminKey) {
        signers.require(&new_admin)?;
        topic.admin_key = Some(new_admin);
    }
    if let Some(submit_key) = fields.key(Field::SubmitKey) {
        topic.submit_key = Some(submit_key);
    }
    if let Some(memo) = fields.text(Field::Memo) {
        topic.memo = memo.to_string();
    }
    Ok(Effects::default())
}

fn topic_message_submit(
    state: &mut LedgerState,
    fields: &FieldChanges,
    signers: &Signers,
    consensus: Timestamp,
) -> Rule<Effects> {
    let topic = topic_mut(state, fields.topic(Field::TopicId))?;
    if let Some(submit_key) = &topic.submit_key {
        signers.require(submit_key)?;
    }
    let contents = fields.bytes(Field::Message).ok_or(Status::InvalidTransactionBody)?;
    if contents.len() > MAX_MESSAGE_BYTES {
        return Err(Status::MessageSizeTooBig);
    }
    topic.sequence_number += 1;
    topic.messages.push(TopicMessage {
        topic_id: topic.id,
        sequence_number: topic.sequence_number,
        consensus_timestamp: consensus,
        contents: contents.to_vec(),
    });
    Ok(Effects {
        topic_sequence_number: Some(topic.sequence_number),
        ..Default::default()
    })
}

fn validate_custom_fees(state: &LedgerState, fees: &[CustomFee], token_type: TokenType) -> Rule<()> {
    for fee in fees {
        if !state.accounts.contains_key(&fee.collector()) {
            return Err(Status::InvalidCustomFeeCollector);
        }
        match fee {
            CustomFee::Fixed { amount, .. } if amount.is_negative() => return Err(Status::InvalidAccountAmounts),
            CustomFee::Fixed { .. } => {}
            CustomFee::Royalty {
                numerator,
                denominator,
                ..
            } => {
                if token_type != TokenType::NonFungibleUnique {
                    return Err(Status::CustomRoyaltyFeeOnlyAllowedForNonFungibleUnique);
                }
                if *denominator == 0 {
                    return Err(Status::FractionDividesByZero);
                }
                if numerator > denominator {
                    return Err(Status::RoyaltyFractionCannotExceedOne);
                }
            }
        }
    }
    Ok(())
}

fn token_create(state: &mut LedgerState, fields: &FieldChanges, signers: &Signers) -> Rule<Effects> {
    let treasury_id = fields.account(Field::Treasury).ok_or(Status::InvalidTransactionBody)?;
    let treasury = account(state, &treasury_id)?;
    signers.require(&treasury.key)?;
    let admin_key = fields.key(Field::AdminKey);
    if let Some(key) = &admin_key {
        signers.require(key)?;
    }

    let token_type = fields.token_type().unwrap_or_default();
    let supply_type = fields.supply_type().unwrap_or_default();
    let initial_supply = fields.number(Field::InitialSupply).unwrap_or(0);
    let max_supply = fields.number(Field::MaxSupply).unwrap_or(0);

    if token_type == TokenType::NonFungibleUnique && initial_supply != 0 {
        return Err(Status::InvalidTokenInitialSupply);
    }
    match supply_type {
        SupplyType::Finite if max_supply == 0 => return Err(Status::InvalidTokenMaxSupply),
        SupplyType::Finite if initial_supply > max_supply => return Err(Status::InvalidTokenInitialSupply),
        SupplyType::Infinite if max_supply != 0 => return Err(Status::InvalidTokenMaxSupply),
        _ => {}
    }
    let custom_fees = fields.custom_fees().unwrap_or_default().to_vec();
    validate_custom_fees(state, &custom_fees, token_type)?;

    let id = TokenId::new(0, 0, state.next_entity_num());
    state.tokens.insert(
        id,
        Token {
            id,
            name: fields.text(Field::TokenName).unwrap_or_default().to_string(),
            symbol: fields.text(Field::TokenSymbol).unwrap_or_default().to_string(),
            memo: fields.text(Field::TokenMemo).unwrap_or_default().to_string(),
            token_type,
            supply_type,
            max_supply,
            total_supply: initial_supply,
            decimals: fields.number(Field::Decimals).unwrap_or(0),
            treasury: treasury_id,
            admin_key,
            supply_key: fields.key(Field::SupplyKey),
            fee_schedule_key: fields.key(Field::FeeScheduleKey),
            custom_fees,
            nfts: BTreeMap::new(),
            next_serial: 1,
        },
    );
    account_mut(state, &treasury_id)?.tokens.insert(id, initial_supply);

    Ok(Effects {
        assigned: Some(AssignedId::Token(id)),
        total_supply: Some(initial_supply),
        ..Default::default()
    })
}

fn token_mint(state: &mut LedgerState, fields: &FieldChanges, signers: &Signers) -> Rule<Effects> {
    let token = token_mut(state, fields.token(Field::TokenId))?;
    let supply_key = token.supply_key.ok_or(Status::TokenHasNoSupplyKey)?;
    signers.require(&supply_key)?;

    let minted = match (token.is_nft(), fields.bytes_list(Field::Metadata), fields.number(Field::Amount)) {
        (true, Some(metadata), None) => metadata.len() as u64,
        (false, None, Some(amount)) => amount,
        _ => return Err(Status::InvalidTransactionBody),
    };
    let total = token.total_supply.checked_add(minted).ok_or(Status::TokenMaxSupplyReached)?;
    if token.supply_type == SupplyType::Finite && total > token.max_supply {
        return Err(Status::TokenMaxSupplyReached);
    }

    let treasury = token.treasury;
    let mut serials = Vec::new();
    if let Some(metadata) = fields.bytes_list(Field::Metadata) {
        for item in metadata {
            let serial = token.next_serial;
            token.next_serial += 1;
            token.nfts.insert(
                serial,
                Nft {
                    owner: treasury,
                    metadata: item.clone(),
                },
            );
            serials.push(serial);
        }
    }
    token.total_supply = total;
    let token_id = token.id;

    let held = account_mut(state, &treasury)?
        .tokens
        .get_mut(&token_id)
        .ok_or(Status::TokenNotAssociatedToAccount)?;
    *held += minted;

    Ok(Effects {
        serials,
        total_supply: Some(total),
        ..Default::default()
    })
}

fn token_associate(state: &mut LedgerState, fields: &FieldChanges, signers: &Signers) -> Rule<Effects> {
    let account_id = fields.account(Field::AccountId).ok_or(Status::InvalidTransactionBody)?;
    let token_ids = fields.tokens(Field::TokenIds).unwrap_or_default();
    signers.require(&account(state, &account_id)?.key)?;
    for token_id in token_ids {
        token(state, Some(*token_id))?;
    }

    let account = account_mut(state, &account_id)?;
    for token_id in token_ids {
        if account.tokens.insert(*token_id, 0).is_some() {
            return Err(Status::TokenAlreadyAssociatedToAccount);
        }
    }
    Ok(Effects::default())
}

fn token_fee_schedule_update(state: &mut LedgerState, fields: &FieldChanges, signers: &Signers) -> Rule<Effects> {
    let current = token(state, fields.token(Field::TokenId))?;
    let fee_schedule_key = current.fee_schedule_key.ok_or(Status::TokenHasNoFeeScheduleKey)?;
    signers.require(&fee_schedule_key)?;
    let fees = fields.custom_fees().unwrap_or_default().to_vec();
    validate_custom_fees(state, &fees, current.token_type)?;

    token_mut(state, fields.token(Field::TokenId))?.custom_fees = fees;
    Ok(Effects::default())
}

fn transfer(state: &mut LedgerState, fields: &FieldChanges, signers: &Signers) -> Rule<Effects> {
    let hbar = fields.hbar_transfers();
    let tokens = fields.token_transfers();
    let nfts = fields.nft_transfers();

    let hbar_sum: i128 = hbar.iter().map(|t| t.amount.to_tinybars() as i128).sum();
    if hbar_sum != 0 {
        return Err(Status::InvalidAccountAmounts);
    }
    for leg in hbar {
        let account = account(state, &leg.account_id)?;
        if leg.amount.is_negative() {
            signers.require(&account.key)?;
        }
    }

    let mut token_sums: BTreeMap<TokenId, i128> = BTreeMap::new();
    for leg in tokens {
        if token(state, Some(leg.token_id))?.is_nft() {
            return Err(Status::InvalidTransactionBody);
        }
        let account = account(state, &leg.account_id)?;
        if !account.tokens.contains_key(&leg.token_id) {
            return Err(Status::TokenNotAssociatedToAccount);
        }
        if leg.amount < 0 {
            signers.require(&account.key)?;
        }
        *token_sums.entry(leg.token_id).or_default() += leg.amount as i128;
    }
    if token_sums.values().any(|sum| *sum != 0) {
        return Err(Status::TransfersNotZeroSumForToken);
    }

    for leg in nfts {
        let token = token(state, Some(leg.nft_id.token_id))?;
        if !token.is_nft() {
            return Err(Status::InvalidNftId);
        }
        token.nfts.get(&leg.nft_id.serial).ok_or(Status::InvalidNftId)?;
        signers.require(&account(state, &leg.sender)?.key)?;
        if !account(state, &leg.receiver)?.tokens.contains_key(&leg.nft_id.token_id) {
            return Err(Status::TokenNotAssociatedToAccount);
        }
    }

    for leg in hbar {
        credit(state, &leg.account_id, leg.amount)?;
    }

    for leg in tokens {
        let held = account_mut(state, &leg.account_id)?
            .tokens
            .get_mut(&leg.token_id)
            .ok_or(Status::TokenNotAssociatedToAccount)?;
        let next = *held as i128 + leg.amount as i128;
        if next < 0 {
            return Err(Status::InsufficientTokenBalance);
        }
        *held = next as u64;
    }

    for leg in nfts {
        let token_id = leg.nft_id.token_id;
        let nft = token_mut(state, Some(token_id))?
            .nfts
            .get_mut(&leg.nft_id.serial)
            .ok_or(Status::InvalidNftId)?;
        if nft.owner != leg.sender {
            return Err(Status::SenderDoesNotOwnNftSerialNo);
        }
        nft.owner = leg.receiver;
        move_units(state, &leg.sender, &leg.receiver, token_id, 1)?;
    }

    charge_custom_fees(state, fields)?;
    Ok(Effects::default())
}

fn move_units(state: &mut LedgerState, from: &AccountId, to: &AccountId, token_id: TokenId, units: u64) -> Rule<()> {
    let held = account_mut(state, from)?
        .tokens
        .get_mut(&token_id)
        .ok_or(Status::TokenNotAssociatedToAccount)?;
    *held = held.checked_sub(units).ok_or(Status::InsufficientTokenBalance)?;
    *account_mut(state, to)?
        .tokens
        .get_mut(&token_id)
        .ok_or(Status::TokenNotAssociatedToAccount)? += units;
    Ok(())
}

/// Fixed fees are paid by each sender of a token. Royalty fees take a share
/// of the hbar an NFT sender receives in the same transfer. Collectors never
/// pay their own fees.
fn charge_custom_fees(state: &mut LedgerState, fields: &FieldChanges) -> Rule<()> {
    let mut senders: BTreeSet<(AccountId, TokenId, bool)> = BTreeSet::new();
    for leg in fields.token_transfers().iter().filter(|l| l.amount < 0) {
        senders.insert((leg.account_id, leg.token_id, false));
    }
    for leg in fields.nft_transfers() {
        senders.insert((leg.sender, leg.nft_id.token_id, true));
    }

    for (sender, token_id, is_nft) in senders {
        let fees = token(state, Some(token_id))?.custom_fees.clone();
        let received: i128 = fields
            .hbar_transfers()
            .iter()
            .filter(|l| l.account_id == sender && !l.amount.is_negative())
            .map(|l| l.amount.to_tinybars() as i128)
            .sum();

        for fee in fees {
            let collector = fee.collector();
            if collector == sender {
                continue;
            }
            let amount = match fee {
                CustomFee::Fixed { amount, .. } => amount,
                CustomFee::Royalty {
                    numerator,
                    denominator,
                    ..
                } if is_nft && received > 0 => {
                    Hbar::from_tinybars((received * numerator as i128 / denominator as i128) as i64)
                }
                CustomFee::Royalty { .. } => continue,
            };
            if amount == Hbar::ZERO {
                continue;
            }
            credit(state, &sender, -amount)?;
            credit(state, &collector, amount)?;
            tracing::debug!(
                sender = %sender,
                collector = %collector,
                token_id = %token_id,
                amount = %amount,
                "Custom fee charged"
            );
        }
    }
    Ok(())
}
