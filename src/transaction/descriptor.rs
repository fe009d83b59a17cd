//! Operation descriptors: what a mutation changes and who must sign it.
//!
//! # Lifecycle
//! ```text
//! DescriptorBuilder ──build()──▶ OperationDescriptor ──freeze(ctx)──▶ FrozenTransaction
//!                                  (fields mutable)                    (body bytes fixed)
//! ```
//! Once frozen, a descriptor refuses further field changes: signatures cover
//! the frozen body bytes, so any change would invalidate them.

use std::collections::HashSet;

use crate::keys::KeyRole;
use crate::ledger::error::{LedgerError, LedgerResult};
use crate::ledger::ids::{Timestamp, TransactionId};
use crate::ledger::types::SupplyType;
use crate::transaction::context::{ContextFingerprint, ExecutionContext};
use crate::transaction::fields::{Field, FieldChanges, FieldValue, OperationKind};
use crate::transaction::frozen::{FrozenTransaction, TransactionBody};

/// An intended ledger mutation.
#[derive(Debug, Clone)]
pub struct OperationDescriptor {
    kind: OperationKind,
    fields: FieldChanges,
    required_signers: Vec<KeyRole>,
    valid_start: Timestamp,
    frozen: Option<(ContextFingerprint, FrozenTransaction)>,
}

impl OperationDescriptor {
    /// Validate and create a descriptor.
    ///
    /// Fails with a validation error when a mandatory field for `kind` is
    /// missing, a field does not apply to `kind` or has the wrong type, or
    /// the signer list is empty or repeats a role.
    pub fn create(
        kind: OperationKind,
        fields: FieldChanges,
        required_signers: Vec<KeyRole>,
    ) -> LedgerResult<Self> {
        validate(kind, &fields)?;
        validate_signers(kind, &required_signers)?;
        Ok(Self {
            kind,
            fields,
            required_signers,
            valid_start: Timestamp::unique_now(),
            frozen: None,
        })
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn fields(&self) -> &FieldChanges {
        &self.fields
    }

    pub fn required_signers(&self) -> &[KeyRole] {
        &self.required_signers
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.is_some()
    }

    /// Change a field before freezing.
    pub fn set_field(&mut self, field: Field, value: impl Into<FieldValue>) -> LedgerResult<()> {
        if self.frozen.is_some() {
            return Err(LedgerError::State(format!(
                "cannot set {} on a frozen {} transaction",
                field, self.kind
            )));
        }
        let mut candidate = self.fields.clone();
        candidate.set(field, value);
        validate(self.kind, &candidate)?;
        self.fields = candidate;
        Ok(())
    }

    /// Fix the transaction id, node and body bytes against `ctx`.
    ///
    /// Freezing again against the same context returns an identical value.
    /// Freezing against a different context is a state error: build a new
    /// descriptor instead.
    pub fn freeze(&mut self, ctx: &ExecutionContext) -> LedgerResult<FrozenTransaction> {
        let fingerprint = ctx.fingerprint();
        if let Some((bound, frozen)) = &self.frozen {
            if *bound == fingerprint {
                return Ok(frozen.clone());
            }
            return Err(LedgerError::State(format!(
                "{} transaction already frozen against network '{}' as {}",
                self.kind,
                bound.network,
                frozen.transaction_id()
            )));
        }

        let transaction_id = TransactionId::new(ctx.operator_account(), self.valid_start);
        let node_account_id = ctx.node_for(&transaction_id)?;
        let max_transaction_fee = self
            .fields
            .hbar(Field::MaxTransactionFee)
            .unwrap_or_else(|| ctx.max_transaction_fee());

        let body = TransactionBody {
            transaction_id,
            node_account_id,
            max_transaction_fee,
            kind: self.kind,
            fields: self.fields.clone(),
        };
        let frozen = FrozenTransaction::new(body, self.required_signers.clone(), ctx.operator_key())?;

        tracing::debug!(
            transaction_id = %transaction_id,
            kind = %self.kind,
            node = %node_account_id,
            "Transaction frozen"
        );

        self.frozen = Some((fingerprint, frozen.clone()));
        Ok(frozen)
    }
}

/// Fluent assembly of a descriptor. Nothing is validated until `build`.
#[derive(Debug, Clone)]
pub struct DescriptorBuilder {
    kind: OperationKind,
    fields: FieldChanges,
    signers: Vec<KeyRole>,
}

impl DescriptorBuilder {
    pub fn new(kind: OperationKind) -> Self {
        Self {
            kind,
            fields: FieldChanges::new(),
            signers: Vec::new(),
        }
    }

    pub fn set(mut self, field: Field, value: impl Into<FieldValue>) -> Self {
        self.fields.set(field, value);
        self
    }

    /// Set `field` only when `value` is present.
    pub fn set_opt<V: Into<FieldValue>>(self, field: Field, value: Option<V>) -> Self {
        match value {
            Some(v) => self.set(field, v),
            None => self,
        }
    }

    /// Declare the next required signer.
    pub fn signer(mut self, role: KeyRole) -> Self {
        self.signers.push(role);
        self
    }

    pub fn signers(mut self, roles: impl IntoIterator<Item = KeyRole>) -> Self {
        self.signers.extend(roles);
        self
    }

    pub fn build(self) -> LedgerResult<OperationDescriptor> {
        OperationDescriptor::create(self.kind, self.fields, self.signers)
    }
}

impl OperationKind {
    pub fn builder(self) -> DescriptorBuilder {
        DescriptorBuilder::new(self)
    }
}

fn validate(kind: OperationKind, fields: &FieldChanges) -> LedgerResult<()> {
    for (field, value) in fields.iter() {
        if !kind.accepts(*field) {
            return Err(LedgerError::Validation(format!(
                "field {} does not apply to {}",
                field, kind
            )));
        }
        if !field.accepts(value) {
            return Err(LedgerError::Validation(format!(
                "field {} of {} has the wrong value type",
                field, kind
            )));
        }
    }

    for field in kind.mandatory_fields() {
        if !fields.contains(*field) {
            return Err(LedgerError::Validation(format!(
                "{} is missing mandatory field {}",
                kind, field
            )));
        }
    }

    match kind {
        OperationKind::TokenCreate => {
            for field in [Field::TokenName, Field::TokenSymbol] {
                if fields.text(field).map(str::trim).unwrap_or_default().is_empty() {
                    return Err(LedgerError::Validation(format!("{} must not be empty", field)));
                }
            }
            if fields.supply_type() == Some(SupplyType::Finite) && !fields.contains(Field::MaxSupply) {
                return Err(LedgerError::Validation(
                    "finite supply tokens require max_supply".to_string(),
                ));
            }
        }
        OperationKind::TokenMint => {
            match (fields.bytes_list(Field::Metadata), fields.number(Field::Amount)) {
                (Some(metadata), None) if !metadata.is_empty() => {}
                (None, Some(amount)) if amount > 0 => {}
                (Some(_), Some(_)) => {
                    return Err(LedgerError::Validation(
                        "token_mint takes either metadata or amount, not both".to_string(),
                    ))
                }
                _ => {
                    return Err(LedgerError::Validation(
                        "token_mint needs non-empty metadata or a positive amount".to_string(),
                    ))
                }
            }
        }
        OperationKind::TopicMessageSubmit => {
            if fields.bytes(Field::Message).map(<[u8]>::is_empty).unwrap_or(true) {
                return Err(LedgerError::Validation("message must not be empty".to_string()));
            }
        }
        OperationKind::TokenAssociate => {
            if fields.tokens(Field::TokenIds).map(|t| t.is_empty()).unwrap_or(true) {
                return Err(LedgerError::Validation("token_ids must not be empty".to_string()));
            }
        }
        OperationKind::Transfer => {
            if fields.hbar_transfers().is_empty()
                && fields.token_transfers().is_empty()
                && fields.nft_transfers().is_empty()
            {
                return Err(LedgerError::Validation("transfer moves nothing".to_string()));
            }
        }
        _ => {}
    }
    Ok(())
}

fn validate_signers(kind: OperationKind, signers: &[KeyRole]) -> LedgerResult<()> {
    if signers.is_empty() {
        return Err(LedgerError::Validation(format!("{} declares no required signers", kind)));
    }
    let mut seen = HashSet::new();
    for role in signers {
        if !seen.insert(role) {
            return Err(LedgerError::Validation(format!(
                "{} lists signer {} more than once",
                kind, role
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{KeyMaterial, Operator, PrivateKey};
    use crate::ledger::ids::{AccountId, TopicId};

    fn context() -> ExecutionContext {
        let operator = Operator::new(AccountId::new(0, 0, 2), PrivateKey::generate_ed25519());
        ExecutionContext::new("sandbox", operator, vec![AccountId::new(0, 0, 3), AccountId::new(0, 0, 4)])
    }

    fn topic_update() -> OperationDescriptor {
        OperationKind::TopicUpdate
            .builder()
            .set(Field::TopicId, TopicId::new(0, 0, 1001))
            .set(Field::Memo, "Updated topic")
            .signer(KeyRole::Operator)
            .signer(KeyRole::Admin)
            .build()
            .unwrap()
    }

    #[test]
    fn test_token_create_requires_name_and_symbol() {
        let err = OperationKind::TokenCreate
            .builder()
            .set(Field::TokenName, "MyNFT")
            .set(Field::Treasury, AccountId::new(0, 0, 2))
            .signer(KeyRole::Operator)
            .build()
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(ref m) if m.contains("token_symbol")));

        let err = OperationKind::TokenCreate
            .builder()
            .set(Field::TokenName, "  ")
            .set(Field::TokenSymbol, "MNFT")
            .set(Field::Treasury, AccountId::new(0, 0, 2))
            .signer(KeyRole::Operator)
            .build()
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[test]
    fn test_finite_supply_needs_max_supply() {
        let err = OperationKind::TokenCreate
            .builder()
            .set(Field::TokenName, "MyNFT")
            .set(Field::TokenSymbol, "MNFT")
            .set(Field::Treasury, AccountId::new(0, 0, 2))
            .set(Field::SupplyType, SupplyType::Finite)
            .signer(KeyRole::Operator)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("max_supply"));
    }

    #[test]
    fn test_rejects_foreign_field_and_duplicate_signer() {
        let err = OperationKind::TopicCreate
            .builder()
            .set(Field::TokenName, "nope")
            .signer(KeyRole::Operator)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("does not apply"));

        let err = OperationKind::TopicCreate
            .builder()
            .signer(KeyRole::Admin)
            .signer(KeyRole::Admin)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("more than once"));

        let err = OperationKind::TopicCreate.builder().build().unwrap_err();
        assert!(err.to_string().contains("no required signers"));
    }

    #[test]
    fn test_freeze_is_idempotent() {
        let ctx = context();
        let mut descriptor = topic_update();
        let pristine = descriptor.clone();

        let first = descriptor.freeze(&ctx).unwrap();
        let second = descriptor.freeze(&ctx).unwrap();
        assert_eq!(first, second);

        // a fresh copy of the same descriptor freezes to the same value too
        let mut copy = pristine;
        assert_eq!(copy.freeze(&ctx).unwrap(), first);
        assert_eq!(first.transaction_id().payer, AccountId::new(0, 0, 2));
    }

    #[test]
    fn test_mutation_after_freeze_is_a_state_error() {
        let ctx = context();
        let mut descriptor = topic_update();
        descriptor.set_field(Field::Memo, "still mutable").unwrap();
        let frozen = descriptor.freeze(&ctx).unwrap();

        let err = descriptor.set_field(Field::Memo, "too late").unwrap_err();
        assert!(matches!(err, LedgerError::State(_)));
        assert_eq!(descriptor.fields().text(Field::Memo), Some("still mutable"));
        assert_eq!(frozen.fields().text(Field::Memo), Some("still mutable"));
    }

    #[test]
    fn test_freeze_against_other_context_fails() {
        let mut descriptor = topic_update();
        descriptor.freeze(&context()).unwrap();

        let operator = Operator::new(AccountId::new(0, 0, 99), PrivateKey::generate_ed25519());
        let other = ExecutionContext::new("sandbox", operator, vec![AccountId::new(0, 0, 3)]);
        assert!(matches!(descriptor.freeze(&other), Err(LedgerError::State(_))));
    }

    #[test]
    fn test_freeze_without_nodes_fails() {
        let operator = Operator {
            account_id: AccountId::new(0, 0, 2),
            key: KeyMaterial::generate(KeyRole::Operator),
        };
        let ctx = ExecutionContext::new("nowhere", operator, Vec::new());
        let mut descriptor = topic_update();
        assert!(matches!(descriptor.freeze(&ctx), Err(LedgerError::State(_))));
        assert!(!descriptor.is_frozen());
    }

    #[test]
    fn test_distinct_descriptors_get_distinct_ids() {
        let ctx = context();
        let a = topic_update().freeze(&ctx).unwrap();
        let b = topic_update().freeze(&ctx).unwrap();
        assert_ne!(a.transaction_id(), b.transaction_id());
    }
}
