//! Frozen and signed transactions.

use serde::{Deserialize, Serialize};

use crate::keys::{KeyMaterial, KeyRole, PublicKey};
use crate::ledger::amount::Hbar;
use crate::ledger::error::{LedgerError, LedgerResult};
use crate::ledger::ids::{AccountId, TransactionId};
use crate::transaction::fields::{FieldChanges, OperationKind};

/// Everything a signature covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionBody {
    pub transaction_id: TransactionId,
    pub node_account_id: AccountId,
    pub max_transaction_fee: Hbar,
    pub kind: OperationKind,
    pub fields: FieldChanges,
}

impl TransactionBody {
    /// Canonical byte form of the body.
    pub fn to_bytes(&self) -> LedgerResult<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| LedgerError::Validation(format!("unencodable transaction body: {}", e)))
    }
}

/// A transaction whose body bytes can no longer change.
///
/// Freezing signs the body with the operator key as payer. That signature is
/// kept apart from the role signatures and does not count towards
/// `required_signers`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrozenTransaction {
    body: TransactionBody,
    required_signers: Vec<KeyRole>,
    body_bytes: Vec<u8>,
    payer_signature: SignatureEntry,
}

impl FrozenTransaction {
    pub(crate) fn new(body: TransactionBody, required_signers: Vec<KeyRole>, payer: &KeyMaterial) -> LedgerResult<Self> {
        let body_bytes = body.to_bytes()?;
        let payer_signature = SignatureEntry {
            role: KeyRole::Operator,
            public_key: payer.public_key(),
            signature: payer.sign(&body_bytes)?,
        };
        Ok(Self {
            body,
            required_signers,
            body_bytes,
            payer_signature,
        })
    }

    pub fn body(&self) -> &TransactionBody {
        &self.body
    }

    pub fn transaction_id(&self) -> TransactionId {
        self.body.transaction_id
    }

    pub fn kind(&self) -> OperationKind {
        self.body.kind
    }

    pub fn fields(&self) -> &FieldChanges {
        &self.body.fields
    }

    pub fn required_signers(&self) -> &[KeyRole] {
        &self.required_signers
    }

    pub fn body_bytes(&self) -> &[u8] {
        &self.body_bytes
    }

    pub fn payer_signature(&self) -> &SignatureEntry {
        &self.payer_signature
    }
}

/// One applied signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureEntry {
    pub role: KeyRole,
    pub public_key: PublicKey,
    pub signature: Vec<u8>,
}

/// A frozen transaction plus the signatures collected so far, kept in the
/// order the signer roles were declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    frozen: FrozenTransaction,
    signatures: Vec<SignatureEntry>,
}

impl SignedTransaction {
    pub(crate) fn from_parts(frozen: FrozenTransaction, signatures: Vec<SignatureEntry>) -> Self {
        Self { frozen, signatures }
    }

    pub fn frozen(&self) -> &FrozenTransaction {
        &self.frozen
    }

    pub fn transaction_id(&self) -> TransactionId {
        self.frozen.transaction_id()
    }

    pub fn kind(&self) -> OperationKind {
        self.frozen.kind()
    }

    pub fn signatures(&self) -> &[SignatureEntry] {
        &self.signatures
    }

    pub fn has_signature_for(&self, role: &KeyRole) -> bool {
        self.signatures.iter().any(|s| &s.role == role)
    }

    /// Required roles without a signature yet, in declared order.
    pub fn missing_signers(&self) -> Vec<&KeyRole> {
        self.frozen
            .required_signers()
            .iter()
            .filter(|role| !self.has_signature_for(role))
            .collect()
    }
}

impl From<FrozenTransaction> for SignedTransaction {
    fn from(frozen: FrozenTransaction) -> Self {
        Self::from_parts(frozen, Vec::new())
    }
}
