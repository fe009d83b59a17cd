//! Signature collection over frozen transactions.
//!
//! # Rules
//! - Only roles declared as required may sign
//! - Each required role signs exactly once
//! - Signatures are stored in declared signer order, whatever order the
//!   keyholders sign in, so the signed payload is reproducible
//! - A failed `sign` leaves the input untouched

use crate::keys::{KeyMaterial, Keyring};
use crate::ledger::error::{LedgerError, LedgerResult};
use crate::transaction::frozen::{FrozenTransaction, SignatureEntry, SignedTransaction};

/// Applies required signatures to frozen transactions.
pub struct SigningCoordinator;

impl SigningCoordinator {
    /// Add `key`'s signature, returning a new partially signed value.
    pub fn sign(partial: &SignedTransaction, key: &KeyMaterial) -> LedgerResult<SignedTransaction> {
        let frozen = partial.frozen();
        let required = frozen.required_signers();
        let Some(position) = required.iter().position(|r| r == key.role()) else {
            return Err(LedgerError::Authorization(format!(
                "role {} is not a required signer of {} (required: {})",
                key.role(),
                frozen.transaction_id(),
                required.iter().map(|r| r.to_string()).collect::<Vec<_>>().join(", ")
            )));
        };
        if partial.has_signature_for(key.role()) {
            return Err(LedgerError::State(format!(
                "{} already signed by {}",
                frozen.transaction_id(),
                key.role()
            )));
        }

        let entry = SignatureEntry {
            role: key.role().clone(),
            public_key: key.public_key(),
            signature: key.sign(frozen.body_bytes())?,
        };

        // keep declared order: insert before the first entry declared later
        let mut signatures = partial.signatures().to_vec();
        let insert_at = signatures
            .iter()
            .position(|s| {
                required
                    .iter()
                    .position(|r| r == &s.role)
                    .map(|p| p > position)
                    .unwrap_or(false)
            })
            .unwrap_or(signatures.len());
        signatures.insert(insert_at, entry);

        tracing::debug!(
            transaction_id = %frozen.transaction_id(),
            role = %key.role(),
            public_key = %key.public_key(),
            "Signature applied"
        );

        Ok(SignedTransaction::from_parts(frozen.clone(), signatures))
    }

    /// Sign with every required role, in declared order, taking keys from
    /// `keyring`.
    pub fn sign_all(frozen: &FrozenTransaction, keyring: &Keyring) -> LedgerResult<SignedTransaction> {
        let mut signed = SignedTransaction::from(frozen.clone());
        for role in frozen.required_signers() {
            let key = keyring.require(role)?;
            signed = Self::sign(&signed, key)?;
        }
        Ok(signed)
    }

    /// True iff the roles with a signature are exactly the required roles.
    pub fn is_fully_signed(partial: &SignedTransaction) -> bool {
        let required = partial.frozen().required_signers();
        partial.signatures().len() == required.len()
            && required.iter().all(|role| partial.has_signature_for(role))
    }

    /// Check the payer signature and every role signature against the body
    /// bytes.
    pub fn verify(signed: &SignedTransaction) -> LedgerResult<()> {
        let body = signed.frozen().body_bytes();
        for entry in std::iter::once(signed.frozen().payer_signature()).chain(signed.signatures()) {
            if !entry.public_key.verify(body, &entry.signature) {
                return Err(LedgerError::Authorization(format!(
                    "signature from {} does not verify",
                    entry.role
                )));
            }
        }
        Ok(())
    }
}

impl FrozenTransaction {
    pub fn sign(&self, key: &KeyMaterial) -> LedgerResult<SignedTransaction> {
        SigningCoordinator::sign(&SignedTransaction::from(self.clone()), key)
    }
}

impl SignedTransaction {
    pub fn sign(&self, key: &KeyMaterial) -> LedgerResult<SignedTransaction> {
        SigningCoordinator::sign(self, key)
    }

    pub fn is_fully_signed(&self) -> bool {
        SigningCoordinator::is_fully_signed(self)
    }
}
