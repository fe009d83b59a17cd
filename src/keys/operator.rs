//! Operator identity loaded from the environment.

use crate::keys::material::{KeyMaterial, KeyRole};
use crate::keys::private_key::{KeyAlgorithm, PrivateKey};
use crate::ledger::error::{LedgerError, LedgerResult};
use crate::ledger::ids::AccountId;

/// Environment variable holding the operator account id.
pub const OPERATOR_ID_ENV_VAR: &str = "OPERATOR_ID";
/// Environment variable holding the operator private key.
pub const OPERATOR_KEY_ENV_VAR: &str = "OPERATOR_KEY";
/// Optional algorithm for raw-hex operator keys (`ed25519` or `ecdsa`).
pub const OPERATOR_KEY_TYPE_ENV_VAR: &str = "OPERATOR_KEY_TYPE";

/// The default account funding and authorizing operations.
#[derive(Debug, Clone)]
pub struct Operator {
    pub account_id: AccountId,
    pub key: KeyMaterial,
}

impl Operator {
    pub fn new(account_id: AccountId, key: PrivateKey) -> Self {
        Self {
            account_id,
            key: KeyMaterial::new(KeyRole::Operator, key),
        }
    }

    /// Parse from string values.
    pub fn from_parts(id: &str, key: &str, algorithm: Option<&str>) -> LedgerResult<Self> {
        let account_id: AccountId = id.parse()?;
        let default = match algorithm {
            Some(a) => a.parse()?,
            None => KeyAlgorithm::Ed25519,
        };
        let key = PrivateKey::from_str_with_default(key, default)?;
        tracing::info!(
            operator = %account_id,
            public_key = %key.public_key(),
            "Operator loaded"
        );
        Ok(Self::new(account_id, key))
    }

    /// Load from `OPERATOR_ID` / `OPERATOR_KEY`.
    ///
    /// Returns `Ok(None)` when either variable is unset so callers can stop
    /// before touching the network.
    pub fn from_env() -> LedgerResult<Option<Self>> {
        let (Ok(id), Ok(key)) = (
            std::env::var(OPERATOR_ID_ENV_VAR),
            std::env::var(OPERATOR_KEY_ENV_VAR),
        ) else {
            return Ok(None);
        };
        if id.trim().is_empty() || key.trim().is_empty() {
            return Ok(None);
        }
        let algorithm = std::env::var(OPERATOR_KEY_TYPE_ENV_VAR).ok();
        Self::from_parts(&id, &key, algorithm.as_deref())
            .map(Some)
            .map_err(|e| LedgerError::Key(format!("invalid operator configuration: {}", e)))
    }
}
