//! Role-tagged key material and keyrings.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::keys::private_key::{PrivateKey, PublicKey};
use crate::ledger::error::{LedgerError, LedgerResult};

/// The role a key plays when authorizing an operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyRole {
    /// The paying account of every transaction.
    Operator,
    Admin,
    Submit,
    Supply,
    FeeSchedule,
    /// Owner of a named account (e.g. "account-b").
    Owner(String),
}

impl KeyRole {
    pub fn owner(label: impl Into<String>) -> Self {
        KeyRole::Owner(label.into())
    }
}

impl fmt::Display for KeyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyRole::Operator => f.write_str("operator"),
            KeyRole::Admin => f.write_str("admin"),
            KeyRole::Submit => f.write_str("submit"),
            KeyRole::Supply => f.write_str("supply"),
            KeyRole::FeeSchedule => f.write_str("fee-schedule"),
            KeyRole::Owner(label) => write!(f, "owner:{}", label),
        }
    }
}

/// A key pair bound to the role it signs for.
#[derive(Clone)]
pub struct KeyMaterial {
    role: KeyRole,
    key: PrivateKey,
}

impl KeyMaterial {
    pub fn new(role: KeyRole, key: PrivateKey) -> Self {
        Self { role, key }
    }

    /// Fresh Ed25519 key for `role`.
    pub fn generate(role: KeyRole) -> Self {
        Self::new(role, PrivateKey::generate_ed25519())
    }

    pub fn role(&self) -> &KeyRole {
        &self.role
    }

    pub fn public_key(&self) -> PublicKey {
        self.key.public_key()
    }

    pub fn sign(&self, message: &[u8]) -> LedgerResult<Vec<u8>> {
        self.key.sign(message)
    }

    /// Same private key acting under another role.
    pub fn with_role(&self, role: KeyRole) -> Self {
        Self {
            role,
            key: self.key.clone(),
        }
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("role", &self.role)
            .field("public_key", &self.public_key().to_string())
            .finish_non_exhaustive()
    }
}

/// Keys available to a workflow, looked up by role.
#[derive(Debug, Clone, Default)]
pub struct Keyring {
    keys: HashMap<KeyRole, KeyMaterial>,
}

impl Keyring {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key, replacing any previous key for the same role.
    pub fn insert(&mut self, key: KeyMaterial) {
        self.keys.insert(key.role().clone(), key);
    }

    pub fn with(mut self, key: KeyMaterial) -> Self {
        self.insert(key);
        self
    }

    pub fn get(&self, role: &KeyRole) -> Option<&KeyMaterial> {
        self.keys.get(role)
    }

    /// Key for `role`, or an authorization error naming the missing role.
    pub fn require(&self, role: &KeyRole) -> LedgerResult<&KeyMaterial> {
        self.get(role)
            .ok_or_else(|| LedgerError::Authorization(format!("no key available for role {}", role)))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
