//! Identifier and timestamp types.
//!
//! Entity ids use the `shard.realm.num` notation, timestamps the
//! `seconds.nanoseconds` notation used by receipts and the mirror node.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::ledger::error::LedgerError;

/// A `shard.realm.num` entity identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId {
    pub shard: u64,
    pub realm: u64,
    pub num: u64,
}

impl EntityId {
    pub const fn new(shard: u64, realm: u64, num: u64) -> Self {
        Self { shard, realm, num }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.shard, self.realm, self.num)
    }
}

impl FromStr for EntityId {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('.').collect();
        if parts.len() != 3 {
            return Err(LedgerError::Validation(format!(
                "invalid entity id '{}': expected shard.realm.num",
                s
            )));
        }
        let parse = |p: &str| {
            p.parse::<u64>()
                .map_err(|e| LedgerError::Validation(format!("invalid entity id '{}': {}", s, e)))
        };
        Ok(Self::new(parse(parts[0])?, parse(parts[1])?, parse(parts[2])?))
    }
}

macro_rules! entity_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(pub EntityId);

        impl $name {
            pub const fn new(shard: u64, realm: u64, num: u64) -> Self {
                Self(EntityId::new(shard, realm, num))
            }

            pub fn entity(&self) -> EntityId {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = LedgerError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse().map(Self)
            }
        }

        impl TryFrom<String> for $name {
            type Error = LedgerError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                s.parse()
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> String {
                id.to_string()
            }
        }
    };
}

entity_newtype!(
    /// A ledger account.
    AccountId
);
entity_newtype!(
    /// A consensus service topic.
    TopicId
);
entity_newtype!(
    /// A token type (fungible or NFT collection).
    TokenId
);

/// A single NFT: collection plus serial number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NftId {
    pub token_id: TokenId,
    pub serial: u64,
}

impl NftId {
    pub fn new(token_id: TokenId, serial: u64) -> Self {
        Self { token_id, serial }
    }
}

impl fmt::Display for NftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.token_id, self.serial)
    }
}

/// Consensus or valid-start time with nanosecond precision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timestamp {
    pub seconds: i64,
    pub nanos: u32,
}

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Last handed-out valid start, in nanoseconds since the epoch.
static LAST_VALID_START: AtomicI64 = AtomicI64::new(0);

impl Timestamp {
    pub const EPOCH: Timestamp = Timestamp { seconds: 0, nanos: 0 };

    pub const fn new(seconds: i64, nanos: u32) -> Self {
        Self { seconds, nanos }
    }

    /// Wall-clock now.
    pub fn now() -> Self {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self::from_nanos(elapsed.as_nanos() as i64)
    }

    /// Wall-clock now, strictly greater than any value previously returned
    /// by this function in the process. Used for transaction valid starts so
    /// two descriptors never share a transaction id.
    pub fn unique_now() -> Self {
        let now = Self::now().as_nanos();
        let mut last = LAST_VALID_START.load(Ordering::SeqCst);
        loop {
            let next = now.max(last + 1);
            match LAST_VALID_START.compare_exchange(last, next, Ordering::SeqCst, Ordering::SeqCst) {
                Ok(_) => return Self::from_nanos(next),
                Err(actual) => last = actual,
            }
        }
    }

    pub fn from_nanos(nanos: i64) -> Self {
        Self {
            seconds: nanos.div_euclid(NANOS_PER_SECOND),
            nanos: nanos.rem_euclid(NANOS_PER_SECOND) as u32,
        }
    }

    pub fn as_nanos(&self) -> i64 {
        self.seconds * NANOS_PER_SECOND + self.nanos as i64
    }

    pub fn plus_nanos(&self, nanos: i64) -> Self {
        Self::from_nanos(self.as_nanos() + nanos)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.seconds, self.nanos)
    }
}

impl FromStr for Timestamp {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || LedgerError::Validation(format!("invalid timestamp '{}'", s));
        let (secs, frac) = match s.trim().split_once('.') {
            Some((secs, frac)) => (secs, frac),
            None => (s.trim(), ""),
        };
        // seconds.nanos is only defined for times at or after the epoch
        if secs.starts_with('-') {
            return Err(invalid());
        }
        let seconds = secs.parse::<i64>().map_err(|_| invalid())?;
        if frac.len() > 9 || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let nanos = if frac.is_empty() {
            0
        } else {
            format!("{:0<9}", frac).parse::<u32>().map_err(|_| invalid())?
        };
        Ok(Self { seconds, nanos })
    }
}

impl TryFrom<String> for Timestamp {
    type Error = LedgerError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Timestamp> for String {
    fn from(ts: Timestamp) -> String {
        ts.to_string()
    }
}

/// Transaction identifier: paying account plus valid start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TransactionId {
    pub payer: AccountId,
    pub valid_start: Timestamp,
}

impl TransactionId {
    pub fn new(payer: AccountId, valid_start: Timestamp) -> Self {
        Self { payer, valid_start }
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.payer, self.valid_start)
    }
}

impl FromStr for TransactionId {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (payer, start) = s.split_once('@').ok_or_else(|| {
            LedgerError::Validation(format!("invalid transaction id '{}': missing '@'", s))
        })?;
        Ok(Self::new(payer.parse()?, start.parse()?))
    }
}

impl TryFrom<String> for TransactionId {
    type Error = LedgerError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<TransactionId> for String {
    fn from(id: TransactionId) -> String {
        id.to_string()
    }
}
