//! Native currency amounts.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ledger::error::{LedgerError, LedgerResult};
use std::ops::{Add, Neg, Sub};

/// Number of tinybars in one hbar.
pub const TINYBARS_PER_HBAR: i64 = 100_000_000;

/// Largest whole-hbar amount representable in tinybars.
pub const MAX_WHOLE_HBARS: u64 = (i64::MAX / TINYBARS_PER_HBAR) as u64;

/// An amount of the native currency, stored in tinybars.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Hbar(i64);

impl Hbar {
    pub const ZERO: Hbar = Hbar(0);

    pub const fn from_tinybars(tinybars: i64) -> Self {
        Self(tinybars)
    }

    /// For literal amounts. Overflow panics; amounts from config or user
    /// input go through [`Hbar::from_whole_hbars`].
    pub const fn new(hbars: i64) -> Self {
        Self(hbars * TINYBARS_PER_HBAR)
    }

    /// Convert a whole-hbar amount, rejecting values past [`MAX_WHOLE_HBARS`].
    pub fn from_whole_hbars(hbars: u64) -> LedgerResult<Self> {
        i64::try_from(hbars)
            .ok()
            .and_then(|h| h.checked_mul(TINYBARS_PER_HBAR))
            .map(Self)
            .ok_or_else(|| {
                LedgerError::Validation(format!(
                    "{} hbar exceeds the largest representable amount ({} hbar)",
                    hbars, MAX_WHOLE_HBARS
                ))
            })
    }

    pub const fn to_tinybars(self) -> i64 {
        self.0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn checked_add(self, other: Hbar) -> Option<Hbar> {
        self.0.checked_add(other.0).map(Hbar)
    }

    pub fn checked_sub(self, other: Hbar) -> Option<Hbar> {
        self.0.checked_sub(other.0).map(Hbar)
    }
}

impl Add for Hbar {
    type Output = Hbar;

    fn add(self, rhs: Hbar) -> Hbar {
        Hbar(self.0 + rhs.0)
    }
}

impl Sub for Hbar {
    type Output = Hbar;

    fn sub(self, rhs: Hbar) -> Hbar {
        Hbar(self.0 - rhs.0)
    }
}

impl Neg for Hbar {
    type Output = Hbar;

    fn neg(self) -> Hbar {
        Hbar(-self.0)
    }
}

impl fmt::Display for Hbar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let whole = abs / TINYBARS_PER_HBAR as u64;
        let frac = abs % TINYBARS_PER_HBAR as u64;
        if frac == 0 {
            write!(f, "{}{} ℏ", sign, whole)
        } else {
            let digits = format!("{:08}", frac);
            write!(f, "{}{}.{} ℏ", sign, whole, digits.trim_end_matches('0'))
        }
    }
}
