//! Fixed-precision Bitcoin amounts.
//!
//! Amounts are carried as integer satoshis (10^8 per whole bitcoin) from
//! parse to output. Block-sum comparisons in the pruner and checker are
//! exact integer comparisons; decimal conversion happens only at the
//! string boundaries, so no rounding error can accumulate across the
//! millions of additions a large run performs.

use anyhow::{bail, Result};
use std::fmt;
use std::iter::Sum;

/// Satoshis per whole bitcoin.
pub const SAT_PER_BTC: u64 = 100_000_000;

/// A non-negative amount in satoshis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub fn from_sat(sat: u64) -> Amount {
        Amount(sat)
    }

    pub fn to_sat(self) -> u64 {
        self.0
    }

    /// Parse a decimal BTC string ("1.5", "0.00000001") into satoshis.
    ///
    /// Scaled-integer conversion: the fractional part is right-padded to
    /// eight digits and never passes through floating point. Rejects
    /// negatives, more than eight fractional digits, non-digit characters
    /// and values that overflow u64.
    pub fn from_btc_str(s: &str) -> Result<Amount> {
        let s = s.trim();
        if s.is_empty() {
            bail!("empty amount");
        }
        if s.starts_with('-') {
            bail!("negative amount: {}", s);
        }
        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            bail!("malformed amount: {}", s);
        }
        if frac.len() > 8 {
            bail!("amount {} has more than 8 decimal places", s);
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit())
        {
            bail!("malformed amount: {}", s);
        }
        let whole_sat = if whole.is_empty() {
            0u64
        } else {
            whole
                .parse::<u64>()
                .map_err(|_| anyhow::anyhow!("amount {} overflows", s))?
                .checked_mul(SAT_PER_BTC)
                .ok_or_else(|| anyhow::anyhow!("amount {} overflows", s))?
        };
        let mut frac_sat = if frac.is_empty() {
            0u64
        } else {
            frac.parse::<u64>()?
        };
        for _ in frac.len()..8 {
            frac_sat *= 10;
        }
        whole_sat
            .checked_add(frac_sat)
            .map(Amount)
            .ok_or_else(|| anyhow::anyhow!("amount {} overflows", s))
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    /// Difference that may go negative (fees of invalid transactions).
    pub fn sub_signed(self, other: Amount) -> SignedAmount {
        SignedAmount(self.0 as i64 - other.0 as i64)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Amount {
        Amount(iter.fold(0u64, |acc, a| acc.saturating_add(a.0)))
    }
}

impl<'a> Sum<&'a Amount> for Amount {
    fn sum<I: Iterator<Item = &'a Amount>>(iter: I) -> Amount {
        iter.copied().sum()
    }
}

impl fmt::Display for Amount {
    /// Decimal BTC with trailing zeros trimmed, at least one fractional
    /// digit ("1.0", "0.015", "1.23456789").
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / SAT_PER_BTC;
        let frac = self.0 % SAT_PER_BTC;
        let mut frac_str = format!("{:08}", frac);
        while frac_str.len() > 1 && frac_str.ends_with('0') {
            frac_str.pop();
        }
        write!(f, "{}.{}", whole, frac_str)
    }
}

/// A signed amount in satoshis, for fees and differences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SignedAmount(i64);

impl SignedAmount {
    pub fn from_sat(sat: i64) -> SignedAmount {
        SignedAmount(sat)
    }

    pub fn to_sat(self) -> i64 {
        self.0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for SignedAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 < 0 {
            write!(f, "-{}", Amount(self.0.unsigned_abs()))
        } else {
            write!(f, "{}", Amount(self.0 as u64))
        }
    }
}
