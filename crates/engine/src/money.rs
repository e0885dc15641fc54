use std::{fmt, ops::Neg, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Signed amount expressed in **minor units** (cents).
///
/// Ledger amounts and aggregate totals are stored as integers, so repeated
/// increments never drift the way floating point sums do.
///
/// ```rust
/// use engine::Money;
///
/// let amount: Money = "12,5".parse().unwrap();
/// assert_eq!(amount.minor(), 1250);
/// assert_eq!(amount.to_string(), "12.50");
/// assert!("1.234".parse::<Money>().is_err());
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    #[must_use]
    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    #[must_use]
    pub const fn minor(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Largest amount a single ledger entry may carry (10^13 units).
    pub const MAX_ENTRY: Money = Money(1_000_000_000_000_000);

    /// Returns the amount if it is strictly positive and at most
    /// [`Money::MAX_ENTRY`], as required for a ledger entry.
    pub fn require_positive(self) -> Result<Self, EngineError> {
        if !self.is_positive() {
            return Err(EngineError::Validation(
                "amount must be greater than 0".to_string(),
            ));
        }
        if self > Self::MAX_ENTRY {
            return Err(EngineError::Validation(format!(
                "amount must be at most {}",
                Self::MAX_ENTRY
            )));
        }
        Ok(self)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Money> for i64 {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Self::Output {
        Money(-self.0)
    }
}

impl FromStr for Money {
    type Err = EngineError;

    /// Parses a decimal string into minor units.
    ///
    /// Accepts `.` or `,` as separator and an optional leading sign; rejects
    /// more than two fractional digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |msg: &str| EngineError::Validation(format!("{msg}: {s:?}"));

        let trimmed = s.trim();
        let (negative, digits) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, &trimmed[1..]),
            Some(b'+') => (false, &trimmed[1..]),
            Some(_) => (false, trimmed),
            None => return Err(invalid("empty amount")),
        };

        let normalized = digits.trim().replace(',', ".");
        let (units, fraction) = match normalized.split_once('.') {
            Some((units, fraction)) => (units, fraction),
            None => (normalized.as_str(), ""),
        };

        if units.is_empty() || !units.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("invalid amount"));
        }
        if !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("invalid amount"));
        }
        let cents: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| invalid("invalid amount"))? * 10,
            2 => fraction.parse::<i64>().map_err(|_| invalid("invalid amount"))?,
            _ => return Err(invalid("too many decimals")),
        };

        let total = units
            .parse::<i64>()
            .ok()
            .and_then(|u| u.checked_mul(100))
            .and_then(|u| u.checked_add(cents))
            .ok_or_else(|| invalid("amount too large"))?;

        Ok(Money(if negative { -total } else { total }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_pads_cents() {
        assert_eq!(Money::from_minor(0).to_string(), "0.00");
        assert_eq!(Money::from_minor(7).to_string(), "0.07");
        assert_eq!(Money::from_minor(-8000).to_string(), "-80.00");
    }

    #[test]
    fn parse_accepts_dot_comma_and_sign() {
        assert_eq!("200".parse::<Money>().unwrap().minor(), 20_000);
        assert_eq!("0.5".parse::<Money>().unwrap().minor(), 50);
        assert_eq!("3,25".parse::<Money>().unwrap().minor(), 325);
        assert_eq!("-1.01".parse::<Money>().unwrap().minor(), -101);
        assert_eq!(" +4. ".parse::<Money>().unwrap().minor(), 400);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("".parse::<Money>().is_err());
        assert!("abc".parse::<Money>().is_err());
        assert!(".50".parse::<Money>().is_err());
        assert!("1.2.3".parse::<Money>().is_err());
        assert!("9.999".parse::<Money>().is_err());
        assert!("99999999999999999999".parse::<Money>().is_err());
    }

    #[test]
    fn require_positive_rejects_zero_and_negative() {
        assert!(Money::from_minor(1).require_positive().is_ok());
        assert!(Money::ZERO.require_positive().is_err());
        assert!(Money::from_minor(-5).require_positive().is_err());
    }

    #[test]
    fn require_positive_caps_entry_amount() {
        assert!(Money::MAX_ENTRY.require_positive().is_ok());
        assert!(
            Money::from_minor(Money::MAX_ENTRY.minor() + 1)
                .require_positive()
                .is_err()
        );
        let huge: Money = "50000000000000000".parse().unwrap();
        assert!(huge.require_positive().is_err());
    }
}
