use std::{
    fmt,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Signed money amount represented as **integer cents**.
///
/// Use this type for **all** monetary values in the engine (account balances,
/// transaction amounts, debt principals, settlement allocations) to avoid
/// floating-point drift. Currency is a display label carried next to the
/// amount, never part of the arithmetic.
///
/// The value is signed:
/// - positive = money in / increase
/// - negative = money out / decrease
///
/// # Examples
///
/// ```rust
/// use engine::MoneyCents;
///
/// let amount = MoneyCents::new(12_34);
/// assert_eq!(amount.cents(), 1234);
/// assert_eq!(amount.to_string(), "12.34");
/// ```
///
/// Parsing from user input (accepts `.` or `,` as decimal separator; rejects
/// more than 2 decimals instead of silently truncating):
///
/// ```rust
/// use engine::MoneyCents;
///
/// assert_eq!("10".parse::<MoneyCents>().unwrap().cents(), 1000);
/// assert_eq!("10,5".parse::<MoneyCents>().unwrap().cents(), 1050);
/// assert!("12.345".parse::<MoneyCents>().is_err());
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[repr(transparent)]
#[serde(transparent)]
pub struct MoneyCents(i64);

impl MoneyCents {
    pub const ZERO: MoneyCents = MoneyCents(0);

    /// Creates a new amount from integer cents.
    #[must_use]
    pub const fn new(cents: i64) -> Self {
        Self(cents)
    }

    /// Returns the raw value in cents.
    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Returns `true` if the amount is 0.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if the amount is positive.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Returns `true` if the amount is negative.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Clamps negative amounts to zero.
    ///
    /// Used to materialize a personal debt's `current_balance` from its
    /// (possibly negative) remaining amount.
    #[must_use]
    pub const fn clamp_non_negative(self) -> MoneyCents {
        if self.0 < 0 { MoneyCents(0) } else { self }
    }

    /// Checked addition (returns `None` on overflow).
    #[must_use]
    pub fn checked_add(self, rhs: MoneyCents) -> Option<MoneyCents> {
        self.0.checked_add(rhs.0).map(MoneyCents)
    }

    /// Checked subtraction (returns `None` on overflow).
    #[must_use]
    pub fn checked_sub(self, rhs: MoneyCents) -> Option<MoneyCents> {
        self.0.checked_sub(rhs.0).map(MoneyCents)
    }
}

/// Splits `total` across `weights` proportionally, penny-exact.
///
/// Each share is computed against the *remaining* total and the *remaining*
/// weight sum (`share_i = remaining_total * weight_i / remaining_weights`,
/// integer floor over `i128`). The last entry with a positive weight therefore
/// absorbs all rounding, and the returned shares always sum to exactly
/// `total`. Zero weights receive a zero share.
///
/// This is the single rounding-remainder policy used by both settlement
/// distribution and batch repayments: deterministic, order-dependent on the
/// caller's pool order, no leaked or invented cents.
///
/// Additionally, when `total <= sum(weights)`, every share is bounded by its
/// weight (`share_i <= weight_i`), which is what lets settlements never push
/// a transaction past fully reimbursed.
pub fn allocate_proportional(total: MoneyCents, weights: &[MoneyCents]) -> Vec<MoneyCents> {
    let mut remaining_total = i128::from(total.cents());
    let mut remaining_weights: i128 = weights.iter().map(|w| i128::from(w.cents())).sum();

    let mut shares = Vec::with_capacity(weights.len());
    for weight in weights {
        let weight = i128::from(weight.cents());
        if weight <= 0 || remaining_weights <= 0 {
            shares.push(MoneyCents::ZERO);
            continue;
        }
        let share = remaining_total * weight / remaining_weights;
        remaining_total -= share;
        remaining_weights -= weight;
        // Shares are bounded by the inputs, so the narrowing cast is safe.
        shares.push(MoneyCents::new(share as i64));
    }
    shares
}

impl fmt::Display for MoneyCents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl From<i64> for MoneyCents {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<MoneyCents> for i64 {
    fn from(value: MoneyCents) -> Self {
        value.0
    }
}

impl Add for MoneyCents {
    type Output = MoneyCents;

    fn add(self, rhs: MoneyCents) -> Self::Output {
        MoneyCents(self.0 + rhs.0)
    }
}

impl AddAssign for MoneyCents {
    fn add_assign(&mut self, rhs: MoneyCents) {
        self.0 += rhs.0;
    }
}

impl Sub for MoneyCents {
    type Output = MoneyCents;

    fn sub(self, rhs: MoneyCents) -> Self::Output {
        MoneyCents(self.0 - rhs.0)
    }
}

impl SubAssign for MoneyCents {
    fn sub_assign(&mut self, rhs: MoneyCents) {
        self.0 -= rhs.0;
    }
}

impl Neg for MoneyCents {
    type Output = MoneyCents;

    fn neg(self) -> Self::Output {
        MoneyCents(-self.0)
    }
}

impl FromStr for MoneyCents {
    type Err = EngineError;

    /// Parses a decimal string into cents.
    ///
    /// Accepts `.` or `,` as decimal separator and an optional leading
    /// `+`/`-`. Rejects empty strings, non-digits, and more than 2 fractional
    /// digits; never coerces bad input to zero.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || EngineError::InvalidAmount(format!("invalid amount: {s:?}"));
        let overflow = || EngineError::InvalidAmount("amount too large".to_string());

        let trimmed = s.trim();
        let (negative, rest) = match trimmed.strip_prefix('-') {
            Some(stripped) => (true, stripped),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };
        if rest.is_empty() {
            return Err(EngineError::InvalidAmount("empty amount".to_string()));
        }

        let rest = rest.replace(',', ".");
        let (units_str, frac_str) = match rest.split_once('.') {
            Some((units, frac)) => (units, frac),
            None => (rest.as_str(), ""),
        };
        if units_str.is_empty()
            || !units_str.chars().all(|c| c.is_ascii_digit())
            || !frac_str.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }

        let units: i64 = units_str.parse().map_err(|_| invalid())?;
        let cents: i64 = match frac_str.len() {
            0 => 0,
            1 => frac_str.parse::<i64>().map_err(|_| invalid())? * 10,
            2 => frac_str.parse::<i64>().map_err(|_| invalid())?,
            _ => {
                return Err(EngineError::InvalidAmount(format!(
                    "too many decimals: {s:?}"
                )));
            }
        };

        let total = units
            .checked_mul(100)
            .and_then(|v| v.checked_add(cents))
            .ok_or_else(overflow)?;
        let signed = if negative {
            total.checked_neg().ok_or_else(overflow)?
        } else {
            total
        };

        Ok(MoneyCents(signed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_two_decimals() {
        assert_eq!(MoneyCents::new(0).to_string(), "0.00");
        assert_eq!(MoneyCents::new(1).to_string(), "0.01");
        assert_eq!(MoneyCents::new(10).to_string(), "0.10");
        assert_eq!(MoneyCents::new(1050).to_string(), "10.50");
        assert_eq!(MoneyCents::new(-1050).to_string(), "-10.50");
    }

    #[test]
    fn parse_accepts_dot_or_comma() {
        assert_eq!("10".parse::<MoneyCents>().unwrap().cents(), 1000);
        assert_eq!("10.5".parse::<MoneyCents>().unwrap().cents(), 1050);
        assert_eq!("10,50".parse::<MoneyCents>().unwrap().cents(), 1050);
        assert_eq!("-0.01".parse::<MoneyCents>().unwrap().cents(), -1);
        assert_eq!("+1.00".parse::<MoneyCents>().unwrap().cents(), 100);
        assert_eq!("  2.30 ".parse::<MoneyCents>().unwrap().cents(), 230);
    }

    #[test]
    fn parse_rejects_junk_instead_of_zeroing() {
        assert!("".parse::<MoneyCents>().is_err());
        assert!("abc".parse::<MoneyCents>().is_err());
        assert!("12.345".parse::<MoneyCents>().is_err());
        assert!("1.2.3".parse::<MoneyCents>().is_err());
    }

    #[test]
    fn allocation_sums_exactly() {
        let shares = allocate_proportional(
            MoneyCents::new(5000),
            &[MoneyCents::new(6000), MoneyCents::new(4000)],
        );
        assert_eq!(shares, vec![MoneyCents::new(3000), MoneyCents::new(2000)]);

        // 100.00 over three equal weights cannot divide evenly; the trailing
        // share absorbs the remainder and the sum stays exact.
        let thirds = allocate_proportional(
            MoneyCents::new(10000),
            &[MoneyCents::new(1), MoneyCents::new(1), MoneyCents::new(1)],
        );
        let total: i64 = thirds.iter().map(|s| s.cents()).sum();
        assert_eq!(total, 10000);
        assert_eq!(thirds[0].cents(), 3333);
        assert_eq!(thirds[1].cents(), 3333);
        assert_eq!(thirds[2].cents(), 3334);
    }

    #[test]
    fn allocation_bounded_by_weight_when_total_fits() {
        let weights = [
            MoneyCents::new(137),
            MoneyCents::new(263),
            MoneyCents::new(599),
            MoneyCents::new(1),
        ];
        let shares = allocate_proportional(MoneyCents::new(900), &weights);
        let total: i64 = shares.iter().map(|s| s.cents()).sum();
        assert_eq!(total, 900);
        for (share, weight) in shares.iter().zip(weights.iter()) {
            assert!(share.cents() <= weight.cents());
        }
    }

    #[test]
    fn allocation_skips_zero_weights() {
        let shares = allocate_proportional(
            MoneyCents::new(100),
            &[MoneyCents::ZERO, MoneyCents::new(50)],
        );
        assert_eq!(shares[0], MoneyCents::ZERO);
        assert_eq!(shares[1], MoneyCents::new(100));
    }
}
