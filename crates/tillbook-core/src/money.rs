//! # Money
//!
//! Every amount in the ledger is an `i64` count of cents. User input such
//! as `"2.50"` goes straight to 250 cents without passing through `f64`, so
//! a credit log replayed from zero lands on exactly the cached balance.
//!
//! Single amounts are capped at [`MAX_AMOUNT_CENTS`](crate::MAX_AMOUNT_CENTS)
//! on the way in. The operators saturate at the `i64` bounds rather than
//! panic; code that builds a total from user input uses the `checked_*`
//! methods.
//!
//! ```rust
//! use tillbook_core::money::Money;
//!
//! let bread = Money::parse("2.50").unwrap();
//! assert_eq!(bread * 3, Money::from_cents(750));
//! assert_eq!((bread * 3).to_string(), "$7.50");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

/// An amount in cents. Signed: net cash flow and profit go negative.
///
/// Entities store plain `*_cents` columns and hand out `Money` through
/// accessors (`Product::price`, `Sale::total`, `LayBye::balance_due`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Parses a user-typed amount such as `2.50`, `$2.5`, `10` or `.75`.
    ///
    /// ## Rules
    /// - Optional leading `$`
    /// - At most two fractional digits (`2.505` is rejected, never rounded)
    /// - No sign: amounts typed at the till are never negative
    ///
    /// ## Example
    /// ```rust
    /// use tillbook_core::money::Money;
    ///
    /// assert_eq!(Money::parse("2.5"), Some(Money::from_cents(250)));
    /// assert_eq!(Money::parse("$10"), Some(Money::from_cents(1000)));
    /// assert_eq!(Money::parse("2.505"), None);
    /// assert_eq!(Money::parse("bread"), None);
    /// ```
    pub fn parse(input: &str) -> Option<Money> {
        let s = input.trim();
        let s = s.strip_prefix('$').unwrap_or(s);
        if s.is_empty() {
            return None;
        }

        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };

        if whole.is_empty() && frac.is_empty() {
            return None;
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit())
        {
            return None;
        }
        if frac.len() > 2 {
            return None;
        }

        let major: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
        let minor: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().ok()? * 10,
            _ => frac.parse().ok()?,
        };

        major.checked_mul(100)?.checked_add(minor).map(Money)
    }

    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Whole dollars, truncated toward zero. Loyalty points are earned per
    /// whole dollar.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Line total for `qty` units at this price.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }

    #[inline]
    pub const fn checked_mul_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    #[inline]
    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Subtracts, flooring the result at zero.
    ///
    /// Used by the credit ledger, where an overpayment clears the balance
    /// instead of leaving a negative one.
    #[inline]
    pub fn saturating_sub_to_zero(self, other: Money) -> Money {
        Money(self.0.saturating_sub(other.0).max(0))
    }

    /// Returns `self` as a share of `whole` in basis points (10000 = 100%).
    ///
    /// Returns 0 when `whole` is zero.
    pub fn ratio_bps(&self, whole: Money) -> i64 {
        if whole.is_zero() {
            return 0;
        }
        let bps = (self.0 as i128 * 10_000) / whole.0 as i128;
        bps.clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }
}

/// `$12.34`, or `-$12.34` for a loss.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let abs = self.0.unsigned_abs();
        if self.0 < 0 {
            f.write_str("-")?;
        }
        write!(f, "${}.{:02}", abs / 100, abs % 100)
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        *self = *self - other;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        self.multiply_quantity(qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_dollars() {
        assert_eq!(Money::from_cents(1099).to_string(), "$10.99");
        assert_eq!(Money::from_cents(7).to_string(), "$0.07");
        assert_eq!(Money::from_cents(-550).to_string(), "-$5.50");
        assert_eq!(Money::zero().to_string(), "$0.00");
        assert_eq!(Money::from_cents(1099).dollars(), 10);
    }

    #[test]
    fn test_parse_accepts_till_formats() {
        assert_eq!(Money::parse("2.50"), Some(Money::from_cents(250)));
        assert_eq!(Money::parse("2.5"), Some(Money::from_cents(250)));
        assert_eq!(Money::parse("2."), Some(Money::from_cents(200)));
        assert_eq!(Money::parse(".75"), Some(Money::from_cents(75)));
        assert_eq!(Money::parse("$3"), Some(Money::from_cents(300)));
        assert_eq!(Money::parse("0"), Some(Money::zero()));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(Money::parse(""), None);
        assert_eq!(Money::parse("."), None);
        assert_eq!(Money::parse("-2"), None);
        assert_eq!(Money::parse("2.505"), None);
        assert_eq!(Money::parse("1e3"), None);
        assert_eq!(Money::parse("bread"), None);
        assert_eq!(Money::parse("99999999999999999999"), None);
    }

    #[test]
    fn test_arithmetic_and_sum() {
        let (a, b) = (Money::from_cents(1000), Money::from_cents(500));

        assert_eq!(a + b, Money::from_cents(1500));
        assert_eq!(a - b, Money::from_cents(500));
        assert_eq!((a * 3).cents(), 3000);

        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total.cents(), 2000);
    }

    #[test]
    fn test_overflow_is_checked_or_saturated() {
        let huge = Money::from_cents(9_000_000_000_000_000_000);
        assert_eq!(huge.checked_mul_quantity(2), None);
        assert_eq!(huge.checked_add(huge), None);
        assert_eq!(Money::from_cents(250).checked_mul_quantity(3), Some(Money::from_cents(750)));

        assert_eq!((huge * 2).cents(), i64::MAX);
        assert_eq!((huge + huge).cents(), i64::MAX);
        let total: Money = vec![huge, huge, huge].into_iter().sum();
        assert_eq!(total.cents(), i64::MAX);
        assert_eq!(Money::from_cents(i64::MIN).saturating_sub_to_zero(huge), Money::zero());
    }

    #[test]
    fn test_saturating_sub_to_zero() {
        let balance = Money::from_cents(500);
        assert_eq!(
            balance.saturating_sub_to_zero(Money::from_cents(300)),
            Money::from_cents(200)
        );
        assert_eq!(
            balance.saturating_sub_to_zero(Money::from_cents(900)),
            Money::zero()
        );
    }

    #[test]
    fn test_ratio_bps() {
        let profit = Money::from_cents(250);
        assert_eq!(profit.ratio_bps(Money::from_cents(1000)), 2500);
        assert_eq!(profit.ratio_bps(Money::zero()), 0);
        assert_eq!(Money::from_cents(-100).ratio_bps(Money::from_cents(1000)), -1000);
    }
}
