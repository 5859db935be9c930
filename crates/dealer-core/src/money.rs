//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Integer Cents, Half-Up Rounding
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Every amount is an i64 count of minor units (fils, cents).            │
//! │                                                                         │
//! │  Percentages are basis points: 500 bps = 5%.                           │
//! │    amount × bps / 10000, rounded half away from zero, per step         │
//! │                                                                         │
//! │    10800.00 × 5%   = 540.00                                            │
//! │    0.10 × 12.5%    = 0.0125 → 0.01                                     │
//! │    0.20 × 12.5%    = 0.025  → 0.03   (half rounds up)                  │
//! │                                                                         │
//! │  Exchange rates are Decimal; the product is rounded to the cent the    │
//! │  same way.                                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use dealer_core::money::Money;
//!
//! let price = Money::from_major(12_000);
//! let line = price * 2;
//! assert_eq!(line.cents(), 2_400_000);
//! ```

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use ts_rs::TS;

use crate::types::Rate;
use crate::BPS_SCALE;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit.
///
/// Currency is carried next to the amount by the owning document
/// (quotation, invoice, expense), never inside `Money` itself.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from whole major units.
    ///
    /// ```rust
    /// use dealer_core::money::Money;
    /// assert_eq!(Money::from_major(12).cents(), 1200);
    /// ```
    #[inline]
    pub const fn from_major(major: i64) -> Self {
        Money(major * 100)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole major-unit portion (truncated toward zero).
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor-unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
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

    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Multiplies a unit price by a quantity.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// `multiply_quantity`, or `None` on overflow.
    #[inline]
    pub const fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Addition, or `None` on overflow.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Applies a basis-point rate and rounds half away from zero.
    ///
    /// Used for percentage discounts and VAT:
    /// ```text
    /// taxable 10800.00
    ///      │
    ///      ▼
    /// percent(500 bps) ← THIS FUNCTION
    ///      │
    ///      ▼
    /// VAT 540.00
    /// ```
    ///
    /// ```rust
    /// use dealer_core::money::Money;
    /// use dealer_core::types::Rate;
    ///
    /// assert_eq!(Money::from_cents(20).percent(Rate::from_bps(1250)).cents(), 3);
    /// assert_eq!(Money::from_cents(-20).percent(Rate::from_bps(1250)).cents(), -3);
    /// ```
    pub fn percent(&self, rate: Rate) -> Money {
        let product = self.0 as i128 * rate.bps() as i128;
        Money(round_half_away(product, BPS_SCALE as i128) as i64)
    }

    /// Converts the amount with a Decimal exchange rate, rounding to the cent.
    ///
    /// Returns `None` when the result does not fit in i64.
    pub fn convert(&self, rate: Decimal) -> Option<Money> {
        (Decimal::from(self.0) * rate)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .map(Money)
    }

    /// Returns the amount as a Decimal in major units (for display/advisory use).
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    /// Integer average rounded half away from zero; zero when `count` is 0.
    pub fn average(&self, count: i64) -> Money {
        if count == 0 {
            return Money::zero();
        }
        Money(round_half_away(self.0 as i128, count as i128) as i64)
    }
}

/// Divides `numerator` by a positive `denominator`, rounding half away from zero.
fn round_half_away(numerator: i128, denominator: i128) -> i128 {
    let half = denominator / 2;
    if numerator >= 0 {
        (numerator + half) / denominator
    } else {
        (numerator - half) / denominator
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Shows the amount as `1234.50` (no currency symbol, the document owns the code).
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor())
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_from_major_and_parts() {
        let money = Money::from_cents(1_234_550);
        assert_eq!(money.major(), 12_345);
        assert_eq!(money.minor(), 50);
        assert_eq!(Money::from_major(12_000).cents(), 1_200_000);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "10.99");
        assert_eq!(Money::from_cents(-550).to_string(), "-5.50");
        assert_eq!(Money::zero().to_string(), "0.00");
    }

    #[test]
    fn test_percent_rounds_half_up() {
        // 0.025 → 0.03
        assert_eq!(Money::from_cents(20).percent(Rate::from_bps(1250)).cents(), 3);
        // 0.0125 → 0.01
        assert_eq!(Money::from_cents(10).percent(Rate::from_bps(1250)).cents(), 1);
        // 10% of 12000.00
        assert_eq!(
            Money::from_major(12_000).percent(Rate::from_bps(1000)),
            Money::from_major(1_200)
        );
    }

    #[test]
    fn test_percent_negative_rounds_away_from_zero() {
        assert_eq!(Money::from_cents(-20).percent(Rate::from_bps(1250)).cents(), -3);
    }

    #[test]
    fn test_convert_with_decimal_rate() {
        let rate = Decimal::from_str("0.272").unwrap();
        assert_eq!(Money::from_major(1000).convert(rate), Some(Money::from_major(272)));

        let rate = Decimal::from_str("3.6725").unwrap();
        // 10.01 × 3.6725 = 36.761725 → 36.76
        assert_eq!(Money::from_cents(1001).convert(rate), Some(Money::from_cents(3676)));
    }

    #[test]
    fn test_sum_and_arithmetic() {
        let amounts = [Money::from_cents(100), Money::from_cents(250), Money::from_cents(-50)];
        let total: Money = amounts.iter().sum();
        assert_eq!(total.cents(), 300);
        assert_eq!((Money::from_cents(500) - Money::from_cents(700)).cents(), -200);
        assert_eq!((-Money::from_cents(5)).cents(), -5);
    }

    #[test]
    fn test_average() {
        assert_eq!(Money::from_cents(1000).average(3).cents(), 333);
        assert_eq!(Money::from_cents(1001).average(2).cents(), 501);
        assert_eq!(Money::from_cents(1000).average(0), Money::zero());
    }
}
