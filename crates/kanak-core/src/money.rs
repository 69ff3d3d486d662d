//! # Money Module
//!
//! Provides the `Money` type for handling rupee amounts safely.
//!
//! ## Why Exact Decimals?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  Jewelry pricing multiplies fractional grams by a per-gram rate:        │
//! │    10.125 g × ₹5500.75 = ₹55695.09375                                  │
//! │  and GST is charged in half percents (1.5% CGST + 1.5% SGST).          │
//! │                                                                         │
//! │  OUR SOLUTION: base-10 Decimal                                          │
//! │    Every intermediate value is exact. Rounding to paise happens         │
//! │    only when a value is displayed or printed.                           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use kanak_core::money::Money;
//!
//! let price = Money::from_paise(1099); // ₹10.99
//!
//! let total = price + Money::from_rupees(5);     // ₹15.99
//! assert_eq!(total.to_string(), "₹15.99");
//! ```

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use ts_rs::TS;

use crate::types::GstRate;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a rupee amount as an exact decimal.
///
/// ## Design Decisions
/// - **Decimal (signed)**: Allows negative values for credit notes and
///   corrections; the tax engine never clamps
/// - **Single field tuple struct**: Zero-cost abstraction over `Decimal`
/// - **Serialized as a string**: `"57500.00"` survives JSON without float loss
///
/// ## User Workflow Context
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                    Where Money is Used                                  │
/// │                                                                         │
/// │  rate_per_gram × weight + making_charges ──► InvoiceItem.price          │
/// │                                                   │                     │
/// │                              CGST / SGST ◄────────┘                     │
/// │                                   │                                     │
/// │  Invoice.subtotal ──► Invoice.grand_total ──► paid_amount / balance     │
/// │                                                                         │
/// │  EVERY monetary value in the system flows through this type            │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(#[ts(as = "String")] Decimal);

impl Money {
    /// Wraps an exact decimal rupee amount.
    #[inline]
    pub const fn new(amount: Decimal) -> Self {
        Money(amount)
    }

    /// Creates a Money value from paise (1/100 rupee).
    ///
    /// ## Example
    /// ```rust
    /// use kanak_core::money::Money;
    ///
    /// let price = Money::from_paise(86_250); // ₹862.50
    /// assert_eq!(price.to_paise(), 86_250);
    /// ```
    #[inline]
    pub fn from_paise(paise: i64) -> Self {
        Money(Decimal::new(paise, 2))
    }

    /// Creates a Money value from whole rupees.
    #[inline]
    pub fn from_rupees(rupees: i64) -> Self {
        Money(Decimal::from(rupees))
    }

    /// Returns the exact decimal amount.
    #[inline]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns the value in whole paise, rounding half to even.
    ///
    /// Values too large for an `i64` saturate.
    pub fn to_paise(&self) -> i64 {
        let paise = self.round_to_paise().0 * Decimal::ONE_HUNDRED;
        i64::try_from(paise).unwrap_or(if paise.is_sign_negative() {
            i64::MIN
        } else {
            i64::MAX
        })
    }

    /// Rounds to two decimal places using Bankers Rounding.
    ///
    /// ## Bankers Rounding Explained
    /// ```text
    /// ┌─────────────────────────────────────────────────────────────────────┐
    /// │  BANKERS ROUNDING (Round Half to Even)                              │
    /// │                                                                     │
    /// │  ₹0.125 → ₹0.12     ₹0.135 → ₹0.14     ₹862.505 → ₹862.50          │
    /// │                                                                     │
    /// │  Over many invoices this avoids a systematic upward drift.          │
    /// └─────────────────────────────────────────────────────────────────────┘
    /// ```
    ///
    /// The GST engine never calls this; stored amounts stay exact and only
    /// presentation rounds.
    ///
    /// ## Example
    /// ```rust
    /// use kanak_core::money::Money;
    /// use rust_decimal::Decimal;
    ///
    /// let amount = Money::new(Decimal::new(125, 3)); // ₹0.125
    /// assert_eq!(amount.round_to_paise(), Money::from_paise(12));
    /// ```
    pub fn round_to_paise(&self) -> Money {
        Money(
            self.0
                .round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven),
        )
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    /// Checks if the value is zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Returns the absolute value.
    #[inline]
    pub fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Applies a percentage rate exactly: `amount × rate / 100`.
    ///
    /// ## Example
    /// ```rust
    /// use kanak_core::money::Money;
    /// use kanak_core::types::GstRate;
    ///
    /// let price = Money::from_rupees(57_500);
    /// let cgst = price.apply_rate(GstRate::from_bps(150)); // 1.5%
    /// assert_eq!(cgst, Money::from_paise(86_250));
    /// ```
    ///
    /// ## User Workflow
    /// ```text
    /// Item price: ₹57,500
    ///      │
    ///      ▼
    /// apply_rate(1.5%) ← THIS FUNCTION (once for CGST, once for SGST)
    ///      │
    ///      ▼
    /// CGST: ₹862.50   SGST: ₹862.50
    /// ```
    pub fn apply_rate(&self, rate: GstRate) -> Money {
        Money(self.0 * rate.percentage() / Decimal::ONE_HUNDRED)
    }

    /// Multiplies by a decimal factor, such as a weight in grams.
    ///
    /// ## Example
    /// ```rust
    /// use kanak_core::money::Money;
    /// use rust_decimal::Decimal;
    ///
    /// let rate_per_gram = Money::from_rupees(5500);
    /// let metal_value = rate_per_gram.multiply(Decimal::from(10));
    /// assert_eq!(metal_value, Money::from_rupees(55_000));
    /// ```
    #[inline]
    pub fn multiply(&self, factor: Decimal) -> Money {
        Money(self.0 * factor)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows rupees rounded to paise, e.g. `₹57500.00` or `-₹5.50`.
///
/// ## Note
/// Grouping (`₹57,500.00`) is a presentation concern and left to the caller.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = self.round_to_paise().0;
        let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
            "-"
        } else {
            ""
        };
        write!(f, "{}₹{:.2}", sign, rounded.abs())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Money(amount)
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

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_from_paise() {
        let money = Money::from_paise(1099);
        assert_eq!(money.amount(), dec!(10.99));
        assert_eq!(money.to_paise(), 1099);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_paise(1099).to_string(), "₹10.99");
        assert_eq!(Money::from_rupees(57_500).to_string(), "₹57500.00");
        assert_eq!(Money::from_paise(-550).to_string(), "-₹5.50");
        assert_eq!(Money::zero().to_string(), "₹0.00");
        assert_eq!(Money::new(dec!(862.505)).to_string(), "₹862.50");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_rupees(10);
        let b = Money::from_rupees(5);

        assert_eq!(a + b, Money::from_rupees(15));
        assert_eq!(a - b, Money::from_rupees(5));

        let mut c = a;
        c += b;
        c -= Money::from_paise(50);
        assert_eq!(c, Money::new(dec!(14.50)));
    }

    #[test]
    fn test_apply_rate_is_exact() {
        let price = Money::new(dec!(333.33));
        let tax = price.apply_rate(GstRate::from_percentage(dec!(1.5)));
        // 333.33 × 1.5 / 100 = 4.99995, kept exact
        assert_eq!(tax.amount(), dec!(4.99995));
        assert_eq!(tax.round_to_paise(), Money::from_paise(500));
    }

    #[test]
    fn test_bankers_rounding() {
        assert_eq!(Money::new(dec!(0.125)).round_to_paise(), Money::from_paise(12));
        assert_eq!(Money::new(dec!(0.135)).round_to_paise(), Money::from_paise(14));
        assert_eq!(Money::new(dec!(-0.125)).round_to_paise(), Money::from_paise(-12));
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());

        let negative = Money::from_paise(-100);
        assert!(negative.is_negative());
        assert_eq!(negative.abs(), Money::from_rupees(1));
    }

    #[test]
    fn test_multiply_by_weight() {
        let rate = Money::new(dec!(5500.75));
        assert_eq!(rate.multiply(dec!(10.125)).amount(), dec!(55695.09375));
    }

    #[test]
    fn test_sum() {
        let amounts = [Money::from_rupees(1), Money::from_paise(50), Money::from_paise(25)];
        let total: Money = amounts.iter().sum();
        assert_eq!(total, Money::from_paise(175));
    }

    #[test]
    fn test_serializes_as_string() {
        let json = serde_json::to_string(&Money::from_paise(86_250)).unwrap();
        assert_eq!(json, "\"862.50\"");
        let back: Money = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Money::from_paise(86_250));
    }
}
