//! Rupee amounts as integer paise.
//!
//! `0.1 + 0.2` is not `0.3` in floating point, and an order's total has to
//! match its invoice and its confirmation email to the paisa. So ₹288.50 is
//! `Money(28850)` from the cart through to the PDF; only presentation turns
//! it back into rupees.
//!
//! ## Usage
//! ```rust
//! use storefront_core::money::Money;
//!
//! let price = Money::from_paise(10_000); // ₹100.00
//! let line = price * 2;                  // ₹200.00
//! assert_eq!(line.to_decimal_string(), "200.00");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::types::TaxRate;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in paise (1 rupee = 100 paise).
///
/// Signed so that refunds and restocking credits can be expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from paise.
    ///
    /// ## Example
    /// ```rust
    /// use storefront_core::money::Money;
    ///
    /// let price = Money::from_paise(1099);
    /// assert_eq!(price.paise(), 1099);
    /// ```
    #[inline]
    pub const fn from_paise(paise: i64) -> Self {
        Money(paise)
    }

    /// Creates a Money value from rupees and paise.
    ///
    /// For negative amounts only the rupee part carries the sign:
    /// `from_rupees_paise(-5, 50)` is -₹5.50.
    #[inline]
    pub const fn from_rupees_paise(rupees: i64, paise: i64) -> Self {
        if rupees < 0 {
            Money(rupees * 100 - paise)
        } else {
            Money(rupees * 100 + paise)
        }
    }

    /// Returns the value in paise.
    #[inline]
    pub const fn paise(&self) -> i64 {
        self.0
    }

    /// Returns the whole-rupee portion (truncated toward zero).
    #[inline]
    pub const fn rupees(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the paise portion (always 0-99).
    #[inline]
    pub const fn paise_part(&self) -> i64 {
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

    /// Checks if the value is negative.
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Calculates tax on this amount, rounding half away from zero to the paisa.
    ///
    /// ## Implementation
    /// Integer math on basis points: `(amount * bps + 5000) / 10000`.
    /// The +5000 is the half-unit that turns truncation into rounding.
    ///
    /// ## Example
    /// ```rust
    /// use storefront_core::money::Money;
    /// use storefront_core::types::TaxRate;
    ///
    /// let line = Money::from_paise(20_000);          // ₹200.00
    /// let tax = line.calculate_tax(TaxRate::from_bps(1800)); // 18%
    /// assert_eq!(tax.paise(), 3_600);                 // ₹36.00
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        // i128 so that large order lines cannot overflow before division
        let product = self.0 as i128 * rate.bps() as i128;
        let tax = if product >= 0 {
            (product + 5000) / 10000
        } else {
            (product - 5000) / 10000
        };
        Money::from_paise(tax as i64)
    }

    /// Unit price times quantity. Saturates instead of wrapping; prices
    /// are capped at `MAX_PRICE_PAISE` on the way in.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }

    /// `None` when the product does not fit in `i64` paise.
    #[inline]
    pub const fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(paise) => Some(Money(paise)),
            None => None,
        }
    }

    /// Formats as a plain two-decimal rupee amount without a currency glyph.
    ///
    /// ```rust
    /// use storefront_core::money::Money;
    ///
    /// assert_eq!(Money::from_paise(28_850).to_decimal_string(), "288.50");
    /// assert_eq!(Money::from_paise(-550).to_decimal_string(), "-5.50");
    /// ```
    pub fn to_decimal_string(&self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        format!("{}{}.{:02}", sign, self.rupees().abs(), self.paise_part())
    }

    /// Formats with the given currency prefix, e.g. `"Rs. "` or `"₹"`.
    pub fn format_with(&self, prefix: &str) -> String {
        if self.0 < 0 {
            format!("-{}{}", prefix, self.abs_decimal())
        } else {
            format!("{}{}", prefix, self.abs_decimal())
        }
    }

    fn abs_decimal(&self) -> String {
        format!("{}.{:02}", self.rupees().abs(), self.paise_part())
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Shows money as `₹12.34`. Presentation layers that cannot render the rupee
/// glyph (builtin PDF fonts) use [`Money::format_with`] instead.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_with("₹"))
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

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        self.multiply_quantity(qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_paise() {
        let money = Money::from_paise(1099);
        assert_eq!(money.paise(), 1099);
        assert_eq!(money.rupees(), 10);
        assert_eq!(money.paise_part(), 99);
    }

    #[test]
    fn test_from_rupees_paise() {
        assert_eq!(Money::from_rupees_paise(10, 99).paise(), 1099);
        assert_eq!(Money::from_rupees_paise(-5, 50).paise(), -550);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_paise(1099)), "₹10.99");
        assert_eq!(format!("{}", Money::from_paise(-550)), "-₹5.50");
        assert_eq!(Money::from_paise(500).format_with("Rs. "), "Rs. 5.00");
        assert_eq!(Money::zero().to_decimal_string(), "0.00");
    }

    #[test]
    fn test_arithmetic_and_sum() {
        let a = Money::from_paise(1000);
        let b = Money::from_paise(500);

        assert_eq!((a + b).paise(), 1500);
        assert_eq!((a - b).paise(), 500);
        assert_eq!((a * 3).paise(), 3000);

        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total.paise(), 2000);
    }

    #[test]
    fn test_gst_on_whole_rupees() {
        // ₹200.00 at 18% = ₹36.00
        let tax = Money::from_paise(20_000).calculate_tax(TaxRate::from_bps(1800));
        assert_eq!(tax.paise(), 3600);

        // ₹50.00 at 5% = ₹2.50
        let tax = Money::from_paise(5_000).calculate_tax(TaxRate::from_bps(500));
        assert_eq!(tax.paise(), 250);
    }

    #[test]
    fn test_tax_rounds_half_up() {
        // ₹0.25 at 18% = 4.5 paise → 5 paise
        let tax = Money::from_paise(25).calculate_tax(TaxRate::from_bps(1800));
        assert_eq!(tax.paise(), 5);

        // ₹0.24 at 18% = 4.32 paise → 4 paise
        let tax = Money::from_paise(24).calculate_tax(TaxRate::from_bps(1800));
        assert_eq!(tax.paise(), 4);
    }

    #[test]
    fn test_quantity_overflow_saturates() {
        let huge = Money::from_paise(i64::MAX / 2);
        assert_eq!((huge * 999).paise(), i64::MAX);
        assert_eq!(huge.checked_multiply_quantity(999), None);
        assert_eq!(
            Money::from_paise(crate::MAX_PRICE_PAISE).checked_multiply_quantity(crate::MAX_ITEM_QUANTITY),
            Some(Money::from_paise(999_000_000_000))
        );
    }

    #[test]
    fn test_zero_rate_is_zero_tax() {
        let tax = Money::from_paise(99_999).calculate_tax(TaxRate::zero());
        assert!(tax.is_zero());
    }
}
