//! # Checkout Math
//!
//! Turns priced cart lines into taxed lines and order totals.
//!
//! ## Calculation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  For each line:                                                         │
//! │    subtotal   = unit_price × quantity                                   │
//! │    tax_amount = round_half_up(subtotal × bps / 10000)                   │
//! │    total      = subtotal + tax_amount                                   │
//! │                                                                         │
//! │  For the cart:                                                          │
//! │    subtotal   = Σ line.subtotal                                         │
//! │    total_tax  = Σ line.tax_amount      (sum of ROUNDED line taxes)      │
//! │    total      = subtotal + total_tax  == Σ line.total                   │
//! │                                                                         │
//! │  Example:                                                               │
//! │    A: ₹100 × 2 @ 18%  → 200.00 + 36.00                                  │
//! │    B: ₹50  × 1 @ 5%   →  50.00 +  2.50                                  │
//! │    ─────────────────────────────────                                    │
//! │    subtotal 250.00, total_tax 38.50, total 288.50                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A line whose tax lookup failed arrives with `tax: None` and is charged 0%.
//! Only integer sums are involved, so the result does not depend on line order.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{GstRate, TaxRate};

// =============================================================================
// Input
// =============================================================================

/// Tax information resolved for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineTax {
    pub rate: GstRate,
    /// The product's HSN code string, snapshotted onto the order line.
    pub hsn_code: Option<String>,
}

/// A cart line with its current catalog price and, if it resolved, its tax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub product_id: i64,
    pub name: String,
    pub sku: Option<String>,
    pub quantity: i64,
    pub unit_price: Money,
    pub tax: Option<LineTax>,
}

// =============================================================================
// Output
// =============================================================================

/// A cart line with tax applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxedLine {
    pub product_id: i64,
    pub name: String,
    pub sku: Option<String>,
    pub quantity: i64,
    pub price_paise: i64,
    pub subtotal_paise: i64,
    pub tax_rate_bps: u32,
    pub tax_rate_name: String,
    pub tax_amount_paise: i64,
    pub total_paise: i64,
    pub hsn_code: Option<String>,
}

impl TaxedLine {
    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.tax_rate_bps)
    }
}

/// Result of [`calculate_cart_taxes`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartTaxes {
    pub items: Vec<TaxedLine>,
    pub subtotal_paise: i64,
    pub total_tax_paise: i64,
    pub total_paise: i64,
}

impl CartTaxes {
    pub fn subtotal(&self) -> Money {
        Money::from_paise(self.subtotal_paise)
    }

    pub fn total_tax(&self) -> Money {
        Money::from_paise(self.total_tax_paise)
    }

    pub fn total(&self) -> Money {
        Money::from_paise(self.total_paise)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// =============================================================================
// Calculation
// =============================================================================

/// Applies tax to one line.
pub fn tax_line(line: &PricedLine) -> TaxedLine {
    let (rate, rate_name, hsn_code) = match &line.tax {
        Some(tax) => (tax.rate.rate(), tax.rate.rate_name.clone(), tax.hsn_code.clone()),
        None => (TaxRate::zero(), GstRate::NONE_NAME.to_string(), None),
    };

    let subtotal = line.unit_price.multiply_quantity(line.quantity);
    let tax_amount = subtotal.calculate_tax(rate);

    TaxedLine {
        product_id: line.product_id,
        name: line.name.clone(),
        sku: line.sku.clone(),
        quantity: line.quantity,
        price_paise: line.unit_price.paise(),
        subtotal_paise: subtotal.paise(),
        tax_rate_bps: rate.bps(),
        tax_rate_name: rate_name,
        tax_amount_paise: tax_amount.paise(),
        total_paise: (subtotal + tax_amount).paise(),
        hsn_code,
    }
}

/// Taxes every line and totals the cart.
///
/// ## Example
/// ```rust
/// use storefront_core::checkout::{calculate_cart_taxes, LineTax, PricedLine};
/// use storefront_core::money::Money;
/// use storefront_core::types::GstRate;
///
/// let gst = |bps| Some(LineTax {
///     rate: GstRate { rate_id: 1, rate_name: "Slab".into(), percentage_bps: bps, description: None },
///     hsn_code: None,
/// });
/// let lines = vec![
///     PricedLine { product_id: 1, name: "A".into(), sku: None, quantity: 2, unit_price: Money::from_paise(10_000), tax: gst(1800) },
///     PricedLine { product_id: 2, name: "B".into(), sku: None, quantity: 1, unit_price: Money::from_paise(5_000), tax: gst(500) },
/// ];
///
/// let taxes = calculate_cart_taxes(&lines);
/// assert_eq!(taxes.subtotal_paise, 25_000);
/// assert_eq!(taxes.total_tax_paise, 3_850);
/// assert_eq!(taxes.total_paise, 28_850);
/// ```
pub fn calculate_cart_taxes(lines: &[PricedLine]) -> CartTaxes {
    let items: Vec<TaxedLine> = lines.iter().map(tax_line).collect();

    let subtotal: i64 = items.iter().map(|i| i.subtotal_paise).sum();
    let total_tax: i64 = items.iter().map(|i| i.tax_amount_paise).sum();

    CartTaxes {
        items,
        subtotal_paise: subtotal,
        total_tax_paise: total_tax,
        total_paise: subtotal + total_tax,
    }
}

// =============================================================================
// Price With Tax
// =============================================================================

/// Price quote for `quantity` units of a product, tax included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PriceWithTax {
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price_paise: i64,
    pub subtotal_paise: i64,
    pub tax_rate_bps: u32,
    pub tax_rate_name: String,
    pub tax_amount_paise: i64,
    pub total_paise: i64,
}

/// Quotes a product price with the resolved rate applied.
pub fn price_with_tax(product_id: i64, unit_price: Money, quantity: i64, rate: &GstRate) -> PriceWithTax {
    let subtotal = unit_price.multiply_quantity(quantity);
    let tax = subtotal.calculate_tax(rate.rate());
    PriceWithTax {
        product_id,
        quantity,
        unit_price_paise: unit_price.paise(),
        subtotal_paise: subtotal.paise(),
        tax_rate_bps: rate.percentage_bps,
        tax_rate_name: rate.rate_name.clone(),
        tax_amount_paise: tax.paise(),
        total_paise: (subtotal + tax).paise(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn rate(bps: u32) -> GstRate {
        GstRate {
            rate_id: bps as i64,
            rate_name: format!("GST {}", bps),
            percentage_bps: bps,
            description: None,
        }
    }

    fn line(product_id: i64, price_paise: i64, quantity: i64, bps: Option<u32>) -> PricedLine {
        PricedLine {
            product_id,
            name: format!("Product {}", product_id),
            sku: None,
            quantity,
            unit_price: Money::from_paise(price_paise),
            tax: bps.map(|b| LineTax {
                rate: rate(b),
                hsn_code: Some("1001".to_string()),
            }),
        }
    }

    #[test]
    fn test_mixed_rate_cart() {
        let taxes = calculate_cart_taxes(&[line(1, 10_000, 2, Some(1800)), line(2, 5_000, 1, Some(500))]);

        assert_eq!(taxes.subtotal_paise, 25_000);
        assert_eq!(taxes.total_tax_paise, 3_850);
        assert_eq!(taxes.total_paise, 28_850);
        assert_eq!(taxes.items[0].tax_amount_paise, 3_600);
        assert_eq!(taxes.items[1].tax_amount_paise, 250);
    }

    #[test]
    fn test_failed_lookup_is_zero_rated() {
        let taxes = calculate_cart_taxes(&[line(1, 10_000, 1, None), line(2, 10_000, 1, Some(1800))]);

        assert_eq!(taxes.items[0].tax_rate_bps, 0);
        assert_eq!(taxes.items[0].tax_amount_paise, 0);
        assert_eq!(taxes.items[0].hsn_code, None);
        assert_eq!(taxes.total_tax_paise, 1_800);
    }

    #[test]
    fn test_line_order_does_not_matter() {
        let a = line(1, 3_333, 3, Some(1800));
        let b = line(2, 1_999, 7, Some(500));
        let c = line(3, 12_345, 1, Some(2800));

        let forward = calculate_cart_taxes(&[a.clone(), b.clone(), c.clone()]);
        let reverse = calculate_cart_taxes(&[c, b, a]);

        assert_eq!(forward.subtotal_paise, reverse.subtotal_paise);
        assert_eq!(forward.total_tax_paise, reverse.total_tax_paise);
        assert_eq!(forward.total_paise, reverse.total_paise);
    }

    #[test]
    fn test_calculation_is_idempotent() {
        let lines = vec![line(1, 999, 3, Some(1200)), line(2, 1, 1, Some(1800))];
        assert_eq!(calculate_cart_taxes(&lines), calculate_cart_taxes(&lines));
    }

    #[test]
    fn test_line_totals_sum_to_cart_total() {
        let taxes = calculate_cart_taxes(&[
            line(1, 3_333, 3, Some(1800)),
            line(2, 1_999, 7, Some(500)),
            line(3, 25, 1, Some(1800)),
        ]);

        let line_sum: i64 = taxes.items.iter().map(|i| i.subtotal_paise + i.tax_amount_paise).sum();
        assert_eq!(line_sum, taxes.total_paise);
        assert_eq!(taxes.subtotal_paise + taxes.total_tax_paise, taxes.total_paise);
    }

    #[test]
    fn test_empty_cart() {
        let taxes = calculate_cart_taxes(&[]);
        assert!(taxes.is_empty());
        assert_eq!(taxes.total_paise, 0);
    }

    #[test]
    fn test_price_with_tax() {
        let quote = price_with_tax(9, Money::from_paise(10_000), 3, &rate(1200));
        assert_eq!(quote.subtotal_paise, 30_000);
        assert_eq!(quote.tax_amount_paise, 3_600);
        assert_eq!(quote.total_paise, 33_600);
    }
}
