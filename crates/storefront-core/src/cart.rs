//! # Cart Aggregate
//!
//! Each user owns one persisted cart of product references and quantities.
//! Unlike order lines, cart lines carry no price snapshot: the price shown
//! is whatever the catalog says when the cart is read.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  HTTP Request                Rule (this module)      Persistence        │
//! │  ────────────                ──────────────────      ───────────        │
//! │                                                                         │
//! │  POST /api/cart/items ─────► merge_quantity() ─────► upsert cart_item   │
//! │                              ensure_stock()                             │
//! │                                                                         │
//! │  PATCH /api/cart/items/{id} ► ensure_stock() ──────► update quantity    │
//! │                                                                         │
//! │  POST /api/orders ─────────► find_shortfalls() ────► 400 or checkout    │
//! │                                                                         │
//! │  GET /api/cart ────────────► CartView::new() ──────► (read only)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::validation::validate_quantity;
use crate::MAX_ITEM_QUANTITY;

// =============================================================================
// Cart Line
// =============================================================================

/// A cart item joined with the live product row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CartLine {
    pub cart_item_id: i64,
    pub product_id: i64,
    pub name: String,
    pub sku: Option<String>,
    /// Current catalog price in paise.
    pub price_paise: i64,
    pub quantity: i64,
    /// Current stock of the product.
    pub stock: i64,
}

impl CartLine {
    /// Current price × quantity.
    pub fn line_subtotal(&self) -> Money {
        Money::from_paise(self.price_paise).multiply_quantity(self.quantity)
    }

    /// Whether current stock covers the requested quantity.
    pub fn is_available(&self) -> bool {
        self.stock >= self.quantity
    }
}

// =============================================================================
// Cart View
// =============================================================================

/// The cart as returned to the client.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartView {
    pub cart_id: i64,
    pub items: Vec<CartLine>,
    /// Number of distinct products.
    pub item_count: usize,
    /// Sum of quantities.
    pub total_quantity: i64,
    pub subtotal_paise: i64,
}

impl CartView {
    pub fn new(cart_id: i64, items: Vec<CartLine>) -> Self {
        let total_quantity = items.iter().map(|i| i.quantity).sum();
        let subtotal: Money = items.iter().map(CartLine::line_subtotal).sum();
        CartView {
            cart_id,
            item_count: items.len(),
            total_quantity,
            subtotal_paise: subtotal.paise(),
            items,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn subtotal(&self) -> Money {
        Money::from_paise(self.subtotal_paise)
    }
}

// =============================================================================
// Rules
// =============================================================================

/// Quantity after adding `adding` units to an existing line (if any).
///
/// ## Returns
/// - `Err(Validation)` when `adding` is not positive or the merged quantity
///   would exceed MAX_ITEM_QUANTITY
pub fn merge_quantity(existing: Option<i64>, adding: i64) -> CoreResult<i64> {
    validate_quantity(adding)?;
    let merged = existing.unwrap_or(0) + adding;
    if merged > MAX_ITEM_QUANTITY {
        return Err(crate::error::ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        }
        .into());
    }
    Ok(merged)
}

/// Rejects a cart quantity that current stock cannot cover.
pub fn ensure_stock(product_id: i64, name: &str, stock: i64, requested: i64) -> CoreResult<()> {
    validate_quantity(requested)?;
    if stock < requested {
        return Err(CoreError::InsufficientStock {
            product_id,
            name: name.to_string(),
            available: stock.max(0),
            requested,
        });
    }
    Ok(())
}

/// A cart line that current stock cannot cover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockShortfall {
    pub product_id: i64,
    pub name: String,
    pub available: i64,
    pub requested: i64,
}

/// Lists every line whose quantity exceeds current stock.
pub fn find_shortfalls(lines: &[CartLine]) -> Vec<StockShortfall> {
    lines
        .iter()
        .filter(|line| !line.is_available())
        .map(|line| StockShortfall {
            product_id: line.product_id,
            name: line.name.clone(),
            available: line.stock.max(0),
            requested: line.quantity,
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn line(product_id: i64, price_paise: i64, quantity: i64, stock: i64) -> CartLine {
        CartLine {
            cart_item_id: product_id * 10,
            product_id,
            name: format!("Product {}", product_id),
            sku: None,
            price_paise,
            quantity,
            stock,
        }
    }

    #[test]
    fn test_cart_view_totals() {
        let view = CartView::new(1, vec![line(1, 10_000, 2, 10), line(2, 5_000, 1, 10)]);
        assert_eq!(view.item_count, 2);
        assert_eq!(view.total_quantity, 3);
        assert_eq!(view.subtotal_paise, 25_000);
        assert!(!view.is_empty());
    }

    #[test]
    fn test_empty_cart_view() {
        let view = CartView::new(1, vec![]);
        assert!(view.is_empty());
        assert!(view.subtotal().is_zero());
    }

    #[test]
    fn test_merge_quantity() {
        assert_eq!(merge_quantity(None, 3).unwrap(), 3);
        assert_eq!(merge_quantity(Some(2), 3).unwrap(), 5);
        assert!(merge_quantity(Some(998), 2).is_err());
        assert!(merge_quantity(Some(1), 0).is_err());
    }

    #[test]
    fn test_ensure_stock() {
        assert!(ensure_stock(1, "Tea", 5, 5).is_ok());

        let err = ensure_stock(1, "Tea", 2, 5).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientStock {
                available: 2,
                requested: 5,
                ..
            }
        ));
    }

    #[test]
    fn test_find_shortfalls() {
        let lines = vec![line(1, 100, 2, 10), line(2, 100, 4, 3), line(3, 100, 1, 0)];
        let shortfalls = find_shortfalls(&lines);

        assert_eq!(shortfalls.len(), 2);
        assert_eq!(shortfalls[0].product_id, 2);
        assert_eq!(shortfalls[0].available, 3);
        assert_eq!(shortfalls[1].product_id, 3);
    }
}
