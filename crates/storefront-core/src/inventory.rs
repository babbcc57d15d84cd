//! # Inventory Decisions
//!
//! The pure half of the inventory guard: given what the database returned,
//! decide whether a quantity can be sold. The decrement itself is a single
//! conditional `UPDATE` in storefront-db.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::Product;

/// Decision record returned by an inventory check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InventoryCheck {
    pub exists: bool,
    pub available: i64,
    pub sufficient: bool,
    pub message: String,
}

/// Checks whether `requested` units of `product` are available.
///
/// ```rust
/// use storefront_core::inventory::check_inventory;
///
/// let check = check_inventory(None, 1);
/// assert!(!check.exists);
/// assert!(!check.sufficient);
/// ```
pub fn check_inventory(product: Option<&Product>, requested: i64) -> InventoryCheck {
    let Some(product) = product else {
        return InventoryCheck {
            exists: false,
            available: 0,
            sufficient: false,
            message: "Product not found".to_string(),
        };
    };

    let available = product.quantity.max(0);
    if product.can_sell(requested) {
        InventoryCheck {
            exists: true,
            available,
            sufficient: true,
            message: "In stock".to_string(),
        }
    } else if available == 0 {
        InventoryCheck {
            exists: true,
            available,
            sufficient: false,
            message: format!("{} is out of stock", product.name),
        }
    } else {
        InventoryCheck {
            exists: true,
            available,
            sufficient: false,
            message: format!("Only {} {} left in stock", available, product.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(quantity: i64) -> Product {
        Product {
            product_id: 3,
            name: "Ghee 1L".to_string(),
            sku: None,
            price_paise: 65_000,
            regular_price_paise: Some(70_000),
            quantity,
            hsn_code_id: None,
            is_branded: true,
            is_packaged: true,
            custom_gst_rate_id: None,
            category_id: None,
        }
    }

    #[test]
    fn test_sufficient_stock() {
        let check = check_inventory(Some(&product(5)), 5);
        assert!(check.exists);
        assert!(check.sufficient);
        assert_eq!(check.available, 5);
    }

    #[test]
    fn test_insufficient_stock() {
        let check = check_inventory(Some(&product(3)), 5);
        assert!(!check.sufficient);
        assert_eq!(check.available, 3);
        assert_eq!(check.message, "Only 3 Ghee 1L left in stock");
    }

    #[test]
    fn test_out_of_stock() {
        let check = check_inventory(Some(&product(0)), 1);
        assert!(!check.sufficient);
        assert_eq!(check.message, "Ghee 1L is out of stock");
    }
}
