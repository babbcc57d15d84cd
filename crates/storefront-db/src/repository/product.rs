//! # Product Repository
//!
//! Database operations for products: the inventory guard and the product's
//! tax classification.
//!
//! ## Inventory Guard
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  check_inventory(id, qty)    pure read → InventoryCheck                 │
//! │                                                                         │
//! │  reduce_inventory(id, qty)   ONE conditional statement:                 │
//! │                                                                         │
//! │    UPDATE products SET quantity = quantity - ?                          │
//! │    WHERE product_id = ? AND quantity >= ?                               │
//! │                                                                         │
//! │    rows_affected = 1 → stock taken                                      │
//! │    rows_affected = 0 → InsufficientStock (or NotFound)                  │
//! │                                                                         │
//! │  Two concurrent checkouts for the last unit cannot both succeed: the    │
//! │  row lock serializes them and the second sees quantity = 0.             │
//! │                                                                         │
//! │  update_product_quantity(id, delta)   additive, used for restocking     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::{Executor, MySql, MySqlConnection, MySqlPool, QueryBuilder};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::gst::GstRateRepository;
use storefront_core::checkout::{price_with_tax, PriceWithTax};
use storefront_core::inventory::{check_inventory, InventoryCheck};
use storefront_core::validation::{validate_price_paise, validate_quantity, validate_required_text};
use storefront_core::{CoreError, Money, Product, ProductTaxUpdate};

pub(crate) const PRODUCT_COLUMNS: &str = "product_id, name, sku, price_paise, regular_price_paise, \
     quantity, hsn_code_id, is_branded, is_packaged, custom_gst_rate_id, category_id";

// =============================================================================
// Executor-generic helpers (usable inside transactions)
// =============================================================================

/// Loads a product on any executor (pool or open transaction).
pub(crate) async fn fetch_product<'e, E>(executor: E, product_id: i64) -> DbResult<Option<Product>>
where
    E: Executor<'e, Database = MySql>,
{
    let product = sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE product_id = ?"
    ))
    .bind(product_id)
    .fetch_optional(executor)
    .await?;

    Ok(product)
}

/// Takes `quantity` units of stock with a single conditional update.
///
/// ## Returns
/// - `Err(Core(InsufficientStock))` if stock is short
/// - `Err(NotFound)` if the product doesn't exist
pub(crate) async fn decrement_stock(
    conn: &mut MySqlConnection,
    product_id: i64,
    quantity: i64,
) -> DbResult<()> {
    validate_quantity(quantity)?;

    let result = sqlx::query(
        "UPDATE products SET quantity = quantity - ? WHERE product_id = ? AND quantity >= ?",
    )
    .bind(quantity)
    .bind(product_id)
    .bind(quantity)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 1 {
        debug!(product_id, quantity, "Stock decremented");
        return Ok(());
    }

    match fetch_product(&mut *conn, product_id).await? {
        Some(product) => Err(CoreError::InsufficientStock {
            product_id,
            name: product.name,
            available: product.quantity,
            requested: quantity,
        }
        .into()),
        None => Err(DbError::not_found("Product", product_id)),
    }
}

/// Adds `delta` (possibly negative) to stock, refusing to go below zero.
pub(crate) async fn adjust_stock(conn: &mut MySqlConnection, product_id: i64, delta: i64) -> DbResult<()> {
    if delta == 0 {
        return match fetch_product(&mut *conn, product_id).await? {
            Some(_) => Ok(()),
            None => Err(DbError::not_found("Product", product_id)),
        };
    }

    let result = sqlx::query(
        "UPDATE products SET quantity = quantity + ? WHERE product_id = ? AND quantity + ? >= 0",
    )
    .bind(delta)
    .bind(product_id)
    .bind(delta)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 1 {
        debug!(product_id, delta, "Stock adjusted");
        return Ok(());
    }

    match fetch_product(&mut *conn, product_id).await? {
        Some(product) => Err(CoreError::InsufficientStock {
            product_id,
            name: product.name,
            available: product.quantity,
            requested: -delta,
        }
        .into()),
        None => Err(DbError::not_found("Product", product_id)),
    }
}

/// Builds the single UPDATE for a typed tax update.
fn tax_update_query(product_id: i64, update: &ProductTaxUpdate) -> QueryBuilder<'static, MySql> {
    let mut builder = QueryBuilder::new("UPDATE products SET ");
    {
        let mut set = builder.separated(", ");
        if let Some(hsn_code_id) = update.hsn_code_id {
            set.push("hsn_code_id = ").push_bind_unseparated(hsn_code_id);
        }
        if let Some(is_branded) = update.is_branded {
            set.push("is_branded = ").push_bind_unseparated(is_branded);
        }
        if let Some(is_packaged) = update.is_packaged {
            set.push("is_packaged = ").push_bind_unseparated(is_packaged);
        }
        if let Some(custom_gst_rate_id) = update.custom_gst_rate_id {
            set.push("custom_gst_rate_id = ")
                .push_bind_unseparated(custom_gst_rate_id);
        }
    }
    builder.push(" WHERE product_id = ").push_bind(product_id);
    builder
}

// =============================================================================
// Repository
// =============================================================================

/// Input for inserting a product (seeding and tests; the catalog service
/// owns product editing).
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub sku: Option<String>,
    pub price_paise: i64,
    pub regular_price_paise: Option<i64>,
    pub quantity: i64,
    pub hsn_code_id: Option<i64>,
    pub is_branded: bool,
    pub is_packaged: bool,
    pub custom_gst_rate_id: Option<i64>,
    pub category_id: Option<i64>,
}

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: MySqlPool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: MySqlPool) -> Self {
        ProductRepository { pool }
    }

    pub async fn find(&self, product_id: i64) -> DbResult<Option<Product>> {
        fetch_product(&self.pool, product_id).await
    }

    /// Gets a product by ID, failing with NotFound.
    pub async fn get(&self, product_id: i64) -> DbResult<Product> {
        self.find(product_id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", product_id))
    }

    /// Inserts a product and returns it with its new ID.
    pub async fn insert(&self, input: NewProduct) -> DbResult<Product> {
        validate_required_text("name", &input.name, 200)?;
        validate_price_paise(input.price_paise)?;

        debug!(name = %input.name, "Inserting product");

        let result = sqlx::query(
            "INSERT INTO products (name, sku, price_paise, regular_price_paise, quantity, \
             hsn_code_id, is_branded, is_packaged, custom_gst_rate_id, category_id) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&input.name)
        .bind(&input.sku)
        .bind(input.price_paise)
        .bind(input.regular_price_paise)
        .bind(input.quantity)
        .bind(input.hsn_code_id)
        .bind(input.is_branded)
        .bind(input.is_packaged)
        .bind(input.custom_gst_rate_id)
        .bind(input.category_id)
        .execute(&self.pool)
        .await?;

        self.get(result.last_insert_id() as i64).await
    }

    /// Reports whether `quantity` units are available. Read only.
    pub async fn check_inventory(&self, product_id: i64, quantity: i64) -> DbResult<InventoryCheck> {
        validate_quantity(quantity)?;
        let product = self.find(product_id).await?;
        Ok(check_inventory(product.as_ref(), quantity))
    }

    /// Takes stock outside of an order (the order pipeline decrements inside
    /// its own transaction).
    pub async fn reduce_inventory(&self, product_id: i64, quantity: i64) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        decrement_stock(&mut conn, product_id, quantity).await?;
        info!(product_id, quantity, "Inventory reduced");
        Ok(())
    }

    /// Additive stock adjustment (positive restocks, negative takes).
    pub async fn update_product_quantity(&self, product_id: i64, delta: i64) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        adjust_stock(&mut conn, product_id, delta).await?;
        info!(product_id, delta, "Inventory adjusted");
        Ok(())
    }

    /// Applies a typed tax update and returns the updated product.
    pub async fn update_tax_settings(&self, product_id: i64, update: &ProductTaxUpdate) -> DbResult<Product> {
        let mut tx = self.pool.begin().await?;

        if fetch_product(&mut *tx, product_id).await?.is_none() {
            return Err(DbError::not_found("Product", product_id));
        }
        if !update.is_empty() {
            ensure_tax_references(&mut *tx, update).await?;
            tax_update_query(product_id, update)
                .build()
                .execute(&mut *tx)
                .await?;
        }

        let product = fetch_product(&mut *tx, product_id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", product_id))?;
        tx.commit().await?;

        info!(product_id, "Product tax settings updated");
        Ok(product)
    }

    /// Applies the same tax update to many products, all or nothing.
    ///
    /// ## Returns
    /// Number of products updated, or the first error (nothing is written).
    pub async fn bulk_update_tax(&self, product_ids: &[i64], update: &ProductTaxUpdate) -> DbResult<u64> {
        if update.is_empty() || product_ids.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        ensure_tax_references(&mut *tx, update).await?;

        let mut updated = 0;
        for &product_id in product_ids {
            if fetch_product(&mut *tx, product_id).await?.is_none() {
                return Err(DbError::not_found("Product", product_id));
            }
            tax_update_query(product_id, update)
                .build()
                .execute(&mut *tx)
                .await?;
            updated += 1;
        }

        tx.commit().await?;
        info!(count = updated, "Bulk tax update applied");
        Ok(updated)
    }

    /// Quotes `quantity` units of a product with its resolved GST applied.
    pub async fn price_with_tax(&self, product_id: i64, quantity: i64) -> DbResult<PriceWithTax> {
        validate_quantity(quantity)?;
        let product = self.get(product_id).await?;
        let (resolved, _) = GstRateRepository::new(self.pool.clone())
            .resolve_for(&product)
            .await?;
        Ok(price_with_tax(
            product.product_id,
            Money::from_paise(product.price_paise),
            quantity,
            &resolved.rate,
        ))
    }
}

/// Rejects updates that point at HSN codes or rates that don't exist.
async fn ensure_tax_references(conn: &mut MySqlConnection, update: &ProductTaxUpdate) -> DbResult<()> {
    if let Some(Some(hsn_code_id)) = update.hsn_code_id {
        let found: Option<i64> = sqlx::query_scalar("SELECT hsn_code_id FROM hsn_codes WHERE hsn_code_id = ?")
            .bind(hsn_code_id)
            .fetch_optional(&mut *conn)
            .await?;
        if found.is_none() {
            return Err(DbError::not_found("HSN code", hsn_code_id));
        }
    }
    if let Some(Some(rate_id)) = update.custom_gst_rate_id {
        let found: Option<i64> = sqlx::query_scalar("SELECT rate_id FROM gst_rates WHERE rate_id = ?")
            .bind(rate_id)
            .fetch_optional(&mut *conn)
            .await?;
        if found.is_none() {
            return Err(DbError::not_found("GST rate", rate_id));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tax_update_sql_lists_only_present_fields() {
        let update = ProductTaxUpdate {
            hsn_code_id: Some(None),
            is_branded: Some(true),
            is_packaged: None,
            custom_gst_rate_id: None,
        };
        let builder = tax_update_query(4, &update);
        assert_eq!(
            builder.sql(),
            "UPDATE products SET hsn_code_id = ?, is_branded = ? WHERE product_id = ?"
        );
    }

    #[test]
    fn test_tax_update_sql_all_fields() {
        let update = ProductTaxUpdate {
            hsn_code_id: Some(Some(1)),
            is_branded: Some(false),
            is_packaged: Some(true),
            custom_gst_rate_id: Some(Some(2)),
        };
        let builder = tax_update_query(4, &update);
        assert_eq!(
            builder.sql(),
            "UPDATE products SET hsn_code_id = ?, is_branded = ?, is_packaged = ?, \
             custom_gst_rate_id = ? WHERE product_id = ?"
        );
    }
}
