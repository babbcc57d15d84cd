//! # Cart Repository
//!
//! One cart per user, created on first use. Cart items hold a product
//! reference and a quantity; prices are read live from `products`.
//!
//! ## Cart Creation
//! ```text
//! INSERT INTO carts (user_id) VALUES (?)
//! ON DUPLICATE KEY UPDATE cart_id = LAST_INSERT_ID(cart_id)
//!
//! → last_insert_id() is the cart's id whether it was just created or not
//! ```

use sqlx::{Executor, MySql, MySqlConnection, MySqlPool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::product::fetch_product;
use storefront_core::cart::{ensure_stock, merge_quantity, CartLine, CartView};
use storefront_core::validation::validate_cart_size;

const LINE_QUERY: &str = "SELECT ci.cart_item_id, ci.product_id, p.name, p.sku, p.price_paise, \
     ci.quantity, p.quantity AS stock \
     FROM cart_items ci \
     JOIN carts c ON c.cart_id = ci.cart_id \
     JOIN products p ON p.product_id = ci.product_id \
     WHERE c.user_id = ? \
     ORDER BY ci.cart_item_id";

/// Loads a user's cart lines joined with live product data.
pub(crate) async fn fetch_lines<'e, E>(executor: E, user_id: i64) -> DbResult<Vec<CartLine>>
where
    E: Executor<'e, Database = MySql>,
{
    let lines = sqlx::query_as::<_, CartLine>(LINE_QUERY)
        .bind(user_id)
        .fetch_all(executor)
        .await?;

    Ok(lines)
}

/// Empties a user's cart on the given connection (used by checkout).
pub(crate) async fn clear_for_user(conn: &mut MySqlConnection, user_id: i64) -> DbResult<u64> {
    let result = sqlx::query(
        "DELETE ci FROM cart_items ci JOIN carts c ON c.cart_id = ci.cart_id WHERE c.user_id = ?",
    )
    .bind(user_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

/// Repository for cart database operations.
#[derive(Debug, Clone)]
pub struct CartRepository {
    pool: MySqlPool,
}

impl CartRepository {
    /// Creates a new CartRepository.
    pub fn new(pool: MySqlPool) -> Self {
        CartRepository { pool }
    }

    /// Returns the user's cart id, creating the cart if needed.
    pub async fn get_or_create(&self, user_id: i64) -> DbResult<i64> {
        let result = sqlx::query(
            "INSERT INTO carts (user_id) VALUES (?) \
             ON DUPLICATE KEY UPDATE cart_id = LAST_INSERT_ID(cart_id)",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_id() as i64)
    }

    pub async fn lines(&self, user_id: i64) -> DbResult<Vec<CartLine>> {
        fetch_lines(&self.pool, user_id).await
    }

    pub async fn view(&self, user_id: i64) -> DbResult<CartView> {
        let cart_id = self.get_or_create(user_id).await?;
        let lines = self.lines(user_id).await?;
        Ok(CartView::new(cart_id, lines))
    }

    /// Adds units of a product, merging with an existing line.
    ///
    /// ## Returns
    /// - `Err(NotFound)` for an unknown product
    /// - `Err(Core(InsufficientStock))` when stock can't cover the new total
    pub async fn add_item(&self, user_id: i64, product_id: i64, quantity: i64) -> DbResult<CartView> {
        let cart_id = self.get_or_create(user_id).await?;
        let product = fetch_product(&self.pool, product_id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", product_id))?;

        let lines = self.lines(user_id).await?;
        let existing = lines.iter().find(|l| l.product_id == product_id).map(|l| l.quantity);
        if existing.is_none() {
            validate_cart_size(lines.len())?;
        }

        let merged = merge_quantity(existing, quantity)?;
        ensure_stock(product_id, &product.name, product.quantity, merged)?;

        sqlx::query(
            "INSERT INTO cart_items (cart_id, product_id, quantity) VALUES (?, ?, ?) \
             ON DUPLICATE KEY UPDATE quantity = VALUES(quantity)",
        )
        .bind(cart_id)
        .bind(product_id)
        .bind(merged)
        .execute(&self.pool)
        .await?;

        debug!(user_id, product_id, quantity = merged, "Cart item stored");
        self.view(user_id).await
    }

    /// Sets a line's quantity. Zero removes the line.
    pub async fn update_item(&self, user_id: i64, product_id: i64, quantity: i64) -> DbResult<CartView> {
        if quantity == 0 {
            return self.remove_item(user_id, product_id).await;
        }

        let product = fetch_product(&self.pool, product_id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", product_id))?;
        ensure_stock(product_id, &product.name, product.quantity, quantity)?;

        let result = sqlx::query(
            "UPDATE cart_items ci JOIN carts c ON c.cart_id = ci.cart_id \
             SET ci.quantity = ? WHERE c.user_id = ? AND ci.product_id = ?",
        )
        .bind(quantity)
        .bind(user_id)
        .bind(product_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // MySQL reports 0 when the value is unchanged, so check the line exists.
            let lines = self.lines(user_id).await?;
            if !lines.iter().any(|l| l.product_id == product_id) {
                return Err(DbError::not_found("Cart item", product_id));
            }
        }

        self.view(user_id).await
    }

    pub async fn remove_item(&self, user_id: i64, product_id: i64) -> DbResult<CartView> {
        let result = sqlx::query(
            "DELETE ci FROM cart_items ci JOIN carts c ON c.cart_id = ci.cart_id \
             WHERE c.user_id = ? AND ci.product_id = ?",
        )
        .bind(user_id)
        .bind(product_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Cart item", product_id));
        }

        self.view(user_id).await
    }

    pub async fn clear(&self, user_id: i64) -> DbResult<CartView> {
        let mut conn = self.pool.acquire().await?;
        let removed = clear_for_user(&mut conn, user_id).await?;
        drop(conn);

        info!(user_id, removed, "Cart cleared");
        self.view(user_id).await
    }
}
