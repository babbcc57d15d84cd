//! # Order Repository
//!
//! The order / tax pipeline: cart taxes, atomic order creation, the status
//! machine with restocking, and the tax invoice.
//!
//! ## Order Creation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       create_order_with_tax                             │
//! │                                                                         │
//! │  1. calculate_taxes_for_lines(cart)      reads only, fail-soft per line │
//! │                                                                         │
//! │  2. BEGIN                                                               │
//! │     ├── INSERT orders (totals, 'pending')                               │
//! │     ├── for each taxed line:                                            │
//! │     │     UPDATE products ... WHERE quantity >= ?   (0 rows → abort)    │
//! │     │     INSERT order_items (price, rate, tax, hsn snapshots)          │
//! │     └── DELETE cart_items of the user                                   │
//! │     COMMIT                   any error → ROLLBACK, nothing persisted    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Cancellation
//! ```text
//! UPDATE orders SET status = 'cancelled'
//!  WHERE order_id = ? AND status IN ('pending', 'processing')
//!      │ committed
//!      ▼
//! for each item: restock (one retry) ── failure → error! log,
//!                                       inventory_restored = false
//! ```

use serde::Serialize;
use sqlx::{Executor, MySql, MySqlPool};
use tracing::{debug, error, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::cart::{clear_for_user, fetch_lines};
use crate::repository::gst::GstRateRepository;
use crate::repository::product::{adjust_stock, decrement_stock, fetch_product};
use storefront_core::cart::CartLine;
use storefront_core::checkout::{calculate_cart_taxes, CartTaxes, LineTax, PricedLine};
use storefront_core::invoice::{build_invoice, InvoiceItemRow, TaxInvoice};
use storefront_core::{
    Address, CoreError, Customer, Money, Order, OrderItem, OrderStatus, PaymentMethod,
};

const ORDER_COLUMNS: &str = "order_id, user_id, address_id, subtotal_paise, total_tax_paise, \
     total_price_paise, status, payment_method, created_at, updated_at";

const ITEM_COLUMNS: &str = "order_item_id, order_id, product_id, quantity, price_paise, \
     tax_rate_bps, tax_amount_paise, hsn_code";

/// What the checkout request supplies besides the cart.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: i64,
    pub address_id: i64,
    pub payment_method: PaymentMethod,
}

/// An order together with its lines.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Result of a status change.
#[derive(Debug, Clone, Serialize)]
pub struct StatusChange {
    pub order: Order,
    /// Set only for cancellations: whether every line was restocked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inventory_restored: Option<bool>,
    /// Products whose restock failed after the retry.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub restock_failures: Vec<i64>,
}

impl StatusChange {
    /// Outcome of a cancellation whose restock left `restock_failures` short.
    pub fn cancelled(order: Order, restock_failures: Vec<i64>) -> Self {
        StatusChange {
            order,
            inventory_restored: Some(restock_failures.is_empty()),
            restock_failures,
        }
    }

    /// True when a cancellation could not credit every line back.
    pub fn restock_incomplete(&self) -> bool {
        self.inventory_restored == Some(false)
    }
}

/// Runs `attempt(1)`, and `attempt(2)` if the first one fails.
async fn retry_once<F, Fut, T>(mut attempt: F) -> DbResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = DbResult<T>>,
{
    match attempt(1).await {
        Ok(value) => Ok(value),
        Err(first) => {
            debug!(error = %first, "First attempt failed");
            attempt(2).await
        }
    }
}

async fn fetch_order<'e, E>(executor: E, order_id: i64) -> DbResult<Option<Order>>
where
    E: Executor<'e, Database = MySql>,
{
    let order = sqlx::query_as::<_, Order>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE order_id = ?"
    ))
    .bind(order_id)
    .fetch_optional(executor)
    .await?;

    Ok(order)
}

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: MySqlPool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: MySqlPool) -> Self {
        OrderRepository { pool }
    }

    // =========================================================================
    // Taxes
    // =========================================================================

    /// Taxes the given cart lines at current prices and rates.
    ///
    /// A line whose product or rate lookup fails is logged and charged 0%;
    /// the other lines are unaffected.
    pub async fn calculate_taxes_for_lines(&self, lines: &[CartLine]) -> DbResult<CartTaxes> {
        let rates = GstRateRepository::new(self.pool.clone());
        let mut priced = Vec::with_capacity(lines.len());

        for line in lines {
            let tax = match fetch_product(&self.pool, line.product_id).await {
                Ok(Some(product)) => match rates.resolve_for(&product).await {
                    Ok((resolved, hsn)) => Some(LineTax {
                        rate: resolved.rate,
                        hsn_code: hsn.map(|h| h.code),
                    }),
                    Err(e) => {
                        warn!(product_id = line.product_id, error = %e, "Tax lookup failed, using 0%");
                        None
                    }
                },
                Ok(None) => {
                    warn!(product_id = line.product_id, "Product vanished during tax lookup, using 0%");
                    None
                }
                Err(e) => {
                    warn!(product_id = line.product_id, error = %e, "Tax lookup failed, using 0%");
                    None
                }
            };

            priced.push(PricedLine {
                product_id: line.product_id,
                name: line.name.clone(),
                sku: line.sku.clone(),
                quantity: line.quantity,
                unit_price: Money::from_paise(line.price_paise),
                tax,
            });
        }

        Ok(calculate_cart_taxes(&priced))
    }

    /// Taxes the user's current cart.
    pub async fn calculate_cart_taxes(&self, user_id: i64) -> DbResult<CartTaxes> {
        let lines = fetch_lines(&self.pool, user_id).await?;
        self.calculate_taxes_for_lines(&lines).await
    }

    // =========================================================================
    // Creation
    // =========================================================================

    /// Creates an order from cart lines in one transaction.
    ///
    /// ## Returns
    /// - `Err(Core(EmptyCart))` for an empty cart
    /// - `Err(NotFound)` if the address isn't the user's
    /// - `Err(Core(InsufficientStock))` if any decrement fails (rolled back)
    pub async fn create_order_with_tax(&self, order: NewOrder, cart: &[CartLine]) -> DbResult<OrderDetail> {
        if cart.is_empty() {
            return Err(CoreError::EmptyCart.into());
        }

        let owner: Option<i64> = sqlx::query_scalar("SELECT user_id FROM addresses WHERE address_id = ?")
            .bind(order.address_id)
            .fetch_optional(&self.pool)
            .await?;
        if owner != Some(order.user_id) {
            return Err(DbError::not_found("Address", order.address_id));
        }

        let taxes = self.calculate_taxes_for_lines(cart).await?;

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO orders (user_id, address_id, subtotal_paise, total_tax_paise, \
             total_price_paise, status, payment_method) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(order.user_id)
        .bind(order.address_id)
        .bind(taxes.subtotal_paise)
        .bind(taxes.total_tax_paise)
        .bind(taxes.total_paise)
        .bind(OrderStatus::Pending.as_str())
        .bind(order.payment_method.as_str())
        .execute(&mut *tx)
        .await?;
        let order_id = result.last_insert_id() as i64;

        for line in &taxes.items {
            // Stock first: the row lock it takes orders concurrent checkouts.
            decrement_stock(&mut *tx, line.product_id, line.quantity).await?;

            sqlx::query(
                "INSERT INTO order_items (order_id, product_id, quantity, price_paise, \
                 tax_rate_bps, tax_amount_paise, hsn_code) VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(order_id)
            .bind(line.product_id)
            .bind(line.quantity)
            .bind(line.price_paise)
            .bind(line.tax_rate_bps)
            .bind(line.tax_amount_paise)
            .bind(&line.hsn_code)
            .execute(&mut *tx)
            .await?;
        }

        let cleared = clear_for_user(&mut *tx, order.user_id).await?;

        let created = fetch_order(&mut *tx, order_id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", order_id))?;
        let items = sqlx::query_as::<_, OrderItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = ? ORDER BY order_item_id"
        ))
        .bind(order_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            order_id,
            user_id = order.user_id,
            lines = items.len(),
            cart_items_cleared = cleared,
            total_paise = taxes.total_paise,
            "Order created"
        );

        Ok(OrderDetail {
            order: created,
            items,
        })
    }

    /// Checks out the user's current cart.
    pub async fn create_from_cart(
        &self,
        user_id: i64,
        address_id: i64,
        payment_method: PaymentMethod,
    ) -> DbResult<OrderDetail> {
        let lines = fetch_lines(&self.pool, user_id).await?;
        self.create_order_with_tax(
            NewOrder {
                user_id,
                address_id,
                payment_method,
            },
            &lines,
        )
        .await
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets an order by ID, failing with NotFound.
    pub async fn get(&self, order_id: i64) -> DbResult<Order> {
        fetch_order(&self.pool, order_id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", order_id))
    }

    pub async fn items(&self, order_id: i64) -> DbResult<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = ? ORDER BY order_item_id"
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    pub async fn get_detail(&self, order_id: i64) -> DbResult<OrderDetail> {
        let order = self.get(order_id).await?;
        let items = self.items(order_id).await?;
        Ok(OrderDetail { order, items })
    }

    /// A user's orders, newest first.
    pub async fn list_for_user(&self, user_id: i64) -> DbResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = ? ORDER BY created_at DESC, order_id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    /// All orders, newest first, optionally filtered by status.
    pub async fn list_all(&self, status: Option<OrderStatus>, limit: i64, offset: i64) -> DbResult<Vec<Order>> {
        let orders = match status {
            Some(status) => {
                sqlx::query_as::<_, Order>(&format!(
                    "SELECT {ORDER_COLUMNS} FROM orders WHERE status = ? \
                     ORDER BY created_at DESC, order_id DESC LIMIT ? OFFSET ?"
                ))
                .bind(status.as_str())
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Order>(&format!(
                    "SELECT {ORDER_COLUMNS} FROM orders \
                     ORDER BY created_at DESC, order_id DESC LIMIT ? OFFSET ?"
                ))
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(orders)
    }

    // =========================================================================
    // Status machine
    // =========================================================================

    /// Moves an order to `next`. Cancelling restocks its lines.
    ///
    /// ## Returns
    /// - `Err(Core(InvalidStatusTransition))` for a transition the lifecycle forbids
    pub async fn update_status(&self, order_id: i64, next: OrderStatus) -> DbResult<StatusChange> {
        if next == OrderStatus::Cancelled {
            return self.cancel(order_id).await;
        }

        let order = self.get(order_id).await?;
        if !order.status.can_transition_to(next) {
            return Err(CoreError::InvalidStatusTransition {
                from: order.status,
                to: next,
            }
            .into());
        }

        self.compare_and_set_status(&order, next).await?;
        info!(order_id, from = %order.status, to = %next, "Order status updated");

        Ok(StatusChange {
            order: self.get(order_id).await?,
            inventory_restored: None,
            restock_failures: Vec::new(),
        })
    }

    /// Cancels a pending or processing order and credits its stock back.
    ///
    /// The write itself checks cancellability, so an order moved from
    /// pending to processing in the meantime is still cancelled. The status
    /// change is committed first; each line is then restocked with one retry
    /// and lines that still fail are reported, not hidden.
    pub async fn cancel(&self, order_id: i64) -> DbResult<StatusChange> {
        let result = sqlx::query(
            "UPDATE orders SET status = ? WHERE order_id = ? AND status IN (?, ?)",
        )
        .bind(OrderStatus::Cancelled.as_str())
        .bind(order_id)
        .bind(OrderStatus::Pending.as_str())
        .bind(OrderStatus::Processing.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let order = self.get(order_id).await?;
            return Err(CoreError::OrderNotCancellable {
                order_id,
                status: order.status,
            }
            .into());
        }
        info!(order_id, "Order cancelled");

        let mut restock_failures = Vec::new();
        for item in self.items(order_id).await? {
            if let Err(e) = self.restock_with_retry(&item).await {
                error!(
                    order_id,
                    product_id = item.product_id,
                    quantity = item.quantity,
                    error = %e,
                    "Inventory restoration failed"
                );
                restock_failures.push(item.product_id);
            }
        }

        Ok(StatusChange::cancelled(self.get(order_id).await?, restock_failures))
    }

    /// Each attempt checks out its own connection, so a broken one is not
    /// reused for the retry.
    async fn restock_with_retry(&self, item: &OrderItem) -> DbResult<()> {
        retry_once(|attempt| async move {
            if attempt > 1 {
                warn!(product_id = item.product_id, attempt, "Retrying restock");
            }
            let mut conn = self.pool.acquire().await?;
            adjust_stock(&mut conn, item.product_id, item.quantity).await
        })
        .await
    }

    /// Writes `next` only if the row still holds the status we validated.
    async fn compare_and_set_status(&self, order: &Order, next: OrderStatus) -> DbResult<()> {
        let result = sqlx::query("UPDATE orders SET status = ? WHERE order_id = ? AND status = ?")
            .bind(next.as_str())
            .bind(order.order_id)
            .bind(order.status.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            // Someone else moved the order first; report against the fresh status.
            let current = self.get(order.order_id).await?;
            debug!(order_id = order.order_id, status = %current.status, "Status changed concurrently");
            return Err(CoreError::InvalidStatusTransition {
                from: current.status,
                to: next,
            }
            .into());
        }

        Ok(())
    }

    // =========================================================================
    // Invoice
    // =========================================================================

    /// Rebuilds the tax invoice from the order's snapshot columns.
    pub async fn generate_tax_invoice(&self, order_id: i64) -> DbResult<TaxInvoice> {
        let order = self.get(order_id).await?;

        let rows = sqlx::query_as::<_, InvoiceItemRow>(
            "SELECT oi.product_id, p.name, p.sku, oi.hsn_code, oi.quantity, oi.price_paise, \
             oi.tax_rate_bps, oi.tax_amount_paise \
             FROM order_items oi JOIN products p ON p.product_id = oi.product_id \
             WHERE oi.order_id = ? ORDER BY oi.order_item_id",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        let customer = sqlx::query_as::<_, Customer>(
            "SELECT user_id, name, email, phone FROM users WHERE user_id = ?",
        )
        .bind(order.user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("User", order.user_id))?;

        let address = sqlx::query_as::<_, Address>(
            "SELECT address_id, user_id, full_name, phone, address_line1, address_line2, \
             city, state, postal_code, country, is_default FROM addresses WHERE address_id = ?",
        )
        .bind(order.address_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Address", order.address_id))?;

        debug!(order_id, lines = rows.len(), "Invoice assembled");
        Ok(build_invoice(&order, rows, customer, address))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn cancelled_order() -> Order {
        Order {
            order_id: 11,
            user_id: 3,
            address_id: 4,
            subtotal_paise: 20_000,
            total_tax_paise: 3_600,
            total_price_paise: 23_600,
            status: OrderStatus::Cancelled,
            payment_method: PaymentMethod::Upi,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_cancellation_with_failed_restock_is_reported() {
        let change = StatusChange::cancelled(cancelled_order(), vec![5, 9]);
        assert_eq!(change.inventory_restored, Some(false));
        assert_eq!(change.restock_failures, vec![5, 9]);
        assert!(change.restock_incomplete());

        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["inventory_restored"], false);
        assert_eq!(json["restock_failures"], serde_json::json!([5, 9]));
        assert_eq!(json["order"]["status"], "cancelled");
    }

    #[test]
    fn test_clean_cancellation_omits_failures() {
        let change = StatusChange::cancelled(cancelled_order(), Vec::new());
        assert_eq!(change.inventory_restored, Some(true));
        assert!(!change.restock_incomplete());

        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["inventory_restored"], true);
        assert!(json.get("restock_failures").is_none());
    }

    #[tokio::test]
    async fn test_retry_once_runs_a_fresh_second_attempt() {
        let calls = AtomicU32::new(0);
        let result = retry_once(|attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 1 {
                    Err(DbError::PoolExhausted)
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_once_gives_up_after_second_failure() {
        let calls = AtomicU32::new(0);
        let result: DbResult<()> = retry_once(|attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Err(DbError::Internal(format!("attempt {}", attempt))) }
        })
        .await;

        assert!(matches!(result, Err(DbError::Internal(msg)) if msg == "attempt 2"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_once_stops_on_success() {
        let calls = AtomicU32::new(0);
        let result = retry_once(|_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, DbError>("done") }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
