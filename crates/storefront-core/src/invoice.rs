//! # Tax Invoice
//!
//! Assembles the invoice view from a persisted order. Nothing here is stored;
//! the invoice is rebuilt from the order's snapshot columns on every request,
//! so catalog edits after checkout never alter it.
//!
//! ## Invoice Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  TaxInvoice                                                             │
//! │  ├── invoice           number, order id, date, order status             │
//! │  ├── customer          name, email, phone                               │
//! │  ├── shipping_address                                                   │
//! │  ├── items[]           hsn, qty, price, subtotal, gst %, tax, total     │
//! │  ├── summary           subtotal, total_tax, total, tax_breakdown[]      │
//! │  │                     (one entry per distinct GST rate)                │
//! │  └── payment           method, status                                   │
//! │                                                                         │
//! │  Consumers: JSON endpoint, PDF renderer, invoice email                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{Address, Customer, Order, OrderStatus, PaymentMethod, TaxRate};

// =============================================================================
// Invoice Types
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceHeader {
    pub invoice_number: String,
    pub order_id: i64,
    /// Order time in IST, e.g. `2024-03-09T15:30:00+05:30`.
    #[ts(as = "String")]
    pub invoice_date: DateTime<FixedOffset>,
    pub order_status: OrderStatus,
}

/// An order item joined with the product's name and sku.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InvoiceItemRow {
    pub product_id: i64,
    pub name: String,
    pub sku: Option<String>,
    pub hsn_code: Option<String>,
    pub quantity: i64,
    pub price_paise: i64,
    pub tax_rate_bps: u32,
    pub tax_amount_paise: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceLine {
    pub product_id: i64,
    pub name: String,
    pub sku: Option<String>,
    pub hsn_code: Option<String>,
    pub quantity: i64,
    pub price_paise: i64,
    pub subtotal_paise: i64,
    pub tax_rate_bps: u32,
    pub tax_amount_paise: i64,
    pub total_paise: i64,
}

impl From<InvoiceItemRow> for InvoiceLine {
    fn from(row: InvoiceItemRow) -> Self {
        let subtotal = Money::from_paise(row.price_paise).multiply_quantity(row.quantity);
        InvoiceLine {
            product_id: row.product_id,
            name: row.name,
            sku: row.sku,
            hsn_code: row.hsn_code,
            quantity: row.quantity,
            price_paise: row.price_paise,
            subtotal_paise: subtotal.paise(),
            tax_rate_bps: row.tax_rate_bps,
            tax_amount_paise: row.tax_amount_paise,
            total_paise: subtotal.paise() + row.tax_amount_paise,
        }
    }
}

/// Taxable value and tax collected at one GST rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxBreakdownEntry {
    pub rate_bps: u32,
    pub taxable_amount_paise: i64,
    pub tax_amount_paise: i64,
}

impl TaxBreakdownEntry {
    pub fn rate(&self) -> TaxRate {
        TaxRate::from_bps(self.rate_bps)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceSummary {
    pub subtotal_paise: i64,
    pub total_tax_paise: i64,
    pub total_paise: i64,
    pub tax_breakdown: Vec<TaxBreakdownEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Paid,
    Pending,
    Cancelled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Paid => "paid",
            PaymentStatus::Pending => "pending",
            PaymentStatus::Cancelled => "cancelled",
        }
    }

    /// Derives the payment status from the method and the order status.
    ///
    /// Prepaid methods are paid at checkout; cash on delivery is paid once
    /// the order is delivered.
    pub fn derive(method: PaymentMethod, status: OrderStatus) -> Self {
        match (method, status) {
            (_, OrderStatus::Cancelled) => PaymentStatus::Cancelled,
            (PaymentMethod::CashOnDelivery, OrderStatus::Delivered) => PaymentStatus::Paid,
            (PaymentMethod::CashOnDelivery, _) => PaymentStatus::Pending,
            _ => PaymentStatus::Paid,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentInfo {
    pub method: PaymentMethod,
    pub method_label: String,
    pub status: PaymentStatus,
}

/// The full invoice view.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxInvoice {
    pub invoice: InvoiceHeader,
    pub customer: Customer,
    pub shipping_address: Address,
    pub items: Vec<InvoiceLine>,
    pub summary: InvoiceSummary,
    pub payment: PaymentInfo,
}

// =============================================================================
// Builders
// =============================================================================

/// GST invoices are dated in Indian Standard Time.
pub const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

/// Converts a stored UTC timestamp to the invoice's IST time.
pub fn invoice_time(placed_at: DateTime<Utc>) -> DateTime<FixedOffset> {
    let ist = FixedOffset::east_opt(IST_OFFSET_SECS).unwrap_or_else(|| Utc.fix());
    placed_at.with_timezone(&ist)
}

/// `INV-<yyyymmdd in IST>-<order id, 6 digits>`.
///
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use storefront_core::invoice::invoice_number;
///
/// let placed = Utc.with_ymd_and_hms(2024, 3, 9, 10, 0, 0).unwrap();
/// assert_eq!(invoice_number(42, placed), "INV-20240309-000042");
/// ```
pub fn invoice_number(order_id: i64, placed_at: DateTime<Utc>) -> String {
    format!("INV-{}-{:06}", invoice_time(placed_at).format("%Y%m%d"), order_id)
}

/// Groups lines by GST rate, ascending by rate.
pub fn build_tax_breakdown(lines: &[InvoiceLine]) -> Vec<TaxBreakdownEntry> {
    let mut by_rate: BTreeMap<u32, (i64, i64)> = BTreeMap::new();
    for line in lines {
        let entry = by_rate.entry(line.tax_rate_bps).or_insert((0, 0));
        entry.0 += line.subtotal_paise;
        entry.1 += line.tax_amount_paise;
    }

    by_rate
        .into_iter()
        .map(|(rate_bps, (taxable, tax))| TaxBreakdownEntry {
            rate_bps,
            taxable_amount_paise: taxable,
            tax_amount_paise: tax,
        })
        .collect()
}

/// Assembles the invoice for `order` from its joined rows.
pub fn build_invoice(
    order: &Order,
    rows: Vec<InvoiceItemRow>,
    customer: Customer,
    shipping_address: Address,
) -> TaxInvoice {
    let items: Vec<InvoiceLine> = rows.into_iter().map(InvoiceLine::from).collect();
    let tax_breakdown = build_tax_breakdown(&items);

    TaxInvoice {
        invoice: InvoiceHeader {
            invoice_number: invoice_number(order.order_id, order.created_at),
            order_id: order.order_id,
            invoice_date: invoice_time(order.created_at),
            order_status: order.status,
        },
        customer,
        shipping_address,
        items,
        summary: InvoiceSummary {
            subtotal_paise: order.subtotal_paise,
            total_tax_paise: order.total_tax_paise,
            total_paise: order.total_price_paise,
            tax_breakdown,
        },
        payment: PaymentInfo {
            method: order.payment_method,
            method_label: order.payment_method.label().to_string(),
            status: PaymentStatus::derive(order.payment_method, order.status),
        },
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
