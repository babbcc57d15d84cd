//! Domain types shared by every layer.
//!
//! ```text
//! Product ──hsn_code_id──► HsnCode ──default_gst_rate_id──► GstRate
//!    └───────custom_gst_rate_id─────────────────────────────►  (bps, 1800 = 18%)
//!
//! Order 1───* OrderItem      status: pending → processing → shipped → delivered
//!                                     └──────────┴──► cancelled
//! ```
//!
//! ## Snapshot Pattern
//! `OrderItem` copies price, tax rate, tax amount and HSN code at order time.
//! Editing a product, GST rate or HSN code afterwards never changes an
//! existing order or its invoice.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// GST slab in basis points: 1800 = 18%, 25 = 0.25%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Rounds to the nearest basis point.
    pub fn from_percentage(pct: f64) -> Self {
        TaxRate((pct * 100.0).round() as u32)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Display only. Arithmetic stays in bps.
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

/// Renders `1800` as `18%` and `250` as `2.5%`.
impl fmt::Display for TaxRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / 100;
        let frac = self.0 % 100;
        if frac == 0 {
            write!(f, "{}%", whole)
        } else if frac % 10 == 0 {
            write!(f, "{}.{}%", whole, frac / 10)
        } else {
            write!(f, "{}.{:02}%", whole, frac)
        }
    }
}

// =============================================================================
// GST Rate
// =============================================================================

/// A configured GST slab.
///
/// `rate_name` doubles as the lookup key for the rule-based fallback
/// (`Default`, `Branded_Packaged`, `Branded_Only`, `Packaged_Only`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct GstRate {
    pub rate_id: i64,
    pub rate_name: String,
    /// Percentage in basis points (0..=2800).
    pub percentage_bps: u32,
    pub description: Option<String>,
}

impl GstRate {
    /// Name of the synthetic rate returned when nothing is configured.
    pub const NONE_NAME: &'static str = "None";

    /// The synthetic zero rate `{rate_id: 0, rate_name: "None", percentage: 0}`.
    pub fn none() -> Self {
        GstRate {
            rate_id: 0,
            rate_name: Self::NONE_NAME.to_string(),
            percentage_bps: 0,
            description: None,
        }
    }

    /// Returns the rate as a [`TaxRate`].
    #[inline]
    pub fn rate(&self) -> TaxRate {
        TaxRate::from_bps(self.percentage_bps)
    }

    /// Returns the percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.rate().percentage()
    }

    /// True for the synthetic zero rate.
    pub fn is_none_sentinel(&self) -> bool {
        self.rate_id == 0 && self.rate_name == Self::NONE_NAME
    }
}

// =============================================================================
// HSN Code
// =============================================================================

/// Harmonized System of Nomenclature classification code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct HsnCode {
    pub hsn_code_id: i64,
    /// Unique classification code, e.g. `"1001"`.
    pub code: String,
    pub description: Option<String>,
    pub default_gst_rate_id: Option<i64>,
}

// =============================================================================
// Category
// =============================================================================

/// Product category; may carry a default HSN code for new products.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Category {
    pub category_id: i64,
    pub name: String,
    pub default_hsn_code_id: Option<i64>,
}

// =============================================================================
// Product
// =============================================================================

/// A product in the catalog.
///
/// Only the fields the order and tax pipeline reads are modelled here; the
/// rest of the catalog (images, descriptions) is owned by the catalog service.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub product_id: i64,
    pub name: String,
    pub sku: Option<String>,
    /// Selling price in paise.
    pub price_paise: i64,
    /// MRP / list price in paise, shown struck through by the frontend.
    pub regular_price_paise: Option<i64>,
    /// Units in stock. Never negative after a commit.
    pub quantity: i64,
    pub hsn_code_id: Option<i64>,
    pub is_branded: bool,
    pub is_packaged: bool,
    pub custom_gst_rate_id: Option<i64>,
    pub category_id: Option<i64>,
}

impl Product {
    /// Returns the price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_paise(self.price_paise)
    }

    /// Checks if `quantity` units can be sold from current stock.
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.quantity >= quantity
    }
}

/// Typed partial update of a product's tax classification.
///
/// Every field is optional. For the nullable foreign keys the outer `Option`
/// means "leave unchanged" and the inner `Option` is the new value, so
/// `{"hsn_code_id": null}` clears the code while omitting the key keeps it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductTaxUpdate {
    #[serde(default, deserialize_with = "deserialize_some", skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub hsn_code_id: Option<Option<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub is_branded: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub is_packaged: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_some", skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub custom_gst_rate_id: Option<Option<i64>>,
}

impl ProductTaxUpdate {
    /// True when the update would not change anything.
    pub fn is_empty(&self) -> bool {
        self.hsn_code_id.is_none()
            && self.is_branded.is_none()
            && self.is_packaged.is_none()
            && self.custom_gst_rate_id.is_none()
    }

    /// Applies the update to an in-memory product.
    pub fn apply_to(&self, product: &mut Product) {
        if let Some(hsn) = self.hsn_code_id {
            product.hsn_code_id = hsn;
        }
        if let Some(branded) = self.is_branded {
            product.is_branded = branded;
        }
        if let Some(packaged) = self.is_packaged {
            product.is_packaged = packaged;
        }
        if let Some(custom) = self.custom_gst_rate_id {
            product.custom_gst_rate_id = custom;
        }
    }
}

/// Distinguishes an explicit `null` from a missing key.
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

// =============================================================================
// Order Status
// =============================================================================

/// Lifecycle of an order.
///
/// ```text
/// pending ──► processing ──► shipped ──► delivered
///    │             │
///    └──────┬──────┘
///           ▼
///       cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Processing)
                | (OrderStatus::Pending, OrderStatus::Cancelled)
                | (OrderStatus::Processing, OrderStatus::Shipped)
                | (OrderStatus::Processing, OrderStatus::Cancelled)
                | (OrderStatus::Shipped, OrderStatus::Delivered)
        )
    }

    /// Only orders that have not left the warehouse can be cancelled.
    pub fn is_cancellable(&self) -> bool {
        self.can_transition_to(OrderStatus::Cancelled)
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: OrderStatus::ALL.iter().map(|s| s.as_str().to_string()).collect(),
            })
    }
}

impl TryFrom<String> for OrderStatus {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Collected by the courier on delivery.
    CashOnDelivery,
    Card,
    Upi,
    NetBanking,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 4] = [
        PaymentMethod::CashOnDelivery,
        PaymentMethod::Card,
        PaymentMethod::Upi,
        PaymentMethod::NetBanking,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::CashOnDelivery => "cash_on_delivery",
            PaymentMethod::Card => "card",
            PaymentMethod::Upi => "upi",
            PaymentMethod::NetBanking => "net_banking",
        }
    }

    /// Human label used on invoices and emails.
    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::CashOnDelivery => "Cash on Delivery",
            PaymentMethod::Card => "Card",
            PaymentMethod::Upi => "UPI",
            PaymentMethod::NetBanking => "Net Banking",
        }
    }

    /// Prepaid methods are settled before the order is placed.
    pub fn is_prepaid(&self) -> bool {
        !matches!(self, PaymentMethod::CashOnDelivery)
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        if normalized == "cod" {
            return Ok(PaymentMethod::CashOnDelivery);
        }
        PaymentMethod::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == normalized)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "payment_method".to_string(),
                allowed: PaymentMethod::ALL.iter().map(|m| m.as_str().to_string()).collect(),
            })
    }
}

impl TryFrom<String> for PaymentMethod {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// =============================================================================
// Order
// =============================================================================

/// A placed order. Totals are frozen at creation time.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Order {
    pub order_id: i64,
    pub user_id: i64,
    pub address_id: i64,
    pub subtotal_paise: i64,
    pub total_tax_paise: i64,
    pub total_price_paise: i64,
    #[cfg_attr(feature = "sqlx", sqlx(try_from = "String"))]
    pub status: OrderStatus,
    #[cfg_attr(feature = "sqlx", sqlx(try_from = "String"))]
    pub payment_method: PaymentMethod,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Order {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_paise(self.subtotal_paise)
    }

    #[inline]
    pub fn total_tax(&self) -> Money {
        Money::from_paise(self.total_tax_paise)
    }

    #[inline]
    pub fn total_price(&self) -> Money {
        Money::from_paise(self.total_price_paise)
    }
}

// =============================================================================
// Order Item
// =============================================================================

/// A line of an order. Uses the snapshot pattern for price and tax data.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderItem {
    pub order_item_id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    /// Unit price in paise at time of order (frozen).
    pub price_paise: i64,
    /// GST rate in bps at time of order (frozen).
    pub tax_rate_bps: u32,
    /// Tax for the whole line.
    pub tax_amount_paise: i64,
    /// HSN code string at time of order (frozen).
    pub hsn_code: Option<String>,
}

impl OrderItem {
    /// Unit price × quantity.
    pub fn line_subtotal(&self) -> Money {
        Money::from_paise(self.price_paise).multiply_quantity(self.quantity)
    }

    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.tax_rate_bps)
    }

    pub fn tax_amount(&self) -> Money {
        Money::from_paise(self.tax_amount_paise)
    }

    /// Line subtotal plus tax.
    pub fn line_total(&self) -> Money {
        self.line_subtotal() + self.tax_amount()
    }
}

// =============================================================================
// Address & Customer
// =============================================================================

/// A shipping address owned by a user.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Address {
    pub address_id: i64,
    pub user_id: i64,
    pub full_name: String,
    pub phone: Option<String>,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub is_default: bool,
}

impl Address {
    /// Address rendered as display lines (name first).
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![self.full_name.clone(), self.address_line1.clone()];
        if let Some(line2) = self.address_line2.as_deref().filter(|l| !l.trim().is_empty()) {
            lines.push(line2.to_string());
        }
        lines.push(format!("{}, {} {}", self.city, self.state, self.postal_code));
        lines.push(self.country.clone());
        if let Some(phone) = self.phone.as_deref().filter(|p| !p.trim().is_empty()) {
            lines.push(format!("Phone: {}", phone));
        }
        lines
    }
}

/// The purchasing user, as far as invoices are concerned.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub user_id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

// =============================================================================
// Cart
// =============================================================================

/// A raw cart row: a product reference and a quantity, no price snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CartItem {
    pub cart_item_id: i64,
    pub cart_id: i64,
    pub product_id: i64,
    pub quantity: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================
