//! # storefront-core
//!
//! This crate holds the order, tax and invoice rules as pure functions with
//! zero I/O dependencies.
//!
//! ```text
//! storefront-api (axum)     routes, JWT extractors, PDF, mail
//!        │
//!        ▼
//! storefront-db (sqlx)      MySQL repositories, transactions
//!        │
//!        ▼
//! storefront-core           types · money · tax · inventory · cart
//!                           checkout · invoice · validation
//! ```
//!
//! Nothing in here touches the database or the network, so every rule is
//! unit-tested directly.
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, GstRate, HsnCode, Order, ...)
//! - [`money`] - Money in integer paise
//! - [`tax`] - GST rate resolution chain
//! - [`inventory`] - Stock sufficiency decisions
//! - [`cart`] - Cart view and cart rules
//! - [`checkout`] - Per-line tax and order totals
//! - [`invoice`] - Tax invoice assembly
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example
//!
//! ```rust
//! use storefront_core::money::Money;
//! use storefront_core::types::TaxRate;
//!
//! let price = Money::from_paise(10_000); // ₹100.00
//! let tax = (price * 2).calculate_tax(TaxRate::from_bps(1800));
//! assert_eq!(tax.paise(), 3_600);        // ₹36.00
//! ```

// =============================================================================
// Modules
// =============================================================================

pub mod cart;
pub mod checkout;
pub mod error;
pub mod inventory;
pub mod invoice;
pub mod money;
pub mod tax;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Limits
// =============================================================================

/// Maximum distinct products in a single cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single product in a cart or order line.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Highest GST slab (28%) in basis points.
pub const MAX_GST_BPS: u32 = 2800;

/// Highest unit price accepted for a product: ₹1 crore.
///
/// A full cart at this price (100 lines × 999 units) stays far inside `i64`
/// paise, tax included.
pub const MAX_PRICE_PAISE: i64 = 1_000_000_000;
