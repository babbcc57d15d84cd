//! # Repository Module
//!
//! One repository per aggregate, each a thin handle around the pool.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Handler                                                                │
//! │     │  db.orders().create_from_cart(user, address, method)              │
//! │     ▼                                                                   │
//! │  OrderRepository ──uses──► cart::fetch_lines                            │
//! │     │                      product::decrement_stock / adjust_stock      │
//! │     │                      gst::GstRateRepository::resolve_for          │
//! │     ▼                                                                   │
//! │  MySQL                                                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Helpers that must run on a caller's transaction take
//! `&mut MySqlConnection` and stay `pub(crate)`.
//!
//! ## Available Repositories
//!
//! - [`GstRateRepository`](gst::GstRateRepository) - GST slabs and rate resolution
//! - [`HsnCodeRepository`](hsn::HsnCodeRepository) - HSN registry, bulk import
//! - [`CategoryRepository`](category::CategoryRepository) - Categories
//! - [`ProductRepository`](product::ProductRepository) - Stock and tax settings
//! - [`CartRepository`](cart::CartRepository) - The per-user cart
//! - [`OrderRepository`](order::OrderRepository) - Checkout, status, invoices
//! - [`AddressRepository`](address::AddressRepository) - Shipping addresses
//! - [`UserRepository`](user::UserRepository) - Customer reads

pub mod address;
pub mod cart;
pub mod category;
pub mod gst;
pub mod hsn;
pub mod order;
pub mod product;
pub mod user;
