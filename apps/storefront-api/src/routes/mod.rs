//! # HTTP Routes
//!
//! ```text
//! /api
//! ├── /health                          GET     database ping
//! ├── /cart                            GET DELETE, /items, /items/:product_id, /taxes
//! ├── /orders                          GET POST (cart-inventory checked)
//! │   ├── /admin/all                   GET     admin
//! │   └── /:id                         GET, /invoice, /invoice/pdf, /invoice/email,
//! │                                    /cancel, /status (admin)
//! ├── /tax                             admin only
//! │   ├── /gst, /gst/:id               CRUD
//! │   └── /hsn, /hsn/:id, /hsn/code/:code, /hsn/bulk-import, /hsn/:id/category
//! ├── /products/:id                    /tax, /price-with-tax, /inventory
//! │   └── /bulk-update-tax             admin
//! └── /addresses                       GET POST, /:id/default
//! ```

mod addresses;
mod cart;
mod health;
mod orders;
mod products;
mod tax;

use axum::Router;

use crate::state::AppState;

/// All API routes, with state applied.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .merge(health::routes())
        .nest("/cart", cart::routes())
        .nest("/orders", orders::routes(state.clone()))
        .nest("/tax", tax::routes())
        .nest("/products", products::routes())
        .nest("/addresses", addresses::routes());

    Router::new().nest("/api", api).with_state(state)
}
