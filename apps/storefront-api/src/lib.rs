//! # Storefront API
//!
//! REST surface for carts, checkout, GST administration and tax invoices.
//!
//! ## Request Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  TraceLayer ─► CorsLayer ─► [dev: expose_internal_detail]               │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  routes::*  ── AuthUser / AdminUser extractors (JWT)                    │
//! │      │                                                                  │
//! │      ├──► storefront-db repositories ──► MySQL                          │
//! │      ├──► InvoiceRenderer (spawn_blocking)                              │
//! │      └──► Mailer (Arc<dyn Mailer>)                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod mailer;
pub mod notifications;
pub mod pdf;
pub mod response;
pub mod routes;
pub mod state;

use axum::http::HeaderValue;
use axum::middleware;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

pub use config::AppConfig;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use state::AppState;

/// Builds the application router.
pub fn app(state: AppState) -> Router {
    let production = state.config.is_production();
    let cors = cors_layer(&state.config);

    let router = routes::router(state);
    let router = if production {
        router
    } else {
        router.layer(middleware::map_response(error::expose_internal_detail))
    };

    router.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors),
    )
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if !origins.is_empty() {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    } else if config.is_production() {
        CorsLayer::new()
    } else {
        CorsLayer::permissive()
    }
}
