//! # Order Routes
//!
//! ```text
//! POST /api/orders
//!   │
//!   ├── validate_cart_inventory (route middleware)
//!   │     empty cart ──────────────► 400 EMPTY_CART
//!   │     stock < quantity ────────► 400 INSUFFICIENT_STOCK + details
//!   │
//!   └── create_order ── create_from_cart (one transaction) ──► 201
//!                          └── confirmation email, detached
//! ```

use axum::extract::{Request, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::Router;
use serde::Deserialize;
use tracing::info;

use storefront_core::cart::find_shortfalls;
use storefront_core::validation::{validate_email, validate_id};
use storefront_core::{OrderStatus, PaymentMethod};
use storefront_db::StatusChange;

use crate::auth::{AdminUser, AuthUser};
use crate::error::{ApiError, ApiJson, ApiPath, ApiQuery, ApiResult};
use crate::notifications;
use crate::response;
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 200;

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post(create_order)
                .route_layer(middleware::from_fn_with_state(state, validate_cart_inventory))
                .get(list_my_orders),
        )
        .route("/admin/all", get(list_all_orders))
        .route("/:id", get(get_order))
        .route("/:id/invoice", get(get_invoice))
        .route("/:id/invoice/pdf", get(get_invoice_pdf))
        .route("/:id/invoice/email", post(email_invoice))
        .route("/:id/cancel", patch(cancel_order))
        .route("/:id/status", patch(update_status))
}

// =============================================================================
// Checkout
// =============================================================================

/// Rejects checkout before the handler runs when the cart is empty or
/// stock can't cover it. The conditional decrement in the order
/// transaction stays the authoritative check.
async fn validate_cart_inventory(
    State(state): State<AppState>,
    user: AuthUser,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let lines = state.db.carts().lines(user.user_id).await?;
    if lines.is_empty() {
        return Err(ApiError::EmptyCart);
    }

    let shortfalls = find_shortfalls(&lines);
    if !shortfalls.is_empty() {
        return Err(ApiError::insufficient_stock(shortfalls));
    }

    Ok(next.run(request).await)
}

#[derive(Debug, Deserialize)]
struct CreateOrderRequest {
    address_id: i64,
    payment_method: String,
}

async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(body): ApiJson<CreateOrderRequest>,
) -> ApiResult<Response> {
    validate_id("address_id", body.address_id)?;
    let payment_method: PaymentMethod = body.payment_method.parse()?;

    let detail = state
        .db
        .orders()
        .create_from_cart(user.user_id, body.address_id, payment_method)
        .await?;

    notifications::dispatch_order_confirmation(&state, detail.order.clone());

    Ok(response::created("Order placed successfully", detail))
}

// =============================================================================
// Reads
// =============================================================================

async fn list_my_orders(State(state): State<AppState>, user: AuthUser) -> ApiResult<Response> {
    let orders = state.db.orders().list_for_user(user.user_id).await?;
    Ok(response::success("Orders retrieved", orders))
}

#[derive(Debug, Deserialize)]
struct ListOrdersQuery {
    status: Option<String>,
    limit: Option<i64>,
    offset: Option<i64>,
}

async fn list_all_orders(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiQuery(query): ApiQuery<ListOrdersQuery>,
) -> ApiResult<Response> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<OrderStatus>)
        .transpose()?;
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0).max(0);

    let orders = state.db.orders().list_all(status, limit, offset).await?;
    Ok(response::success("Orders retrieved", orders))
}

async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(order_id): ApiPath<i64>,
) -> ApiResult<Response> {
    let detail = state.db.orders().get_detail(order_id).await?;
    user.ensure_can_access(detail.order.user_id)?;
    Ok(response::success("Order retrieved", detail))
}

// =============================================================================
// Invoice
// =============================================================================

async fn get_invoice(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(order_id): ApiPath<i64>,
) -> ApiResult<Response> {
    let owner = state.db.orders().get(order_id).await?.user_id;
    user.ensure_can_access(owner)?;

    let invoice = state.db.orders().generate_tax_invoice(order_id).await?;
    Ok(response::success("Invoice generated", invoice))
}

async fn get_invoice_pdf(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(order_id): ApiPath<i64>,
) -> ApiResult<Response> {
    let owner = state.db.orders().get(order_id).await?.user_id;
    user.ensure_can_access(owner)?;

    let invoice = state.db.orders().generate_tax_invoice(order_id).await?;
    let disposition = format!("attachment; filename={}", notifications::invoice_filename(&invoice));

    let mut pdf = Vec::new();
    state
        .renderer
        .render_to(invoice, &mut pdf)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(([(CONTENT_TYPE, "application/pdf".to_string()), (CONTENT_DISPOSITION, disposition)], pdf).into_response())
}

#[derive(Debug, Deserialize)]
struct EmailInvoiceRequest {
    email: String,
}

async fn email_invoice(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(order_id): ApiPath<i64>,
    ApiJson(body): ApiJson<EmailInvoiceRequest>,
) -> ApiResult<Response> {
    validate_email(&body.email)?;

    let owner = state.db.orders().get(order_id).await?.user_id;
    user.ensure_can_access(owner)?;

    let invoice = state.db.orders().generate_tax_invoice(order_id).await?;
    let mut pdf = Vec::new();
    state
        .renderer
        .render_to(invoice.clone(), &mut pdf)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let email = notifications::invoice_email(&body.email, &invoice, pdf, state.currency_prefix());
    notifications::send_invoice(state.mailer.as_ref(), email)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(response::success(
        format!("Invoice sent to {}", body.email),
        serde_json::json!({ "invoice_number": invoice.invoice.invoice_number }),
    ))
}

// =============================================================================
// Status
// =============================================================================

const RESTOCK_FAILED: &str = "Order cancelled but inventory restoration failed for some items";

/// A partial restock overrides the success message.
fn status_message(change: &StatusChange, ok: &'static str) -> &'static str {
    if change.restock_incomplete() {
        RESTOCK_FAILED
    } else {
        ok
    }
}

async fn cancel_order(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(order_id): ApiPath<i64>,
) -> ApiResult<Response> {
    let owner = state.db.orders().get(order_id).await?.user_id;
    user.ensure_can_access(owner)?;

    let change = state.db.orders().cancel(order_id).await?;
    info!(order_id, by = user.user_id, "Cancellation requested");

    let message = status_message(&change, "Order cancelled successfully");
    Ok(response::success(message, change))
}

#[derive(Debug, Deserialize)]
struct UpdateStatusRequest {
    status: String,
}

async fn update_status(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiPath(order_id): ApiPath<i64>,
    ApiJson(body): ApiJson<UpdateStatusRequest>,
) -> ApiResult<Response> {
    let next: OrderStatus = body.status.parse()?;

    let change = state.db.orders().update_status(order_id, next).await?;
    info!(order_id, status = %next, by = admin.user_id, "Status update applied");

    let message = status_message(&change, "Order status updated");
    Ok(response::success(message, change))
}
