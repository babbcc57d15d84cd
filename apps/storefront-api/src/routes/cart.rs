//! The caller's cart.

use axum::extract::State;
use axum::response::Response;
use axum::routing::{get, patch, post};
use axum::Router;
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::error::{ApiJson, ApiPath, ApiResult};
use crate::response;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(view_cart).delete(clear_cart))
        .route("/items", post(add_item))
        .route("/items/:product_id", patch(update_item).delete(remove_item))
        .route("/taxes", get(cart_taxes))
}

#[derive(Debug, Deserialize)]
struct AddItemRequest {
    product_id: i64,
    #[serde(default = "one")]
    quantity: i64,
}

fn one() -> i64 {
    1
}

#[derive(Debug, Deserialize)]
struct UpdateItemRequest {
    quantity: i64,
}

async fn view_cart(State(state): State<AppState>, user: AuthUser) -> ApiResult<Response> {
    let cart = state.db.carts().view(user.user_id).await?;
    Ok(response::success("Cart retrieved", cart))
}

async fn add_item(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(body): ApiJson<AddItemRequest>,
) -> ApiResult<Response> {
    let cart = state
        .db
        .carts()
        .add_item(user.user_id, body.product_id, body.quantity)
        .await?;
    Ok(response::success("Item added to cart", cart))
}

/// Quantity 0 removes the line.
async fn update_item(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(product_id): ApiPath<i64>,
    ApiJson(body): ApiJson<UpdateItemRequest>,
) -> ApiResult<Response> {
    let cart = state
        .db
        .carts()
        .update_item(user.user_id, product_id, body.quantity)
        .await?;
    Ok(response::success("Cart item updated", cart))
}

async fn remove_item(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(product_id): ApiPath<i64>,
) -> ApiResult<Response> {
    let cart = state.db.carts().remove_item(user.user_id, product_id).await?;
    Ok(response::success("Item removed from cart", cart))
}

async fn clear_cart(State(state): State<AppState>, user: AuthUser) -> ApiResult<Response> {
    let cart = state.db.carts().clear(user.user_id).await?;
    Ok(response::success("Cart cleared", cart))
}

/// Tax preview for the current cart.
async fn cart_taxes(State(state): State<AppState>, user: AuthUser) -> ApiResult<Response> {
    let taxes = state.db.orders().calculate_cart_taxes(user.user_id).await?;
    Ok(response::success("Cart taxes calculated", taxes))
}
