//! The caller's shipping addresses.

use axum::extract::State;
use axum::response::Response;
use axum::routing::{get, patch};
use axum::Router;

use storefront_db::NewAddress;

use crate::auth::AuthUser;
use crate::error::{ApiJson, ApiPath, ApiResult};
use crate::response;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_addresses).post(create_address))
        .route("/:id/default", patch(set_default))
}

async fn list_addresses(State(state): State<AppState>, user: AuthUser) -> ApiResult<Response> {
    let addresses = state.db.addresses().list_for_user(user.user_id).await?;
    Ok(response::success("Addresses retrieved", addresses))
}

async fn create_address(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(body): ApiJson<NewAddress>,
) -> ApiResult<Response> {
    let address = state.db.addresses().create(user.user_id, body).await?;
    Ok(response::created("Address created", address))
}

/// One statement flips every address of the caller.
async fn set_default(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(address_id): ApiPath<i64>,
) -> ApiResult<Response> {
    let address = state.db.addresses().set_default(user.user_id, address_id).await?;
    Ok(response::success("Default address updated", address))
}
