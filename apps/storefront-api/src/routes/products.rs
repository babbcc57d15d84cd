//! Product tax settings, quotes and stock checks.

use axum::extract::State;
use axum::response::Response;
use axum::routing::{get, patch, post};
use axum::Router;
use serde::{Deserialize, Serialize};

use storefront_core::tax::ResolvedRate;
use storefront_core::validation::validate_id;
use storefront_core::{Product, ProductTaxUpdate};

use crate::auth::{AdminUser, AuthUser};
use crate::error::{ApiError, ApiJson, ApiPath, ApiQuery, ApiResult};
use crate::response;
use crate::state::AppState;

/// Upper bound on one bulk tax update.
const MAX_BULK_PRODUCTS: usize = 500;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/bulk-update-tax", post(bulk_update_tax))
        .route("/:id/tax", get(tax_info).patch(update_tax))
        .route("/:id/price-with-tax", get(price_with_tax))
        .route("/:id/inventory", get(inventory))
}

#[derive(Debug, Deserialize)]
struct QuantityQuery {
    #[serde(default = "one")]
    quantity: i64,
}

fn one() -> i64 {
    1
}

#[derive(Debug, Deserialize)]
struct BulkTaxRequest {
    product_ids: Vec<i64>,
    #[serde(flatten)]
    update: ProductTaxUpdate,
}

#[derive(Debug, Serialize)]
struct ProductTaxInfo {
    product: Product,
    hsn_code: Option<String>,
    #[serde(flatten)]
    resolved: ResolvedRate,
    percentage: f64,
}

/// Resolved rate and the step of the chain that produced it.
async fn tax_info(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(product_id): ApiPath<i64>,
) -> ApiResult<Response> {
    let product = state.db.products().get(product_id).await?;
    let (resolved, hsn) = state.db.gst_rates().resolve_for(&product).await?;
    let percentage = resolved.rate.percentage();

    Ok(response::success(
        "Product tax information retrieved",
        ProductTaxInfo {
            product,
            hsn_code: hsn.map(|h| h.code),
            resolved,
            percentage,
        },
    ))
}

async fn update_tax(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(product_id): ApiPath<i64>,
    ApiJson(update): ApiJson<ProductTaxUpdate>,
) -> ApiResult<Response> {
    if update.is_empty() {
        return Err(ApiError::Validation("No tax fields to update".to_string()));
    }
    let product = state.db.products().update_tax_settings(product_id, &update).await?;
    Ok(response::success("Product tax settings updated", product))
}

/// Same update for many products, all or nothing.
async fn bulk_update_tax(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiJson(body): ApiJson<BulkTaxRequest>,
) -> ApiResult<Response> {
    if body.product_ids.is_empty() {
        return Err(ApiError::Validation("product_ids must not be empty".to_string()));
    }
    if body.product_ids.len() > MAX_BULK_PRODUCTS {
        return Err(ApiError::Validation(format!(
            "At most {} products per bulk update",
            MAX_BULK_PRODUCTS
        )));
    }
    if body.update.is_empty() {
        return Err(ApiError::Validation("No tax fields to update".to_string()));
    }
    for &id in &body.product_ids {
        validate_id("product_id", id)?;
    }

    let updated = state
        .db
        .products()
        .bulk_update_tax(&body.product_ids, &body.update)
        .await?;
    Ok(response::success(
        format!("{} products updated", updated),
        serde_json::json!({ "updated": updated }),
    ))
}

async fn price_with_tax(
    State(state): State<AppState>,
    ApiPath(product_id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<QuantityQuery>,
) -> ApiResult<Response> {
    let quote = state.db.products().price_with_tax(product_id, query.quantity).await?;
    Ok(response::success("Price calculated", quote))
}

/// Read-only stock decision for `quantity` units.
async fn inventory(
    State(state): State<AppState>,
    ApiPath(product_id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<QuantityQuery>,
) -> ApiResult<Response> {
    let check = state.db.products().check_inventory(product_id, query.quantity).await?;
    Ok(response::success(check.message.clone(), check))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bulk_request_flattens_update() {
        let body: BulkTaxRequest =
            serde_json::from_str(r#"{"product_ids": [1, 2], "custom_gst_rate_id": null, "is_branded": true}"#).unwrap();
        assert_eq!(body.product_ids, vec![1, 2]);
        assert_eq!(body.update.custom_gst_rate_id, Some(None));
        assert_eq!(body.update.is_branded, Some(true));
        assert_eq!(body.update.hsn_code_id, None);
    }
}
