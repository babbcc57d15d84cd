//! GST rate and HSN code administration. Every route requires an admin.

use axum::extract::State;
use axum::response::Response;
use axum::routing::{get, patch, post};
use axum::Router;
use serde::{Deserialize, Deserializer, Serialize};

use storefront_core::validation::percentage_to_bps;
use storefront_core::GstRate;
use storefront_db::{GstRateUpdate, HsnCodeUpdate, NewGstRate, NewHsnCode};

use crate::auth::AdminUser;
use crate::error::{ApiError, ApiJson, ApiPath, ApiResult};
use crate::response;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/gst", get(list_rates).post(create_rate))
        .route("/gst/:id", get(get_rate).patch(update_rate).delete(delete_rate))
        .route("/hsn", get(list_hsn).post(create_hsn))
        .route("/hsn/bulk-import", post(bulk_import_hsn))
        .route("/hsn/code/:code", get(get_hsn_by_code))
        .route("/hsn/:id", get(get_hsn).patch(update_hsn).delete(delete_hsn))
        .route("/hsn/:id/category", patch(associate_category))
}

/// Keeps an explicit `null` apart from a missing key.
fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// =============================================================================
// GST rates
// =============================================================================

/// A rate as returned to clients, with the display percentage.
#[derive(Debug, Serialize)]
struct GstRateView {
    #[serde(flatten)]
    rate: GstRate,
    percentage: f64,
}

impl From<GstRate> for GstRateView {
    fn from(rate: GstRate) -> Self {
        let percentage = rate.percentage();
        GstRateView { rate, percentage }
    }
}

#[derive(Debug, Deserialize)]
struct CreateRateRequest {
    rate_name: String,
    percentage: f64,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct UpdateRateRequest {
    #[serde(default)]
    rate_name: Option<String>,
    #[serde(default)]
    percentage: Option<f64>,
    #[serde(default, deserialize_with = "nullable")]
    description: Option<Option<String>>,
}

async fn list_rates(State(state): State<AppState>, _admin: AdminUser) -> ApiResult<Response> {
    let rates: Vec<GstRateView> = state.db.gst_rates().list().await?.into_iter().map(Into::into).collect();
    Ok(response::success("GST rates retrieved", rates))
}

async fn get_rate(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(rate_id): ApiPath<i64>,
) -> ApiResult<Response> {
    let rate = state.db.gst_rates().get(rate_id).await?;
    Ok(response::success("GST rate retrieved", GstRateView::from(rate)))
}

async fn create_rate(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiJson(body): ApiJson<CreateRateRequest>,
) -> ApiResult<Response> {
    let rate = state
        .db
        .gst_rates()
        .create(NewGstRate {
            rate_name: body.rate_name,
            percentage_bps: percentage_to_bps(body.percentage)?,
            description: body.description,
        })
        .await?;
    Ok(response::created("GST rate created", GstRateView::from(rate)))
}

async fn update_rate(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(rate_id): ApiPath<i64>,
    ApiJson(body): ApiJson<UpdateRateRequest>,
) -> ApiResult<Response> {
    let update = GstRateUpdate {
        rate_name: body.rate_name,
        percentage_bps: body.percentage.map(percentage_to_bps).transpose()?,
        description: body.description,
    };
    let rate = state.db.gst_rates().update(rate_id, update).await?;
    Ok(response::success("GST rate updated", GstRateView::from(rate)))
}

/// Refused with 400 IN_USE while an HSN code or product references the rate.
async fn delete_rate(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(rate_id): ApiPath<i64>,
) -> ApiResult<Response> {
    state.db.gst_rates().delete(rate_id).await?;
    Ok(response::success("GST rate deleted", serde_json::json!({ "rate_id": rate_id })))
}

// =============================================================================
// HSN codes
// =============================================================================

#[derive(Debug, Default, Deserialize)]
struct UpdateHsnRequest {
    #[serde(default)]
    code: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    default_gst_rate_id: Option<Option<i64>>,
}

#[derive(Debug, Deserialize)]
struct BulkImportRequest {
    codes: Vec<NewHsnCode>,
}

#[derive(Debug, Deserialize)]
struct AssociateCategoryRequest {
    category_id: i64,
}

async fn list_hsn(State(state): State<AppState>, _admin: AdminUser) -> ApiResult<Response> {
    let codes = state.db.hsn_codes().list().await?;
    Ok(response::success("HSN codes retrieved", codes))
}

async fn get_hsn(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(hsn_code_id): ApiPath<i64>,
) -> ApiResult<Response> {
    let code = state.db.hsn_codes().get(hsn_code_id).await?;
    Ok(response::success("HSN code retrieved", code))
}

async fn get_hsn_by_code(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(code): ApiPath<String>,
) -> ApiResult<Response> {
    let found = state
        .db
        .hsn_codes()
        .find_by_code(&code)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("HSN code {} not found", code)))?;
    Ok(response::success("HSN code retrieved", found))
}

async fn create_hsn(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiJson(body): ApiJson<NewHsnCode>,
) -> ApiResult<Response> {
    let code = state.db.hsn_codes().create(body).await?;
    Ok(response::created("HSN code created", code))
}

async fn update_hsn(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(hsn_code_id): ApiPath<i64>,
    ApiJson(body): ApiJson<UpdateHsnRequest>,
) -> ApiResult<Response> {
    let update = HsnCodeUpdate {
        code: body.code,
        description: body.description,
        default_gst_rate_id: body.default_gst_rate_id,
    };
    let code = state.db.hsn_codes().update(hsn_code_id, update).await?;
    Ok(response::success("HSN code updated", code))
}

/// Refused with 400 IN_USE while any product references the code.
async fn delete_hsn(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(hsn_code_id): ApiPath<i64>,
) -> ApiResult<Response> {
    state.db.hsn_codes().delete(hsn_code_id).await?;
    Ok(response::success(
        "HSN code deleted",
        serde_json::json!({ "hsn_code_id": hsn_code_id }),
    ))
}

/// Upserts by code in one transaction; any bad row aborts the whole import.
async fn bulk_import_hsn(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiJson(body): ApiJson<BulkImportRequest>,
) -> ApiResult<Response> {
    if body.codes.is_empty() {
        return Err(ApiError::Validation("codes must not be empty".to_string()));
    }
    let summary = state.db.hsn_codes().bulk_import(body.codes).await?;
    Ok(response::success("HSN codes imported", summary))
}

/// Sets the category's default HSN code; existing products are untouched.
async fn associate_category(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(hsn_code_id): ApiPath<i64>,
    ApiJson(body): ApiJson<AssociateCategoryRequest>,
) -> ApiResult<Response> {
    let category = state
        .db
        .hsn_codes()
        .associate_with_category(hsn_code_id, body.category_id)
        .await?;
    Ok(response::success("HSN code associated with category", category))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nullable_fields() {
        let cleared: UpdateHsnRequest = serde_json::from_str(r#"{"default_gst_rate_id": null}"#).unwrap();
        assert_eq!(cleared.default_gst_rate_id, Some(None));

        let untouched: UpdateHsnRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(untouched.default_gst_rate_id, None);

        let set: UpdateRateRequest = serde_json::from_str(r#"{"description": "Luxury"}"#).unwrap();
        assert_eq!(set.description, Some(Some("Luxury".to_string())));
    }

    #[test]
    fn test_rate_view_carries_percentage() {
        let view = GstRateView::from(GstRate {
            rate_id: 2,
            rate_name: "Branded_Packaged".to_string(),
            percentage_bps: 500,
            description: None,
        });
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["percentage_bps"], 500);
        assert_eq!(json["percentage"], 5.0);
    }
}
