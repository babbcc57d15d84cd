use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tracing::warn;

use crate::response;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

/// `GET /api/health`
async fn health(State(state): State<AppState>) -> Response {
    if state.db.health_check().await {
        // The ledger is informational; a read failure doesn't fail the health check.
        let migrations = match state.db.migration_status().await {
            Ok(status) => json!({
                "embedded": status.embedded,
                "applied": status.applied,
                "current": status.is_current(),
            }),
            Err(e) => {
                warn!(error = %e, "Could not read migration status");
                serde_json::Value::Null
            }
        };
        response::success(
            "Service is healthy",
            json!({ "database": "up", "migrations": migrations }),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "error",
                "code": "DATABASE_ERROR",
                "message": "Database unavailable",
            })),
        )
            .into_response()
    }
}
