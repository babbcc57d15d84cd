//! # API Error Types
//!
//! `ApiError` is what the client sees: an HTTP status, a stable
//! [`ErrorCode`] and a message. Every lower layer error converts into it
//! with `From`, so handlers simply use `?`.
//!
//! ## Response Shape
//! ```text
//! 4xx  { "status": "fail",  "code": "INSUFFICIENT_STOCK", "message": "...", "details": [...] }
//! 5xx  { "status": "error", "code": "DATABASE_ERROR",     "message": "An internal error occurred" }
//! ```
//!
//! 5xx messages are generic. The real message travels in an
//! [`InternalDetail`] response extension, which the development-only
//! [`expose_internal_detail`] layer writes back into the body.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use storefront_core::cart::StockShortfall;
use storefront_core::{CoreError, ValidationError};
use storefront_db::DbError;

/// Stable machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    ValidationError,
    Unauthorized,
    Forbidden,
    InsufficientStock,
    InvalidStatus,
    InUse,
    EmptyCart,
    Conflict,
    DatabaseError,
    Internal,
}

/// API errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request validation failed (400).
    #[error("{0}")]
    Validation(String),

    /// Resource not found (404).
    #[error("{0}")]
    NotFound(String),

    /// Missing or invalid credentials (401).
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated but not allowed (403).
    #[error("{0}")]
    Forbidden(String),

    /// Stock can't cover one or more lines (400).
    #[error("{message}")]
    InsufficientStock {
        message: String,
        shortfalls: Vec<StockShortfall>,
    },

    /// Order status transition refused (400).
    #[error("{0}")]
    InvalidStatus(String),

    /// Delete refused while the row is referenced (400).
    #[error("{0}")]
    InUse(String),

    /// Checkout of an empty cart (400).
    #[error("Cart is empty")]
    EmptyCart,

    /// Uniqueness conflict (409).
    #[error("{0}")]
    Conflict(String),

    /// Database failure (500). Message is logged, not returned in production.
    #[error("{0}")]
    Database(String),

    /// Anything else (500).
    #[error("{0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Unredacted code and message of a 5xx response.
#[derive(Debug, Clone)]
pub struct InternalDetail {
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    status: &'static str,
    code: ErrorCode,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a [StockShortfall]>,
}

impl ApiError {
    /// HTTP status and stable code for this error.
    pub fn status_and_code(&self) -> (StatusCode, ErrorCode) {
        match self {
            Self::Validation(_) => (StatusCode::BAD_REQUEST, ErrorCode::ValidationError),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, ErrorCode::NotFound),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, ErrorCode::Unauthorized),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, ErrorCode::Forbidden),
            Self::InsufficientStock { .. } => (StatusCode::BAD_REQUEST, ErrorCode::InsufficientStock),
            Self::InvalidStatus(_) => (StatusCode::BAD_REQUEST, ErrorCode::InvalidStatus),
            Self::InUse(_) => (StatusCode::BAD_REQUEST, ErrorCode::InUse),
            Self::EmptyCart => (StatusCode::BAD_REQUEST, ErrorCode::EmptyCart),
            Self::Conflict(_) => (StatusCode::CONFLICT, ErrorCode::Conflict),
            Self::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::DatabaseError),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::Internal),
        }
    }

    /// Builds the 400 listing every line stock can't cover.
    pub fn insufficient_stock(shortfalls: Vec<StockShortfall>) -> Self {
        let names: Vec<&str> = shortfalls.iter().map(|s| s.name.as_str()).collect();
        ApiError::InsufficientStock {
            message: format!("Insufficient stock for: {}", names.join(", ")),
            shortfalls,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let server_side = status.is_server_error();

        if server_side {
            tracing::error!(code = ?code, error = %self, "Request failed");
        }

        let detail = self.to_string();
        let message = if server_side {
            "An internal error occurred"
        } else {
            detail.as_str()
        };
        let details = match &self {
            Self::InsufficientStock { shortfalls, .. } => Some(shortfalls.as_slice()),
            _ => None,
        };

        let body = ErrorBody {
            status: if server_side { "error" } else { "fail" },
            code,
            message,
            details,
        };

        let mut response = (status, Json(body)).into_response();
        if server_side {
            response.extensions_mut().insert(InternalDetail { code, message: detail });
        }
        response
    }
}

/// Development layer: replaces the generic 5xx message with the real one.
pub async fn expose_internal_detail(response: Response) -> Response {
    let Some(detail) = response.extensions().get::<InternalDetail>().cloned() else {
        return response;
    };

    let body = ErrorBody {
        status: "error",
        code: detail.code,
        message: &detail.message,
        details: None,
    };
    (response.status(), Json(body)).into_response()
}

// =============================================================================
// Conversions
// =============================================================================

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ProductNotFound(_) | CoreError::OrderNotFound(_) => ApiError::NotFound(err.to_string()),
            CoreError::InsufficientStock {
                product_id,
                ref name,
                available,
                requested,
            } => ApiError::InsufficientStock {
                message: err.to_string(),
                shortfalls: vec![StockShortfall {
                    product_id,
                    name: name.clone(),
                    available,
                    requested,
                }],
            },
            CoreError::InvalidStatusTransition { .. } | CoreError::OrderNotCancellable { .. } => {
                ApiError::InvalidStatus(err.to_string())
            }
            CoreError::EmptyCart => ApiError::EmptyCart,
            CoreError::CartTooLarge { .. } | CoreError::Validation(_) => ApiError::Validation(err.to_string()),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            DbError::UniqueViolation { .. } => ApiError::Conflict(err.to_string()),
            DbError::ForeignKeyViolation { .. } => ApiError::Validation(err.to_string()),
            DbError::InUse { .. } => ApiError::InUse(err.to_string()),
            DbError::Core(core) => core.into(),
            other => ApiError::Database(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

// =============================================================================
// Extractors with ApiError rejections
// =============================================================================

/// `axum::Json` whose rejection is an [`ApiError`].
#[derive(Debug, axum::extract::FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `axum::extract::Path` whose rejection is an [`ApiError`].
#[derive(Debug, axum::extract::FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// `axum::extract::Query` whose rejection is an [`ApiError`].
#[derive(Debug, axum::extract::FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_core::OrderStatus;

    #[test]
    fn test_not_found_mapping() {
        let err: ApiError = DbError::not_found("Order", 7).into();
        assert_eq!(err.status_and_code(), (StatusCode::NOT_FOUND, ErrorCode::NotFound));
    }

    #[test]
    fn test_business_conflicts_are_400() {
        let stock: ApiError = CoreError::InsufficientStock {
            product_id: 1,
            name: "Atta".into(),
            available: 1,
            requested: 3,
        }
        .into();
        assert_eq!(stock.status_and_code(), (StatusCode::BAD_REQUEST, ErrorCode::InsufficientStock));

        let status: ApiError = CoreError::InvalidStatusTransition {
            from: OrderStatus::Shipped,
            to: OrderStatus::Pending,
        }
        .into();
        assert_eq!(status.status_and_code().1, ErrorCode::InvalidStatus);

        let in_use: ApiError = DbError::in_use("GST rate", 3, "2 product(s)").into();
        assert_eq!(in_use.status_and_code(), (StatusCode::BAD_REQUEST, ErrorCode::InUse));
        assert!(in_use.to_string().starts_with("Cannot delete"));
    }

    #[test]
    fn test_core_inside_db_error_is_unwrapped() {
        let err: ApiError = DbError::Core(CoreError::EmptyCart).into();
        assert!(matches!(err, ApiError::EmptyCart));
    }

    #[test]
    fn test_duplicate_is_conflict() {
        let err: ApiError = DbError::duplicate("code", "1001").into();
        assert_eq!(err.status_and_code().0, StatusCode::CONFLICT);
    }

    #[test]
    fn test_server_errors_are_redacted() {
        let response = ApiError::Database("connection reset by peer".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let detail = response.extensions().get::<InternalDetail>().unwrap();
        assert_eq!(detail.code, ErrorCode::DatabaseError);
        assert_eq!(detail.message, "connection reset by peer");
    }

    #[test]
    fn test_error_code_serializes_screaming() {
        let json = serde_json::to_string(&ErrorCode::InsufficientStock).unwrap();
        assert_eq!(json, "\"INSUFFICIENT_STOCK\"");
    }
}
