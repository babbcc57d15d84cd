//! # Checkout and Validation Errors
//!
//! ```text
//! ValidationError ──► CoreError ──► DbError ──► ApiError ──► { status, code, message }
//!  (bad input)        (rule broken)  (storefront-db)  (storefront-api)
//! ```
//!
//! Callers match on variants. Messages carry the product, order or status
//! involved and are for humans only.

use thiserror::Error;

use crate::types::OrderStatus;

// =============================================================================
// Core Error
// =============================================================================

/// A checkout, stock or order-lifecycle rule was broken.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Product not found: {0}")]
    ProductNotFound(i64),

    /// Not enough stock to fulfil a line.
    ///
    /// ## When This Occurs
    /// - Adding more to the cart than is in stock
    /// - Checkout after another order consumed the stock
    ///
    /// ## User Workflow
    /// ```text
    /// Place order (qty: 5)
    ///      │
    ///      ▼
    /// UPDATE ... WHERE quantity >= 5  → 0 rows
    ///      │
    ///      ▼
    /// InsufficientStock { name: "Atta 5kg", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// Transaction rolled back, nothing persisted
    /// ```
    #[error("Insufficient stock for {name}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: i64,
        name: String,
        available: i64,
        requested: i64,
    },

    #[error("Order not found: {0}")]
    OrderNotFound(i64),

    /// Status change that the order lifecycle does not allow.
    ///
    /// ## When This Occurs
    /// - `pending → shipped` (skips processing)
    /// - Anything out of `delivered` or `cancelled`
    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    /// Cancellation requested for an order that has already shipped.
    #[error("Order {order_id} is {status} and can no longer be cancelled")]
    OrderNotCancellable { order_id: i64, status: OrderStatus },

    /// Checkout attempted with nothing in the cart.
    #[error("Cart is empty")]
    EmptyCart,

    /// Distinct-product limit per cart.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// A request field was rejected before any query ran.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// GST percentage, quantity and similar bounded numbers.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// HSN codes that aren't digits, malformed emails.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Unknown order status or payment method.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product_id: 7,
            name: "Atta 5kg".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Atta 5kg: available 3, requested 5"
        );

        let err = CoreError::InvalidStatusTransition {
            from: OrderStatus::Pending,
            to: OrderStatus::Shipped,
        };
        assert_eq!(
            err.to_string(),
            "Invalid status transition from pending to shipped"
        );
    }

    #[test]
    fn test_validation_message_names_field() {
        let err = ValidationError::OutOfRange {
            field: "percentage".to_string(),
            min: 0,
            max: 28,
        };
        assert_eq!(err.to_string(), "percentage must be between 0 and 28");

        let core: CoreError = err.into();
        assert!(matches!(core, CoreError::Validation(ValidationError::OutOfRange { .. })));
    }
}
