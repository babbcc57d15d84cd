//! Business-rule checks that serde can't express.
//!
//! Deserialization already rejected wrong types; MySQL still enforces
//! uniqueness and foreign keys. What lands here is everything in between:
//! HSN code shape, GST slab range, cart quantity limits.
//!
//! ```rust
//! use storefront_core::validation::{validate_hsn_code, validate_quantity};
//!
//! assert!(validate_hsn_code("1001").is_ok());
//! assert!(validate_quantity(5).is_ok());
//! ```

use crate::error::ValidationError;
use crate::{MAX_CART_ITEMS, MAX_GST_BPS, MAX_ITEM_QUANTITY, MAX_PRICE_PAISE};

pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Tax Validators
// =============================================================================

/// Validates an HSN code.
///
/// ## Rules
/// - Must not be empty
/// - Digits only, 2 to 8 of them (chapter, heading, sub-heading, tariff item)
///
/// ## Example
/// ```rust
/// use storefront_core::validation::validate_hsn_code;
///
/// assert!(validate_hsn_code("1001").is_ok());
/// assert!(validate_hsn_code("10019910").is_ok());
/// assert!(validate_hsn_code("1").is_err());
/// assert!(validate_hsn_code("10A1").is_err());
/// ```
pub fn validate_hsn_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "code".to_string(),
        });
    }

    if !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: "must contain only digits".to_string(),
        });
    }

    if !(2..=8).contains(&code.len()) {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: "must be 2 to 8 digits long".to_string(),
        });
    }

    Ok(())
}

/// Validates a GST rate name.
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Letters, digits, underscores and spaces (`Branded_Packaged`)
pub fn validate_rate_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "rate_name".to_string(),
        });
    }

    if name.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "rate_name".to_string(),
            max: 50,
        });
    }

    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == ' ' || c == '-')
    {
        return Err(ValidationError::InvalidFormat {
            field: "rate_name".to_string(),
            reason: "must contain only letters, numbers, spaces, hyphens and underscores"
                .to_string(),
        });
    }

    Ok(())
}

/// Validates a GST percentage in basis points.
///
/// ## Rules
/// - 0 to 2800 (0% to 28%, the highest GST slab)
pub fn validate_gst_bps(bps: u32) -> ValidationResult<()> {
    if bps > MAX_GST_BPS {
        return Err(ValidationError::OutOfRange {
            field: "percentage".to_string(),
            min: 0,
            max: (MAX_GST_BPS / 100) as i64,
        });
    }

    Ok(())
}

/// Converts a display percentage (`18`, `2.5`) into basis points, validating it.
///
/// ```rust
/// use storefront_core::validation::percentage_to_bps;
///
/// assert_eq!(percentage_to_bps(18.0).unwrap(), 1800);
/// assert_eq!(percentage_to_bps(0.25).unwrap(), 25);
/// assert!(percentage_to_bps(-1.0).is_err());
/// assert!(percentage_to_bps(30.0).is_err());
/// ```
pub fn percentage_to_bps(percentage: f64) -> ValidationResult<u32> {
    let out_of_range = || ValidationError::OutOfRange {
        field: "percentage".to_string(),
        min: 0,
        max: (MAX_GST_BPS / 100) as i64,
    };

    if !percentage.is_finite() || percentage < 0.0 {
        return Err(out_of_range());
    }

    let bps = (percentage * 100.0).round();
    if bps > MAX_GST_BPS as f64 {
        return Err(out_of_range());
    }

    Ok(bps as u32)
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity value.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in paise. Zero is allowed (free items).
///
/// ```rust
/// use storefront_core::validation::validate_price_paise;
///
/// assert!(validate_price_paise(1099).is_ok());
/// assert!(validate_price_paise(0).is_ok());
/// assert!(validate_price_paise(-100).is_err());
/// ```
pub fn validate_price_paise(paise: i64) -> ValidationResult<()> {
    if !(0..=MAX_PRICE_PAISE).contains(&paise) {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: MAX_PRICE_PAISE,
        });
    }

    Ok(())
}

/// Validates a database identifier supplied by a client.
pub fn validate_id(field: &str, id: i64) -> ValidationResult<()> {
    if id <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates cart size (number of distinct products) before adding one more.
pub fn validate_cart_size(current_items: usize) -> ValidationResult<()> {
    if current_items >= MAX_CART_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "cart items".to_string(),
            min: 0,
            max: MAX_CART_ITEMS as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Contact Validators
// =============================================================================

/// Validates an email address shape (`local@domain.tld`).
///
/// Deliverability is the mail transport's concern.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::Required {
            field: "email".to_string(),
        });
    }

    if email.len() > 254 {
        return Err(ValidationError::TooLong {
            field: "email".to_string(),
            max: 254,
        });
    }

    let invalid = || ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: "must be a valid email address".to_string(),
    };

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.contains('@')
        || email.chars().any(char::is_whitespace)
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
    {
        return Err(invalid());
    }

    Ok(())
}

/// Validates a required free-text field with a maximum length.
pub fn validate_required_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.len() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
