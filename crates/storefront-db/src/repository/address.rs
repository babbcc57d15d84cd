//! # Address Repository
//!
//! Shipping addresses owned by users.
//!
//! ## Default Address
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  set_default(user, address) is ONE statement:                           │
//! │                                                                         │
//! │    UPDATE addresses SET is_default = (address_id = ?) WHERE user_id = ? │
//! │                                                                         │
//! │  Every address of the user is rewritten at once, so there is never a   │
//! │  moment with zero or two defaults.                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Deserialize;
use sqlx::MySqlPool;
use tracing::info;

use crate::error::{DbError, DbResult};
use storefront_core::validation::validate_required_text;
use storefront_core::Address;

const ADDRESS_COLUMNS: &str = "address_id, user_id, full_name, phone, address_line1, address_line2, \
     city, state, postal_code, country, is_default";

/// Input for creating an address.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAddress {
    pub full_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub address_line1: String,
    #[serde(default)]
    pub address_line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default)]
    pub is_default: bool,
}

fn default_country() -> String {
    "India".to_string()
}

impl NewAddress {
    fn validate(&self) -> DbResult<()> {
        validate_required_text("full_name", &self.full_name, 100)?;
        validate_required_text("address_line1", &self.address_line1, 255)?;
        validate_required_text("city", &self.city, 100)?;
        validate_required_text("state", &self.state, 100)?;
        validate_required_text("postal_code", &self.postal_code, 12)?;
        validate_required_text("country", &self.country, 60)?;
        Ok(())
    }
}

/// Repository for address database operations.
#[derive(Debug, Clone)]
pub struct AddressRepository {
    pool: MySqlPool,
}

impl AddressRepository {
    /// Creates a new AddressRepository.
    pub fn new(pool: MySqlPool) -> Self {
        AddressRepository { pool }
    }

    /// Lists a user's addresses, default first.
    pub async fn list_for_user(&self, user_id: i64) -> DbResult<Vec<Address>> {
        let addresses = sqlx::query_as::<_, Address>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM addresses WHERE user_id = ? \
             ORDER BY is_default DESC, address_id"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(addresses)
    }

    pub async fn find(&self, address_id: i64) -> DbResult<Option<Address>> {
        let address = sqlx::query_as::<_, Address>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM addresses WHERE address_id = ?"
        ))
        .bind(address_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(address)
    }

    /// Gets an address that belongs to `user_id`.
    ///
    /// Someone else's address is reported as not found.
    pub async fn get_owned(&self, user_id: i64, address_id: i64) -> DbResult<Address> {
        self.find(address_id)
            .await?
            .filter(|a| a.user_id == user_id)
            .ok_or_else(|| DbError::not_found("Address", address_id))
    }

    /// Creates an address. The user's first address becomes the default.
    pub async fn create(&self, user_id: i64, input: NewAddress) -> DbResult<Address> {
        input.validate()?;

        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM addresses WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        let result = sqlx::query(
            "INSERT INTO addresses (user_id, full_name, phone, address_line1, address_line2, \
             city, state, postal_code, country, is_default) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, FALSE)",
        )
        .bind(user_id)
        .bind(input.full_name.trim())
        .bind(&input.phone)
        .bind(input.address_line1.trim())
        .bind(&input.address_line2)
        .bind(input.city.trim())
        .bind(input.state.trim())
        .bind(input.postal_code.trim())
        .bind(input.country.trim())
        .execute(&self.pool)
        .await?;

        let address_id = result.last_insert_id() as i64;
        info!(user_id, address_id, "Address created");

        if input.is_default || existing == 0 {
            self.set_default(user_id, address_id).await?;
        }

        self.get_owned(user_id, address_id).await
    }

    /// Makes `address_id` the user's only default address.
    pub async fn set_default(&self, user_id: i64, address_id: i64) -> DbResult<Address> {
        // Ownership first: an unowned id would otherwise clear every default.
        self.get_owned(user_id, address_id).await?;

        sqlx::query("UPDATE addresses SET is_default = (address_id = ?) WHERE user_id = ?")
            .bind(address_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        info!(user_id, address_id, "Default address set");
        self.get_owned(user_id, address_id).await
    }
}
