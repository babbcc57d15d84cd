//! # User Repository
//!
//! Users are created by the external auth service; this crate only reads
//! them (customer details on invoices, seed data aside).

use sqlx::MySqlPool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use storefront_core::validation::{validate_email, validate_required_text};
use storefront_core::Customer;

/// Repository for user reads.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: MySqlPool,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: MySqlPool) -> Self {
        UserRepository { pool }
    }

    pub async fn find(&self, user_id: i64) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            "SELECT user_id, name, email, phone FROM users WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Gets a user by ID, failing with NotFound.
    pub async fn get(&self, user_id: i64) -> DbResult<Customer> {
        self.find(user_id)
            .await?
            .ok_or_else(|| DbError::not_found("User", user_id))
    }

    /// Inserts a user (seed data and tests only).
    pub async fn insert(&self, name: &str, email: &str, phone: Option<&str>, role: &str) -> DbResult<Customer> {
        validate_required_text("name", name, 100)?;
        validate_email(email)?;

        debug!(email = %email, "Inserting user");

        let result = sqlx::query("INSERT INTO users (name, email, phone, role) VALUES (?, ?, ?, ?)")
            .bind(name)
            .bind(email)
            .bind(phone)
            .bind(role)
            .execute(&self.pool)
            .await?;

        Ok(Customer {
            user_id: result.last_insert_id() as i64,
            name: name.to_string(),
            email: email.to_string(),
            phone: phone.map(str::to_string),
        })
    }
}
