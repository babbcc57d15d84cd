//! # HSN Code Repository
//!
//! The HSN registry: classification codes, each optionally carrying a
//! default GST rate.
//!
//! ## Rules
//! - `code` is unique; the uniqueness check compares lowercased codes so it
//!   does not depend on the column collation
//! - delete is refused while any product references the code
//! - associating a code with a category sets the category's default and
//!   leaves existing products untouched
//! - bulk import upserts by code inside one transaction (all or nothing)

use serde::Deserialize;
use sqlx::{MySqlConnection, MySqlPool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use storefront_core::validation::validate_hsn_code;
use storefront_core::{Category, HsnCode};

const HSN_COLUMNS: &str = "hsn_code_id, code, description, default_gst_rate_id";

/// Input for creating an HSN code or one row of a bulk import.
#[derive(Debug, Clone, Deserialize)]
pub struct NewHsnCode {
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub default_gst_rate_id: Option<i64>,
}

/// Partial update of an HSN code. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct HsnCodeUpdate {
    pub code: Option<String>,
    pub description: Option<Option<String>>,
    pub default_gst_rate_id: Option<Option<i64>>,
}

/// Outcome of a bulk import.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct HsnImportSummary {
    pub created: u64,
    pub updated: u64,
}

/// Repository for HSN code database operations.
#[derive(Debug, Clone)]
pub struct HsnCodeRepository {
    pool: MySqlPool,
}

impl HsnCodeRepository {
    /// Creates a new HsnCodeRepository.
    pub fn new(pool: MySqlPool) -> Self {
        HsnCodeRepository { pool }
    }

    pub async fn list(&self) -> DbResult<Vec<HsnCode>> {
        let codes = sqlx::query_as::<_, HsnCode>(&format!(
            "SELECT {HSN_COLUMNS} FROM hsn_codes ORDER BY code"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(codes)
    }

    pub async fn find(&self, hsn_code_id: i64) -> DbResult<Option<HsnCode>> {
        let code = sqlx::query_as::<_, HsnCode>(&format!(
            "SELECT {HSN_COLUMNS} FROM hsn_codes WHERE hsn_code_id = ?"
        ))
        .bind(hsn_code_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(code)
    }

    /// Gets an HSN code by ID, failing with NotFound.
    pub async fn get(&self, hsn_code_id: i64) -> DbResult<HsnCode> {
        self.find(hsn_code_id)
            .await?
            .ok_or_else(|| DbError::not_found("HSN code", hsn_code_id))
    }

    /// Looks a code up by its string, ignoring letter case.
    pub async fn find_by_code(&self, code: &str) -> DbResult<Option<HsnCode>> {
        let mut conn = self.pool.acquire().await?;
        find_by_code(&mut conn, code).await
    }

    pub async fn create(&self, input: NewHsnCode) -> DbResult<HsnCode> {
        let mut conn = self.pool.acquire().await?;
        let code = insert_code(&mut conn, input).await?;
        info!(hsn_code_id = code.hsn_code_id, code = %code.code, "HSN code created");
        Ok(code)
    }

    pub async fn update(&self, hsn_code_id: i64, update: HsnCodeUpdate) -> DbResult<HsnCode> {
        let mut hsn = self.get(hsn_code_id).await?;

        if let Some(code) = update.code {
            let code = code.trim().to_string();
            validate_hsn_code(&code)?;
            if let Some(existing) = self.find_by_code(&code).await? {
                if existing.hsn_code_id != hsn_code_id {
                    return Err(DbError::duplicate("code", code));
                }
            }
            hsn.code = code;
        }
        if let Some(description) = update.description {
            hsn.description = description;
        }
        if let Some(rate_id) = update.default_gst_rate_id {
            if let Some(rate_id) = rate_id {
                let mut conn = self.pool.acquire().await?;
                ensure_rate_exists(&mut conn, rate_id).await?;
            }
            hsn.default_gst_rate_id = rate_id;
        }

        sqlx::query(
            "UPDATE hsn_codes SET code = ?, description = ?, default_gst_rate_id = ? WHERE hsn_code_id = ?",
        )
        .bind(&hsn.code)
        .bind(&hsn.description)
        .bind(hsn.default_gst_rate_id)
        .bind(hsn_code_id)
        .execute(&self.pool)
        .await?;

        info!(hsn_code_id, "HSN code updated");
        Ok(hsn)
    }

    /// Deletes a code no product uses.
    ///
    /// ## Returns
    /// - `Err(InUse)` while products reference the code
    pub async fn delete(&self, hsn_code_id: i64) -> DbResult<()> {
        self.get(hsn_code_id).await?;

        let product_refs: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE hsn_code_id = ?")
            .bind(hsn_code_id)
            .fetch_one(&self.pool)
            .await?;

        if product_refs > 0 {
            return Err(DbError::in_use(
                "HSN code",
                hsn_code_id,
                format!("{} product(s)", product_refs),
            ));
        }

        sqlx::query("DELETE FROM hsn_codes WHERE hsn_code_id = ?")
            .bind(hsn_code_id)
            .execute(&self.pool)
            .await?;

        info!(hsn_code_id, "HSN code deleted");
        Ok(())
    }

    /// Creates or updates each row by code inside one transaction.
    ///
    /// Any invalid row aborts the whole import.
    pub async fn bulk_import(&self, rows: Vec<NewHsnCode>) -> DbResult<HsnImportSummary> {
        let mut summary = HsnImportSummary::default();
        let mut tx = self.pool.begin().await?;

        for row in rows {
            let code = row.code.trim().to_string();
            validate_hsn_code(&code)?;

            match find_by_code(&mut *tx, &code).await? {
                Some(existing) => {
                    if let Some(rate_id) = row.default_gst_rate_id {
                        ensure_rate_exists(&mut *tx, rate_id).await?;
                    }
                    sqlx::query(
                        "UPDATE hsn_codes SET description = ?, default_gst_rate_id = ? WHERE hsn_code_id = ?",
                    )
                    .bind(row.description.or(existing.description))
                    .bind(row.default_gst_rate_id.or(existing.default_gst_rate_id))
                    .bind(existing.hsn_code_id)
                    .execute(&mut *tx)
                    .await?;
                    summary.updated += 1;
                }
                None => {
                    insert_code(&mut *tx, row).await?;
                    summary.created += 1;
                }
            }
        }

        tx.commit().await?;
        info!(created = summary.created, updated = summary.updated, "HSN import committed");
        Ok(summary)
    }

    /// Makes `hsn_code_id` the default HSN code of a category.
    ///
    /// Products already in the category keep their own classification.
    pub async fn associate_with_category(&self, hsn_code_id: i64, category_id: i64) -> DbResult<Category> {
        self.get(hsn_code_id).await?;

        let result = sqlx::query("UPDATE categories SET default_hsn_code_id = ? WHERE category_id = ?")
            .bind(hsn_code_id)
            .bind(category_id)
            .execute(&self.pool)
            .await?;

        let category = sqlx::query_as::<_, Category>(
            "SELECT category_id, name, default_hsn_code_id FROM categories WHERE category_id = ?",
        )
        .bind(category_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Category", category_id))?;

        debug!(rows = result.rows_affected(), "Category default HSN set");
        info!(hsn_code_id, category_id, "HSN code associated with category");
        Ok(category)
    }
}

// =============================================================================
// Connection-level helpers
// =============================================================================

async fn find_by_code(conn: &mut MySqlConnection, code: &str) -> DbResult<Option<HsnCode>> {
    let found = sqlx::query_as::<_, HsnCode>(&format!(
        "SELECT {HSN_COLUMNS} FROM hsn_codes WHERE LOWER(code) = LOWER(?)"
    ))
    .bind(code.trim())
    .fetch_optional(&mut *conn)
    .await?;

    Ok(found)
}

async fn ensure_rate_exists(conn: &mut MySqlConnection, rate_id: i64) -> DbResult<()> {
    let found: Option<i64> = sqlx::query_scalar("SELECT rate_id FROM gst_rates WHERE rate_id = ?")
        .bind(rate_id)
        .fetch_optional(&mut *conn)
        .await?;

    match found {
        Some(_) => Ok(()),
        None => Err(DbError::not_found("GST rate", rate_id)),
    }
}

async fn insert_code(conn: &mut MySqlConnection, input: NewHsnCode) -> DbResult<HsnCode> {
    let code = input.code.trim().to_string();
    validate_hsn_code(&code)?;

    if find_by_code(conn, &code).await?.is_some() {
        return Err(DbError::duplicate("code", code));
    }
    if let Some(rate_id) = input.default_gst_rate_id {
        ensure_rate_exists(conn, rate_id).await?;
    }

    let result = sqlx::query(
        "INSERT INTO hsn_codes (code, description, default_gst_rate_id) VALUES (?, ?, ?)",
    )
    .bind(&code)
    .bind(&input.description)
    .bind(input.default_gst_rate_id)
    .execute(&mut *conn)
    .await?;

    Ok(HsnCode {
        hsn_code_id: result.last_insert_id() as i64,
        code,
        description: input.description,
        default_gst_rate_id: input.default_gst_rate_id,
    })
}
