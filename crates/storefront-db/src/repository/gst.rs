//! # GST Rate Repository
//!
//! CRUD for GST slabs and the database side of rate resolution.
//!
//! ## Reference Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  gst_rates ◄──── hsn_codes.default_gst_rate_id                          │
//! │      ▲                                                                  │
//! │      └────────── products.custom_gst_rate_id                            │
//! │                                                                         │
//! │  delete(rate) is refused with DbError::InUse while either reference     │
//! │  exists. rate_name is unique (the resolver looks rules up by name).     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::MySqlPool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::product::fetch_product;
use storefront_core::tax::{resolve_rate, ResolvedRate};
use storefront_core::validation::{validate_gst_bps, validate_rate_name};
use storefront_core::{GstRate, HsnCode, Product};

const RATE_COLUMNS: &str = "rate_id, rate_name, percentage_bps, description";

/// Input for creating a GST rate.
#[derive(Debug, Clone)]
pub struct NewGstRate {
    pub rate_name: String,
    pub percentage_bps: u32,
    pub description: Option<String>,
}

/// Partial update of a GST rate. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct GstRateUpdate {
    pub rate_name: Option<String>,
    pub percentage_bps: Option<u32>,
    pub description: Option<Option<String>>,
}

/// Repository for GST rate database operations.
#[derive(Debug, Clone)]
pub struct GstRateRepository {
    pool: MySqlPool,
}

impl GstRateRepository {
    /// Creates a new GstRateRepository.
    pub fn new(pool: MySqlPool) -> Self {
        GstRateRepository { pool }
    }

    /// Lists all rates, lowest percentage first.
    pub async fn list(&self) -> DbResult<Vec<GstRate>> {
        let rates = sqlx::query_as::<_, GstRate>(&format!(
            "SELECT {RATE_COLUMNS} FROM gst_rates ORDER BY percentage_bps, rate_name"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rates)
    }

    pub async fn find(&self, rate_id: i64) -> DbResult<Option<GstRate>> {
        let rate = sqlx::query_as::<_, GstRate>(&format!(
            "SELECT {RATE_COLUMNS} FROM gst_rates WHERE rate_id = ?"
        ))
        .bind(rate_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(rate)
    }

    /// Gets a rate by ID, failing with NotFound.
    pub async fn get(&self, rate_id: i64) -> DbResult<GstRate> {
        self.find(rate_id)
            .await?
            .ok_or_else(|| DbError::not_found("GST rate", rate_id))
    }

    pub async fn find_by_name(&self, rate_name: &str) -> DbResult<Option<GstRate>> {
        let rate = sqlx::query_as::<_, GstRate>(&format!(
            "SELECT {RATE_COLUMNS} FROM gst_rates WHERE rate_name = ?"
        ))
        .bind(rate_name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(rate)
    }

    /// Creates a rate after validating it and checking the name is free.
    pub async fn create(&self, input: NewGstRate) -> DbResult<GstRate> {
        let rate_name = input.rate_name.trim().to_string();
        validate_rate_name(&rate_name)?;
        validate_gst_bps(input.percentage_bps)?;

        if self.find_by_name(&rate_name).await?.is_some() {
            return Err(DbError::duplicate("rate_name", rate_name));
        }

        debug!(rate_name = %rate_name, bps = input.percentage_bps, "Creating GST rate");

        let result = sqlx::query(
            "INSERT INTO gst_rates (rate_name, percentage_bps, description) VALUES (?, ?, ?)",
        )
        .bind(&rate_name)
        .bind(input.percentage_bps)
        .bind(&input.description)
        .execute(&self.pool)
        .await?;

        let rate_id = result.last_insert_id() as i64;
        info!(rate_id, rate_name = %rate_name, "GST rate created");

        Ok(GstRate {
            rate_id,
            rate_name,
            percentage_bps: input.percentage_bps,
            description: input.description,
        })
    }

    /// Applies a partial update.
    pub async fn update(&self, rate_id: i64, update: GstRateUpdate) -> DbResult<GstRate> {
        let mut rate = self.get(rate_id).await?;

        if let Some(name) = update.rate_name {
            let name = name.trim().to_string();
            validate_rate_name(&name)?;
            if let Some(existing) = self.find_by_name(&name).await? {
                if existing.rate_id != rate_id {
                    return Err(DbError::duplicate("rate_name", name));
                }
            }
            rate.rate_name = name;
        }
        if let Some(bps) = update.percentage_bps {
            validate_gst_bps(bps)?;
            rate.percentage_bps = bps;
        }
        if let Some(description) = update.description {
            rate.description = description;
        }

        sqlx::query(
            "UPDATE gst_rates SET rate_name = ?, percentage_bps = ?, description = ? WHERE rate_id = ?",
        )
        .bind(&rate.rate_name)
        .bind(rate.percentage_bps)
        .bind(&rate.description)
        .bind(rate_id)
        .execute(&self.pool)
        .await?;

        info!(rate_id, "GST rate updated");
        Ok(rate)
    }

    /// Deletes an unreferenced rate.
    ///
    /// ## Returns
    /// - `Err(InUse)` while any HSN code or product references the rate
    /// - `Err(NotFound)` if the rate doesn't exist
    pub async fn delete(&self, rate_id: i64) -> DbResult<()> {
        self.get(rate_id).await?;

        let hsn_refs: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM hsn_codes WHERE default_gst_rate_id = ?")
                .bind(rate_id)
                .fetch_one(&self.pool)
                .await?;
        let product_refs: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE custom_gst_rate_id = ?")
                .bind(rate_id)
                .fetch_one(&self.pool)
                .await?;

        if hsn_refs > 0 || product_refs > 0 {
            return Err(DbError::in_use(
                "GST rate",
                rate_id,
                format!("{} HSN code(s) and {} product(s)", hsn_refs, product_refs),
            ));
        }

        sqlx::query("DELETE FROM gst_rates WHERE rate_id = ?")
            .bind(rate_id)
            .execute(&self.pool)
            .await?;

        info!(rate_id, "GST rate deleted");
        Ok(())
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// Resolves the rate for an already loaded product.
    ///
    /// Also returns the product's HSN row so callers can snapshot its code.
    pub async fn resolve_for(&self, product: &Product) -> DbResult<(ResolvedRate, Option<HsnCode>)> {
        let hsn = match product.hsn_code_id {
            Some(hsn_code_id) => {
                sqlx::query_as::<_, HsnCode>(
                    "SELECT hsn_code_id, code, description, default_gst_rate_id \
                     FROM hsn_codes WHERE hsn_code_id = ?",
                )
                .bind(hsn_code_id)
                .fetch_optional(&self.pool)
                .await?
            }
            None => None,
        };

        let rates = self.list().await?;
        let resolved = resolve_rate(product, hsn.as_ref(), &rates);

        debug!(
            product_id = product.product_id,
            rate = %resolved.rate.rate_name,
            source = ?resolved.source,
            "Resolved GST rate"
        );

        Ok((resolved, hsn))
    }

    /// Resolves the GST rate that applies to a product.
    ///
    /// Incomplete configuration never fails (see `storefront_core::tax`);
    /// a missing product or a database error does.
    pub async fn determine_rate_for_product(&self, product_id: i64) -> DbResult<ResolvedRate> {
        let product = fetch_product(&self.pool, product_id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", product_id))?;
        let (resolved, _) = self.resolve_for(&product).await?;
        Ok(resolved)
    }
}
