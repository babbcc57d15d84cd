//! Embedded schema migrations (`migrations/mysql`, compiled in by
//! `sqlx::migrate!`).
//!
//! ```text
//! 001_initial_schema.sql       gst_rates, hsn_codes, categories, products,
//!                              users, addresses, carts, orders ...
//! 002_default_gst_rates.sql    Default / Branded_* / Packaged_Only slabs
//! ```
//!
//! Files are append-only: add `NNN_description.sql`, never edit an applied
//! one. MySQL commits DDL implicitly, so a file that fails halfway leaves
//! the schema partially changed; keep one concern per file.

use sqlx::MySqlPool;
use tracing::info;

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/mysql");

/// Applies every embedded migration not yet recorded in `_sqlx_migrations`.
pub async fn run_migrations(pool: &MySqlPool) -> DbResult<()> {
    let embedded = MIGRATOR.migrations.len();
    MIGRATOR.run(pool).await?;
    info!(embedded, "Schema up to date");
    Ok(())
}

/// Embedded vs applied migration counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct MigrationStatus {
    pub embedded: usize,
    pub applied: usize,
}

impl MigrationStatus {
    pub fn is_current(&self) -> bool {
        self.applied >= self.embedded
    }
}

/// Reads the migration ledger. A missing ledger table counts as zero applied.
pub async fn migration_status(pool: &MySqlPool) -> DbResult<MigrationStatus> {
    let applied: i64 = match sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = TRUE")
        .fetch_one(pool)
        .await
    {
        Ok(count) => count,
        Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some("42S02") => 0,
        Err(e) => return Err(e.into()),
    };

    Ok(MigrationStatus {
        embedded: MIGRATOR.migrations.len(),
        applied: applied.max(0) as usize,
    })
}
