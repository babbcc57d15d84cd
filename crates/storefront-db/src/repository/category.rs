//! # Category Repository
//!
//! Categories carry an optional default HSN code that the catalog applies
//! to newly created products.

use sqlx::MySqlPool;
use tracing::info;

use crate::error::{DbError, DbResult};
use storefront_core::validation::validate_required_text;
use storefront_core::Category;

/// Repository for category database operations.
#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: MySqlPool,
}

impl CategoryRepository {
    /// Creates a new CategoryRepository.
    pub fn new(pool: MySqlPool) -> Self {
        CategoryRepository { pool }
    }

    pub async fn list(&self) -> DbResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT category_id, name, default_hsn_code_id FROM categories ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    pub async fn get(&self, category_id: i64) -> DbResult<Category> {
        sqlx::query_as::<_, Category>(
            "SELECT category_id, name, default_hsn_code_id FROM categories WHERE category_id = ?",
        )
        .bind(category_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Category", category_id))
    }

    pub async fn create(&self, name: &str, default_hsn_code_id: Option<i64>) -> DbResult<Category> {
        validate_required_text("name", name, 100)?;

        let result = sqlx::query("INSERT INTO categories (name, default_hsn_code_id) VALUES (?, ?)")
            .bind(name.trim())
            .bind(default_hsn_code_id)
            .execute(&self.pool)
            .await?;

        let category_id = result.last_insert_id() as i64;
        info!(category_id, name = %name.trim(), "Category created");

        Ok(Category {
            category_id,
            name: name.trim().to_string(),
            default_hsn_code_id,
        })
    }
}
