//! Repository errors.
//!
//! MySQL failures are classified by server error kind (duplicate key,
//! foreign key); business-rule failures from storefront-core pass through
//! untouched in [`DbError::Core`] so the API layer can still tell an empty
//! cart from a broken connection.

use sqlx::error::ErrorKind;
use thiserror::Error;

use storefront_core::CoreError;

#[derive(Debug, Error)]
pub enum DbError {
    /// No row for the requested id (order, product, GST rate ...).
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation or an application-level uniqueness check.
    ///
    /// ## When This Occurs
    /// - Creating a GST rate whose name is taken
    /// - Creating an HSN code that exists (any letter case)
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// A write pointed at a row that doesn't exist (MySQL 1452).
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Delete blocked because other rows still reference the entity.
    ///
    /// ## When This Occurs
    /// - Deleting a GST rate used by an HSN code or a product
    /// - Deleting an HSN code assigned to a product
    #[error("Cannot delete {entity} {id}: it is still used by {referenced_by}")]
    InUse {
        entity: String,
        id: String,
        referenced_by: String,
    },

    /// A business rule rejected the operation.
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Could not connect to MySQL: {0}")]
    ConnectionFailed(String),

    #[error("Schema migration failed: {0}")]
    MigrationFailed(String),

    /// MySQL rejected the statement for another reason.
    #[error("Statement rejected: {0}")]
    QueryFailed(String),

    /// No connection freed up within the acquire timeout.
    #[error("Timed out waiting for a database connection")]
    PoolExhausted,

    #[error("Unexpected database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// `referenced_by` reads as "used by ..." in the message.
    pub fn in_use(entity: impl Into<String>, id: impl ToString, referenced_by: impl Into<String>) -> Self {
        DbError::InUse {
            entity: entity.into(),
            id: id.to_string(),
            referenced_by: referenced_by.into(),
        }
    }
}

/// ```text
/// sqlx::Error::RowNotFound             → DbError::NotFound
/// Database (1062 duplicate entry)      → DbError::UniqueViolation
/// Database (1451 / 1452 foreign key)   → DbError::ForeignKeyViolation
/// sqlx::Error::PoolTimedOut            → DbError::PoolExhausted
/// Other                                → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Row", "?"),

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message().to_string();
                match db_err.kind() {
                    // "Duplicate entry 'x' for key 'table.index'"
                    ErrorKind::UniqueViolation => {
                        let value = msg.split('\'').nth(1).unwrap_or("unknown").to_string();
                        let field = msg.split('\'').nth(3).unwrap_or("unknown").to_string();
                        DbError::UniqueViolation { field, value }
                    }
                    ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation { message: msg },
                    _ => DbError::QueryFailed(msg),
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool closed during shutdown".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<storefront_core::ValidationError> for DbError {
    fn from(err: storefront_core::ValidationError) -> Self {
        DbError::Core(CoreError::Validation(err))
    }
}

pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_use_message() {
        let err = DbError::in_use("GST rate", 3, "2 products");
        assert_eq!(
            err.to_string(),
            "Cannot delete GST rate 3: it is still used by 2 products"
        );
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: DbError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[test]
    fn test_core_errors_pass_through() {
        let err: DbError = CoreError::EmptyCart.into();
        assert!(matches!(err, DbError::Core(CoreError::EmptyCart)));
        assert_eq!(err.to_string(), "Cart is empty");
    }
}
