//! # Database Error Types
//!
//! ```text
//! sqlx::Error ──► DbError ──► LedgerError::Persistence (tillbook-ledger)
//!                    │
//!                    └── UniqueViolation / NotFound are also inspected by
//!                        the ledger and turned into business errors
//! ```
//!
//! Lost optimistic races are not errors at this layer: version-checked
//! updates return `Ok(false)` and the caller decides whether to retry.

use sqlx::error::ErrorKind;
use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A UNIQUE index rejected the write.
    ///
    /// Raised for a product name or phone number reused in the same shop,
    /// and for two credit entries racing for the same `seq`.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// A CHECK constraint rejected the write (negative stock, zero amount).
    #[error("Constraint violation: {0}")]
    CheckViolation(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Query failed: {0}")]
    Query(String),

    /// A stored JSON column could not be encoded or decoded.
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Sqlx(sqlx::Error),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self, DbError::UniqueViolation { .. })
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                match db_err.kind() {
                    ErrorKind::UniqueViolation => DbError::duplicate(unique_field(&message), ""),
                    ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation(message),
                    ErrorKind::CheckViolation => DbError::CheckViolation(message),
                    _ => DbError::Query(message),
                }
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                DbError::Connection(err.to_string())
            }
            other => DbError::Sqlx(other),
        }
    }
}

/// Column named by "UNIQUE constraint failed: products.shop_id, products.name".
///
/// The last column wins, `shop_id` leads every composite index.
fn unique_field(message: &str) -> String {
    message
        .rsplit(['.', ' '])
        .next()
        .filter(|col| !col.is_empty())
        .unwrap_or("value")
        .to_string()
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_field_takes_last_column() {
        assert_eq!(
            unique_field("UNIQUE constraint failed: products.shop_id, products.name"),
            "name"
        );
        assert_eq!(unique_field("UNIQUE constraint failed: customers.phone"), "phone");
        assert_eq!(unique_field(""), "value");
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err = DbError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, DbError::NotFound { .. }));
        assert!(!err.is_unique_violation());
    }
}
