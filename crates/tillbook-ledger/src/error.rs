//! # Ledger Error Types
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CoreError  (expected: bad input, wrong state, no stock)                │
//! │      └──► LedgerError::Business ──► specific reply text                 │
//! │                                                                         │
//! │  DbError    (unexpected: SQLite, pool, migrations)                      │
//! │      └──► LedgerError::Persistence ──► tracing::error! + retry reply    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use thiserror::Error;

use tillbook_core::{CoreError, ValidationError};
use tillbook_db::DbError;

/// Errors returned by ledger services.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A business rule rejected the command.
    #[error(transparent)]
    Business(#[from] CoreError),

    /// Storage failed underneath the command.
    #[error("Persistence failure: {0}")]
    Persistence(#[from] DbError),
}

impl From<ValidationError> for LedgerError {
    fn from(err: ValidationError) -> Self {
        LedgerError::Business(CoreError::Validation(err))
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Persistence(DbError::from(err))
    }
}

impl LedgerError {
    /// The business error, if this is one.
    pub fn as_business(&self) -> Option<&CoreError> {
        match self {
            LedgerError::Business(err) => Some(err),
            LedgerError::Persistence(_) => None,
        }
    }
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

/// Report rendering failures.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to write report to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode report: {0}")]
    Encode(#[from] serde_json::Error),
}
