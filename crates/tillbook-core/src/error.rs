//! # Error Types
//!
//! Domain-specific error types for tillbook-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tillbook-core errors (this file)                                       │
//! │  ├── CoreError        - Business rule failures (expected, typed)        │
//! │  └── ValidationError  - Input validation failures                       │
//! │                                                                         │
//! │  tillbook-core::command                                                 │
//! │  └── ParseError       - Malformed command text                          │
//! │                                                                         │
//! │  tillbook-db errors (separate crate)                                    │
//! │  └── DbError          - Persistence failures (unexpected)               │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError ─┐                                   │
//! │                          DbError ───┴─► LedgerError → reply text        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (product, id, amounts)
//! 3. Errors are enum variants, never String
//! 4. Each variant maps to a user-facing message

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Error Kind
// =============================================================================

/// Coarse classification used at the dispatch boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad user input.
    Validation,
    /// Product, customer, order, sale or lay-bye could not be resolved.
    NotFound,
    /// The entity is not in a state that allows the operation.
    State,
    /// Not enough stock to satisfy a reservation.
    InsufficientStock,
}

// =============================================================================
// Core Error
// =============================================================================

/// Business rule failures.
///
/// These are expected outcomes of user commands and are always shown to the
/// user. Infrastructure failures never end up here.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An entity could not be resolved for this shop.
    ///
    /// `hint` is a follow-up command the user can try.
    #[error("{entity} not found: {key}")]
    NotFound {
        entity: &'static str,
        key: String,
        hint: Option<String>,
    },

    /// Insufficient stock to complete a reservation.
    ///
    /// ## User Workflow
    /// ```text
    /// sell 5 bread
    ///      │
    ///      ▼
    /// reserve: stock=3
    ///      │
    ///      ▼
    /// InsufficientStock { product: "bread", requested: 5, available: 3 }
    ///      │
    ///      ▼
    /// Reply: "Not enough bread: 3 in stock, 5 requested"
    /// ```
    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        requested: i64,
        available: i64,
    },

    /// A status change outside the allowed transition graph.
    #[error("Cannot move {entity} {id} from {from} to {to}")]
    InvalidTransition {
        entity: &'static str,
        id: String,
        from: String,
        to: String,
    },

    /// The entity was already cancelled; nothing was changed.
    #[error("{entity} {id} is already cancelled")]
    AlreadyCancelled { entity: &'static str, id: String },

    /// An installment larger than the outstanding balance.
    #[error("Payment of {amount} exceeds balance due of {balance_due}")]
    Overpayment { amount: Money, balance_due: Money },

    /// A credit entry that would take the customer past their limit.
    #[error("Credit of {amount} would exceed the limit of {limit} for {customer} (balance {balance})")]
    CreditLimitExceeded {
        customer: String,
        amount: Money,
        balance: Money,
        limit: Money,
    },

    /// Optimistic retries were exhausted while other commands kept
    /// modifying the same record.
    #[error("{entity} {id} is busy, please try again")]
    ConcurrentModification { entity: &'static str, id: String },

    /// Validation error (wraps ValidationError).
    #[error("{0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error without a hint.
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity,
            key: key.into(),
            hint: None,
        }
    }

    /// Creates a NotFound error that suggests a next command.
    pub fn not_found_with_hint(
        entity: &'static str,
        key: impl Into<String>,
        hint: impl Into<String>,
    ) -> Self {
        CoreError::NotFound {
            entity,
            key: key.into(),
            hint: Some(hint.into()),
        }
    }

    /// Classifies the error for reply formatting.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::NotFound { .. } => ErrorKind::NotFound,
            CoreError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            CoreError::InvalidTransition { .. }
            | CoreError::AlreadyCancelled { .. }
            | CoreError::Overpayment { .. }
            | CoreError::CreditLimitExceeded { .. }
            | CoreError::ConcurrentModification { .. } => ErrorKind::State,
            CoreError::Validation(_) => ErrorKind::Validation,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Used for early validation before any ledger mutation runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} cannot be negative")]
    Negative { field: String },

    /// Amount above the ledger's money ceiling.
    #[error("{field} cannot be more than {max}")]
    TooLarge { field: String, max: Money },

    /// Invalid format (e.g., invalid amount, invalid phone).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {}", allowed.join(", "))]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Duplicate value (e.g., duplicate product name).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
