//! # tillbook-core: Pure Business Logic for Tillbook
//!
//! This crate holds everything about the shop ledger that can be decided
//! without touching storage: money arithmetic, entity types, validation,
//! the text command grammar, status transition rules and the cash-flow /
//! accrual arithmetic that reports are built from.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tillbook Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Message transport (out of scope)                   │   │
//! │  │        "sell 3 bread"  ──►  handle_incoming_text  ──► reply     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 tillbook-ledger (services)                      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ tillbook-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  command  │  │  report   │  │   │
//! │  │   │  Product  │  │   Money   │  │  Intent   │  │ CashFlow  │  │   │
//! │  │   │  Sale ... │  │           │  │  parsing  │  │ accrual   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 tillbook-db (Database Layer)                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Sale, Customer, Order, LayBye, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//! - [`command`] - Text command interpreter
//! - [`report`] - Cash-flow and accrual computation
//!
//! ## Example Usage
//!
//! ```rust
//! use tillbook_core::money::Money;
//!
//! let price = Money::parse("2.50").unwrap();
//! let line = price.multiply_quantity(3);
//! assert_eq!(line.cents(), 750);
//! assert_eq!(line.to_string(), "$7.50");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod command;
pub mod error;
pub mod money;
pub mod report;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use command::{interpret, Catalog, Intent, ParseError};
pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use money::Money;
pub use report::{CashFlowReport, LedgerSnapshot, ReportWindow};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Shop used by the bootstrap binary when no shop is configured.
///
/// Ledger operations never fall back to this value; it only seeds
/// configuration defaults.
pub const DEFAULT_SHOP_ID: &str = "00000000-0000-0000-0000-000000000001";

/// Maximum lines allowed in a single sale, order or lay-bye.
pub const MAX_LINE_ITEMS: usize = 50;

/// Maximum quantity of a single line.
///
/// ## Business Reason
/// Catches typing 1000 instead of 10 at the till.
pub const MAX_ITEM_QUANTITY: i64 = 9_999;

/// Largest single amount the ledger accepts: a price, payment, expense or
/// the total of one sale. $10,000,000.00.
///
/// Keeps every line total and sale total far inside `i64`, so sums over a
/// reporting window stay exact.
pub const MAX_AMOUNT_CENTS: i64 = 1_000_000_000;
