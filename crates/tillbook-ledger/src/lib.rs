//! # tillbook-ledger: Ledger Services for Tillbook
//!
//! Turns interpreted text commands into persisted state, and the persisted
//! history back into financial summaries.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  message transport (stdin, chat gateway, ...)                           │
//! │       │  shop_id + text                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                 tillbook-ledger (THIS CRATE)                    │    │
//! │  │                                                                 │    │
//! │  │  Ledger::handle_incoming_text                                   │    │
//! │  │       │                                                         │    │
//! │  │       ├── Inventory        stock reservation with retry         │    │
//! │  │       ├── SaleRecorder     reserve → persist → customer stats   │    │
//! │  │       ├── CreditLedger     append-only balance log              │    │
//! │  │       ├── OrderBook        pending → ... → completed            │    │
//! │  │       ├── LayByeTracker    installments, completion sale        │    │
//! │  │       ├── ExpenseRecorder                                       │    │
//! │  │       └── FinancialAggregator ──► ReportRenderer                │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  tillbook-db (SQLite)          tillbook-core (types, parsing, math)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tillbook_db::Database;
//! use tillbook_ledger::{Ledger, LedgerConfig};
//!
//! let config = LedgerConfig::load(None)?;
//! let db = Database::new(config.db_config()).await?;
//! let ledger = Ledger::new(db, &config);
//!
//! let reply = ledger.handle_incoming_text(&config.default_shop, "sell 3 bread").await;
//! println!("{}", reply.message());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod aggregator;
pub mod config;
pub mod credit;
pub mod dispatch;
pub mod error;
pub mod expenses;
pub mod inventory;
pub mod laybye;
pub mod orders;
pub mod reference;
pub mod render;
mod reply;
pub mod sales;

// =============================================================================
// Re-exports
// =============================================================================

pub use aggregator::FinancialAggregator;
pub use config::LedgerConfig;
pub use credit::CreditLedger;
pub use dispatch::Ledger;
pub use error::{ConfigError, LedgerError, LedgerResult, RenderError};
pub use expenses::ExpenseRecorder;
pub use inventory::{ArchiveOutcome, Inventory};
pub use laybye::LayByeTracker;
pub use orders::OrderBook;
pub use render::{JsonReportRenderer, ReportDocument, ReportRenderer};
pub use sales::SaleRecorder;
