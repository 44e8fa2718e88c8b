//! # Domain Types
//!
//! Core domain types used throughout Tillbook.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────────┐   │
//! │  │    Product      │   │      Sale       │   │     Customer        │   │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────────  │   │
//! │  │  name (unique)  │   │  items (frozen) │   │  current_balance    │   │
//! │  │  price / cost   │   │  payment_type   │   │  credit log ────────┼─┐ │
//! │  │  stock, version │   │  is_cancelled   │   │  loyalty stats      │ │ │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────────┘ │ │
//! │                                                                      │ │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────────┐ │ │
//! │  │     Order       │   │     LayBye      │   │ CreditTransaction   │◄┘ │
//! │  │  status DAG     │   │  installments   │   │  balance_before     │   │
//! │  │  stock on       │   │  balance_due    │   │  balance_after      │   │
//! │  │  completion     │   │  stock reserved │   │  seq (1, 2, 3 ...)  │   │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────────┘   │
//! │                                                                         │
//! │  ┌─────────────────┐                                                    │
//! │  │    Expense      │   every entity carries shop_id                     │
//! │  │  category enum  │                                                    │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Monetary columns are stored as `*_cents: i64` and exposed as [`Money`]
//! through accessor methods.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::money::Money;

/// Generates a new entity ID (UUID v4).
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

// =============================================================================
// Product
// =============================================================================

/// A product in a shop's catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Shop this product belongs to.
    pub shop_id: String,

    /// Display name; unique per shop, compared case-insensitively.
    pub name: String,

    /// Price in cents.
    pub price_cents: i64,

    /// Unit cost in cents (for cost of goods), when known.
    pub cost_cents: Option<i64>,

    /// Current stock level. Never negative.
    pub stock: i64,

    /// At or below this level the product shows in the low-stock list.
    pub low_stock_threshold: i64,

    /// Whether sales decrement stock for this product.
    pub track_stock: bool,

    /// Whether product is active (soft delete).
    pub active: bool,

    /// Incremented on every mutation; backs optimistic stock updates.
    pub version: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Returns the unit cost, if tracked.
    #[inline]
    pub fn cost(&self) -> Option<Money> {
        self.cost_cents.map(Money::from_cents)
    }

    /// Checks if `quantity` units can be taken from stock right now.
    pub fn can_reserve(&self, quantity: i64) -> bool {
        !self.track_stock || self.stock >= quantity
    }

    /// Whether the product belongs in the low-stock list.
    pub fn is_low_stock(&self) -> bool {
        self.active && self.track_stock && self.stock <= self.low_stock_threshold
    }
}

// =============================================================================
// Line Items
// =============================================================================

/// A resolved product line, ready to be reserved and persisted.
///
/// Built by the ledgers from an interpreter [`ItemRequest`] and the current
/// product row, so price and cost are frozen at this point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRequest {
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub price_cents: i64,
    pub cost_cents: Option<i64>,
}

impl LineRequest {
    /// quantity × price.
    pub fn total(&self) -> Money {
        Money::from_cents(self.price_cents).multiply_quantity(self.quantity)
    }

    /// quantity × price, or `None` if it does not fit in an `i64`.
    pub fn checked_total(&self) -> Option<Money> {
        Money::from_cents(self.price_cents).checked_mul_quantity(self.quantity)
    }
}

/// A persisted line of a sale, order or lay-bye.
///
/// Uses the snapshot pattern: name, price and cost are copied from the
/// product so later catalog edits never rewrite history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct LineItem {
    pub id: String,
    /// Sale, order or lay-bye this line belongs to.
    pub parent_id: String,
    pub product_id: String,
    /// Product name at time of recording (frozen).
    pub product_name: String,
    pub quantity: i64,
    /// Unit price in cents at time of recording (frozen).
    pub price_cents: i64,
    /// Unit cost in cents at time of recording, if tracked.
    pub cost_cents: Option<i64>,
    /// quantity × price.
    pub total_cents: i64,
}

impl LineItem {
    /// Builds a persisted line from a request.
    pub fn from_request(id: String, parent_id: &str, line: &LineRequest) -> Self {
        LineItem {
            id,
            parent_id: parent_id.to_string(),
            product_id: line.product_id.clone(),
            product_name: line.product_name.clone(),
            quantity: line.quantity,
            price_cents: line.price_cents,
            cost_cents: line.cost_cents,
            total_cents: line.total().cents(),
        }
    }

    /// Returns the line total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Cost of goods for this line, when the cost was recorded.
    pub fn cost_of_goods(&self) -> Option<Money> {
        self.cost_cents
            .map(|c| Money::from_cents(c).multiply_quantity(self.quantity))
    }

    /// Turns the line back into a request (e.g. completing an order).
    pub fn to_request(&self) -> LineRequest {
        LineRequest {
            product_id: self.product_id.clone(),
            product_name: self.product_name.clone(),
            quantity: self.quantity,
            price_cents: self.price_cents,
            cost_cents: self.cost_cents,
        }
    }
}

// =============================================================================
// Sale
// =============================================================================

/// How the customer settled a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum PaymentType {
    /// Paid at the till.
    Cash,
    /// Added to the customer's credit balance.
    Credit,
    /// Final step of a completed lay-bye plan.
    LayBye,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Cash => "cash",
            PaymentType::Credit => "credit",
            PaymentType::LayBye => "laybye",
        }
    }
}

impl fmt::Display for PaymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded sale. Immutable except for the cancellation fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: String,
    pub shop_id: String,
    pub payment_type: PaymentType,
    /// Σ item totals, frozen at creation.
    pub total_cents: i64,
    pub customer_id: Option<String>,
    /// Order or lay-bye this sale settled, if any.
    pub source_ref: Option<String>,
    pub date: DateTime<Utc>,
    pub is_cancelled: bool,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub items: Vec<LineItem>,
}

impl Sale {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// First eight characters of the id, as shown in replies.
    pub fn short_id(&self) -> &str {
        short_id(&self.id)
    }

    pub fn into_cancelled(self, reason: Option<&str>, at: DateTime<Utc>) -> Sale {
        Sale {
            is_cancelled: true,
            cancelled_at: Some(at),
            cancellation_reason: reason.map(str::to_string),
            ..self
        }
    }
}

/// Shortens a UUID for display.
pub fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

// =============================================================================
// Customer & Credit Ledger
// =============================================================================

/// A customer of the shop with a running credit balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    pub id: String,
    pub shop_id: String,
    pub name: String,
    /// Unique per shop.
    pub phone: String,
    pub email: Option<String>,
    pub total_spent_cents: i64,
    pub total_visits: i64,
    pub loyalty_points: i64,
    /// Cached; always equal to replaying the credit log.
    pub current_balance_cents: i64,
    /// 0 means no limit.
    pub credit_limit_cents: i64,
    pub last_purchase_at: Option<DateTime<Utc>>,
    /// Equals the number of credit log entries; each append bumps it.
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl Customer {
    #[inline]
    pub fn balance(&self) -> Money {
        Money::from_cents(self.current_balance_cents)
    }

    #[inline]
    pub fn credit_limit(&self) -> Option<Money> {
        (self.credit_limit_cents > 0).then(|| Money::from_cents(self.credit_limit_cents))
    }
}

/// Direction of a credit ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum CreditEntryType {
    /// Goods or money given on credit; increases the balance.
    Credit,
    /// Money received; decreases the balance, floored at zero.
    Payment,
    /// A credit sale was cancelled and the goods came back. Decreases the
    /// balance like a payment but brings no cash in.
    Reversal,
}

impl CreditEntryType {
    /// Applies this entry to a running balance.
    pub fn apply(&self, before: Money, amount: Money) -> Money {
        match self {
            CreditEntryType::Credit => before + amount,
            CreditEntryType::Payment | CreditEntryType::Reversal => {
                before.saturating_sub_to_zero(amount)
            }
        }
    }
}

/// One goods line recorded on a credit entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditItem {
    pub product_name: String,
    pub quantity: i64,
    pub price_cents: i64,
}

/// An append-only credit ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CreditTransaction {
    pub id: String,
    pub shop_id: String,
    pub customer_id: String,
    /// Position in the customer's log, starting at 1.
    pub seq: i64,
    pub entry_type: CreditEntryType,
    pub amount_cents: i64,
    /// JSON array of [`CreditItem`], for goods taken on credit.
    pub items_json: Option<String>,
    pub description: String,
    pub date: DateTime<Utc>,
    pub balance_before_cents: i64,
    pub balance_after_cents: i64,
}

impl CreditTransaction {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }

    /// Decodes the goods lines, if any were recorded.
    pub fn items(&self) -> Vec<CreditItem> {
        self.items_json
            .as_deref()
            .and_then(|json| serde_json::from_str(json).ok())
            .unwrap_or_default()
    }
}

/// Where a credit log stops being self-consistent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainBreak {
    pub seq: i64,
    pub expected_before_cents: i64,
    pub recorded_before_cents: i64,
    pub expected_after_cents: i64,
    pub recorded_after_cents: i64,
}

/// Replays a credit log from a zero balance.
///
/// Entries must be in `seq` order. Returns the replayed balance, or the
/// first entry whose recorded before/after disagrees with the replay.
///
/// ## Example
/// ```text
/// seq 1  credit  5.00   before 0.00  after 5.00   ✓
/// seq 2  payment 3.00   before 5.00  after 2.00   ✓
/// replay = 2.00
/// ```
pub fn replay_credit_log(entries: &[CreditTransaction]) -> Result<Money, ChainBreak> {
    let mut balance = Money::zero();
    for entry in entries {
        let after = entry.entry_type.apply(balance, entry.amount());
        if entry.balance_before_cents != balance.cents()
            || entry.balance_after_cents != after.cents()
        {
            return Err(ChainBreak {
                seq: entry.seq,
                expected_before_cents: balance.cents(),
                recorded_before_cents: entry.balance_before_cents,
                expected_after_cents: after.cents(),
                recorded_after_cents: entry.balance_after_cents,
            });
        }
        balance = after;
    }
    Ok(balance)
}

/// Result of auditing a customer's cached balance against the log.
#[derive(Debug, Clone, Serialize)]
pub struct BalanceAudit {
    pub customer_id: String,
    pub entries: usize,
    pub cached_cents: i64,
    pub replayed_cents: Option<i64>,
    pub chain_break: Option<ChainBreak>,
}

impl BalanceAudit {
    /// True when the chain is intact and matches the cached balance.
    pub fn is_consistent(&self) -> bool {
        self.chain_break.is_none() && self.replayed_cents == Some(self.cached_cents)
    }
}

// =============================================================================
// Order State Machine
// =============================================================================

/// The status of a customer order.
///
/// State transitions:
/// ```text
/// Pending ──► Confirmed ──► Ready ──► Completed
///    │            │           │
///    └────────────┴───────────┴──► Cancelled
/// ```
/// Stock is only touched on the `Ready → Completed` edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Ready,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Statuses reachable in one step from `self`.
    pub fn allowed_next(&self) -> &'static [OrderStatus] {
        match self {
            OrderStatus::Pending => &[OrderStatus::Confirmed, OrderStatus::Cancelled],
            OrderStatus::Confirmed => &[OrderStatus::Ready, OrderStatus::Cancelled],
            OrderStatus::Ready => &[OrderStatus::Completed, OrderStatus::Cancelled],
            OrderStatus::Completed | OrderStatus::Cancelled => &[],
        }
    }

    /// Returns true if `next` is a legal transition from `self`.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        self.allowed_next().contains(&next)
    }

    /// Returns true if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Ready => "ready",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the order leaves the shop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    #[default]
    Pickup,
    Delivery,
}

/// A customer order placed ahead of collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Order {
    pub id: String,
    pub shop_id: String,
    pub customer_id: Option<String>,
    pub total_cents: i64,
    pub status: OrderStatus,
    pub order_type: OrderType,
    pub created_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub ready_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Sale recorded when the order completed.
    pub sale_id: Option<String>,
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub items: Vec<LineItem>,
}

impl Order {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    pub fn short_id(&self) -> &str {
        short_id(&self.id)
    }
}

// =============================================================================
// Lay-bye
// =============================================================================

/// The status of a lay-bye plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum LayByeStatus {
    #[default]
    Active,
    Completed,
    Cancelled,
}

impl LayByeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayByeStatus::Active => "active",
            LayByeStatus::Completed => "completed",
            LayByeStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for LayByeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An installment plan against stock reserved at creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct LayBye {
    pub id: String,
    pub shop_id: String,
    pub customer_id: Option<String>,
    pub total_amount_cents: i64,
    pub amount_paid_cents: i64,
    /// total_amount − Σ installments.
    pub balance_due_cents: i64,
    pub status: LayByeStatus,
    pub due_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub version: i64,
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub items: Vec<LineItem>,
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub installments: Vec<Installment>,
}

impl LayBye {
    #[inline]
    pub fn total_amount(&self) -> Money {
        Money::from_cents(self.total_amount_cents)
    }

    #[inline]
    pub fn amount_paid(&self) -> Money {
        Money::from_cents(self.amount_paid_cents)
    }

    #[inline]
    pub fn balance_due(&self) -> Money {
        Money::from_cents(self.balance_due_cents)
    }

    pub fn short_id(&self) -> &str {
        short_id(&self.id)
    }
}

/// One payment towards a lay-bye.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Installment {
    pub id: String,
    pub laybye_id: String,
    pub shop_id: String,
    pub amount_cents: i64,
    pub method: PaymentMethod,
    pub date: DateTime<Utc>,
}

impl Installment {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How money changed hands for an expense or installment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Card,
    MobileMoney,
    BankTransfer,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 4] = [
        PaymentMethod::Cash,
        PaymentMethod::Card,
        PaymentMethod::MobileMoney,
        PaymentMethod::BankTransfer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::MobileMoney => "mobile_money",
            PaymentMethod::BankTransfer => "bank_transfer",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "card" => Ok(PaymentMethod::Card),
            "mobile_money" | "mobile" => Ok(PaymentMethod::MobileMoney),
            "bank_transfer" | "bank" | "transfer" => Ok(PaymentMethod::BankTransfer),
            _ => Err(ValidationError::NotAllowed {
                field: "payment method".to_string(),
                allowed: PaymentMethod::ALL.iter().map(|m| m.to_string()).collect(),
            }),
        }
    }
}

// =============================================================================
// Expense
// =============================================================================

/// Fixed set of expense categories. Unknown names are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum ExpenseCategory {
    Rent,
    Utilities,
    Salaries,
    Stock,
    Transport,
    Supplies,
    Maintenance,
    Marketing,
    Taxes,
    Other,
}

impl ExpenseCategory {
    pub const ALL: [ExpenseCategory; 10] = [
        ExpenseCategory::Rent,
        ExpenseCategory::Utilities,
        ExpenseCategory::Salaries,
        ExpenseCategory::Stock,
        ExpenseCategory::Transport,
        ExpenseCategory::Supplies,
        ExpenseCategory::Maintenance,
        ExpenseCategory::Marketing,
        ExpenseCategory::Taxes,
        ExpenseCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseCategory::Rent => "rent",
            ExpenseCategory::Utilities => "utilities",
            ExpenseCategory::Salaries => "salaries",
            ExpenseCategory::Stock => "stock",
            ExpenseCategory::Transport => "transport",
            ExpenseCategory::Supplies => "supplies",
            ExpenseCategory::Maintenance => "maintenance",
            ExpenseCategory::Marketing => "marketing",
            ExpenseCategory::Taxes => "taxes",
            ExpenseCategory::Other => "other",
        }
    }
}

impl fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExpenseCategory {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ExpenseCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "category".to_string(),
                allowed: ExpenseCategory::ALL.iter().map(|c| c.to_string()).collect(),
            })
    }
}

/// A business expense. Immutable once recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Expense {
    pub id: String,
    pub shop_id: String,
    pub amount_cents: i64,
    pub description: String,
    pub category: ExpenseCategory,
    pub payment_method: PaymentMethod,
    pub date: DateTime<Utc>,
    pub receipt_number: Option<String>,
}

impl Expense {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Reporting rows
// =============================================================================

/// Units and revenue per product over a window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BestSeller {
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub revenue_cents: i64,
}

// =============================================================================
// Replies
// =============================================================================

/// What the ledger hands back to the message transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ReplyPayload {
    /// Plain message text.
    Text { text: String },
    /// A rendered report file plus a short caption.
    Document { path: PathBuf, caption: String },
}

impl ReplyPayload {
    pub fn text(text: impl Into<String>) -> Self {
        ReplyPayload::Text { text: text.into() }
    }

    /// The text body or the document caption.
    pub fn message(&self) -> &str {
        match self {
            ReplyPayload::Text { text } => text,
            ReplyPayload::Document { caption, .. } => caption,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(
        seq: i64,
        entry_type: CreditEntryType,
        amount: i64,
        before: i64,
        after: i64,
    ) -> CreditTransaction {
        CreditTransaction {
            id: format!("e{seq}"),
            shop_id: "shop".to_string(),
            customer_id: "c1".to_string(),
            seq,
            entry_type,
            amount_cents: amount,
            items_json: None,
            description: String::new(),
            date: Utc::now(),
            balance_before_cents: before,
            balance_after_cents: after,
        }
    }

    #[test]
    fn test_order_transitions_follow_dag() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(!Pending.can_transition_to(Ready));
        assert!(!Pending.can_transition_to(Completed));
        assert!(Confirmed.can_transition_to(Ready));
        assert!(!Confirmed.can_transition_to(Completed));
        assert!(Ready.can_transition_to(Completed));
        assert!(Ready.can_transition_to(Cancelled));
        for terminal in [Completed, Cancelled] {
            assert!(terminal.is_terminal());
            assert!(terminal.allowed_next().is_empty());
        }
    }

    #[test]
    fn test_replay_credit_then_payment() {
        let log = vec![
            entry(1, CreditEntryType::Credit, 500, 0, 500),
            entry(2, CreditEntryType::Payment, 300, 500, 200),
        ];
        assert_eq!(replay_credit_log(&log), Ok(Money::from_cents(200)));
    }

    #[test]
    fn test_replay_clamps_overpayment() {
        let log = vec![
            entry(1, CreditEntryType::Credit, 500, 0, 500),
            entry(2, CreditEntryType::Payment, 800, 500, 0),
        ];
        assert_eq!(replay_credit_log(&log), Ok(Money::zero()));
    }

    #[test]
    fn test_replay_reversal_lowers_balance() {
        let log = vec![
            entry(1, CreditEntryType::Credit, 500, 0, 500),
            entry(2, CreditEntryType::Payment, 200, 500, 300),
            entry(3, CreditEntryType::Reversal, 500, 300, 0),
        ];
        assert_eq!(replay_credit_log(&log), Ok(Money::zero()));
    }

    #[test]
    fn test_replay_reports_first_break() {
        let log = vec![
            entry(1, CreditEntryType::Credit, 500, 0, 500),
            entry(2, CreditEntryType::Credit, 100, 400, 500),
        ];
        let err = replay_credit_log(&log).unwrap_err();
        assert_eq!(err.seq, 2);
        assert_eq!(err.expected_before_cents, 500);
        assert_eq!(err.recorded_before_cents, 400);
    }

    #[test]
    fn test_expense_category_is_strict() {
        assert_eq!("Rent".parse::<ExpenseCategory>().unwrap(), ExpenseCategory::Rent);
        assert!("food".parse::<ExpenseCategory>().is_err());
        assert!("".parse::<ExpenseCategory>().is_err());
    }

    #[test]
    fn test_payment_method_aliases() {
        assert_eq!("mobile".parse::<PaymentMethod>().unwrap(), PaymentMethod::MobileMoney);
        assert_eq!("BANK".parse::<PaymentMethod>().unwrap(), PaymentMethod::BankTransfer);
        assert!("cheque".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn test_line_item_snapshot() {
        let line = LineRequest {
            product_id: "p1".to_string(),
            product_name: "bread".to_string(),
            quantity: 3,
            price_cents: 250,
            cost_cents: Some(120),
        };
        let item = LineItem::from_request("i1".to_string(), "s1", &line);
        assert_eq!(item.total_cents, 750);
        assert_eq!(item.cost_of_goods(), Some(Money::from_cents(360)));
        assert_eq!(item.to_request(), line);
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("550e8400-e29b-41d4"), "550e8400");
        assert_eq!(short_id("abc"), "abc");
    }
}
