//! # Reply Formatting
//!
//! Turns ledger results into the short text messages shop owners read.
//!
//! ## Error Replies
//! ```text
//! ParseError                ──► its own message, as-is
//! LedgerError::Business     ──► specific message (+ "Try: <hint>")
//! LedgerError::Persistence  ──► tracing::error! + generic retry message
//! ```

use tracing::error;

use tillbook_core::command::ParseError;
use tillbook_core::{
    BalanceAudit, BestSeller, CoreError, CreditTransaction, Customer, ErrorKind, Expense,
    LayBye, LineItem, Money, Order, OrderType, Product, Sale,
};

use crate::error::LedgerError;
use crate::inventory::ArchiveOutcome;

pub(crate) const STORAGE_FAILURE: &str =
    "Sorry, that could not be saved right now. Nothing was changed, please try again.";

// =============================================================================
// Errors
// =============================================================================

pub(crate) fn parse_error(err: &ParseError) -> String {
    err.to_string()
}

/// The user-facing message for a failed command.
pub(crate) fn ledger_error(err: &LedgerError) -> String {
    match err {
        LedgerError::Business(core) => business_error(core),
        LedgerError::Persistence(db) => {
            error!(error = %db, "Command failed in storage");
            STORAGE_FAILURE.to_string()
        }
    }
}

fn business_error(err: &CoreError) -> String {
    match err {
        CoreError::NotFound {
            entity,
            key,
            hint: Some(hint),
        } => format!("{entity} '{key}' not found. Try: {hint}"),
        CoreError::NotFound { entity, key, .. } => format!("{entity} '{key}' not found."),
        CoreError::InsufficientStock {
            product,
            requested,
            available,
        } => format!("Not enough {product}: {available} in stock, {requested} requested."),
        other => match other.kind() {
            ErrorKind::Validation => format!("Invalid input: {other}"),
            _ => format!("{other}."),
        },
    }
}

// =============================================================================
// Inventory
// =============================================================================

pub(crate) fn product_added(p: &Product) -> String {
    let mut text = format!("Added {} at {} (stock {}", p.name, p.price(), p.stock);
    if p.low_stock_threshold > 0 {
        text.push_str(&format!(", alert at {}", p.low_stock_threshold));
    }
    if let Some(cost) = p.cost() {
        text.push_str(&format!(", cost {cost}"));
    }
    text.push(')');
    text
}

pub(crate) fn product_updated(p: &Product) -> String {
    format!("{}: price {}, stock {}{}", p.name, p.price(), stock_text(p), low_marker(p))
}

pub(crate) fn stock_list(products: &[Product]) -> String {
    if products.is_empty() {
        return "No products yet. Add one with: add <product> <price> stock <n>".to_string();
    }
    let mut text = format!("Stock ({}):", counted(products.len() as i64, "product", "products"));
    for p in products {
        text.push_str(&format!(
            "\n• {} - {} @ {}{}",
            p.name,
            stock_text(p),
            p.price(),
            low_marker(p)
        ));
    }
    text
}

pub(crate) fn low_stock_list(products: &[Product]) -> String {
    if products.is_empty() {
        return "All stock levels are fine.".to_string();
    }
    let mut text = "Low stock:".to_string();
    for p in products {
        text.push_str(&format!(
            "\n• {} - {} left (alert at {})",
            p.name, p.stock, p.low_stock_threshold
        ));
    }
    text
}

pub(crate) fn archived(name: &str, outcome: ArchiveOutcome) -> String {
    match outcome {
        ArchiveOutcome::Deleted => format!("Deleted {name}."),
        ArchiveOutcome::Archived => {
            format!("Removed {name} from the catalog. Past sales still show it.")
        }
    }
}

fn stock_text(p: &Product) -> String {
    if p.track_stock {
        p.stock.to_string()
    } else {
        "untracked".to_string()
    }
}

fn low_marker(p: &Product) -> &'static str {
    if p.is_low_stock() {
        " ⚠ low"
    } else {
        ""
    }
}

// =============================================================================
// Sales
// =============================================================================

pub(crate) fn sale_recorded(sale: &Sale, low: &[Product]) -> String {
    let mut text = format!("Sale {} recorded: {}", sale.short_id(), sale.total());
    text.push_str(&lines(&sale.items));
    if !low.is_empty() {
        let names: Vec<String> = low
            .iter()
            .map(|p| format!("{} ({} left)", p.name, p.stock))
            .collect();
        text.push_str(&format!("\nLow stock: {}", names.join(", ")));
    }
    text
}

pub(crate) fn sale_cancelled(sale: &Sale, reversal: Option<&CreditTransaction>) -> String {
    let mut text = format!(
        "Cancelled sale {} ({}). Stock restored.",
        sale.short_id(),
        sale.total()
    );
    if let Some(entry) = reversal {
        text.push_str(&format!(
            " Account balance {} → {}.",
            Money::from_cents(entry.balance_before_cents),
            Money::from_cents(entry.balance_after_cents)
        ));
    }
    text
}

pub(crate) fn recent_sales(sales: &[Sale]) -> String {
    if sales.is_empty() {
        return "No sales yet.".to_string();
    }
    let mut text = "Recent sales:".to_string();
    for (i, sale) in sales.iter().enumerate() {
        let what: Vec<String> = sale
            .items
            .iter()
            .map(|item| format!("{} {}", item.quantity, item.product_name))
            .collect();
        text.push_str(&format!(
            "\n{}. {} {} {} - {}",
            i + 1,
            sale.short_id(),
            sale.date.format("%d %b %H:%M"),
            sale.total(),
            what.join(", ")
        ));
    }
    text.push_str("\nCancel with: cancel <number>");
    text
}

fn lines(items: &[LineItem]) -> String {
    items
        .iter()
        .map(|item| {
            format!(
                "\n• {} x {} @ {} = {}",
                item.quantity,
                item.product_name,
                Money::from_cents(item.price_cents),
                item.total()
            )
        })
        .collect()
}

// =============================================================================
// Customers & Credit
// =============================================================================

pub(crate) fn customer_registered(c: &Customer) -> String {
    format!("Registered {} ({}).", c.name, c.phone)
}

pub(crate) fn customer_list(customers: &[Customer]) -> String {
    if customers.is_empty() {
        return "No customers yet. Register one with: customer <name> <phone>".to_string();
    }
    let mut text = format!("Customers ({}):", customers.len());
    for c in customers {
        text.push_str(&format!("\n• {} {}", c.name, c.phone));
        if c.current_balance_cents > 0 {
            text.push_str(&format!(" - owes {}", c.balance()));
        }
    }
    text
}

pub(crate) fn balance(c: &Customer) -> String {
    let mut text = format!("{} owes {}.", c.name, c.balance());
    if let Some(limit) = c.credit_limit() {
        text.push_str(&format!(" Limit {limit}."));
    }
    text.push_str(&format!(
        "\nSpent {} over {}, {}.",
        Money::from_cents(c.total_spent_cents),
        counted(c.total_visits, "visit", "visits"),
        counted(c.loyalty_points, "point", "points")
    ));
    text
}

pub(crate) fn credit_added(c: &Customer, entry: &CreditTransaction) -> String {
    format!(
        "Put {} on {}'s account. Balance {} → {}.",
        entry.amount(),
        c.name,
        Money::from_cents(entry.balance_before_cents),
        Money::from_cents(entry.balance_after_cents)
    )
}

pub(crate) fn credit_sale(c: &Customer, sale: &Sale, entry: &CreditTransaction) -> String {
    format!(
        "Sale {} on credit for {}: {}{}\nBalance now {}.",
        sale.short_id(),
        c.name,
        sale.total(),
        lines(&sale.items),
        Money::from_cents(entry.balance_after_cents)
    )
}

pub(crate) fn payment_recorded(c: &Customer, entry: &CreditTransaction) -> String {
    let mut text = format!(
        "{} paid {}. Balance {} → {}.",
        c.name,
        entry.amount(),
        Money::from_cents(entry.balance_before_cents),
        Money::from_cents(entry.balance_after_cents)
    );
    let change = entry.amount() - Money::from_cents(entry.balance_before_cents);
    if change.is_positive() {
        text.push_str(&format!(" Overpaid by {change}."));
    }
    text
}

pub(crate) fn audit(c: &Customer, audit: &BalanceAudit) -> String {
    if audit.is_consistent() {
        return format!(
            "{}'s account checks out: {}, balance {}.",
            c.name,
            counted(audit.entries as i64, "entry", "entries"),
            Money::from_cents(audit.cached_cents)
        );
    }
    match &audit.chain_break {
        Some(brk) => format!(
            "{}'s account has a break at entry {}: expected {} before, found {}.",
            c.name,
            brk.seq,
            Money::from_cents(brk.expected_before_cents),
            Money::from_cents(brk.recorded_before_cents)
        ),
        None => format!(
            "{}'s balance shows {} but the entries add up to {}.",
            c.name,
            Money::from_cents(audit.cached_cents),
            Money::from_cents(audit.replayed_cents.unwrap_or_default())
        ),
    }
}

// =============================================================================
// Orders
// =============================================================================

pub(crate) fn order_placed(order: &Order, customer: &Customer) -> String {
    format!(
        "Order {} for {} ({}): {}{}",
        order.short_id(),
        customer.name,
        order_type(order.order_type),
        order.total(),
        lines(&order.items)
    )
}

pub(crate) fn order_moved(order: &Order) -> String {
    let mut text = format!("Order {} is now {}.", order.short_id(), order.status);
    if let (Some(sale_id), true) = (&order.sale_id, order.completed_at.is_some()) {
        text.push_str(&format!(" Sale {} recorded.", tillbook_core::short_id(sale_id)));
    }
    text
}

pub(crate) fn order_list(orders: &[Order]) -> String {
    if orders.is_empty() {
        return "No open orders.".to_string();
    }
    let mut text = "Open orders:".to_string();
    for (i, o) in orders.iter().enumerate() {
        text.push_str(&format!(
            "\n{}. {} {} {} ({})",
            i + 1,
            o.short_id(),
            o.status,
            o.total(),
            order_type(o.order_type)
        ));
    }
    text
}

fn order_type(t: OrderType) -> &'static str {
    match t {
        OrderType::Pickup => "pickup",
        OrderType::Delivery => "delivery",
    }
}

// =============================================================================
// Lay-byes
// =============================================================================

pub(crate) fn laybye_created(l: &LayBye, customer: &Customer) -> String {
    format!(
        "Lay-bye {} for {}: {} due by {}{}",
        l.short_id(),
        customer.name,
        l.total_amount(),
        l.due_date.format("%Y-%m-%d"),
        lines(&l.items)
    )
}

pub(crate) fn laybye_paid(l: &LayBye) -> String {
    match l.installments.last() {
        Some(last) if l.balance_due_cents == 0 => format!(
            "Received {} ({}). Lay-bye {} is paid up, goods can be collected.",
            last.amount(),
            last.method,
            l.short_id()
        ),
        Some(last) => format!(
            "Received {} ({}). {} still due on lay-bye {}.",
            last.amount(),
            last.method,
            l.balance_due(),
            l.short_id()
        ),
        None => format!("Lay-bye {}: {} due.", l.short_id(), l.balance_due()),
    }
}

pub(crate) fn laybye_cancelled(l: &LayBye) -> String {
    let mut text = format!("Cancelled lay-bye {}. Stock released.", l.short_id());
    if l.amount_paid_cents > 0 {
        text.push_str(&format!(
            " {} was paid; record any refund with: expense <amount> other refund",
            Money::from_cents(l.amount_paid_cents)
        ));
    }
    text
}

pub(crate) fn laybye_list(laybyes: &[LayBye]) -> String {
    if laybyes.is_empty() {
        return "No active lay-byes.".to_string();
    }
    let mut text = "Active lay-byes:".to_string();
    for (i, l) in laybyes.iter().enumerate() {
        text.push_str(&format!(
            "\n{}. {} paid {} of {}, due {}",
            i + 1,
            l.short_id(),
            Money::from_cents(l.amount_paid_cents),
            l.total_amount(),
            l.due_date.format("%Y-%m-%d")
        ));
    }
    text
}

// =============================================================================
// Expenses & Reports
// =============================================================================

pub(crate) fn expense_recorded(e: &Expense) -> String {
    format!("Expense recorded: {} {} ({}).", e.amount(), e.description, e.category)
}

pub(crate) fn expense_list(expenses: &[Expense]) -> String {
    if expenses.is_empty() {
        return "No expenses recorded.".to_string();
    }
    let mut text = "Recent expenses:".to_string();
    for e in expenses {
        text.push_str(&format!(
            "\n• {} {} {} ({}, {})",
            e.date.format("%d %b"),
            e.amount(),
            e.description,
            e.category,
            e.payment_method
        ));
    }
    text
}

pub(crate) fn best_sellers(title: &str, products: &[BestSeller]) -> String {
    if products.is_empty() {
        return format!("{title}: no sales yet.");
    }
    let mut text = format!("{title}:");
    for (i, b) in products.iter().enumerate() {
        text.push_str(&format!(
            "\n{}. {} - {} sold, {}",
            i + 1,
            b.product_name,
            b.quantity,
            Money::from_cents(b.revenue_cents)
        ));
    }
    text
}

fn counted(n: i64, one: &str, many: &str) -> String {
    format!("{n} {}", if n == 1 { one } else { many })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tillbook_core::ValidationError;
    use tillbook_db::DbError;

    #[test]
    fn test_not_found_carries_hint() {
        let err = LedgerError::from(CoreError::not_found_with_hint(
            "Customer",
            "Zola",
            "customer Zola <phone>",
        ));
        assert_eq!(
            ledger_error(&err),
            "Customer 'Zola' not found. Try: customer Zola <phone>"
        );
    }

    #[test]
    fn test_insufficient_stock_message() {
        let err = LedgerError::from(CoreError::InsufficientStock {
            product: "Bread".to_string(),
            requested: 5,
            available: 3,
        });
        assert_eq!(ledger_error(&err), "Not enough Bread: 3 in stock, 5 requested.");
    }

    #[test]
    fn test_persistence_is_generic() {
        let err = LedgerError::from(DbError::Query("disk I/O error".to_string()));
        let text = ledger_error(&err);
        assert_eq!(text, STORAGE_FAILURE);
        assert!(!text.contains("disk"));
    }

    #[test]
    fn test_balance_counts_read_naturally() {
        let mut c = Customer {
            id: "c1".to_string(),
            shop_id: "shop".to_string(),
            name: "Thandi".to_string(),
            phone: "0821234567".to_string(),
            email: None,
            total_spent_cents: 500,
            total_visits: 1,
            loyalty_points: 1,
            current_balance_cents: 0,
            credit_limit_cents: 0,
            last_purchase_at: None,
            version: 0,
            created_at: chrono::Utc::now(),
        };
        assert!(balance(&c).ends_with("Spent $5.00 over 1 visit, 1 point."));

        c.total_visits = 2;
        c.loyalty_points = 0;
        assert!(balance(&c).ends_with("over 2 visits, 0 points."));
    }

    #[test]
    fn test_validation_prefix() {
        let err = LedgerError::from(ValidationError::Required {
            field: "description".to_string(),
        });
        assert!(ledger_error(&err).starts_with("Invalid input:"));
    }
}
