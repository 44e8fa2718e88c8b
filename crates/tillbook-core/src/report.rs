//! # Report Computation
//!
//! Pure functions that turn a snapshot of the transaction history into
//! cash-flow and profit/loss figures. Nothing here reads storage; the
//! ledger crate gathers a [`LedgerSnapshot`] and hands it in.
//!
//! ## Two Views of the Same Window
//! ```text
//! ┌──────────────────────────────┐      ┌──────────────────────────────┐
//! │        CASH VIEW             │      │        ACCRUAL VIEW          │
//! │  (when money moved)          │      │  (when the sale happened)    │
//! │                              │      │                              │
//! │  + cash sales                │      │  + cash sales                │
//! │  + credit payments received  │      │  + credit sales              │
//! │  + lay-bye installments      │      │  + lay-bye sales             │
//! │  − expenses                  │      │  (cancelled sales excluded)  │
//! │  − sales cancelled in window │      │                              │
//! │  = net cash flow             │      │  − cost of goods − expenses  │
//! │                              │      │  = profit                    │
//! └──────────────────────────────┘      └──────────────────────────────┘
//! ```
//!
//! A cash sale that was later cancelled still counts as an inflow on its
//! own date: the money was taken. The refund shows up as an outflow on
//! the date of the cancellation.

use chrono::{DateTime, Days, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use std::collections::HashMap;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{
    BestSeller, CreditEntryType, CreditTransaction, Expense, Installment, PaymentType, Sale,
};

// =============================================================================
// Report Window
// =============================================================================

/// A half-open time range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ReportWindow {
    /// Builds a window, rejecting `end <= start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, ValidationError> {
        if end <= start {
            return Err(ValidationError::InvalidFormat {
                field: "report window".to_string(),
                reason: "end must be after start".to_string(),
            });
        }
        Ok(ReportWindow { start, end })
    }

    /// Covers whole days from `first` through `last`, both inclusive.
    pub fn from_dates(first: NaiveDate, last: NaiveDate) -> Result<Self, ValidationError> {
        let after_last = last
            .checked_add_days(Days::new(1))
            .ok_or_else(|| ValidationError::InvalidFormat {
                field: "date".to_string(),
                reason: "out of range".to_string(),
            })?;
        Self::new(midnight(first), midnight(after_last))
    }

    /// The calendar day containing `now`.
    pub fn today(now: DateTime<Utc>) -> Self {
        let day = now.date_naive();
        ReportWindow {
            start: midnight(day),
            end: midnight(day) + Duration::days(1),
        }
    }

    /// The last `days` calendar days, today included.
    pub fn last_days(now: DateTime<Utc>, days: u32) -> Self {
        let today = Self::today(now);
        ReportWindow {
            start: today.end - Duration::days(i64::from(days.max(1))),
            end: today.end,
        }
    }

    /// A calendar month.
    pub fn month(year: i32, month: u32) -> Result<Self, ValidationError> {
        let out_of_range = || ValidationError::OutOfRange {
            field: "month".to_string(),
            min: 1,
            max: 12,
        };
        let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(out_of_range)?;
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        }
        .ok_or_else(out_of_range)?;
        Self::new(midnight(first), midnight(next))
    }

    #[inline]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }

    /// Human label, e.g. `2026-03-01` or `2026-03-01 to 2026-03-31`.
    pub fn label(&self) -> String {
        let first = self.start.date_naive();
        let last = (self.end - Duration::nanoseconds(1)).date_naive();
        if first == last {
            first.to_string()
        } else {
            format!("{first} to {last}")
        }
    }
}

fn midnight(day: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN))
}

// =============================================================================
// Snapshot
// =============================================================================

/// Everything a report needs, gathered by the caller for one shop.
///
/// Lists may contain rows outside the window; each computation filters
/// by the relevant timestamp itself.
#[derive(Debug, Clone, Default)]
pub struct LedgerSnapshot {
    /// Sales dated in the window, cancelled ones included, with items.
    pub sales: Vec<Sale>,
    /// Sales whose cancellation falls in the window, whatever their date.
    pub cancelled: Vec<Sale>,
    /// Credit log entries dated in the window.
    pub credit_entries: Vec<CreditTransaction>,
    pub installments: Vec<Installment>,
    pub expenses: Vec<Expense>,
    /// Σ positive customer balances right now.
    pub customer_credit_outstanding: Money,
    /// Σ balance due on active lay-byes right now.
    pub laybye_outstanding: Money,
}

// =============================================================================
// Cash View
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Inflows {
    pub cash_sales: Money,
    pub credit_payments: Money,
    pub laybye_installments: Money,
    pub total: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Outflows {
    pub expenses: Money,
    pub refunds: Money,
    pub total: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CashFlow {
    pub inflows: Inflows,
    pub outflows: Outflows,
    pub net: Money,
}

/// Money that actually moved during the window.
pub fn cash_flow(window: &ReportWindow, snapshot: &LedgerSnapshot) -> CashFlow {
    let cash_sales: Money = snapshot
        .sales
        .iter()
        .filter(|s| s.payment_type == PaymentType::Cash && window.contains(s.date))
        .map(Sale::total)
        .sum();
    let credit_payments: Money = snapshot
        .credit_entries
        .iter()
        .filter(|e| e.entry_type == CreditEntryType::Payment)
        .filter(|e| window.contains(e.date))
        .map(CreditTransaction::amount)
        .sum();
    let laybye_installments: Money = snapshot
        .installments
        .iter()
        .filter(|i| window.contains(i.date))
        .map(Installment::amount)
        .sum();

    let expenses = expenses_in(window, snapshot);
    let refunds: Money = snapshot
        .cancelled
        .iter()
        .filter(|s| is_refund(window, s))
        .map(Sale::total)
        .sum();

    let inflows = Inflows {
        cash_sales,
        credit_payments,
        laybye_installments,
        total: cash_sales + credit_payments + laybye_installments,
    };
    let outflows = Outflows {
        expenses,
        refunds,
        total: expenses + refunds,
    };

    CashFlow {
        inflows,
        outflows,
        net: inflows.total - outflows.total,
    }
}

/// A sale cancelled inside the window whose money goes back in cash.
/// Cancelled credit sales are settled by a reversal entry instead.
fn is_refund(window: &ReportWindow, sale: &Sale) -> bool {
    sale.payment_type != PaymentType::Credit
        && sale.cancelled_at.is_some_and(|at| window.contains(at))
}

fn expenses_in(window: &ReportWindow, snapshot: &LedgerSnapshot) -> Money {
    snapshot
        .expenses
        .iter()
        .filter(|e| window.contains(e.date))
        .map(Expense::amount)
        .sum()
}

// =============================================================================
// Accrual View
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct AccrualRevenue {
    pub cash: Money,
    pub credit: Money,
    pub laybye: Money,
    pub total: Money,
}

/// Sales earned in the window by their original date, cancelled excluded.
pub fn accrual_revenue(window: &ReportWindow, snapshot: &LedgerSnapshot) -> AccrualRevenue {
    let mut revenue = AccrualRevenue::default();
    for sale in revenue_sales(window, snapshot) {
        match sale.payment_type {
            PaymentType::Cash => revenue.cash += sale.total(),
            PaymentType::Credit => revenue.credit += sale.total(),
            PaymentType::LayBye => revenue.laybye += sale.total(),
        }
    }
    revenue.total = revenue.cash + revenue.credit + revenue.laybye;
    revenue
}

fn revenue_sales<'a>(
    window: &'a ReportWindow,
    snapshot: &'a LedgerSnapshot,
) -> impl Iterator<Item = &'a Sale> + 'a {
    snapshot
        .sales
        .iter()
        .filter(move |s| !s.is_cancelled && window.contains(s.date))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Profitability {
    pub revenue: Money,
    pub cost_of_goods: Money,
    pub expenses: Money,
    pub profit: Money,
    /// profit / revenue in basis points; 0 when there is no revenue.
    pub margin_bps: i64,
}

/// Revenue minus cost of goods (where recorded) minus expenses.
pub fn profitability(window: &ReportWindow, snapshot: &LedgerSnapshot) -> Profitability {
    let revenue = accrual_revenue(window, snapshot).total;
    let cost_of_goods: Money = revenue_sales(window, snapshot)
        .flat_map(|s| s.items.iter())
        .filter_map(|item| item.cost_of_goods())
        .sum();
    let expenses = expenses_in(window, snapshot);
    let profit = revenue - cost_of_goods - expenses;

    Profitability {
        revenue,
        cost_of_goods,
        expenses,
        profit,
        margin_bps: profit.ratio_bps(revenue),
    }
}

// =============================================================================
// Full Report
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Outstanding {
    pub customer_credit: Money,
    pub laybye_balance: Money,
    pub total: Money,
}

/// Cash flow, accrual revenue, profitability and outstanding balances for
/// one window, with the raw rows they were computed from.
#[derive(Debug, Clone, Serialize)]
pub struct CashFlowReport {
    pub window: ReportWindow,
    pub cash_flow: CashFlow,
    pub revenue: AccrualRevenue,
    pub profitability: Profitability,
    pub outstanding: Outstanding,
    pub sales: Vec<Sale>,
    pub refunds: Vec<Sale>,
    pub credit_payments: Vec<CreditTransaction>,
    pub installments: Vec<Installment>,
    pub expenses: Vec<Expense>,
}

impl CashFlowReport {
    pub fn build(window: ReportWindow, snapshot: LedgerSnapshot) -> Self {
        let cash_flow = cash_flow(&window, &snapshot);
        let revenue = accrual_revenue(&window, &snapshot);
        let profitability = profitability(&window, &snapshot);
        let outstanding = Outstanding {
            customer_credit: snapshot.customer_credit_outstanding,
            laybye_balance: snapshot.laybye_outstanding,
            total: snapshot.customer_credit_outstanding + snapshot.laybye_outstanding,
        };

        let LedgerSnapshot {
            sales,
            cancelled,
            credit_entries,
            installments,
            expenses,
            ..
        } = snapshot;

        CashFlowReport {
            window,
            cash_flow,
            revenue,
            profitability,
            outstanding,
            sales: sales.into_iter().filter(|s| window.contains(s.date)).collect(),
            refunds: cancelled.into_iter().filter(|s| is_refund(&window, s)).collect(),
            credit_payments: credit_entries
                .into_iter()
                .filter(|e| e.entry_type == CreditEntryType::Payment)
                .filter(|e| window.contains(e.date))
                .collect(),
            installments: installments
                .into_iter()
                .filter(|i| window.contains(i.date))
                .collect(),
            expenses: expenses
                .into_iter()
                .filter(|e| window.contains(e.date))
                .collect(),
        }
    }

    /// Plain-text summary used as a reply or a document caption.
    pub fn summary(&self, title: &str) -> String {
        let cf = &self.cash_flow;
        let p = &self.profitability;
        format!(
            "{title} ({window})\n\
             Cash in: {cin} (sales {cs}, credit payments {cp}, lay-bye {li})\n\
             Cash out: {cout} (expenses {ex}, refunds {rf})\n\
             Net cash flow: {net}\n\
             Revenue: {rev} | Cost of goods: {cogs} | Profit: {profit} ({margin}.{frac:02}%)\n\
             Outstanding: {out} (credit {oc}, lay-bye {ol})",
            window = self.window.label(),
            cin = cf.inflows.total,
            cs = cf.inflows.cash_sales,
            cp = cf.inflows.credit_payments,
            li = cf.inflows.laybye_installments,
            cout = cf.outflows.total,
            ex = cf.outflows.expenses,
            rf = cf.outflows.refunds,
            net = cf.net,
            rev = p.revenue,
            cogs = p.cost_of_goods,
            profit = p.profit,
            margin = p.margin_bps / 100,
            frac = (p.margin_bps % 100).abs(),
            out = self.outstanding.total,
            oc = self.outstanding.customer_credit,
            ol = self.outstanding.laybye_balance,
        )
    }
}

// =============================================================================
// Best Sellers
// =============================================================================

/// Units and revenue per product over non-cancelled sales in the window,
/// highest quantity first.
pub fn best_sellers(window: &ReportWindow, sales: &[Sale], limit: usize) -> Vec<BestSeller> {
    let mut by_product: HashMap<&str, BestSeller> = HashMap::new();
    for sale in sales
        .iter()
        .filter(|s| !s.is_cancelled && window.contains(s.date))
    {
        for item in &sale.items {
            let entry = by_product
                .entry(item.product_id.as_str())
                .or_insert_with(|| BestSeller {
                    product_id: item.product_id.clone(),
                    product_name: item.product_name.clone(),
                    quantity: 0,
                    revenue_cents: 0,
                });
            entry.quantity += item.quantity;
            entry.revenue_cents += item.total_cents;
        }
    }

    let mut ranked: Vec<BestSeller> = by_product.into_values().collect();
    ranked.sort_by(|a, b| {
        b.quantity
            .cmp(&a.quantity)
            .then(b.revenue_cents.cmp(&a.revenue_cents))
            .then_with(|| a.product_name.cmp(&b.product_name))
    });
    ranked.truncate(limit);
    ranked
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ExpenseCategory, LineItem, PaymentMethod};

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap()
    }

    fn march() -> ReportWindow {
        ReportWindow::month(2026, 3).unwrap()
    }

    fn sale(id: &str, payment_type: PaymentType, cents: i64, date: DateTime<Utc>) -> Sale {
        Sale {
            id: id.to_string(),
            shop_id: "shop".to_string(),
            payment_type,
            total_cents: cents,
            customer_id: None,
            source_ref: None,
            date,
            is_cancelled: false,
            cancelled_at: None,
            cancellation_reason: None,
            items: vec![LineItem {
                id: format!("{id}-1"),
                parent_id: id.to_string(),
                product_id: format!("p-{id}"),
                product_name: format!("item {id}"),
                quantity: 1,
                price_cents: cents,
                cost_cents: None,
                total_cents: cents,
            }],
        }
    }

    fn payment(cents: i64, date: DateTime<Utc>) -> CreditTransaction {
        CreditTransaction {
            id: "t".to_string(),
            shop_id: "shop".to_string(),
            customer_id: "c".to_string(),
            seq: 2,
            entry_type: CreditEntryType::Payment,
            amount_cents: cents,
            items_json: None,
            description: String::new(),
            date,
            balance_before_cents: 500,
            balance_after_cents: 500 - cents,
        }
    }

    fn expense(cents: i64, date: DateTime<Utc>) -> Expense {
        Expense {
            id: "e".to_string(),
            shop_id: "shop".to_string(),
            amount_cents: cents,
            description: "bags".to_string(),
            category: ExpenseCategory::Supplies,
            payment_method: PaymentMethod::Cash,
            date,
            receipt_number: None,
        }
    }

    #[test]
    fn test_scenario_cash_versus_accrual() {
        // $10 cash sale, $5 expense, $3 payment against a credit sale from
        // last month.
        let snapshot = LedgerSnapshot {
            sales: vec![sale("s1", PaymentType::Cash, 1000, at(10, 9))],
            credit_entries: vec![payment(300, at(11, 9))],
            expenses: vec![expense(500, at(12, 9))],
            ..Default::default()
        };
        let window = march();

        let cf = cash_flow(&window, &snapshot);
        assert_eq!(cf.inflows.total, Money::from_cents(1300));
        assert_eq!(cf.outflows.total, Money::from_cents(500));
        assert_eq!(cf.net, Money::from_cents(800));

        let revenue = accrual_revenue(&window, &snapshot);
        assert_eq!(revenue.total, Money::from_cents(1000));
        assert_eq!(revenue.credit, Money::zero());
    }

    #[test]
    fn test_cancelled_cash_sale_is_inflow_and_refund() {
        let mut s = sale("s1", PaymentType::Cash, 1000, at(10, 9));
        s.is_cancelled = true;
        s.cancelled_at = Some(at(10, 15));
        let snapshot = LedgerSnapshot {
            sales: vec![s.clone()],
            cancelled: vec![s],
            ..Default::default()
        };
        let window = march();

        let cf = cash_flow(&window, &snapshot);
        assert_eq!(cf.inflows.cash_sales, Money::from_cents(1000));
        assert_eq!(cf.outflows.refunds, Money::from_cents(1000));
        assert_eq!(cf.net, Money::zero());
        assert_eq!(accrual_revenue(&window, &snapshot).total, Money::zero());
    }

    #[test]
    fn test_cancelled_credit_sale_moves_no_cash() {
        let mut s = sale("s1", PaymentType::Credit, 500, at(10, 9));
        s.is_cancelled = true;
        s.cancelled_at = Some(at(10, 15));
        let mut reversal = payment(500, at(10, 15));
        reversal.entry_type = CreditEntryType::Reversal;
        reversal.balance_after_cents = 0;
        let snapshot = LedgerSnapshot {
            sales: vec![s.clone()],
            cancelled: vec![s],
            credit_entries: vec![reversal],
            ..Default::default()
        };
        let window = march();

        let cf = cash_flow(&window, &snapshot);
        assert_eq!(cf.inflows.total, Money::zero());
        assert_eq!(cf.outflows.refunds, Money::zero());
        assert_eq!(cf.net, Money::zero());
        assert_eq!(accrual_revenue(&window, &snapshot).total, Money::zero());

        let report = CashFlowReport::build(window, snapshot);
        assert!(report.refunds.is_empty());
        assert!(report.credit_payments.is_empty());
    }

    #[test]
    fn test_refund_counted_in_cancellation_window() {
        let mut s = sale("s1", PaymentType::Cash, 700, at(1, 9) - Duration::days(5));
        s.is_cancelled = true;
        s.cancelled_at = Some(at(2, 9));
        let snapshot = LedgerSnapshot {
            cancelled: vec![s],
            ..Default::default()
        };
        let cf = cash_flow(&march(), &snapshot);
        assert_eq!(cf.outflows.refunds, Money::from_cents(700));
        assert_eq!(cf.net, Money::from_cents(-700));
    }

    #[test]
    fn test_credit_sale_is_revenue_not_cash() {
        let snapshot = LedgerSnapshot {
            sales: vec![
                sale("s1", PaymentType::Credit, 400, at(5, 9)),
                sale("s2", PaymentType::LayBye, 600, at(6, 9)),
            ],
            ..Default::default()
        };
        let window = march();
        assert_eq!(cash_flow(&window, &snapshot).inflows.total, Money::zero());
        let revenue = accrual_revenue(&window, &snapshot);
        assert_eq!(revenue.credit, Money::from_cents(400));
        assert_eq!(revenue.laybye, Money::from_cents(600));
        assert_eq!(revenue.total, Money::from_cents(1000));
    }

    #[test]
    fn test_rows_outside_window_are_ignored() {
        let snapshot = LedgerSnapshot {
            sales: vec![sale("s1", PaymentType::Cash, 1000, at(31, 23) + Duration::hours(2))],
            expenses: vec![expense(500, at(1, 0) - Duration::seconds(1))],
            ..Default::default()
        };
        let cf = cash_flow(&march(), &snapshot);
        assert_eq!(cf.inflows.total, Money::zero());
        assert_eq!(cf.outflows.total, Money::zero());
    }

    #[test]
    fn test_profitability_with_cost_of_goods() {
        let mut s = sale("s1", PaymentType::Cash, 1000, at(3, 9));
        s.items[0].cost_cents = Some(400);
        let snapshot = LedgerSnapshot {
            sales: vec![s],
            expenses: vec![expense(100, at(4, 9))],
            ..Default::default()
        };
        let p = profitability(&march(), &snapshot);
        assert_eq!(p.revenue, Money::from_cents(1000));
        assert_eq!(p.cost_of_goods, Money::from_cents(400));
        assert_eq!(p.profit, Money::from_cents(500));
        assert_eq!(p.margin_bps, 5000);
    }

    #[test]
    fn test_margin_is_zero_without_revenue() {
        let snapshot = LedgerSnapshot {
            expenses: vec![expense(100, at(4, 9))],
            ..Default::default()
        };
        let p = profitability(&march(), &snapshot);
        assert_eq!(p.profit, Money::from_cents(-100));
        assert_eq!(p.margin_bps, 0);
    }

    #[test]
    fn test_report_build_and_summary() {
        let snapshot = LedgerSnapshot {
            sales: vec![sale("s1", PaymentType::Cash, 1000, at(10, 9))],
            installments: vec![Installment {
                id: "i1".to_string(),
                laybye_id: "l1".to_string(),
                shop_id: "shop".to_string(),
                amount_cents: 250,
                method: PaymentMethod::Cash,
                date: at(10, 10),
            }],
            customer_credit_outstanding: Money::from_cents(200),
            laybye_outstanding: Money::from_cents(750),
            ..Default::default()
        };
        let report = CashFlowReport::build(march(), snapshot);
        assert_eq!(report.cash_flow.inflows.total, Money::from_cents(1250));
        assert_eq!(report.outstanding.total, Money::from_cents(950));
        assert_eq!(report.installments.len(), 1);

        let text = report.summary("Monthly report");
        assert!(text.contains("2026-03-01 to 2026-03-31"));
        assert!(text.contains("Net cash flow: $12.50"));
    }

    #[test]
    fn test_best_sellers_ranking() {
        let mut a = sale("a", PaymentType::Cash, 500, at(2, 9));
        a.items[0].product_id = "bread".to_string();
        a.items[0].quantity = 5;
        let mut b = sale("b", PaymentType::Cash, 200, at(3, 9));
        b.items[0].product_id = "bread".to_string();
        b.items[0].quantity = 2;
        let mut c = sale("c", PaymentType::Credit, 900, at(3, 9));
        c.items[0].product_id = "milk".to_string();
        c.items[0].quantity = 6;
        let mut cancelled = sale("d", PaymentType::Cash, 9900, at(3, 9));
        cancelled.items[0].quantity = 99;
        cancelled.is_cancelled = true;

        let sales = vec![a, b, c, cancelled];
        let ranked = best_sellers(&march(), &sales, 10);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].product_id, "bread");
        assert_eq!(ranked[0].quantity, 7);
        assert_eq!(ranked[0].revenue_cents, 700);
        assert_eq!(ranked[1].product_id, "milk");

        let top = best_sellers(&march(), &sales, 1);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].product_id, "bread");
    }

    #[test]
    fn test_window_constructors() {
        let now = Utc.with_ymd_and_hms(2026, 3, 15, 13, 30, 0).unwrap();
        let today = ReportWindow::today(now);
        assert!(today.contains(now));
        assert_eq!(today.label(), "2026-03-15");

        let week = ReportWindow::last_days(now, 7);
        assert_eq!(week.start, Utc.with_ymd_and_hms(2026, 3, 9, 0, 0, 0).unwrap());
        assert!(week.contains(now));

        let dec = ReportWindow::month(2025, 12).unwrap();
        assert_eq!(dec.end, Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
        assert!(ReportWindow::month(2026, 13).is_err());

        let dates = ReportWindow::from_dates(
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        )
        .unwrap();
        assert_eq!(dates.label(), "2026-01-01");
    }
}
