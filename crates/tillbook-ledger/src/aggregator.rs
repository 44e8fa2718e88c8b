//! # Financial Aggregator
//!
//! Gathers a [`LedgerSnapshot`] for one shop and window and hands it to the
//! pure report functions in `tillbook_core::report`.

use tracing::debug;

use tillbook_core::report::{best_sellers, CashFlowReport, LedgerSnapshot, ReportWindow};
use tillbook_core::{BestSeller, Money};
use tillbook_db::Database;

use crate::error::LedgerResult;

#[derive(Debug, Clone)]
pub struct FinancialAggregator {
    db: Database,
}

impl FinancialAggregator {
    pub fn new(db: Database) -> Self {
        FinancialAggregator { db }
    }

    /// Reads everything a report over `window` needs.
    pub async fn snapshot(
        &self,
        shop_id: &str,
        window: &ReportWindow,
    ) -> LedgerResult<LedgerSnapshot> {
        let (start, end) = (window.start, window.end);
        debug!(shop_id, window = %window.label(), "Gathering report snapshot");

        let sales = self.db.sales().in_window(shop_id, start, end).await?;
        let cancelled = self.db.sales().cancelled_in_window(shop_id, start, end).await?;
        let credit_entries = self
            .db
            .customers()
            .payments_in_window(shop_id, start, end)
            .await?;
        let installments = self
            .db
            .laybyes()
            .installments_in_window(shop_id, start, end)
            .await?;
        let expenses = self.db.expenses().in_window(shop_id, start, end).await?;
        let customer_credit = self.db.customers().outstanding_total(shop_id).await?;
        let laybye_balance = self.db.laybyes().outstanding_total(shop_id).await?;

        Ok(LedgerSnapshot {
            sales,
            cancelled,
            credit_entries,
            installments,
            expenses,
            customer_credit_outstanding: Money::from_cents(customer_credit),
            laybye_outstanding: Money::from_cents(laybye_balance),
        })
    }

    pub async fn compute_cash_flow(
        &self,
        shop_id: &str,
        window: ReportWindow,
    ) -> LedgerResult<CashFlowReport> {
        let snapshot = self.snapshot(shop_id, &window).await?;
        Ok(CashFlowReport::build(window, snapshot))
    }

    /// Top products by quantity over non-cancelled sales.
    pub async fn best_sellers(
        &self,
        shop_id: &str,
        window: &ReportWindow,
        limit: usize,
    ) -> LedgerResult<Vec<BestSeller>> {
        let sales = self
            .db
            .sales()
            .in_window(shop_id, window.start, window.end)
            .await?;
        Ok(best_sellers(window, &sales, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credit::CreditLedger;
    use crate::expenses::ExpenseRecorder;
    use crate::inventory::Inventory;
    use crate::sales::SaleRecorder;
    use chrono::{Duration, Utc};
    use tillbook_core::{ExpenseCategory, LineRequest, PaymentMethod, PaymentType, Product};
    use tillbook_db::DbConfig;

    const SHOP: &str = "shop";

    fn line(p: &Product, quantity: i64) -> LineRequest {
        LineRequest {
            product_id: p.id.clone(),
            product_name: p.name.clone(),
            quantity,
            price_cents: p.price_cents,
            cost_cents: p.cost_cents,
        }
    }

    #[tokio::test]
    async fn test_cash_and_accrual_views_differ() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let inventory = Inventory::new(db.clone(), 5);
        let sales = SaleRecorder::new(db.clone(), inventory.clone(), 10);
        let credit = CreditLedger::new(db.clone(), sales.clone(), 5);
        let expenses = ExpenseRecorder::new(db.clone(), 10);
        let aggregator = FinancialAggregator::new(db.clone());

        let soap = inventory
            .add_product(
                SHOP,
                "Soap",
                Money::from_cents(1_000),
                Some(20),
                None,
                Some(Money::from_cents(600)),
            )
            .await
            .unwrap();
        let customer = credit.register(SHOP, "Thandi", "0821234567", None).await.unwrap();

        // A credit sale from last week, outside today's window
        let old = SaleRecorder::prereserved_sale(
            SHOP,
            &[line(&soap, 1)],
            PaymentType::Credit,
            Some(&customer.id),
            None,
            Utc::now() - Duration::days(7),
        );
        db.sales().insert(&old).await.unwrap();
        credit
            .add_credit(SHOP, &customer.id, Money::from_cents(1_000), &[], "soap on account")
            .await
            .unwrap();

        sales
            .record_sale(SHOP, &[line(&soap, 1)], PaymentType::Cash, None, None)
            .await
            .unwrap();
        expenses
            .record(
                SHOP,
                Money::from_cents(500),
                "airtime",
                ExpenseCategory::Utilities,
                PaymentMethod::Cash,
                None,
            )
            .await
            .unwrap();
        credit
            .record_payment(SHOP, &customer.id, Money::from_cents(300), "part payment")
            .await
            .unwrap();

        let report = aggregator
            .compute_cash_flow(SHOP, ReportWindow::today(Utc::now()))
            .await
            .unwrap();

        assert_eq!(report.cash_flow.inflows.total, Money::from_cents(1_300));
        assert_eq!(report.cash_flow.outflows.total, Money::from_cents(500));
        assert_eq!(report.cash_flow.net, Money::from_cents(800));
        assert_eq!(report.revenue.total, Money::from_cents(1_000));
        assert_eq!(report.profitability.cost_of_goods, Money::from_cents(600));
        assert_eq!(report.outstanding.customer_credit, Money::from_cents(700));
        assert_eq!(report.credit_payments.len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_sale_is_refund_not_revenue() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let inventory = Inventory::new(db.clone(), 5);
        let sales = SaleRecorder::new(db.clone(), inventory.clone(), 10);
        let aggregator = FinancialAggregator::new(db);

        let soap = inventory
            .add_product(SHOP, "Soap", Money::from_cents(1_000), Some(20), None, None)
            .await
            .unwrap();
        let sale = sales
            .record_sale(SHOP, &[line(&soap, 2)], PaymentType::Cash, None, None)
            .await
            .unwrap();
        sales.cancel_sale(SHOP, &sale.id, None).await.unwrap();

        let window = ReportWindow::today(Utc::now());
        let report = aggregator.compute_cash_flow(SHOP, window).await.unwrap();
        assert_eq!(report.cash_flow.inflows.cash_sales, Money::from_cents(2_000));
        assert_eq!(report.cash_flow.outflows.refunds, Money::from_cents(2_000));
        assert_eq!(report.cash_flow.net, Money::zero());
        assert_eq!(report.revenue.total, Money::zero());

        assert!(aggregator.best_sellers(SHOP, &window, 5).await.unwrap().is_empty());
    }
}
