//! # Command Dispatch
//!
//! The single entry point for incoming text.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  handle_incoming_text(shop_id, "sell 3 bread to Thandi")                │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  load active catalog ──► interpret() ──► Intent::Sell { .. }            │
//! │         │                      │                                        │
//! │         │                      └── ParseError ──► reply text            │
//! │         ▼                                                               │
//! │  dispatch(intent) ──► Inventory / SaleRecorder / CreditLedger / ...     │
//! │         │                                                               │
//! │         ├── Ok ──► ReplyPayload::Text or ReplyPayload::Document         │
//! │         └── Err ──► reply::ledger_error (storage errors are logged)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{Datelike, Utc};
use std::sync::Arc;
use tracing::{debug, error};

use tillbook_core::command::{
    interpret, Intent, ItemRequest, ProductEdit, ReportPeriod, StockChange, HELP_TEXT,
};
use tillbook_core::report::ReportWindow;
use tillbook_core::validation::validate_shop_id;
use tillbook_core::{PaymentType, Product, ReplyPayload};
use tillbook_db::Database;

use crate::aggregator::FinancialAggregator;
use crate::config::LedgerConfig;
use crate::credit::CreditLedger;
use crate::error::{LedgerError, LedgerResult};
use crate::expenses::ExpenseRecorder;
use crate::inventory::Inventory;
use crate::laybye::LayByeTracker;
use crate::orders::OrderBook;
use crate::render::{JsonReportRenderer, ReportDocument, ReportRenderer};
use crate::reply;
use crate::sales::SaleRecorder;

const BEST_SELLERS_DAYS: u32 = 30;

/// All ledger services behind one text interface.
#[derive(Clone)]
pub struct Ledger {
    inventory: Inventory,
    sales: SaleRecorder,
    credit: CreditLedger,
    orders: OrderBook,
    laybyes: LayByeTracker,
    expenses: ExpenseRecorder,
    aggregator: FinancialAggregator,
    renderer: Arc<dyn ReportRenderer>,
    best_sellers_limit: usize,
}

impl Ledger {
    /// Wires every service to `db`. Reports are exported as JSON into
    /// `config.report_dir` unless another renderer is set.
    pub fn new(db: Database, config: &LedgerConfig) -> Self {
        let retries = config.reserve_max_retries;
        let limit = config.recent_sales_limit;

        let inventory = Inventory::new(db.clone(), retries);
        let sales = SaleRecorder::new(db.clone(), inventory.clone(), limit);

        Ledger {
            credit: CreditLedger::new(db.clone(), sales.clone(), retries),
            orders: OrderBook::new(db.clone(), sales.clone(), limit),
            laybyes: LayByeTracker::new(
                db.clone(),
                inventory.clone(),
                sales.clone(),
                config.laybye_term_days,
                retries,
                limit,
            ),
            expenses: ExpenseRecorder::new(db.clone(), limit),
            aggregator: FinancialAggregator::new(db),
            renderer: Arc::new(JsonReportRenderer::new(&config.report_dir)),
            best_sellers_limit: config.best_sellers_limit,
            inventory,
            sales,
        }
    }

    /// Replaces the report renderer.
    pub fn with_renderer(mut self, renderer: Arc<dyn ReportRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn sales(&self) -> &SaleRecorder {
        &self.sales
    }

    pub fn credit(&self) -> &CreditLedger {
        &self.credit
    }

    pub fn orders(&self) -> &OrderBook {
        &self.orders
    }

    pub fn laybyes(&self) -> &LayByeTracker {
        &self.laybyes
    }

    pub fn expenses(&self) -> &ExpenseRecorder {
        &self.expenses
    }

    pub fn aggregator(&self) -> &FinancialAggregator {
        &self.aggregator
    }

    /// Interprets one message and carries it out.
    ///
    /// Never fails: every outcome, including errors, becomes a reply.
    pub async fn handle_incoming_text(&self, shop_id: &str, text: &str) -> ReplyPayload {
        if let Err(err) = validate_shop_id(shop_id) {
            return ReplyPayload::text(reply::ledger_error(&LedgerError::from(err)));
        }

        let catalog = match self.inventory.catalog(shop_id).await {
            Ok(catalog) => catalog,
            Err(err) => return ReplyPayload::text(reply::ledger_error(&err)),
        };

        let intent = match interpret(text, &catalog) {
            Ok(intent) => intent,
            Err(err) => {
                debug!(shop_id, error = %err, "Message not understood");
                return ReplyPayload::text(reply::parse_error(&err));
            }
        };

        let label = intent.label();
        debug!(shop_id, intent = label, "Dispatching");
        match self.dispatch(shop_id, intent).await {
            Ok(payload) => payload,
            Err(err) => {
                debug!(shop_id, intent = label, error = %err, "Command rejected");
                ReplyPayload::text(reply::ledger_error(&err))
            }
        }
    }

    async fn dispatch(&self, shop: &str, intent: Intent) -> LedgerResult<ReplyPayload> {
        let text = match intent {
            // Inventory
            Intent::AddProduct {
                name,
                price,
                stock,
                threshold,
                cost,
            } => {
                let product = self
                    .inventory
                    .add_product(shop, &name, price, stock, threshold, cost)
                    .await?;
                reply::product_added(&product)
            }
            Intent::ListStock => reply::stock_list(&self.inventory.catalog(shop).await?),
            Intent::LowStock => reply::low_stock_list(&self.inventory.low_stock(shop).await?),
            Intent::ChangeStock {
                product,
                change,
                quantity,
            } => {
                let inventory = &self.inventory;
                let updated = match change {
                    StockChange::Add => inventory.adjust_stock(shop, &product.id, quantity).await?,
                    StockChange::Remove => {
                        inventory.adjust_stock(shop, &product.id, -quantity).await?
                    }
                    StockChange::Set => inventory.set_stock(shop, &product.id, quantity).await?,
                };
                reply::product_updated(&updated)
            }
            Intent::SetPrice { product, price } => {
                reply::product_updated(&self.inventory.set_price(shop, &product.id, price).await?)
            }
            Intent::SetThreshold { product, threshold } => {
                let updated = self.inventory.set_threshold(shop, &product.id, threshold).await?;
                format!("{} will alert at {} left.", updated.name, updated.low_stock_threshold)
            }
            Intent::EditProduct { product, edit } => {
                let inventory = &self.inventory;
                let id = product.id.as_str();
                let updated = match edit {
                    ProductEdit::Name(name) => inventory.rename(shop, id, &name).await?,
                    ProductEdit::Price(price) => inventory.set_price(shop, id, price).await?,
                    ProductEdit::Stock(stock) => inventory.set_stock(shop, id, stock).await?,
                    ProductEdit::Threshold(n) => inventory.set_threshold(shop, id, n).await?,
                    ProductEdit::Cost(cost) => inventory.set_cost(shop, id, cost).await?,
                };
                reply::product_updated(&updated)
            }
            Intent::DeleteProduct { product, confirmed } => {
                if confirmed {
                    let outcome = self.inventory.archive(shop, &product.id).await?;
                    reply::archived(&product.name, outcome)
                } else {
                    format!("Send 'delete {} confirm' to remove {}.", product.name, product.name)
                }
            }

            // Sales
            Intent::Sell { items, customer } => {
                let lines = self.inventory.price_lines(shop, &items).await?;
                let customer = match customer {
                    Some(reference) => Some(self.credit.resolve(shop, &reference).await?),
                    None => None,
                };
                let customer_id = customer.as_ref().map(|c| c.id.as_str());
                let sale = self
                    .sales
                    .record_sale(shop, &lines, PaymentType::Cash, customer_id, None)
                    .await?;
                let low = self.low_after(shop, &items).await;
                reply::sale_recorded(&sale, &low)
            }
            Intent::RecentSales => {
                let recent = self.sales.recent_sales(shop, self.sales.recent_limit()).await?;
                reply::recent_sales(&recent)
            }
            Intent::CancelSale { reference, reason } => {
                let (sale, reversal) =
                    self.credit.cancel_sale(shop, &reference, reason.as_deref()).await?;
                reply::sale_cancelled(&sale, reversal.as_ref())
            }

            // Customers & credit
            Intent::RegisterCustomer { name, phone } => {
                reply::customer_registered(&self.credit.register(shop, &name, &phone, None).await?)
            }
            Intent::ListCustomers => reply::customer_list(&self.credit.list(shop).await?),
            Intent::Balance { customer } => {
                reply::balance(&self.credit.resolve(shop, &customer).await?)
            }
            Intent::CreditAmount { customer, amount } => {
                let c = self.credit.resolve(shop, &customer).await?;
                let entry = self.credit.add_credit(shop, &c.id, amount, &[], "Credit").await?;
                reply::credit_added(&c, &entry)
            }
            Intent::CreditItems { customer, items } => {
                let c = self.credit.resolve(shop, &customer).await?;
                let lines = self.inventory.price_lines(shop, &items).await?;
                let (sale, entry) = self.credit.credit_sale(shop, &c.id, &lines).await?;
                reply::credit_sale(&c, &sale, &entry)
            }
            Intent::Payment { customer, amount } => {
                let c = self.credit.resolve(shop, &customer).await?;
                let entry = self.credit.record_payment(shop, &c.id, amount, "Payment").await?;
                reply::payment_recorded(&c, &entry)
            }
            Intent::AuditCredit { customer } => {
                let c = self.credit.resolve(shop, &customer).await?;
                let audit = self.credit.audit(shop, &c.id).await?;
                reply::audit(&c, &audit)
            }

            // Orders
            Intent::PlaceOrder {
                customer,
                items,
                order_type,
            } => {
                let c = self.credit.resolve(shop, &customer).await?;
                let lines = self.inventory.price_lines(shop, &items).await?;
                let order = self.orders.place(shop, Some(&c.id), &lines, order_type).await?;
                reply::order_placed(&order, &c)
            }
            Intent::ListOrders => reply::order_list(&self.orders.list_open(shop).await?),
            Intent::MoveOrder { reference, to } => {
                reply::order_moved(&self.orders.transition(shop, &reference, to).await?)
            }

            // Lay-byes
            Intent::CreateLayBye { customer, items } => {
                let c = self.credit.resolve(shop, &customer).await?;
                let lines = self.inventory.price_lines(shop, &items).await?;
                let laybye = self.laybyes.create(shop, Some(&c.id), &lines).await?;
                reply::laybye_created(&laybye, &c)
            }
            Intent::LayByePayment {
                reference,
                amount,
                method,
            } => reply::laybye_paid(
                &self
                    .laybyes
                    .add_installment(shop, &reference, amount, method)
                    .await?,
            ),
            Intent::CancelLayBye { reference } => {
                reply::laybye_cancelled(&self.laybyes.cancel(shop, &reference).await?)
            }
            Intent::ListLayByes => reply::laybye_list(&self.laybyes.list_active(shop).await?),

            // Expenses
            Intent::RecordExpense {
                amount,
                category,
                description,
                method,
                receipt,
            } => {
                let expense = self
                    .expenses
                    .record(shop, amount, &description, category, method, receipt.as_deref())
                    .await?;
                reply::expense_recorded(&expense)
            }
            Intent::ListExpenses => reply::expense_list(&self.expenses.recent(shop).await?),

            // Reports
            Intent::Report { period, export } => return self.report(shop, period, export).await,
            Intent::CashFlow { start, end } => {
                let window = ReportWindow::from_dates(start, end)?;
                self.aggregator
                    .compute_cash_flow(shop, window)
                    .await?
                    .summary("Cash flow")
            }
            Intent::Help => HELP_TEXT.to_string(),
        };

        Ok(ReplyPayload::text(text))
    }

    async fn report(
        &self,
        shop: &str,
        period: ReportPeriod,
        export: bool,
    ) -> LedgerResult<ReplyPayload> {
        let now = Utc::now();
        let (title, window) = match period {
            ReportPeriod::Daily => ("Daily report".to_string(), ReportWindow::today(now)),
            ReportPeriod::Weekly => ("Weekly report".to_string(), ReportWindow::last_days(now, 7)),
            ReportPeriod::Monthly(named) => {
                let (year, month) = match named {
                    Some(m) => (m.year.unwrap_or(now.year()), m.month),
                    None => (now.year(), now.month()),
                };
                (format!("Monthly report {year}-{month:02}"), ReportWindow::month(year, month)?)
            }
            ReportPeriod::BestSellers => (
                format!("Best sellers, last {BEST_SELLERS_DAYS} days"),
                ReportWindow::last_days(now, BEST_SELLERS_DAYS),
            ),
        };

        let (caption, document) = if let ReportPeriod::BestSellers = period {
            let products = self
                .aggregator
                .best_sellers(shop, &window, self.best_sellers_limit)
                .await?;
            let caption = reply::best_sellers(&title, &products);
            let document = ReportDocument::BestSellers {
                title,
                generated_at: now,
                window,
                products,
            };
            (caption, document)
        } else {
            let report = self.aggregator.compute_cash_flow(shop, window).await?;
            let caption = report.summary(&title);
            let document = ReportDocument::CashFlow {
                title,
                generated_at: now,
                report,
            };
            (caption, document)
        };

        if !export {
            return Ok(ReplyPayload::text(caption));
        }

        match self.renderer.render(&document).await {
            Ok(path) => Ok(ReplyPayload::Document { path, caption }),
            Err(err) => {
                error!(shop_id = shop, error = %err, "Report export failed");
                Ok(ReplyPayload::text(format!(
                    "{caption}\n(The export file could not be written, showing the summary instead.)"
                )))
            }
        }
    }

    /// Products from `items` now at or below their alert level.
    async fn low_after(&self, shop: &str, items: &[ItemRequest]) -> Vec<Product> {
        let mut low = Vec::new();
        for item in items {
            if let Ok(p) = self.inventory.product(shop, &item.product.id).await {
                if p.is_low_stock() && !low.iter().any(|l: &Product| l.id == p.id) {
                    low.push(p);
                }
            }
        }
        low
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("best_sellers_limit", &self.best_sellers_limit)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RenderError;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tillbook_db::DbConfig;

    const SHOP: &str = "shop-a";

    /// Keeps rendered documents in memory.
    #[derive(Default)]
    struct RecordingRenderer {
        titles: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ReportRenderer for RecordingRenderer {
        async fn render(&self, document: &ReportDocument) -> Result<PathBuf, RenderError> {
            self.titles.lock().unwrap().push(document.title().to_string());
            Ok(PathBuf::from("/reports").join(document.file_name()))
        }
    }

    async fn ledger() -> (Ledger, Arc<RecordingRenderer>) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let renderer = Arc::new(RecordingRenderer::default());
        let ledger = Ledger::new(db, &LedgerConfig::in_memory()).with_renderer(renderer.clone());
        (ledger, renderer)
    }

    async fn say(ledger: &Ledger, text: &str) -> String {
        ledger.handle_incoming_text(SHOP, text).await.message().to_string()
    }

    #[tokio::test]
    async fn test_sell_from_text() {
        let (ledger, _) = ledger().await;
        say(&ledger, "add bread 2.50 stock 10 threshold 7").await;

        let reply = say(&ledger, "sell 3 bread").await;
        assert!(reply.contains("$7.50"), "{reply}");
        assert!(reply.contains("Low stock: bread (7 left)"), "{reply}");

        let stock = say(&ledger, "stock").await;
        assert!(stock.contains("bread - 7 @ $2.50"), "{stock}");
    }

    #[tokio::test]
    async fn test_unknown_product_and_verb() {
        let (ledger, _) = ledger().await;
        assert!(say(&ledger, "sell 2 unicorn").await.contains("add unicorn <price>"));
        assert!(say(&ledger, "dance").await.starts_with("Unknown command"));
    }

    #[tokio::test]
    async fn test_shops_are_isolated() {
        let (ledger, _) = ledger().await;
        say(&ledger, "add bread 2.50 stock 10").await;

        let other = ledger.handle_incoming_text("shop-b", "sell 1 bread").await;
        assert!(other.message().contains("not found"), "{}", other.message());
    }

    #[tokio::test]
    async fn test_credit_flow_from_text() {
        let (ledger, _) = ledger().await;
        say(&ledger, "customer Thandi 0821234567").await;
        say(&ledger, "credit Thandi 5").await;

        let paid = say(&ledger, "payment Thandi 3").await;
        assert!(paid.contains("$5.00 → $2.00"), "{paid}");
        assert!(say(&ledger, "balance thandi").await.starts_with("Thandi owes $2.00"));
        assert!(say(&ledger, "audit 0821234567").await.contains("checks out"));

        let missing = say(&ledger, "balance Zola").await;
        assert!(missing.contains("Try: customer Zola <phone>"), "{missing}");
    }

    #[tokio::test]
    async fn test_laybye_overpayment_from_text() {
        let (ledger, _) = ledger().await;
        say(&ledger, "customer Thandi 0821234567").await;
        say(&ledger, "add radio 100 stock 2").await;
        say(&ledger, "laybye Thandi 1 radio").await;

        assert!(say(&ledger, "laybye pay 1 40").await.contains("$60.00 still due"));
        let rejected = say(&ledger, "laybye pay 1 61").await;
        assert!(rejected.contains("exceeds balance due"), "{rejected}");
        assert!(say(&ledger, "laybyes").await.contains("paid $40.00 of $100.00"));
    }

    #[tokio::test]
    async fn test_order_lifecycle_from_text() {
        let (ledger, _) = ledger().await;
        say(&ledger, "customer Thandi 0821234567").await;
        say(&ledger, "add bread 2.50 stock 10").await;
        say(&ledger, "order Thandi 2 bread").await;

        assert!(say(&ledger, "complete order 1").await.starts_with("Cannot move Order"));
        say(&ledger, "confirm order 1").await;
        say(&ledger, "ready order 1").await;
        let done = say(&ledger, "complete order 1").await;
        assert!(done.contains("is now completed"), "{done}");
        assert!(say(&ledger, "stock").await.contains("bread - 8"));
    }

    #[tokio::test]
    async fn test_export_hands_document_to_renderer() {
        let (ledger, renderer) = ledger().await;
        say(&ledger, "add bread 2.50 stock 10").await;
        say(&ledger, "sell 2 bread").await;

        match ledger.handle_incoming_text(SHOP, "export daily").await {
            ReplyPayload::Document { path, caption } => {
                assert!(path.starts_with("/reports"));
                assert!(caption.contains("Cash in: $5.00"), "{caption}");
            }
            other => panic!("expected a document, got {other:?}"),
        }
        assert_eq!(renderer.titles.lock().unwrap().as_slice(), ["Daily report"]);

        let text = ledger.handle_incoming_text(SHOP, "best").await;
        assert!(matches!(text, ReplyPayload::Text { .. }));
        assert!(text.message().contains("1. bread - 2 sold"));
    }

    #[tokio::test]
    async fn test_cancel_by_number_from_text() {
        let (ledger, _) = ledger().await;
        say(&ledger, "add bread 2.50 stock 10").await;
        say(&ledger, "sell 4 bread").await;

        assert!(say(&ledger, "cancel 1 wrong item").await.contains("Stock restored"));
        assert!(say(&ledger, "stock").await.contains("bread - 10"));
        assert_eq!(say(&ledger, "sales").await, "No sales yet.");
    }

    #[tokio::test]
    async fn test_cancelling_credit_sale_clears_balance() {
        let (ledger, _) = ledger().await;
        say(&ledger, "customer Thandi 0821234567").await;
        say(&ledger, "add bread 2.50 stock 10").await;
        say(&ledger, "credit Thandi 2 bread").await;

        let cancelled = say(&ledger, "cancel 1 returned").await;
        assert!(cancelled.contains("Account balance $5.00 → $0.00"), "{cancelled}");
        assert!(say(&ledger, "balance Thandi").await.starts_with("Thandi owes $0.00."));
        assert!(say(&ledger, "audit Thandi").await.contains("checks out: 2 entries"));
        assert!(say(&ledger, "stock").await.contains("bread - 10"));

        let daily = say(&ledger, "daily").await;
        assert!(daily.contains("Cash in: $0.00"), "{daily}");
        assert!(daily.contains("Cash out: $0.00 (expenses $0.00, refunds $0.00)"), "{daily}");
        assert!(daily.contains("Net cash flow: $0.00"), "{daily}");
        assert!(daily.contains("Revenue: $0.00"), "{daily}");
        assert!(daily.contains("Outstanding: $0.00"), "{daily}");
    }

    #[tokio::test]
    async fn test_cancelling_laybye_sale_refunds_installments() {
        let (ledger, _) = ledger().await;
        say(&ledger, "customer Thandi 0821234567").await;
        say(&ledger, "add radio 100 stock 2").await;
        say(&ledger, "laybye Thandi 1 radio").await;
        assert!(say(&ledger, "laybye pay 1 100").await.contains("is paid up"));
        assert!(say(&ledger, "stock").await.contains("radio - 1"));

        let cancelled = say(&ledger, "cancel 1 changed mind").await;
        assert!(cancelled.contains("Stock restored"), "{cancelled}");
        assert!(!cancelled.contains("Account balance"), "{cancelled}");
        assert!(say(&ledger, "stock").await.contains("radio - 2"));

        let daily = say(&ledger, "daily").await;
        assert!(daily.contains("lay-bye $100.00)"), "{daily}");
        assert!(daily.contains("refunds $100.00"), "{daily}");
        assert!(daily.contains("Net cash flow: $0.00"), "{daily}");
        assert!(daily.contains("Revenue: $0.00"), "{daily}");
    }

    #[tokio::test]
    async fn test_cancelling_order_sale_refunds_cash() {
        let (ledger, _) = ledger().await;
        say(&ledger, "customer Thandi 0821234567").await;
        say(&ledger, "add bread 2.50 stock 10").await;
        say(&ledger, "order Thandi 2 bread").await;
        say(&ledger, "confirm order 1").await;
        say(&ledger, "ready order 1").await;
        assert!(say(&ledger, "complete order 1").await.contains("recorded"));

        let cancelled = say(&ledger, "cancel 1").await;
        assert!(cancelled.contains("($5.00). Stock restored."), "{cancelled}");
        assert!(say(&ledger, "stock").await.contains("bread - 10"));
        assert!(say(&ledger, "balance Thandi").await.starts_with("Thandi owes $0.00."));

        let daily = say(&ledger, "daily").await;
        assert!(daily.contains("Cash in: $5.00 (sales $5.00"), "{daily}");
        assert!(daily.contains("refunds $5.00"), "{daily}");
        assert!(daily.contains("Net cash flow: $0.00"), "{daily}");
        assert!(daily.contains("Revenue: $0.00"), "{daily}");
    }

    #[tokio::test]
    async fn test_huge_quantity_is_rejected_not_overflowed() {
        let (ledger, _) = ledger().await;
        say(&ledger, "add bread 2.50 stock 10").await;

        let reply = say(&ledger, "sell 2 bread 90000000000000000").await;
        assert!(reply.starts_with("Invalid input:"), "{reply}");
        let reply = say(&ledger, "add gold 90000000000000000").await;
        assert!(reply.starts_with("Invalid input:"), "{reply}");
        assert!(say(&ledger, "stock").await.contains("bread - 10"));
    }

    #[tokio::test]
    async fn test_shops_never_see_each_other() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let ledger = Ledger::new(db.clone(), &LedgerConfig::in_memory())
            .with_renderer(Arc::new(RecordingRenderer::default()));
        let a = |text: &'static str| {
            let ledger = ledger.clone();
            async move { ledger.handle_incoming_text("shop-a", text).await.message().to_string() }
        };
        let b = |text: &'static str| {
            let ledger = ledger.clone();
            async move { ledger.handle_incoming_text("shop-b", text).await.message().to_string() }
        };

        a("add bread 2.50 stock 10").await;
        a("customer Thandi 0821234567").await;
        a("sell 1 bread").await;
        a("credit Thandi 5").await;
        a("order Thandi 1 bread").await;
        a("laybye Thandi 1 bread").await;

        b("add bread 4.00 stock 20").await;
        b("customer Sipho 0837654321").await;
        b("sell 3 bread").await;
        b("credit Sipho 7").await;
        b("order Sipho 2 bread").await;
        b("laybye Sipho 2 bread").await;

        let window = ReportWindow::today(Utc::now());
        let report = ledger.aggregator.compute_cash_flow("shop-a", window).await.unwrap();
        assert_eq!(report.sales.len(), 1);
        assert_eq!(report.cash_flow.inflows.cash_sales.cents(), 250);
        assert_eq!(report.outstanding.customer_credit.cents(), 500);
        assert_eq!(report.outstanding.laybye_balance.cents(), 250);

        assert_eq!(db.customers().outstanding_total("shop-a").await.unwrap(), 500);
        assert_eq!(db.customers().outstanding_total("shop-b").await.unwrap(), 700);

        assert!(ledger.credit.resolve("shop-a", "Sipho").await.is_err());
        assert!(ledger.credit.resolve("shop-a", "0837654321").await.is_err());
        assert!(ledger.credit.resolve("shop-b", "Thandi").await.is_err());

        // Numeric references only reach the calling shop's rows
        let confirmed = a("confirm order 1").await;
        assert!(confirmed.contains("is now confirmed"), "{confirmed}");
        assert!(b("orders").await.contains("pending $8.00"));
        assert!(a("laybye pay 1 2.50").await.contains("is paid up"));
        assert!(b("laybyes").await.contains("paid $0.00 of $8.00"));
        assert!(a("cancel 2").await.contains("($2.50). Stock restored."));
        assert!(a("stock").await.contains("bread - 9"));
        assert!(b("sales").await.contains("$12.00"));
        assert!(b("stock").await.contains("bread - 15"));
    }
}
