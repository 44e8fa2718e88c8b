//! # Sale Recorder
//!
//! ## Recording a Sale
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. reserve every line ─── any line short? release the others, fail     │
//! │  2. insert sale + lines (one transaction) ─── failed? release all, fail │
//! │  3. linked customer? bump spend, visits, points                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Cancelling flips the flag with a conditional update first and only then
//! releases stock, so a second cancel can never restore twice. Sales made on
//! credit are cancelled through `CreditLedger::cancel_sale`, which flips the
//! flag together with the reversing credit entry.

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use tillbook_core::validation::{
    validate_description, validate_line_count, validate_lines_total, validate_quantity,
};
use tillbook_core::{new_id, CoreError, LineItem, LineRequest, Money, PaymentType, Sale};
use tillbook_db::Database;

use crate::error::LedgerResult;
use crate::inventory::Inventory;
use crate::reference::{pick_index, pick_unique, Reference};

/// Records and cancels sales.
#[derive(Debug, Clone)]
pub struct SaleRecorder {
    db: Database,
    inventory: Inventory,
    recent_limit: i64,
}

impl SaleRecorder {
    pub fn new(db: Database, inventory: Inventory, recent_limit: i64) -> Self {
        SaleRecorder {
            db,
            inventory,
            recent_limit,
        }
    }

    /// How many recent sales a numeric reference can reach.
    pub fn recent_limit(&self) -> i64 {
        self.recent_limit
    }

    /// Reserves stock for `lines` and records the sale.
    pub async fn record_sale(
        &self,
        shop_id: &str,
        lines: &[LineRequest],
        payment_type: PaymentType,
        customer_id: Option<&str>,
        source_ref: Option<&str>,
    ) -> LedgerResult<Sale> {
        debug!(shop_id, lines = lines.len(), payment_type = %payment_type, "record_sale");
        validate_lines(lines)?;

        if let Some(id) = customer_id {
            if self.db.customers().get(shop_id, id).await?.is_none() {
                return Err(CoreError::not_found("Customer", id).into());
            }
        }

        self.inventory.reserve_all(shop_id, lines).await?;

        let now = Utc::now();
        let sale =
            Self::prereserved_sale(shop_id, lines, payment_type, customer_id, source_ref, now);
        if let Err(err) = self.db.sales().insert(&sale).await {
            warn!(sale_id = %sale.id, error = %err, "Sale insert failed, releasing stock");
            self.inventory.release_all(shop_id, lines).await;
            return Err(err.into());
        }

        self.apply_customer_stats(&sale).await;

        info!(
            shop_id,
            sale_id = %sale.id,
            total = %sale.total(),
            payment_type = %sale.payment_type,
            "Sale recorded"
        );
        Ok(sale)
    }

    /// Builds a sale for stock that was reserved earlier. The caller
    /// persists it (lay-bye completion inserts it inside its own
    /// transaction).
    pub fn prereserved_sale(
        shop_id: &str,
        lines: &[LineRequest],
        payment_type: PaymentType,
        customer_id: Option<&str>,
        source_ref: Option<&str>,
        at: DateTime<Utc>,
    ) -> Sale {
        let id = new_id();
        let items: Vec<LineItem> = lines
            .iter()
            .map(|line| LineItem::from_request(new_id(), &id, line))
            .collect();
        let total_cents = items.iter().map(LineItem::total).sum::<Money>().cents();

        Sale {
            id,
            shop_id: shop_id.to_string(),
            payment_type,
            total_cents,
            customer_id: customer_id.map(str::to_string),
            source_ref: source_ref.map(str::to_string),
            date: at,
            is_cancelled: false,
            cancelled_at: None,
            cancellation_reason: None,
            items,
        }
    }

    /// Bumps the linked customer's purchase statistics. A failure here is
    /// logged; the sale itself already stands.
    pub async fn apply_customer_stats(&self, sale: &Sale) {
        let Some(customer_id) = sale.customer_id.as_deref() else {
            return;
        };
        let points = sale.total().dollars();
        if let Err(err) = self
            .db
            .customers()
            .record_purchase(&sale.shop_id, customer_id, sale.total_cents, points, sale.date)
            .await
        {
            error!(
                sale_id = %sale.id,
                customer_id,
                error = %err,
                "Failed to update customer statistics"
            );
        }
    }

    /// Cancels a cash or lay-bye sale and puts its stock back.
    ///
    /// Customer statistics are left as they are. Credit sales are refused
    /// here because their customer's balance has to come down with them.
    pub async fn cancel_sale(
        &self,
        shop_id: &str,
        reference: &str,
        reason: Option<&str>,
    ) -> LedgerResult<Sale> {
        if let Some(reason) = reason {
            validate_description(reason)?;
        }

        let sale = self.find_by_id_or_index(shop_id, reference).await?;
        if sale.payment_type == PaymentType::Credit && !sale.is_cancelled {
            return Err(CoreError::InvalidTransition {
                entity: "Sale",
                id: sale.short_id().to_string(),
                from: "credit".to_string(),
                to: "cancelled without a credit reversal".to_string(),
            }
            .into());
        }
        self.cancel_resolved(sale, reason).await
    }

    /// Flags an already resolved sale cancelled and releases its stock.
    pub(crate) async fn cancel_resolved(
        &self,
        sale: Sale,
        reason: Option<&str>,
    ) -> LedgerResult<Sale> {
        if sale.is_cancelled {
            return Err(already_cancelled(&sale));
        }

        let now = Utc::now();
        if !self.db.sales().mark_cancelled(&sale.shop_id, &sale.id, reason, now).await? {
            return Err(already_cancelled(&sale));
        }
        self.release_stock(&sale).await;

        info!(shop_id = %sale.shop_id, sale_id = %sale.id, total = %sale.total(), "Sale cancelled");
        Ok(sale.into_cancelled(reason, now))
    }

    /// Puts every line of a cancelled sale back on the shelf.
    pub(crate) async fn release_stock(&self, sale: &Sale) {
        let lines: Vec<LineRequest> = sale.items.iter().map(LineItem::to_request).collect();
        self.inventory.release_all(&sale.shop_id, &lines).await;
    }

    /// Latest non-cancelled sales, newest first.
    pub async fn recent_sales(&self, shop_id: &str, limit: i64) -> LedgerResult<Vec<Sale>> {
        Ok(self.db.sales().recent(shop_id, limit).await?)
    }

    /// Resolves a full id, a unique id prefix, or a position in the recent
    /// sales list. Cancelled sales stay reachable by id.
    pub async fn find_by_id_or_index(&self, shop_id: &str, reference: &str) -> LedgerResult<Sale> {
        match Reference::parse(reference)? {
            Reference::Index(n) => {
                let recent = self.recent_sales(shop_id, self.recent_limit).await?;
                pick_index(recent, n, "Sale", "sales")
            }
            Reference::Id(id) => {
                let matches = self.db.sales().find_by_prefix(shop_id, id, 2).await?;
                pick_unique(matches, |s| s.id.as_str(), id, "Sale", "sales")
            }
        }
    }
}

/// Checks line count, quantities and prices, and returns the total.
pub(crate) fn validate_lines(lines: &[LineRequest]) -> LedgerResult<Money> {
    validate_line_count(lines.len())?;
    for line in lines {
        validate_quantity(line.quantity)?;
    }
    Ok(validate_lines_total(lines)?)
}

pub(crate) fn already_cancelled(sale: &Sale) -> crate::error::LedgerError {
    CoreError::AlreadyCancelled {
        entity: "Sale",
        id: sale.short_id().to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use tillbook_core::Product;
    use tillbook_db::DbConfig;

    const SHOP: &str = "shop";

    async fn setup() -> (SaleRecorder, Inventory, Product) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let inventory = Inventory::new(db.clone(), 5);
        let bread = inventory
            .add_product(
                SHOP,
                "Bread",
                Money::from_cents(250),
                Some(10),
                None,
                Some(Money::from_cents(120)),
            )
            .await
            .unwrap();
        (SaleRecorder::new(db, inventory.clone(), 10), inventory, bread)
    }

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
    async fn test_sell_three_bread() {
        let (sales, inventory, bread) = setup().await;
        let sale = sales
            .record_sale(SHOP, &[line(&bread, 3)], PaymentType::Cash, None, None)
            .await
            .unwrap();

        assert_eq!(sale.total(), Money::from_cents(750));
        assert_eq!(inventory.product(SHOP, &bread.id).await.unwrap().stock, 7);
    }

    #[tokio::test]
    async fn test_cancel_restores_exact_quantities_once() {
        let (sales, inventory, bread) = setup().await;
        let sale = sales
            .record_sale(SHOP, &[line(&bread, 4)], PaymentType::Cash, None, None)
            .await
            .unwrap();

        // Unrelated restock in between
        inventory.adjust_stock(SHOP, &bread.id, 5).await.unwrap();

        let cancelled = sales.cancel_sale(SHOP, &sale.id, Some("mistake")).await.unwrap();
        assert!(cancelled.is_cancelled);
        assert_eq!(inventory.product(SHOP, &bread.id).await.unwrap().stock, 15);

        let err = sales.cancel_sale(SHOP, &sale.id, None).await.unwrap_err();
        assert!(matches!(err, LedgerError::Business(CoreError::AlreadyCancelled { .. })));
        assert_eq!(inventory.product(SHOP, &bread.id).await.unwrap().stock, 15);
    }

    #[tokio::test]
    async fn test_index_refers_to_recent_non_cancelled() {
        let (sales, _, bread) = setup().await;
        let first = sales
            .record_sale(SHOP, &[line(&bread, 1)], PaymentType::Cash, None, None)
            .await
            .unwrap();
        let second = sales
            .record_sale(SHOP, &[line(&bread, 2)], PaymentType::Cash, None, None)
            .await
            .unwrap();

        assert_eq!(sales.find_by_id_or_index(SHOP, "1").await.unwrap().id, second.id);
        assert_eq!(sales.find_by_id_or_index(SHOP, "2").await.unwrap().id, first.id);
        assert_eq!(
            sales.find_by_id_or_index(SHOP, &first.id[..8]).await.unwrap().id,
            first.id
        );
        assert!(sales.find_by_id_or_index(SHOP, "3").await.is_err());
    }

    #[tokio::test]
    async fn test_customer_stats_follow_sale() {
        let (sales, _, bread) = setup().await;
        let customer = tillbook_core::Customer {
            id: new_id(),
            shop_id: SHOP.to_string(),
            name: "Thandi".to_string(),
            phone: "0821234567".to_string(),
            email: None,
            total_spent_cents: 0,
            total_visits: 0,
            loyalty_points: 0,
            current_balance_cents: 0,
            credit_limit_cents: 0,
            last_purchase_at: None,
            version: 0,
            created_at: Utc::now(),
        };
        sales.db.customers().insert(&customer).await.unwrap();

        let sale = sales
            .record_sale(SHOP, &[line(&bread, 4)], PaymentType::Cash, Some(&customer.id), None)
            .await
            .unwrap();
        sales.cancel_sale(SHOP, &sale.id, None).await.unwrap();

        let after = sales.db.customers().get(SHOP, &customer.id).await.unwrap().unwrap();
        assert_eq!(after.total_spent_cents, 1_000);
        assert_eq!(after.total_visits, 1);
        assert_eq!(after.loyalty_points, 10);
    }

    #[tokio::test]
    async fn test_empty_sale_rejected() {
        let (sales, _, _) = setup().await;
        assert!(sales
            .record_sale(SHOP, &[], PaymentType::Cash, None, None)
            .await
            .is_err());
    }
}
