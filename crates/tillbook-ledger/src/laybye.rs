//! # Lay-bye Tracker
//!
//! A lay-bye holds stock for a customer while they pay it off.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create ── reserve every line ──► active (balance_due = total)          │
//! │                                      │                                  │
//! │        installment (≤ balance_due) ──┤                                  │
//! │                                      │                                  │
//! │       balance_due == 0 ──► completed + `laybye` sale, same transaction  │
//! │                                      │                                  │
//! │                     cancel ──► cancelled, stock released                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Installments already paid on a cancelled plan stay in the cash-flow
//! history. Refunding them is recorded as an expense.

use chrono::{Duration, Utc};
use tracing::{debug, info, warn};

use tillbook_core::validation::validate_amount;
use tillbook_core::{
    new_id, CoreError, Installment, LayBye, LayByeStatus, LineItem, LineRequest, Money,
    PaymentMethod, PaymentType,
};
use tillbook_db::Database;

use crate::error::{LedgerError, LedgerResult};
use crate::inventory::Inventory;
use crate::reference::{pick_index, pick_unique, Reference};
use crate::sales::{validate_lines, SaleRecorder};

/// Installment plans.
#[derive(Debug, Clone)]
pub struct LayByeTracker {
    db: Database,
    inventory: Inventory,
    sales: SaleRecorder,
    term_days: i64,
    max_retries: u32,
    list_limit: i64,
}

impl LayByeTracker {
    pub fn new(
        db: Database,
        inventory: Inventory,
        sales: SaleRecorder,
        term_days: i64,
        max_retries: u32,
        list_limit: i64,
    ) -> Self {
        LayByeTracker {
            db,
            inventory,
            sales,
            term_days,
            max_retries: max_retries.max(1),
            list_limit,
        }
    }

    /// Reserves stock for every line and opens an active plan.
    pub async fn create(
        &self,
        shop_id: &str,
        customer_id: Option<&str>,
        lines: &[LineRequest],
    ) -> LedgerResult<LayBye> {
        let total = validate_lines(lines)?.cents();
        self.inventory.reserve_all(shop_id, lines).await?;

        let id = new_id();
        let now = Utc::now();
        let items: Vec<LineItem> = lines
            .iter()
            .map(|line| LineItem::from_request(new_id(), &id, line))
            .collect();

        let laybye = LayBye {
            id,
            shop_id: shop_id.to_string(),
            customer_id: customer_id.map(str::to_string),
            total_amount_cents: total,
            amount_paid_cents: 0,
            balance_due_cents: total,
            status: LayByeStatus::Active,
            due_date: now + Duration::days(self.term_days),
            created_at: now,
            completed_at: None,
            cancelled_at: None,
            version: 1,
            items,
            installments: Vec::new(),
        };

        if let Err(err) = self.db.laybyes().insert(&laybye).await {
            warn!(laybye_id = %laybye.id, error = %err, "Lay-bye insert failed, releasing stock");
            self.inventory.release_all(shop_id, lines).await;
            return Err(err.into());
        }

        info!(
            shop_id,
            laybye_id = %laybye.id,
            total = %laybye.total_amount(),
            due = %laybye.due_date.format("%Y-%m-%d"),
            "Lay-bye created"
        );
        Ok(laybye)
    }

    /// Records a payment. Paying off the balance completes the plan and
    /// records a `laybye` sale from the stock reserved at creation.
    pub async fn add_installment(
        &self,
        shop_id: &str,
        reference: &str,
        amount: Money,
        method: PaymentMethod,
    ) -> LedgerResult<LayBye> {
        validate_amount("amount", amount)?;
        let mut laybye = self.find(shop_id, reference).await?;

        for attempt in 1..=self.max_retries {
            if laybye.status != LayByeStatus::Active {
                return Err(not_active(&laybye));
            }
            if amount > laybye.balance_due() {
                return Err(CoreError::Overpayment {
                    amount,
                    balance_due: laybye.balance_due(),
                }
                .into());
            }

            let now = Utc::now();
            let installment = Installment {
                id: new_id(),
                laybye_id: laybye.id.clone(),
                shop_id: shop_id.to_string(),
                amount_cents: amount.cents(),
                method,
                date: now,
            };

            let mut updated = laybye.clone();
            updated.amount_paid_cents = (laybye.amount_paid() + amount).cents();
            updated.balance_due_cents = (laybye.balance_due() - amount).cents();
            let completion = if updated.balance_due_cents == 0 {
                updated.status = LayByeStatus::Completed;
                updated.completed_at = Some(now);
                let lines: Vec<LineRequest> =
                    updated.items.iter().map(LineItem::to_request).collect();
                Some(SaleRecorder::prereserved_sale(
                    shop_id,
                    &lines,
                    PaymentType::LayBye,
                    updated.customer_id.as_deref(),
                    Some(&updated.id),
                    now,
                ))
            } else {
                None
            };

            let committed = self
                .db
                .laybyes()
                .record_installment(&updated, &installment, laybye.version, completion.as_ref())
                .await?;

            if committed {
                updated.version += 1;
                updated.installments.push(installment);

                if let Some(sale) = &completion {
                    self.sales.apply_customer_stats(sale).await;
                    info!(
                        shop_id,
                        laybye_id = %updated.id,
                        sale_id = %sale.id,
                        "Lay-bye completed"
                    );
                } else {
                    info!(
                        shop_id,
                        laybye_id = %updated.id,
                        amount = %amount,
                        balance_due = %updated.balance_due(),
                        "Lay-bye installment recorded"
                    );
                }
                return Ok(updated);
            }

            warn!(laybye_id = %laybye.id, attempt, "Lay-bye changed under us, retrying");
            laybye = self.reload(shop_id, &laybye.id).await?;
        }

        Err(CoreError::ConcurrentModification {
            entity: "LayBye",
            id: laybye.short_id().to_string(),
        }
        .into())
    }

    /// Cancels an active plan and releases its stock.
    pub async fn cancel(&self, shop_id: &str, reference: &str) -> LedgerResult<LayBye> {
        let mut laybye = self.find(shop_id, reference).await?;
        match laybye.status {
            LayByeStatus::Active => {}
            LayByeStatus::Cancelled => {
                return Err(CoreError::AlreadyCancelled {
                    entity: "LayBye",
                    id: laybye.short_id().to_string(),
                }
                .into())
            }
            LayByeStatus::Completed => return Err(not_active(&laybye)),
        }

        let now = Utc::now();
        if !self.db.laybyes().cancel(shop_id, &laybye.id, now).await? {
            // Completed or cancelled in the meantime
            let current = self.reload(shop_id, &laybye.id).await?;
            return Err(not_active(&current));
        }

        let lines: Vec<LineRequest> = laybye.items.iter().map(LineItem::to_request).collect();
        self.inventory.release_all(shop_id, &lines).await;

        info!(
            shop_id,
            laybye_id = %laybye.id,
            paid = %laybye.amount_paid(),
            "Lay-bye cancelled"
        );
        laybye.status = LayByeStatus::Cancelled;
        laybye.cancelled_at = Some(now);
        laybye.version += 1;
        Ok(laybye)
    }

    /// Active plans, newest first.
    pub async fn list_active(&self, shop_id: &str) -> LedgerResult<Vec<LayBye>> {
        Ok(self.db.laybyes().list_active(shop_id, self.list_limit).await?)
    }

    /// Resolves an id, a unique id prefix, or a position in the active list.
    pub async fn find(&self, shop_id: &str, reference: &str) -> LedgerResult<LayBye> {
        debug!(shop_id, reference, "Resolving lay-bye");
        match Reference::parse(reference)? {
            Reference::Index(n) => {
                pick_index(self.list_active(shop_id).await?, n, "LayBye", "laybyes")
            }
            Reference::Id(id) => {
                let matches = self.db.laybyes().find_by_prefix(shop_id, id, 2).await?;
                pick_unique(matches, |l| l.id.as_str(), id, "LayBye", "laybyes")
            }
        }
    }

    async fn reload(&self, shop_id: &str, id: &str) -> LedgerResult<LayBye> {
        self.db
            .laybyes()
            .get(shop_id, id)
            .await?
            .ok_or_else(|| CoreError::not_found("LayBye", id).into())
    }
}

fn not_active(laybye: &LayBye) -> LedgerError {
    CoreError::InvalidTransition {
        entity: "LayBye",
        id: laybye.short_id().to_string(),
        from: laybye.status.to_string(),
        to: "paid".to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tillbook_core::Product;
    use tillbook_db::DbConfig;

    const SHOP: &str = "shop";

    async fn setup() -> (LayByeTracker, Inventory, Product) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let inventory = Inventory::new(db.clone(), 5);
        let sales = SaleRecorder::new(db.clone(), inventory.clone(), 10);
        let radio = inventory
            .add_product(SHOP, "Radio", Money::from_cents(5_000), Some(3), None, None)
            .await
            .unwrap();
        (
            LayByeTracker::new(db, inventory.clone(), sales, 90, 5, 10),
            inventory,
            radio,
        )
    }

    fn lines(p: &Product, quantity: i64) -> Vec<LineRequest> {
        vec![LineRequest {
            product_id: p.id.clone(),
            product_name: p.name.clone(),
            quantity,
            price_cents: p.price_cents,
            cost_cents: None,
        }]
    }

    #[tokio::test]
    async fn test_overpayment_rejected_balance_unchanged() {
        let (tracker, inventory, radio) = setup().await;
        let plan = tracker.create(SHOP, None, &lines(&radio, 2)).await.unwrap();
        assert_eq!(plan.balance_due_cents, 10_000);
        assert_eq!(inventory.product(SHOP, &radio.id).await.unwrap().stock, 1);

        let after = tracker
            .add_installment(SHOP, &plan.id, Money::from_cents(4_000), PaymentMethod::Cash)
            .await
            .unwrap();
        assert_eq!(after.balance_due_cents, 6_000);

        let err = tracker
            .add_installment(SHOP, &plan.id, Money::from_cents(6_100), PaymentMethod::Cash)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Business(CoreError::Overpayment { .. })));

        let current = tracker.find(SHOP, &plan.id).await.unwrap();
        assert_eq!(current.balance_due_cents, 6_000);
        assert_eq!(current.installments.len(), 1);
    }

    #[tokio::test]
    async fn test_final_installment_completes_and_records_sale() {
        let (tracker, inventory, radio) = setup().await;
        let plan = tracker.create(SHOP, None, &lines(&radio, 1)).await.unwrap();

        tracker
            .add_installment(SHOP, "1", Money::from_cents(2_000), PaymentMethod::MobileMoney)
            .await
            .unwrap();
        let done = tracker
            .add_installment(SHOP, &plan.id, Money::from_cents(3_000), PaymentMethod::Cash)
            .await
            .unwrap();

        assert_eq!(done.status, LayByeStatus::Completed);
        assert!(done.completed_at.is_some());

        let sale = tracker.sales.recent_sales(SHOP, 5).await.unwrap().remove(0);
        assert_eq!(sale.payment_type, PaymentType::LayBye);
        assert_eq!(sale.total_cents, 5_000);
        assert_eq!(sale.source_ref.as_deref(), Some(plan.id.as_str()));
        // Stock was taken at creation, not again at completion
        assert_eq!(inventory.product(SHOP, &radio.id).await.unwrap().stock, 2);

        assert!(tracker
            .add_installment(SHOP, &plan.id, Money::from_cents(1), PaymentMethod::Cash)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_cancel_releases_stock_once() {
        let (tracker, inventory, radio) = setup().await;
        let plan = tracker.create(SHOP, None, &lines(&radio, 3)).await.unwrap();
        assert_eq!(inventory.product(SHOP, &radio.id).await.unwrap().stock, 0);

        let cancelled = tracker.cancel(SHOP, &plan.id).await.unwrap();
        assert_eq!(cancelled.status, LayByeStatus::Cancelled);
        assert_eq!(inventory.product(SHOP, &radio.id).await.unwrap().stock, 3);

        let err = tracker.cancel(SHOP, &plan.id).await.unwrap_err();
        assert!(matches!(err, LedgerError::Business(CoreError::AlreadyCancelled { .. })));
        assert_eq!(inventory.product(SHOP, &radio.id).await.unwrap().stock, 3);
        assert!(tracker.list_active(SHOP).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_without_stock_fails_cleanly() {
        let (tracker, inventory, radio) = setup().await;
        let err = tracker.create(SHOP, None, &lines(&radio, 4)).await.unwrap_err();
        assert!(matches!(err, LedgerError::Business(CoreError::InsufficientStock { .. })));
        assert_eq!(inventory.product(SHOP, &radio.id).await.unwrap().stock, 3);
    }
}
