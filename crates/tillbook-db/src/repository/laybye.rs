//! # Lay-bye Repository
//!
//! Lay-bye plans, their reserved lines and the installment log.
//!
//! An installment is written in one transaction with the plan's new
//! paid/due figures. When that installment settles the plan, the
//! completing sale is inserted in the same transaction, so a plan is never
//! marked completed without its sale.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::debug;

use crate::error::DbResult;
use crate::repository::sale::insert_sale_rows;
use crate::repository::{insert_lines, like_prefix, load_lines, LineTable};
use tillbook_core::{Installment, LayBye, Sale};

const SELECT_LAYBYE: &str = r#"
    SELECT id, shop_id, customer_id, total_amount_cents, amount_paid_cents,
           balance_due_cents, status, due_date, created_at, completed_at,
           cancelled_at, version
    FROM laybyes
"#;

const SELECT_INSTALLMENT: &str = r#"
    SELECT id, laybye_id, shop_id, amount_cents, method, date
    FROM laybye_installments
"#;

/// Repository for lay-bye database operations.
#[derive(Debug, Clone)]
pub struct LayByeRepository {
    pool: SqlitePool,
}

impl LayByeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        LayByeRepository { pool }
    }

    /// Inserts a plan and its lines atomically.
    pub async fn insert(&self, laybye: &LayBye) -> DbResult<()> {
        debug!(id = %laybye.id, total_cents = laybye.total_amount_cents, "Inserting lay-bye");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO laybyes (
                id, shop_id, customer_id, total_amount_cents, amount_paid_cents,
                balance_due_cents, status, due_date, created_at, completed_at,
                cancelled_at, version
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&laybye.id)
        .bind(&laybye.shop_id)
        .bind(&laybye.customer_id)
        .bind(laybye.total_amount_cents)
        .bind(laybye.amount_paid_cents)
        .bind(laybye.balance_due_cents)
        .bind(laybye.status)
        .bind(laybye.due_date)
        .bind(laybye.created_at)
        .bind(laybye.completed_at)
        .bind(laybye.cancelled_at)
        .bind(laybye.version)
        .execute(&mut *tx)
        .await?;

        insert_lines(&mut tx, LineTable::LayBye, &laybye.items).await?;
        tx.commit().await?;

        Ok(())
    }

    /// Gets a plan with lines and installments.
    pub async fn get(&self, shop_id: &str, id: &str) -> DbResult<Option<LayBye>> {
        let laybye = sqlx::query_as::<_, LayBye>(&format!(
            "{SELECT_LAYBYE} WHERE id = ?1 AND shop_id = ?2"
        ))
        .bind(id)
        .bind(shop_id)
        .fetch_optional(&self.pool)
        .await?;

        match laybye {
            Some(laybye) => Ok(self.hydrate(vec![laybye]).await?.pop()),
            None => Ok(None),
        }
    }

    pub async fn find_by_prefix(
        &self,
        shop_id: &str,
        prefix: &str,
        limit: i64,
    ) -> DbResult<Vec<LayBye>> {
        let laybyes = sqlx::query_as::<_, LayBye>(&format!(
            "{SELECT_LAYBYE} WHERE shop_id = ?1 AND id LIKE ?2 ESCAPE '\\'
             ORDER BY created_at DESC LIMIT ?3"
        ))
        .bind(shop_id)
        .bind(like_prefix(prefix))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        self.hydrate(laybyes).await
    }

    /// Active plans, newest first.
    pub async fn list_active(&self, shop_id: &str, limit: i64) -> DbResult<Vec<LayBye>> {
        let laybyes = sqlx::query_as::<_, LayBye>(&format!(
            "{SELECT_LAYBYE} WHERE shop_id = ?1 AND status = 'active'
             ORDER BY created_at DESC, rowid DESC LIMIT ?2"
        ))
        .bind(shop_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        self.hydrate(laybyes).await
    }

    /// Appends an installment and writes `updated`'s paid/due/status,
    /// provided the plan is still active at `expected_version`.
    ///
    /// `completion_sale` is inserted in the same transaction when given.
    ///
    /// ## Returns
    /// * `Ok(true)` - committed
    /// * `Ok(false)` - the plan changed since it was read; nothing written
    pub async fn record_installment(
        &self,
        updated: &LayBye,
        installment: &Installment,
        expected_version: i64,
        completion_sale: Option<&Sale>,
    ) -> DbResult<bool> {
        debug!(
            id = %updated.id,
            amount_cents = installment.amount_cents,
            balance_due_cents = updated.balance_due_cents,
            "Recording lay-bye installment"
        );

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE laybyes SET
                amount_paid_cents = ?3,
                balance_due_cents = ?4,
                status = ?5,
                completed_at = ?6,
                version = version + 1
            WHERE id = ?1 AND shop_id = ?2 AND version = ?7 AND status = 'active'
            "#,
        )
        .bind(&updated.id)
        .bind(&updated.shop_id)
        .bind(updated.amount_paid_cents)
        .bind(updated.balance_due_cents)
        .bind(updated.status)
        .bind(updated.completed_at)
        .bind(expected_version)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO laybye_installments (id, laybye_id, shop_id, amount_cents, method, date)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&installment.id)
        .bind(&installment.laybye_id)
        .bind(&installment.shop_id)
        .bind(installment.amount_cents)
        .bind(installment.method)
        .bind(installment.date)
        .execute(&mut *tx)
        .await?;

        if let Some(sale) = completion_sale {
            insert_sale_rows(&mut tx, sale).await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    /// Moves an active plan to cancelled.
    ///
    /// ## Returns
    /// * `Ok(false)` - the plan was not active
    pub async fn cancel(&self, shop_id: &str, id: &str, at: DateTime<Utc>) -> DbResult<bool> {
        debug!(id = %id, "Cancelling lay-bye");

        let result = sqlx::query(
            r#"
            UPDATE laybyes SET
                status = 'cancelled',
                cancelled_at = ?3,
                version = version + 1
            WHERE id = ?1 AND shop_id = ?2 AND status = 'active'
            "#,
        )
        .bind(id)
        .bind(shop_id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Installments dated in `[start, end)` across all plans.
    pub async fn installments_in_window(
        &self,
        shop_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<Vec<Installment>> {
        let installments = sqlx::query_as::<_, Installment>(&format!(
            "{SELECT_INSTALLMENT} WHERE shop_id = ?1 AND date >= ?2 AND date < ?3 ORDER BY date"
        ))
        .bind(shop_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(installments)
    }

    /// Sum of balances still due on active plans.
    pub async fn outstanding_total(&self, shop_id: &str) -> DbResult<i64> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(balance_due_cents), 0) FROM laybyes
             WHERE shop_id = ?1 AND status = 'active'",
        )
        .bind(shop_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }

    async fn hydrate(&self, mut laybyes: Vec<LayBye>) -> DbResult<Vec<LayBye>> {
        if laybyes.is_empty() {
            return Ok(laybyes);
        }
        let ids: Vec<String> = laybyes.iter().map(|l| l.id.clone()).collect();
        let mut lines = load_lines(&self.pool, LineTable::LayBye, &ids).await?;

        let mut qb = sqlx::QueryBuilder::<sqlx::Sqlite>::new(format!(
            "{SELECT_INSTALLMENT} WHERE laybye_id IN ("
        ));
        let mut separated = qb.separated(", ");
        for id in &ids {
            separated.push_bind(id.clone());
        }
        separated.push_unseparated(") ORDER BY date");
        let installments = qb.build_query_as::<Installment>().fetch_all(&self.pool).await?;

        let mut grouped: HashMap<String, Vec<Installment>> = HashMap::new();
        for installment in installments {
            grouped
                .entry(installment.laybye_id.clone())
                .or_default()
                .push(installment);
        }

        for laybye in &mut laybyes {
            laybye.items = lines.remove(&laybye.id).unwrap_or_default();
            laybye.installments = grouped.remove(&laybye.id).unwrap_or_default();
        }
        Ok(laybyes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::Duration;
    use tillbook_core::{
        new_id, LayByeStatus, LineItem, LineRequest, PaymentMethod, PaymentType, Product,
    };

    async fn fixture(db: &Database) -> LayBye {
        let now = Utc::now();
        let product = Product {
            id: new_id(),
            shop_id: "shop".to_string(),
            name: "Radio".to_string(),
            price_cents: 10_000,
            cost_cents: Some(6_000),
            stock: 1,
            low_stock_threshold: 0,
            track_stock: true,
            active: true,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        db.products().insert(&product).await.unwrap();

        let id = new_id();
        let line = LineRequest {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            quantity: 1,
            price_cents: 10_000,
            cost_cents: Some(6_000),
        };
        let laybye = LayBye {
            items: vec![LineItem::from_request(new_id(), &id, &line)],
            id,
            shop_id: "shop".to_string(),
            customer_id: None,
            total_amount_cents: 10_000,
            amount_paid_cents: 0,
            balance_due_cents: 10_000,
            status: LayByeStatus::Active,
            due_date: now + Duration::days(90),
            created_at: now,
            completed_at: None,
            cancelled_at: None,
            version: 1,
            installments: Vec::new(),
        };
        db.laybyes().insert(&laybye).await.unwrap();
        laybye
    }

    fn installment(laybye: &LayBye, cents: i64) -> Installment {
        Installment {
            id: new_id(),
            laybye_id: laybye.id.clone(),
            shop_id: laybye.shop_id.clone(),
            amount_cents: cents,
            method: PaymentMethod::MobileMoney,
            date: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_installment_updates_balance() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let laybye = fixture(&db).await;
        let repo = db.laybyes();

        let mut updated = laybye.clone();
        updated.amount_paid_cents = 4_000;
        updated.balance_due_cents = 6_000;
        assert!(repo
            .record_installment(&updated, &installment(&laybye, 4_000), 1, None)
            .await
            .unwrap());
        // Stale version
        assert!(!repo
            .record_installment(&updated, &installment(&laybye, 4_000), 1, None)
            .await
            .unwrap());

        let loaded = repo.get("shop", &laybye.id).await.unwrap().unwrap();
        assert_eq!(loaded.balance_due_cents, 6_000);
        assert_eq!(loaded.installments.len(), 1);
        assert_eq!(loaded.installments[0].method, PaymentMethod::MobileMoney);
        assert_eq!(loaded.items.len(), 1);
        assert_eq!(repo.outstanding_total("shop").await.unwrap(), 6_000);
    }

    #[tokio::test]
    async fn test_final_installment_writes_sale_atomically() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let laybye = fixture(&db).await;
        let now = Utc::now();

        let mut updated = laybye.clone();
        updated.amount_paid_cents = 10_000;
        updated.balance_due_cents = 0;
        updated.status = LayByeStatus::Completed;
        updated.completed_at = Some(now);

        let sale_id = new_id();
        let sale = Sale {
            items: laybye
                .items
                .iter()
                .map(|l| LineItem::from_request(new_id(), &sale_id, &l.to_request()))
                .collect(),
            id: sale_id,
            shop_id: "shop".to_string(),
            payment_type: PaymentType::LayBye,
            total_cents: 10_000,
            customer_id: None,
            source_ref: Some(laybye.id.clone()),
            date: now,
            is_cancelled: false,
            cancelled_at: None,
            cancellation_reason: None,
        };

        assert!(db
            .laybyes()
            .record_installment(&updated, &installment(&laybye, 10_000), 1, Some(&sale))
            .await
            .unwrap());

        let stored = db.sales().get("shop", &sale.id).await.unwrap().unwrap();
        assert_eq!(stored.payment_type, PaymentType::LayBye);
        assert_eq!(stored.items.len(), 1);
        assert!(db.laybyes().list_active("shop", 10).await.unwrap().is_empty());
        assert!(!db.laybyes().cancel("shop", &laybye.id, now).await.unwrap());
    }

    #[tokio::test]
    async fn test_cancel_active_once() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let laybye = fixture(&db).await;
        let now = Utc::now();

        assert!(db.laybyes().cancel("shop", &laybye.id, now).await.unwrap());
        assert!(!db.laybyes().cancel("shop", &laybye.id, now).await.unwrap());
        assert_eq!(db.laybyes().outstanding_total("shop").await.unwrap(), 0);
    }
}
