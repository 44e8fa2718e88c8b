//! # Sale Repository
//!
//! Sales and their frozen line items.
//!
//! A sale row is written together with its lines in one transaction.
//! Lines are never updated afterwards; cancelling only flips the
//! `is_cancelled` flag, and only once.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use crate::repository::{insert_lines, like_prefix, load_lines, LineTable};
use tillbook_core::Sale;

const SELECT_SALE: &str = r#"
    SELECT id, shop_id, payment_type, total_cents, customer_id, source_ref, date,
           is_cancelled, cancelled_at, cancellation_reason
    FROM sales
"#;

/// Writes the sale row and its lines on the caller's connection.
///
/// Used by [`SaleRepository::insert`] and by lay-bye completion, which
/// must record its sale inside the installment transaction.
pub(crate) async fn insert_sale_rows(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sales (
            id, shop_id, payment_type, total_cents, customer_id, source_ref, date,
            is_cancelled, cancelled_at, cancellation_reason
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&sale.id)
    .bind(&sale.shop_id)
    .bind(sale.payment_type)
    .bind(sale.total_cents)
    .bind(&sale.customer_id)
    .bind(&sale.source_ref)
    .bind(sale.date)
    .bind(sale.is_cancelled)
    .bind(sale.cancelled_at)
    .bind(&sale.cancellation_reason)
    .execute(&mut *conn)
    .await?;

    insert_lines(conn, LineTable::Sale, &sale.items).await
}

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Inserts a sale and its lines atomically.
    pub async fn insert(&self, sale: &Sale) -> DbResult<()> {
        debug!(
            id = %sale.id,
            payment_type = %sale.payment_type,
            total_cents = sale.total_cents,
            items = sale.items.len(),
            "Inserting sale"
        );

        let mut tx = self.pool.begin().await?;
        insert_sale_rows(&mut tx, sale).await?;
        tx.commit().await?;

        Ok(())
    }

    /// Gets a sale with its lines.
    pub async fn get(&self, shop_id: &str, id: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(&format!(
            "{SELECT_SALE} WHERE id = ?1 AND shop_id = ?2"
        ))
        .bind(id)
        .bind(shop_id)
        .fetch_optional(&self.pool)
        .await?;

        match sale {
            Some(sale) => Ok(self.with_items(vec![sale]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Sales whose id starts with `prefix`, newest first. At most `limit`.
    pub async fn find_by_prefix(
        &self,
        shop_id: &str,
        prefix: &str,
        limit: i64,
    ) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(&format!(
            "{SELECT_SALE} WHERE shop_id = ?1 AND id LIKE ?2 ESCAPE '\\'
             ORDER BY date DESC LIMIT ?3"
        ))
        .bind(shop_id)
        .bind(like_prefix(prefix))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        self.with_items(sales).await
    }

    /// Most recent non-cancelled sales with lines, newest first.
    pub async fn recent(&self, shop_id: &str, limit: i64) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(&format!(
            "{SELECT_SALE} WHERE shop_id = ?1 AND is_cancelled = 0
             ORDER BY date DESC, rowid DESC LIMIT ?2"
        ))
        .bind(shop_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        self.with_items(sales).await
    }

    /// Flags a sale cancelled.
    ///
    /// ## Returns
    /// * `Ok(true)` - this call cancelled it
    /// * `Ok(false)` - it was already cancelled (or does not exist)
    pub async fn mark_cancelled(
        &self,
        shop_id: &str,
        id: &str,
        reason: Option<&str>,
        at: DateTime<Utc>,
    ) -> DbResult<bool> {
        debug!(id = %id, "Cancelling sale");

        let result = sqlx::query(
            r#"
            UPDATE sales SET
                is_cancelled = 1,
                cancelled_at = ?3,
                cancellation_reason = ?4
            WHERE id = ?1 AND shop_id = ?2 AND is_cancelled = 0
            "#,
        )
        .bind(id)
        .bind(shop_id)
        .bind(at)
        .bind(reason)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// All sales dated in `[start, end)`, cancelled or not, with lines.
    pub async fn in_window(
        &self,
        shop_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(&format!(
            "{SELECT_SALE} WHERE shop_id = ?1 AND date >= ?2 AND date < ?3 ORDER BY date"
        ))
        .bind(shop_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        self.with_items(sales).await
    }

    /// Sales whose cancellation falls in `[start, end)`, whenever they were made.
    pub async fn cancelled_in_window(
        &self,
        shop_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(&format!(
            "{SELECT_SALE} WHERE shop_id = ?1 AND is_cancelled = 1
               AND cancelled_at >= ?2 AND cancelled_at < ?3
             ORDER BY cancelled_at"
        ))
        .bind(shop_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        self.with_items(sales).await
    }

    async fn with_items(&self, mut sales: Vec<Sale>) -> DbResult<Vec<Sale>> {
        let ids: Vec<String> = sales.iter().map(|s| s.id.clone()).collect();
        let mut lines = load_lines(&self.pool, LineTable::Sale, &ids).await?;
        for sale in &mut sales {
            sale.items = lines.remove(&sale.id).unwrap_or_default();
        }
        Ok(sales)
    }
}
