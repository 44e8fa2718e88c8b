//! # Customer Repository
//!
//! Customers and their append-only credit log.
//!
//! ## Credit Log Append
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │    UPDATE customers SET current_balance_cents = <after>,                │
//! │                         version = version + 1                           │
//! │    WHERE id = ? AND version = <entries already in the log>              │
//! │        0 rows → ROLLBACK, caller re-reads and retries                   │
//! │    INSERT INTO credit_transactions (seq = version + 1, ...)             │
//! │        UNIQUE(customer_id, seq) keeps the chain from forking            │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Cancelling a sale made on credit runs the same append with one extra
//! statement in front: the conditional `UPDATE sales SET is_cancelled = 1`.
//! Either both the sale flag and the reversal entry land, or neither does.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use tillbook_core::{CreditEntryType, CreditTransaction, Customer};

const SELECT_CUSTOMER: &str = r#"
    SELECT id, shop_id, name, phone, email, total_spent_cents, total_visits,
           loyalty_points, current_balance_cents, credit_limit_cents,
           last_purchase_at, version, created_at
    FROM customers
"#;

const SELECT_CREDIT: &str = r#"
    SELECT id, shop_id, customer_id, seq, entry_type, amount_cents, items_json,
           description, date, balance_before_cents, balance_after_cents
    FROM credit_transactions
"#;

/// What happened to a credit sale cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReversalOutcome {
    /// Sale flagged and reversal entry appended.
    Reversed,
    /// The customer moved on since it was read; nothing was written.
    StaleCustomer,
    /// Someone else cancelled the sale first; nothing was written.
    SaleAlreadyCancelled,
}

/// Repository for customers and the credit log.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Inserts a new customer.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - phone already registered in this shop
    pub async fn insert(&self, customer: &Customer) -> DbResult<()> {
        debug!(shop_id = %customer.shop_id, name = %customer.name, "Inserting customer");

        sqlx::query(
            r#"
            INSERT INTO customers (
                id, shop_id, name, phone, email, total_spent_cents, total_visits,
                loyalty_points, current_balance_cents, credit_limit_cents,
                last_purchase_at, version, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.shop_id)
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(&customer.email)
        .bind(customer.total_spent_cents)
        .bind(customer.total_visits)
        .bind(customer.loyalty_points)
        .bind(customer.current_balance_cents)
        .bind(customer.credit_limit_cents)
        .bind(customer.last_purchase_at)
        .bind(customer.version)
        .bind(customer.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("phone", &customer.phone),
            other => other,
        })?;

        Ok(())
    }

    pub async fn get(&self, shop_id: &str, id: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(&format!(
            "{SELECT_CUSTOMER} WHERE id = ?1 AND shop_id = ?2"
        ))
        .bind(id)
        .bind(shop_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    pub async fn find_by_phone(&self, shop_id: &str, phone: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(&format!(
            "{SELECT_CUSTOMER} WHERE shop_id = ?1 AND phone = ?2"
        ))
        .bind(shop_id)
        .bind(phone)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Customers whose name matches case-insensitively. Names are not
    /// unique, so this can return several.
    pub async fn find_by_name(&self, shop_id: &str, name: &str) -> DbResult<Vec<Customer>> {
        let customers = sqlx::query_as::<_, Customer>(&format!(
            "{SELECT_CUSTOMER} WHERE shop_id = ?1 AND name = ?2 COLLATE NOCASE ORDER BY created_at"
        ))
        .bind(shop_id)
        .bind(name)
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }

    /// All customers sorted by name.
    pub async fn list(&self, shop_id: &str) -> DbResult<Vec<Customer>> {
        let customers = sqlx::query_as::<_, Customer>(&format!(
            "{SELECT_CUSTOMER} WHERE shop_id = ?1 ORDER BY name COLLATE NOCASE"
        ))
        .bind(shop_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }

    /// Bumps purchase statistics after a sale.
    pub async fn record_purchase(
        &self,
        shop_id: &str,
        id: &str,
        amount_cents: i64,
        points: i64,
        at: DateTime<Utc>,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE customers SET
                total_spent_cents = total_spent_cents + ?3,
                total_visits = total_visits + 1,
                loyalty_points = loyalty_points + ?4,
                last_purchase_at = ?5
            WHERE id = ?1 AND shop_id = ?2
            "#,
        )
        .bind(id)
        .bind(shop_id)
        .bind(amount_cents)
        .bind(points)
        .bind(at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }

        Ok(())
    }

    /// Sets the credit limit. Zero removes it.
    pub async fn set_credit_limit(
        &self,
        shop_id: &str,
        id: &str,
        limit_cents: i64,
    ) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE customers SET credit_limit_cents = ?3 WHERE id = ?1 AND shop_id = ?2",
        )
        .bind(id)
        .bind(shop_id)
        .bind(limit_cents)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }
        Ok(())
    }

    /// Appends a credit log entry and moves the cached balance to
    /// `entry.balance_after_cents`, provided the customer row is still at
    /// `expected_version`.
    ///
    /// ## Returns
    /// * `Ok(true)` - committed
    /// * `Ok(false)` - another append won; nothing was written
    pub async fn append_credit(
        &self,
        entry: &CreditTransaction,
        expected_version: i64,
    ) -> DbResult<bool> {
        debug!(
            customer_id = %entry.customer_id,
            seq = entry.seq,
            entry_type = ?entry.entry_type,
            amount_cents = entry.amount_cents,
            "Appending credit entry"
        );

        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE customers SET
                current_balance_cents = ?3,
                version = version + 1
            WHERE id = ?1 AND shop_id = ?2 AND version = ?4
            "#,
        )
        .bind(&entry.customer_id)
        .bind(&entry.shop_id)
        .bind(entry.balance_after_cents)
        .bind(expected_version)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        insert_entry(&mut tx, entry).await?;
        tx.commit().await?;
        Ok(true)
    }

    /// Flags the sale cancelled and appends the `reversal` entry in one
    /// transaction.
    pub async fn reverse_credit_sale(
        &self,
        entry: &CreditTransaction,
        expected_version: i64,
        sale_id: &str,
        reason: Option<&str>,
        at: DateTime<Utc>,
    ) -> DbResult<ReversalOutcome> {
        debug!(
            customer_id = %entry.customer_id,
            sale_id,
            seq = entry.seq,
            amount_cents = entry.amount_cents,
            "Reversing credit sale"
        );

        let mut tx = self.pool.begin().await?;

        let flagged = sqlx::query(
            r#"
            UPDATE sales SET
                is_cancelled = 1,
                cancelled_at = ?3,
                cancellation_reason = ?4
            WHERE id = ?1 AND shop_id = ?2 AND is_cancelled = 0
            "#,
        )
        .bind(sale_id)
        .bind(&entry.shop_id)
        .bind(at)
        .bind(reason)
        .execute(&mut *tx)
        .await?;

        if flagged.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(ReversalOutcome::SaleAlreadyCancelled);
        }

        let updated = sqlx::query(
            r#"
            UPDATE customers SET
                current_balance_cents = ?3,
                version = version + 1
            WHERE id = ?1 AND shop_id = ?2 AND version = ?4
            "#,
        )
        .bind(&entry.customer_id)
        .bind(&entry.shop_id)
        .bind(entry.balance_after_cents)
        .bind(expected_version)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(ReversalOutcome::StaleCustomer);
        }

        insert_entry(&mut tx, entry).await?;
        tx.commit().await?;
        Ok(ReversalOutcome::Reversed)
    }

    /// The full credit log for one customer in `seq` order.
    pub async fn credit_log(
        &self,
        shop_id: &str,
        customer_id: &str,
    ) -> DbResult<Vec<CreditTransaction>> {
        let entries = sqlx::query_as::<_, CreditTransaction>(&format!(
            "{SELECT_CREDIT} WHERE shop_id = ?1 AND customer_id = ?2 ORDER BY seq"
        ))
        .bind(shop_id)
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Payment entries dated in `[start, end)` across all customers.
    pub async fn payments_in_window(
        &self,
        shop_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<Vec<CreditTransaction>> {
        let entries = sqlx::query_as::<_, CreditTransaction>(&format!(
            "{SELECT_CREDIT} WHERE shop_id = ?1 AND entry_type = ?2
               AND date >= ?3 AND date < ?4
             ORDER BY date"
        ))
        .bind(shop_id)
        .bind(CreditEntryType::Payment)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Sum of all positive cached balances.
    pub async fn outstanding_total(&self, shop_id: &str) -> DbResult<i64> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(current_balance_cents), 0) FROM customers
             WHERE shop_id = ?1 AND current_balance_cents > 0",
        )
        .bind(shop_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }
}

async fn insert_entry(conn: &mut SqliteConnection, entry: &CreditTransaction) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO credit_transactions (
            id, shop_id, customer_id, seq, entry_type, amount_cents, items_json,
            description, date, balance_before_cents, balance_after_cents
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
    )
    .bind(&entry.id)
    .bind(&entry.shop_id)
    .bind(&entry.customer_id)
    .bind(entry.seq)
    .bind(entry.entry_type)
    .bind(entry.amount_cents)
    .bind(&entry.items_json)
    .bind(&entry.description)
    .bind(entry.date)
    .bind(entry.balance_before_cents)
    .bind(entry.balance_after_cents)
    .execute(conn)
    .await?;
    Ok(())
}
