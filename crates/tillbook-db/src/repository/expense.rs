//! # Expense Repository
//!
//! Expenses are insert-only.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use tillbook_core::Expense;

const SELECT_EXPENSE: &str = r#"
    SELECT id, shop_id, amount_cents, description, category, payment_method, date, receipt_number
    FROM expenses
"#;

#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    pool: SqlitePool,
}

impl ExpenseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ExpenseRepository { pool }
    }

    pub async fn insert(&self, expense: &Expense) -> DbResult<()> {
        debug!(
            id = %expense.id,
            category = %expense.category,
            amount_cents = expense.amount_cents,
            "Inserting expense"
        );

        sqlx::query(
            r#"
            INSERT INTO expenses (
                id, shop_id, amount_cents, description, category, payment_method,
                date, receipt_number
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&expense.id)
        .bind(&expense.shop_id)
        .bind(expense.amount_cents)
        .bind(&expense.description)
        .bind(expense.category)
        .bind(expense.payment_method)
        .bind(expense.date)
        .bind(&expense.receipt_number)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Expenses dated in `[start, end)`, oldest first.
    pub async fn in_window(
        &self,
        shop_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<Vec<Expense>> {
        let expenses = sqlx::query_as::<_, Expense>(&format!(
            "{SELECT_EXPENSE} WHERE shop_id = ?1 AND date >= ?2 AND date < ?3 ORDER BY date"
        ))
        .bind(shop_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(expenses)
    }

    /// Latest expenses, newest first.
    pub async fn recent(&self, shop_id: &str, limit: i64) -> DbResult<Vec<Expense>> {
        let expenses = sqlx::query_as::<_, Expense>(&format!(
            "{SELECT_EXPENSE} WHERE shop_id = ?1 ORDER BY date DESC, rowid DESC LIMIT ?2"
        ))
        .bind(shop_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(expenses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::Duration;
    use tillbook_core::{new_id, ExpenseCategory, PaymentMethod};

    fn expense(cents: i64, date: DateTime<Utc>) -> Expense {
        Expense {
            id: new_id(),
            shop_id: "shop".to_string(),
            amount_cents: cents,
            description: "electricity".to_string(),
            category: ExpenseCategory::Utilities,
            payment_method: PaymentMethod::BankTransfer,
            date,
            receipt_number: Some("R-17".to_string()),
        }
    }

    #[tokio::test]
    async fn test_insert_and_query_window() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.expenses();
        let now = Utc::now();

        repo.insert(&expense(500, now)).await.unwrap();
        repo.insert(&expense(900, now - Duration::days(10))).await.unwrap();

        let window = repo
            .in_window("shop", now - Duration::days(1), now + Duration::seconds(1))
            .await
            .unwrap();
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].category, ExpenseCategory::Utilities);
        assert_eq!(window[0].payment_method, PaymentMethod::BankTransfer);

        let recent = repo.recent("shop", 5).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].amount_cents, 500);
        assert!(repo.recent("other", 5).await.unwrap().is_empty());
    }
}
