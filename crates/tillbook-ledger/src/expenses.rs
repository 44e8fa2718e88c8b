//! Expense recording.

use chrono::Utc;
use tracing::info;

use tillbook_core::report::ReportWindow;
use tillbook_core::validation::{validate_amount, validate_description};
use tillbook_core::{new_id, Expense, ExpenseCategory, Money, PaymentMethod, ValidationError};
use tillbook_db::Database;

use crate::error::LedgerResult;

const MAX_RECEIPT_LEN: usize = 50;

#[derive(Debug, Clone)]
pub struct ExpenseRecorder {
    db: Database,
    list_limit: i64,
}

impl ExpenseRecorder {
    pub fn new(db: Database, list_limit: i64) -> Self {
        ExpenseRecorder { db, list_limit }
    }

    pub async fn record(
        &self,
        shop_id: &str,
        amount: Money,
        description: &str,
        category: ExpenseCategory,
        payment_method: PaymentMethod,
        receipt_number: Option<&str>,
    ) -> LedgerResult<Expense> {
        validate_amount("amount", amount)?;
        validate_description(description)?;
        let receipt_number = receipt_number.map(str::trim).filter(|r| !r.is_empty());
        if receipt_number.is_some_and(|r| r.chars().count() > MAX_RECEIPT_LEN) {
            return Err(ValidationError::TooLong {
                field: "receipt".to_string(),
                max: MAX_RECEIPT_LEN,
            }
            .into());
        }

        let expense = Expense {
            id: new_id(),
            shop_id: shop_id.to_string(),
            amount_cents: amount.cents(),
            description: description.trim().to_string(),
            category,
            payment_method,
            date: Utc::now(),
            receipt_number: receipt_number.map(str::to_string),
        };
        self.db.expenses().insert(&expense).await?;

        info!(shop_id, category = %category, amount = %amount, "Expense recorded");
        Ok(expense)
    }

    /// Expenses dated inside `window`, oldest first.
    pub async fn list(&self, shop_id: &str, window: &ReportWindow) -> LedgerResult<Vec<Expense>> {
        Ok(self
            .db
            .expenses()
            .in_window(shop_id, window.start, window.end)
            .await?)
    }

    pub async fn recent(&self, shop_id: &str) -> LedgerResult<Vec<Expense>> {
        Ok(self.db.expenses().recent(shop_id, self.list_limit).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use tillbook_core::CoreError;
    use tillbook_db::DbConfig;

    #[tokio::test]
    async fn test_record_and_list() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let expenses = ExpenseRecorder::new(db, 10);

        let rent = expenses
            .record(
                "shop",
                Money::from_cents(50_000),
                "October rent",
                ExpenseCategory::Rent,
                PaymentMethod::BankTransfer,
                Some("R-1001"),
            )
            .await
            .unwrap();

        let today = ReportWindow::today(Utc::now());
        let listed = expenses.list("shop", &today).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, rent.id);
        assert_eq!(expenses.recent("shop").await.unwrap().len(), 1);
        assert!(expenses.list("other", &today).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_zero_amount_and_blank_description() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let expenses = ExpenseRecorder::new(db, 10);

        let zero = expenses
            .record("shop", Money::zero(), "x", ExpenseCategory::Other, PaymentMethod::Cash, None)
            .await
            .unwrap_err();
        assert!(matches!(zero, LedgerError::Business(CoreError::Validation(_))));

        assert!(expenses
            .record(
                "shop",
                Money::from_cents(100),
                "  ",
                ExpenseCategory::Other,
                PaymentMethod::Cash,
                None,
            )
            .await
            .is_err());
    }
}
