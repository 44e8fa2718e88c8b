//! # Order Repository
//!
//! Orders, their lines, and status-conditioned transitions.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use crate::repository::{insert_lines, like_prefix, load_lines, LineTable};
use tillbook_core::{Order, OrderStatus};

const SELECT_ORDER: &str = r#"
    SELECT id, shop_id, customer_id, total_cents, status, order_type, created_at,
           confirmed_at, ready_at, completed_at, cancelled_at, sale_id
    FROM orders
"#;

/// Column stamped when an order enters `status`.
fn timestamp_column(status: OrderStatus) -> Option<&'static str> {
    match status {
        OrderStatus::Pending => None,
        OrderStatus::Confirmed => Some("confirmed_at"),
        OrderStatus::Ready => Some("ready_at"),
        OrderStatus::Completed => Some("completed_at"),
        OrderStatus::Cancelled => Some("cancelled_at"),
    }
}

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Inserts an order and its lines atomically.
    pub async fn insert(&self, order: &Order) -> DbResult<()> {
        debug!(id = %order.id, items = order.items.len(), "Inserting order");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, shop_id, customer_id, total_cents, status, order_type, created_at,
                confirmed_at, ready_at, completed_at, cancelled_at, sale_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&order.id)
        .bind(&order.shop_id)
        .bind(&order.customer_id)
        .bind(order.total_cents)
        .bind(order.status)
        .bind(order.order_type)
        .bind(order.created_at)
        .bind(order.confirmed_at)
        .bind(order.ready_at)
        .bind(order.completed_at)
        .bind(order.cancelled_at)
        .bind(&order.sale_id)
        .execute(&mut *tx)
        .await?;

        insert_lines(&mut tx, LineTable::Order, &order.items).await?;
        tx.commit().await?;

        Ok(())
    }

    pub async fn get(&self, shop_id: &str, id: &str) -> DbResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "{SELECT_ORDER} WHERE id = ?1 AND shop_id = ?2"
        ))
        .bind(id)
        .bind(shop_id)
        .fetch_optional(&self.pool)
        .await?;

        match order {
            Some(order) => Ok(self.with_items(vec![order]).await?.pop()),
            None => Ok(None),
        }
    }

    pub async fn find_by_prefix(
        &self,
        shop_id: &str,
        prefix: &str,
        limit: i64,
    ) -> DbResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "{SELECT_ORDER} WHERE shop_id = ?1 AND id LIKE ?2 ESCAPE '\\'
             ORDER BY created_at DESC LIMIT ?3"
        ))
        .bind(shop_id)
        .bind(like_prefix(prefix))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        self.with_items(orders).await
    }

    /// Orders not yet completed or cancelled, newest first.
    pub async fn list_open(&self, shop_id: &str, limit: i64) -> DbResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "{SELECT_ORDER} WHERE shop_id = ?1 AND status NOT IN ('completed', 'cancelled')
             ORDER BY created_at DESC, rowid DESC LIMIT ?2"
        ))
        .bind(shop_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        self.with_items(orders).await
    }

    /// Moves an order from `from` to `to`, stamping the matching timestamp.
    ///
    /// The update is conditioned on the current status, so two racing
    /// transitions out of the same state cannot both succeed.
    ///
    /// ## Returns
    /// * `Ok(true)` - transition applied
    /// * `Ok(false)` - the order was no longer in `from`
    pub async fn transition(
        &self,
        shop_id: &str,
        id: &str,
        from: OrderStatus,
        to: OrderStatus,
        at: DateTime<Utc>,
        sale_id: Option<&str>,
    ) -> DbResult<bool> {
        debug!(id = %id, from = %from, to = %to, "Order transition");

        let stamp = match timestamp_column(to) {
            Some(column) => format!(", {column} = ?5"),
            None => String::new(),
        };
        let sql = format!(
            "UPDATE orders SET status = ?3, sale_id = COALESCE(?6, sale_id){stamp}
             WHERE id = ?1 AND shop_id = ?2 AND status = ?4"
        );

        let result = sqlx::query(&sql)
            .bind(id)
            .bind(shop_id)
            .bind(to)
            .bind(from)
            .bind(at)
            .bind(sale_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn with_items(&self, mut orders: Vec<Order>) -> DbResult<Vec<Order>> {
        let ids: Vec<String> = orders.iter().map(|o| o.id.clone()).collect();
        let mut lines = load_lines(&self.pool, LineTable::Order, &ids).await?;
        for order in &mut orders {
            order.items = lines.remove(&order.id).unwrap_or_default();
        }
        Ok(orders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use tillbook_core::{new_id, LineItem, LineRequest, OrderType, Product};

    async fn order_fixture(db: &Database) -> Order {
        let now = Utc::now();
        let product = Product {
            id: new_id(),
            shop_id: "shop".to_string(),
            name: "Cake".to_string(),
            price_cents: 1200,
            cost_cents: None,
            stock: 2,
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
            price_cents: 1200,
            cost_cents: None,
        };
        Order {
            items: vec![LineItem::from_request(new_id(), &id, &line)],
            id,
            shop_id: "shop".to_string(),
            customer_id: None,
            total_cents: 1200,
            status: OrderStatus::Pending,
            order_type: OrderType::Delivery,
            created_at: now,
            confirmed_at: None,
            ready_at: None,
            completed_at: None,
            cancelled_at: None,
            sale_id: None,
        }
    }

    #[tokio::test]
    async fn test_transition_is_status_conditioned() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let order = order_fixture(&db).await;
        db.orders().insert(&order).await.unwrap();
        let repo = db.orders();
        let now = Utc::now();

        assert!(repo
            .transition("shop", &order.id, OrderStatus::Pending, OrderStatus::Confirmed, now, None)
            .await
            .unwrap());
        // Second caller still thinks it is pending
        assert!(!repo
            .transition("shop", &order.id, OrderStatus::Pending, OrderStatus::Cancelled, now, None)
            .await
            .unwrap());

        let loaded = repo.get("shop", &order.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, OrderStatus::Confirmed);
        assert!(loaded.confirmed_at.is_some());
        assert!(loaded.cancelled_at.is_none());
        assert_eq!(loaded.order_type, OrderType::Delivery);
        assert_eq!(loaded.items.len(), 1);
    }

    #[tokio::test]
    async fn test_list_open_skips_terminal() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let order = order_fixture(&db).await;
        db.orders().insert(&order).await.unwrap();
        assert_eq!(db.orders().list_open("shop", 10).await.unwrap().len(), 1);

        db.orders()
            .transition(
                "shop",
                &order.id,
                OrderStatus::Pending,
                OrderStatus::Cancelled,
                Utc::now(),
                None,
            )
            .await
            .unwrap();
        assert!(db.orders().list_open("shop", 10).await.unwrap().is_empty());
        assert_eq!(
            db.orders().find_by_prefix("shop", &order.id[..4], 2).await.unwrap().len(),
            1
        );
    }
}
