//! # Order Book
//!
//! Orders are placed without touching stock. Stock is only reserved when
//! the order is completed, through an ordinary cash sale.
//!
//! ```text
//!   pending ──► confirmed ──► ready ──► completed
//!      │            │           │
//!      └────────────┴───────────┴─────► cancelled
//! ```

use chrono::Utc;
use tracing::{debug, info, warn};

use tillbook_core::{
    new_id, CoreError, LineItem, LineRequest, Order, OrderStatus, OrderType, PaymentType,
};
use tillbook_db::Database;

use crate::error::LedgerResult;
use crate::reference::{pick_index, pick_unique, Reference};
use crate::sales::{validate_lines, SaleRecorder};

/// Customer orders and their lifecycle.
#[derive(Debug, Clone)]
pub struct OrderBook {
    db: Database,
    sales: SaleRecorder,
    list_limit: i64,
}

impl OrderBook {
    pub fn new(db: Database, sales: SaleRecorder, list_limit: i64) -> Self {
        OrderBook {
            db,
            sales,
            list_limit,
        }
    }

    /// Places a `pending` order.
    pub async fn place(
        &self,
        shop_id: &str,
        customer_id: Option<&str>,
        lines: &[LineRequest],
        order_type: OrderType,
    ) -> LedgerResult<Order> {
        let total = validate_lines(lines)?;

        let id = new_id();
        let items: Vec<LineItem> = lines
            .iter()
            .map(|line| LineItem::from_request(new_id(), &id, line))
            .collect();
        let order = Order {
            total_cents: total.cents(),
            id,
            shop_id: shop_id.to_string(),
            customer_id: customer_id.map(str::to_string),
            status: OrderStatus::Pending,
            order_type,
            created_at: Utc::now(),
            confirmed_at: None,
            ready_at: None,
            completed_at: None,
            cancelled_at: None,
            sale_id: None,
            items,
        };

        self.db.orders().insert(&order).await?;
        info!(shop_id, order_id = %order.id, total = %order.total(), "Order placed");
        Ok(order)
    }

    /// Orders that are neither completed nor cancelled, newest first.
    pub async fn list_open(&self, shop_id: &str) -> LedgerResult<Vec<Order>> {
        Ok(self.db.orders().list_open(shop_id, self.list_limit).await?)
    }

    /// Resolves an id, a unique id prefix, or a position in the open list.
    pub async fn find(&self, shop_id: &str, reference: &str) -> LedgerResult<Order> {
        match Reference::parse(reference)? {
            Reference::Index(n) => pick_index(self.list_open(shop_id).await?, n, "Order", "orders"),
            Reference::Id(id) => {
                let matches = self.db.orders().find_by_prefix(shop_id, id, 2).await?;
                pick_unique(matches, |o| o.id.as_str(), id, "Order", "orders")
            }
        }
    }

    /// Moves an order to `to`.
    ///
    /// Completing records a cash sale for the order's lines first. If the
    /// order has moved on in the meantime that sale is cancelled again.
    pub async fn transition(
        &self,
        shop_id: &str,
        reference: &str,
        to: OrderStatus,
    ) -> LedgerResult<Order> {
        let order = self.find(shop_id, reference).await?;
        let from = order.status;
        debug!(order_id = %order.id, from = %from, to = %to, "Order transition requested");

        if !from.can_transition_to(to) {
            return Err(invalid_transition(&order, from, to));
        }

        let now = Utc::now();
        let sale_id = if to == OrderStatus::Completed {
            let lines: Vec<LineRequest> = order.items.iter().map(LineItem::to_request).collect();
            let sale = self
                .sales
                .record_sale(
                    shop_id,
                    &lines,
                    PaymentType::Cash,
                    order.customer_id.as_deref(),
                    Some(&order.id),
                )
                .await?;
            Some(sale.id)
        } else {
            None
        };

        let applied = self
            .db
            .orders()
            .transition(shop_id, &order.id, from, to, now, sale_id.as_deref())
            .await;

        match applied {
            Ok(true) => {}
            outcome => {
                if let Some(sale_id) = sale_id.as_deref() {
                    warn!(order_id = %order.id, sale_id, "Order moved on, cancelling its sale");
                    if let Err(err) = self
                        .sales
                        .cancel_sale(shop_id, sale_id, Some("order completion failed"))
                        .await
                    {
                        warn!(sale_id, error = %err, "Compensating cancel failed");
                    }
                }
                outcome?;
                let current = self
                    .db
                    .orders()
                    .get(shop_id, &order.id)
                    .await?
                    .map(|o| o.status)
                    .unwrap_or(from);
                return Err(invalid_transition(&order, current, to));
            }
        }

        info!(shop_id, order_id = %order.id, from = %from, to = %to, "Order moved");
        let mut moved = order;
        moved.status = to;
        moved.sale_id = sale_id.or(moved.sale_id);
        match to {
            OrderStatus::Confirmed => moved.confirmed_at = Some(now),
            OrderStatus::Ready => moved.ready_at = Some(now),
            OrderStatus::Completed => moved.completed_at = Some(now),
            OrderStatus::Cancelled => moved.cancelled_at = Some(now),
            OrderStatus::Pending => {}
        }
        Ok(moved)
    }
}

fn invalid_transition(
    order: &Order,
    from: OrderStatus,
    to: OrderStatus,
) -> crate::error::LedgerError {
    CoreError::InvalidTransition {
        entity: "Order",
        id: order.short_id().to_string(),
        from: from.to_string(),
        to: to.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use crate::inventory::Inventory;
    use tillbook_core::{Money, Product};
    use tillbook_db::DbConfig;

    const SHOP: &str = "shop";

    async fn setup() -> (OrderBook, Inventory, Product) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let inventory = Inventory::new(db.clone(), 5);
        let sales = SaleRecorder::new(db.clone(), inventory.clone(), 10);
        let milk = inventory
            .add_product(SHOP, "Milk", Money::from_cents(1_500), Some(6), None, None)
            .await
            .unwrap();
        (OrderBook::new(db, sales, 10), inventory, milk)
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
    async fn test_placement_leaves_stock_alone() {
        let (orders, inventory, milk) = setup().await;
        let order = orders.place(SHOP, None, &lines(&milk, 4), OrderType::Pickup).await.unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total_cents, 6_000);
        assert_eq!(inventory.product(SHOP, &milk.id).await.unwrap().stock, 6);
    }

    #[tokio::test]
    async fn test_complete_from_pending_is_rejected() {
        let (orders, _, milk) = setup().await;
        let order = orders.place(SHOP, None, &lines(&milk, 1), OrderType::Pickup).await.unwrap();

        let err = orders
            .transition(SHOP, &order.id, OrderStatus::Completed)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Business(CoreError::InvalidTransition { .. })));
        assert_eq!(orders.find(SHOP, &order.id).await.unwrap().status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_full_lifecycle_records_sale() {
        let (orders, inventory, milk) = setup().await;
        let order = orders.place(SHOP, None, &lines(&milk, 2), OrderType::Delivery).await.unwrap();

        orders.transition(SHOP, "1", OrderStatus::Confirmed).await.unwrap();
        orders.transition(SHOP, &order.id, OrderStatus::Ready).await.unwrap();
        let done = orders
            .transition(SHOP, &order.id, OrderStatus::Completed)
            .await
            .unwrap();

        assert_eq!(done.status, OrderStatus::Completed);
        assert!(done.completed_at.is_some());
        let sale_id = done.sale_id.expect("completed order links its sale");
        let sale = orders.sales.find_by_id_or_index(SHOP, &sale_id).await.unwrap();
        assert_eq!(sale.source_ref.as_deref(), Some(order.id.as_str()));
        assert_eq!(inventory.product(SHOP, &milk.id).await.unwrap().stock, 4);

        assert!(orders.list_open(SHOP).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_completion_without_stock_keeps_order_ready() {
        let (orders, inventory, milk) = setup().await;
        let order = orders.place(SHOP, None, &lines(&milk, 10), OrderType::Pickup).await.unwrap();
        orders.transition(SHOP, &order.id, OrderStatus::Confirmed).await.unwrap();
        orders.transition(SHOP, &order.id, OrderStatus::Ready).await.unwrap();

        let err = orders
            .transition(SHOP, &order.id, OrderStatus::Completed)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Business(CoreError::InsufficientStock { .. })));
        assert_eq!(orders.find(SHOP, &order.id).await.unwrap().status, OrderStatus::Ready);
        assert_eq!(inventory.product(SHOP, &milk.id).await.unwrap().stock, 6);
    }

    #[tokio::test]
    async fn test_cancelled_is_terminal() {
        let (orders, _, milk) = setup().await;
        let order = orders.place(SHOP, None, &lines(&milk, 1), OrderType::Pickup).await.unwrap();
        orders.transition(SHOP, &order.id, OrderStatus::Cancelled).await.unwrap();

        assert!(orders
            .transition(SHOP, &order.id, OrderStatus::Confirmed)
            .await
            .is_err());
    }
}
