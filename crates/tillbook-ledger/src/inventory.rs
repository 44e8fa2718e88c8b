//! # Inventory Ledger
//!
//! The catalog and its stock levels.
//!
//! ## Reservation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  reserve(bread, 3)                                                      │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  read product ──► untracked? ──► done, nothing to take                  │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  stock < 3? ──► InsufficientStock { requested: 3, available }           │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  try_reserve(version) ──► lost the race? re-read and go again           │
//! │     │                       (at most reserve_max_retries times)         │
//! │     ▼                                                                   │
//! │  stock - 3, version + 1                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Releases are plain increments and never retry.

use chrono::Utc;
use tracing::{debug, info, warn};

use tillbook_core::validation::{
    normalize_name, validate_cost, validate_line_count, validate_line_price,
    validate_non_negative, validate_price, validate_product_name, validate_quantity,
};
use tillbook_core::command::ItemRequest;
use tillbook_core::{new_id, CoreError, LineRequest, Money, Product, ValidationError};
use tillbook_db::{Database, DbError};

use crate::error::{LedgerError, LedgerResult};

/// What `archive` ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveOutcome {
    /// Nothing referenced the product; the row is gone.
    Deleted,
    /// Past lines reference it; it is hidden but kept.
    Archived,
}

/// Stock and catalog operations for every shop.
#[derive(Debug, Clone)]
pub struct Inventory {
    db: Database,
    max_retries: u32,
}

impl Inventory {
    pub fn new(db: Database, max_retries: u32) -> Self {
        Inventory {
            db,
            max_retries: max_retries.max(1),
        }
    }

    /// Active products, the interpreter's lookup source.
    pub async fn catalog(&self, shop_id: &str) -> LedgerResult<Vec<Product>> {
        Ok(self.db.products().list_active(shop_id).await?)
    }

    /// An active product by id.
    pub async fn product(&self, shop_id: &str, id: &str) -> LedgerResult<Product> {
        match self.db.products().get(shop_id, id).await? {
            Some(p) if p.active => Ok(p),
            _ => Err(CoreError::not_found_with_hint("Product", id, "stock").into()),
        }
    }

    /// Active, tracked products at or below their threshold.
    pub async fn low_stock(&self, shop_id: &str) -> LedgerResult<Vec<Product>> {
        Ok(self.db.products().low_stock(shop_id).await?)
    }

    /// Adds a product, or brings an archived one with the same name back.
    pub async fn add_product(
        &self,
        shop_id: &str,
        name: &str,
        price: Money,
        stock: Option<i64>,
        threshold: Option<i64>,
        cost: Option<Money>,
    ) -> LedgerResult<Product> {
        let name = normalize_name(name);
        validate_product_name(&name)?;
        validate_price(price)?;
        if let Some(stock) = stock {
            validate_non_negative("stock", stock)?;
        }
        if let Some(threshold) = threshold {
            validate_non_negative("threshold", threshold)?;
        }
        if let Some(cost) = cost {
            validate_cost(cost)?;
        }

        let products = self.db.products();
        if let Some(mut existing) = products.find_by_name(shop_id, &name).await? {
            if existing.active {
                return Err(ValidationError::Duplicate {
                    field: "product".to_string(),
                    value: existing.name,
                }
                .into());
            }

            debug!(id = %existing.id, "Reactivating archived product");
            existing.name = name;
            existing.price_cents = price.cents();
            existing.stock = stock.unwrap_or(0);
            existing.low_stock_threshold = threshold.unwrap_or(existing.low_stock_threshold);
            existing.cost_cents = cost.map(|c| c.cents()).or(existing.cost_cents);
            existing.active = true;
            if !products.update(&existing).await? {
                return Err(CoreError::ConcurrentModification {
                    entity: "Product",
                    id: existing.id,
                }
                .into());
            }
            info!(shop_id, product = %existing.name, "Product reactivated");
            return self.reload(shop_id, &existing.id).await;
        }

        let now = Utc::now();
        let product = Product {
            id: new_id(),
            shop_id: shop_id.to_string(),
            name,
            price_cents: price.cents(),
            cost_cents: cost.map(|c| c.cents()),
            stock: stock.unwrap_or(0),
            low_stock_threshold: threshold.unwrap_or(0),
            track_stock: true,
            active: true,
            version: 1,
            created_at: now,
            updated_at: now,
        };

        products
            .insert(&product)
            .await
            .map_err(|e| duplicate_name(e, &product.name))?;

        info!(shop_id, product = %product.name, price = %price, "Product added");
        Ok(product)
    }

    /// Takes `quantity` units, retrying lost version races.
    pub async fn reserve(
        &self,
        shop_id: &str,
        product_id: &str,
        quantity: i64,
    ) -> LedgerResult<Product> {
        validate_quantity(quantity)?;
        let products = self.db.products();

        for attempt in 1..=self.max_retries {
            let mut product = self.product(shop_id, product_id).await?;
            if !product.track_stock {
                return Ok(product);
            }
            if product.stock < quantity {
                return Err(CoreError::InsufficientStock {
                    product: product.name,
                    requested: quantity,
                    available: product.stock,
                }
                .into());
            }

            if products
                .try_reserve(shop_id, product_id, quantity, product.version)
                .await?
            {
                product.stock -= quantity;
                product.version += 1;
                debug!(product = %product.name, quantity, stock = product.stock, "Reserved");
                return Ok(product);
            }

            warn!(product_id, attempt, "Stock reservation lost a race, retrying");
        }

        Err(CoreError::ConcurrentModification {
            entity: "Product",
            id: product_id.to_string(),
        }
        .into())
    }

    /// Returns `quantity` units to stock.
    pub async fn release(
        &self,
        shop_id: &str,
        product_id: &str,
        quantity: i64,
    ) -> LedgerResult<()> {
        self.db.products().release(shop_id, product_id, quantity).await?;
        debug!(product_id, quantity, "Released");
        Ok(())
    }

    /// Reserves every line or none of them.
    pub async fn reserve_all(&self, shop_id: &str, lines: &[LineRequest]) -> LedgerResult<()> {
        for (done, line) in lines.iter().enumerate() {
            if let Err(err) = self.reserve(shop_id, &line.product_id, line.quantity).await {
                self.release_all(shop_id, &lines[..done]).await;
                return Err(err);
            }
        }
        Ok(())
    }

    /// Best-effort release of every line. Failures are logged, not returned,
    /// so one bad line cannot strand the others.
    pub async fn release_all(&self, shop_id: &str, lines: &[LineRequest]) {
        for line in lines {
            if let Err(err) = self.release(shop_id, &line.product_id, line.quantity).await {
                warn!(
                    product_id = %line.product_id,
                    quantity = line.quantity,
                    error = %err,
                    "Failed to release reserved stock"
                );
            }
        }
    }

    /// Freezes requested items into priced lines.
    pub async fn price_lines(
        &self,
        shop_id: &str,
        items: &[ItemRequest],
    ) -> LedgerResult<Vec<LineRequest>> {
        validate_line_count(items.len())?;
        let mut lines = Vec::with_capacity(items.len());
        for item in items {
            validate_quantity(item.quantity)?;
            let product = self.product(shop_id, &item.product.id).await?;
            let price = item.price.unwrap_or_else(|| product.price());
            validate_line_price(price)?;
            lines.push(LineRequest {
                product_id: product.id,
                product_name: product.name,
                quantity: item.quantity,
                price_cents: price.cents(),
                cost_cents: product.cost_cents,
            });
        }
        Ok(lines)
    }

    /// Overwrites the stock level.
    pub async fn set_stock(
        &self,
        shop_id: &str,
        product_id: &str,
        stock: i64,
    ) -> LedgerResult<Product> {
        validate_non_negative("stock", stock)?;
        if !self.db.products().set_stock(shop_id, product_id, stock).await? {
            return Err(CoreError::not_found_with_hint("Product", product_id, "stock").into());
        }
        info!(product_id, stock, "Stock set");
        self.reload(shop_id, product_id).await
    }

    /// Adds (positive) or removes (negative) units. Removing more than is
    /// on hand is refused.
    pub async fn adjust_stock(
        &self,
        shop_id: &str,
        product_id: &str,
        delta: i64,
    ) -> LedgerResult<Product> {
        if delta == 0 {
            return Err(ValidationError::MustBePositive {
                field: "quantity".to_string(),
            }
            .into());
        }
        let product = self
            .modify(shop_id, product_id, |p| {
                let next = p.stock + delta;
                if next < 0 {
                    return Err(CoreError::InsufficientStock {
                        product: p.name.clone(),
                        requested: -delta,
                        available: p.stock,
                    });
                }
                p.stock = next;
                Ok(())
            })
            .await?;
        info!(product = %product.name, delta, stock = product.stock, "Stock adjusted");
        Ok(product)
    }

    pub async fn set_price(
        &self,
        shop_id: &str,
        product_id: &str,
        price: Money,
    ) -> LedgerResult<Product> {
        validate_price(price)?;
        self.modify(shop_id, product_id, |p| {
            p.price_cents = price.cents();
            Ok(())
        })
        .await
    }

    pub async fn set_cost(
        &self,
        shop_id: &str,
        product_id: &str,
        cost: Money,
    ) -> LedgerResult<Product> {
        validate_cost(cost)?;
        self.modify(shop_id, product_id, |p| {
            p.cost_cents = Some(cost.cents());
            Ok(())
        })
        .await
    }

    pub async fn set_threshold(
        &self,
        shop_id: &str,
        product_id: &str,
        threshold: i64,
    ) -> LedgerResult<Product> {
        validate_non_negative("threshold", threshold)?;
        self.modify(shop_id, product_id, |p| {
            p.low_stock_threshold = threshold;
            Ok(())
        })
        .await
    }

    /// Renames a product. Names stay unique per shop, archived ones included.
    pub async fn rename(
        &self,
        shop_id: &str,
        product_id: &str,
        name: &str,
    ) -> LedgerResult<Product> {
        let name = normalize_name(name);
        validate_product_name(&name)?;
        if let Some(other) = self.db.products().find_by_name(shop_id, &name).await? {
            if other.id != product_id {
                return Err(ValidationError::Duplicate {
                    field: "product".to_string(),
                    value: other.name,
                }
                .into());
            }
        }
        self.modify(shop_id, product_id, |p| {
            p.name = name.clone();
            Ok(())
        })
        .await
    }

    /// Removes a product from the catalog.
    pub async fn archive(&self, shop_id: &str, product_id: &str) -> LedgerResult<ArchiveOutcome> {
        let product = self.product(shop_id, product_id).await?;
        let products = self.db.products();

        if products.is_referenced(&product.id).await? {
            products.archive(shop_id, &product.id).await?;
            info!(product = %product.name, "Product archived");
            Ok(ArchiveOutcome::Archived)
        } else {
            products.hard_delete(shop_id, &product.id).await?;
            info!(product = %product.name, "Product deleted");
            Ok(ArchiveOutcome::Deleted)
        }
    }

    /// Applies `change` to a fresh copy and writes it back under a version
    /// check, re-reading on conflict.
    async fn modify<F>(
        &self,
        shop_id: &str,
        product_id: &str,
        mut change: F,
    ) -> LedgerResult<Product>
    where
        F: FnMut(&mut Product) -> Result<(), CoreError>,
    {
        let products = self.db.products();
        for attempt in 1..=self.max_retries {
            let mut product = self.product(shop_id, product_id).await?;
            change(&mut product)?;
            let written = products
                .update(&product)
                .await
                .map_err(|e| duplicate_name(e, &product.name))?;
            if written {
                product.version += 1;
                return Ok(product);
            }
            warn!(product_id, attempt, "Product update lost a race, retrying");
        }
        Err(CoreError::ConcurrentModification {
            entity: "Product",
            id: product_id.to_string(),
        }
        .into())
    }

    async fn reload(&self, shop_id: &str, product_id: &str) -> LedgerResult<Product> {
        self.product(shop_id, product_id).await
    }
}

fn duplicate_name(err: DbError, name: &str) -> LedgerError {
    if err.is_unique_violation() {
        ValidationError::Duplicate {
            field: "product".to_string(),
            value: name.to_string(),
        }
        .into()
    } else {
        err.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tillbook_db::DbConfig;

    const SHOP: &str = "shop";

    async fn inventory() -> Inventory {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        Inventory::new(db, 5)
    }

    fn dollars(d: i64) -> Money {
        Money::from_cents(d * 100)
    }

    #[tokio::test]
    async fn test_reserve_more_than_stock_changes_nothing() {
        let inv = inventory().await;
        let p = inv
            .add_product(SHOP, "Bread", Money::from_cents(250), Some(3), None, None)
            .await
            .unwrap();

        let err = inv.reserve(SHOP, &p.id, 5).await.unwrap_err();
        match err {
            LedgerError::Business(CoreError::InsufficientStock { requested, available, .. }) => {
                assert_eq!(requested, 5);
                assert_eq!(available, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(inv.product(SHOP, &p.id).await.unwrap().stock, 3);
    }

    #[tokio::test]
    async fn test_reserve_all_is_all_or_nothing() {
        let inv = inventory().await;
        let bread = inv
            .add_product(SHOP, "Bread", Money::from_cents(250), Some(10), None, None)
            .await
            .unwrap();
        let milk = inv
            .add_product(SHOP, "Milk", Money::from_cents(150), Some(1), None, None)
            .await
            .unwrap();

        let lines = vec![
            LineRequest {
                product_id: bread.id.clone(),
                product_name: bread.name.clone(),
                quantity: 4,
                price_cents: 250,
                cost_cents: None,
            },
            LineRequest {
                product_id: milk.id.clone(),
                product_name: milk.name.clone(),
                quantity: 2,
                price_cents: 150,
                cost_cents: None,
            },
        ];
        assert!(inv.reserve_all(SHOP, &lines).await.is_err());
        assert_eq!(inv.product(SHOP, &bread.id).await.unwrap().stock, 10);
        assert_eq!(inv.product(SHOP, &milk.id).await.unwrap().stock, 1);
    }

    #[tokio::test]
    async fn test_racing_reservations_never_oversell() {
        let inv = inventory().await;
        let p = inv
            .add_product(SHOP, "Bread", Money::from_cents(250), Some(10), None, None)
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let inv = inv.clone();
            let id = p.id.clone();
            handles.push(tokio::spawn(async move { inv.reserve(SHOP, &id, 3).await }));
        }

        let mut taken = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                taken += 3;
            }
        }

        let stock = inv.product(SHOP, &p.id).await.unwrap().stock;
        assert!(stock >= 0);
        assert_eq!(stock, 10 - taken);
    }

    #[tokio::test]
    async fn test_untracked_products_are_never_short() {
        let inv = inventory().await;
        let mut p = inv
            .add_product(SHOP, "Airtime", dollars(10), Some(0), None, None)
            .await
            .unwrap();
        p.track_stock = false;
        assert!(inv.db.products().update(&p).await.unwrap());

        assert!(inv.reserve(SHOP, &p.id, 50).await.is_ok());
        inv.release(SHOP, &p.id, 50).await.unwrap();
        assert_eq!(inv.product(SHOP, &p.id).await.unwrap().stock, 0);
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected_and_archived_name_reactivates() {
        let inv = inventory().await;
        let p = inv
            .add_product(SHOP, "Bread", Money::from_cents(250), Some(5), None, None)
            .await
            .unwrap();

        let err = inv
            .add_product(SHOP, "bread", Money::from_cents(300), None, None, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Business(CoreError::Validation(ValidationError::Duplicate { .. }))
        ));

        assert_eq!(inv.archive(SHOP, &p.id).await.unwrap(), ArchiveOutcome::Deleted);
        let again = inv
            .add_product(SHOP, "Bread", Money::from_cents(300), None, None, None)
            .await
            .unwrap();
        assert_ne!(again.id, p.id);
    }

    #[tokio::test]
    async fn test_adjust_and_edit() {
        let inv = inventory().await;
        let p = inv
            .add_product(SHOP, "Sugar", dollars(39), Some(4), Some(2), None)
            .await
            .unwrap();

        assert_eq!(inv.adjust_stock(SHOP, &p.id, 6).await.unwrap().stock, 10);
        assert!(inv.adjust_stock(SHOP, &p.id, -11).await.is_err());
        assert_eq!(inv.adjust_stock(SHOP, &p.id, -9).await.unwrap().stock, 1);
        assert_eq!(inv.low_stock(SHOP).await.unwrap().len(), 1);

        assert_eq!(inv.set_stock(SHOP, &p.id, 20).await.unwrap().stock, 20);
        assert_eq!(inv.set_price(SHOP, &p.id, dollars(41)).await.unwrap().price_cents, 4_100);
        assert_eq!(inv.set_cost(SHOP, &p.id, dollars(30)).await.unwrap().cost_cents, Some(3_000));
        assert_eq!(inv.set_threshold(SHOP, &p.id, 25).await.unwrap().low_stock_threshold, 25);
        assert_eq!(inv.rename(SHOP, &p.id, "Brown  Sugar").await.unwrap().name, "Brown Sugar");
        assert!(inv.set_price(SHOP, &p.id, Money::zero()).await.is_err());
    }
}
