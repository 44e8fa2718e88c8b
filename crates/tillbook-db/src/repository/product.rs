//! # Product Repository
//!
//! Database operations for products and stock.
//!
//! ## Stock Updates
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Stock Update Strategy                                │
//! │                                                                         │
//! │  Reserve (decrement): compare-and-set on version                        │
//! │     UPDATE products SET stock = stock - 3, version = version + 1        │
//! │     WHERE id = ? AND version = 7 AND stock >= 3                         │
//! │     0 rows → someone else won, or stock ran out: caller re-reads        │
//! │                                                                         │
//! │  Release (increment): plain delta, always safe to apply                 │
//! │     UPDATE products SET stock = stock + 3, version = version + 1        │
//! │                                                                         │
//! │  Both bump version, so a reserve that read before a release retries     │
//! │  against the new level instead of overwriting it.                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::product_is_referenced;
use tillbook_core::Product;

const SELECT_PRODUCT: &str = r#"
    SELECT id, shop_id, name, price_cents, cost_cents, stock, low_stock_threshold,
           track_stock, active, version, created_at, updated_at
    FROM products
"#;

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by its ID, archived or not.
    pub async fn get(&self, shop_id: &str, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "{SELECT_PRODUCT} WHERE id = ?1 AND shop_id = ?2"
        ))
        .bind(id)
        .bind(shop_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Finds a product by case-insensitive name, archived or not.
    pub async fn find_by_name(&self, shop_id: &str, name: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "{SELECT_PRODUCT} WHERE shop_id = ?1 AND name = ?2 COLLATE NOCASE"
        ))
        .bind(shop_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Lists active products sorted by name.
    pub async fn list_active(&self, shop_id: &str) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "{SELECT_PRODUCT} WHERE shop_id = ?1 AND active = 1 ORDER BY name COLLATE NOCASE"
        ))
        .bind(shop_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Active tracked products at or below their threshold, lowest stock first.
    pub async fn low_stock(&self, shop_id: &str) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "{SELECT_PRODUCT}
             WHERE shop_id = ?1 AND active = 1 AND track_stock = 1
               AND stock <= low_stock_threshold
             ORDER BY stock ASC, name COLLATE NOCASE"
        ))
        .bind(shop_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - name already used in this shop
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(shop_id = %product.shop_id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, shop_id, name, price_cents, cost_cents, stock, low_stock_threshold,
                track_stock, active, version, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&product.id)
        .bind(&product.shop_id)
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(product.cost_cents)
        .bind(product.stock)
        .bind(product.low_stock_threshold)
        .bind(product.track_stock)
        .bind(product.active)
        .bind(product.version)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Writes every mutable field if the row is still at `product.version`.
    ///
    /// ## Returns
    /// * `Ok(true)` - written, version bumped
    /// * `Ok(false)` - the row changed since it was read
    pub async fn update(&self, product: &Product) -> DbResult<bool> {
        debug!(id = %product.id, version = product.version, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?3,
                price_cents = ?4,
                cost_cents = ?5,
                stock = ?6,
                low_stock_threshold = ?7,
                track_stock = ?8,
                active = ?9,
                updated_at = ?10,
                version = version + 1
            WHERE id = ?1 AND shop_id = ?2 AND version = ?11
            "#,
        )
        .bind(&product.id)
        .bind(&product.shop_id)
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(product.cost_cents)
        .bind(product.stock)
        .bind(product.low_stock_threshold)
        .bind(product.track_stock)
        .bind(product.active)
        .bind(Utc::now())
        .bind(product.version)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Takes `quantity` from stock if the row is still at `expected_version`
    /// and holds enough units.
    pub async fn try_reserve(
        &self,
        shop_id: &str,
        id: &str,
        quantity: i64,
        expected_version: i64,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE products SET
                stock = stock - ?3,
                version = version + 1,
                updated_at = ?5
            WHERE id = ?1 AND shop_id = ?2 AND version = ?4
              AND active = 1 AND stock >= ?3
            "#,
        )
        .bind(id)
        .bind(shop_id)
        .bind(quantity)
        .bind(expected_version)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Returns `quantity` units to stock. Untracked products are left alone.
    ///
    /// Applies to archived products too, so cancelling an old sale still
    /// restores what it took.
    pub async fn release(&self, shop_id: &str, id: &str, quantity: i64) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE products SET
                stock = stock + ?3,
                version = version + 1,
                updated_at = ?4
            WHERE id = ?1 AND shop_id = ?2 AND track_stock = 1
            "#,
        )
        .bind(id)
        .bind(shop_id)
        .bind(quantity)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 && self.get(shop_id, id).await?.is_none() {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Overwrites the stock level of an active product.
    pub async fn set_stock(&self, shop_id: &str, id: &str, stock: i64) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE products SET
                stock = ?3,
                version = version + 1,
                updated_at = ?4
            WHERE id = ?1 AND shop_id = ?2 AND active = 1
            "#,
        )
        .bind(id)
        .bind(shop_id)
        .bind(stock)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Soft-deletes a product.
    pub async fn archive(&self, shop_id: &str, id: &str) -> DbResult<()> {
        debug!(id = %id, "Archiving product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                active = 0,
                version = version + 1,
                updated_at = ?3
            WHERE id = ?1 AND shop_id = ?2
            "#,
        )
        .bind(id)
        .bind(shop_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Deletes a product row. Only valid while nothing references it.
    pub async fn hard_delete(&self, shop_id: &str, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1 AND shop_id = ?2")
            .bind(id)
            .bind(shop_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// True when any sale, order or lay-bye line points at the product.
    pub async fn is_referenced(&self, id: &str) -> DbResult<bool> {
        product_is_referenced(&self.pool, id).await
    }

    /// Counts active products (for diagnostics).
    pub async fn count(&self, shop_id: &str) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE shop_id = ?1 AND active = 1")
                .bind(shop_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
