//! # Repository Module
//!
//! Database repository implementations for Tillbook.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Ledger service                                                         │
//! │       │  db.products().try_reserve(shop, id, 3, version)                │
//! │       ▼                                                                 │
//! │  ProductRepository                                                      │
//! │  ├── get / find_by_name / list_active                                   │
//! │  ├── insert / update (version-checked)                                  │
//! │  └── try_reserve / release / set_stock                                  │
//! │       │  SQL                                                            │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every method takes the `shop_id` it operates on; no query ever reads
//! across shops.
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Catalog and stock
//! - [`sale::SaleRepository`] - Sales and their frozen lines
//! - [`customer::CustomerRepository`] - Customers and the credit log
//! - [`order::OrderRepository`] - Orders and status transitions
//! - [`laybye::LayByeRepository`] - Lay-byes and installments
//! - [`expense::ExpenseRepository`] - Expenses

pub mod customer;
pub mod expense;
pub mod laybye;
pub mod order;
pub mod product;
pub mod sale;

use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use std::collections::HashMap;

use crate::error::DbResult;
use tillbook_core::LineItem;

// =============================================================================
// Shared line-item tables
// =============================================================================

/// One of the three tables holding frozen product lines.
#[derive(Debug, Clone, Copy)]
pub(crate) enum LineTable {
    Sale,
    Order,
    LayBye,
}

impl LineTable {
    fn table(self) -> &'static str {
        match self {
            LineTable::Sale => "sale_items",
            LineTable::Order => "order_items",
            LineTable::LayBye => "laybye_items",
        }
    }

    fn parent_column(self) -> &'static str {
        match self {
            LineTable::Sale => "sale_id",
            LineTable::Order => "order_id",
            LineTable::LayBye => "laybye_id",
        }
    }
}

/// Inserts lines inside the caller's transaction.
pub(crate) async fn insert_lines(
    conn: &mut SqliteConnection,
    table: LineTable,
    lines: &[LineItem],
) -> DbResult<()> {
    let sql = format!(
        "INSERT INTO {} (id, {}, product_id, product_name, quantity, price_cents, cost_cents, total_cents) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        table.table(),
        table.parent_column()
    );
    for line in lines {
        sqlx::query(&sql)
            .bind(&line.id)
            .bind(&line.parent_id)
            .bind(&line.product_id)
            .bind(&line.product_name)
            .bind(line.quantity)
            .bind(line.price_cents)
            .bind(line.cost_cents)
            .bind(line.total_cents)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

/// Loads the lines of many parents in one query, grouped by parent id.
pub(crate) async fn load_lines(
    pool: &SqlitePool,
    table: LineTable,
    parent_ids: &[String],
) -> DbResult<HashMap<String, Vec<LineItem>>> {
    let mut grouped: HashMap<String, Vec<LineItem>> = HashMap::new();
    if parent_ids.is_empty() {
        return Ok(grouped);
    }

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
        "SELECT id, {} AS parent_id, product_id, product_name, quantity, price_cents, cost_cents, total_cents \
         FROM {} WHERE {} IN (",
        table.parent_column(),
        table.table(),
        table.parent_column()
    ));
    let mut separated = qb.separated(", ");
    for id in parent_ids {
        separated.push_bind(id.clone());
    }
    separated.push_unseparated(") ORDER BY rowid");

    let lines = qb.build_query_as::<LineItem>().fetch_all(pool).await?;
    for line in lines {
        grouped.entry(line.parent_id.clone()).or_default().push(line);
    }
    Ok(grouped)
}

/// True when any sale, order or lay-bye line references the product.
pub(crate) async fn product_is_referenced(pool: &SqlitePool, product_id: &str) -> DbResult<bool> {
    let referenced: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (SELECT 1 FROM sale_items WHERE product_id = ?1)
            OR EXISTS (SELECT 1 FROM order_items WHERE product_id = ?1)
            OR EXISTS (SELECT 1 FROM laybye_items WHERE product_id = ?1)
        "#,
    )
    .bind(product_id)
    .fetch_one(pool)
    .await?;
    Ok(referenced)
}

/// Escapes `%`, `_` and `\` for a `LIKE ... ESCAPE '\'` prefix match.
pub(crate) fn like_prefix(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_prefix_escapes_wildcards() {
        assert_eq!(like_prefix("ab12"), "ab12%");
        assert_eq!(like_prefix("a%_"), "a\\%\\_%");
    }
}
