//! PostgreSQL implementation of the catalog store.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, Transaction};
use std::collections::HashMap;
use crate::domain::aggregates::NewLineItem;
use crate::domain::pricing::DiscountTerms;
use super::{lock_order, CheckoutStore, CheckoutTx, LockedProduct, StoreError};

mod accounts;
mod catalog;
mod orders;

/// Cloneable handle over the connection pool.
#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new().max_connections(max_connections).connect(url).await?;
        Ok(Self { pool })
    }

    /// Pool that only dials the database on first use.
    pub fn connect_lazy(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new().max_connections(max_connections).connect_lazy(url)?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    pub fn pool(&self) -> &PgPool { &self.pool }
}

#[derive(sqlx::FromRow)]
struct LockedProductRow {
    id: i64,
    sku: String,
    name: String,
    price: Decimal,
    stock: i32,
    active: bool,
    category_id: Option<i64>,
    discount_pct: Option<Decimal>,
    discount_active: bool,
}

impl From<LockedProductRow> for LockedProduct {
    fn from(r: LockedProductRow) -> Self {
        Self {
            id: r.id, sku: r.sku, name: r.name, price: r.price, stock: r.stock, active: r.active,
            category_id: r.category_id, discount: DiscountTerms::new(r.discount_pct, r.discount_active),
        }
    }
}

pub struct PgCheckoutTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl CheckoutStore for PgStore {
    type Tx = PgCheckoutTx;

    async fn begin(&self) -> Result<PgCheckoutTx, StoreError> {
        Ok(PgCheckoutTx { tx: self.pool.begin().await? })
    }
}

#[async_trait]
impl CheckoutTx for PgCheckoutTx {
    async fn lock_products(&mut self, ids: &[i64]) -> Result<Vec<LockedProduct>, StoreError> {
        let ids = lock_order(ids);
        let rows = sqlx::query_as::<_, LockedProductRow>(
            "SELECT id, sku, name, price, stock, active, category_id, discount_pct, discount_active \
             FROM products WHERE id = ANY($1) ORDER BY id FOR UPDATE",
        )
        .bind(&ids)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(rows.into_iter().map(LockedProduct::from).collect())
    }

    async fn category_discounts(&mut self, ids: &[i64]) -> Result<HashMap<i64, DiscountTerms>, StoreError> {
        let ids = lock_order(ids);
        let rows: Vec<(i64, Option<Decimal>, bool)> =
            sqlx::query_as("SELECT id, discount_pct, discount_active FROM categories WHERE id = ANY($1)")
                .bind(&ids)
                .fetch_all(&mut *self.tx)
                .await?;
        Ok(rows.into_iter().map(|(id, pct, active)| (id, DiscountTerms::new(pct, active))).collect())
    }

    async fn insert_order(&mut self, customer_id: i64, currency: &str) -> Result<i64, StoreError> {
        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO orders (customer_id, status, total, currency) VALUES ($1, 'pending', 0, $2) RETURNING id",
        )
        .bind(customer_id)
        .bind(currency)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(id)
    }

    async fn insert_line_item(&mut self, order_id: i64, item: &NewLineItem) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO order_items (order_id, product_id, sku, product_name, unit_price, quantity) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(order_id)
        .bind(item.product_id)
        .bind(&item.sku)
        .bind(&item.product_name)
        .bind(item.unit_price)
        .bind(item.quantity)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn decrement_stock(&mut self, product_id: i64, quantity: i32) -> Result<(), StoreError> {
        let done = sqlx::query("UPDATE products SET stock = stock - $2, updated_at = NOW() WHERE id = $1")
            .bind(product_id)
            .bind(quantity)
            .execute(&mut *self.tx)
            .await?;
        if done.rows_affected() == 0 { return Err(StoreError::RowMissing(format!("product {product_id}"))); }
        Ok(())
    }

    async fn update_order_total(&mut self, order_id: i64, total: Decimal) -> Result<(), StoreError> {
        let done = sqlx::query("UPDATE orders SET total = $2, updated_at = NOW() WHERE id = $1")
            .bind(order_id)
            .bind(total)
            .execute(&mut *self.tx)
            .await?;
        if done.rows_affected() == 0 { return Err(StoreError::RowMissing(format!("order {order_id}"))); }
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

/// Escapes `%`, `_` and `\` so user text matches literally inside a LIKE pattern.
pub(crate) fn like_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') { escaped.push('\\'); }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}
