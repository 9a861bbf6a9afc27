//! Catalog store.
//!
//! Checkout talks to the store only through [`CheckoutStore`] and the
//! transaction it hands out, [`CheckoutTx`]. Everything a transaction writes
//! stays invisible to other callers until [`CheckoutTx::commit`]; dropping or
//! rolling back a transaction discards it.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use thiserror::Error;
use crate::domain::aggregates::NewLineItem;
use crate::domain::pricing::DiscountTerms;

#[cfg(test)]
pub(crate) mod memory;
pub mod postgres;

pub use postgres::PgStore;

/// Product row as seen under a row lock.
#[derive(Debug, Clone, PartialEq)]
pub struct LockedProduct {
    pub id: i64,
    pub sku: String,
    pub name: String,
    pub price: Decimal,
    pub stock: i32,
    pub active: bool,
    pub category_id: Option<i64>,
    pub discount: DiscountTerms,
}

#[async_trait]
pub trait CheckoutStore: Send + Sync {
    type Tx: CheckoutTx;

    async fn begin(&self) -> Result<Self::Tx, StoreError>;
}

#[async_trait]
pub trait CheckoutTx: Send {
    /// Locks the given product rows for update. Missing ids are simply absent
    /// from the result.
    async fn lock_products(&mut self, ids: &[i64]) -> Result<Vec<LockedProduct>, StoreError>;

    /// Discount terms keyed by category id. Unknown ids are absent.
    async fn category_discounts(&mut self, ids: &[i64]) -> Result<HashMap<i64, DiscountTerms>, StoreError>;

    /// Inserts a `pending` order with a zero total and returns its id.
    async fn insert_order(&mut self, customer_id: i64, currency: &str) -> Result<i64, StoreError>;

    async fn insert_line_item(&mut self, order_id: i64, item: &NewLineItem) -> Result<(), StoreError>;

    async fn decrement_stock(&mut self, product_id: i64, quantity: i32) -> Result<(), StoreError>;

    async fn update_order_total(&mut self, order_id: i64, total: Decimal) -> Result<(), StoreError>;

    async fn commit(self) -> Result<(), StoreError>;

    async fn rollback(self) -> Result<(), StoreError>;
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("row {0} vanished inside the transaction")]
    RowMissing(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn is_unique_violation(&self) -> bool {
        match self {
            StoreError::Database(sqlx::Error::Database(db)) => db.is_unique_violation(),
            _ => false,
        }
    }
}

/// Deduplicated ids in ascending order, the order rows get locked in.
pub(crate) fn lock_order(ids: &[i64]) -> Vec<i64> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}
