//! In-process store.
//!
//! A transaction takes a lock over all tables the first time it touches them
//! and works on a private copy, which replaces the shared tables only on
//! commit. That serializes concurrent checkouts the same way row locks do for
//! the products they share, and makes rollback a matter of dropping the copy.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use crate::domain::aggregates::{NewLineItem, OrderStatus};
use crate::domain::pricing::DiscountTerms;
use super::{lock_order, CheckoutStore, CheckoutTx, LockedProduct, StoreError};

#[derive(Debug, Clone, PartialEq)]
pub struct StoredOrder {
    pub id: i64,
    pub customer_id: i64,
    pub status: OrderStatus,
    pub currency: String,
    pub total: Decimal,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    products: BTreeMap<i64, LockedProduct>,
    categories: HashMap<i64, DiscountTerms>,
    orders: BTreeMap<i64, StoredOrder>,
    line_items: Vec<(i64, NewLineItem)>,
    last_order_id: i64,
}

/// Step at which the next transaction should fail, to exercise rollback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint { LockProducts, InsertLineItem, DecrementStock, Commit }

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<AsyncMutex<Tables>>,
    begun: Arc<AtomicUsize>,
    fail_next: Arc<Mutex<Option<FailPoint>>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    pub async fn insert_product(&self, product: LockedProduct) {
        self.tables.lock().await.products.insert(product.id, product);
    }

    pub async fn insert_category(&self, id: i64, discount: DiscountTerms) {
        self.tables.lock().await.categories.insert(id, discount);
    }

    pub async fn product(&self, id: i64) -> Option<LockedProduct> {
        self.tables.lock().await.products.get(&id).cloned()
    }

    pub async fn orders(&self) -> Vec<StoredOrder> {
        self.tables.lock().await.orders.values().cloned().collect()
    }

    pub async fn line_items(&self, order_id: i64) -> Vec<NewLineItem> {
        let tables = self.tables.lock().await;
        tables.line_items.iter().filter(|(id, _)| *id == order_id).map(|(_, item)| item.clone()).collect()
    }

    /// Number of transactions ever begun against this store.
    pub fn transactions_started(&self) -> usize { self.begun.load(Ordering::SeqCst) }

    pub fn fail_next(&self, point: FailPoint) {
        *self.fail_next.lock().unwrap_or_else(PoisonError::into_inner) = Some(point);
    }
}

pub struct MemoryTx {
    tables: Arc<AsyncMutex<Tables>>,
    guard: Option<OwnedMutexGuard<Tables>>,
    working: Tables,
    fail_at: Option<FailPoint>,
}

impl MemoryTx {
    async fn acquire(&mut self) -> &mut Tables {
        if self.guard.is_none() {
            let guard = self.tables.clone().lock_owned().await;
            self.working = guard.clone();
            self.guard = Some(guard);
        }
        &mut self.working
    }

    fn check(&self, point: FailPoint) -> Result<(), StoreError> {
        if self.fail_at == Some(point) {
            return Err(StoreError::Unavailable(format!("injected failure at {point:?}")));
        }
        Ok(())
    }
}

#[async_trait]
impl CheckoutStore for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, StoreError> {
        self.begun.fetch_add(1, Ordering::SeqCst);
        let fail_at = self.fail_next.lock().unwrap_or_else(PoisonError::into_inner).take();
        Ok(MemoryTx { tables: self.tables.clone(), guard: None, working: Tables::default(), fail_at })
    }
}

#[async_trait]
impl CheckoutTx for MemoryTx {
    async fn lock_products(&mut self, ids: &[i64]) -> Result<Vec<LockedProduct>, StoreError> {
        self.check(FailPoint::LockProducts)?;
        let tables = self.acquire().await;
        Ok(lock_order(ids).into_iter().filter_map(|id| tables.products.get(&id).cloned()).collect())
    }

    async fn category_discounts(&mut self, ids: &[i64]) -> Result<HashMap<i64, DiscountTerms>, StoreError> {
        let tables = self.acquire().await;
        Ok(ids.iter().filter_map(|id| tables.categories.get(id).map(|d| (*id, *d))).collect())
    }

    async fn insert_order(&mut self, customer_id: i64, currency: &str) -> Result<i64, StoreError> {
        let tables = self.acquire().await;
        tables.last_order_id += 1;
        let id = tables.last_order_id;
        tables.orders.insert(id, StoredOrder {
            id, customer_id, status: OrderStatus::Pending, currency: currency.to_string(), total: Decimal::ZERO,
        });
        Ok(id)
    }

    async fn insert_line_item(&mut self, order_id: i64, item: &NewLineItem) -> Result<(), StoreError> {
        self.check(FailPoint::InsertLineItem)?;
        let tables = self.acquire().await;
        if !tables.orders.contains_key(&order_id) { return Err(StoreError::RowMissing(format!("order {order_id}"))); }
        if item.quantity <= 0 { return Err(StoreError::Unavailable("line item quantity must be positive".into())); }
        tables.line_items.push((order_id, item.clone()));
        Ok(())
    }

    async fn decrement_stock(&mut self, product_id: i64, quantity: i32) -> Result<(), StoreError> {
        self.check(FailPoint::DecrementStock)?;
        let tables = self.acquire().await;
        let product = tables.products.get_mut(&product_id).ok_or_else(|| StoreError::RowMissing(format!("product {product_id}")))?;
        if product.stock < quantity { return Err(StoreError::Unavailable(format!("stock of product {product_id} would go negative"))); }
        product.stock -= quantity;
        Ok(())
    }

    async fn update_order_total(&mut self, order_id: i64, total: Decimal) -> Result<(), StoreError> {
        let tables = self.acquire().await;
        let order = tables.orders.get_mut(&order_id).ok_or_else(|| StoreError::RowMissing(format!("order {order_id}")))?;
        order.total = total;
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.check(FailPoint::Commit)?;
        let MemoryTx { guard, working, .. } = self;
        if let Some(mut guard) = guard {
            *guard = working;
        }
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: i64, stock: i32) -> LockedProduct {
        LockedProduct {
            id, sku: format!("SKU-{id}"), name: format!("Product {id}"), price: Decimal::new(1000, 0),
            stock, active: true, category_id: None, discount: DiscountTerms::none(),
        }
    }

    #[tokio::test]
    async fn test_commit_publishes_and_rollback_discards() {
        let store = MemoryStore::new();
        store.insert_product(product(1, 5)).await;

        let mut tx = store.begin().await.unwrap();
        tx.lock_products(&[1]).await.unwrap();
        tx.decrement_stock(1, 2).await.unwrap();
        tx.rollback().await.unwrap();
        assert_eq!(store.product(1).await.unwrap().stock, 5);

        let mut tx = store.begin().await.unwrap();
        tx.lock_products(&[1]).await.unwrap();
        tx.decrement_stock(1, 2).await.unwrap();
        let order = tx.insert_order(9, "COP").await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(store.product(1).await.unwrap().stock, 3);
        assert_eq!(store.orders().await[0].id, order);
        assert_eq!(store.transactions_started(), 2);
    }

    #[tokio::test]
    async fn test_stock_never_negative() {
        let store = MemoryStore::new();
        store.insert_product(product(1, 1)).await;
        let mut tx = store.begin().await.unwrap();
        tx.lock_products(&[1]).await.unwrap();
        assert!(tx.decrement_stock(1, 2).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_products_are_absent() {
        let store = MemoryStore::new();
        store.insert_product(product(2, 1)).await;
        let mut tx = store.begin().await.unwrap();
        let locked = tx.lock_products(&[3, 2, 2]).await.unwrap();
        assert_eq!(locked.iter().map(|p| p.id).collect::<Vec<_>>(), vec![2]);
    }
}
