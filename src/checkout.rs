//! Order placement.
//!
//! [`OrderService::place_order`] runs the whole checkout as one store
//! transaction: lock the product rows, validate every line against the locked
//! rows, write the order and its line items, decrement stock, write the total,
//! commit. Any failure rolls everything back.

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{error, info, warn};
use crate::domain::aggregates::{validate_cart, CartError, CartItemRequest, CartLine, NewLineItem, PlacedOrder};
use crate::domain::pricing::effective_price;
use crate::domain::value_objects::Currency;
use crate::store::{CheckoutStore, CheckoutTx, LockedProduct, StoreError};

#[derive(Error, Debug)]
pub enum CheckoutError {
    #[error("invalid cart: {0}")]
    InvalidCart(#[from] CartError),

    #[error("line {line}: product {product_id} does not exist")]
    UnknownProduct { line: usize, product_id: i64 },

    #[error("line {line}: product {product_id} is not active")]
    InactiveProduct { line: usize, product_id: i64 },

    #[error("line {line}: insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock { line: usize, product_id: i64, requested: i64, available: i32 },

    #[error("order could not be placed: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind { Validation, BusinessRule, Infrastructure }

impl CheckoutError {
    pub fn kind(&self) -> RejectionKind {
        match self {
            CheckoutError::InvalidCart(_) => RejectionKind::Validation,
            CheckoutError::UnknownProduct { .. }
            | CheckoutError::InactiveProduct { .. }
            | CheckoutError::InsufficientStock { .. } => RejectionKind::BusinessRule,
            CheckoutError::Store(_) => RejectionKind::Infrastructure,
        }
    }

    /// Offending product for business-rule rejections.
    pub fn product_id(&self) -> Option<i64> {
        match self {
            CheckoutError::UnknownProduct { product_id, .. }
            | CheckoutError::InactiveProduct { product_id, .. }
            | CheckoutError::InsufficientStock { product_id, .. } => Some(*product_id),
            _ => None,
        }
    }

    /// Zero-based cart line the rejection refers to.
    pub fn line(&self) -> Option<usize> {
        match self {
            CheckoutError::InvalidCart(CartError::InvalidLine { line, .. })
            | CheckoutError::UnknownProduct { line, .. }
            | CheckoutError::InactiveProduct { line, .. }
            | CheckoutError::InsufficientStock { line, .. } => Some(*line),
            _ => None,
        }
    }
}

pub struct OrderService<S> {
    store: S,
    currency: Currency,
}

impl<S: CheckoutStore> OrderService<S> {
    pub fn new(store: S, currency: Currency) -> Self { Self { store, currency } }

    pub fn currency(&self) -> &Currency { &self.currency }

    #[tracing::instrument(skip(self, items), fields(lines = items.len()))]
    pub async fn place_order(&self, customer_id: i64, items: &[CartItemRequest]) -> Result<PlacedOrder, CheckoutError> {
        let lines = validate_cart(items)?;
        let mut tx = self.store.begin().await?;
        match self.apply(&mut tx, customer_id, &lines).await {
            Ok(placed) => {
                tx.commit().await?;
                info!(order_id = placed.order_id, total = %placed.total, "order placed");
                Ok(placed)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    error!(error = %rollback_err, "checkout rollback failed");
                }
                warn!(error = %err, "order rejected");
                Err(err)
            }
        }
    }

    async fn apply(&self, tx: &mut S::Tx, customer_id: i64, lines: &[CartLine]) -> Result<PlacedOrder, CheckoutError> {
        let ids: Vec<i64> = lines.iter().map(|l| l.product_id).collect();
        let products: HashMap<i64, LockedProduct> =
            tx.lock_products(&ids).await?.into_iter().map(|p| (p.id, p)).collect();
        let category_ids: Vec<i64> = products.values().filter_map(|p| p.category_id).collect();
        let categories = if category_ids.is_empty() { HashMap::new() } else { tx.category_discounts(&category_ids).await? };

        check_lines(lines, &products)?;

        let order_id = tx.insert_order(customer_id, self.currency.as_str()).await?;
        let mut total = Decimal::ZERO;
        for line in lines {
            let product = products
                .get(&line.product_id)
                .ok_or_else(|| StoreError::RowMissing(format!("product {}", line.product_id)))?;
            let category = product.category_id.and_then(|id| categories.get(&id));
            let item = NewLineItem {
                product_id: product.id,
                sku: product.sku.clone(),
                product_name: product.name.clone(),
                unit_price: effective_price(product.price, &product.discount, category),
                quantity: line.quantity,
            };
            tx.insert_line_item(order_id, &item).await?;
            tx.decrement_stock(product.id, line.quantity).await?;
            total += item.line_total();
        }
        tx.update_order_total(order_id, total).await?;

        Ok(PlacedOrder { order_id, total, currency: self.currency.to_string() })
    }
}

/// Validates every line against the locked rows. A product listed on several
/// lines is checked against the running total requested for it.
fn check_lines(lines: &[CartLine], products: &HashMap<i64, LockedProduct>) -> Result<(), CheckoutError> {
    let mut requested: HashMap<i64, i64> = HashMap::new();
    for (line, item) in lines.iter().enumerate() {
        let product = products
            .get(&item.product_id)
            .ok_or(CheckoutError::UnknownProduct { line, product_id: item.product_id })?;
        if !product.active {
            return Err(CheckoutError::InactiveProduct { line, product_id: product.id });
        }
        let wanted = requested.entry(product.id).or_insert(0);
        *wanted += i64::from(item.quantity);
        if i64::from(product.stock) < *wanted {
            return Err(CheckoutError::InsufficientStock {
                line, product_id: product.id, requested: *wanted, available: product.stock,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::domain::aggregates::OrderStatus;
    use crate::domain::pricing::DiscountTerms;
    use crate::store::memory::{FailPoint, MemoryStore};

    fn d(s: &str) -> Decimal { s.parse().unwrap() }

    fn product(id: i64, price: &str, stock: i32) -> LockedProduct {
        LockedProduct {
            id, sku: format!("SKU-{id}"), name: format!("Product {id}"), price: d(price),
            stock, active: true, category_id: None, discount: DiscountTerms::none(),
        }
    }

    fn service(store: &MemoryStore) -> OrderService<MemoryStore> {
        OrderService::new(store.clone(), Currency::default())
    }

    #[tokio::test]
    async fn places_order_and_decrements_stock() {
        let store = MemoryStore::new();
        store.insert_product(product(1, "100000", 5)).await;

        let placed = service(&store).place_order(42, &[CartItemRequest::new(1, 2)]).await.unwrap();

        assert_eq!(placed.total, d("200000"));
        assert_eq!(placed.currency, "COP");
        assert_eq!(store.product(1).await.unwrap().stock, 3);
        let orders = store.orders().await;
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].customer_id, 42);
        assert_eq!(orders[0].status, OrderStatus::Pending);
        assert_eq!(orders[0].total, d("200000"));
        let items = store.line_items(placed.order_id).await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].unit_price, d("100000"));
        assert_eq!(items[0].quantity, 2);
        assert_eq!(items[0].sku, "SKU-1");
    }

    #[tokio::test]
    async fn charges_discounted_prices() {
        let store = MemoryStore::new();
        store.insert_category(7, DiscountTerms::new(Some(d("10")), true)).await;
        let mut own = product(1, "50000", 10);
        own.category_id = Some(7);
        own.discount = DiscountTerms::new(Some(d("20")), true);
        let mut by_category = product(2, "19.99", 10);
        by_category.category_id = Some(7);
        store.insert_product(own).await;
        store.insert_product(by_category).await;

        let placed = service(&store)
            .place_order(1, &[CartItemRequest::new(1, 1), CartItemRequest::new(2, 3)])
            .await
            .unwrap();

        let items = store.line_items(placed.order_id).await;
        assert_eq!(items[0].unit_price, d("40000"));
        // 19.99 * 0.9 = 17.991
        assert_eq!(items[1].unit_price, d("17.99"));
        assert_eq!(placed.total, d("40053.97"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_checkouts_cannot_oversell() {
        let store = MemoryStore::new();
        store.insert_product(product(1, "100", 1)).await;
        let orders = Arc::new(service(&store));

        let a = tokio::spawn({
            let orders = orders.clone();
            async move { orders.place_order(1, &[CartItemRequest::new(1, 1)]).await }
        });
        let b = tokio::spawn({
            let orders = orders.clone();
            async move { orders.place_order(2, &[CartItemRequest::new(1, 1)]).await }
        });
        let results = [a.await.unwrap(), b.await.unwrap()];

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        let failure = results.iter().find_map(|r| r.as_ref().err()).unwrap();
        assert!(matches!(failure, CheckoutError::InsufficientStock { product_id: 1, .. }));
        assert_eq!(store.product(1).await.unwrap().stock, 0);
        assert_eq!(store.orders().await.len(), 1);
    }

    #[tokio::test]
    async fn failing_line_leaves_no_trace() {
        let store = MemoryStore::new();
        store.insert_product(product(1, "10", 5)).await;
        store.insert_product(product(2, "20", 5)).await;
        let mut inactive = product(3, "30", 5);
        inactive.active = false;
        store.insert_product(inactive).await;

        let err = service(&store)
            .place_order(1, &[CartItemRequest::new(1, 1), CartItemRequest::new(2, 2), CartItemRequest::new(3, 1)])
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::InactiveProduct { line: 2, product_id: 3 }));
        assert_eq!(err.kind(), RejectionKind::BusinessRule);
        assert_eq!(store.product(1).await.unwrap().stock, 5);
        assert_eq!(store.product(2).await.unwrap().stock, 5);
        assert!(store.orders().await.is_empty());
    }

    #[tokio::test]
    async fn unknown_product_is_named() {
        let store = MemoryStore::new();
        store.insert_product(product(1, "10", 5)).await;
        let err = service(&store)
            .place_order(1, &[CartItemRequest::new(1, 1), CartItemRequest::new(99, 1)])
            .await
            .unwrap_err();
        assert_eq!(err.product_id(), Some(99));
        assert_eq!(err.line(), Some(1));
        assert!(store.orders().await.is_empty());
    }

    #[tokio::test]
    async fn repeated_product_checks_cumulative_quantity() {
        let store = MemoryStore::new();
        store.insert_product(product(1, "10", 3)).await;
        let err = service(&store)
            .place_order(1, &[CartItemRequest::new(1, 2), CartItemRequest::new(1, 2)])
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::InsufficientStock { line: 1, requested: 4, available: 3, .. }));
        assert_eq!(store.product(1).await.unwrap().stock, 3);
    }

    #[tokio::test]
    async fn malformed_cart_never_reaches_store() {
        let store = MemoryStore::new();
        store.insert_product(product(1, "10", 3)).await;
        let orders = service(&store);

        let zero = orders.place_order(1, &[CartItemRequest::new(1, 0)]).await.unwrap_err();
        assert_eq!(zero.kind(), RejectionKind::Validation);
        let not_an_id = orders.place_order(1, &[CartItemRequest::new("abc", 1)]).await.unwrap_err();
        assert_eq!(not_an_id.kind(), RejectionKind::Validation);
        let empty = orders.place_order(1, &[]).await.unwrap_err();
        assert!(matches!(empty, CheckoutError::InvalidCart(CartError::Empty)));

        assert_eq!(store.transactions_started(), 0);
    }

    #[tokio::test]
    async fn store_failure_rolls_back() {
        let store = MemoryStore::new();
        store.insert_product(product(1, "10", 3)).await;
        store.insert_product(product(2, "10", 3)).await;
        let orders = service(&store);

        for point in [FailPoint::LockProducts, FailPoint::DecrementStock, FailPoint::Commit] {
            store.fail_next(point);
            let err = orders
                .place_order(1, &[CartItemRequest::new(1, 1), CartItemRequest::new(2, 1)])
                .await
                .unwrap_err();
            assert_eq!(err.kind(), RejectionKind::Infrastructure);
            assert_eq!(store.product(1).await.unwrap().stock, 3);
            assert!(store.orders().await.is_empty());
        }

        // the store recovers once the failure is gone
        orders.place_order(1, &[CartItemRequest::new(1, 1)]).await.unwrap();
        assert_eq!(store.product(1).await.unwrap().stock, 2);
    }
}
