//! Order history reads and admin status changes. Placement lives behind `CheckoutTx`.

use crate::domain::aggregates::{OrderLineItem, OrderRow, OrderStatus};
use crate::store::StoreError;
use super::{like_pattern, PgStore};

impl PgStore {
    pub async fn orders_for_customer(&self, customer_id: i64) -> Result<Vec<OrderRow>, StoreError> {
        let rows = sqlx::query_as::<_, OrderRow>(
            "SELECT o.id, o.customer_id, o.status, o.currency, o.total, o.created_at, o.updated_at, \
                    NULL::TEXT AS customer_first_name, NULL::TEXT AS customer_last_name, NULL::TEXT AS customer_email \
             FROM orders o WHERE o.customer_id = $1 ORDER BY o.created_at DESC, o.id DESC",
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// All orders with their customer. An empty `statuses` means any status;
    /// `search` matches first name, last name or email, case-insensitively.
    pub async fn list_orders(&self, statuses: &[OrderStatus], search: Option<&str>) -> Result<Vec<OrderRow>, StoreError> {
        let statuses: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();
        let pattern = search.map(str::trim).filter(|q| !q.is_empty()).map(|q| like_pattern(&q.to_lowercase()));
        let rows = sqlx::query_as::<_, OrderRow>(
            "SELECT o.id, o.customer_id, o.status, o.currency, o.total, o.created_at, o.updated_at, \
                    c.first_name AS customer_first_name, c.last_name AS customer_last_name, c.email AS customer_email \
             FROM orders o JOIN customers c ON c.id = o.customer_id \
             WHERE (cardinality($1::TEXT[]) = 0 OR o.status = ANY($1)) \
               AND ($2::TEXT IS NULL OR LOWER(CONCAT_WS(' ', c.first_name, c.last_name, c.email)) LIKE $2) \
             ORDER BY o.created_at DESC, o.id DESC",
        )
        .bind(&statuses)
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn line_items_for(&self, order_ids: &[i64]) -> Result<Vec<OrderLineItem>, StoreError> {
        if order_ids.is_empty() { return Ok(Vec::new()); }
        let rows = sqlx::query_as::<_, OrderLineItem>(
            "SELECT order_id, product_id, sku, product_name, unit_price, quantity, line_total \
             FROM order_items WHERE order_id = ANY($1) ORDER BY order_id ASC, id ASC",
        )
        .bind(order_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn update_order_status(&self, id: i64, status: OrderStatus) -> Result<bool, StoreError> {
        let done = sqlx::query("UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected() > 0)
    }
}
