//! Checkout and order history routes.

use std::collections::HashMap;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};
use crate::checkout::CheckoutError;
use crate::domain::aggregates::{cart_items, CartError, CartItemRequest, Order, OrderLineItem, OrderRow, OrderStatus, PlacedOrder};
use super::{flag, positive_id, AdminUser, ApiError, AppState, AuthUser, JsonBody};

/// `items` stays raw JSON so a malformed cart is reported as a cart rejection.
#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    #[serde(default)]
    pub items: Value,
}

#[derive(Debug, Deserialize)]
pub struct MineParams { pub details: Option<String> }

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub status: Option<String>,
    pub q: Option<String>,
    pub details: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate { pub status: String }

pub async fn place(
    user: AuthUser,
    State(s): State<AppState>,
    body: Result<JsonBody<PlaceOrderRequest>, ApiError>,
) -> Result<(StatusCode, Json<PlacedOrder>), ApiError> {
    let items = requested_items(body)?;
    let placed = s.orders.place_order(user.id, &items).await?;
    Ok((StatusCode::CREATED, Json(placed)))
}

fn requested_items(body: Result<JsonBody<PlaceOrderRequest>, ApiError>) -> Result<Vec<CartItemRequest>, CheckoutError> {
    let JsonBody(request) = body.map_err(|e| CartError::Unreadable(e.to_string()))?;
    Ok(cart_items(&request.items)?)
}

pub async fn mine(user: AuthUser, State(s): State<AppState>, Query(p): Query<MineParams>) -> Result<Json<Vec<Order>>, ApiError> {
    let rows = s.store.orders_for_customer(user.id).await?;
    Ok(Json(assemble(&s, rows, flag(p.details.as_deref())).await?))
}

pub async fn list_all(AdminUser(_): AdminUser, State(s): State<AppState>, Query(p): Query<ListParams>) -> Result<Json<Vec<Order>>, ApiError> {
    let statuses = match p.status.as_deref() {
        Some(raw) => OrderStatus::parse_filter(raw).map_err(ApiError::bad_request)?,
        None => Vec::new(),
    };
    let rows = s.store.list_orders(&statuses, p.q.as_deref()).await?;
    Ok(Json(assemble(&s, rows, flag(p.details.as_deref())).await?))
}

pub async fn set_status(AdminUser(admin): AdminUser, State(s): State<AppState>, Path(id): Path<i64>, JsonBody(body): JsonBody<StatusUpdate>) -> Result<Json<serde_json::Value>, ApiError> {
    let id = positive_id(id)?;
    let status: OrderStatus = body.status.trim().to_lowercase().parse().map_err(ApiError::bad_request)?;
    if !s.store.update_order_status(id, status).await? {
        return Err(ApiError::not_found("order not found"));
    }
    info!(admin = admin.id, order_id = id, %status, "order status changed");
    Ok(Json(json!({ "id": id, "status": status })))
}

/// Converts rows to orders, attaching line items when asked. A row with a
/// status outside the enumeration is skipped and logged.
async fn assemble(s: &AppState, rows: Vec<OrderRow>, with_items: bool) -> Result<Vec<Order>, ApiError> {
    let mut orders: Vec<Order> = rows
        .into_iter()
        .filter_map(|row| {
            let id = row.id;
            Order::try_from(row).map_err(|e| warn!(order_id = id, error = %e, "skipping order")).ok()
        })
        .collect();
    if with_items && !orders.is_empty() {
        let ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
        let mut grouped: HashMap<i64, Vec<OrderLineItem>> = HashMap::new();
        for item in s.store.line_items_for(&ids).await? {
            grouped.entry(item.order_id).or_default().push(item);
        }
        for order in &mut orders {
            order.items = Some(grouped.remove(&order.id).unwrap_or_default());
        }
    }
    Ok(orders)
}
