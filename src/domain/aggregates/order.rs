//! Order Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus { #[default] Pending, Paid, Shipped, Delivered, Cancelled, Refunded }

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Pending, OrderStatus::Paid, OrderStatus::Shipped,
        OrderStatus::Delivered, OrderStatus::Cancelled, OrderStatus::Refunded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
        }
    }

    /// Parses a comma separated status filter. `processing` expands to paid and
    /// shipped, `completed`/`finished` to delivered.
    pub fn parse_filter(raw: &str) -> Result<Vec<OrderStatus>, UnknownStatus> {
        let mut statuses = Vec::new();
        for token in raw.split(',').map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty()) {
            let expanded: &[OrderStatus] = match token.as_str() {
                "processing" => &[OrderStatus::Paid, OrderStatus::Shipped],
                "completed" | "finished" => &[OrderStatus::Delivered],
                other => {
                    let status = other.parse::<OrderStatus>()?;
                    statuses.push(status);
                    continue;
                }
            };
            statuses.extend_from_slice(expanded);
        }
        statuses.dedup();
        Ok(statuses)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for OrderStatus {
    type Err = UnknownStatus;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|status| status.as_str() == s).ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub struct UnknownStatus(pub String);
impl std::error::Error for UnknownStatus {}
impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "unknown order status {:?}", self.0) }
}

/// Order row as read back from the store. Customer columns are only filled for admin listings.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderRow {
    pub id: i64,
    pub customer_id: i64,
    pub status: String,
    pub currency: String,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub customer_first_name: Option<String>,
    pub customer_last_name: Option<String>,
    pub customer_email: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: i64,
    pub customer_id: i64,
    pub status: OrderStatus,
    pub currency: String,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<OrderCustomer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<OrderLineItem>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderCustomer { pub first_name: String, pub last_name: String, pub email: String }

impl TryFrom<OrderRow> for Order {
    type Error = UnknownStatus;
    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let customer = match (row.customer_first_name, row.customer_last_name, row.customer_email) {
            (Some(first_name), Some(last_name), Some(email)) => Some(OrderCustomer { first_name, last_name, email }),
            _ => None,
        };
        Ok(Self {
            id: row.id, customer_id: row.customer_id, status: row.status.parse()?, currency: row.currency,
            total: row.total, created_at: row.created_at, updated_at: row.updated_at, customer, items: None,
        })
    }
}

/// Snapshot of a product at purchase time.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct OrderLineItem {
    pub order_id: i64,
    pub product_id: i64,
    pub sku: String,
    pub product_name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub line_total: Decimal,
}

/// Line item about to be written by checkout.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLineItem {
    pub product_id: i64,
    pub sku: String,
    pub product_name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
}

impl NewLineItem {
    pub fn line_total(&self) -> Decimal { self.unit_price * Decimal::from(self.quantity) }
}

/// What the caller gets back from a successful checkout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedOrder {
    pub order_id: i64,
    pub total: Decimal,
    pub currency: String,
}
