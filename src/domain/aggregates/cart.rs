//! Checkout cart: raw request lines and their validated form.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One cart line exactly as the client sent it. Fields stay untyped so that
/// malformed ids or quantities surface as a [`CartError`] instead of a
/// deserialization failure.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CartItemRequest {
    #[serde(default)]
    pub product_id: Value,
    #[serde(default)]
    pub quantity: Value,
}

impl CartItemRequest {
    pub fn new(product_id: impl Into<Value>, quantity: impl Into<Value>) -> Self {
        Self { product_id: product_id.into(), quantity: quantity.into() }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CartLine {
    pub product_id: i64,
    pub quantity: i32,
}

/// Reads the `items` member of a checkout body. Anything but a list is
/// rejected; a list entry that is not an object becomes a line with no fields.
pub fn cart_items(raw: &Value) -> Result<Vec<CartItemRequest>, CartError> {
    let Value::Array(entries) = raw else { return Err(CartError::NotAList) };
    Ok(entries
        .iter()
        .map(|entry| CartItemRequest {
            product_id: entry.get("product_id").cloned().unwrap_or_default(),
            quantity: entry.get("quantity").cloned().unwrap_or_default(),
        })
        .collect())
}

/// Validates every line before anything touches the store.
pub fn validate_cart(items: &[CartItemRequest]) -> Result<Vec<CartLine>, CartError> {
    if items.is_empty() { return Err(CartError::Empty); }
    items
        .iter()
        .enumerate()
        .map(|(line, item)| {
            let product_id = positive_integer(&item.product_id).ok_or(CartError::InvalidLine { line, field: "product_id" })?;
            let quantity = positive_integer(&item.quantity)
                .and_then(|q| i32::try_from(q).ok())
                .ok_or(CartError::InvalidLine { line, field: "quantity" })?;
            Ok(CartLine { product_id, quantity })
        })
        .collect()
}

/// Accepts JSON integers, integral floats and integer strings.
fn positive_integer(value: &Value) -> Option<i64> {
    let n = match value {
        Value::Number(n) => match n.as_i64() {
            Some(i) => i,
            None => {
                let f = n.as_f64()?;
                if f.fract() != 0.0 || f > i64::MAX as f64 { return None; }
                f as i64
            }
        },
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    (n > 0).then_some(n)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartError { Empty, NotAList, Unreadable(String), InvalidLine { line: usize, field: &'static str } }
impl std::error::Error for CartError {}
impl std::fmt::Display for CartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "cart is empty"),
            Self::NotAList => write!(f, "items must be a list"),
            Self::Unreadable(reason) => write!(f, "cart body unreadable: {reason}"),
            Self::InvalidLine { line, field } => write!(f, "cart line {line}: {field} must be a positive integer"),
        }
    }
}
