//! Product Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use validator::Validate;
use crate::domain::pricing::{DiscountTerms, PriceQuote};
use crate::domain::value_objects::{deserialize_flag, Currency, DiscountPct, Sku};

/// Product joined with its category's discount pair and display image.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: i64,
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub currency: String,
    pub stock: i32,
    pub active: bool,
    pub category_id: Option<i64>,
    pub discount_pct: Option<Decimal>,
    pub discount_active: bool,
    pub category_discount_pct: Option<Decimal>,
    pub category_discount_active: Option<bool>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductRow {
    pub fn own_discount(&self) -> DiscountTerms { DiscountTerms::new(self.discount_pct, self.discount_active) }

    pub fn category_discount(&self) -> Option<DiscountTerms> {
        self.category_discount_active.map(|active| DiscountTerms::new(self.category_discount_pct, active))
    }
}

/// Catalog view of a product, priced the same way checkout prices it.
#[derive(Debug, Clone, Serialize)]
pub struct ProductView {
    pub id: i64,
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub effective_price: Decimal,
    pub applied_discount_pct: Decimal,
    pub currency: String,
    pub stock: i32,
    pub active: bool,
    pub category_id: Option<i64>,
    pub discount_pct: Option<Decimal>,
    pub discount_active: bool,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProductRow> for ProductView {
    fn from(row: ProductRow) -> Self {
        let quote = PriceQuote::resolve(row.price, &row.own_discount(), row.category_discount().as_ref());
        Self {
            id: row.id, sku: row.sku, name: row.name, description: row.description,
            price: row.price, effective_price: quote.effective, applied_discount_pct: quote.applied_discount_pct,
            currency: row.currency, stock: row.stock, active: row.active, category_id: row.category_id,
            discount_pct: row.discount_pct, discount_active: row.discount_active, image_url: row.image_url,
            created_at: row.created_at, updated_at: row.updated_at,
        }
    }
}

/// Admin create/update body.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProductPayload {
    #[validate(length(min = 1, max = 64))]
    pub sku: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub currency: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub stock: i32,
    #[serde(default = "default_true", deserialize_with = "deserialize_flag")]
    pub active: bool,
    pub category_id: Option<i64>,
    pub discount_pct: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub discount_active: bool,
    /// `Some("")` clears the primary image, `None` leaves it untouched.
    pub image_url: Option<String>,
}

fn default_true() -> bool { true }

/// Product fields after validation, ready to write.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDraft {
    pub sku: Sku,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub currency: Currency,
    pub stock: i32,
    pub active: bool,
    pub category_id: Option<i64>,
    pub discount: DiscountTerms,
    pub image_url: Option<String>,
}

impl ProductPayload {
    /// The store sells in one currency; a payload naming any other is rejected.
    pub fn into_draft(self, store_currency: &Currency) -> Result<ProductDraft, ProductError> {
        self.validate().map_err(|e| ProductError::Invalid(e.to_string()))?;
        let sku = Sku::new(self.sku).map_err(|e| ProductError::Invalid(e.to_string()))?;
        if self.price < Decimal::ZERO { return Err(ProductError::Invalid("price must not be negative".into())); }
        if let Some(code) = self.currency.as_deref() {
            let requested = Currency::new(code).map_err(|e| ProductError::Invalid(e.to_string()))?;
            if &requested != store_currency {
                return Err(ProductError::Invalid(format!("currency must be {store_currency}, got {requested}")));
            }
        }
        let currency = store_currency.clone();
        let discount_pct = self.discount_pct
            .map(DiscountPct::new)
            .transpose()
            .map_err(|e| ProductError::Invalid(e.to_string()))?
            .map(|p| p.value());
        if matches!(self.category_id, Some(id) if id <= 0) {
            return Err(ProductError::Invalid("category_id must be a positive integer".into()));
        }
        Ok(ProductDraft {
            sku, name: self.name.trim().to_string(), description: self.description,
            price: self.price.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero), currency, stock: self.stock, active: self.active,
            category_id: self.category_id, discount: DiscountTerms::new(discount_pct, self.discount_active),
            image_url: self.image_url,
        })
    }
}

#[derive(Debug, Clone, PartialEq)] pub enum ProductError { Invalid(String) }
impl std::error::Error for ProductError {}
impl std::fmt::Display for ProductError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self { Self::Invalid(msg) => write!(f, "{msg}") }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row() -> ProductRow {
        ProductRow {
            id: 1, sku: "CAM-001".into(), name: "Camisa".into(), description: None,
            price: Decimal::new(100000, 0), currency: "COP".into(), stock: 5, active: true,
            category_id: Some(2), discount_pct: None, discount_active: false,
            category_discount_pct: Some(Decimal::new(10, 0)), category_discount_active: Some(true),
            image_url: None, created_at: Utc::now(), updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_view_uses_category_discount() {
        let view = ProductView::from(row());
        assert_eq!(view.effective_price, Decimal::new(90000, 0));
        assert_eq!(view.applied_discount_pct, Decimal::new(10, 0));
    }

    #[test]
    fn test_view_without_category() {
        let mut r = row();
        r.category_id = None;
        r.category_discount_pct = None;
        r.category_discount_active = None;
        assert_eq!(ProductView::from(r).effective_price, Decimal::new(100000, 0));
    }

    #[test]
    fn test_price_rounds_half_away_from_zero() {
        let payload: ProductPayload = serde_json::from_value(json!({
            "sku": "CAM-003", "name": "Camisa", "price": "10.125", "active": 1, "discount_active": 0
        })).unwrap();
        let draft = payload.into_draft(&Currency::default()).unwrap();
        assert_eq!(draft.price, Decimal::new(1013, 2));
        assert!(draft.active);
        assert!(!draft.discount.active);
    }

    #[test]
    fn test_payload_validation() {
        let payload: ProductPayload = serde_json::from_value(json!({
            "sku": "CAM-002", "name": "Camisa azul", "price": "59900", "stock": 4, "discount_pct": "15"
        })).unwrap();
        let draft = payload.clone().into_draft(&Currency::default()).unwrap();
        assert_eq!(draft.currency.as_str(), "COP");
        assert!(draft.active);
        assert_eq!(draft.discount, DiscountTerms::new(Some(Decimal::new(15, 0)), false));

        let mut negative = payload.clone();
        negative.price = Decimal::new(-1, 0);
        assert!(negative.into_draft(&Currency::default()).is_err());

        let mut too_much = payload.clone();
        too_much.discount_pct = Some(Decimal::new(101, 0));
        assert!(too_much.into_draft(&Currency::default()).is_err());

        let mut lowercase_store_code = payload.clone();
        lowercase_store_code.currency = Some("cop".into());
        assert!(lowercase_store_code.into_draft(&Currency::default()).is_ok());

        let mut foreign = payload.clone();
        foreign.currency = Some("USD".into());
        assert_eq!(
            foreign.into_draft(&Currency::default()),
            Err(ProductError::Invalid("currency must be COP, got USD".into()))
        );

        let mut no_stock = payload;
        no_stock.stock = -1;
        assert!(no_stock.into_draft(&Currency::default()).is_err());
    }
}
