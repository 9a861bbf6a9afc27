//! Category Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;
use crate::domain::pricing::DiscountTerms;
use crate::domain::value_objects::{deserialize_flag, DiscountError, DiscountPct};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub active: bool,
    pub discount_pct: Option<Decimal>,
    pub discount_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    pub fn discount(&self) -> DiscountTerms { DiscountTerms::new(self.discount_pct, self.discount_active) }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CategoryPayload {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(length(min = 1, max = 120))]
    pub slug: String,
    pub description: Option<String>,
    #[serde(default = "default_true", deserialize_with = "deserialize_flag")]
    pub active: bool,
    pub discount_pct: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub discount_active: bool,
}

fn default_true() -> bool { true }

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryDraft {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub active: bool,
    pub discount: DiscountTerms,
}

impl CategoryPayload {
    /// An inactive discount is stored without a percentage.
    pub fn into_draft(self) -> Result<CategoryDraft, CategoryError> {
        self.validate().map_err(|e| CategoryError::Invalid(e.to_string()))?;
        if !self.slug.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(CategoryError::Invalid("slug may only contain letters, digits, '-' and '_'".into()));
        }
        let discount = DiscountUpdate { percentage: self.discount_pct, activate: self.discount_active }
            .into_terms()
            .map_err(CategoryError::Discount)?;
        Ok(CategoryDraft {
            name: self.name.trim().to_string(), slug: self.slug.to_lowercase(),
            description: self.description, active: self.active, discount,
        })
    }
}

/// Body of the single-category and bulk discount actions.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct DiscountUpdate {
    pub percentage: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub activate: bool,
}

impl DiscountUpdate {
    /// Activating needs a percentage in range; deactivating always clears it.
    pub fn into_terms(self) -> Result<DiscountTerms, DiscountError> {
        if !self.activate { return Ok(DiscountTerms::none()); }
        let pct = self.percentage.ok_or(DiscountError::MissingPercentage)?;
        Ok(DiscountTerms::new(Some(DiscountPct::new(pct)?.value()), true))
    }
}

#[derive(Debug, Clone, PartialEq)] pub enum CategoryError { Invalid(String), Discount(DiscountError) }
impl std::error::Error for CategoryError {}
impl std::fmt::Display for CategoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self { Self::Invalid(msg) => write!(f, "{msg}"), Self::Discount(e) => write!(f, "{e}") }
    }
}
