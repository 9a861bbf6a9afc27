//! Effective price resolution.
//!
//! Catalog responses and checkout both price through [`effective_price`], so the
//! price a customer sees is the price the order is charged.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A discount percentage together with its on/off switch, as stored on a
/// product or a category.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountTerms {
    pub pct: Option<Decimal>,
    pub active: bool,
}

impl DiscountTerms {
    pub fn new(pct: Option<Decimal>, active: bool) -> Self { Self { pct, active } }

    pub fn none() -> Self { Self::default() }

    /// The percentage this discount contributes, if it applies at all.
    pub fn applicable_pct(&self) -> Option<Decimal> {
        match self.pct {
            Some(pct) if self.active && pct > Decimal::ZERO => Some(pct),
            _ => None,
        }
    }
}

/// Percentage to apply: the product's own discount wins, then the category's, else zero.
pub fn resolve_discount_pct(product: &DiscountTerms, category: Option<&DiscountTerms>) -> Decimal {
    product
        .applicable_pct()
        .or_else(|| category.and_then(DiscountTerms::applicable_pct))
        .unwrap_or(Decimal::ZERO)
}

/// `round(base * (1 - pct/100), 2)`, rounding half away from zero.
pub fn apply_discount(base: Decimal, pct: Decimal) -> Decimal {
    let factor = Decimal::ONE - pct / Decimal::ONE_HUNDRED;
    (base * factor).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub fn effective_price(base: Decimal, product: &DiscountTerms, category: Option<&DiscountTerms>) -> Decimal {
    apply_discount(base, resolve_discount_pct(product, category))
}

/// Effective price plus the percentage that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PriceQuote {
    pub base: Decimal,
    pub applied_discount_pct: Decimal,
    pub effective: Decimal,
}

impl PriceQuote {
    pub fn resolve(base: Decimal, product: &DiscountTerms, category: Option<&DiscountTerms>) -> Self {
        let applied_discount_pct = resolve_discount_pct(product, category);
        Self { base, applied_discount_pct, effective: apply_discount(base, applied_discount_pct) }
    }
}
