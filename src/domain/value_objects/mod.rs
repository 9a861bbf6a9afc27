//! Value Objects for the storefront

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// SKU (Stock Keeping Unit) value object
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sku(String);

impl Sku {
    pub const MAX_LEN: usize = 64;

    pub fn new(value: impl Into<String>) -> Result<Self, SkuError> {
        let value = value.into().trim().to_string();
        if value.is_empty() { return Err(SkuError::Empty); }
        if value.len() > Self::MAX_LEN { return Err(SkuError::TooLong); }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
    pub fn into_inner(self) -> String { self.0 }
}

impl fmt::Display for Sku {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum SkuError { Empty, TooLong }
impl std::error::Error for SkuError {}
impl fmt::Display for SkuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::Empty => write!(f, "SKU empty"), Self::TooLong => write!(f, "SKU too long") }
    }
}

/// ISO-4217 style currency code. The store runs on a single one.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    pub fn new(code: &str) -> Result<Self, CurrencyError> {
        let code = code.trim().to_uppercase();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(CurrencyError(code));
        }
        Ok(Self(code))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl Default for Currency { fn default() -> Self { Self("COP".to_string()) } }

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl TryFrom<String> for Currency {
    type Error = CurrencyError;
    fn try_from(value: String) -> Result<Self, Self::Error> { Self::new(&value) }
}

impl From<Currency> for String {
    fn from(c: Currency) -> Self { c.0 }
}

#[derive(Debug, Clone)] pub struct CurrencyError(pub String);
impl std::error::Error for CurrencyError {}
impl fmt::Display for CurrencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "invalid currency code: {:?}", self.0) }
}

/// Discount percentage, always within 0..=100.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct DiscountPct(Decimal);

impl DiscountPct {
    pub fn new(value: Decimal) -> Result<Self, DiscountError> {
        if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED { return Err(DiscountError::OutOfRange(value)); }
        Ok(Self(value))
    }
    pub fn value(&self) -> Decimal { self.0 }
}

impl TryFrom<Decimal> for DiscountPct {
    type Error = DiscountError;
    fn try_from(value: Decimal) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<DiscountPct> for Decimal {
    fn from(p: DiscountPct) -> Self { p.0 }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum DiscountError { OutOfRange(Decimal), MissingPercentage }
impl std::error::Error for DiscountError {}
impl fmt::Display for DiscountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange(v) => write!(f, "discount percentage {v} outside 0-100"),
            Self::MissingPercentage => write!(f, "an active discount needs a percentage"),
        }
    }
}

/// Deserializes an on/off switch sent as `true`/`false`, `1`/`0` or their string forms.
pub fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag { Bool(bool), Int(i64), Text(String) }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => Ok(b),
        Flag::Int(0) => Ok(false),
        Flag::Int(1) => Ok(true),
        Flag::Text(t) => match t.trim().to_ascii_lowercase().as_str() {
            "1" | "true" => Ok(true),
            "0" | "false" => Ok(false),
            other => Err(serde::de::Error::custom(format!("invalid flag {other:?}"))),
        },
        Flag::Int(n) => Err(serde::de::Error::custom(format!("invalid flag {n}"))),
    }
}
