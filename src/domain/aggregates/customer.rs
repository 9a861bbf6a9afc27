//! Customer Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role { #[default] Customer, Admin }

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Customer => "customer", Self::Admin => "admin" }
    }
}

impl FromStr for Role {
    type Err = UnknownRole;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Self::Customer),
            "admin" => Ok(Self::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Debug, Clone)] pub struct UnknownRole(pub String);
impl std::error::Error for UnknownRole {}
impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "unknown role {:?}", self.0) }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CustomerRow {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password_hash: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CustomerRow {
    /// Unknown roles in the table are treated as plain customers.
    pub fn role(&self) -> Role { self.role.parse().unwrap_or_default() }
}

/// Customer as exposed over the API; never carries the password hash.
#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<CustomerRow> for Profile {
    fn from(row: CustomerRow) -> Self {
        let role = row.role();
        Self {
            id: row.id, first_name: row.first_name, last_name: row.last_name, email: row.email,
            phone: row.phone, role, created_at: row.created_at,
        }
    }
}

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Registration {
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[validate(email)]
    pub email: String,
    pub phone: Option<String>,
    #[validate(length(min = 6))]
    pub password: String,
    #[serde(default)]
    pub role: Role,
}

impl Registration {
    pub fn normalized(mut self) -> Self {
        self.first_name = self.first_name.trim().to_string();
        self.last_name = self.last_name.trim().to_string();
        self.email = normalize_email(&self.email);
        self.phone = self.phone.map(|p| p.trim().to_string()).filter(|p| !p.is_empty());
        self
    }
}

pub fn normalize_email(email: &str) -> String { email.trim().to_lowercase() }

/// Partial profile update. A blank phone clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub phone: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool { self.first_name.is_none() && self.phone.is_none() }

    /// Merges onto the current values, returning `(first_name, phone)`.
    pub fn apply(&self, current: &CustomerRow) -> Result<(String, Option<String>), &'static str> {
        let first_name = match &self.first_name {
            Some(name) if name.trim().is_empty() => return Err("first_name must not be blank"),
            Some(name) => name.trim().to_string(),
            None => current.first_name.clone(),
        };
        let phone = match &self.phone {
            Some(p) => Some(p.trim().to_string()).filter(|p| !p.is_empty()),
            None => current.phone.clone(),
        };
        Ok((first_name, phone))
    }
}
