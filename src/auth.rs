//! Authentication: password hashing and bearer sessions.
//!
//! Passwords are stored as argon2 PHC strings. A session token is 32 random
//! bytes, base64url encoded; only its SHA-256 digest is persisted.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::info;
use crate::config::Config;
use crate::domain::aggregates::{customer::normalize_email, Role};
use crate::store::{PgStore, StoreError};

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,

    #[error("session invalid or expired")]
    InvalidSession,

    #[error("admin role required")]
    Forbidden,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);
    let salt = SaltString::encode_b64(&salt).map_err(|e| AuthError::Hashing(e.to_string()))?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthError::Hashing(e.to_string()))?;
    Ok(hash.to_string())
}

/// `false` for a wrong password and for a hash that does not parse.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok(),
        Err(_) => false,
    }
}

/// Argon2 is deliberately slow; keep it off the async workers.
pub async fn hash_password_blocking(password: String) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AuthError::Hashing(e.to_string()))?
}

pub async fn verify_password_blocking(password: String, stored_hash: String) -> bool {
    tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
        .await
        .unwrap_or(false)
}

#[derive(Debug, Clone)]
pub struct SessionToken {
    pub token: String,
    pub hash: String,
}

impl SessionToken {
    pub fn generate() -> Self {
        let mut raw = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut raw);
        let token = URL_SAFE_NO_PAD.encode(raw);
        let hash = Self::digest(&token);
        Self { token, hash }
    }

    pub fn digest(token: &str) -> String { format!("{:x}", Sha256::digest(token.as_bytes())) }
}

/// Creates a session for the customer and returns the bearer token to hand out.
pub async fn issue_session(store: &PgStore, customer_id: i64, ttl_hours: i64) -> Result<String, AuthError> {
    let session = SessionToken::generate();
    store.create_session(&session.hash, customer_id, Utc::now() + Duration::hours(ttl_hours)).await?;
    Ok(session.token)
}

/// Token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Makes sure the configured admin account exists with the admin role.
/// Does nothing unless `ADMIN_PASSWORD` is set.
pub async fn bootstrap_admin(store: &PgStore, config: &Config) -> Result<(), AuthError> {
    let Some(password) = config.admin_password.clone() else { return Ok(()) };
    let email = normalize_email(&config.admin_email);
    if let Some(existing) = store.find_customer_by_email(&email).await? {
        if existing.role() == Role::Admin && existing.password_hash.is_some() {
            return Ok(());
        }
    }
    let hash = hash_password_blocking(password).await?;
    store.upsert_admin(&email, &hash).await?;
    info!(%email, "admin account ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_and_verify() {
        let hash = hash_password("secreto123").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("secreto123", &hash));
        assert!(!verify_password("otra-clave", &hash));
        assert!(!verify_password("secreto123", "not-a-phc-string"));
        assert_ne!(hash, hash_password("secreto123").unwrap());
    }

    #[test]
    fn test_session_tokens() {
        let a = SessionToken::generate();
        let b = SessionToken::generate();
        assert_ne!(a.token, b.token);
        assert_eq!(a.hash, SessionToken::digest(&a.token));
        assert_eq!(a.hash.len(), 64);
        assert_eq!(a.token.len(), 43);
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("bearer   xyz "), Some("xyz"));
        assert_eq!(bearer_token("Basic dXNlcg=="), None);
        assert_eq!(bearer_token("Bearer"), None);
        assert_eq!(bearer_token(""), None);
    }
}
