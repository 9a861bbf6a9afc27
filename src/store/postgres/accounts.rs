//! Customers and sessions.

use chrono::{DateTime, Utc};
use crate::domain::aggregates::{CustomerRow, Registration, Role};
use crate::store::StoreError;
use super::PgStore;

const CUSTOMER_COLUMNS: &str =
    "c.id, c.first_name, c.last_name, c.email, c.phone, c.password_hash, c.role, c.created_at, c.updated_at";

impl PgStore {
    /// Inserts a customer; a duplicate email surfaces as a unique violation.
    pub async fn create_customer(&self, reg: &Registration, password_hash: &str) -> Result<CustomerRow, StoreError> {
        let sql = format!(
            "INSERT INTO customers AS c (first_name, last_name, email, phone, password_hash, role) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {CUSTOMER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, CustomerRow>(&sql)
            .bind(&reg.first_name)
            .bind(&reg.last_name)
            .bind(&reg.email)
            .bind(&reg.phone)
            .bind(password_hash)
            .bind(reg.role.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn find_customer_by_email(&self, email: &str) -> Result<Option<CustomerRow>, StoreError> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers c WHERE c.email = $1 LIMIT 1");
        Ok(sqlx::query_as::<_, CustomerRow>(&sql).bind(email).fetch_optional(&self.pool).await?)
    }

    pub async fn find_customer(&self, id: i64) -> Result<Option<CustomerRow>, StoreError> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers c WHERE c.id = $1");
        Ok(sqlx::query_as::<_, CustomerRow>(&sql).bind(id).fetch_optional(&self.pool).await?)
    }

    pub async fn list_customers(&self, limit: i64) -> Result<Vec<CustomerRow>, StoreError> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers c ORDER BY c.created_at DESC, c.id DESC LIMIT $1");
        Ok(sqlx::query_as::<_, CustomerRow>(&sql).bind(limit).fetch_all(&self.pool).await?)
    }

    pub async fn update_profile(&self, id: i64, first_name: &str, phone: Option<&str>) -> Result<bool, StoreError> {
        let done = sqlx::query("UPDATE customers SET first_name = $2, phone = $3, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(first_name)
            .bind(phone)
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected() > 0)
    }

    pub async fn set_password_hash(&self, id: i64, password_hash: &str) -> Result<bool, StoreError> {
        let done = sqlx::query("UPDATE customers SET password_hash = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected() > 0)
    }

    /// Creates the account, or promotes an existing one and resets its password.
    pub async fn upsert_admin(&self, email: &str, password_hash: &str) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO customers (first_name, last_name, email, password_hash, role) \
             VALUES ('Admin', 'Principal', $1, $2, $3) \
             ON CONFLICT (email) DO UPDATE SET password_hash = EXCLUDED.password_hash, role = EXCLUDED.role, updated_at = NOW()",
        )
        .bind(email)
        .bind(password_hash)
        .bind(Role::Admin.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn create_session(&self, token_hash: &str, customer_id: i64, expires_at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO sessions (token_hash, customer_id, expires_at) VALUES ($1, $2, $3)")
            .bind(token_hash)
            .bind(customer_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Owner of a live session, if the token hash is known and not expired.
    pub async fn session_customer(&self, token_hash: &str) -> Result<Option<CustomerRow>, StoreError> {
        let sql = format!(
            "SELECT {CUSTOMER_COLUMNS} FROM sessions s JOIN customers c ON c.id = s.customer_id \
             WHERE s.token_hash = $1 AND s.expires_at > NOW()"
        );
        Ok(sqlx::query_as::<_, CustomerRow>(&sql).bind(token_hash).fetch_optional(&self.pool).await?)
    }

    pub async fn purge_expired_sessions(&self) -> Result<u64, StoreError> {
        let done = sqlx::query("DELETE FROM sessions WHERE expires_at <= NOW()").execute(&self.pool).await?;
        Ok(done.rows_affected())
    }
}
