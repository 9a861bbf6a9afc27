//! Products, images and categories.

use crate::domain::aggregates::{Category, CategoryDraft, ProductDraft, ProductRow};
use crate::domain::pricing::DiscountTerms;
use crate::store::StoreError;
use super::PgStore;

const PRODUCT_SELECT: &str = "\
    SELECT p.id, p.sku, p.name, p.description, p.price, p.currency, p.stock, p.active, p.category_id, \
           p.discount_pct, p.discount_active, \
           c.discount_pct AS category_discount_pct, c.discount_active AS category_discount_active, \
           COALESCE( \
             (SELECT i.url FROM product_images i WHERE i.product_id = p.id AND i.is_primary ORDER BY i.id LIMIT 1), \
             (SELECT i.url FROM product_images i WHERE i.product_id = p.id ORDER BY i.id LIMIT 1) \
           ) AS image_url, \
           p.created_at, p.updated_at \
    FROM products p \
    LEFT JOIN categories c ON c.id = p.category_id";

const CATEGORY_COLUMNS: &str =
    "id, name, slug, description, active, discount_pct, discount_active, created_at, updated_at";

impl PgStore {
    pub async fn list_products(&self, include_inactive: bool, category_id: Option<i64>) -> Result<Vec<ProductRow>, StoreError> {
        let sql = format!(
            "{PRODUCT_SELECT} WHERE ($1 OR p.active) AND ($2::BIGINT IS NULL OR p.category_id = $2) ORDER BY p.name ASC, p.id ASC"
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(include_inactive)
            .bind(category_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn get_product(&self, id: i64) -> Result<Option<ProductRow>, StoreError> {
        let sql = format!("{PRODUCT_SELECT} WHERE p.id = $1");
        Ok(sqlx::query_as::<_, ProductRow>(&sql).bind(id).fetch_optional(&self.pool).await?)
    }

    pub async fn create_product(&self, draft: &ProductDraft) -> Result<i64, StoreError> {
        let mut tx = self.pool.begin().await?;
        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO products (sku, name, description, price, currency, stock, active, category_id, discount_pct, discount_active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING id",
        )
        .bind(draft.sku.as_str())
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(draft.price)
        .bind(draft.currency.as_str())
        .bind(draft.stock)
        .bind(draft.active)
        .bind(draft.category_id)
        .bind(draft.discount.pct)
        .bind(draft.discount.active)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(url) = draft.image_url.as_deref().filter(|u| !u.is_empty()) {
            sqlx::query("INSERT INTO product_images (product_id, url, is_primary, position) VALUES ($1, $2, TRUE, 0)")
                .bind(id)
                .bind(url)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(id)
    }

    /// Returns `false` when no product has this id.
    pub async fn update_product(&self, id: i64, draft: &ProductDraft) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;
        let updated = sqlx::query(
            "UPDATE products SET sku = $2, name = $3, description = $4, price = $5, currency = $6, stock = $7, \
             active = $8, category_id = $9, discount_pct = $10, discount_active = $11, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(draft.sku.as_str())
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(draft.price)
        .bind(draft.currency.as_str())
        .bind(draft.stock)
        .bind(draft.active)
        .bind(draft.category_id)
        .bind(draft.discount.pct)
        .bind(draft.discount.active)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        match draft.image_url.as_deref() {
            None => {}
            Some("") => {
                sqlx::query("DELETE FROM product_images WHERE product_id = $1 AND is_primary")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
            }
            Some(url) => {
                let replaced = sqlx::query(
                    "UPDATE product_images SET url = $2, updated_at = NOW() WHERE product_id = $1 AND is_primary",
                )
                .bind(id)
                .bind(url)
                .execute(&mut *tx)
                .await?;
                if replaced.rows_affected() == 0 {
                    sqlx::query("INSERT INTO product_images (product_id, url, is_primary, position) VALUES ($1, $2, TRUE, 0)")
                        .bind(id)
                        .bind(url)
                        .execute(&mut *tx)
                        .await?;
                }
            }
        }
        tx.commit().await?;
        Ok(true)
    }

    /// Soft delete: the row stays for order history.
    pub async fn deactivate_product(&self, id: i64) -> Result<bool, StoreError> {
        let done = sqlx::query("UPDATE products SET active = FALSE, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected() > 0)
    }

    /// Overwrites the own discount of every product row, active or not.
    pub async fn apply_discount_to_all_products(&self, terms: DiscountTerms) -> Result<u64, StoreError> {
        let done = sqlx::query("UPDATE products SET discount_pct = $1, discount_active = $2, updated_at = NOW()")
            .bind(terms.pct)
            .bind(terms.active)
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected())
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY name ASC, id ASC");
        Ok(sqlx::query_as::<_, Category>(&sql).fetch_all(&self.pool).await?)
    }

    pub async fn create_category(&self, draft: &CategoryDraft) -> Result<i64, StoreError> {
        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO categories (name, slug, description, active, discount_pct, discount_active) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
        )
        .bind(&draft.name)
        .bind(&draft.slug)
        .bind(&draft.description)
        .bind(draft.active)
        .bind(draft.discount.pct)
        .bind(draft.discount.active)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    pub async fn update_category(&self, id: i64, draft: &CategoryDraft) -> Result<bool, StoreError> {
        let done = sqlx::query(
            "UPDATE categories SET name = $2, slug = $3, description = $4, active = $5, discount_pct = $6, \
             discount_active = $7, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(&draft.name)
        .bind(&draft.slug)
        .bind(&draft.description)
        .bind(draft.active)
        .bind(draft.discount.pct)
        .bind(draft.discount.active)
        .execute(&self.pool)
        .await?;
        Ok(done.rows_affected() > 0)
    }

    pub async fn set_category_discount(&self, id: i64, terms: DiscountTerms) -> Result<bool, StoreError> {
        let done = sqlx::query("UPDATE categories SET discount_pct = $2, discount_active = $3, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(terms.pct)
            .bind(terms.active)
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected() > 0)
    }

    /// Overwrites the discount of every category row.
    pub async fn apply_discount_to_all_categories(&self, terms: DiscountTerms) -> Result<u64, StoreError> {
        let done = sqlx::query("UPDATE categories SET discount_pct = $1, discount_active = $2, updated_at = NOW()")
            .bind(terms.pct)
            .bind(terms.active)
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected())
    }
}
