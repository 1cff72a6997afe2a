//! # Product Repository
//!
//! Database operations for the product catalog.
//!
//! ## Key Operations
//! - Lookup by id (cart adds) and by code (typed/scanned at the register)
//! - Substring search over name and code
//! - CRUD operations
//!
//! Deleting a product never touches history: bill items keep their own
//! name/price snapshot and have no foreign key to `products`.

use billbook_core::{Money, Product};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use super::like_pattern;
use crate::error::{DbError, DbResult};

const PRODUCT_COLUMNS: &str = "id, name, code, unit, price_cents, category, created_at, updated_at";

#[derive(Debug, FromRow)]
struct ProductRow {
    id: String,
    name: String,
    code: String,
    unit: String,
    price_cents: i64,
    category: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            code: row.code,
            unit: row.unit,
            price: Money::from_cents(row.price_cents),
            category: row.category,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
/// let results = repo.search("rice", 20).await?;
/// let oil = repo.get_by_code("OIL-1L").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Searches products by name or code (case-insensitive substring).
    ///
    /// An empty query lists the catalog alphabetically.
    pub async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<Product>> {
        let query = query.trim();

        debug!(query = %query, limit = %limit, "Searching products");

        if query.is_empty() {
            return self.list(limit).await;
        }

        let pattern = like_pattern(query);
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE name LIKE ?1 ESCAPE '\' OR code LIKE ?1 ESCAPE '\'
            ORDER BY
                CASE WHEN code = ?2 COLLATE NOCASE THEN 0 ELSE 1 END,
                name COLLATE NOCASE
            LIMIT ?3
            "#
        ))
        .bind(&pattern)
        .bind(query)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Lists products alphabetically.
    pub async fn list(&self, limit: u32) -> DbResult<Vec<Product>> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name COLLATE NOCASE LIMIT ?1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Gets a product by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    /// Gets a product by its exact code (case-insensitive).
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Product>> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE code = ?1 COLLATE NOCASE"
        ))
        .bind(code.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - code already exists
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(code = %product.code, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, code, unit, price_cents, category, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.code)
        .bind(&product.unit)
        .bind(product.price.cents())
        .bind(&product.category)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| duplicate_code(e, &product.code))?;

        Ok(())
    }

    /// Updates an existing product.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - Product doesn't exist
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                code = ?3,
                unit = ?4,
                price_cents = ?5,
                category = ?6,
                updated_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.code)
        .bind(&product.unit)
        .bind(product.price.cents())
        .bind(&product.category)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| duplicate_code(e, &product.code))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(())
    }

    /// Deletes a product. Returns `false` if it did not exist.
    pub async fn delete(&self, id: &str) -> DbResult<bool> {
        debug!(id = %id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Counts products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Attaches the offending code to a UNIQUE violation.
fn duplicate_code(err: sqlx::Error, code: &str) -> DbError {
    match DbError::from(err) {
        DbError::UniqueViolation { field, .. } => DbError::duplicate(field, code),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let db = db().await;
        let rice = Product::new("Basmati Rice", "RICE", "kg", Money::from_cents(12000));
        db.products().insert(&rice).await.unwrap();

        let by_id = db.products().get_by_id(&rice.id).await.unwrap().unwrap();
        assert_eq!(by_id.name, "Basmati Rice");
        assert_eq!(by_id.price, Money::from_cents(12000));

        let by_code = db.products().get_by_code("rice").await.unwrap().unwrap();
        assert_eq!(by_code.id, rice.id);

        assert!(db.products().get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected() {
        let db = db().await;
        let first = Product::new("Sugar", "SUG", "kg", Money::from_cents(4500));
        let second = Product::new("Brown Sugar", "SUG", "kg", Money::from_cents(6000));
        db.products().insert(&first).await.unwrap();

        let err = db.products().insert(&second).await.unwrap_err();
        assert!(err.is_duplicate_of("products.code"));
        assert!(matches!(err, DbError::UniqueViolation { value, .. } if value == "SUG"));
    }

    #[tokio::test]
    async fn test_search_by_name_and_code() {
        let db = db().await;
        for (name, code) in [("Sunflower Oil", "OIL-1L"), ("Rice", "RICE"), ("Rice Flour", "RF")] {
            db.products()
                .insert(&Product::new(name, code, "pcs", Money::from_cents(100)))
                .await
                .unwrap();
        }

        let hits = db.products().search("rice", 10).await.unwrap();
        assert_eq!(hits.len(), 2);
        // Exact code match first.
        assert_eq!(hits[0].code, "RICE");

        let hits = db.products().search("oil-", 10).await.unwrap();
        assert_eq!(hits.len(), 1);

        let all = db.products().search("  ", 10).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].name, "Rice");
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let db = db().await;
        let mut salt = Product::new("Salt", "SALT", "pcs", Money::from_cents(2000));
        db.products().insert(&salt).await.unwrap();

        salt.price = Money::from_cents(2200);
        db.products().update(&salt).await.unwrap();
        let stored = db.products().get_by_id(&salt.id).await.unwrap().unwrap();
        assert_eq!(stored.price, Money::from_cents(2200));

        assert!(db.products().delete(&salt.id).await.unwrap());
        assert!(!db.products().delete(&salt.id).await.unwrap());
        assert_eq!(db.products().count().await.unwrap(), 0);

        let err = db.products().update(&salt).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
