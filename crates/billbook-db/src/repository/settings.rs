//! # Settings Repository
//!
//! Key/value strings edited from the store settings screen. Typed access
//! lives in `billbook-register` (`StoreConfig`); this layer only stores text.

use std::collections::HashMap;

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;

#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SettingsRepository { pool }
    }

    pub async fn get(&self, key: &str) -> DbResult<Option<String>> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(value)
    }

    /// Inserts or replaces a setting.
    pub async fn set(&self, key: &str, value: &str) -> DbResult<()> {
        debug!(key = %key, "Saving setting");

        sqlx::query(
            r#"
            INSERT INTO settings (key, value) VALUES (?1, ?2)
            ON CONFLICT (key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Removes a setting. Returns `false` if it was not set.
    pub async fn remove(&self, key: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM settings WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Every stored setting.
    pub async fn all(&self) -> DbResult<HashMap<String, String>> {
        let rows: Vec<(String, String)> = sqlx::query_as("SELECT key, value FROM settings")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_set_get_overwrite_remove() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let settings = db.settings();

        assert!(settings.get("store_name").await.unwrap().is_none());

        settings.set("store_name", "Corner Store").await.unwrap();
        settings.set("store_name", "Lakshmi Stores").await.unwrap();
        settings.set("tax_percent", "5").await.unwrap();

        assert_eq!(
            settings.get("store_name").await.unwrap().as_deref(),
            Some("Lakshmi Stores")
        );

        let all = settings.all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all["tax_percent"], "5");

        assert!(settings.remove("tax_percent").await.unwrap());
        assert!(!settings.remove("tax_percent").await.unwrap());
    }
}
