//! # Application Wiring
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Register Startup                                  │
//! │                                                                         │
//! │  1. RegisterConfig::load ─── defaults ◄ register.toml ◄ BILLBOOK_* env  │
//! │                                                                         │
//! │  2. Connect to Database ──── WAL, foreign keys, run migrations          │
//! │                                                                         │
//! │  3. Overlay settings table ─ env still wins                             │
//! │                                                                         │
//! │  4. Build services ───────── Register (cart + lifecycle)                │
//! │                              CatalogService (products, customers)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use tracing::info;

use billbook_db::{Database, DbConfig};

use crate::catalog::CatalogService;
use crate::config::{RegisterConfig, StoreConfig};
use crate::error::RegisterResult;
use crate::printer::ReceiptPrinter;
use crate::register::Register;

/// Everything a front end needs, wired to one database.
pub struct Billbook {
    pub db: Database,
    pub config: RegisterConfig,
    pub register: Register,
    pub catalog: CatalogService,
}

impl Billbook {
    /// Opens the configured database and builds the services.
    pub async fn open(
        config: RegisterConfig,
        printer: Arc<dyn ReceiptPrinter>,
    ) -> RegisterResult<Self> {
        let path = config.database_path()?;
        info!(?path, "Opening register database");

        let db = Database::new(
            DbConfig::new(path).max_connections(config.database.max_connections),
        )
        .await?;

        Self::with_database(db, config, printer).await
    }

    /// Builds the services on an already open database.
    pub async fn with_database(
        db: Database,
        mut config: RegisterConfig,
        printer: Arc<dyn ReceiptPrinter>,
    ) -> RegisterResult<Self> {
        config.overlay_settings(&db.settings().all().await?);

        let register = Register::new(
            Arc::new(db.bills()),
            Arc::new(db.clone()),
            printer,
            config.store.clone(),
        )
        .await?;

        info!(store_name = %config.store.store_name, "Register ready");

        Ok(Billbook {
            catalog: CatalogService::new(db.clone()),
            db,
            config,
            register,
        })
    }

    /// Saves store settings and applies them to the running register.
    pub async fn update_store_config(&mut self, store: StoreConfig) -> RegisterResult<()> {
        self.catalog.save_store_config(&store).await?;
        self.register.set_store_config(store.clone());
        self.config.store = store;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::printer::NoOpPrinter;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn test_settings_table_overrides_file_config() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.settings().set("store_name", "From Settings").await.unwrap();
        db.settings().set("tax_percent", "5").await.unwrap();

        let mut config = RegisterConfig::default();
        config.store.receipt_footer = "Visit again".to_string();

        let app = Billbook::with_database(db, config, Arc::new(NoOpPrinter))
            .await
            .unwrap();

        if std::env::var("BILLBOOK_STORE_NAME").is_err() {
            assert_eq!(app.config.store.store_name, "From Settings");
        }
        assert_eq!(app.config.store.receipt_footer, "Visit again");
        assert_eq!(app.register.store_config(), app.config.store);
    }

    #[tokio::test]
    async fn test_update_store_config_persists() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut app = Billbook::with_database(db, RegisterConfig::default(), Arc::new(NoOpPrinter))
            .await
            .unwrap();

        let store = StoreConfig {
            store_phone: "044-2345-6789".to_string(),
            tax_percent: Decimal::from(18),
            ..StoreConfig::default()
        };
        app.update_store_config(store.clone()).await.unwrap();

        assert_eq!(app.register.store_config(), store);
        let settings = app.db.settings().all().await.unwrap();
        assert_eq!(settings["store_phone"], "044-2345-6789");
        assert_eq!(settings["tax_percent"], "18");
    }
}
