//! # Catalog Service
//!
//! Validated product and customer management plus the store settings
//! screen. Repositories store whatever they are given; the rules live here.
//!
//! ## Customer Deletion
//! A customer with any bill on record (paid, owed or held) cannot be
//! deleted. The check here gives a friendly error; the `ON DELETE RESTRICT`
//! foreign key stops anything that slips past it.

use std::collections::HashMap;

use tracing::info;

use billbook_core::validation::{validate_customer, validate_product, validate_search_query};
use billbook_core::{Customer, Product};
use billbook_db::{Database, DbError};

use crate::config::StoreConfig;
use crate::error::{RegisterError, RegisterResult};

#[derive(Debug, Clone)]
pub struct CatalogService {
    db: Database,
}

impl CatalogService {
    pub fn new(db: Database) -> Self {
        CatalogService { db }
    }

    // =========================================================================
    // Products
    // =========================================================================

    pub async fn add_product(&self, product: Product) -> RegisterResult<Product> {
        validate_product(&product)?;
        self.db
            .products()
            .insert(&product)
            .await
            .map_err(duplicate)?;
        info!(code = %product.code, price = %product.price, "Product added");
        Ok(product)
    }

    pub async fn update_product(&self, product: &Product) -> RegisterResult<()> {
        validate_product(product)?;
        self.db.products().update(product).await.map_err(duplicate)
    }

    /// Bills keep their own snapshot, so deleting a sold product is fine.
    pub async fn delete_product(&self, id: &str) -> RegisterResult<()> {
        if !self.db.products().delete(id).await? {
            return Err(RegisterError::not_found("Product", id));
        }
        info!(id = %id, "Product deleted");
        Ok(())
    }

    pub async fn get_product(&self, id: &str) -> RegisterResult<Product> {
        self.db
            .products()
            .get_by_id(id)
            .await?
            .ok_or_else(|| RegisterError::not_found("Product", id))
    }

    /// Exact code lookup (barcode scan or typed code).
    pub async fn find_product_by_code(&self, code: &str) -> RegisterResult<Option<Product>> {
        Ok(self.db.products().get_by_code(code).await?)
    }

    pub async fn search_products(&self, query: &str, limit: u32) -> RegisterResult<Vec<Product>> {
        let query = validate_search_query(query)?;
        Ok(self.db.products().search(&query, limit).await?)
    }

    pub async fn list_products(&self, limit: u32) -> RegisterResult<Vec<Product>> {
        Ok(self.db.products().list(limit).await?)
    }

    // =========================================================================
    // Customers
    // =========================================================================

    /// ## Errors
    /// * `RegisterError::Duplicate` - phone already registered
    pub async fn add_customer(&self, customer: Customer) -> RegisterResult<Customer> {
        validate_customer(&customer)?;
        self.db
            .customers()
            .insert(&customer)
            .await
            .map_err(duplicate)?;
        info!(id = %customer.id, "Customer added");
        Ok(customer)
    }

    pub async fn update_customer(&self, customer: &Customer) -> RegisterResult<()> {
        validate_customer(customer)?;
        self.db.customers().update(customer).await.map_err(duplicate)
    }

    /// ## Errors
    /// * `RegisterError::CustomerHasBills` - bills reference the customer
    /// * `RegisterError::NotFound` - no such customer
    pub async fn delete_customer(&self, id: &str) -> RegisterResult<()> {
        let customer = self.get_customer(id).await?;

        let bill_count = self.db.customers().bill_count(id).await?;
        if bill_count > 0 {
            return Err(RegisterError::CustomerHasBills {
                name: customer.name,
                bill_count,
            });
        }

        match self.db.customers().delete(id).await {
            Ok(true) => {
                info!(id = %id, "Customer deleted");
                Ok(())
            }
            Ok(false) => Err(RegisterError::not_found("Customer", id)),
            // A bill was written between the count and the delete.
            Err(DbError::ForeignKeyViolation { .. }) => {
                let bill_count = self.db.customers().bill_count(id).await?;
                Err(RegisterError::CustomerHasBills {
                    name: customer.name,
                    bill_count,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_customer(&self, id: &str) -> RegisterResult<Customer> {
        self.db
            .customers()
            .get_by_id(id)
            .await?
            .ok_or_else(|| RegisterError::not_found("Customer", id))
    }

    pub async fn find_customer_by_phone(&self, phone: &str) -> RegisterResult<Option<Customer>> {
        Ok(self.db.customers().get_by_phone(phone).await?)
    }

    pub async fn search_customers(&self, query: &str, limit: u32) -> RegisterResult<Vec<Customer>> {
        let query = validate_search_query(query)?;
        Ok(self.db.customers().search(&query, limit).await?)
    }

    pub async fn list_customers(&self) -> RegisterResult<Vec<Customer>> {
        Ok(self.db.customers().list().await?)
    }

    // =========================================================================
    // Settings
    // =========================================================================

    pub async fn settings(&self) -> RegisterResult<HashMap<String, String>> {
        Ok(self.db.settings().all().await?)
    }

    /// Stores every field of `store` in the settings table.
    pub async fn save_store_config(&self, store: &StoreConfig) -> RegisterResult<()> {
        let settings = self.db.settings();
        for (key, value) in store.to_settings() {
            settings.set(key, &value).await?;
        }
        info!(store_name = %store.store_name, "Store settings saved");
        Ok(())
    }
}

fn duplicate(err: DbError) -> RegisterError {
    match err {
        DbError::UniqueViolation { field, value } => RegisterError::Duplicate { field, value },
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use billbook_core::Money;
    use billbook_db::DbConfig;

    async fn service() -> CatalogService {
        CatalogService::new(Database::new(DbConfig::in_memory()).await.unwrap())
    }

    #[tokio::test]
    async fn test_add_product_validates() {
        let catalog = service().await;

        let err = catalog
            .add_product(Product::new("  ", "RICE", "kg", Money::from_cents(100)))
            .await
            .unwrap_err();
        assert!(matches!(err, RegisterError::Core(_)));

        let err = catalog
            .add_product(Product::new("Rice", "RICE", "kg", Money::from_cents(-1)))
            .await
            .unwrap_err();
        assert!(matches!(err, RegisterError::Core(_)));

        assert!(catalog.list_products(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_code_and_phone() {
        let catalog = service().await;
        catalog
            .add_product(Product::new("Rice", "RICE", "kg", Money::from_cents(6000)))
            .await
            .unwrap();
        let err = catalog
            .add_product(Product::new("Red Rice", "RICE", "kg", Money::from_cents(7000)))
            .await
            .unwrap_err();
        assert!(matches!(err, RegisterError::Duplicate { ref value, .. } if value == "RICE"));

        catalog
            .add_customer(Customer::new("Meena", Some("9840012345".to_string()), None))
            .await
            .unwrap();
        let err = catalog
            .add_customer(Customer::new("Mina", Some("9840012345".to_string()), None))
            .await
            .unwrap_err();
        assert!(matches!(err, RegisterError::Duplicate { .. }));
    }

    #[tokio::test]
    async fn test_delete_missing_entities() {
        let catalog = service().await;
        assert!(matches!(
            catalog.delete_product("nope").await.unwrap_err(),
            RegisterError::NotFound { .. }
        ));
        assert!(matches!(
            catalog.delete_customer("nope").await.unwrap_err(),
            RegisterError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_search_rejects_overlong_query() {
        let catalog = service().await;
        let err = catalog
            .search_products(&"x".repeat(500), 10)
            .await
            .unwrap_err();
        assert!(matches!(err, RegisterError::Core(_)));
    }

    #[tokio::test]
    async fn test_save_store_config() {
        let catalog = service().await;
        let store = StoreConfig {
            store_name: "Lakshmi Stores".to_string(),
            ..StoreConfig::default()
        };
        catalog.save_store_config(&store).await.unwrap();

        let settings = catalog.settings().await.unwrap();
        assert_eq!(settings["store_name"], "Lakshmi Stores");
        assert_eq!(settings["tax_percent"], "0");
    }
}
