//! # Persistence Seams
//!
//! The register never touches SQL. It talks to two async traits:
//!
//! ```text
//! ┌────────────┐      BillStore       ┌──────────────────┐
//! │            │ ───────────────────► │ BillRepository   │  (SQLite)
//! │  Register  │                      └──────────────────┘
//! │            │      Catalog         ┌──────────────────┐
//! │            │ ───────────────────► │ Database         │  (products,
//! └────────────┘                      └──────────────────┘   customers)
//! ```
//!
//! Tests swap in in-memory implementations to inject storage failures.

use async_trait::async_trait;

use billbook_core::{Bill, BillFilter, BillItem, BillStatus, Customer, NewBill, Product};
use billbook_db::{BillRepository, Database, DbResult};

/// Storage for bills and their items.
#[async_trait]
pub trait BillStore: Send + Sync {
    /// Writes a bill and all items atomically. Returns the bill id.
    async fn save_bill(&self, bill: &NewBill) -> DbResult<String>;

    async fn get_bill(&self, id: &str) -> DbResult<Option<(Bill, Vec<BillItem>)>>;

    /// Returns `false` when no bill has this id.
    async fn update_bill_status(&self, id: &str, status: BillStatus) -> DbResult<bool>;

    /// Deletes a bill and its items. Returns `false` when no bill has this id.
    async fn delete_bill(&self, id: &str) -> DbResult<bool>;

    /// Matching bills, newest first.
    async fn query_bills(&self, filter: &BillFilter) -> DbResult<Vec<Bill>>;

    /// Items of the matching bills.
    async fn query_items(&self, filter: &BillFilter) -> DbResult<Vec<BillItem>>;

    /// Deletes every bill and item in one transaction. Returns bills deleted.
    async fn delete_all_bills(&self) -> DbResult<u64>;

    /// Most recently issued bill number, used to seed the number generator.
    async fn latest_bill_number(&self) -> DbResult<Option<String>>;
}

/// Read access to products and customers.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn lookup_product(&self, id: &str) -> DbResult<Option<Product>>;

    async fn lookup_customer(&self, id: &str) -> DbResult<Option<Customer>>;
}

#[async_trait]
impl BillStore for BillRepository {
    async fn save_bill(&self, bill: &NewBill) -> DbResult<String> {
        self.insert(bill).await
    }

    async fn get_bill(&self, id: &str) -> DbResult<Option<(Bill, Vec<BillItem>)>> {
        self.get_with_items(id).await
    }

    async fn update_bill_status(&self, id: &str, status: BillStatus) -> DbResult<bool> {
        self.update_status(id, status).await
    }

    async fn delete_bill(&self, id: &str) -> DbResult<bool> {
        self.delete(id).await
    }

    async fn query_bills(&self, filter: &BillFilter) -> DbResult<Vec<Bill>> {
        self.query(filter).await
    }

    async fn query_items(&self, filter: &BillFilter) -> DbResult<Vec<BillItem>> {
        BillRepository::query_items(self, filter).await
    }

    async fn delete_all_bills(&self) -> DbResult<u64> {
        self.delete_all().await
    }

    async fn latest_bill_number(&self) -> DbResult<Option<String>> {
        BillRepository::latest_bill_number(self).await
    }
}

#[async_trait]
impl Catalog for Database {
    async fn lookup_product(&self, id: &str) -> DbResult<Option<Product>> {
        self.products().get_by_id(id).await
    }

    async fn lookup_customer(&self, id: &str) -> DbResult<Option<Customer>> {
        self.customers().get_by_id(id).await
    }
}
