//! # Bill Repository
//!
//! Database operations for bills and their item snapshots.
//!
//! ## Write Paths
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Bill Writes                                       │
//! │                                                                         │
//! │  insert(new_bill)        BEGIN                                         │
//! │                          ├── INSERT bills                               │
//! │                          ├── INSERT bill_items × n                      │
//! │                          COMMIT   (any failure → ROLLBACK, nothing kept)│
//! │                                                                         │
//! │  update_status(id, s)    UPDATE bills SET status (only mutable column) │
//! │                                                                         │
//! │  delete(id)              BEGIN, DELETE items, DELETE bill, COMMIT      │
//! │                                                                         │
//! │  delete_all()            BEGIN, DELETE all items, all bills, COMMIT    │
//! │                          customers / products / settings untouched     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Reads always return bills newest first.

use billbook_core::{Bill, BillFilter, BillItem, BillStatus, Money, NewBill, PaymentMethod};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, info};

use super::{parse_decimal, parse_percent};
use crate::error::{DbError, DbResult};

const BILL_COLUMNS: &str = "b.id, b.bill_number, b.customer_id, b.created_at, \
     b.subtotal_cents, b.discount_percent, b.discount_amount_cents, \
     b.tax_percent, b.tax_amount_cents, b.grand_total_cents, \
     b.payment_method, b.status";

const ITEM_COLUMNS: &str = "i.id, i.bill_id, i.product_id, i.product_name, i.quantity, \
     i.unit, i.unit_price_cents, i.line_total_cents";

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, FromRow)]
struct BillRow {
    id: String,
    bill_number: String,
    customer_id: Option<String>,
    created_at: DateTime<Utc>,
    subtotal_cents: i64,
    discount_percent: String,
    discount_amount_cents: i64,
    tax_percent: String,
    tax_amount_cents: i64,
    grand_total_cents: i64,
    payment_method: PaymentMethod,
    status: BillStatus,
}

impl TryFrom<BillRow> for Bill {
    type Error = DbError;

    fn try_from(row: BillRow) -> DbResult<Self> {
        Ok(Bill {
            discount_percent: parse_percent("bills.discount_percent", &row.discount_percent)?,
            tax_percent: parse_percent("bills.tax_percent", &row.tax_percent)?,
            id: row.id,
            bill_number: row.bill_number,
            customer_id: row.customer_id,
            created_at: row.created_at,
            subtotal: Money::from_cents(row.subtotal_cents),
            discount_amount: Money::from_cents(row.discount_amount_cents),
            tax_amount: Money::from_cents(row.tax_amount_cents),
            grand_total: Money::from_cents(row.grand_total_cents),
            payment_method: row.payment_method,
            status: row.status,
        })
    }
}

#[derive(Debug, FromRow)]
struct BillItemRow {
    id: String,
    bill_id: String,
    product_id: String,
    product_name: String,
    quantity: String,
    unit: String,
    unit_price_cents: i64,
    line_total_cents: i64,
}

impl TryFrom<BillItemRow> for BillItem {
    type Error = DbError;

    fn try_from(row: BillItemRow) -> DbResult<Self> {
        Ok(BillItem {
            quantity: parse_decimal("bill_items.quantity", &row.quantity)?,
            id: row.id,
            bill_id: row.bill_id,
            product_id: row.product_id,
            product_name: row.product_name,
            unit: row.unit,
            unit_price: Money::from_cents(row.unit_price_cents),
            line_total: Money::from_cents(row.line_total_cents),
        })
    }
}

fn into_bills(rows: Vec<BillRow>) -> DbResult<Vec<Bill>> {
    rows.into_iter().map(Bill::try_from).collect()
}

fn into_items(rows: Vec<BillItemRow>) -> DbResult<Vec<BillItem>> {
    rows.into_iter().map(BillItem::try_from).collect()
}

/// Appends `WHERE ...` for a filter on the `bills b` alias.
fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &BillFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(status) = filter.status {
        qb.push(" AND b.status = ").push_bind(status);
    }
    if let Some(method) = filter.payment_method {
        qb.push(" AND b.payment_method = ").push_bind(method);
    }
    if let Some(customer_id) = &filter.customer_id {
        qb.push(" AND b.customer_id = ").push_bind(customer_id.clone());
    }
    if let Some(since) = filter.since {
        qb.push(" AND b.created_at >= ").push_bind(since);
    }
    if filter.unpaid_debt_only {
        qb.push(" AND b.payment_method = ")
            .push_bind(PaymentMethod::Debt)
            .push(" AND b.status <> ")
            .push_bind(BillStatus::Paid);
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for bill database operations.
#[derive(Debug, Clone)]
pub struct BillRepository {
    pool: SqlitePool,
}

impl BillRepository {
    pub fn new(pool: SqlitePool) -> Self {
        BillRepository { pool }
    }

    /// Persists a bill and all its items atomically.
    ///
    /// ## Returns
    /// The bill id.
    ///
    /// ## Errors
    /// * `DbError::UniqueViolation` - bill number already used
    /// * `DbError::ForeignKeyViolation` - unknown customer id
    ///
    /// Either way nothing is written.
    pub async fn insert(&self, new_bill: &NewBill) -> DbResult<String> {
        let bill = &new_bill.bill;
        debug!(
            id = %bill.id,
            bill_number = %bill.bill_number,
            items = new_bill.items.len(),
            status = %bill.status,
            "Inserting bill"
        );

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO bills (
                id, bill_number, customer_id, created_at,
                subtotal_cents, discount_percent, discount_amount_cents,
                tax_percent, tax_amount_cents, grand_total_cents,
                payment_method, status
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6, ?7,
                ?8, ?9, ?10,
                ?11, ?12
            )
            "#,
        )
        .bind(&bill.id)
        .bind(&bill.bill_number)
        .bind(&bill.customer_id)
        .bind(bill.created_at)
        .bind(bill.subtotal.cents())
        .bind(bill.discount_percent.value().to_string())
        .bind(bill.discount_amount.cents())
        .bind(bill.tax_percent.value().to_string())
        .bind(bill.tax_amount.cents())
        .bind(bill.grand_total.cents())
        .bind(bill.payment_method)
        .bind(bill.status)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => {
                DbError::duplicate(field, bill.bill_number.clone())
            }
            other => other,
        })?;

        for (position, item) in new_bill.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO bill_items (
                    id, bill_id, position, product_id, product_name,
                    quantity, unit, unit_price_cents, line_total_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )
            .bind(&item.id)
            .bind(&bill.id)
            .bind(position as i64)
            .bind(&item.product_id)
            .bind(&item.product_name)
            .bind(item.quantity.to_string())
            .bind(&item.unit)
            .bind(item.unit_price.cents())
            .bind(item.line_total.cents())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(bill.id.clone())
    }

    /// Gets a bill header by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<Bill>> {
        let row: Option<BillRow> = sqlx::query_as(&format!(
            "SELECT {BILL_COLUMNS} FROM bills b WHERE b.id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Bill::try_from).transpose()
    }

    /// Gets the items of a bill in cart order.
    pub async fn items(&self, bill_id: &str) -> DbResult<Vec<BillItem>> {
        let rows: Vec<BillItemRow> = sqlx::query_as(&format!(
            "SELECT {ITEM_COLUMNS} FROM bill_items i WHERE i.bill_id = ?1 ORDER BY i.position"
        ))
        .bind(bill_id)
        .fetch_all(&self.pool)
        .await?;

        into_items(rows)
    }

    /// Gets a bill with its items.
    pub async fn get_with_items(&self, id: &str) -> DbResult<Option<(Bill, Vec<BillItem>)>> {
        let Some(bill) = self.get(id).await? else {
            return Ok(None);
        };
        let items = self.items(id).await?;
        Ok(Some((bill, items)))
    }

    /// Bills matching a filter, newest first.
    pub async fn query(&self, filter: &BillFilter) -> DbResult<Vec<Bill>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {BILL_COLUMNS} FROM bills b"));
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY b.created_at DESC, b.bill_number DESC");
        if let Some(limit) = filter.limit {
            qb.push(" LIMIT ").push_bind(limit);
        }

        let rows: Vec<BillRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        into_bills(rows)
    }

    /// Items of every bill matching a filter (`limit` is ignored).
    pub async fn query_items(&self, filter: &BillFilter) -> DbResult<Vec<BillItem>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {ITEM_COLUMNS} FROM bill_items i JOIN bills b ON b.id = i.bill_id"
        ));
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY b.created_at DESC, b.bill_number DESC, i.position");

        let rows: Vec<BillItemRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        into_items(rows)
    }

    /// Sets the status column. Returns `false` if the bill does not exist.
    pub async fn update_status(&self, id: &str, status: BillStatus) -> DbResult<bool> {
        debug!(id = %id, status = %status, "Updating bill status");

        let result = sqlx::query("UPDATE bills SET status = ?2 WHERE id = ?1")
            .bind(id)
            .bind(status)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes a bill and its items. Returns `false` if it did not exist.
    pub async fn delete(&self, id: &str) -> DbResult<bool> {
        debug!(id = %id, "Deleting bill");

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM bill_items WHERE bill_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM bills WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes every bill and item. Returns how many bills were removed.
    pub async fn delete_all(&self) -> DbResult<u64> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM bill_items").execute(&mut *tx).await?;
        let result = sqlx::query("DELETE FROM bills").execute(&mut *tx).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(bills = result.rows_affected(), "Deleted all bill history");
        Ok(result.rows_affected())
    }

    /// Highest stored bill number. Generated numbers sort chronologically.
    pub async fn latest_bill_number(&self) -> DbResult<Option<String>> {
        let number: Option<String> =
            sqlx::query_scalar("SELECT bill_number FROM bills ORDER BY bill_number DESC LIMIT 1")
                .fetch_optional(&self.pool)
                .await?;

        Ok(number)
    }

    /// Counts bills (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bills")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use billbook_core::{Cart, Customer, CustomerRef, Percent, Product};
    use chrono::Duration;
    use rust_decimal::Decimal;

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn cart() -> Cart {
        let mut cart = Cart::with_tax(Percent::clamped(Decimal::new(5, 0)));
        let rice = Product::new("Rice", "RICE", "kg", Money::from_cents(5000));
        let oil = Product::new("Oil", "OIL", "l", Money::from_cents(15000));
        cart.add_item(&rice, Decimal::new(15, 1)).unwrap();
        cart.add_item(&oil, Decimal::ONE).unwrap();
        cart.set_discount(Percent::clamped(Decimal::new(125, 1)));
        cart
    }

    fn commit(cart: &Cart, method: PaymentMethod, seq: u32, created_at: DateTime<Utc>) -> NewBill {
        NewBill::commit(cart, method, format!("BB-20260115-100000-{:03}", seq), created_at).unwrap()
    }

    async fn customer(db: &Database, name: &str) -> CustomerRef {
        let customer = Customer::new(name, None, None);
        db.customers().insert(&customer).await.unwrap();
        CustomerRef::from(&customer)
    }

    #[tokio::test]
    async fn test_insert_round_trips_bill_and_items() {
        let db = db().await;
        let new_bill = commit(&cart(), PaymentMethod::Upi, 1, Utc::now());

        let id = db.bills().insert(&new_bill).await.unwrap();
        let (bill, items) = db.bills().get_with_items(&id).await.unwrap().unwrap();

        assert_eq!(bill, new_bill.bill);
        assert_eq!(items, new_bill.items);
        assert_eq!(items[0].quantity, Decimal::new(15, 1));
        assert_eq!(bill.discount_percent.value(), Decimal::new(125, 1));
        assert_eq!(bill.payment_method, PaymentMethod::Upi);
    }

    #[tokio::test]
    async fn test_duplicate_bill_number_writes_nothing() {
        let db = db().await;
        let first = commit(&cart(), PaymentMethod::Cash, 1, Utc::now());
        let second = commit(&cart(), PaymentMethod::Cash, 1, Utc::now());
        db.bills().insert(&first).await.unwrap();

        let err = db.bills().insert(&second).await.unwrap_err();
        assert!(err.is_duplicate_of("bills.bill_number"));
        assert_eq!(db.bills().count().await.unwrap(), 1);
        assert!(db.bills().items(&second.bill.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_item_insert_rolls_back_bill() {
        let db = db().await;
        let mut new_bill = commit(&cart(), PaymentMethod::Cash, 1, Utc::now());
        // Two items with the same primary key: the second insert fails.
        new_bill.items[1].id = new_bill.items[0].id.clone();

        assert!(db.bills().insert(&new_bill).await.is_err());
        assert!(db.bills().get(&new_bill.bill.id).await.unwrap().is_none());
        assert_eq!(db.bills().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_customer_is_rejected() {
        let db = db().await;
        let mut cart = cart();
        cart.set_customer(CustomerRef {
            id: "ghost".to_string(),
            name: "Ghost".to_string(),
            phone: None,
        });
        let new_bill = commit(&cart, PaymentMethod::Debt, 1, Utc::now());

        let err = db.bills().insert(&new_bill).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }

    #[tokio::test]
    async fn test_customer_with_bills_cannot_be_deleted() {
        let db = db().await;
        let ravi = customer(&db, "Ravi").await;
        let mut cart = cart();
        cart.set_customer(ravi.clone());
        db.bills()
            .insert(&commit(&cart, PaymentMethod::Debt, 1, Utc::now()))
            .await
            .unwrap();

        assert_eq!(db.customers().bill_count(&ravi.id).await.unwrap(), 1);
        let err = db.customers().delete(&ravi.id).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }

    #[tokio::test]
    async fn test_query_filters_and_order() {
        let db = db().await;
        let ravi = customer(&db, "Ravi").await;
        let start = Utc::now() - Duration::hours(3);

        let mut debt_cart = cart();
        debt_cart.set_customer(ravi.clone());

        let cash = commit(&cart(), PaymentMethod::Cash, 1, start);
        let debt_old = commit(&debt_cart, PaymentMethod::Debt, 2, start + Duration::hours(1));
        let debt_new = commit(&debt_cart, PaymentMethod::Debt, 3, start + Duration::hours(2));
        let held = NewBill::hold(&cart(), "BB-20260115-100000-004".to_string(), start).unwrap();
        for b in [&cash, &debt_old, &debt_new, &held] {
            db.bills().insert(b).await.unwrap();
        }

        let all = db.bills().query(&BillFilter::all()).await.unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].id, debt_new.bill.id);

        let owed = db
            .bills()
            .query(&BillFilter::unpaid_debt().for_customer(ravi.id.clone()))
            .await
            .unwrap();
        let ids: Vec<&str> = owed.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec![debt_new.bill.id.as_str(), debt_old.bill.id.as_str()]);

        let held_bills = db.bills().query(&BillFilter::held()).await.unwrap();
        assert_eq!(held_bills.len(), 1);
        assert_eq!(held_bills[0].id, held.bill.id);

        let recent = db.bills().query(&BillFilter::all().limit(2)).await.unwrap();
        assert_eq!(recent.len(), 2);

        let since = db
            .bills()
            .query(&BillFilter::all().since(start + Duration::minutes(90)))
            .await
            .unwrap();
        assert_eq!(since.len(), 1);

        let paid_items = db.bills().query_items(&BillFilter::paid()).await.unwrap();
        assert_eq!(paid_items.len(), 2);
        assert!(paid_items.iter().all(|i| i.bill_id == cash.bill.id));
    }

    #[tokio::test]
    async fn test_update_status() {
        let db = db().await;
        let ravi = customer(&db, "Ravi").await;
        let mut cart = cart();
        cart.set_customer(ravi);
        let new_bill = commit(&cart, PaymentMethod::Debt, 1, Utc::now());
        db.bills().insert(&new_bill).await.unwrap();

        assert!(db
            .bills()
            .update_status(&new_bill.bill.id, BillStatus::Paid)
            .await
            .unwrap());
        let bill = db.bills().get(&new_bill.bill.id).await.unwrap().unwrap();
        assert_eq!(bill.status, BillStatus::Paid);

        assert!(!db.bills().update_status("missing", BillStatus::Paid).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_and_delete_all() {
        let db = db().await;
        let ravi = customer(&db, "Ravi").await;
        let product = Product::new("Tea", "TEA", "pcs", Money::from_cents(1000));
        db.products().insert(&product).await.unwrap();
        db.settings().set("store_name", "Corner Store").await.unwrap();

        let first = commit(&cart(), PaymentMethod::Cash, 1, Utc::now());
        let mut debt_cart = cart();
        debt_cart.set_customer(ravi.clone());
        let second = commit(&debt_cart, PaymentMethod::Debt, 2, Utc::now());
        db.bills().insert(&first).await.unwrap();
        db.bills().insert(&second).await.unwrap();

        assert!(db.bills().delete(&first.bill.id).await.unwrap());
        assert!(!db.bills().delete(&first.bill.id).await.unwrap());
        assert!(db.bills().items(&first.bill.id).await.unwrap().is_empty());

        assert_eq!(db.bills().delete_all().await.unwrap(), 1);
        assert_eq!(db.bills().count().await.unwrap(), 0);
        assert!(db
            .bills()
            .query_items(&BillFilter::all())
            .await
            .unwrap()
            .is_empty());

        // Catalog and settings survive.
        assert!(db.customers().get_by_id(&ravi.id).await.unwrap().is_some());
        assert_eq!(db.products().count().await.unwrap(), 1);
        assert_eq!(
            db.settings().get("store_name").await.unwrap().as_deref(),
            Some("Corner Store")
        );
    }

    #[tokio::test]
    async fn test_latest_bill_number() {
        let db = db().await;
        assert!(db.bills().latest_bill_number().await.unwrap().is_none());

        for seq in [3, 1, 2] {
            db.bills()
                .insert(&commit(&cart(), PaymentMethod::Card, seq, Utc::now()))
                .await
                .unwrap();
        }
        assert_eq!(
            db.bills().latest_bill_number().await.unwrap().as_deref(),
            Some("BB-20260115-100000-003")
        );
    }
}
