//! # The Register
//!
//! One active cart plus the bill lifecycle around it.
//!
//! ## Bill Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │              add / update / remove / discount / customer                │
//! │                           ┌──────┐                                      │
//! │                           ▼      │                                      │
//! │                       ┌──────────┴┐   hold()    ┌────────┐              │
//! │            ┌─────────►│   Draft   │────────────►│  HELD  │              │
//! │            │          │  (cart)   │◄────────────│        │              │
//! │            │          └─────┬─────┘  resume()   └────────┘              │
//! │            │                │        (held bill deleted)                │
//! │            │                │ commit(method)                            │
//! │            │       ┌────────┴─────────┐                                 │
//! │            │       ▼                  ▼                                 │
//! │            │  Cash / UPI / Card      Debt                               │
//! │            │  ┌──────────┐      ┌─────────────────┐  mark_paid()        │
//! │            │  │   PAID   │◄─────│ ACTIVE (unpaid) │                     │
//! │            │  └──────────┘      └─────────────────┘                     │
//! │            │                                                            │
//! │            └── cart reset after every successful commit / hold          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Failure Rules
//! - Validation (empty cart, debt without customer) runs before any write.
//! - A storage failure leaves the cart exactly as it was.
//! - A printer failure never undoes a saved sale.
//!
//! ## Thread Safety
//! The cart and the bill number generator sit behind `std::sync::Mutex`.
//! Those locks are never held across an `.await`.
//!
//! Commit, hold and resume run one at a time under an async lifecycle lock.
//! A second Pay press waits for the first and then finds an empty cart.
//! Cart edits stay responsive while a bill is being saved. Lines added
//! during the save are kept for the next sale.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::{DateTime, Local, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use billbook_core::bill::{ensure_resumable, paid_transition};
use billbook_core::{
    debt, report, Bill, BillFilter, BillItem, BillNumberGenerator, BillStatus, Cart, CartTotals,
    CustomerRef, DailySales, DebtSummary, LineField, LineItem, NewBill, PaidTransition,
    PaymentMethod, PaymentMethodStats, Percent, ProductSales,
};

use crate::config::StoreConfig;
use crate::error::{RegisterError, RegisterResult};
use crate::printer::{Receipt, ReceiptPrinter};
use crate::store::{BillStore, Catalog};

// =============================================================================
// Outcomes
// =============================================================================

/// Result of a successful commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitOutcome {
    pub bill: Bill,
    pub items: Vec<BillItem>,
    /// `false` when the printer rejected the receipt.
    pub printed: bool,
}

/// Result of `mark_paid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkPaidOutcome {
    /// ACTIVE debt bill is now PAID.
    Paid,
    /// Bill was already PAID; nothing changed.
    AlreadyPaid,
    /// No bill with this id.
    NotFound,
}

// =============================================================================
// Register
// =============================================================================

pub struct Register {
    bills: Arc<dyn BillStore>,
    catalog: Arc<dyn Catalog>,
    printer: Arc<dyn ReceiptPrinter>,
    store: RwLock<StoreConfig>,
    cart: Mutex<Cart>,
    numbers: Mutex<BillNumberGenerator>,
    lifecycle: AsyncMutex<()>,
}

impl Register {
    /// Creates a register with an empty cart.
    ///
    /// The bill number generator continues after the newest stored number so
    /// a restart within the same second cannot reissue one.
    pub async fn new(
        bills: Arc<dyn BillStore>,
        catalog: Arc<dyn Catalog>,
        printer: Arc<dyn ReceiptPrinter>,
        store: StoreConfig,
    ) -> RegisterResult<Self> {
        let last_number = bills.latest_bill_number().await?;
        debug!(last_number = ?last_number, "Seeding bill number generator");

        Ok(Register {
            bills,
            catalog,
            printer,
            cart: Mutex::new(Cart::with_tax(store.tax())),
            store: RwLock::new(store),
            numbers: Mutex::new(BillNumberGenerator::resume_after(last_number.as_deref())),
            lifecycle: AsyncMutex::new(()),
        })
    }

    // =========================================================================
    // Cart State
    // =========================================================================

    /// Runs `f` with read access to the cart.
    pub fn with_cart<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Cart) -> R,
    {
        let cart = self.cart.lock().unwrap_or_else(PoisonError::into_inner);
        f(&cart)
    }

    /// Runs `f` with write access to the cart.
    pub fn with_cart_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Cart) -> R,
    {
        let mut cart = self.cart.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut cart)
    }

    /// A copy of the current cart.
    pub fn cart(&self) -> Cart {
        self.with_cart(Cart::clone)
    }

    pub fn totals(&self) -> CartTotals {
        self.with_cart(Cart::totals)
    }

    pub fn store_config(&self) -> StoreConfig {
        self.store
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the store config. The new tax applies from the next cart.
    pub fn set_store_config(&self, store: StoreConfig) {
        *self.store.write().unwrap_or_else(PoisonError::into_inner) = store;
    }

    /// Drops what `saved` put into a bill from the live cart.
    fn settle_cart(&self, saved: &Cart) {
        let tax = self.store_config().tax();
        self.with_cart_mut(|cart| *cart = cart.remainder_after(saved, tax));
    }

    // =========================================================================
    // Cart Operations
    // =========================================================================

    /// Adds `quantity` of a catalog product at its current price.
    pub async fn add_product(&self, product_id: &str, quantity: Decimal) -> RegisterResult<()> {
        let product = self
            .catalog
            .lookup_product(product_id)
            .await?
            .ok_or_else(|| RegisterError::not_found("Product", product_id))?;

        self.with_cart_mut(|cart| cart.add_item(&product, quantity))?;
        debug!(product = %product.code, quantity = %quantity, "Added to cart");
        Ok(())
    }

    /// Edits a line from raw input. Bad input is ignored; returns whether the
    /// edit was applied.
    pub fn update_line(&self, index: usize, field: LineField, value: &str) -> bool {
        self.with_cart_mut(|cart| cart.update_line(index, field, value))
    }

    pub fn remove_line(&self, index: usize) -> RegisterResult<LineItem> {
        Ok(self.with_cart_mut(|cart| cart.remove_line(index))?)
    }

    /// Drops lines, customer and discount.
    pub fn clear_cart(&self) {
        self.with_cart_mut(Cart::clear);
    }

    pub fn set_discount(&self, discount: Percent) {
        self.with_cart_mut(|cart| cart.set_discount(discount));
    }

    /// Lenient: anything that is not a number means no discount.
    pub fn set_discount_input(&self, input: &str) {
        self.with_cart_mut(|cart| cart.set_discount_input(input));
    }

    /// Attaches a registered customer to the cart.
    pub async fn select_customer(&self, customer_id: &str) -> RegisterResult<CustomerRef> {
        let customer = self
            .catalog
            .lookup_customer(customer_id)
            .await?
            .ok_or_else(|| RegisterError::not_found("Customer", customer_id))?;

        let customer = CustomerRef::from(&customer);
        self.with_cart_mut(|cart| cart.set_customer(customer.clone()));
        Ok(customer)
    }

    pub fn clear_customer(&self) {
        self.with_cart_mut(Cart::clear_customer);
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    fn next_bill_number(&self, now: DateTime<Utc>) -> String {
        let mut numbers = self.numbers.lock().unwrap_or_else(PoisonError::into_inner);
        numbers.next_at(now.with_timezone(&Local).naive_local())
    }

    /// Completes the sale in the cart.
    ///
    /// ## Errors
    /// * `CoreError::EmptyCart` - nothing to sell
    /// * `CoreError::CustomerRequired` - `Debt` without a customer
    /// * `CoreError::InvalidPaymentMethod` - `Held` (use [`Register::hold`])
    /// * `DbError` - storage failed; the cart is unchanged
    pub async fn commit(&self, method: PaymentMethod) -> RegisterResult<CommitOutcome> {
        let _lifecycle = self.lifecycle.lock().await;
        let cart = self.cart();
        let now = Utc::now();
        let new_bill = NewBill::commit(&cart, method, self.next_bill_number(now), now)?;

        self.bills.save_bill(&new_bill).await?;
        self.settle_cart(&cart);

        let NewBill { bill, items } = new_bill;
        info!(
            bill_number = %bill.bill_number,
            method = %bill.payment_method,
            status = %bill.status,
            total = %bill.grand_total,
            items = items.len(),
            "Bill committed"
        );

        let receipt = Receipt::new(&self.store_config(), &bill, &items, cart.customer());
        let printed = self.print(&receipt);

        Ok(CommitOutcome {
            bill,
            items,
            printed,
        })
    }

    /// Parks the cart as a HELD bill and starts a fresh cart.
    pub async fn hold(&self) -> RegisterResult<Bill> {
        let _lifecycle = self.lifecycle.lock().await;
        let cart = self.cart();
        let now = Utc::now();
        let new_bill = NewBill::hold(&cart, self.next_bill_number(now), now)?;

        self.bills.save_bill(&new_bill).await?;
        self.settle_cart(&cart);

        info!(
            bill_number = %new_bill.bill.bill_number,
            total = %new_bill.bill.grand_total,
            "Bill held"
        );
        Ok(new_bill.bill)
    }

    /// Loads a held bill into a fresh cart and deletes the held bill.
    ///
    /// The current cart is replaced. Lines keep their held prices and the
    /// bill's discount and tax rates are restored.
    ///
    /// ## Errors
    /// * `RegisterError::NotFound` - no bill with this id, or it is not held
    pub async fn resume(&self, held_bill_id: &str) -> RegisterResult<Cart> {
        let _lifecycle = self.lifecycle.lock().await;
        let (bill, items) = self
            .bills
            .get_bill(held_bill_id)
            .await?
            .ok_or_else(|| RegisterError::not_found("Held bill", held_bill_id))?;

        if ensure_resumable(&bill).is_err() {
            return Err(RegisterError::not_found("Held bill", held_bill_id));
        }

        let customer = match &bill.customer_id {
            Some(id) => {
                let found = self.catalog.lookup_customer(id).await?;
                if found.is_none() {
                    warn!(customer_id = %id, "Held bill customer no longer exists");
                }
                found.as_ref().map(CustomerRef::from)
            }
            None => None,
        };

        let cart = Cart::from_held(&bill, &items, customer);

        if !self.bills.delete_bill(&bill.id).await? {
            return Err(RegisterError::not_found("Held bill", held_bill_id));
        }

        let resumed = cart.clone();
        self.with_cart_mut(|c| *c = cart);

        info!(bill_number = %bill.bill_number, lines = items.len(), "Held bill resumed");
        Ok(resumed)
    }

    /// Settles an unpaid debt bill.
    ///
    /// Idempotent: an already PAID bill reports [`MarkPaidOutcome::AlreadyPaid`].
    ///
    /// ## Errors
    /// * `CoreError::InvalidBillState` - the bill is HELD
    pub async fn mark_paid(&self, bill_id: &str) -> RegisterResult<MarkPaidOutcome> {
        let Some((bill, _)) = self.bills.get_bill(bill_id).await? else {
            return Ok(MarkPaidOutcome::NotFound);
        };

        match paid_transition(&bill)? {
            PaidTransition::AlreadyPaid => Ok(MarkPaidOutcome::AlreadyPaid),
            PaidTransition::Settle => {
                if !self
                    .bills
                    .update_bill_status(bill_id, BillStatus::Paid)
                    .await?
                {
                    return Ok(MarkPaidOutcome::NotFound);
                }
                info!(
                    bill_number = %bill.bill_number,
                    total = %bill.grand_total,
                    "Debt bill marked paid"
                );
                Ok(MarkPaidOutcome::Paid)
            }
        }
    }

    /// Deletes every bill and item. Catalog, customers and settings stay.
    pub async fn delete_all_history(&self) -> RegisterResult<u64> {
        let deleted = self.bills.delete_all_bills().await?;
        warn!(deleted, "Bill history deleted");
        Ok(deleted)
    }

    /// Prints a stored bill again. Returns whether the printer accepted it.
    pub async fn reprint(&self, bill_id: &str) -> RegisterResult<bool> {
        let (bill, items) = self
            .bills
            .get_bill(bill_id)
            .await?
            .ok_or_else(|| RegisterError::not_found("Bill", bill_id))?;

        let customer = match &bill.customer_id {
            Some(id) => self
                .catalog
                .lookup_customer(id)
                .await?
                .as_ref()
                .map(CustomerRef::from),
            None => None,
        };

        let receipt = Receipt::new(&self.store_config(), &bill, &items, customer.as_ref());
        Ok(self.print(&receipt))
    }

    fn print(&self, receipt: &Receipt) -> bool {
        match self.printer.print(receipt) {
            Ok(()) => true,
            Err(e) => {
                warn!(bill_number = %receipt.bill_number, error = %e, "Receipt printing failed");
                false
            }
        }
    }

    // =========================================================================
    // Debt Ledger
    // =========================================================================

    /// Outstanding debt per customer, highest first. Always computed fresh.
    pub async fn debt_by_customer(&self) -> RegisterResult<Vec<DebtSummary>> {
        let bills = self.bills.query_bills(&BillFilter::unpaid_debt()).await?;

        let mut customers: HashMap<String, CustomerRef> = HashMap::new();
        for id in bills.iter().filter_map(|b| b.customer_id.as_deref()) {
            if customers.contains_key(id) {
                continue;
            }
            if let Some(customer) = self.catalog.lookup_customer(id).await? {
                customers.insert(id.to_string(), CustomerRef::from(&customer));
            }
        }

        Ok(debt::debt_by_customer(&bills, &customers))
    }

    /// One customer's unpaid debt bills, most recent first.
    pub async fn customer_debt_bills(&self, customer_id: &str) -> RegisterResult<Vec<Bill>> {
        let bills = self
            .bills
            .query_bills(&BillFilter::unpaid_debt().for_customer(customer_id))
            .await?;
        Ok(debt::customer_debt_bills(&bills, customer_id))
    }

    // =========================================================================
    // Reports
    // =========================================================================

    /// Newest bills of any status.
    pub async fn recent_bills(&self, limit: u32) -> RegisterResult<Vec<Bill>> {
        Ok(self.bills.query_bills(&BillFilter::all().limit(limit)).await?)
    }

    pub async fn held_bills(&self) -> RegisterResult<Vec<Bill>> {
        Ok(self.bills.query_bills(&BillFilter::held()).await?)
    }

    /// Every unpaid debt bill, newest first.
    pub async fn debt_bills(&self) -> RegisterResult<Vec<Bill>> {
        Ok(self.bills.query_bills(&BillFilter::unpaid_debt()).await?)
    }

    /// Paid takings per local calendar day for the last `days` days, oldest
    /// first. At most [`report::MAX_TREND_DAYS`] days are returned.
    pub async fn sales_trend(&self, days: u32) -> RegisterResult<Vec<DailySales>> {
        let today = Local::now().date_naive();
        let Some(first) = report::trend_start(today, days) else {
            return Ok(Vec::new());
        };
        // A day early so any UTC offset is covered; bucketing trims the rest.
        let since = first
            .pred_opt()
            .unwrap_or(first)
            .and_time(NaiveTime::default())
            .and_utc();

        let bills = self
            .bills
            .query_bills(&BillFilter::paid().since(since))
            .await?;
        Ok(report::sales_trend(&bills, &Local, today, days))
    }

    /// Best sellers by quantity over paid bills.
    pub async fn top_selling_products(&self, limit: usize) -> RegisterResult<Vec<ProductSales>> {
        let items = self.bills.query_items(&BillFilter::paid()).await?;
        Ok(report::top_selling_products(&items, limit))
    }

    pub async fn payment_method_stats(&self) -> RegisterResult<Vec<PaymentMethodStats>> {
        let bills = self.bills.query_bills(&BillFilter::paid()).await?;
        Ok(report::payment_method_stats(&bills))
    }
}
