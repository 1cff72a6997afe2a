//! # Domain Types
//!
//! Core domain types used throughout Billbook POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Bill       │   │    BillItem     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  bill_id (FK)   │       │
//! │  │  code (business)│   │  bill_number    │   │  name snapshot  │       │
//! │  │  unit, price    │   │  totals, status │   │  qty, unit,price│       │
//! │  └─────────────────┘   └────────┬────────┘   └─────────────────┘       │
//! │                                 │ customer_id (weak)                    │
//! │  ┌─────────────────┐   ┌────────▼────────┐   ┌─────────────────┐       │
//! │  │ PaymentMethod   │   │    Customer     │   │   BillStatus    │       │
//! │  │  Cash  UPI      │   │  id, name       │   │   ACTIVE        │       │
//! │  │  Card  Debt     │   │  phone (unique) │   │   PAID          │       │
//! │  │  Held           │   │  address        │   │   HELD          │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every persisted entity has:
//! - `id`: UUID v4 - immutable, used for relations
//! - Business ID: (product `code`, `bill_number`) - human-readable

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::money::{Money, Percent};

/// Category assigned to products created without one.
pub const DEFAULT_CATEGORY: &str = "General";

// =============================================================================
// Product
// =============================================================================

/// A product in the store catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name shown to the cashier and on receipts.
    pub name: String,

    /// Short code typed or scanned at the register (unique).
    pub code: String,

    /// Base selling unit ("kg", "pcs", "l").
    pub unit: String,

    /// Price per unit.
    pub price: Money,

    /// Shelf category, for catalog browsing only.
    pub category: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Creates a new product with a fresh id in the default category.
    pub fn new(
        name: impl Into<String>,
        code: impl Into<String>,
        unit: impl Into<String>,
        price: Money,
    ) -> Self {
        let now = Utc::now();
        Product {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            code: code.into(),
            unit: unit.into(),
            price,
            category: DEFAULT_CATEGORY.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the category (builder style).
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A registered customer. Required for debt sales.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub name: String,
    /// Unique when present.
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Customer {
    /// Creates a new customer with a fresh id.
    ///
    /// Blank phone/address values are stored as `None`.
    pub fn new(name: impl Into<String>, phone: Option<String>, address: Option<String>) -> Self {
        Customer {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            phone: non_blank(phone),
            address: non_blank(address),
            created_at: Utc::now(),
        }
    }
}

/// The customer context carried by a cart.
///
/// Only what the register needs to display and to attribute a bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRef {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
}

impl From<&Customer> for CustomerRef {
    fn from(customer: &Customer) -> Self {
        CustomerRef {
            id: customer.id.clone(),
            name: customer.name.clone(),
            phone: customer.phone.clone(),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// =============================================================================
// Payment Method
// =============================================================================

/// How a bill was settled.
///
/// `Held` is not a tender: it marks a parked bill.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PaymentMethod {
    Cash,
    #[cfg_attr(feature = "sqlx", sqlx(rename = "UPI"))]
    #[serde(rename = "UPI")]
    Upi,
    Card,
    /// Deferred payment, tracked in the debt ledger until settled.
    Debt,
    /// Parked bill, not a completed sale.
    Held,
}

impl PaymentMethod {
    /// Methods a cashier can pick when completing a sale.
    pub const TENDERS: [PaymentMethod; 4] = [
        PaymentMethod::Cash,
        PaymentMethod::Upi,
        PaymentMethod::Card,
        PaymentMethod::Debt,
    ];

    /// Stored/display form.
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Cash",
            PaymentMethod::Upi => "UPI",
            PaymentMethod::Card => "Card",
            PaymentMethod::Debt => "Debt",
            PaymentMethod::Held => "Held",
        }
    }

    /// True for methods that complete a sale.
    pub const fn is_tender(&self) -> bool {
        !matches!(self, PaymentMethod::Held)
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "upi" => Ok(PaymentMethod::Upi),
            "card" => Ok(PaymentMethod::Card),
            "debt" | "credit" => Ok(PaymentMethod::Debt),
            "held" => Ok(PaymentMethod::Held),
            _ => Err(ValidationError::NotAllowed {
                field: "payment_method".to_string(),
                allowed: vec![
                    "Cash".to_string(),
                    "UPI".to_string(),
                    "Card".to_string(),
                    "Debt".to_string(),
                ],
            }),
        }
    }
}

// =============================================================================
// Bill Status
// =============================================================================

/// Persisted status of a bill. The only mutable column of a bill.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BillStatus {
    /// Completed sale awaiting payment (debt bills).
    Active,
    /// Completed and paid.
    Paid,
    /// Parked for later resumption.
    Held,
}

impl BillStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            BillStatus::Active => "ACTIVE",
            BillStatus::Paid => "PAID",
            BillStatus::Held => "HELD",
        }
    }
}

impl fmt::Display for BillStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Bill
// =============================================================================

/// A persisted bill header. Items live in [`BillItem`].
///
/// Immutable once written except for `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    pub id: String,
    /// Human-readable, strictly unique (see [`crate::bill::BillNumberGenerator`]).
    pub bill_number: String,
    /// Weak reference; `None` for walk-in customers.
    pub customer_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub subtotal: Money,
    /// Discount rate the cashier entered; kept so a held bill resumes intact.
    pub discount_percent: Percent,
    pub discount_amount: Money,
    pub tax_percent: Percent,
    pub tax_amount: Money,
    pub grand_total: Money,
    pub payment_method: PaymentMethod,
    pub status: BillStatus,
}

impl Bill {
    /// True for a debt bill that has not been settled.
    pub fn is_unpaid_debt(&self) -> bool {
        self.payment_method == PaymentMethod::Debt && self.status != BillStatus::Paid
    }
}

// =============================================================================
// Bill Item
// =============================================================================

/// A line of a bill.
/// Uses snapshot pattern: later catalog edits never touch history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillItem {
    pub id: String,
    pub bill_id: String,
    pub product_id: String,
    /// Product name at time of sale (frozen).
    pub product_name: String,
    pub quantity: Decimal,
    pub unit: String,
    /// Unit price at time of sale (frozen, may be a manual override).
    pub unit_price: Money,
    pub line_total: Money,
}

// =============================================================================
// Bill Filter
// =============================================================================

/// Selection criteria for bill queries.
///
/// Results are always newest first. All criteria are ANDed.
///
/// ## Example
/// ```rust
/// use billbook_core::types::BillFilter;
///
/// let filter = BillFilter::unpaid_debt().for_customer("c-1").limit(20);
/// assert!(filter.unpaid_debt_only);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillFilter {
    pub status: Option<BillStatus>,
    pub payment_method: Option<PaymentMethod>,
    pub customer_id: Option<String>,
    /// Only bills created at or after this instant.
    pub since: Option<DateTime<Utc>>,
    /// Debt bills whose status is not PAID.
    pub unpaid_debt_only: bool,
    pub limit: Option<u32>,
}

impl BillFilter {
    /// Every bill.
    pub fn all() -> Self {
        Self::default()
    }

    /// Parked bills.
    pub fn held() -> Self {
        BillFilter {
            status: Some(BillStatus::Held),
            ..Self::default()
        }
    }

    /// Completed, paid sales. Reports aggregate over these.
    pub fn paid() -> Self {
        BillFilter {
            status: Some(BillStatus::Paid),
            ..Self::default()
        }
    }

    /// Debt bills still owed.
    pub fn unpaid_debt() -> Self {
        BillFilter {
            unpaid_debt_only: true,
            ..Self::default()
        }
    }

    pub fn for_customer(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// In-memory evaluation of the filter (ignores `limit`).
    pub fn matches(&self, bill: &Bill) -> bool {
        if let Some(status) = self.status {
            if bill.status != status {
                return false;
            }
        }
        if let Some(method) = self.payment_method {
            if bill.payment_method != method {
                return false;
            }
        }
        if let Some(customer_id) = &self.customer_id {
            if bill.customer_id.as_deref() != Some(customer_id.as_str()) {
                return false;
            }
        }
        if let Some(since) = self.since {
            if bill.created_at < since {
                return false;
            }
        }
        if self.unpaid_debt_only && !bill.is_unpaid_debt() {
            return false;
        }
        true
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_method_round_trip_strings() {
        for method in PaymentMethod::TENDERS {
            assert_eq!(method.as_str().parse::<PaymentMethod>().unwrap(), method);
        }
        assert_eq!("upi".parse::<PaymentMethod>().unwrap(), PaymentMethod::Upi);
        assert!("cheque".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn test_payment_method_serde_names() {
        assert_eq!(serde_json::to_string(&PaymentMethod::Upi).unwrap(), "\"UPI\"");
        assert_eq!(serde_json::to_string(&BillStatus::Paid).unwrap(), "\"PAID\"");
    }

    #[test]
    fn test_held_is_not_a_tender() {
        assert!(!PaymentMethod::Held.is_tender());
        assert!(PaymentMethod::Debt.is_tender());
    }

    #[test]
    fn test_customer_blank_fields_become_none() {
        let customer = Customer::new("Meena", Some("  ".to_string()), Some(String::new()));
        assert_eq!(customer.phone, None);
        assert_eq!(customer.address, None);

        let customer = Customer::new("Ravi", Some(" 98400 12345 ".to_string()), None);
        assert_eq!(customer.phone.as_deref(), Some("98400 12345"));
    }

    #[test]
    fn test_product_defaults() {
        let product = Product::new("Sugar", "SUG", "kg", Money::from_cents(4500));
        assert_eq!(product.category, DEFAULT_CATEGORY);
        assert!(uuid::Uuid::parse_str(&product.id).is_ok());

        let product = product.with_category("Grocery");
        assert_eq!(product.category, "Grocery");
    }
}
