//! # billbook-core: Pure Business Logic for Billbook POS
//!
//! Everything the register needs to price a sale and move a bill through its
//! lifecycle, as pure functions over plain data.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Billbook POS Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                billbook-register (orchestration)                │   │
//! │  │   add_to_cart, commit, hold, resume, mark_paid, debt ledger     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ billbook-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐  │   │
//! │  │   │  money  │ │  cart   │ │  bill   │ │  debt   │ │ report  │  │   │
//! │  │   │ Money   │ │ Cart    │ │ NewBill │ │ Ledger  │ │ Trends  │  │   │
//! │  │   │ Percent │ │LineItem │ │ States  │ │ Summary │ │ TopSell │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO PRINTER • PURE FUNCTIONS            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  billbook-db (Database Layer)                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Customer, Bill, BillItem, ...)
//! - [`money`] - Money in minor units, step-wise half-up rounding, Percent
//! - [`cart`] - The in-memory sale in progress
//! - [`bill`] - Bill lifecycle states and bill number generation
//! - [`debt`] - Per-customer outstanding debt
//! - [`report`] - Dashboard aggregates (trends, top products, methods)
//! - [`validation`] - Business rule validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use billbook_core::cart::Cart;
//! use billbook_core::money::{Money, Percent};
//! use billbook_core::types::Product;
//! use rust_decimal::Decimal;
//!
//! let rice = Product::new("Rice", "RICE", "kg", Money::from_cents(5000));
//! let oil = Product::new("Oil", "OIL", "l", Money::from_cents(15000));
//!
//! let mut cart = Cart::new();
//! cart.add_item(&rice, Decimal::from(2)).unwrap();
//! cart.add_item(&oil, Decimal::from(1)).unwrap();
//! cart.set_discount(Percent::clamped(Decimal::from(10)));
//!
//! let totals = cart.totals();
//! assert_eq!(totals.subtotal, Money::from_cents(25000));
//! assert_eq!(totals.discount_amount, Money::from_cents(2500));
//! assert_eq!(totals.grand_total, Money::from_cents(22500));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod bill;
pub mod cart;
pub mod debt;
pub mod error;
pub mod money;
pub mod report;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use bill::{BillNumberGenerator, BillState, NewBill, PaidTransition};
pub use cart::{Cart, CartTotals, LineField, LineItem};
pub use debt::DebtSummary;
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{Money, Percent};
pub use report::{DailySales, PaymentMethodStats, ProductSales};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines allowed in a single cart.
///
/// Guards against a runaway scanner loop filling the cart.
pub const MAX_CART_ITEMS: usize = 200;

/// Prefix of every generated bill number.
pub const BILL_NUMBER_PREFIX: &str = "BB";
