//! # Repository Module
//!
//! Database repository implementations for Billbook POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Register operation                                                    │
//! │       │                                                                 │
//! │       │  db.bills().insert(&new_bill)                                  │
//! │       ▼                                                                 │
//! │  BillRepository                                                        │
//! │  ├── insert(&self, new_bill)      (bill + items, one transaction)      │
//! │  ├── query(&self, filter)                                              │
//! │  ├── update_status(&self, id, status)                                  │
//! │  └── delete / delete_all                                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Rows are read into private `*Row` structs (sqlx::FromRow) and         │
//! │  converted into billbook-core types with TryFrom.                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Product CRUD and search
//! - [`CustomerRepository`](customer::CustomerRepository) - Customer CRUD and search
//! - [`BillRepository`](bill::BillRepository) - Bills, items and their lifecycle writes
//! - [`SettingsRepository`](settings::SettingsRepository) - Key/value store settings

pub mod bill;
pub mod customer;
pub mod product;
pub mod settings;

use std::str::FromStr;

use billbook_core::Percent;
use rust_decimal::Decimal;

use crate::error::{DbError, DbResult};

/// Parses a TEXT decimal column.
pub(crate) fn parse_decimal(column: &str, value: &str) -> DbResult<Decimal> {
    Decimal::from_str(value).map_err(|_| DbError::corrupt(column, value))
}

/// Parses a TEXT percentage column.
pub(crate) fn parse_percent(column: &str, value: &str) -> DbResult<Percent> {
    parse_decimal(column, value).map(Percent::clamped)
}

/// Builds a case-insensitive `LIKE` pattern for a substring search.
///
/// `%`, `_` and `\` in the user's text are escaped (use with `ESCAPE '\'`).
pub(crate) fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
