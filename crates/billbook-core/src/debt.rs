//! # Debt Ledger
//!
//! Per-customer outstanding debt, computed from unpaid debt bills.
//!
//! ```text
//! bills ──► filter (method = Debt ∧ status ≠ PAID) ──► group by customer_id
//!                                                            │
//!                                                            ▼
//!                          Σ grand_total, count, name/phone lookup
//!                                                            │
//!                                                            ▼
//!                              order: highest debt first, then name
//! ```
//!
//! Nothing is cached. Callers pass the current bills every time, so a bill
//! marked paid disappears from the ledger on the next call.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::{Bill, CustomerRef};

/// Name shown when a debt bill's customer record cannot be found.
pub const UNKNOWN_CUSTOMER: &str = "Unknown customer";

/// Outstanding debt of one customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtSummary {
    pub customer_id: String,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub total_debt: Money,
    pub bill_count: usize,
}

/// Groups unpaid debt bills by customer.
///
/// Bills that are not unpaid debt are skipped, as are debt bills without a
/// customer (commit never produces those). `customers` resolves names and
/// phones.
pub fn debt_by_customer(
    bills: &[Bill],
    customers: &HashMap<String, CustomerRef>,
) -> Vec<DebtSummary> {
    let mut groups: HashMap<&str, (Money, usize)> = HashMap::new();

    for bill in bills.iter().filter(|b| b.is_unpaid_debt()) {
        let Some(customer_id) = bill.customer_id.as_deref() else {
            continue;
        };
        let entry = groups.entry(customer_id).or_insert((Money::zero(), 0));
        entry.0 += bill.grand_total;
        entry.1 += 1;
    }

    let mut summaries: Vec<DebtSummary> = groups
        .into_iter()
        .map(|(customer_id, (total_debt, bill_count))| {
            let customer = customers.get(customer_id);
            DebtSummary {
                customer_id: customer_id.to_string(),
                customer_name: customer
                    .map(|c| c.name.clone())
                    .unwrap_or_else(|| UNKNOWN_CUSTOMER.to_string()),
                customer_phone: customer.and_then(|c| c.phone.clone()),
                total_debt,
                bill_count,
            }
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.total_debt
            .cmp(&a.total_debt)
            .then_with(|| a.customer_name.cmp(&b.customer_name))
            .then_with(|| a.customer_id.cmp(&b.customer_id))
    });
    summaries
}

/// One customer's unpaid debt bills, most recent first.
pub fn customer_debt_bills(bills: &[Bill], customer_id: &str) -> Vec<Bill> {
    let mut owed: Vec<Bill> = bills
        .iter()
        .filter(|b| b.is_unpaid_debt() && b.customer_id.as_deref() == Some(customer_id))
        .cloned()
        .collect();
    sort_newest_first(&mut owed);
    owed
}

/// Sorts by creation time, then bill number, both descending.
pub fn sort_newest_first(bills: &mut [Bill]) {
    bills.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.bill_number.cmp(&a.bill_number))
    });
}

/// Sum of all outstanding debt.
pub fn total_outstanding(summaries: &[DebtSummary]) -> Money {
    summaries.iter().map(|s| s.total_debt).sum()
}
