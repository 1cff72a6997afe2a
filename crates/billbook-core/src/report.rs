//! # Sales Reports
//!
//! Dashboard aggregates over completed sales. Data only: formatting and
//! export belong to whoever displays them.
//!
//! Callers pass PAID bills (and their items); the functions here do not
//! re-check status.

use std::collections::{BTreeMap, HashMap};

use chrono::{Days, NaiveDate, TimeZone};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::{Bill, BillItem, PaymentMethod};

/// Longest trend a dashboard can ask for (about ten years).
pub const MAX_TREND_DAYS: u32 = 3660;

/// Sales for one calendar day in the store's time zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySales {
    pub date: NaiveDate,
    pub total: Money,
    pub bill_count: usize,
}

/// Quantity and revenue of one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSales {
    pub product_name: String,
    pub quantity: Decimal,
    pub revenue: Money,
}

/// Bill count and takings for one payment method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethodStats {
    pub method: PaymentMethod,
    pub bill_count: usize,
    pub total: Money,
}

/// First day of a `days`-long trend ending on `today`.
///
/// `days` is capped at [`MAX_TREND_DAYS`]. `None` for an empty window or
/// one that would start before the earliest representable date.
pub fn trend_start(today: NaiveDate, days: u32) -> Option<NaiveDate> {
    let days = days.min(MAX_TREND_DAYS);
    if days == 0 {
        return None;
    }
    today.checked_sub_days(Days::new(u64::from(days - 1)))
}

/// Per-day totals for the `days` days ending on `today`, oldest first.
///
/// Bills are bucketed by their calendar date in `tz`, so a sale at 02:00
/// local time counts for that local day. Days without sales are present
/// with a zero total so a chart has no gaps. `days` is capped at
/// [`MAX_TREND_DAYS`].
pub fn sales_trend<Tz: TimeZone>(
    bills: &[Bill],
    tz: &Tz,
    today: NaiveDate,
    days: u32,
) -> Vec<DailySales> {
    let Some(first) = trend_start(today, days) else {
        return Vec::new();
    };

    let mut by_day: BTreeMap<NaiveDate, (Money, usize)> = first
        .iter_days()
        .take_while(|day| *day <= today)
        .map(|day| (day, (Money::zero(), 0)))
        .collect();

    for bill in bills {
        let day = bill.created_at.with_timezone(tz).date_naive();
        if let Some(entry) = by_day.get_mut(&day) {
            entry.0 += bill.grand_total;
            entry.1 += 1;
        }
    }

    by_day
        .into_iter()
        .map(|(date, (total, bill_count))| DailySales {
            date,
            total,
            bill_count,
        })
        .collect()
}

/// Best sellers by quantity, grouped by the product name on the bill.
///
/// Ties are broken by revenue, then name.
pub fn top_selling_products(items: &[BillItem], limit: usize) -> Vec<ProductSales> {
    let mut by_name: HashMap<&str, (Decimal, Money)> = HashMap::new();
    for item in items {
        let entry = by_name
            .entry(item.product_name.as_str())
            .or_insert((Decimal::ZERO, Money::zero()));
        entry.0 = entry.0.saturating_add(item.quantity);
        entry.1 += item.line_total;
    }

    let mut ranked: Vec<ProductSales> = by_name
        .into_iter()
        .map(|(name, (quantity, revenue))| ProductSales {
            product_name: name.to_string(),
            quantity,
            revenue,
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.quantity
            .cmp(&a.quantity)
            .then_with(|| b.revenue.cmp(&a.revenue))
            .then_with(|| a.product_name.cmp(&b.product_name))
    });
    ranked.truncate(limit);
    ranked
}

/// Count and takings per payment method, largest total first.
pub fn payment_method_stats(bills: &[Bill]) -> Vec<PaymentMethodStats> {
    let mut by_method: BTreeMap<PaymentMethod, (usize, Money)> = BTreeMap::new();
    for bill in bills {
        let entry = by_method
            .entry(bill.payment_method)
            .or_insert((0, Money::zero()));
        entry.0 += 1;
        entry.1 += bill.grand_total;
    }

    let mut stats: Vec<PaymentMethodStats> = by_method
        .into_iter()
        .map(|(method, (bill_count, total))| PaymentMethodStats {
            method,
            bill_count,
            total,
        })
        .collect();
    // Stable sort keeps enum order for equal totals.
    stats.sort_by(|a, b| b.total.cmp(&a.total));
    stats
}
