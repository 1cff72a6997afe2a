//! # Receipt Hand-off
//!
//! After a sale is saved the register freezes everything a receipt needs
//! into a [`Receipt`] and passes it to a [`ReceiptPrinter`]. How it reaches
//! paper (ESC/POS, spooler, PDF) is the printer service's business.
//!
//! ```text
//! commit ──► bill saved ──► Receipt::new(store, bill, items, customer)
//!                                   │
//!                                   ▼
//!                          ReceiptPrinter::print
//!                                   │
//!                  Err ──► warn!, outcome.printed = false
//!                          (the sale stays committed)
//! ```

use std::io::Write;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use billbook_core::{Bill, BillItem, CustomerRef, Money, PaymentMethod, Percent};

use crate::config::StoreConfig;

#[derive(Debug, Error)]
pub enum PrintError {
    #[error("Printer unavailable: {0}")]
    Unavailable(String),

    #[error("Printer I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode receipt: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Finalized receipt data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub store_name: String,
    pub store_address: String,
    pub store_phone: String,
    pub header_message: String,
    pub bill_number: String,
    pub created_at: DateTime<Utc>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub lines: Vec<ReceiptLine>,
    pub subtotal: Money,
    pub discount_percent: Percent,
    pub discount_amount: Money,
    pub tax_percent: Percent,
    pub tax_amount: Money,
    pub grand_total: Money,
    pub payment_method: PaymentMethod,
    pub footer: String,
    pub currency_symbol: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptLine {
    pub name: String,
    pub quantity: Decimal,
    pub unit: String,
    pub unit_price: Money,
    pub line_total: Money,
}

impl Receipt {
    pub fn new(
        store: &StoreConfig,
        bill: &Bill,
        items: &[BillItem],
        customer: Option<&CustomerRef>,
    ) -> Self {
        Receipt {
            store_name: store.store_name.clone(),
            store_address: store.store_address.clone(),
            store_phone: store.store_phone.clone(),
            header_message: store.header_message.clone(),
            bill_number: bill.bill_number.clone(),
            created_at: bill.created_at,
            customer_name: customer.map(|c| c.name.clone()),
            customer_phone: customer.and_then(|c| c.phone.clone()),
            lines: items
                .iter()
                .map(|item| ReceiptLine {
                    name: item.product_name.clone(),
                    quantity: item.quantity,
                    unit: item.unit.clone(),
                    unit_price: item.unit_price,
                    line_total: item.line_total,
                })
                .collect(),
            subtotal: bill.subtotal,
            discount_percent: bill.discount_percent,
            discount_amount: bill.discount_amount,
            tax_percent: bill.tax_percent,
            tax_amount: bill.tax_amount,
            grand_total: bill.grand_total,
            payment_method: bill.payment_method,
            footer: store.receipt_footer.clone(),
            currency_symbol: store.currency_symbol.clone(),
        }
    }
}

/// A print service.
pub trait ReceiptPrinter: Send + Sync {
    fn print(&self, receipt: &Receipt) -> Result<(), PrintError>;
}

/// Accepts every receipt and prints nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpPrinter;

impl ReceiptPrinter for NoOpPrinter {
    fn print(&self, receipt: &Receipt) -> Result<(), PrintError> {
        debug!(bill_number = %receipt.bill_number, "Receipt printing disabled");
        Ok(())
    }
}

/// Writes each receipt as one JSON line, for an external print spooler
/// reading a pipe or file.
#[derive(Debug)]
pub struct JsonLinePrinter<W> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonLinePrinter<W> {
    pub fn new(out: W) -> Self {
        JsonLinePrinter {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<W: Write + Send> ReceiptPrinter for JsonLinePrinter<W> {
    fn print(&self, receipt: &Receipt) -> Result<(), PrintError> {
        let line = serde_json::to_string(receipt)?;
        let mut out = self
            .out
            .lock()
            .map_err(|_| PrintError::Unavailable("output lock poisoned".to_string()))?;
        writeln!(out, "{}", line)?;
        out.flush()?;
        Ok(())
    }
}
