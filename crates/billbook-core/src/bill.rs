//! # Bill Lifecycle
//!
//! Bill states, the rules for moving between them, and bill numbering.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │                  hold(cart)                                             │
//! │   ┌─────────┐ ─────────────────► ┌─────────┐                            │
//! │   │  DRAFT  │                    │  HELD   │  method=Held, status=HELD  │
//! │   │ (cart)  │ ◄───────────────── └─────────┘                            │
//! │   └────┬────┘   resume(id): load into cart, delete held bill            │
//! │        │                                                                │
//! │        │ commit(cart, method)                                           │
//! │        │                                                                │
//! │        ├── method = Debt ──────► ┌───────────────┐                      │
//! │        │                         │ ACTIVE_UNPAID │  status=ACTIVE       │
//! │        │                         └───────┬───────┘                      │
//! │        │                                 │ mark_paid(id)                │
//! │        │                                 ▼                              │
//! │        └── Cash/UPI/Card ──────► ┌───────────────┐                      │
//! │                                  │   SETTLED     │  status=PAID         │
//! │                                  └───────────────┘  (mark_paid: no-op)  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything here is decided before persistence. The register owns the
//! actual writes.

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cart::Cart;
use crate::error::{CoreError, CoreResult};
use crate::types::{Bill, BillItem, BillStatus, PaymentMethod};
use crate::BILL_NUMBER_PREFIX;

// =============================================================================
// Bill State
// =============================================================================

/// Lifecycle state of a bill.
///
/// `Draft` is the cart itself. The other states are derived from the
/// persisted `(payment_method, status)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillState {
    Draft,
    Held,
    ActiveUnpaid,
    Settled,
}

impl BillState {
    pub fn of(method: PaymentMethod, status: BillStatus) -> Self {
        match (method, status) {
            (_, BillStatus::Held) => BillState::Held,
            (_, BillStatus::Paid) => BillState::Settled,
            (PaymentMethod::Debt, BillStatus::Active) => BillState::ActiveUnpaid,
            (_, BillStatus::Active) => BillState::Settled,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            BillState::Draft => "draft",
            BillState::Held => "held",
            BillState::ActiveUnpaid => "active unpaid",
            BillState::Settled => "settled",
        }
    }
}

impl Bill {
    pub fn state(&self) -> BillState {
        BillState::of(self.payment_method, self.status)
    }
}

/// What `mark_paid` has to do for a bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaidTransition {
    /// ACTIVE_UNPAID → PAID.
    Settle,
    /// Already PAID; nothing to write.
    AlreadyPaid,
}

/// Decides the `mark_paid` transition.
///
/// ## Errors
/// [`CoreError::InvalidBillState`] for held bills and for non-debt bills
/// that are not PAID.
pub fn paid_transition(bill: &Bill) -> CoreResult<PaidTransition> {
    if bill.status == BillStatus::Paid {
        return Ok(PaidTransition::AlreadyPaid);
    }
    match bill.state() {
        BillState::ActiveUnpaid => Ok(PaidTransition::Settle),
        state => Err(invalid_state(bill, state, "mark paid")),
    }
}

/// Checks that a bill can be resumed into the cart.
pub fn ensure_resumable(bill: &Bill) -> CoreResult<()> {
    match bill.state() {
        BillState::Held => Ok(()),
        state => Err(invalid_state(bill, state, "resume")),
    }
}

fn invalid_state(bill: &Bill, state: BillState, operation: &str) -> CoreError {
    CoreError::InvalidBillState {
        bill_number: bill.bill_number.clone(),
        current_state: state.as_str().to_string(),
        operation: operation.to_string(),
    }
}

// =============================================================================
// New Bill
// =============================================================================

/// A bill snapshot ready to be persisted: header plus frozen items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBill {
    pub bill: Bill,
    pub items: Vec<BillItem>,
}

impl NewBill {
    /// Snapshots a cart as a completed sale.
    ///
    /// ## Validation (before anything is written)
    /// - cart must have lines
    /// - `Held` is not a payment method
    /// - `Debt` needs a customer on the cart
    ///
    /// ## Status
    /// `Debt` → ACTIVE (owed). Everything else → PAID.
    pub fn commit(
        cart: &Cart,
        method: PaymentMethod,
        bill_number: String,
        created_at: DateTime<Utc>,
    ) -> CoreResult<NewBill> {
        if cart.is_empty() {
            return Err(CoreError::EmptyCart);
        }
        if !method.is_tender() {
            return Err(CoreError::InvalidPaymentMethod {
                method: method.to_string(),
                operation: "commit".to_string(),
            });
        }
        if method == PaymentMethod::Debt && cart.customer().is_none() {
            return Err(CoreError::CustomerRequired {
                method: method.to_string(),
            });
        }

        let status = if method == PaymentMethod::Debt {
            BillStatus::Active
        } else {
            BillStatus::Paid
        };
        Ok(Self::snapshot(cart, method, status, bill_number, created_at))
    }

    /// Snapshots a cart as a held bill. No payment method or customer needed.
    pub fn hold(
        cart: &Cart,
        bill_number: String,
        created_at: DateTime<Utc>,
    ) -> CoreResult<NewBill> {
        if cart.is_empty() {
            return Err(CoreError::EmptyCart);
        }
        Ok(Self::snapshot(
            cart,
            PaymentMethod::Held,
            BillStatus::Held,
            bill_number,
            created_at,
        ))
    }

    fn snapshot(
        cart: &Cart,
        method: PaymentMethod,
        status: BillStatus,
        bill_number: String,
        created_at: DateTime<Utc>,
    ) -> NewBill {
        let bill_id = Uuid::new_v4().to_string();
        let totals = cart.totals();

        let items = cart
            .lines()
            .iter()
            .map(|line| BillItem {
                id: Uuid::new_v4().to_string(),
                bill_id: bill_id.clone(),
                product_id: line.product_id.clone(),
                product_name: line.product_name.clone(),
                quantity: line.quantity,
                unit: line.unit.clone(),
                unit_price: line.unit_price,
                line_total: line.line_total(),
            })
            .collect();

        let bill = Bill {
            id: bill_id,
            bill_number,
            customer_id: cart.customer().map(|c| c.id.clone()),
            created_at,
            subtotal: totals.subtotal,
            discount_percent: cart.discount(),
            discount_amount: totals.discount_amount,
            tax_percent: cart.tax(),
            tax_amount: totals.tax_amount,
            grand_total: totals.grand_total,
            payment_method: method,
            status,
        };

        NewBill { bill, items }
    }
}

// =============================================================================
// Bill Numbers
// =============================================================================

/// Sequence numbers per second before the stamp is pushed forward.
const MAX_SEQUENCE: u32 = 999;

const STAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Generates `BB-YYYYMMDD-HHMMSS-NNN` bill numbers.
///
/// ## Uniqueness
/// The generator remembers the last stamp it issued. A call within the same
/// second (or after the clock stepped backwards) reuses that stamp with the
/// next sequence number, so numbers are strictly increasing. After 999 bills
/// in one second the stamp moves one second ahead.
///
/// Seed it with the newest persisted number on start-up so a restart within
/// the same second cannot repeat a number.
///
/// ## Example
/// ```rust
/// use billbook_core::bill::BillNumberGenerator;
/// use chrono::NaiveDate;
///
/// let now = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap().and_hms_opt(9, 26, 53).unwrap();
/// let mut numbers = BillNumberGenerator::new();
/// assert_eq!(numbers.next_at(now), "BB-20260314-092653-001");
/// assert_eq!(numbers.next_at(now), "BB-20260314-092653-002");
/// ```
#[derive(Debug, Clone, Default)]
pub struct BillNumberGenerator {
    last: Option<(NaiveDateTime, u32)>,
}

impl BillNumberGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continues after a previously issued number.
    ///
    /// Numbers that do not follow the `BB-YYYYMMDD-HHMMSS-NNN` scheme are
    /// ignored (the unique index still guards the database).
    pub fn resume_after(last_number: Option<&str>) -> Self {
        BillNumberGenerator {
            last: last_number.and_then(parse_bill_number),
        }
    }

    /// Issues the next number for local time `now`.
    pub fn next_at(&mut self, now: NaiveDateTime) -> String {
        let stamp = now.with_nanosecond(0).unwrap_or(now);

        let (stamp, sequence) = match self.last {
            Some((last_stamp, last_seq)) if stamp <= last_stamp => {
                if last_seq >= MAX_SEQUENCE {
                    (last_stamp + chrono::Duration::seconds(1), 1)
                } else {
                    (last_stamp, last_seq + 1)
                }
            }
            _ => (stamp, 1),
        };

        self.last = Some((stamp, sequence));
        format_bill_number(stamp, sequence)
    }
}

fn format_bill_number(stamp: NaiveDateTime, sequence: u32) -> String {
    format!(
        "{}-{}-{:03}",
        BILL_NUMBER_PREFIX,
        stamp.format(STAMP_FORMAT),
        sequence
    )
}

/// Splits `BB-YYYYMMDD-HHMMSS-NNN` into its stamp and sequence.
pub fn parse_bill_number(number: &str) -> Option<(NaiveDateTime, u32)> {
    let rest = number.strip_prefix(BILL_NUMBER_PREFIX)?.strip_prefix('-')?;
    let (stamp, sequence) = rest.rsplit_once('-')?;
    let stamp = NaiveDateTime::parse_from_str(stamp, STAMP_FORMAT).ok()?;
    let sequence = sequence.parse::<u32>().ok()?;
    Some((stamp, sequence))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::{Money, Percent};
    use crate::types::{CustomerRef, Product};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::collections::HashSet;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 15)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn cart_with_item() -> Cart {
        let mut cart = Cart::new();
        let product = Product::new("Tea", "TEA", "pcs", Money::from_cents(2000));
        cart.add_item(&product, Decimal::from(3)).unwrap();
        cart
    }

    fn customer() -> CustomerRef {
        CustomerRef {
            id: "cust-1".to_string(),
            name: "Ravi".to_string(),
            phone: Some("9840012345".to_string()),
        }
    }

    #[test]
    fn test_state_derivation() {
        use PaymentMethod::{Card, Cash, Debt, Upi};

        assert_eq!(
            BillState::of(PaymentMethod::Held, BillStatus::Held),
            BillState::Held
        );
        assert_eq!(BillState::of(Debt, BillStatus::Active), BillState::ActiveUnpaid);
        assert_eq!(BillState::of(Debt, BillStatus::Paid), BillState::Settled);
        assert_eq!(BillState::of(Cash, BillStatus::Paid), BillState::Settled);
        assert_eq!(BillState::of(Card, BillStatus::Paid), BillState::Settled);
        assert_eq!(BillState::of(Upi, BillStatus::Active), BillState::Settled);
    }

    #[test]
    fn test_commit_snapshot() {
        let mut cart = cart_with_item();
        cart.set_discount(Percent::clamped(Decimal::from(10)));

        let new_bill = NewBill::commit(
            &cart,
            PaymentMethod::Cash,
            "BB-20260115-100000-001".to_string(),
            Utc::now(),
        )
        .unwrap();

        assert_eq!(new_bill.bill.status, BillStatus::Paid);
        assert_eq!(new_bill.bill.state(), BillState::Settled);
        assert_eq!(new_bill.bill.subtotal, Money::from_cents(6000));
        assert_eq!(new_bill.bill.discount_amount, Money::from_cents(600));
        assert_eq!(new_bill.bill.grand_total, Money::from_cents(5400));
        assert_eq!(new_bill.items.len(), 1);
        assert_eq!(new_bill.items[0].bill_id, new_bill.bill.id);
        assert_eq!(new_bill.items[0].line_total, Money::from_cents(6000));
        assert_eq!(new_bill.bill.customer_id, None);
    }

    #[test]
    fn test_commit_rejects_empty_cart() {
        let err = NewBill::commit(&Cart::new(), PaymentMethod::Cash, "x".into(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, CoreError::EmptyCart));
    }

    #[test]
    fn test_commit_debt_requires_customer() {
        let mut cart = cart_with_item();
        let err = NewBill::commit(&cart, PaymentMethod::Debt, "x".into(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, CoreError::CustomerRequired { .. }));

        cart.set_customer(customer());
        let new_bill =
            NewBill::commit(&cart, PaymentMethod::Debt, "x".into(), Utc::now()).unwrap();
        assert_eq!(new_bill.bill.status, BillStatus::Active);
        assert_eq!(new_bill.bill.state(), BillState::ActiveUnpaid);
        assert_eq!(new_bill.bill.customer_id.as_deref(), Some("cust-1"));
    }

    #[test]
    fn test_commit_rejects_held_method() {
        let err = NewBill::commit(&cart_with_item(), PaymentMethod::Held, "x".into(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidPaymentMethod { .. }));
    }

    #[test]
    fn test_hold() {
        let new_bill = NewBill::hold(&cart_with_item(), "x".into(), Utc::now()).unwrap();
        assert_eq!(new_bill.bill.payment_method, PaymentMethod::Held);
        assert_eq!(new_bill.bill.status, BillStatus::Held);
        assert!(ensure_resumable(&new_bill.bill).is_ok());

        assert!(matches!(
            NewBill::hold(&Cart::new(), "x".into(), Utc::now()),
            Err(CoreError::EmptyCart)
        ));
    }

    #[test]
    fn test_paid_transition() {
        let mut cart = cart_with_item();
        cart.set_customer(customer());
        let mut bill = NewBill::commit(&cart, PaymentMethod::Debt, "x".into(), Utc::now())
            .unwrap()
            .bill;

        assert_eq!(paid_transition(&bill).unwrap(), PaidTransition::Settle);
        bill.status = BillStatus::Paid;
        assert_eq!(paid_transition(&bill).unwrap(), PaidTransition::AlreadyPaid);

        let held = NewBill::hold(&cart, "y".into(), Utc::now()).unwrap().bill;
        assert!(paid_transition(&held).is_err());
        assert!(ensure_resumable(&bill).is_err());
    }

    #[test]
    fn test_bill_numbers_within_same_second() {
        let mut numbers = BillNumberGenerator::new();
        assert_eq!(numbers.next_at(at(10, 0, 0)), "BB-20260115-100000-001");
        assert_eq!(numbers.next_at(at(10, 0, 0)), "BB-20260115-100000-002");
        assert_eq!(numbers.next_at(at(10, 0, 1)), "BB-20260115-100001-001");
    }

    #[test]
    fn test_bill_numbers_never_go_backwards() {
        let mut numbers = BillNumberGenerator::new();
        let first = numbers.next_at(at(10, 0, 5));
        // Clock stepped back.
        let second = numbers.next_at(at(9, 59, 0));
        assert_eq!(second, "BB-20260115-100005-002");
        assert!(second > first);
    }

    #[test]
    fn test_bill_numbers_roll_over_sequence() {
        let mut numbers = BillNumberGenerator::resume_after(Some("BB-20260115-100000-999"));
        assert_eq!(numbers.next_at(at(10, 0, 0)), "BB-20260115-100001-001");
    }

    #[test]
    fn test_bill_numbers_unique_in_a_burst() {
        let mut numbers = BillNumberGenerator::new();
        let issued: HashSet<String> = (0..2500).map(|_| numbers.next_at(at(12, 0, 0))).collect();
        assert_eq!(issued.len(), 2500);
    }

    #[test]
    fn test_resume_after_persisted_number() {
        let mut numbers = BillNumberGenerator::resume_after(Some("BB-20260115-100000-007"));
        assert_eq!(numbers.next_at(at(10, 0, 0)), "BB-20260115-100000-008");

        let mut numbers = BillNumberGenerator::resume_after(Some("INV-0042"));
        assert_eq!(numbers.next_at(at(10, 0, 0)), "BB-20260115-100000-001");
    }

    #[test]
    fn test_parse_bill_number() {
        let (stamp, seq) = parse_bill_number("BB-20260115-100000-007").unwrap();
        assert_eq!(stamp, at(10, 0, 0));
        assert_eq!(seq, 7);
        assert!(parse_bill_number("BB-2026-1").is_none());
        assert!(parse_bill_number("").is_none());
    }
}
