//! # Cart
//!
//! The sale in progress: line items, an optional customer, a discount and a
//! tax rate. Pure data, no I/O.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  Register Action           Cart Method             State Change         │
//! │  ───────────────           ───────────             ────────────         │
//! │                                                                         │
//! │  Scan / pick product ────► add_item() ───────────► merge or push line   │
//! │                                                                         │
//! │  Edit grid cell ─────────► update_line() ────────► qty / unit / price   │
//! │                                                    (bad input ignored)  │
//! │                                                                         │
//! │  Delete row ─────────────► remove_line() ────────► lines.remove(i)      │
//! │                                                                         │
//! │  New sale ───────────────► clear() ──────────────► lines, customer and  │
//! │                                                    discount dropped     │
//! │                                                                         │
//! │  Show totals ────────────► totals() ─────────────► (read only)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - Lines are unique by `product_id` when added through `add_item`
//! - `line_total` is always `round2(quantity × unit_price)`; there is no way
//!   to set it directly
//! - `subtotal` is the sum of the current line totals at every observation
//! - Edits that would overflow a line or the cart total are refused, so the
//!   totals never wrap

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::{Money, Percent};
use crate::types::{Bill, BillItem, CustomerRef, Product};
use crate::validation::validate_quantity;
use crate::MAX_CART_ITEMS;

// =============================================================================
// Line Item
// =============================================================================

/// A line in the cart.
///
/// Name, unit and price are snapshots taken when the product was first
/// added. Catalog edits made afterwards do not reach the cart.
///
/// A serialized `line_total` is ignored when reading a line back in; it is
/// recomputed from quantity and price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "LineItemFields")]
pub struct LineItem {
    pub product_id: String,
    pub product_name: String,
    pub quantity: Decimal,
    pub unit: String,
    pub unit_price: Money,
    line_total: Money,
}

impl LineItem {
    /// Snapshots a product at the given quantity.
    pub fn from_product(product: &Product, quantity: Decimal) -> Self {
        LineItem::new(
            product.id.clone(),
            product.name.clone(),
            quantity,
            product.unit.clone(),
            product.price,
        )
    }

    pub fn new(
        product_id: String,
        product_name: String,
        quantity: Decimal,
        unit: String,
        unit_price: Money,
    ) -> Self {
        LineItem {
            product_id,
            product_name,
            quantity,
            unit,
            unit_price,
            line_total: unit_price.times_quantity(quantity),
        }
    }

    /// `round2(quantity × unit_price)`.
    pub fn line_total(&self) -> Money {
        self.line_total
    }

    fn recompute(&mut self) {
        self.line_total = self.unit_price.times_quantity(self.quantity);
    }

    /// Recomputes the total, or `None` if it overflows.
    fn checked_recompute(mut self) -> Option<Self> {
        self.line_total = self.unit_price.checked_times_quantity(self.quantity)?;
        Some(self)
    }
}

#[derive(Deserialize)]
struct LineItemFields {
    product_id: String,
    product_name: String,
    quantity: Decimal,
    unit: String,
    unit_price: Money,
}

impl From<LineItemFields> for LineItem {
    fn from(fields: LineItemFields) -> Self {
        LineItem::new(
            fields.product_id,
            fields.product_name,
            fields.quantity,
            fields.unit,
            fields.unit_price,
        )
    }
}

/// Editable cells of a cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineField {
    Quantity,
    Unit,
    UnitPrice,
}

// =============================================================================
// Totals
// =============================================================================

/// Cart totals, each figure already rounded to a minor unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartTotals {
    pub subtotal: Money,
    pub discount_amount: Money,
    pub tax_amount: Money,
    pub grand_total: Money,
}

impl CartTotals {
    /// Applies discount then tax to a subtotal.
    ///
    /// Tax is charged on the discounted amount.
    pub fn compute(subtotal: Money, discount: Percent, tax: Percent) -> Self {
        let discount_amount = subtotal.percentage(discount);
        let tax_amount = (subtotal - discount_amount).percentage(tax);
        CartTotals {
            subtotal,
            discount_amount,
            tax_amount,
            grand_total: subtotal - discount_amount + tax_amount,
        }
    }
}

// =============================================================================
// Cart
// =============================================================================

/// Largest subtotal a cart may reach. Half of `i64::MAX` leaves room for
/// tax up to 100% on top.
const MAX_SUBTOTAL: Money = Money::from_cents(i64::MAX / 2);

/// The shopping cart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<LineItem>,
    customer: Option<CustomerRef>,
    discount: Percent,
    tax: Percent,
}

impl Cart {
    /// Creates a new empty cart with no tax.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty cart charging `tax` (the store default).
    pub fn with_tax(tax: Percent) -> Self {
        Cart {
            tax,
            ..Self::default()
        }
    }

    /// Rebuilds a cart from a held bill and its items.
    ///
    /// Lines keep the frozen name, unit and price of the bill items.
    pub fn from_held(bill: &Bill, items: &[BillItem], customer: Option<CustomerRef>) -> Self {
        Cart {
            lines: items
                .iter()
                .map(|item| {
                    LineItem::new(
                        item.product_id.clone(),
                        item.product_name.clone(),
                        item.quantity,
                        item.unit.clone(),
                        item.unit_price,
                    )
                })
                .collect(),
            customer,
            discount: bill.discount_percent,
            tax: bill.tax_percent,
        }
    }

    /// Adds a product or merges it into its existing line.
    ///
    /// ## Behavior
    /// - Same product already in cart: quantities are summed and the total is
    ///   recomputed at the price captured on the first add
    /// - Otherwise: a new line snapshots the product's current name, unit
    ///   and price
    ///
    /// ## Errors
    /// - Quantity not positive
    /// - [`CoreError::CartTooLarge`] when a new line would exceed
    ///   [`MAX_CART_ITEMS`]
    /// - [`CoreError::AmountTooLarge`] when the line or cart total would
    ///   overflow; the cart is left unchanged
    pub fn add_item(&mut self, product: &Product, quantity: Decimal) -> CoreResult<()> {
        validate_quantity(quantity)?;
        let too_large = || CoreError::AmountTooLarge {
            product_id: product.id.clone(),
        };

        if let Some(index) = self.lines.iter().position(|l| l.product_id == product.id) {
            let mut merged = self.lines[index].clone();
            merged.quantity = merged.quantity.checked_add(quantity).ok_or_else(too_large)?;
            let merged = merged.checked_recompute().ok_or_else(too_large)?;
            if !self.fits_with(Some(index), &merged) {
                return Err(too_large());
            }
            self.lines[index] = merged;
            return Ok(());
        }

        if self.lines.len() >= MAX_CART_ITEMS {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_ITEMS,
            });
        }

        let line = LineItem::from_product(product, quantity)
            .checked_recompute()
            .ok_or_else(too_large)?;
        if !self.fits_with(None, &line) {
            return Err(too_large());
        }
        self.lines.push(line);
        Ok(())
    }

    /// Edits one cell of a line from raw register input.
    ///
    /// Non-numeric or negative quantities and prices, blank units,
    /// out-of-range indexes and values whose totals would overflow leave the
    /// cart untouched. Returns whether the edit was applied.
    pub fn update_line(&mut self, index: usize, field: LineField, value: &str) -> bool {
        let Some(mut line) = self.lines.get(index).cloned() else {
            return false;
        };

        match field {
            LineField::Quantity => match Decimal::from_str(value.trim()) {
                Ok(quantity) if !quantity.is_sign_negative() => line.quantity = quantity,
                _ => return false,
            },
            LineField::Unit => {
                let unit = value.trim();
                if unit.is_empty() {
                    return false;
                }
                line.unit = unit.to_string();
            }
            LineField::UnitPrice => match Money::parse(value) {
                Some(price) if !price.is_negative() => line.unit_price = price,
                _ => return false,
            },
        }

        match line.checked_recompute() {
            Some(line) if self.fits_with(Some(index), &line) => {
                self.lines[index] = line;
                true
            }
            _ => false,
        }
    }

    /// Whether the subtotal stays within [`MAX_SUBTOTAL`] once `candidate`
    /// replaces the line at `replacing` (or is appended).
    fn fits_with(&self, replacing: Option<usize>, candidate: &LineItem) -> bool {
        self.lines
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != replacing)
            .try_fold(candidate.line_total, |acc, (_, l)| acc.checked_add(l.line_total))
            .is_some_and(|subtotal| subtotal <= MAX_SUBTOTAL)
    }

    /// Removes a line.
    pub fn remove_line(&mut self, index: usize) -> CoreResult<LineItem> {
        if index >= self.lines.len() {
            return Err(CoreError::LineOutOfRange { index });
        }
        Ok(self.lines.remove(index))
    }

    /// Starts a new sale: drops lines, customer and discount. Tax stays.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.customer = None;
        self.discount = Percent::zero();
    }

    pub fn set_discount(&mut self, discount: Percent) {
        self.discount = discount;
    }

    /// Sets the discount from the register's text box. Junk becomes 0%.
    pub fn set_discount_input(&mut self, input: &str) {
        self.discount = Percent::parse_lenient(input);
    }

    pub fn set_tax(&mut self, tax: Percent) {
        self.tax = tax;
    }

    pub fn set_customer(&mut self, customer: CustomerRef) {
        self.customer = Some(customer);
    }

    pub fn clear_customer(&mut self) {
        self.customer = None;
    }

    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    pub fn customer(&self) -> Option<&CustomerRef> {
        self.customer.as_ref()
    }

    pub fn discount(&self) -> Percent {
        self.discount
    }

    pub fn tax(&self) -> Percent {
        self.tax
    }

    /// Returns the number of lines in the cart.
    pub fn item_count(&self) -> usize {
        self.lines.len()
    }

    /// Returns the total quantity across lines (mixed units are summed as-is).
    pub fn total_quantity(&self) -> Decimal {
        self.lines
            .iter()
            .fold(Decimal::ZERO, |acc, l| acc.saturating_add(l.quantity))
    }

    pub fn subtotal(&self) -> Money {
        self.lines.iter().map(|l| l.line_total).sum()
    }

    pub fn totals(&self) -> CartTotals {
        CartTotals::compute(self.subtotal(), self.discount, self.tax)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// What is left of this cart once `saved` (an earlier snapshot of it)
    /// has been stored as a bill.
    ///
    /// Lines added after the snapshot stay. A line that grew after the
    /// snapshot keeps only the extra quantity. Customer and discount stay
    /// only if they were changed after the snapshot. The new cart charges
    /// `tax`.
    pub fn remainder_after(&self, saved: &Cart, tax: Percent) -> Cart {
        let lines = self
            .lines
            .iter()
            .filter_map(|line| {
                let Some(done) = saved.lines.iter().find(|s| s.product_id == line.product_id)
                else {
                    return Some(line.clone());
                };
                let rest = line.quantity.checked_sub(done.quantity)?;
                if rest <= Decimal::ZERO {
                    return None;
                }
                let mut line = line.clone();
                line.quantity = rest;
                line.recompute();
                Some(line)
            })
            .collect();

        Cart {
            lines,
            customer: if self.customer != saved.customer {
                self.customer.clone()
            } else {
                None
            },
            discount: if self.discount != saved.discount {
                self.discount
            } else {
                Percent::zero()
            },
            tax,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(code: &str, price_cents: i64) -> Product {
        Product::new(format!("Product {}", code), code, "pcs", Money::from_cents(price_cents))
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_two_line_example_with_discount() {
        let rice = Product::new("Rice", "RICE", "kg", Money::from_cents(5000));
        let oil = Product::new("Oil", "OIL", "l", Money::from_cents(15000));

        let mut cart = Cart::new();
        cart.add_item(&rice, Decimal::from(2)).unwrap();
        cart.add_item(&oil, Decimal::from(1)).unwrap();
        cart.set_discount_input("10");

        assert_eq!(cart.lines()[0].line_total(), Money::from_cents(10000));
        assert_eq!(cart.lines()[1].line_total(), Money::from_cents(15000));

        let totals = cart.totals();
        assert_eq!(totals.subtotal, Money::from_cents(25000));
        assert_eq!(totals.discount_amount, Money::from_cents(2500));
        assert_eq!(totals.tax_amount, Money::zero());
        assert_eq!(totals.grand_total, Money::from_cents(22500));
    }

    #[test]
    fn test_merge_keeps_captured_price() {
        let mut catalog_item = product("SUG", 4000);
        let mut cart = Cart::new();
        cart.add_item(&catalog_item, Decimal::from(1)).unwrap();

        // Price changes in the catalog after the first add.
        catalog_item.price = Money::from_cents(9999);
        cart.add_item(&catalog_item, dec("1.5")).unwrap();

        assert_eq!(cart.item_count(), 1);
        let line = &cart.lines()[0];
        assert_eq!(line.quantity, dec("2.5"));
        assert_eq!(line.unit_price, Money::from_cents(4000));
        assert_eq!(line.line_total(), Money::from_cents(10000));
    }

    #[test]
    fn test_add_rejects_non_positive_quantity() {
        let mut cart = Cart::new();
        assert!(cart.add_item(&product("A", 100), Decimal::ZERO).is_err());
        assert!(cart.add_item(&product("A", 100), Decimal::from(-1)).is_err());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_cart_too_large() {
        let mut cart = Cart::new();
        for i in 0..MAX_CART_ITEMS {
            cart.add_item(&product(&format!("P{}", i), 100), Decimal::ONE).unwrap();
        }
        let err = cart
            .add_item(&product("ONE-MORE", 100), Decimal::ONE)
            .unwrap_err();
        assert!(matches!(err, CoreError::CartTooLarge { .. }));
    }

    #[test]
    fn test_update_line_applies_valid_edits() {
        let mut cart = Cart::new();
        cart.add_item(&product("A", 2000), Decimal::from(3)).unwrap();

        assert!(cart.update_line(0, LineField::Quantity, "4"));
        assert_eq!(cart.lines()[0].line_total(), Money::from_cents(8000));

        assert!(cart.update_line(0, LineField::UnitPrice, "17.50"));
        assert_eq!(cart.lines()[0].line_total(), Money::from_cents(7000));

        assert!(cart.update_line(0, LineField::Unit, " box "));
        assert_eq!(cart.lines()[0].unit, "box");

        assert_eq!(cart.subtotal(), Money::from_cents(7000));
    }

    #[test]
    fn test_update_line_ignores_bad_input() {
        let mut cart = Cart::new();
        cart.add_item(&product("A", 2000), Decimal::from(3)).unwrap();
        let before = cart.clone();

        assert!(!cart.update_line(0, LineField::Quantity, "three"));
        assert!(!cart.update_line(0, LineField::Quantity, "-1"));
        assert!(!cart.update_line(0, LineField::UnitPrice, "free"));
        assert!(!cart.update_line(0, LineField::UnitPrice, "-5"));
        assert!(!cart.update_line(0, LineField::Unit, "   "));
        assert!(!cart.update_line(7, LineField::Quantity, "1"));

        assert_eq!(cart, before);
    }

    #[test]
    fn test_subtotal_tracks_line_totals_through_edits() {
        let mut cart = Cart::new();
        let products: Vec<Product> = (0..5)
            .map(|i| product(&format!("P{}", i), 333 + i * 101))
            .collect();

        // Deterministic mix of adds, edits and removals.
        for step in 0..60usize {
            let p = &products[step % products.len()];
            match step % 4 {
                0 | 1 => cart
                    .add_item(p, Decimal::new((step as i64 % 7) + 1, 1))
                    .unwrap(),
                2 => {
                    let index = step % (cart.item_count() + 1);
                    cart.update_line(index, LineField::Quantity, &format!("{}.25", step % 3));
                }
                _ => {
                    if step % 3 == 0 && !cart.is_empty() {
                        cart.remove_line(0).unwrap();
                    }
                }
            }

            let expected: Money = cart
                .lines()
                .iter()
                .map(|l| l.unit_price.times_quantity(l.quantity))
                .sum();
            assert_eq!(cart.subtotal(), expected);
            assert_eq!(cart.totals().subtotal, expected);
        }
    }

    #[test]
    fn test_discount_never_exceeds_subtotal() {
        let mut cart = Cart::new();
        cart.add_item(&product("A", 1234), Decimal::from(2)).unwrap();

        for input in ["0", "50", "100", "150", "-20", "abc", ""] {
            cart.set_discount_input(input);
            let totals = cart.totals();
            assert!(totals.discount_amount <= totals.subtotal);
            assert!(!totals.grand_total.is_negative());
            assert_eq!(
                totals.grand_total,
                totals.subtotal - totals.discount_amount + totals.tax_amount
            );
        }

        cart.set_discount_input("abc");
        assert!(cart.discount().is_zero());
    }

    #[test]
    fn test_tax_applies_to_discounted_amount() {
        let mut cart = Cart::with_tax(Percent::clamped(Decimal::from(18)));
        cart.add_item(&product("A", 10000), Decimal::ONE).unwrap();
        cart.set_discount(Percent::clamped(Decimal::from(10)));

        let totals = cart.totals();
        assert_eq!(totals.discount_amount, Money::from_cents(1000));
        // (100.00 - 10.00) × 18% = 16.20
        assert_eq!(totals.tax_amount, Money::from_cents(1620));
        assert_eq!(totals.grand_total, Money::from_cents(10620));
    }

    #[test]
    fn test_step_wise_rounding() {
        let mut cart = Cart::new();
        // 3 × 0.333 × 1.00 lines, each rounds to 0.33 on its own
        for code in ["A", "B", "C"] {
            cart.add_item(&product(code, 100), dec("0.333")).unwrap();
        }
        assert_eq!(cart.subtotal(), Money::from_cents(99));
    }

    #[test]
    fn test_clear_drops_customer_and_discount_keeps_tax() {
        let mut cart = Cart::with_tax(Percent::clamped(Decimal::from(5)));
        cart.add_item(&product("A", 100), Decimal::ONE).unwrap();
        cart.set_discount(Percent::clamped(Decimal::from(10)));
        cart.set_customer(CustomerRef {
            id: "c-1".to_string(),
            name: "Meena".to_string(),
            phone: None,
        });

        cart.clear();

        assert!(cart.is_empty());
        assert!(cart.customer().is_none());
        assert!(cart.discount().is_zero());
        assert_eq!(cart.tax().value(), Decimal::from(5));
    }

    #[test]
    fn test_remove_line() {
        let mut cart = Cart::new();
        cart.add_item(&product("A", 100), Decimal::ONE).unwrap();
        cart.add_item(&product("B", 200), Decimal::ONE).unwrap();

        let removed = cart.remove_line(0).unwrap();
        assert_eq!(removed.product_name, "Product A");
        assert_eq!(cart.subtotal(), Money::from_cents(200));
        assert!(matches!(
            cart.remove_line(5),
            Err(CoreError::LineOutOfRange { index: 5 })
        ));
    }

    #[test]
    fn test_update_line_rejects_price_typos() {
        let mut cart = Cart::new();
        cart.add_item(&product("A", 2000), Decimal::from(3)).unwrap();
        let before = cart.clone();

        for typo in ["1O0", "12abc", "1e3", "1,5"] {
            assert!(!cart.update_line(0, LineField::UnitPrice, typo), "{}", typo);
        }
        assert_eq!(cart, before);

        assert!(cart.update_line(0, LineField::UnitPrice, "₹1,250"));
        assert_eq!(cart.lines()[0].unit_price, Money::from_cents(125000));
    }

    #[test]
    fn test_overflowing_edits_are_refused() {
        let mut cart = Cart::new();
        let item = product("A", 2000);
        cart.add_item(&item, Decimal::from(3)).unwrap();
        let before = cart.clone();

        assert!(!cart.update_line(0, LineField::Quantity, "79228162514264337593543950"));
        assert!(!cart.update_line(0, LineField::Quantity, "1000000000000000000"));
        assert!(!cart.update_line(0, LineField::UnitPrice, "99999999999999999"));
        assert_eq!(cart, before);

        let err = cart.add_item(&item, Decimal::MAX).unwrap_err();
        assert!(matches!(err, CoreError::AmountTooLarge { .. }));
        let err = cart
            .add_item(&product("B", 100), dec("100000000000000000000"))
            .unwrap_err();
        assert!(matches!(err, CoreError::AmountTooLarge { .. }));
        assert_eq!(cart, before);

        // Price zero keeps the total at zero whatever the quantity.
        cart.add_item(&product("FREE", 0), Decimal::MAX).unwrap();
        assert_eq!(cart.subtotal(), Money::from_cents(6000));
        assert_eq!(cart.total_quantity(), Decimal::MAX);
    }

    #[test]
    fn test_line_total_recomputed_on_deserialize() {
        let json = r#"{
            "product_id": "p-1",
            "product_name": "Rice",
            "quantity": "2",
            "unit": "kg",
            "unit_price": 5000,
            "line_total": 1
        }"#;
        let line: LineItem = serde_json::from_str(json).unwrap();
        assert_eq!(line.line_total(), Money::from_cents(10000));

        let mut cart = Cart::new();
        cart.add_item(&product("A", 333), dec("1.5")).unwrap();
        let round_trip: Cart = serde_json::from_str(&serde_json::to_string(&cart).unwrap()).unwrap();
        assert_eq!(round_trip, cart);
    }

    #[test]
    fn test_remainder_after_keeps_later_changes() {
        let salt = product("SALT", 2000);
        let oil = product("OIL", 15500);
        let customer = CustomerRef {
            id: "c-1".to_string(),
            name: "Meena".to_string(),
            phone: None,
        };

        let mut cart = Cart::new();
        cart.add_item(&salt, Decimal::ONE).unwrap();
        cart.set_customer(customer.clone());
        cart.set_discount(Percent::clamped(Decimal::from(5)));
        let saved = cart.clone();

        let tax = Percent::clamped(Decimal::from(18));
        let fresh = cart.remainder_after(&saved, tax);
        assert!(fresh.is_empty());
        assert!(fresh.customer().is_none());
        assert!(fresh.discount().is_zero());
        assert_eq!(fresh.tax(), tax);

        cart.add_item(&salt, Decimal::from(2)).unwrap();
        cart.add_item(&oil, Decimal::ONE).unwrap();
        cart.set_discount(Percent::clamped(Decimal::from(10)));

        let rest = cart.remainder_after(&saved, tax);
        assert_eq!(rest.item_count(), 2);
        assert_eq!(rest.lines()[0].quantity, Decimal::from(2));
        assert_eq!(rest.lines()[0].line_total(), Money::from_cents(4000));
        assert_eq!(rest.lines()[1].product_id, oil.id);
        assert!(rest.customer().is_none());
        assert_eq!(rest.discount().value(), Decimal::from(10));
    }

    #[test]
    fn test_total_quantity() {
        let mut cart = Cart::new();
        cart.add_item(&product("A", 100), dec("1.5")).unwrap();
        cart.add_item(&product("B", 100), Decimal::from(2)).unwrap();
        assert_eq!(cart.total_quantity(), dec("3.5"));
    }
}
