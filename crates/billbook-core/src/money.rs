//! # Money Module
//!
//! Provides the `Money` type for monetary values and the `Percent` type for
//! discounts and tax.
//!
//! ## Integer Money, Decimal Quantities
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Money     → i64 minor units (paise/cents). Never a float.             │
//! │  Quantity  → rust_decimal::Decimal (1.5 kg of rice is normal here)     │
//! │  Percent   → Decimal clamped to 0..=100                                │
//! │                                                                         │
//! │  Money × Quantity and Money × Percent produce a Decimal number of      │
//! │  minor units, which is rounded HALF-UP to a whole minor unit           │
//! │  immediately. Every displayed figure is rounded on its own:            │
//! │                                                                         │
//! │    line_total = round2(qty × unit_price)                               │
//! │    subtotal   = Σ line_total                                           │
//! │    discount   = round2(subtotal × pct / 100)                           │
//! │    tax        = round2((subtotal − discount) × tax_pct / 100)          │
//! │    grand      = subtotal − discount + tax                              │
//! │                                                                         │
//! │  Step-wise rounding can drift a cent from lump-sum rounding. That is   │
//! │  accepted: printed receipts must add up line by line.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use billbook_core::money::{Money, Percent};
//! use rust_decimal::Decimal;
//!
//! let price = Money::from_cents(4999); // 49.99
//! let line = price.times_quantity(Decimal::new(15, 1)); // 1.5 units
//! assert_eq!(line.cents(), 7499); // 74.985 rounds half-up to 74.99
//!
//! let discount = line.percentage(Percent::clamped(Decimal::from(10)));
//! assert_eq!(discount.cents(), 750); // 7.499 → 7.50
//! ```

use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

/// Minor units per major unit.
const MINOR_PER_MAJOR: i64 = 100;

/// Decimal places shown for money.
const DECIMAL_PLACES: u32 = 2;

/// Rounds a decimal number of minor units to a whole minor unit, half-up.
///
/// Saturates instead of wrapping if the value does not fit in `i64`.
fn round_minor(value: Decimal) -> i64 {
    checked_round_minor(value).unwrap_or(if value.is_sign_negative() {
        i64::MIN
    } else {
        i64::MAX
    })
}

fn checked_round_minor(value: Decimal) -> Option<i64> {
    value
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

/// Currency symbols accepted in front of typed amounts.
const CURRENCY_SYMBOLS: &[char] = &['₹', '$', '€', '£'];

/// Removes thousands separators from the integer part of `amount`.
///
/// Commas must sit between digit groups: the last group has three digits,
/// earlier ones two or three (so both `1,250,000` and `12,50,000` pass).
fn strip_grouping(amount: &str) -> Option<String> {
    let (int_part, frac_part) = match amount.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (amount, None),
    };

    let mut groups: Vec<&str> = int_part.split(',').collect();
    if groups.len() > 1 {
        let last = groups.pop()?;
        let first = groups.remove(0);
        let first_ok = (1..=3).contains(&first.len());
        let middle_ok = groups.iter().all(|g| (2..=3).contains(&g.len()));
        if !first_ok || !middle_ok || last.len() != 3 {
            return None;
        }
    }

    let mut cleaned = int_part.replace(',', "");
    if let Some(frac_part) = frac_part {
        cleaned.push('.');
        cleaned.push_str(frac_part);
    }
    Some(cleaned)
}

/// `digits[.digits]` with an optional leading minus.
fn is_plain_number(text: &str) -> bool {
    let unsigned = text.strip_prefix('-').unwrap_or(text);
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (unsigned, ""),
    };
    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    !(int_part.is_empty() && frac_part.is_empty())
        && all_digits(int_part)
        && all_digits(frac_part)
}

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit.
///
/// ## Design Decisions
/// - **i64 (signed)**: subtraction of a discount can be expressed directly
/// - **Single field tuple struct**: zero-cost wrapper
/// - **No symbol**: `Display` renders `250.00`; the register config decides
///   between `₹`, `$`, etc.
///
/// ## Where Money Flows
/// ```text
/// Product.price ──► LineItem.unit_price ──► LineItem.line_total
///                                                  │
///                    Cart.subtotal ◄───────────────┘
///                         │
///                         ├──► discount_amount / tax_amount
///                         ▼
///                    grand_total ──► Bill.grand_total ──► Debt ledger
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    ///
    /// ## Example
    /// ```rust
    /// use billbook_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // 10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// ## Example
    /// ```rust
    /// use billbook_core::money::Money;
    ///
    /// assert_eq!(Money::from_major_minor(10, 99).cents(), 1099);
    /// assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    /// ```
    ///
    /// ## Note
    /// For negative amounts, only the major unit should be negative.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * MINOR_PER_MAJOR - minor)
        } else {
            Money(major * MINOR_PER_MAJOR + minor)
        }
    }

    /// Converts a decimal amount in major units, rounding half-up to the
    /// nearest minor unit.
    ///
    /// ## Example
    /// ```rust
    /// use billbook_core::money::Money;
    /// use rust_decimal::Decimal;
    ///
    /// assert_eq!(Money::from_decimal(Decimal::new(12345, 3)).cents(), 1235);
    /// ```
    ///
    /// Saturates at the `i64` limits for amounts too large to represent.
    pub fn from_decimal(amount: Decimal) -> Self {
        Money::checked_from_decimal(amount).unwrap_or(if amount.is_sign_negative() {
            Money(i64::MIN)
        } else {
            Money(i64::MAX)
        })
    }

    /// Like [`Money::from_decimal`], but `None` when the amount does not fit.
    pub fn checked_from_decimal(amount: Decimal) -> Option<Self> {
        amount
            .checked_mul(Decimal::from(MINOR_PER_MAJOR))
            .and_then(checked_round_minor)
            .map(Money)
    }

    /// Parses user input such as `"150"`, `"150.5"` or `"₹1,250.00"`.
    ///
    /// Surrounding whitespace, one leading currency symbol and thousands
    /// separators between digit groups are accepted. Any other character
    /// makes the input invalid.
    ///
    /// ## Example
    /// ```rust
    /// use billbook_core::money::Money;
    ///
    /// assert_eq!(Money::parse("₹1,250.50"), Some(Money::from_cents(125050)));
    /// assert_eq!(Money::parse("abc"), None);
    /// assert_eq!(Money::parse("1O0"), None);
    /// ```
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        let amount = trimmed
            .strip_prefix(CURRENCY_SYMBOLS)
            .unwrap_or(trimmed)
            .trim_start();

        let cleaned = strip_grouping(amount)?;
        if !is_plain_number(&cleaned) {
            return None;
        }
        Decimal::from_str(&cleaned)
            .ok()
            .and_then(Money::checked_from_decimal)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    ///
    /// ## Example
    /// ```rust
    /// use billbook_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(1099).major(), 10);
    /// assert_eq!(Money::from_cents(-550).major(), -5);
    /// ```
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / MINOR_PER_MAJOR
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor_part(&self) -> i64 {
        (self.0 % MINOR_PER_MAJOR).abs()
    }

    /// Returns the value as a decimal number of major units (`250.00`).
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, DECIMAL_PLACES)
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Multiplies a unit price by a (possibly fractional) quantity.
    ///
    /// ## User Workflow
    /// ```text
    /// Product: Basmati Rice 120.00 / kg
    /// Quantity: 2.5
    ///      │
    ///      ▼
    /// times_quantity(2.5) ← THIS FUNCTION
    ///      │
    ///      ▼
    /// Line Total: 300.00
    /// ```
    ///
    /// Saturates when the product does not fit; see
    /// [`Money::checked_times_quantity`].
    pub fn times_quantity(&self, quantity: Decimal) -> Money {
        self.checked_times_quantity(quantity).unwrap_or({
            if self.is_negative() != quantity.is_sign_negative() {
                Money(i64::MIN)
            } else {
                Money(i64::MAX)
            }
        })
    }

    /// `None` when `quantity × self` overflows.
    ///
    /// ## Example
    /// ```rust
    /// use billbook_core::money::Money;
    /// use rust_decimal::Decimal;
    ///
    /// assert!(Money::from_cents(100).checked_times_quantity(Decimal::MAX).is_none());
    /// ```
    pub fn checked_times_quantity(&self, quantity: Decimal) -> Option<Money> {
        Decimal::from(self.0)
            .checked_mul(quantity)
            .and_then(checked_round_minor)
            .map(Money)
    }

    #[inline]
    pub const fn checked_add(self, other: Money) -> Option<Money> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Returns `percent` of this amount, rounded half-up to a minor unit.
    ///
    /// Used for both discount and tax amounts.
    ///
    /// ## Example
    /// ```rust
    /// use billbook_core::money::{Money, Percent};
    /// use rust_decimal::Decimal;
    ///
    /// let subtotal = Money::from_cents(25000);
    /// let discount = subtotal.percentage(Percent::clamped(Decimal::from(10)));
    /// assert_eq!(discount.cents(), 2500);
    /// ```
    pub fn percentage(&self, percent: Percent) -> Money {
        Money(round_minor(
            Decimal::from(self.0) * percent.value() / Decimal::ONE_HUNDRED,
        ))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Renders `250.00` / `-5.50`. Symbols are added by the register config.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

/// Multiplication by a whole quantity.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

// =============================================================================
// Percent
// =============================================================================

/// A percentage in the closed range `0..=100`.
///
/// Construction always clamps, so a discount can never exceed the subtotal
/// and `grand_total` can never go negative because of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Percent(Decimal);

impl Percent {
    /// Creates a percentage, clamping to `0..=100`.
    ///
    /// ## Example
    /// ```rust
    /// use billbook_core::money::Percent;
    /// use rust_decimal::Decimal;
    ///
    /// assert_eq!(Percent::clamped(Decimal::from(150)).value(), Decimal::from(100));
    /// assert_eq!(Percent::clamped(Decimal::from(-5)).value(), Decimal::ZERO);
    /// ```
    pub fn clamped(value: Decimal) -> Self {
        Percent(value.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED).normalize())
    }

    /// Parses register input leniently.
    ///
    /// A trailing `%` and whitespace are accepted. Anything that is not a
    /// number becomes `0%`; out-of-range numbers are clamped.
    ///
    /// ## Example
    /// ```rust
    /// use billbook_core::money::Percent;
    /// use rust_decimal::Decimal;
    ///
    /// assert_eq!(Percent::parse_lenient("12.5%").value(), Decimal::new(125, 1));
    /// assert!(Percent::parse_lenient("ten").is_zero());
    /// ```
    pub fn parse_lenient(input: &str) -> Self {
        let trimmed = input.trim().trim_end_matches('%').trim();
        Decimal::from_str(trimmed)
            .map(Percent::clamped)
            .unwrap_or_else(|_| Percent::zero())
    }

    /// Zero percent.
    #[inline]
    pub const fn zero() -> Self {
        Percent(Decimal::ZERO)
    }

    /// Returns the percentage as a decimal (`12.5` for 12.5%).
    #[inline]
    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Checks if the percentage is zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl Default for Percent {
    fn default() -> Self {
        Percent::zero()
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.major(), 10);
        assert_eq!(money.minor_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "10.99");
        assert_eq!(Money::from_cents(500).to_string(), "5.00");
        assert_eq!(Money::from_cents(-550).to_string(), "-5.50");
        assert_eq!(Money::from_cents(0).to_string(), "0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);

        let total: Money = [a, b, b].iter().sum();
        assert_eq!(total.cents(), 2000);
    }

    #[test]
    fn test_times_quantity_whole_and_fractional() {
        let price = Money::from_cents(5000);
        assert_eq!(price.times_quantity(Decimal::from(2)).cents(), 10000);

        // 0.333 × 10.00 = 3.33
        let price = Money::from_cents(1000);
        assert_eq!(price.times_quantity(Decimal::new(333, 3)).cents(), 333);
    }

    #[test]
    fn test_times_quantity_rounds_half_up() {
        // 0.5 × 0.01 = 0.005 → 0.01
        assert_eq!(Money::from_cents(1).times_quantity(Decimal::new(5, 1)).cents(), 1);
        // 0.4 × 0.01 = 0.004 → 0.00
        assert_eq!(Money::from_cents(1).times_quantity(Decimal::new(4, 1)).cents(), 0);
        // 2.5 × 0.03 = 0.075 → 0.08
        assert_eq!(Money::from_cents(3).times_quantity(Decimal::new(25, 1)).cents(), 8);
    }

    #[test]
    fn test_percentage() {
        let subtotal = Money::from_cents(25000);
        assert_eq!(
            subtotal.percentage(Percent::clamped(Decimal::from(10))).cents(),
            2500
        );

        // 33.33 × 15% = 4.9995 → 5.00
        let subtotal = Money::from_cents(3333);
        assert_eq!(
            subtotal.percentage(Percent::clamped(Decimal::from(15))).cents(),
            500
        );

        assert!(subtotal.percentage(Percent::zero()).is_zero());
    }

    #[test]
    fn test_parse() {
        assert_eq!(Money::parse("150"), Some(Money::from_cents(15000)));
        assert_eq!(Money::parse(" 150.5 "), Some(Money::from_cents(15050)));
        assert_eq!(Money::parse("₹99.99"), Some(Money::from_cents(9999)));
        assert_eq!(Money::parse("1.005"), Some(Money::from_cents(101)));
        assert_eq!(Money::parse(""), None);
        assert_eq!(Money::parse("twelve"), None);
        assert_eq!(Money::parse("1.2.3"), None);
        assert_eq!(Money::parse("$ 12"), Some(Money::from_cents(1200)));
        assert_eq!(Money::parse("12,50,000"), Some(Money::from_cents(125_000_000)));
    }

    #[test]
    fn test_parse_rejects_typos() {
        for input in ["1O0", "12abc", "1e3", "1,5", "1,2345", ",100", "1.5.", "-", ".", "₹", "12₹"] {
            assert_eq!(Money::parse(input), None, "{:?} should not parse", input);
        }
    }

    #[test]
    fn test_parse_out_of_range() {
        assert_eq!(Money::parse("79228162514264337593543950"), None);
        assert_eq!(Money::parse("99999999999999999999"), None);
    }

    #[test]
    fn test_checked_arithmetic() {
        let big = Money::from_cents(i64::MAX);
        assert!(big.checked_add(Money::from_cents(1)).is_none());
        assert_eq!(
            Money::from_cents(1).checked_add(Money::from_cents(2)),
            Some(Money::from_cents(3))
        );

        assert!(big.checked_times_quantity(Decimal::from(2)).is_none());
        assert_eq!(big.times_quantity(Decimal::from(2)), big);
        assert_eq!(
            Money::from_decimal(Decimal::MAX),
            Money::from_cents(i64::MAX)
        );
    }

    #[test]
    fn test_from_decimal_and_back() {
        let money = Money::from_decimal(Decimal::new(25000, 2));
        assert_eq!(money.cents(), 25000);
        assert_eq!(money.to_decimal(), Decimal::new(25000, 2));
    }

    #[test]
    fn test_percent_clamping() {
        assert_eq!(Percent::clamped(Decimal::from(101)).value(), Decimal::ONE_HUNDRED);
        assert_eq!(Percent::clamped(Decimal::from(-1)).value(), Decimal::ZERO);
        assert_eq!(Percent::clamped(Decimal::new(75, 1)).value(), Decimal::new(75, 1));
    }

    #[test]
    fn test_percent_parse_lenient() {
        assert_eq!(Percent::parse_lenient("10").value(), Decimal::from(10));
        assert_eq!(Percent::parse_lenient(" 5 % ").value(), Decimal::from(5));
        assert_eq!(Percent::parse_lenient("250").value(), Decimal::ONE_HUNDRED);
        assert!(Percent::parse_lenient("").is_zero());
        assert!(Percent::parse_lenient("abc").is_zero());
        assert_eq!(Percent::parse_lenient("12.5").to_string(), "12.5%");
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());

        let negative = Money::from_cents(-100);
        assert!(negative.is_negative());
        assert_eq!(negative.abs().cents(), 100);
    }
}
