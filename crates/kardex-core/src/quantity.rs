//! # Quantity Module
//!
//! Fixed-point quantities and unit costs.
//!
//! ## Representation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Value         Stored as         Scale                                  │
//! │  ───────────   ───────────────   ─────────────────────────────────────  │
//! │  Quantity      i64 thousandths   1.5 kg  → 1500                         │
//! │  UnitCost      i64 1/10000ths    0.3333  → 3333                         │
//! │  Money         i64 cents         $10.99  → 1099   (see money.rs)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! User input is parsed leniently with [`Quantity::normalize`]: surrounding
//! whitespace is ignored, a comma is accepted as the decimal separator, and
//! anything unparseable or negative becomes zero. Rounding to the stored
//! scale is half-to-even.

use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

/// Digits after the decimal point kept for quantities.
pub const QUANTITY_SCALE: u32 = 3;

/// Digits after the decimal point kept for unit costs.
pub const UNIT_COST_SCALE: u32 = 4;

/// Parses a decimal string leniently and scales it to an integer.
///
/// Returns `None` when the input is not a number or does not fit in `i64`.
pub(crate) fn parse_scaled(raw: &str, scale: u32) -> Option<i64> {
    let cleaned = raw.trim().replace(',', ".");
    if cleaned.is_empty() {
        return None;
    }

    let value = Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .ok()?;

    value
        .round_dp_with_strategy(scale, RoundingStrategy::MidpointNearestEven)
        .checked_mul(Decimal::from(10_i64.pow(scale)))?
        .to_i64()
}

fn write_scaled(f: &mut fmt::Formatter<'_>, value: i64, scale: u32) -> fmt::Result {
    let unit = 10_i64.pow(scale);
    let sign = if value < 0 { "-" } else { "" };
    let abs = value.unsigned_abs();
    write!(
        f,
        "{}{}.{:0width$}",
        sign,
        abs / unit as u64,
        abs % unit as u64,
        width = scale as usize
    )
}

// =============================================================================
// Quantity
// =============================================================================

/// A quantity of stock in thousandths of a unit.
///
/// Signed so that deltas (adjustments, sale edits) can be expressed, but
/// balances and ledger rows only ever hold non-negative / positive values.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[ts(export)]
pub struct Quantity(i64);

impl Quantity {
    pub const ZERO: Quantity = Quantity(0);

    #[inline]
    pub const fn from_milli(milli: i64) -> Self {
        Quantity(milli)
    }

    /// Whole units, e.g. `from_units(5)` is 5.000.
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Quantity(units * 1000)
    }

    #[inline]
    pub const fn milli(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub const fn abs(&self) -> Self {
        Quantity(self.0.abs())
    }

    /// Normalizes user input into a non-negative quantity.
    ///
    /// ## Example
    /// ```rust
    /// use kardex_core::Quantity;
    ///
    /// assert_eq!(Quantity::normalize(" 2,5 ").milli(), 2500);
    /// assert_eq!(Quantity::normalize("0.0005").milli(), 0); // half-to-even
    /// assert_eq!(Quantity::normalize("0.0015").milli(), 2);
    /// assert!(Quantity::normalize("-4").is_zero());
    /// assert!(Quantity::normalize("").is_zero());
    /// ```
    pub fn normalize(raw: &str) -> Self {
        match parse_scaled(raw, QUANTITY_SCALE) {
            Some(milli) if milli > 0 => Quantity(milli),
            _ => Quantity::ZERO,
        }
    }

    /// Parses a signed delta (used by manual adjustments).
    ///
    /// Unparseable input becomes zero; the sign is kept.
    pub fn normalize_signed(raw: &str) -> Self {
        Quantity(parse_scaled(raw, QUANTITY_SCALE).unwrap_or(0))
    }

    /// The value as a decimal, for reporting.
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, QUANTITY_SCALE)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_scaled(f, self.0, QUANTITY_SCALE)
    }
}

impl Add for Quantity {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Quantity(self.0 + other.0)
    }
}

impl AddAssign for Quantity {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Quantity {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Quantity(self.0 - other.0)
    }
}

impl SubAssign for Quantity {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Quantity {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Quantity(-self.0)
    }
}

impl std::iter::Sum for Quantity {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Quantity::ZERO, |acc, q| acc + q)
    }
}

// =============================================================================
// Unit Cost
// =============================================================================

/// Cost per unit in ten-thousandths of the currency unit.
///
/// Recorded on inflow ledger rows (opening, purchase receipts) for valuation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[ts(export)]
pub struct UnitCost(i64);

impl UnitCost {
    #[inline]
    pub const fn from_raw(ten_thousandths: i64) -> Self {
        UnitCost(ten_thousandths)
    }

    #[inline]
    pub const fn raw(&self) -> i64 {
        self.0
    }

    /// Exact conversion from a cent amount.
    #[inline]
    pub const fn from_money(money: Money) -> Self {
        UnitCost(money.cents() * 100)
    }

    /// Parses user input. Unparseable input is `None` (no cost recorded),
    /// negative input is clamped to zero.
    ///
    /// ## Example
    /// ```rust
    /// use kardex_core::UnitCost;
    ///
    /// assert_eq!(UnitCost::parse("12,5").map(|c| c.raw()), Some(125_000));
    /// assert_eq!(UnitCost::parse("n/a"), None);
    /// ```
    pub fn parse(raw: &str) -> Option<Self> {
        parse_scaled(raw, UNIT_COST_SCALE).map(|v| UnitCost(v.max(0)))
    }

    /// Value of `qty` units at this cost, rounded half-to-even to the cent.
    pub fn value_of(&self, qty: Quantity) -> Money {
        // cost scale 4 + qty scale 3 -> cents scale 2
        Money::from_scaled_product(self.0 as i128 * qty.milli() as i128, 100_000)
    }
}

impl fmt::Display for UnitCost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_scaled(f, self.0, UNIT_COST_SCALE)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_accepts_comma_and_whitespace() {
        assert_eq!(Quantity::normalize("1,500").milli(), 1500);
        assert_eq!(Quantity::normalize("\t3 ").milli(), 3000);
        assert_eq!(Quantity::normalize("0.25").milli(), 250);
    }

    #[test]
    fn test_normalize_garbage_and_negative_become_zero() {
        assert!(Quantity::normalize("abc").is_zero());
        assert!(Quantity::normalize("1.2.3").is_zero());
        assert!(Quantity::normalize("-0.5").is_zero());
        assert!(Quantity::normalize("   ").is_zero());
    }

    #[test]
    fn test_normalize_rounds_half_to_even() {
        assert_eq!(Quantity::normalize("1.0005").milli(), 1000);
        assert_eq!(Quantity::normalize("1.0015").milli(), 1002);
        assert_eq!(Quantity::normalize("1.00051").milli(), 1001);
    }

    #[test]
    fn test_normalize_scientific_notation() {
        assert_eq!(Quantity::normalize("1e2").milli(), 100_000);
    }

    #[test]
    fn test_normalize_overflow_is_zero() {
        assert!(Quantity::normalize("99999999999999999999").is_zero());
    }

    #[test]
    fn test_signed_delta_keeps_sign() {
        assert_eq!(Quantity::normalize_signed("-2,5").milli(), -2500);
        assert_eq!(Quantity::normalize_signed("4").milli(), 4000);
        assert!(Quantity::normalize_signed("x").is_zero());
    }

    #[test]
    fn test_display() {
        assert_eq!(Quantity::from_milli(1500).to_string(), "1.500");
        assert_eq!(Quantity::from_milli(-20).to_string(), "-0.020");
        assert_eq!(UnitCost::from_raw(125_000).to_string(), "12.5000");
    }

    #[test]
    fn test_arithmetic_and_sum() {
        let total: Quantity = [1, 2, 3].iter().map(|u| Quantity::from_units(*u)).sum();
        assert_eq!(total, Quantity::from_units(6));
        assert_eq!(-Quantity::from_units(2), Quantity::from_milli(-2000));
    }

    #[test]
    fn test_unit_cost_value_of() {
        // 1.5 units at 0.3333 = 0.49995 -> 0.50
        let cost = UnitCost::from_raw(3333);
        assert_eq!(cost.value_of(Quantity::from_milli(1500)).cents(), 50);
        assert_eq!(
            UnitCost::from_money(Money::from_cents(250)).value_of(Quantity::from_units(4)),
            Money::from_cents(1000)
        );
    }

    #[test]
    fn test_unit_cost_parse_clamps_negative() {
        assert_eq!(UnitCost::parse("-3"), Some(UnitCost::from_raw(0)));
    }
}
