//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    Prices, costs and totals are i64 cents. Fractional quantities are   │
//! │    multiplied in i128 and rounded half-to-even back to cents.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use kardex_core::{Money, Quantity};
//!
//! let price = Money::from_cents(1099); // $10.99
//! let line = price.times(Quantity::from_units(3));
//! assert_eq!(line.cents(), 3297);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use ts_rs::TS;

use crate::quantity::{parse_scaled, Quantity};

/// Integer division rounding half-to-even (bankers rounding).
fn div_round_half_even(numerator: i128, divisor: i128) -> i128 {
    let quotient = numerator.div_euclid(divisor);
    let remainder = numerator.rem_euclid(divisor);
    let twice = remainder * 2;
    if twice > divisor || (twice == divisor && quotient % 2 != 0) {
        quotient + 1
    } else {
        quotient
    }
}

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in cents.
///
/// ## Where Money is Used
/// ```text
/// Product.price_retail ──► CartItem.unit_price ──► SaleItem.subtotal
///                                                        │
/// Product.cost_price ──► SaleItem.unit_cost (photographed at sale time)
///                                                        │
///                                 Sale.subtotal / Sale.total ◄┘
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use kardex_core::Money;
    ///
    /// let price = Money::from_cents(1099); // Represents $10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Price times a fractional quantity, rounded half-to-even to the cent.
    ///
    /// ## Example
    /// ```rust
    /// use kardex_core::{Money, Quantity};
    ///
    /// // $2.99 × 0.5 = $1.495 → $1.50 (half to even)
    /// let half = Money::from_cents(299).times(Quantity::from_milli(500));
    /// assert_eq!(half.cents(), 150);
    ///
    /// // $0.05 × 0.5 = $0.025 → $0.02
    /// let small = Money::from_cents(5).times(Quantity::from_milli(500));
    /// assert_eq!(small.cents(), 2);
    /// ```
    pub fn times(&self, qty: Quantity) -> Money {
        Money::from_scaled_product(self.0 as i128 * qty.milli() as i128, 1000)
    }

    /// Brings an i128 product with extra scale back to cents.
    pub(crate) fn from_scaled_product(product: i128, divisor: i128) -> Money {
        let cents = div_round_half_even(product, divisor);
        Money(cents.clamp(i64::MIN as i128, i64::MAX as i128) as i64)
    }

    /// Parses a user-entered amount ("12,50", " 3.999 ").
    ///
    /// Returns `None` for unparseable input; rounds half-to-even to cents.
    pub fn parse(raw: &str) -> Option<Money> {
        parse_scaled(raw, 2).map(Money)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}${}.{:02}",
            sign,
            self.dollars().abs(),
            self.cents_part()
        )
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

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
