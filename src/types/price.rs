//! Fixed-point monetary values.
//!
//! ## Overview
//!
//! A [`PriceValue`] is either a `Limit` amount held as an integer number of
//! cents, or the `Market` marker meaning "trade at whatever is available".
//! Floating point never touches a price: parsing goes through
//! `rust_decimal` and everything after that is integer math.
//!
//! ## Two kinds of comparison
//!
//! - **Ordinal** ([`PriceValue::compare_ordinal`], and the `Ord` impl used as
//!   the book's map key) is total. `Market` sorts as amount zero; in the `Ord`
//!   impl a `Market` ties after `Limit(0)` so that the two stay distinct keys.
//! - **Relational** (`greater_or_equal`, `less_than`, ...) answers "is this
//!   price better/worse" and returns `false` whenever either side is `Market`.
//!
//! ## Examples
//!
//! ```
//! use matchbook::types::price::PriceValue;
//!
//! let ten = PriceValue::parse_dollars("$10.00").unwrap();
//! assert_eq!(ten, PriceValue::limit(1_000));
//! assert_eq!(ten.to_string(), "$10.00");
//!
//! let mkt = PriceValue::market();
//! assert_eq!(mkt.to_string(), "MKT");
//! assert!(!mkt.greater_or_equal(&ten));
//! assert!(!ten.greater_or_equal(&mkt));
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use thiserror::Error;

/// Minor units per major unit (cents per dollar).
pub const CENTS_PER_DOLLAR: i64 = 100;

/// Errors raised by price arithmetic and parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PriceError {
    /// A `Market` value was used as an arithmetic operand.
    #[error("market price cannot be used in arithmetic")]
    MarketOperand,

    /// Multiplication by zero volume.
    #[error("cannot multiply a price by zero")]
    ZeroMultiplier,

    /// Result does not fit in the fixed-point representation.
    #[error("price arithmetic overflowed")]
    Overflow,

    /// Text could not be read as a dollar amount.
    #[error("cannot parse '{0}' as a price")]
    Parse(String),

    /// Aggregate volume at one price would exceed `u64`.
    #[error("aggregate volume at price level would overflow")]
    VolumeOverflow,
}

/// Fixed-point limit price or market marker.
///
/// `Copy` and hashable: equal amounts are the same value, so there is no
/// need for an intern table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriceValue {
    /// Limit price in cents.
    Limit(i64),
    /// Market price marker.
    Market,
}

impl PriceValue {
    /// Limit price from an amount in cents.
    #[inline]
    pub const fn limit(cents: i64) -> Self {
        PriceValue::Limit(cents)
    }

    /// The market marker.
    #[inline]
    pub const fn market() -> Self {
        PriceValue::Market
    }

    /// Parse a dollar amount such as `"10"`, `"10.5"`, `"$1,234.56"` or
    /// `"-3.25"` into a limit price, rounding to the nearest cent.
    ///
    /// Every character other than digits, `-` and `.` is ignored. An empty
    /// string (after stripping) is zero. Midpoints round away from zero, so
    /// `"9.995"` is `$10.00` and `"-1.005"` is -101 cents.
    ///
    /// # Errors
    ///
    /// * `PriceError::Parse` - the stripped text is not a decimal number
    /// * `PriceError::Overflow` - the amount does not fit in `i64` cents
    ///
    /// # Example
    ///
    /// ```
    /// use matchbook::types::price::PriceValue;
    ///
    /// assert_eq!(PriceValue::parse_dollars("$1,234.56").unwrap(), PriceValue::limit(123_456));
    /// assert_eq!(PriceValue::parse_dollars("9.995").unwrap(), PriceValue::limit(1_000));
    /// assert_eq!(PriceValue::parse_dollars("").unwrap(), PriceValue::limit(0));
    /// ```
    pub fn parse_dollars(text: &str) -> Result<Self, PriceError> {
        let cleaned: String = text
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '-' || *c == '.')
            .collect();
        if cleaned.is_empty() {
            return Ok(PriceValue::Limit(0));
        }

        let dollars =
            Decimal::from_str(&cleaned).map_err(|_| PriceError::Parse(text.to_string()))?;
        let cents = dollars
            .checked_mul(Decimal::from(CENTS_PER_DOLLAR))
            .ok_or(PriceError::Overflow)?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        cents.to_i64().map(PriceValue::Limit).ok_or(PriceError::Overflow)
    }

    /// Amount in cents, or `None` for `Market`.
    #[inline]
    pub fn amount(&self) -> Option<i64> {
        match self {
            PriceValue::Limit(cents) => Some(*cents),
            PriceValue::Market => None,
        }
    }

    /// Amount used for internal ordering; `Market` counts as zero.
    #[inline]
    pub fn ordinal(&self) -> i64 {
        self.amount().unwrap_or(0)
    }

    #[inline]
    pub fn is_market(&self) -> bool {
        matches!(self, PriceValue::Market)
    }

    /// True for a limit price below zero. Always false for `Market`.
    #[inline]
    pub fn is_negative(&self) -> bool {
        matches!(self, PriceValue::Limit(cents) if *cents < 0)
    }

    // ========================================================================
    // Arithmetic
    // ========================================================================

    /// Sum of two limit prices.
    pub fn checked_add(&self, other: &PriceValue) -> Result<PriceValue, PriceError> {
        let (a, b) = Self::both_limits(self, other)?;
        a.checked_add(b).map(PriceValue::Limit).ok_or(PriceError::Overflow)
    }

    /// Difference of two limit prices (`self - other`).
    pub fn checked_sub(&self, other: &PriceValue) -> Result<PriceValue, PriceError> {
        let (a, b) = Self::both_limits(self, other)?;
        a.checked_sub(b).map(PriceValue::Limit).ok_or(PriceError::Overflow)
    }

    /// Notional value of `quantity` units at this limit price.
    ///
    /// # Errors
    ///
    /// `MarketOperand` for a market price, `ZeroMultiplier` for a zero
    /// quantity, `Overflow` when the product does not fit.
    pub fn checked_mul(&self, quantity: u64) -> Result<PriceValue, PriceError> {
        let cents = self.amount().ok_or(PriceError::MarketOperand)?;
        if quantity == 0 {
            return Err(PriceError::ZeroMultiplier);
        }
        let quantity = i64::try_from(quantity).map_err(|_| PriceError::Overflow)?;
        cents
            .checked_mul(quantity)
            .map(PriceValue::Limit)
            .ok_or(PriceError::Overflow)
    }

    fn both_limits(a: &PriceValue, b: &PriceValue) -> Result<(i64, i64), PriceError> {
        match (a, b) {
            (PriceValue::Limit(x), PriceValue::Limit(y)) => Ok((*x, *y)),
            _ => Err(PriceError::MarketOperand),
        }
    }

    // ========================================================================
    // Comparison
    // ========================================================================

    /// Total order over amounts with `Market` as zero.
    ///
    /// Unlike `Ord`, a `Market` and a zero limit compare `Equal` here.
    #[inline]
    pub fn compare_ordinal(&self, other: &PriceValue) -> Ordering {
        self.ordinal().cmp(&other.ordinal())
    }

    fn relate(&self, other: &PriceValue) -> Option<Ordering> {
        match (self, other) {
            (PriceValue::Limit(a), PriceValue::Limit(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    #[inline]
    pub fn greater_or_equal(&self, other: &PriceValue) -> bool {
        matches!(self.relate(other), Some(Ordering::Greater | Ordering::Equal))
    }

    #[inline]
    pub fn greater_than(&self, other: &PriceValue) -> bool {
        matches!(self.relate(other), Some(Ordering::Greater))
    }

    #[inline]
    pub fn less_or_equal(&self, other: &PriceValue) -> bool {
        matches!(self.relate(other), Some(Ordering::Less | Ordering::Equal))
    }

    #[inline]
    pub fn less_than(&self, other: &PriceValue) -> bool {
        matches!(self.relate(other), Some(Ordering::Less))
    }

    /// Equal limit amounts. False if either side is `Market`.
    #[inline]
    pub fn value_eq(&self, other: &PriceValue) -> bool {
        matches!(self.relate(other), Some(Ordering::Equal))
    }
}

impl Ord for PriceValue {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare_ordinal(other)
            .then_with(|| self.is_market().cmp(&other.is_market()))
    }
}

impl PartialOrd for PriceValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Default for PriceValue {
    fn default() -> Self {
        PriceValue::Limit(0)
    }
}

impl FromStr for PriceValue {
    type Err = PriceError;

    /// `"MKT"` (any case) is the market marker, anything else is dollars.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("MKT") {
            Ok(PriceValue::Market)
        } else {
            PriceValue::parse_dollars(s)
        }
    }
}

impl fmt::Display for PriceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cents = match self {
            PriceValue::Market => return f.write_str("MKT"),
            PriceValue::Limit(cents) => *cents,
        };

        let sign = if cents < 0 { "-" } else { "" };
        let magnitude = cents.unsigned_abs();
        let dollars = (magnitude / CENTS_PER_DOLLAR as u64).to_string();

        // Thousands separators
        let mut grouped = String::with_capacity(dollars.len() + dollars.len() / 3);
        for (i, digit) in dollars.chars().enumerate() {
            if i > 0 && (dollars.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(digit);
        }

        write!(f, "${}{}.{:02}", sign, grouped, magnitude % CENTS_PER_DOLLAR as u64)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
