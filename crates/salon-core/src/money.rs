//! # Money Module
//!
//! `Money` (integer minor units) and `ExchangeRate` (fixed point, 6 decimals).
//!
//! ## Multi-Currency Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Every money event is recorded twice:                                   │
//! │                                                                         │
//! │    amount_cents            in the event's own currency (EUR 10.00)     │
//! │    exchange_rate_micros    units of that currency per default unit     │
//! │                            (0.92 EUR per USD = 920_000)                 │
//! │    amount_in_default_cents amount / rate, frozen at creation (USD 10.87)│
//! │                                                                         │
//! │  Reports sum amount_in_default_cents, so a later rate change never     │
//! │  rewrites history.                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use salon_core::money::{ExchangeRate, Money};
//!
//! let price = Money::from_cents(2550);
//! assert_eq!(price.to_string(), "25.50");
//!
//! let rate: ExchangeRate = "1.5".parse().unwrap();
//! assert_eq!(rate.micros(), 1_500_000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::validation::validate_exchange_rate;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest unit of its currency.
///
/// Money carries no currency code; the record holding it names the currency.
/// Signed, so ledger deltas and refunds share the type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    ///
    /// ```rust
    /// use salon_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(1099).cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Whole major units, truncated toward zero.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Minor-unit remainder, always 0-99.
    #[inline]
    pub const fn minor(&self) -> i64 {
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
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Unit price times a quantity (item purchases, item usages).
    ///
    /// ```rust
    /// use salon_core::money::Money;
    ///
    /// let pomade = Money::from_cents(450);
    /// assert_eq!(pomade.multiply_quantity(3).unwrap().cents(), 1350);
    /// assert!(Money::from_cents(i64::MAX).multiply_quantity(2).is_err());
    /// ```
    pub fn multiply_quantity(&self, qty: i64) -> CoreResult<Self> {
        self.0
            .checked_mul(qty)
            .map(Money)
            .ok_or_else(|| overflow("price × quantity"))
    }

    pub fn checked_add(self, other: Self) -> CoreResult<Self> {
        self.0
            .checked_add(other.0)
            .map(Money)
            .ok_or_else(|| overflow("a sum"))
    }

    pub fn checked_sub(self, other: Self) -> CoreResult<Self> {
        self.0
            .checked_sub(other.0)
            .map(Money)
            .ok_or_else(|| overflow("a difference"))
    }

    /// Sums amounts, failing instead of wrapping.
    pub fn try_sum<I: IntoIterator<Item = Money>>(amounts: I) -> CoreResult<Self> {
        amounts
            .into_iter()
            .try_fold(Money::zero(), |acc, m| acc.checked_add(m))
    }
}

fn overflow(what: &str) -> CoreError {
    CoreError::AmountOverflow {
        what: what.to_string(),
    }
}

// =============================================================================
// Exchange Rate
// =============================================================================

/// Units of a currency per one unit of the default currency,
/// stored as millionths (`1.000000` = `1_000_000`).
///
/// ## Parsing
/// ```text
/// "1"         → 1_000_000
/// "0.92"      →   920_000
/// "1.234567"  → 1_234_567
/// "1.2345678" → error (more than 6 decimals)
/// "0"         → error (must be > 0)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(try_from = "i64", into = "i64")]
#[ts(export)]
pub struct ExchangeRate(i64);

impl ExchangeRate {
    /// Number of fractional digits carried by a rate.
    pub const SCALE_DIGITS: u32 = 6;

    /// Micros per whole unit.
    pub const SCALE: i64 = 1_000_000;

    /// Builds a rate from micros, rejecting zero and negative values.
    pub fn from_micros(micros: i64) -> Result<Self, ValidationError> {
        validate_exchange_rate(micros)?;
        Ok(ExchangeRate(micros))
    }

    /// The identity rate, used for the default currency.
    #[inline]
    pub const fn one() -> Self {
        ExchangeRate(Self::SCALE)
    }

    #[inline]
    pub const fn micros(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn is_one(&self) -> bool {
        self.0 == Self::SCALE
    }
}

impl Default for ExchangeRate {
    fn default() -> Self {
        ExchangeRate::one()
    }
}

impl TryFrom<i64> for ExchangeRate {
    type Error = ValidationError;

    fn try_from(micros: i64) -> Result<Self, Self::Error> {
        ExchangeRate::from_micros(micros)
    }
}

impl From<ExchangeRate> for i64 {
    fn from(rate: ExchangeRate) -> i64 {
        rate.0
    }
}

impl FromStr for ExchangeRate {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: "exchange_rate".to_string(),
            reason: reason.to_string(),
        };

        let s = s.trim();
        if s.is_empty() {
            return Err(ValidationError::Required {
                field: "exchange_rate".to_string(),
            });
        }

        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };

        if whole.is_empty() && frac.is_empty() {
            return Err(invalid("expected a decimal number"));
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid("expected a decimal number"));
        }
        if frac.len() > Self::SCALE_DIGITS as usize {
            return Err(invalid("at most 6 decimal places"));
        }

        let whole_units: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid("value too large"))?
        };

        // Right-pad the fraction to six digits: "92" → 920000
        let mut frac_micros: i64 = 0;
        for (i, c) in frac.chars().enumerate() {
            let digit = i64::from(c as u8 - b'0');
            frac_micros += digit * 10_i64.pow(Self::SCALE_DIGITS - 1 - i as u32);
        }

        let micros = whole_units
            .checked_mul(Self::SCALE)
            .and_then(|m| m.checked_add(frac_micros))
            .ok_or_else(|| invalid("value too large"))?;

        ExchangeRate::from_micros(micros)
    }
}

impl fmt::Display for ExchangeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:06}", self.0 / Self::SCALE, self.0 % Self::SCALE)
    }
}

// =============================================================================
// Conversion
// =============================================================================

/// Converts an amount into the default currency.
///
/// A default-currency amount is returned unchanged whatever the rate says.
/// Otherwise the result is `amount / rate`, rounded half away from zero to
/// the cent.
///
/// ```rust
/// use salon_core::money::{convert_to_default, ExchangeRate, Money};
///
/// let rate = ExchangeRate::from_micros(2_000_000).unwrap();
/// assert_eq!(convert_to_default(Money::from_cents(1001), rate, false).unwrap().cents(), 501);
/// assert_eq!(convert_to_default(Money::from_cents(1001), rate, true).unwrap().cents(), 1001);
/// ```
///
/// Fails with `AmountOverflow` when the converted amount does not fit in an
/// i64, which a tiny rate on a large amount can produce.
pub fn convert_to_default(
    amount: Money,
    rate: ExchangeRate,
    is_default_currency: bool,
) -> CoreResult<Money> {
    if is_default_currency {
        return Ok(amount);
    }

    // i128 keeps amount × 10^6 exact for any i64 amount
    let num = amount.cents() as i128 * ExchangeRate::SCALE as i128;
    let den = rate.micros() as i128;
    let mut quotient = num / den;
    let remainder = num % den;
    if remainder.abs() * 2 >= den {
        quotient += num.signum();
    }
    i64::try_from(quotient)
        .map(Money::from_cents)
        .map_err(|_| overflow("the default-currency amount"))
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Plain decimal, no currency symbol: the currency lives on the record.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor())
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

/// Negation flips a ledger delta (apply ↔ revert).
impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
