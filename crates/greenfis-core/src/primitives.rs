//! # Primitives
//!
//! Value types shared by every module: money, timestamps and hard limits.
//!
//! Money is stored as integer cents. The workspace denies float arithmetic,
//! so every price, discount and total in the system goes through [`Money`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Sub};

// =============================================================================
// LIMITS
// =============================================================================

/// Maximum number of lines accepted in a single checkout.
pub const MAX_SALE_LINES: usize = 200;

/// Maximum quantity of a single product on one sale line.
pub const MAX_LINE_QUANTITY: u32 = 100_000;

/// Highest unit price or cost a product may carry, in cents.
///
/// With [`MAX_LINE_QUANTITY`] and [`MAX_SALE_LINES`] this keeps every line
/// total, discount and sale total far below `i64::MAX`.
pub const MAX_PRICE_CENTS: i64 = 1_000_000_000;

/// Maximum length of short text fields (names, usernames, skus).
pub const MAX_NAME_LEN: usize = 128;

/// Maximum length of free-form notes.
pub const MAX_NOTE_LEN: usize = 1024;

/// Minimum password length for user accounts.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Maximum password length in bytes. Longer input is refused before hashing.
pub const MAX_PASSWORD_LEN: usize = 1024;

/// Number of products returned by the sales summary ranking.
pub const TOP_PRODUCTS_LIMIT: usize = 10;

// =============================================================================
// MONEY
// =============================================================================

/// An amount of money in cents.
///
/// Arithmetic saturates instead of wrapping.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(pub i64);

impl Money {
    /// Zero cents.
    pub const ZERO: Self = Self(0);

    /// Create from a number of cents.
    #[must_use]
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// The raw number of cents.
    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Multiply by a quantity.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(i64::from(quantity)))
    }

    /// `percent` of this amount, rounded down.
    #[must_use]
    pub fn percent(self, percent: u8) -> Self {
        let cents = i128::from(self.0) * i128::from(percent) / 100;
        Self(i64::try_from(cents).unwrap_or(if cents < 0 { i64::MIN } else { i64::MAX }))
    }

    /// Whether the amount is below zero.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, m| acc + m)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

// =============================================================================
// TIMESTAMP
// =============================================================================

/// Seconds since the Unix epoch.
///
/// The core never reads the wall clock; callers pass the current time in.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// The epoch itself.
    pub const EPOCH: Self = Self(0);

    /// Create from Unix seconds.
    #[must_use]
    pub const fn from_secs(secs: i64) -> Self {
        Self(secs)
    }

    /// Unix seconds.
    #[must_use]
    pub const fn secs(self) -> i64 {
        self.0
    }
}

// =============================================================================
// TEXT HELPERS
// =============================================================================

/// Trim and check a required text field.
pub(crate) fn required_text(field: &str, value: &str) -> crate::Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(crate::StoreError::validation(format!("{field} is required")));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(crate::StoreError::validation(format!(
            "{field} exceeds {MAX_NAME_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Trim an optional text field; empty becomes `None`.
pub(crate) fn optional_text(field: &str, value: Option<&str>) -> crate::Result<Option<String>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) if v.chars().count() > MAX_NOTE_LEN => Err(crate::StoreError::validation(
            format!("{field} exceeds {MAX_NOTE_LEN} characters"),
        )),
        Some(v) => Ok(Some(v.to_string())),
    }
}

// =============================================================================
// TESTS
// =============================================================================
