//! Integer money and quantity types
//!
//! All prices are held as positive integers in the smallest currency unit
//! (paise); quantities are positive integers. No binary floating point is
//! used anywhere in the core. External decimal prices enter through
//! [`Price::from_decimal`], which converts via `rust_decimal` and rejects
//! values the paise grid cannot represent.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};
use thiserror::Error;

/// Factor between the external decimal unit and paise.
pub const PAISE_PER_UNIT: u32 = 100;

/// Errors converting external decimal values into paise.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    #[error("price must be positive, got {0}")]
    NotPositive(Decimal),

    #[error("price {0} is not representable in paise (more than 2 decimal places)")]
    NotRepresentable(Decimal),

    #[error("price {0} exceeds the representable paise range")]
    OutOfRange(Decimal),
}

/// Limit price in paise
///
/// Always strictly positive. Ordering is plain integer ordering; the bid and
/// ask books decide iteration direction themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(u64);

impl Price {
    /// Create a new Price from paise
    ///
    /// # Panics
    /// Panics if the price is zero.
    pub fn new(paise: u64) -> Self {
        assert!(paise > 0, "Price must be positive");
        Self(paise)
    }

    /// Try to create a Price, returning None if zero
    pub fn try_new(paise: u64) -> Option<Self> {
        if paise > 0 {
            Some(Self(paise))
        } else {
            None
        }
    }

    /// Convert an external decimal price into paise.
    ///
    /// Multiplies by 100 and rejects inputs with more than two fractional
    /// digits or outside the `u64` paise range.
    pub fn from_decimal(value: Decimal) -> Result<Self, MoneyError> {
        if value <= Decimal::ZERO {
            return Err(MoneyError::NotPositive(value));
        }
        let scaled = value * Decimal::from(PAISE_PER_UNIT);
        if scaled.normalize().scale() != 0 {
            return Err(MoneyError::NotRepresentable(value));
        }
        let paise = scaled.to_u64().ok_or(MoneyError::OutOfRange(value))?;
        if paise == 0 {
            return Err(MoneyError::NotPositive(value));
        }
        Ok(Self(paise))
    }

    /// Parse an external decimal price string into paise.
    pub fn from_decimal_str(s: &str) -> Result<Self, MoneyError> {
        let value: Decimal =
            s.parse().map_err(|_| MoneyError::NotRepresentable(Decimal::ZERO))?;
        Self::from_decimal(value)
    }

    /// Get the paise value
    pub fn paise(&self) -> u64 {
        self.0
    }

    /// Render as the external decimal unit.
    pub fn to_decimal(&self) -> Decimal {
        Decimal::from(self.0) / Decimal::from(PAISE_PER_UNIT)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Order quantity
///
/// Strictly positive when constructed through [`Quantity::new`];
/// [`Quantity::zero`] exists for filled-quantity accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(u64);

impl Quantity {
    /// Create a new Quantity
    ///
    /// # Panics
    /// Panics if the quantity is zero.
    pub fn new(value: u64) -> Self {
        assert!(value > 0, "Quantity must be positive");
        Self(value)
    }

    /// Try to create a Quantity, returning None if zero
    pub fn try_new(value: u64) -> Option<Self> {
        if value > 0 {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Create zero quantity (for traded-quantity accounting)
    pub fn zero() -> Self {
        Self(0)
    }

    /// Get the inner value
    pub fn get(&self) -> u64 {
        self.0
    }

    /// Check if quantity is zero
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Add for Quantity {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Quantity {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        assert!(self.0 >= rhs.0, "Quantity subtraction would underflow");
        Self(self.0 - rhs.0)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
