//! Value objects: equality by value, not identity.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values. To
/// "modify" one, build a new one.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}

/// A non-negative monetary amount.
///
/// Ledger arithmetic is exact: amounts are decimals, never floats, and
/// equality is plain decimal equality.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub const ZERO: Amount = Amount(Decimal::ZERO);

    /// Largest accepted amount, 10^15. Keeps running balances and report
    /// sums far inside `Decimal` range.
    pub const MAX: Decimal = Decimal::from_parts(2_764_472_320, 232_830, 0, false, 0);

    pub fn new(value: Decimal) -> DomainResult<Self> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(DomainError::validation(format!(
                "amount must not be negative (got {value})"
            )));
        }
        if value > Self::MAX {
            return Err(DomainError::validation(format!(
                "amount {value} exceeds the maximum of {}",
                Self::MAX
            )));
        }
        Ok(Self(value.normalize()))
    }

    /// Whole currency units, handy in tests and fixtures.
    pub fn from_units(units: u64) -> Self {
        Self(Decimal::from(units))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn checked_add(self, other: Amount) -> DomainResult<Amount> {
        self.0
            .checked_add(other.0)
            .map(Amount)
            .ok_or_else(|| DomainError::validation("amount overflow"))
    }
}

impl ValueObject for Amount {}

impl TryFrom<Decimal> for Amount {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Amount::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(value: Amount) -> Self {
        value.0
    }
}

impl core::fmt::Display for Amount {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_negative_amounts() {
        assert!(Amount::new(Decimal::new(-1, 2)).is_err());
        assert!(Amount::new(Decimal::ZERO).is_ok());
    }

    #[test]
    fn amounts_above_the_ceiling_are_rejected() {
        assert_eq!(Amount::MAX, Decimal::new(1_000_000_000_000_000, 0));
        assert!(Amount::new(Amount::MAX).is_ok());
        assert!(Amount::new(Amount::MAX + Decimal::new(1, 2)).is_err());
        assert!(Amount::new(Decimal::MAX).is_err());
    }

    #[test]
    fn equality_is_exact_decimal_equality() {
        let a = Amount::new(Decimal::new(1000, 0)).unwrap();
        let b = Amount::new(Decimal::new(100000, 2)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, Amount::new(Decimal::new(100001, 2)).unwrap());
    }

    #[test]
    fn deserializing_negative_amount_fails() {
        let res: Result<Amount, _> = serde_json::from_str("\"-5\"");
        assert!(res.is_err());
    }
}
