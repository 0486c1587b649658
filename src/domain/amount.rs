use crate::error::PaymentError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A non-negative transaction amount.
///
/// Wraps `rust_decimal::Decimal` so that a negative value can never reach the
/// decision engine. Zero is accepted: recurring mandates are set up with a
/// zero-amount authentication.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(value: Decimal) -> Result<Self, PaymentError> {
        if value >= Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(PaymentError::Validation(
                "Amount must not be negative".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = PaymentError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Upper-cases and checks an ISO code (currency or country) of the given length.
pub(crate) fn normalize_code(field: &str, value: &str, len: usize) -> Result<String, PaymentError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(PaymentError::Validation(format!("{field} is required")));
    }
    if trimmed.len() != len || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(PaymentError::Validation(format!(
            "{field} must be a {len}-letter code, got '{trimmed}'"
        )));
    }
    Ok(trimmed.to_ascii_uppercase())
}
