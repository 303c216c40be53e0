//! Operator-entered money amounts.
//!
//! Amounts arrive from forms as either JSON strings or numbers. The raw text is
//! kept as-is at the serde layer so that an empty or malformed value surfaces
//! as a `LedgerError::Validation` from the core, never as a silent zero.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{LedgerError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AmountInput(Option<String>);

impl AmountInput {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(Some(raw.into()))
    }

    pub fn missing() -> Self {
        Self(None)
    }

    pub fn raw(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// Parse into a strictly positive amount. Negative input is rejected.
    pub fn positive(&self, field: &str) -> Result<Decimal> {
        let value = self.parse(field)?;
        if value.is_sign_negative() {
            return Err(LedgerError::validation(format!("{} must be positive", field)));
        }
        Ok(value)
    }

    /// Parse into a credit magnitude: the sign of the input is dropped.
    pub fn magnitude(&self, field: &str) -> Result<Decimal> {
        Ok(self.parse(field)?.abs())
    }

    fn parse(&self, field: &str) -> Result<Decimal> {
        let raw = self
            .raw()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| LedgerError::validation(format!("{} is required", field)))?;

        let value = Decimal::from_str(raw)
            .or_else(|_| Decimal::from_scientific(raw))
            .map_err(|_| LedgerError::validation(format!("{} is not a number: {:?}", field, raw)))?;

        if value.is_zero() {
            return Err(LedgerError::validation(format!("{} must not be zero", field)));
        }
        Ok(value.normalize())
    }
}

impl From<Decimal> for AmountInput {
    fn from(d: Decimal) -> Self {
        Self(Some(d.to_string()))
    }
}

impl<'de> Deserialize<'de> for AmountInput {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Anything that is not a string or number is kept as text and fails parsing later
        let raw = match Option::<serde_json::Value>::deserialize(deserializer)? {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(s)) => Some(s),
            Some(serde_json::Value::Number(n)) => Some(n.to_string()),
            Some(other) => Some(other.to_string()),
        };
        Ok(Self(raw))
    }
}

impl Serialize for AmountInput {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}
