//! Collateral amounts
//!
//! Amounts are unsigned integers in the collateral's smallest unit. Balance
//! change notifications carry a signed delta.

use crate::errors::ParseError;

/// Amount of collateral in base units
pub type Amount = u128;

/// Signed balance change (positive for deposits, negative for withdrawals)
pub type AmountDelta = i128;

/// Parse an amount from decimal digits, allowing `_` as a digit separator.
///
/// `"1_000_000"` and `"1000000"` parse to the same value. Empty input, signs,
/// and separators without digits are rejected.
pub fn parse_amount(s: &str) -> Result<Amount, ParseError> {
    let trimmed = s.trim();
    let digits: String = trimmed.chars().filter(|c| *c != '_').collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ParseError::InvalidAmount {
            value: s.to_string(),
        });
    }
    digits.parse::<Amount>().map_err(|_| ParseError::AmountOverflow {
        value: s.to_string(),
    })
}

/// Signed delta for a credit of `amount`. `None` if it exceeds `i128::MAX`.
pub fn credit_delta(amount: Amount) -> Option<AmountDelta> {
    AmountDelta::try_from(amount).ok()
}

/// Signed delta for a debit of `amount`. `None` if it exceeds `i128::MAX`.
pub fn debit_delta(amount: Amount) -> Option<AmountDelta> {
    credit_delta(amount).map(|d| -d)
}

/// Serde adapter for `Amount` fields.
///
/// Serializes as a decimal string so values above 2^53 survive JSON
/// consumers. Deserializes from a JSON integer or from a string accepted by
/// [`parse_amount`].
pub mod amount_serde {
    use super::{parse_amount, Amount};
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S: Serializer>(amount: &Amount, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&amount.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
        deserializer.deserialize_any(AmountVisitor)
    }

    struct AmountVisitor;

    impl<'de> Visitor<'de> for AmountVisitor {
        type Value = Amount;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an unsigned integer or a string of digits")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
            Ok(Amount::from(v))
        }

        fn visit_u128<E: de::Error>(self, v: u128) -> Result<Amount, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
            Amount::try_from(v).map_err(|_| E::custom(format!("negative amount {v}")))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Amount, E> {
            Err(E::custom(format!(
                "amount {v} is not an exact integer; pass large amounts as strings"
            )))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
            parse_amount(v).map_err(E::custom)
        }
    }
}
