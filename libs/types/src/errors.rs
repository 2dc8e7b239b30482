//! Parse errors for shared types

use thiserror::Error;

/// Errors raised while parsing identifiers and amounts from text
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid address {value}: expected 32 bytes of hex")]
    InvalidAddress { value: String },

    #[error("Invalid amount {value}: expected unsigned integer digits")]
    InvalidAmount { value: String },

    #[error("Amount {value} does not fit in 128 bits")]
    AmountOverflow { value: String },
}
