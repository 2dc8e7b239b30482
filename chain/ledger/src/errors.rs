//! Ledger error types
//!
//! Every operation fails with a specific kind so callers can tell
//! "try again later" (limits, balance) from "malformed forever" (amount,
//! signature, authorization). A failed operation never changes state.

use thiserror::Error;
use types::numeric::Amount;

/// Errors returned by ledger operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Amount must be positive")]
    InvalidAmount,

    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: Amount, available: Amount },

    #[error("Collateral transfer failed")]
    TransferFailed,

    #[error("Invalid withdraw limit at index {index}: {reason}")]
    InvalidWithdrawLimit { index: usize, reason: String },

    #[error("Total withdraw limit exceeded for tier {tier}")]
    TotalLimitExceeded { tier: usize },

    #[error("User withdraw limit exceeded for tier {tier}")]
    UserLimitExceeded { tier: usize },

    #[error("Withdrawal authorization expired: deadline {deadline}, now {now}")]
    AuthorizationExpired { deadline: u64, now: u64 },

    #[error("Invalid signature for withdrawal")]
    InvalidSignature,

    #[error("Unauthorized: caller lacks the required role")]
    Unauthorized,

    #[error("Already migrated to V2")]
    AlreadyMigrated,

    #[error("Ledger has not been migrated to V2")]
    NotMigrated,

    #[error("Withdrawal permit already used: digest {digest}")]
    NonceReused { digest: String },

    #[error("Arithmetic overflow in balance calculation")]
    Overflow,
}

impl LedgerError {
    /// Whether the same request may succeed later without being changed.
    ///
    /// Limit and balance failures depend on time or on other operations;
    /// everything else is a property of the request itself.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LedgerError::TotalLimitExceeded { .. }
                | LedgerError::UserLimitExceeded { .. }
                | LedgerError::InsufficientBalance { .. }
                | LedgerError::TransferFailed
        )
    }
}

/// Errors raised while loading a ledger configuration
///
/// Bad addresses and amounts inside the JSON surface as `Malformed`, through
/// the deserializer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Malformed configuration: {0}")]
    Malformed(String),

    #[error("Invalid configuration: {0}")]
    Ledger(#[from] LedgerError),
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Malformed(err.to_string())
    }
}
