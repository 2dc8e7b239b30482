//! Withdraw limit tiers
//!
//! A tier caps aggregate (`global_cap`) and per-user (`user_cap`) outflow
//! within a window of `window_hours`. A tier list is only ever installed as a
//! whole, after [`validate_limits`] accepts every tier:
//! - every field is positive and `user_cap <= global_cap`
//! - tiers are strictly ascending by window, by global cap and by user cap
//!
//! A longer window therefore always permits more outflow than every shorter
//! one. Out-of-order lists are rejected, never sorted or clamped.

use serde::{Deserialize, Serialize};
use types::numeric::{amount_serde, Amount};

use crate::errors::LedgerError;

/// Seconds per hour, the unit of `window_hours`
pub const SECONDS_PER_HOUR: u64 = 3600;

/// One rate-limit tier.
///
/// JSON field names follow the deployment format:
/// `{"limit": "5000", "userLimit": "500", "timeWindow": 1}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WithdrawLimit {
    /// Aggregate cap across all users per window
    #[serde(rename = "limit", with = "amount_serde")]
    pub global_cap: Amount,
    /// Cap per user per window
    #[serde(rename = "userLimit", with = "amount_serde")]
    pub user_cap: Amount,
    /// Window length in hours
    #[serde(rename = "timeWindow")]
    pub window_hours: u32,
}

impl WithdrawLimit {
    pub fn new(global_cap: Amount, user_cap: Amount, window_hours: u32) -> Self {
        Self {
            global_cap,
            user_cap,
            window_hours,
        }
    }

    /// Window length in seconds
    pub fn window_seconds(&self) -> u64 {
        u64::from(self.window_hours) * SECONDS_PER_HOUR
    }
}

/// Validate a complete tier list.
///
/// Returns the first violation found, scanning in list order. The empty list
/// is valid and disables rate limiting.
pub fn validate_limits(limits: &[WithdrawLimit]) -> Result<(), LedgerError> {
    for (index, limit) in limits.iter().enumerate() {
        let invalid = |reason: &str| LedgerError::InvalidWithdrawLimit {
            index,
            reason: reason.to_string(),
        };

        if limit.window_hours == 0 {
            return Err(invalid("time window must be positive"));
        }
        if limit.global_cap == 0 {
            return Err(invalid("limit must be positive"));
        }
        if limit.user_cap == 0 {
            return Err(invalid("user limit must be positive"));
        }
        if limit.user_cap > limit.global_cap {
            return Err(invalid("user limit exceeds limit"));
        }

        if index > 0 {
            let prev = &limits[index - 1];
            if limit.window_hours <= prev.window_hours {
                return Err(invalid("time windows must be strictly ascending"));
            }
            if limit.global_cap <= prev.global_cap {
                return Err(invalid("limits must be strictly ascending"));
            }
            if limit.user_cap <= prev.user_cap {
                return Err(invalid("user limits must be strictly ascending"));
            }
        }
    }
    Ok(())
}
