//! Ledger events
//!
//! Events are immutable records appended by successful operations. Failed
//! operations never emit.

use serde::{Deserialize, Serialize};
use types::ids::Address;
use types::numeric::AmountDelta;

use crate::authorization::AuthorizationMode;
use crate::limits::WithdrawLimit;

/// A user's custodial balance changed.
///
/// `reference` is 0 for deposits, the matcher's request id for role-gated
/// withdrawals and the permit nonce for signed withdrawals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserBalanceChanged {
    pub user: Address,
    pub delta: AmountDelta,
    pub reference: u64,
}

/// The withdraw limit tiers were replaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawLimitsUpdated {
    pub limits: Vec<WithdrawLimit>,
}

/// The one-shot V1 → V2 migration ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigratedToV2 {
    pub limits: Vec<WithdrawLimit>,
    pub migrated_at: u64,
}

/// Withdrawal authorization switched mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationModeChanged {
    pub mode: AuthorizationMode,
}

/// Enum wrapper for all ledger events, enabling uniform handling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    UserBalanceChanged(UserBalanceChanged),
    WithdrawLimitsUpdated(WithdrawLimitsUpdated),
    MigratedToV2(MigratedToV2),
    AuthorizationModeChanged(AuthorizationModeChanged),
}
