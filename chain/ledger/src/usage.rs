//! Withdrawal usage tracking
//!
//! Accumulates withdrawn amounts per time bucket, globally and per user, and
//! answers headroom questions against a tier list.
//!
//! Buckets are keyed by `(span_hours, bucket_index)` with
//! `bucket_index = floor(now / (span_hours * 3600))`. Keys depend only on the
//! span and the clock, so stored buckets stay valid across code upgrades.
//!
//! Two window policies are supported:
//! - [`WindowPolicy::Tumbling`] (default): each tier owns buckets of its own
//!   window length. Usage for a tier is its current bucket, which resets to
//!   zero as soon as the bucket index advances. O(1) read and write per tier.
//!   A burst may straddle a bucket boundary and use up to twice the cap
//!   across two adjacent windows.
//! - [`WindowPolicy::SlidingHourly`]: one set of hourly buckets shared by all
//!   tiers; usage for a tier is the sum of the last `window_hours` hourly
//!   buckets. Reads cost O(window_hours) at worst.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;
use types::ids::Address;
use types::numeric::Amount;

use crate::errors::LedgerError;
use crate::limits::{WithdrawLimit, SECONDS_PER_HOUR};

/// How time is cut into accounting windows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WindowPolicy {
    /// Fixed, non-overlapping windows of each tier's own length
    #[default]
    Tumbling,
    /// Hourly buckets summed over each tier's trailing window
    SlidingHourly,
}

/// Result of a headroom query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawHeadroom {
    /// Largest amount that passes every tier right now
    pub max_amount: Amount,
    /// Index of the tier that produced `max_amount`, `None` with no tiers
    pub limiting_tier: Option<usize>,
    /// Whether the binding constraint is the tier's user cap
    pub is_user_limit: bool,
}

impl WithdrawHeadroom {
    /// Headroom when no tiers are configured
    pub const UNLIMITED: WithdrawHeadroom = WithdrawHeadroom {
        max_amount: Amount::MAX,
        limiting_tier: None,
        is_user_limit: false,
    };
}

/// Bucket index of `now` for buckets spanning `span_hours`.
///
/// `span_hours` must be positive; tier validation guarantees it.
pub fn bucket_index(span_hours: u32, now: u64) -> u64 {
    now / (u64::from(span_hours.max(1)) * SECONDS_PER_HOUR)
}

/// Time-bucketed withdrawal counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageTracker {
    policy: WindowPolicy,
    /// span_hours -> bucket_index -> withdrawn
    global: BTreeMap<u32, BTreeMap<u64, Amount>>,
    /// span_hours -> bucket_index -> user -> withdrawn
    user: BTreeMap<u32, BTreeMap<u64, BTreeMap<Address, Amount>>>,
}

impl UsageTracker {
    /// Create an empty tracker with the default tumbling policy.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: WindowPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> WindowPolicy {
        self.policy
    }

    /// Total withdrawn by everyone in the current window of `window_hours`.
    pub fn total_withdrawn(&self, window_hours: u32, now: u64) -> Amount {
        match self.policy {
            WindowPolicy::Tumbling => self
                .global
                .get(&window_hours)
                .and_then(|buckets| buckets.get(&bucket_index(window_hours, now)))
                .copied()
                .unwrap_or(0),
            WindowPolicy::SlidingHourly => {
                let Some(hours) = self.global.get(&1) else {
                    return 0;
                };
                let (from, to) = trailing_hours(window_hours, now);
                hours
                    .range(from..=to)
                    .fold(0, |acc: Amount, (_, v)| acc.saturating_add(*v))
            }
        }
    }

    /// Total withdrawn by `user` in the current window of `window_hours`.
    pub fn user_total_withdrawn(&self, window_hours: u32, now: u64, user: &Address) -> Amount {
        match self.policy {
            WindowPolicy::Tumbling => self
                .user
                .get(&window_hours)
                .and_then(|buckets| buckets.get(&bucket_index(window_hours, now)))
                .and_then(|users| users.get(user))
                .copied()
                .unwrap_or(0),
            WindowPolicy::SlidingHourly => {
                let Some(hours) = self.user.get(&1) else {
                    return 0;
                };
                let (from, to) = trailing_hours(window_hours, now);
                hours
                    .range(from..=to)
                    .filter_map(|(_, users)| users.get(user))
                    .fold(0, |acc: Amount, v| acc.saturating_add(*v))
            }
        }
    }

    /// Check `amount` against every tier without recording anything.
    ///
    /// Tiers are checked in list order (shortest window first). Within a
    /// tier the global cap is checked before the user cap, so a request
    /// breaking both reports `TotalLimitExceeded`.
    pub fn check(
        &self,
        limits: &[WithdrawLimit],
        now: u64,
        user: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        for (tier, limit) in limits.iter().enumerate() {
            let global_after = self
                .total_withdrawn(limit.window_hours, now)
                .saturating_add(amount);
            if global_after > limit.global_cap {
                return Err(LedgerError::TotalLimitExceeded { tier });
            }

            let user_after = self
                .user_total_withdrawn(limit.window_hours, now, user)
                .saturating_add(amount);
            if user_after > limit.user_cap {
                return Err(LedgerError::UserLimitExceeded { tier });
            }
        }
        Ok(())
    }

    /// Add `amount` to the current buckets of every tier.
    ///
    /// Callers must have passed [`UsageTracker::check`] first; counters
    /// saturate rather than wrap.
    pub fn record_withdrawal(
        &mut self,
        limits: &[WithdrawLimit],
        now: u64,
        user: Address,
        amount: Amount,
    ) {
        match self.policy {
            WindowPolicy::Tumbling => {
                for limit in limits {
                    self.add(limit.window_hours, now, user, amount);
                }
            }
            WindowPolicy::SlidingHourly => {
                let Some(longest) = limits.iter().map(|l| l.window_hours).max() else {
                    return;
                };
                self.add(1, now, user, amount);
                let (cutoff, _) = trailing_hours(longest, now);
                self.prune_hours_before(cutoff);
            }
        }
    }

    /// Check every tier, then record. Nothing is recorded on failure.
    pub fn check_and_apply(
        &mut self,
        limits: &[WithdrawLimit],
        now: u64,
        user: Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.check(limits, now, &user, amount)?;
        self.record_withdrawal(limits, now, user, amount);
        Ok(())
    }

    /// Smallest remaining headroom across all tiers for `user`.
    ///
    /// Per tier the headroom is `min(global_cap - total, user_cap - user_total)`.
    /// When the two are equal the user cap is reported as binding. Across
    /// tiers the first tier reaching the minimum wins.
    pub fn max_withdraw_amount(
        &self,
        limits: &[WithdrawLimit],
        user: &Address,
        now: u64,
    ) -> WithdrawHeadroom {
        let mut best = WithdrawHeadroom::UNLIMITED;
        for (tier, limit) in limits.iter().enumerate() {
            let global_room = limit
                .global_cap
                .saturating_sub(self.total_withdrawn(limit.window_hours, now));
            let user_room = limit
                .user_cap
                .saturating_sub(self.user_total_withdrawn(limit.window_hours, now, user));

            let is_user_limit = user_room <= global_room;
            let room = global_room.min(user_room);

            if best.limiting_tier.is_none() || room < best.max_amount {
                best = WithdrawHeadroom {
                    max_amount: room,
                    limiting_tier: Some(tier),
                    is_user_limit,
                };
            }
        }
        best
    }

    /// Forget all recorded usage.
    pub fn reset(&mut self) {
        self.global.clear();
        self.user.clear();
    }

    /// Whether no usage has been recorded since the last reset.
    pub fn is_empty(&self) -> bool {
        self.global.is_empty() && self.user.is_empty()
    }

    fn add(&mut self, span_hours: u32, now: u64, user: Address, amount: Amount) {
        let index = bucket_index(span_hours, now);

        let global = self
            .global
            .entry(span_hours)
            .or_default()
            .entry(index)
            .or_insert(0);
        *global = global.saturating_add(amount);

        let per_user = self
            .user
            .entry(span_hours)
            .or_default()
            .entry(index)
            .or_default()
            .entry(user)
            .or_insert(0);
        *per_user = per_user.saturating_add(amount);

        debug!(
            span_hours,
            bucket = index,
            user = %user,
            global_total = %global,
            "Recorded withdrawal usage"
        );
    }

    fn prune_hours_before(&mut self, cutoff: u64) {
        if let Some(hours) = self.global.get_mut(&1) {
            *hours = hours.split_off(&cutoff);
        }
        if let Some(hours) = self.user.get_mut(&1) {
            *hours = hours.split_off(&cutoff);
        }
    }
}

/// Inclusive hourly bucket range covering the trailing `window_hours`.
fn trailing_hours(window_hours: u32, now: u64) -> (u64, u64) {
    let current = bucket_index(1, now);
    let span = u64::from(window_hours.max(1)) - 1;
    (current.saturating_sub(span), current)
}
