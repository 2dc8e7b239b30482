//! Persisted ledger state
//!
//! Everything that must survive a code upgrade lives in [`LedgerStore`]:
//! the collateral asset, balances, the tier list, usage buckets, migration
//! state, authorization mode and consumed permits. Ordered maps keep the
//! serialized form identical for identical histories.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use types::ids::Address;
use types::numeric::Amount;

use crate::authorization::{AuthorizationMode, ConsumedPermit, WithdrawalPermit};
use crate::errors::LedgerError;
use crate::limits::WithdrawLimit;
use crate::migration::MigrationState;
use crate::usage::{UsageTracker, WindowPolicy};

/// Storage layout version (bump only with a migration)
pub const STORE_LAYOUT_VERSION: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerStore {
    pub(crate) layout_version: u32,
    pub(crate) collateral: Address,
    pub(crate) balances: BTreeMap<Address, Amount>,
    pub(crate) limits: Vec<WithdrawLimit>,
    pub(crate) usage: UsageTracker,
    pub(crate) migration: MigrationState,
    pub(crate) authorization: AuthorizationMode,
    /// Ordered by deadline so expired entries prune from the front
    pub(crate) consumed_permits: BTreeSet<ConsumedPermit>,
}

impl LedgerStore {
    /// Empty, unmigrated store holding `collateral`.
    pub fn new(collateral: Address, policy: WindowPolicy) -> Self {
        Self {
            layout_version: STORE_LAYOUT_VERSION,
            collateral,
            balances: BTreeMap::new(),
            limits: Vec::new(),
            usage: UsageTracker::with_policy(policy),
            migration: MigrationState::Unmigrated,
            authorization: AuthorizationMode::RoleGated,
            consumed_permits: BTreeSet::new(),
        }
    }

    pub fn layout_version(&self) -> u32 {
        self.layout_version
    }

    /// The collateral asset this ledger holds in custody.
    pub fn collateral(&self) -> Address {
        self.collateral
    }

    pub fn balance_of(&self, user: &Address) -> Amount {
        self.balances.get(user).copied().unwrap_or(0)
    }

    /// All balances, ordered by address.
    pub fn balances(&self) -> &BTreeMap<Address, Amount> {
        &self.balances
    }

    /// Sum of all balances. `None` on overflow.
    pub fn total_balances(&self) -> Option<Amount> {
        self.balances
            .values()
            .try_fold(0 as Amount, |acc, b| acc.checked_add(*b))
    }

    pub fn limits(&self) -> &[WithdrawLimit] {
        &self.limits
    }

    pub fn usage(&self) -> &UsageTracker {
        &self.usage
    }

    pub fn migration(&self) -> MigrationState {
        self.migration
    }

    pub fn authorization(&self) -> AuthorizationMode {
        self.authorization
    }

    pub fn is_permit_consumed(&self, permit: &WithdrawalPermit) -> bool {
        self.consumed_permits.contains(&(permit.deadline, permit.digest()))
    }

    pub fn consumed_permit_count(&self) -> usize {
        self.consumed_permits.len()
    }

    /// Mark a permit as used and drop every entry whose deadline is before
    /// `now`. Those permits fail the expiry check before replay is looked at.
    pub(crate) fn consume_permit(&mut self, permit: ConsumedPermit, now: u64) {
        self.consumed_permits.insert(permit);
        self.consumed_permits = self.consumed_permits.split_off(&(now, [0u8; 32]));
    }

    /// Balance after crediting `amount`, without applying it.
    pub(crate) fn credited_balance(
        &self,
        user: &Address,
        amount: Amount,
    ) -> Result<Amount, LedgerError> {
        self.balance_of(user)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)
    }

    /// Credit with overflow protection.
    pub(crate) fn credit(&mut self, user: Address, amount: Amount) -> Result<Amount, LedgerError> {
        let new_balance = self.credited_balance(&user, amount)?;
        self.balances.insert(user, new_balance);
        Ok(new_balance)
    }

    /// Debit with underflow protection. Balances resting at zero are kept.
    pub(crate) fn debit(&mut self, user: Address, amount: Amount) -> Result<Amount, LedgerError> {
        let available = self.balance_of(&user);
        let new_balance = available
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance {
                required: amount,
                available,
            })?;
        self.balances.insert(user, new_balance);
        Ok(new_balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Address {
        Address::new([0xa1; 32])
    }

    fn usdt() -> Address {
        Address::new([0x05; 32])
    }

    fn empty_store() -> LedgerStore {
        LedgerStore::new(usdt(), WindowPolicy::default())
    }

    #[test]
    fn test_empty_store() {
        let store = empty_store();
        assert_eq!(store.layout_version(), STORE_LAYOUT_VERSION);
        assert_eq!(store.collateral(), usdt());
        assert_eq!(store.migration(), MigrationState::Unmigrated);
        assert_eq!(store.authorization(), AuthorizationMode::RoleGated);
        assert_eq!(store.total_balances(), Some(0));
    }

    #[test]
    fn test_credit_and_debit() {
        let mut store = empty_store();
        assert_eq!(store.credit(alice(), 100).unwrap(), 100);
        assert_eq!(store.debit(alice(), 40).unwrap(), 60);
        assert_eq!(store.balance_of(&alice()), 60);
    }

    #[test]
    fn test_debit_to_zero_keeps_entry() {
        let mut store = empty_store();
        store.credit(alice(), 10).unwrap();
        store.debit(alice(), 10).unwrap();
        assert_eq!(store.balances().get(&alice()), Some(&0));
    }

    #[test]
    fn test_debit_insufficient() {
        let mut store = empty_store();
        store.credit(alice(), 10).unwrap();
        assert_eq!(
            store.debit(alice(), 11),
            Err(LedgerError::InsufficientBalance {
                required: 11,
                available: 10
            })
        );
        assert_eq!(store.balance_of(&alice()), 10);
    }

    #[test]
    fn test_credit_overflow() {
        let mut store = empty_store();
        store.credit(alice(), Amount::MAX).unwrap();
        assert_eq!(store.credit(alice(), 1), Err(LedgerError::Overflow));
        assert_eq!(store.balance_of(&alice()), Amount::MAX);
    }

    #[test]
    fn test_total_balances() {
        let mut store = empty_store();
        store.credit(alice(), 10).unwrap();
        store.credit(Address::new([2; 32]), 32).unwrap();
        assert_eq!(store.total_balances(), Some(42));
    }

    #[test]
    fn test_store_serialization_round_trip() {
        let mut store = empty_store();
        store.credit(alice(), 1_000_000_000_000_000_000_000).unwrap();
        store.limits = vec![WithdrawLimit::new(1000, 500, 6)];
        store.migration = MigrationState::Migrated { migrated_at: 9 };
        store.consumed_permits.insert((1_700_000_000, [7u8; 32]));

        let json = serde_json::to_string(&store).unwrap();
        let restored: LedgerStore = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, store);
        assert_eq!(restored.collateral(), usdt());
    }

    #[test]
    fn test_consume_permit_prunes_expired() {
        let mut store = empty_store();
        store.consume_permit((100, [1u8; 32]), 50);
        store.consume_permit((200, [2u8; 32]), 60);
        assert_eq!(store.consumed_permit_count(), 2);

        // Deadline 100 is still live at 100, gone at 101
        store.consume_permit((300, [3u8; 32]), 100);
        assert_eq!(store.consumed_permit_count(), 3);
        store.consume_permit((400, [4u8; 32]), 101);
        assert_eq!(store.consumed_permit_count(), 3);
        assert!(!store.consumed_permits.contains(&(100, [1u8; 32])));
        assert!(store.consumed_permits.contains(&(200, [2u8; 32])));
    }
}
