//! One-shot V1 → V2 migration
//!
//! A V1 ledger has balances but no withdraw limits. Migration installs the
//! first tier list, starts usage tracking from empty and moves the ledger to
//! [`MigrationState::Migrated`], from which there is no way back.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::LedgerError;
use crate::limits::{validate_limits, WithdrawLimit};
use crate::store::LedgerStore;

/// Migration progress of a ledger's storage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MigrationState {
    /// V1 layout: no limit configuration
    #[default]
    Unmigrated,
    /// V2 layout, reached at `migrated_at` (unix seconds). Terminal.
    #[serde(rename_all = "camelCase")]
    Migrated { migrated_at: u64 },
}

impl MigrationState {
    pub fn is_migrated(&self) -> bool {
        matches!(self, MigrationState::Migrated { .. })
    }

    /// Fails with `AlreadyMigrated` once migrated.
    pub fn ensure_unmigrated(&self) -> Result<(), LedgerError> {
        match self {
            MigrationState::Unmigrated => Ok(()),
            MigrationState::Migrated { .. } => Err(LedgerError::AlreadyMigrated),
        }
    }

    /// Fails with `NotMigrated` before migration.
    pub fn ensure_migrated(&self) -> Result<(), LedgerError> {
        match self {
            MigrationState::Unmigrated => Err(LedgerError::NotMigrated),
            MigrationState::Migrated { .. } => Ok(()),
        }
    }
}

/// Seed V2 state into `store`.
///
/// Validates `initial_limits` before touching anything; on any error the
/// store is unchanged.
pub fn migrate_to_v2(
    store: &mut LedgerStore,
    initial_limits: Vec<WithdrawLimit>,
    now: u64,
) -> Result<(), LedgerError> {
    store.migration.ensure_unmigrated()?;
    validate_limits(&initial_limits)?;

    store.limits = initial_limits;
    store.usage.reset();
    store.migration = MigrationState::Migrated { migrated_at: now };

    info!(
        tiers = store.limits.len(),
        migrated_at = now,
        "Migrated ledger storage to V2"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usage::WindowPolicy;
    use types::ids::Address;

    fn v1_store() -> LedgerStore {
        LedgerStore::new(Address::new([5; 32]), WindowPolicy::default())
    }

    #[test]
    fn test_default_is_unmigrated() {
        let state = MigrationState::default();
        assert!(!state.is_migrated());
        assert!(state.ensure_unmigrated().is_ok());
        assert_eq!(state.ensure_migrated(), Err(LedgerError::NotMigrated));
    }

    #[test]
    fn test_migrate_installs_limits() {
        let mut store = v1_store();
        store.credit(Address::new([1; 32]), 100).unwrap();
        let limits = vec![WithdrawLimit::new(10, 1, 24)];

        migrate_to_v2(&mut store, limits.clone(), 5000).unwrap();
        assert_eq!(store.limits(), limits.as_slice());
        assert_eq!(store.migration(), MigrationState::Migrated { migrated_at: 5000 });
        // Balances and the collateral survive
        assert_eq!(store.balance_of(&Address::new([1; 32])), 100);
        assert_eq!(store.collateral(), Address::new([5; 32]));
    }

    #[test]
    fn test_second_migration_rejected() {
        let mut store = v1_store();
        let limits = vec![WithdrawLimit::new(10, 1, 24)];
        migrate_to_v2(&mut store, limits.clone(), 5000).unwrap();

        assert_eq!(
            migrate_to_v2(&mut store, vec![], 6000),
            Err(LedgerError::AlreadyMigrated)
        );
        assert_eq!(store.limits(), limits.as_slice());
        assert_eq!(store.migration(), MigrationState::Migrated { migrated_at: 5000 });
    }

    #[test]
    fn test_invalid_limits_leave_store_unmigrated() {
        let mut store = v1_store();
        let before = store.clone();
        let result = migrate_to_v2(&mut store, vec![WithdrawLimit::new(1, 5, 1)], 5000);
        assert!(matches!(result, Err(LedgerError::InvalidWithdrawLimit { .. })));
        assert_eq!(store, before);
    }

    #[test]
    fn test_state_serialization() {
        let state = MigrationState::Migrated { migrated_at: 42 };
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(json, r#"{"migrated":{"migratedAt":42}}"#);
        let back: MigrationState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
