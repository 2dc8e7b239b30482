//! Ledger: collateral custody, balance accounting and rate-limited withdrawals
//!
//! [`Ledger`] owns a [`LedgerStore`] and talks to three collaborators:
//! - an [`AssetTransfer`] that actually moves collateral
//! - a [`RoleAuthority`] answering role membership questions
//! - a [`Clock`] supplying the current time
//!
//! Every mutating operation validates completely before it changes anything.
//! The only fallible external call (pulling or pushing collateral) happens
//! after validation and before the first write, so a failed operation leaves
//! the store and the event log exactly as they were.

use tracing::{info, warn};
use types::ids::Address;
use types::numeric::{credit_delta, debit_delta, Amount};

use crate::asset::AssetTransfer;
use crate::authorization::{
    verify_authorization, AuthorizationMode, Authorized, WithdrawAuthorization, WithdrawContext,
};
use crate::clock::Clock;
use crate::config::LedgerConfig;
use crate::errors::{ConfigError, LedgerError};
use crate::events::{
    AuthorizationModeChanged, LedgerEvent, MigratedToV2, UserBalanceChanged, WithdrawLimitsUpdated,
};
use crate::limits::{validate_limits, WithdrawLimit};
use crate::migration::{self, MigrationState};
use crate::security::{authorize, AccessControl, Action, RoleAuthority};
use crate::store::LedgerStore;
use crate::usage::{WindowPolicy, WithdrawHeadroom};

/// Custodial collateral ledger.
///
/// Operations run strictly one at a time (`&mut self`); callers serialize
/// concurrent submissions before they reach the ledger.
#[derive(Debug)]
pub struct Ledger<A, R, C> {
    /// The ledger's own address: custody account and permit binding
    identity: Address,
    store: LedgerStore,
    asset: A,
    roles: R,
    clock: C,
    /// Emitted events log (append-only)
    events: Vec<LedgerEvent>,
}

impl<A: AssetTransfer, R: RoleAuthority, C: Clock> Ledger<A, R, C> {
    /// V1 ledger: balances only, no withdraw limits, awaiting migration.
    pub fn new_v1(identity: Address, collateral: Address, asset: A, roles: R, clock: C) -> Self {
        info!(identity = %identity, collateral = %collateral, "Created V1 ledger");
        let store = LedgerStore::new(collateral, WindowPolicy::default());
        Self::from_store(identity, store, asset, roles, clock)
    }

    /// Fresh V2 ledger, born migrated with `limits` installed.
    pub fn new(
        identity: Address,
        collateral: Address,
        limits: Vec<WithdrawLimit>,
        asset: A,
        roles: R,
        clock: C,
    ) -> Result<Self, LedgerError> {
        validate_limits(&limits)?;
        let mut store = LedgerStore::new(collateral, WindowPolicy::default());
        store.limits = limits;
        store.migration = MigrationState::Migrated {
            migrated_at: clock.now(),
        };
        info!(
            identity = %identity,
            collateral = %collateral,
            tiers = store.limits.len(),
            "Created V2 ledger"
        );
        Ok(Self::from_store(identity, store, asset, roles, clock))
    }

    /// Attach new code to existing storage.
    pub fn from_store(
        identity: Address,
        store: LedgerStore,
        asset: A,
        roles: R,
        clock: C,
    ) -> Self {
        Self {
            identity,
            store,
            asset,
            roles,
            clock,
            events: Vec::new(),
        }
    }

    /// Detach the storage, e.g. before swapping in upgraded code.
    pub fn into_store(self) -> LedgerStore {
        self.store
    }

    /// Detach storage and collaborators.
    pub fn into_parts(self) -> (LedgerStore, A, R, C) {
        (self.store, self.asset, self.roles, self.clock)
    }

    // ───────────────────────── Deposit ─────────────────────────

    /// Pull `amount` from `caller` and credit it to `caller`.
    pub fn deposit(
        &mut self,
        caller: &Address,
        amount: Amount,
    ) -> Result<LedgerEvent, LedgerError> {
        self.deposit_to(caller, caller, amount)
    }

    /// Pull `amount` from `payer` and credit it to `beneficiary`.
    ///
    /// Emits `UserBalanceChanged` with a positive delta and reference 0.
    pub fn deposit_to(
        &mut self,
        payer: &Address,
        beneficiary: &Address,
        amount: Amount,
    ) -> Result<LedgerEvent, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }
        self.store.credited_balance(beneficiary, amount)?;
        let delta = credit_delta(amount).ok_or(LedgerError::Overflow)?;

        if !self.asset.pull_from(payer, amount) {
            warn!(payer = %payer, amount = %amount, "Deposit pull failed");
            return Err(LedgerError::TransferFailed);
        }
        let balance = self.store.credit(*beneficiary, amount)?;

        info!(
            payer = %payer,
            beneficiary = %beneficiary,
            amount = %amount,
            balance = %balance,
            "Deposit credited"
        );
        Ok(self.emit(LedgerEvent::UserBalanceChanged(UserBalanceChanged {
            user: *beneficiary,
            delta,
            reference: 0,
        })))
    }

    // ───────────────────────── Withdraw ─────────────────────────

    /// Withdraw `amount` of `user`'s collateral back to `user`.
    ///
    /// Checks run in order: amount, authorization, balance, every limit
    /// tier. Only then is collateral pushed out; the debit, the usage
    /// update and permit consumption follow a successful push.
    pub fn withdraw(
        &mut self,
        user: &Address,
        amount: Amount,
        authorization: &WithdrawAuthorization,
    ) -> Result<LedgerEvent, LedgerError> {
        let now = self.clock.now();
        match self.try_withdraw(user, amount, authorization, now) {
            Ok(event) => Ok(event),
            Err(err) => {
                warn!(user = %user, amount = %amount, error = %err, "Withdrawal rejected");
                Err(err)
            }
        }
    }

    fn try_withdraw(
        &mut self,
        user: &Address,
        amount: Amount,
        authorization: &WithdrawAuthorization,
        now: u64,
    ) -> Result<LedgerEvent, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }

        let Authorized {
            reference,
            permit,
            matcher,
        } = verify_authorization(
            authorization,
            self.store.authorization,
            &self.roles,
            &self.store.consumed_permits,
            WithdrawContext {
                ledger: &self.identity,
                user,
                amount,
                now,
            },
        )?;

        let available = self.store.balance_of(user);
        if amount > available {
            return Err(LedgerError::InsufficientBalance {
                required: amount,
                available,
            });
        }
        self.store.usage.check(&self.store.limits, now, user, amount)?;
        let delta = debit_delta(amount).ok_or(LedgerError::Overflow)?;

        if !self.asset.push_to(user, amount) {
            return Err(LedgerError::TransferFailed);
        }

        // Commit
        let balance = self.store.debit(*user, amount)?;
        self.store
            .usage
            .record_withdrawal(&self.store.limits, now, *user, amount);
        if let Some(permit) = permit {
            self.store.consume_permit(permit, now);
        }

        info!(
            user = %user,
            amount = %amount,
            balance = %balance,
            matcher = %matcher,
            reference,
            "Withdrawal applied"
        );
        Ok(self.emit(LedgerEvent::UserBalanceChanged(UserBalanceChanged {
            user: *user,
            delta,
            reference,
        })))
    }

    // ───────────────────────── Configuration ─────────────────────────

    /// Replace the whole tier list. Admin-only, V2 and later.
    ///
    /// Usage tracking restarts from empty. An empty list disables limiting.
    pub fn set_withdraw_limits(
        &mut self,
        caller: &Address,
        limits: Vec<WithdrawLimit>,
    ) -> Result<LedgerEvent, LedgerError> {
        if !authorize(&self.roles, caller, Action::ConfigureLimits) {
            return Err(LedgerError::Unauthorized);
        }
        self.store.migration.ensure_migrated()?;
        if let Err(err) = validate_limits(&limits) {
            warn!(caller = %caller, error = %err, "Rejected withdraw limits");
            return Err(err);
        }

        self.store.limits = limits;
        self.store.usage.reset();

        info!(caller = %caller, tiers = self.store.limits.len(), "Withdraw limits updated");
        Ok(self.emit(LedgerEvent::WithdrawLimitsUpdated(WithdrawLimitsUpdated {
            limits: self.store.limits.clone(),
        })))
    }

    /// One-shot V1 → V2 migration. Admin-only.
    ///
    /// A migrated ledger answers `AlreadyMigrated` to everyone, before any
    /// role check. Emits `WithdrawLimitsUpdated` followed by `MigratedToV2`
    /// and returns the latter.
    pub fn migrate_to_v2(
        &mut self,
        caller: &Address,
        initial_limits: Vec<WithdrawLimit>,
    ) -> Result<LedgerEvent, LedgerError> {
        self.store.migration.ensure_unmigrated()?;
        if !authorize(&self.roles, caller, Action::Migrate) {
            return Err(LedgerError::Unauthorized);
        }

        let now = self.clock.now();
        migration::migrate_to_v2(&mut self.store, initial_limits, now)?;

        let limits = self.store.limits.clone();
        self.emit(LedgerEvent::WithdrawLimitsUpdated(WithdrawLimitsUpdated {
            limits: limits.clone(),
        }));
        Ok(self.emit(LedgerEvent::MigratedToV2(MigratedToV2 {
            limits,
            migrated_at: now,
        })))
    }

    /// Switch withdrawals to matcher-signed permits. Admin-only, requires V2.
    pub fn upgrade_to_v3(&mut self, caller: &Address) -> Result<LedgerEvent, LedgerError> {
        if !authorize(&self.roles, caller, Action::Upgrade) {
            return Err(LedgerError::Unauthorized);
        }
        self.store.migration.ensure_migrated()?;

        self.store.authorization = AuthorizationMode::SignatureGated;
        info!(caller = %caller, "Withdrawals now require signed permits");
        Ok(self.emit(LedgerEvent::AuthorizationModeChanged(AuthorizationModeChanged {
            mode: AuthorizationMode::SignatureGated,
        })))
    }

    // ───────────────────────── Queries ─────────────────────────

    pub fn identity(&self) -> &Address {
        &self.identity
    }

    /// The collateral asset held in custody.
    pub fn collateral(&self) -> Address {
        self.store.collateral()
    }

    pub fn balance_of(&self, user: &Address) -> Amount {
        self.store.balance_of(user)
    }

    /// Sum of all balances; never above the custody balance.
    pub fn total_balances(&self) -> Option<Amount> {
        self.store.total_balances()
    }

    pub fn withdraw_limits(&self) -> &[WithdrawLimit] {
        self.store.limits()
    }

    pub fn withdraw_limit(&self, index: usize) -> Option<&WithdrawLimit> {
        self.store.limits().get(index)
    }

    /// Global amount withdrawn in the window of `window_hours` containing `at`.
    pub fn total_withdrawn(&self, window_hours: u32, at: u64) -> Amount {
        self.store.usage().total_withdrawn(window_hours, at)
    }

    /// Amount `user` withdrew in the window of `window_hours` containing `at`.
    pub fn user_total_withdrawn(&self, window_hours: u32, at: u64, user: &Address) -> Amount {
        self.store.usage().user_total_withdrawn(window_hours, at, user)
    }

    /// Largest amount `user` could withdraw right now as far as limits go.
    pub fn max_withdraw_amount(&self, user: &Address) -> WithdrawHeadroom {
        self.store
            .usage()
            .max_withdraw_amount(self.store.limits(), user, self.clock.now())
    }

    pub fn migration_state(&self) -> MigrationState {
        self.store.migration()
    }

    pub fn authorization_mode(&self) -> AuthorizationMode {
        self.store.authorization()
    }

    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    // ───────────────────────── Collaborators ─────────────────────────

    pub fn asset(&self) -> &A {
        &self.asset
    }

    pub fn asset_mut(&mut self) -> &mut A {
        &mut self.asset
    }

    pub fn roles(&self) -> &R {
        &self.roles
    }

    /// Role registry, for grant and revoke.
    pub fn roles_mut(&mut self) -> &mut R {
        &mut self.roles
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    // ───────────────────────── Events ─────────────────────────

    /// Get all emitted events.
    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    /// Drain all events (consume and clear).
    pub fn drain_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.events)
    }

    fn emit(&mut self, event: LedgerEvent) -> LedgerEvent {
        self.events.push(event.clone());
        event
    }
}

impl<A: AssetTransfer, C: Clock> Ledger<A, AccessControl, C> {
    /// Build a migrated ledger from deployment configuration.
    pub fn from_config(config: &LedgerConfig, asset: A, clock: C) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut store = LedgerStore::new(config.collateral, config.window_policy);
        store.limits = config.withdraw_limits.clone();
        store.authorization = config.authorization;
        store.migration = MigrationState::Migrated {
            migrated_at: clock.now(),
        };

        info!(
            identity = %config.identity,
            collateral = %config.collateral,
            tiers = store.limits.len(),
            matchers = config.matchers.len(),
            policy = ?config.window_policy,
            mode = ?config.authorization,
            "Created ledger from configuration"
        );
        Ok(Self::from_store(
            config.identity,
            store,
            asset,
            config.access_control(),
            clock,
        ))
    }
}
