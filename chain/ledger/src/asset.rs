//! Collateral asset transfers
//!
//! The ledger never moves funds itself; it asks an [`AssetTransfer`]
//! collaborator and trusts its success signal. [`CollateralToken`] is an
//! in-memory fungible token with allowances, used by tests and local tools.

use std::collections::HashMap;
use tracing::warn;
use types::ids::Address;
use types::numeric::Amount;

/// Moves collateral in and out of the ledger's custody.
pub trait AssetTransfer {
    /// Pull `amount` from `payer` into custody. `false` leaves balances as they were.
    fn pull_from(&mut self, payer: &Address, amount: Amount) -> bool;

    /// Push `amount` from custody to `recipient`. `false` leaves balances as they were.
    fn push_to(&mut self, recipient: &Address, amount: Amount) -> bool;

    /// Collateral currently held in custody.
    fn custody_balance(&self) -> Amount;
}

/// In-memory fungible token holding the ledger's custody account.
#[derive(Debug, Clone)]
pub struct CollateralToken {
    custody: Address,
    balances: HashMap<Address, Amount>,
    /// (owner, spender) -> remaining allowance
    allowances: HashMap<(Address, Address), Amount>,
    halted: bool,
}

impl CollateralToken {
    /// Create a token whose custody account is `custody` (the ledger's address).
    pub fn new(custody: Address) -> Self {
        Self {
            custody,
            balances: HashMap::new(),
            allowances: HashMap::new(),
            halted: false,
        }
    }

    pub fn custody(&self) -> Address {
        self.custody
    }

    /// Credit `amount` new tokens to `to`.
    pub fn mint(&mut self, to: Address, amount: Amount) {
        let balance = self.balances.entry(to).or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    /// Set the amount `spender` may pull from `owner`.
    pub fn approve(&mut self, owner: Address, spender: Address, amount: Amount) {
        self.allowances.insert((owner, spender), amount);
    }

    pub fn balance_of(&self, owner: &Address) -> Amount {
        self.balances.get(owner).copied().unwrap_or(0)
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or(0)
    }

    /// Make every transfer fail (simulates a paused or misbehaving token).
    pub fn halt(&mut self, halted: bool) {
        self.halted = halted;
    }

    fn transfer(&mut self, from: &Address, to: &Address, amount: Amount) -> bool {
        let from_balance = self.balance_of(from);
        if from_balance < amount {
            return false;
        }
        if from == to {
            return true;
        }
        let Some(new_to) = self.balance_of(to).checked_add(amount) else {
            return false;
        };
        self.balances.insert(*from, from_balance - amount);
        self.balances.insert(*to, new_to);
        true
    }
}

impl AssetTransfer for CollateralToken {
    fn pull_from(&mut self, payer: &Address, amount: Amount) -> bool {
        if self.halted {
            warn!(payer = %payer, amount = %amount, "Token halted, rejecting pull");
            return false;
        }
        let allowance = self.allowance(payer, &self.custody);
        if allowance < amount {
            return false;
        }
        let custody = self.custody;
        if !self.transfer(payer, &custody, amount) {
            return false;
        }
        self.allowances.insert((*payer, custody), allowance - amount);
        true
    }

    fn push_to(&mut self, recipient: &Address, amount: Amount) -> bool {
        if self.halted {
            warn!(recipient = %recipient, amount = %amount, "Token halted, rejecting push");
            return false;
        }
        let custody = self.custody;
        self.transfer(&custody, recipient, amount)
    }

    fn custody_balance(&self) -> Amount {
        self.balance_of(&self.custody)
    }
}
