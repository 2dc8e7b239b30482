//! Role-based access control
//!
//! The ledger never stores role membership itself for its decisions; it asks
//! a [`RoleAuthority`]. Which role an operation needs is expressed once, in
//! [`Action::required_role`], and checked through [`authorize`].
//!
//! [`AccessControl`] is an in-memory authority where admins grant and revoke
//! roles.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use types::ids::Address;

/// Roles known to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    /// Configuration authority: limits, migration, role management
    Admin,
    /// Trusted operator allowed to withdraw on users' behalf
    Matcher,
}

/// Privileged operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    ConfigureLimits,
    Migrate,
    Upgrade,
    WithdrawFor,
    SignWithdrawal,
}

impl Action {
    pub fn required_role(self) -> Role {
        match self {
            Action::ConfigureLimits | Action::Migrate | Action::Upgrade => Role::Admin,
            Action::WithdrawFor | Action::SignWithdrawal => Role::Matcher,
        }
    }
}

/// Answers "does principal P hold role R".
pub trait RoleAuthority {
    fn has_role(&self, role: Role, principal: &Address) -> bool;
}

/// Capability check: may `principal` perform `action`.
pub fn authorize<R: RoleAuthority + ?Sized>(
    authority: &R,
    principal: &Address,
    action: Action,
) -> bool {
    authority.has_role(action.required_role(), principal)
}

/// In-memory role registry.
///
/// A principal may hold several roles. The primary admin set at
/// construction cannot lose the admin role.
#[derive(Debug, Clone)]
pub struct AccessControl {
    roles: HashMap<Role, HashSet<Address>>,
    admin: Address,
}

impl AccessControl {
    /// Create access control with an initial admin.
    pub fn new(admin: Address) -> Self {
        let mut roles: HashMap<Role, HashSet<Address>> = HashMap::new();
        roles.entry(Role::Admin).or_default().insert(admin);
        Self { roles, admin }
    }

    /// Create with an admin and an initial set of matchers.
    pub fn with_matchers(admin: Address, matchers: impl IntoIterator<Item = Address>) -> Self {
        let mut ac = Self::new(admin);
        ac.roles.entry(Role::Matcher).or_default().extend(matchers);
        ac
    }

    pub fn is_admin(&self, caller: &Address) -> bool {
        self.has_role(Role::Admin, caller)
    }

    /// Assign a role. Only admins can assign roles.
    pub fn grant_role(&mut self, admin_caller: &Address, role: Role, target: Address) -> bool {
        if !self.is_admin(admin_caller) {
            return false;
        }
        self.roles.entry(role).or_default().insert(target);
        true
    }

    /// Remove a role. Only admins can revoke.
    pub fn revoke_role(&mut self, admin_caller: &Address, role: Role, target: &Address) -> bool {
        if !self.is_admin(admin_caller) {
            return false;
        }
        // Cannot revoke the primary admin
        if role == Role::Admin && *target == self.admin {
            return false;
        }
        if let Some(members) = self.roles.get_mut(&role) {
            members.remove(target);
        }
        true
    }

    /// Get the primary admin.
    pub fn admin(&self) -> &Address {
        &self.admin
    }

    /// Members of `role`, in no particular order.
    pub fn members(&self, role: Role) -> impl Iterator<Item = &Address> {
        self.roles.get(&role).into_iter().flatten()
    }
}

impl RoleAuthority for AccessControl {
    fn has_role(&self, role: Role, principal: &Address) -> bool {
        self.roles
            .get(&role)
            .map_or(false, |members| members.contains(principal))
    }
}
