//! Custodial Collateral Ledger
//!
//! This crate implements the custody layer for a single fungible collateral:
//! deposits, per-user balances, and matcher-initiated withdrawals under
//! tiered, time-windowed rate limits.
//!
//! # Modules
//! - `errors`: Ledger and configuration error types
//! - `events`: Balance and configuration change events
//! - `limits`: Withdraw limit tiers and their validation
//! - `usage`: Time-bucketed withdrawal accounting and headroom queries
//! - `clock`: Time sources
//! - `asset`: Collateral transfer collaborator and an in-memory token
//! - `security`: Roles, capability checks, access control
//! - `authorization`: Role-gated and signature-gated withdrawal authorization
//! - `migration`: One-shot V1 → V2 storage migration
//! - `store`: Persisted ledger state
//! - `config`: Deployment configuration
//! - `ledger`: The ledger engine
//!
//! # Version
//! v0.1.0 (storage layout 2)

pub mod errors;
pub mod events;
pub mod limits;
pub mod usage;
pub mod clock;
pub mod asset;
pub mod security;
pub mod authorization;
pub mod migration;
pub mod store;
pub mod config;
pub mod ledger;

pub use crate::ledger::Ledger;

/// Ledger interface version (frozen after release)
pub const LEDGER_ABI_VERSION: &str = "1.0.0";
