//! Types library for the custodial collateral ledger
//!
//! Shared identifiers and amount arithmetic used by the ledger engine and
//! anything that talks to it (operators, tooling, tests).
//!
//! # Modules
//! - `ids`: Principal addresses (users, matchers, the ledger itself)
//! - `numeric`: Collateral amounts, signed deltas, amount parsing
//! - `errors`: Parse error taxonomy

pub mod ids;
pub mod numeric;
pub mod errors;

// Library version constant
pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::ids::*;
    pub use crate::numeric::*;
    pub use crate::errors::*;
}
