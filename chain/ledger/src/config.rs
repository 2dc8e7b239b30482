//! Ledger configuration
//!
//! Deployment parameters in JSON form:
//!
//! ```json
//! {
//!   "identity": "0x…",
//!   "admin": "0x…",
//!   "collateral": "0x…",
//!   "matchers": ["0x…", "0x…"],
//!   "authorization": "roleGated",
//!   "windowPolicy": "tumbling",
//!   "withdrawLimits": [{"limit": "1_000_000_000", "userLimit": "1_000_000", "timeWindow": 1}]
//! }
//! ```

use serde::{Deserialize, Serialize};
use types::ids::Address;

use crate::authorization::AuthorizationMode;
use crate::errors::ConfigError;
use crate::limits::{validate_limits, WithdrawLimit};
use crate::security::{AccessControl, Role};
use crate::usage::WindowPolicy;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LedgerConfig {
    /// The ledger's own address (custody account, permit binding)
    pub identity: Address,
    /// Primary admin
    pub admin: Address,
    /// Collateral asset held in custody
    pub collateral: Address,
    /// Additional admins
    #[serde(default)]
    pub admins: Vec<Address>,
    /// Initial matchers
    #[serde(default)]
    pub matchers: Vec<Address>,
    #[serde(default)]
    pub authorization: AuthorizationMode,
    #[serde(default)]
    pub window_policy: WindowPolicy,
    /// Initial tier list, shortest window first
    #[serde(default)]
    pub withdraw_limits: Vec<WithdrawLimit>,
}

impl LedgerConfig {
    /// Minimal configuration: role-gated, tumbling windows, no tiers.
    pub fn new(identity: Address, admin: Address, collateral: Address) -> Self {
        Self {
            identity,
            admin,
            collateral,
            admins: Vec::new(),
            matchers: Vec::new(),
            authorization: AuthorizationMode::default(),
            window_policy: WindowPolicy::default(),
            withdraw_limits: Vec::new(),
        }
    }

    /// Parse and validate.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: LedgerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.identity.is_zero() {
            return Err(ConfigError::Malformed("identity must not be the zero address".into()));
        }
        if self.collateral.is_zero() {
            return Err(ConfigError::Malformed("collateral must not be the zero address".into()));
        }
        if self.collateral == self.identity {
            return Err(ConfigError::Malformed("collateral cannot be the ledger itself".into()));
        }
        let principals = std::iter::once(&self.admin)
            .chain(&self.admins)
            .chain(&self.matchers);
        for principal in principals {
            if principal.is_zero() {
                return Err(ConfigError::Malformed("zero address in role list".into()));
            }
            if *principal == self.identity {
                return Err(ConfigError::Malformed(format!(
                    "ledger identity {} cannot hold a role",
                    principal
                )));
            }
        }
        validate_limits(&self.withdraw_limits)?;
        Ok(())
    }

    /// Role registry seeded with the configured admins and matchers.
    pub fn access_control(&self) -> AccessControl {
        let mut ac = AccessControl::with_matchers(self.admin, self.matchers.iter().copied());
        for admin in &self.admins {
            ac.grant_role(&self.admin, Role::Admin, *admin);
        }
        ac
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::LedgerError;
    use crate::security::RoleAuthority;

    fn hex_addr(b: u8) -> String {
        Address::new([b; 32]).to_hex()
    }

    fn minimal() -> LedgerConfig {
        LedgerConfig::new(
            Address::new([0xee; 32]),
            Address::new([1; 32]),
            Address::new([5; 32]),
        )
    }

    #[test]
    fn test_minimal_json() {
        let json = format!(
            r#"{{"identity": "{}", "admin": "{}", "collateral": "{}"}}"#,
            hex_addr(0xee),
            hex_addr(1),
            hex_addr(5)
        );
        let config = LedgerConfig::from_json_str(&json).unwrap();
        assert_eq!(config, minimal());
        assert_eq!(config.collateral, Address::new([5; 32]));
    }

    #[test]
    fn test_missing_collateral_rejected() {
        let json = format!(
            r#"{{"identity": "{}", "admin": "{}"}}"#,
            hex_addr(0xee),
            hex_addr(1)
        );
        assert!(matches!(
            LedgerConfig::from_json_str(&json),
            Err(ConfigError::Malformed(_))
        ));
    }

    #[test]
    fn test_zero_collateral_rejected() {
        let mut config = minimal();
        config.collateral = Address::ZERO;
        assert!(matches!(config.validate(), Err(ConfigError::Malformed(_))));

        config.collateral = config.identity;
        assert!(matches!(config.validate(), Err(ConfigError::Malformed(_))));
    }

    #[test]
    fn test_full_json() {
        let json = format!(
            r#"{{
                "identity": "{}",
                "admin": "{}",
                "collateral": "{}",
                "admins": ["{}"],
                "matchers": ["{}", "{}"],
                "authorization": "signatureGated",
                "windowPolicy": "slidingHourly",
                "withdrawLimits": [
                    {{"limit": "1_000_000_000", "userLimit": "1_000_000", "timeWindow": 1}},
                    {{"limit": "2_000_000_000", "userLimit": "2_000_000", "timeWindow": 2}}
                ]
            }}"#,
            hex_addr(0xee),
            hex_addr(1),
            hex_addr(5),
            hex_addr(2),
            hex_addr(3),
            hex_addr(4)
        );
        let config = LedgerConfig::from_json_str(&json).unwrap();
        assert_eq!(config.authorization, AuthorizationMode::SignatureGated);
        assert_eq!(config.window_policy, WindowPolicy::SlidingHourly);
        assert_eq!(config.withdraw_limits.len(), 2);
        assert_eq!(config.collateral, Address::new([5; 32]));

        let ac = config.access_control();
        assert!(ac.has_role(Role::Admin, &Address::new([1; 32])));
        assert!(ac.has_role(Role::Admin, &Address::new([2; 32])));
        assert!(ac.has_role(Role::Matcher, &Address::new([3; 32])));
        assert!(ac.has_role(Role::Matcher, &Address::new([4; 32])));
    }

    #[test]
    fn test_invalid_limits_rejected() {
        let json = format!(
            r#"{{
                "identity": "{}",
                "admin": "{}",
                "collateral": "{}",
                "withdrawLimits": [{{"limit": 100, "userLimit": 1000, "timeWindow": 6}}]
            }}"#,
            hex_addr(0xee),
            hex_addr(1),
            hex_addr(5)
        );
        let result = LedgerConfig::from_json_str(&json);
        assert!(matches!(
            result,
            Err(ConfigError::Ledger(LedgerError::InvalidWithdrawLimit { index: 0, .. }))
        ));
    }

    #[test]
    fn test_bad_address_rejected() {
        let json = r#"{"identity": "0x1234", "admin": "0x1234", "collateral": "0x1234"}"#;
        assert!(matches!(
            LedgerConfig::from_json_str(json),
            Err(ConfigError::Malformed(_))
        ));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let json = format!(
            r#"{{"identity": "{}", "admin": "{}", "collateral": "{}", "paused": true}}"#,
            hex_addr(0xee),
            hex_addr(1),
            hex_addr(5)
        );
        assert!(matches!(
            LedgerConfig::from_json_str(&json),
            Err(ConfigError::Malformed(_))
        ));
    }

    #[test]
    fn test_zero_identity_rejected() {
        let mut config = minimal();
        config.identity = Address::ZERO;
        assert!(matches!(config.validate(), Err(ConfigError::Malformed(_))));
    }

    #[test]
    fn test_identity_cannot_be_matcher() {
        let mut config = minimal();
        config.matchers.push(Address::new([0xee; 32]));
        assert!(matches!(config.validate(), Err(ConfigError::Malformed(_))));
    }
}
