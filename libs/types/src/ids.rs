//! Principal identifiers
//!
//! Every party the ledger deals with (depositors, matchers, the ledger
//! itself) is identified by a 32-byte `Address`. Matcher addresses are the
//! bytes of the matcher's Ed25519 verifying key, so a signed request can be
//! checked against the identity it claims.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ParseError;

/// A 32-byte principal identity.
///
/// Text form is `0x` followed by 64 lowercase hex digits. Parsing accepts the
/// prefix as optional and hex digits in either case.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address([u8; 32]);

impl Address {
    /// The all-zero address. Never a valid user or matcher.
    pub const ZERO: Address = Address([0u8; 32]);

    /// Create from raw bytes
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert into raw bytes
    pub fn to_bytes(self) -> [u8; 32] {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Hex form with `0x` prefix
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl From<[u8; 32]> for Address {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl FromStr for Address {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let invalid = || ParseError::InvalidAddress {
            value: s.to_string(),
        };
        let bytes = hex::decode(digits).map_err(|_| invalid())?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|_| invalid())?;
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for Address {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_hex()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_display_is_prefixed_hex() {
        let addr = Address::new([0xab; 32]);
        let text = addr.to_string();
        assert!(text.starts_with("0xabab"));
        assert_eq!(text.len(), 66);
    }

    #[test]
    fn test_address_parse_with_and_without_prefix() {
        let addr = Address::new([7u8; 32]);
        let with_prefix: Address = addr.to_hex().parse().unwrap();
        let without_prefix: Address = hex::encode([7u8; 32]).parse().unwrap();
        assert_eq!(with_prefix, addr);
        assert_eq!(without_prefix, addr);
    }

    #[test]
    fn test_address_parse_uppercase() {
        let parsed: Address = format!("0x{}", "AB".repeat(32)).parse().unwrap();
        assert_eq!(parsed, Address::new([0xab; 32]));
    }

    #[test]
    fn test_address_parse_wrong_length() {
        let result: Result<Address, _> = "0xabcd".parse();
        assert!(matches!(result, Err(ParseError::InvalidAddress { .. })));
    }

    #[test]
    fn test_address_parse_not_hex() {
        let result: Result<Address, _> = format!("0x{}", "zz".repeat(32)).parse();
        assert!(matches!(result, Err(ParseError::InvalidAddress { .. })));
    }

    #[test]
    fn test_address_serialization() {
        let addr = Address::new([1u8; 32]);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"0x{}\"", "01".repeat(32)));

        let deserialized: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(addr, deserialized);
    }

    #[test]
    fn test_address_as_map_key() {
        use std::collections::BTreeMap;

        let mut map = BTreeMap::new();
        map.insert(Address::new([2u8; 32]), 10u64);
        let json = serde_json::to_string(&map).unwrap();
        let back: BTreeMap<Address, u64> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn test_zero_address() {
        assert!(Address::ZERO.is_zero());
        assert!(!Address::new([1u8; 32]).is_zero());
    }
}
