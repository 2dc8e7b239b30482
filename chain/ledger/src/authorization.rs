//! Withdrawal authorization
//!
//! Two modes, selected by ledger version:
//! - role-gated (V1/V2): the caller itself holds the matcher role
//! - signature-gated (V3): a matcher signs a [`WithdrawalPermit`] off-ledger
//!   and anyone may submit it
//!
//! A permit binds the ledger's own address and the signing matcher's address
//! into its digest, so a permit for one ledger or one matcher is useless for
//! another. Within a ledger, each permit digest is accepted once; the ledger
//! remembers it as a [`ConsumedPermit`] until its deadline has passed.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use types::ids::Address;
use types::numeric::{amount_serde, Amount};

use crate::errors::LedgerError;
use crate::security::{authorize, Action, RoleAuthority};

/// Domain tag prefixed to every permit digest (frozen)
pub const PERMIT_DOMAIN: &[u8] = b"collateral-ledger/withdraw-permit/v1";

/// `(deadline, digest)` of a permit that has been applied.
pub type ConsumedPermit = (u64, [u8; 32]);

/// Which authorization variant the ledger accepts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AuthorizationMode {
    #[default]
    RoleGated,
    SignatureGated,
}

/// Structured withdrawal request signed by a matcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalPermit {
    /// Ledger the permit is valid for
    pub ledger: Address,
    /// Signing matcher; its address is its Ed25519 verifying key
    pub matcher: Address,
    pub user: Address,
    #[serde(with = "amount_serde")]
    pub amount: Amount,
    /// Last unix second at which the permit is accepted
    pub deadline: u64,
    /// Matcher-chosen value making otherwise identical permits distinct
    pub nonce: u64,
}

impl WithdrawalPermit {
    /// Canonical byte layout: domain tag, then fixed-width big-endian fields.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(PERMIT_DOMAIN.len() + 32 * 3 + 16 + 8 + 8);
        bytes.extend_from_slice(PERMIT_DOMAIN);
        bytes.extend_from_slice(self.ledger.as_bytes());
        bytes.extend_from_slice(self.matcher.as_bytes());
        bytes.extend_from_slice(self.user.as_bytes());
        bytes.extend_from_slice(&self.amount.to_be_bytes());
        bytes.extend_from_slice(&self.deadline.to_be_bytes());
        bytes.extend_from_slice(&self.nonce.to_be_bytes());
        bytes
    }

    /// SHA-256 of the canonical bytes.
    pub fn digest(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.canonical_bytes());
        hasher.finalize().into()
    }

    /// Sign with the matcher's key.
    ///
    /// The permit's `matcher` field should be the key's verifying key;
    /// otherwise verification fails.
    pub fn sign(self, signing_key: &SigningKey) -> SignedWithdrawal {
        let signature = signing_key.sign(&self.digest());
        SignedWithdrawal {
            permit: self,
            signature: hex::encode(signature.to_bytes()),
        }
    }
}

/// Permit plus its Ed25519 signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedWithdrawal {
    pub permit: WithdrawalPermit,
    /// Hex-encoded 64-byte signature over `permit.digest()`
    pub signature: String,
}

/// How a withdrawal is authorized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WithdrawAuthorization {
    /// Direct call by a matcher. `request_id` is only echoed in the
    /// balance-change event for the caller's own bookkeeping.
    Matcher { caller: Address, request_id: u64 },
    /// Matcher-signed permit submitted by anyone.
    Signed(SignedWithdrawal),
}

/// Outcome of a successful authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Authorized {
    /// Reference carried by the balance-change event
    pub reference: u64,
    /// Permit to mark as consumed once the withdrawal commits
    pub permit: Option<ConsumedPermit>,
    /// Matcher on whose authority the withdrawal runs
    pub matcher: Address,
}

/// Request context the authorization is checked against.
#[derive(Debug, Clone, Copy)]
pub struct WithdrawContext<'a> {
    pub ledger: &'a Address,
    pub user: &'a Address,
    pub amount: Amount,
    pub now: u64,
}

/// Check `auth` against the active `mode`. Read-only.
pub fn verify_authorization<R: RoleAuthority + ?Sized>(
    auth: &WithdrawAuthorization,
    mode: AuthorizationMode,
    roles: &R,
    consumed: &BTreeSet<ConsumedPermit>,
    ctx: WithdrawContext<'_>,
) -> Result<Authorized, LedgerError> {
    match (mode, auth) {
        (AuthorizationMode::RoleGated, WithdrawAuthorization::Matcher { caller, request_id }) => {
            if !authorize(roles, caller, Action::WithdrawFor) {
                return Err(LedgerError::Unauthorized);
            }
            Ok(Authorized {
                reference: *request_id,
                permit: None,
                matcher: *caller,
            })
        }
        (AuthorizationMode::SignatureGated, WithdrawAuthorization::Signed(signed)) => {
            verify_signed(signed, roles, consumed, ctx)
        }
        _ => Err(LedgerError::Unauthorized),
    }
}

fn verify_signed<R: RoleAuthority + ?Sized>(
    signed: &SignedWithdrawal,
    roles: &R,
    consumed: &BTreeSet<ConsumedPermit>,
    ctx: WithdrawContext<'_>,
) -> Result<Authorized, LedgerError> {
    let permit = &signed.permit;

    if ctx.now > permit.deadline {
        return Err(LedgerError::AuthorizationExpired {
            deadline: permit.deadline,
            now: ctx.now,
        });
    }

    if permit.ledger != *ctx.ledger || permit.user != *ctx.user || permit.amount != ctx.amount {
        return Err(LedgerError::InvalidSignature);
    }

    let sig_bytes = hex::decode(&signed.signature).map_err(|_| LedgerError::InvalidSignature)?;
    let sig_bytes: [u8; 64] = sig_bytes
        .try_into()
        .map_err(|_| LedgerError::InvalidSignature)?;
    let signature = Signature::from_bytes(&sig_bytes);
    let verifying_key = VerifyingKey::from_bytes(permit.matcher.as_bytes())
        .map_err(|_| LedgerError::InvalidSignature)?;

    let digest = permit.digest();
    verifying_key
        .verify(&digest, &signature)
        .map_err(|_| LedgerError::InvalidSignature)?;

    if !authorize(roles, &permit.matcher, Action::SignWithdrawal) {
        return Err(LedgerError::InvalidSignature);
    }

    if consumed.contains(&(permit.deadline, digest)) {
        return Err(LedgerError::NonceReused {
            digest: hex::encode(digest),
        });
    }

    Ok(Authorized {
        reference: permit.nonce,
        permit: Some((permit.deadline, digest)),
        matcher: permit.matcher,
    })
}

/// Address of a matcher signing with `signing_key`.
pub fn matcher_address(signing_key: &SigningKey) -> Address {
    Address::new(signing_key.verifying_key().to_bytes())
}
