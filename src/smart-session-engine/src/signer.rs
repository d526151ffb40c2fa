//! Validator signers.
//!
//! A closed set of signing capabilities, one per validator kind. Each exposes exactly `sign` over
//! a 32-byte digest and a `stub_signature` for gas estimation.

use std::{fmt, sync::Arc};

use alloy_primitives::{eip191_hash_message, keccak256, Address, Bytes, B256};
use k256::ecdsa::SigningKey;
use serde::{Deserialize, Serialize};

use crate::{
    config::ChainContext,
    constants::{OWNABLE_MOCK_SIGNATURE, SMART_SESSION_MODE_USE},
    errors::{EngineError, SignerError},
};

/// Validator families a delegated account can be configured with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidatorKind {
    Ownable,
    Passkey,
}

/// Session validator contract for a validator kind.
pub fn session_validator_for(
    ctx: &ChainContext,
    kind: ValidatorKind,
) -> Result<Address, EngineError> {
    match kind {
        ValidatorKind::Ownable => Ok(ctx.modules.ownable_validator),
        ValidatorKind::Passkey => ctx.webauthn_session_validator(),
    }
}

/// External WebAuthn authenticator. The signature scheme itself lives outside this crate.
pub trait PasskeyAuthenticator: Send + Sync {
    /// Validator init data registering this credential.
    fn enable_data(&self) -> Bytes;

    fn sign(&self, digest: B256) -> Result<Bytes, SignerError>;

    fn stub_signature(&self) -> Bytes;
}

/// secp256k1 key behind the ownable validator.
#[derive(Clone)]
pub struct OwnableKeySigner {
    key: SigningKey,
    address: Address,
}

impl OwnableKeySigner {
    pub fn from_slice(secret: &[u8]) -> Result<Self, SignerError> {
        let key = SigningKey::from_slice(secret).map_err(|_| SignerError::InvalidKey)?;
        let address = key_address(&key);
        Ok(Self { key, address })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// 65-byte `r || s || v`, `v` in {27, 28}, over the EIP-191 personal-message hash of
    /// `digest`. The ownable validator recovers against that prefixed hash.
    pub fn sign(&self, digest: B256) -> Result<Bytes, SignerError> {
        let prehash = eip191_hash_message(digest);
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(prehash.as_slice())
            .map_err(|e| SignerError::Signing(e.to_string()))?;

        let mut out = Vec::with_capacity(65);
        out.extend_from_slice(&signature.to_bytes());
        out.push(27 + recovery_id.to_byte());
        Ok(out.into())
    }

    pub fn stub_signature(&self) -> Bytes {
        Bytes::from_static(&OWNABLE_MOCK_SIGNATURE)
    }
}

impl fmt::Debug for OwnableKeySigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnableKeySigner")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

fn key_address(key: &SigningKey) -> Address {
    let point = key.verifying_key().to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}

/// Signing capability, dispatched per validator kind.
#[derive(Clone)]
pub enum ValidatorSigner {
    Ownable(OwnableKeySigner),
    Passkey(Arc<dyn PasskeyAuthenticator>),
    /// Signs as an enabled smart session: `mode || permissionId || inner signature`.
    Session {
        permission_id: B256,
        inner: Box<ValidatorSigner>,
    },
}

impl ValidatorSigner {
    pub fn session(permission_id: B256, inner: ValidatorSigner) -> Self {
        ValidatorSigner::Session {
            permission_id,
            inner: Box::new(inner),
        }
    }

    pub fn kind(&self) -> ValidatorKind {
        match self {
            ValidatorSigner::Ownable(_) => ValidatorKind::Ownable,
            ValidatorSigner::Passkey(_) => ValidatorKind::Passkey,
            ValidatorSigner::Session { inner, .. } => inner.kind(),
        }
    }

    pub fn sign(&self, digest: B256) -> Result<Bytes, SignerError> {
        match self {
            ValidatorSigner::Ownable(key) => key.sign(digest),
            ValidatorSigner::Passkey(authenticator) => authenticator.sign(digest),
            ValidatorSigner::Session {
                permission_id,
                inner,
            } => Ok(use_mode_signature(*permission_id, &inner.sign(digest)?)),
        }
    }

    pub fn stub_signature(&self) -> Bytes {
        match self {
            ValidatorSigner::Ownable(key) => key.stub_signature(),
            ValidatorSigner::Passkey(authenticator) => authenticator.stub_signature(),
            ValidatorSigner::Session {
                permission_id,
                inner,
            } => use_mode_signature(*permission_id, &inner.stub_signature()),
        }
    }
}

impl fmt::Debug for ValidatorSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidatorSigner::Ownable(key) => f.debug_tuple("Ownable").field(key).finish(),
            ValidatorSigner::Passkey(_) => f.write_str("Passkey(..)"),
            ValidatorSigner::Session {
                permission_id,
                inner,
            } => f
                .debug_struct("Session")
                .field("permission_id", permission_id)
                .field("inner", inner)
                .finish(),
        }
    }
}

fn use_mode_signature(permission_id: B256, signature: &[u8]) -> Bytes {
    let mut out = Vec::with_capacity(1 + 32 + signature.len());
    out.push(SMART_SESSION_MODE_USE);
    out.extend_from_slice(permission_id.as_slice());
    out.extend_from_slice(signature);
    out.into()
}
