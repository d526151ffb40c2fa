//! Session values and the caller-facing intent types that compile into them.

use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

use crate::{
    abi::{self, ActionData, PolicyData},
    constants::DEFAULT_SALT,
    errors::EngineError,
    ids,
};

/// The validator a session is bound to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorBinding {
    pub address: Address,
    pub init_data: Bytes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<B256>,
}

impl ValidatorBinding {
    pub fn new(address: Address, init_data: impl Into<Bytes>) -> Self {
        Self {
            address,
            init_data: init_data.into(),
            salt: None,
        }
    }

    pub fn with_salt(mut self, salt: B256) -> Self {
        self.salt = Some(salt);
        self
    }

    pub fn salt_or_default(&self) -> B256 {
        self.salt.unwrap_or(DEFAULT_SALT)
    }
}

/// A compiled session, scoped to one chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub session_validator: Address,
    pub session_validator_init_data: Bytes,
    pub salt: B256,
    pub user_op_policies: Vec<PolicyData>,
    pub actions: Vec<ActionData>,
    pub permit_erc4337_paymaster: bool,
    pub chain_id: u64,
}

impl Session {
    /// On-chain struct passed to `enableSessions`. ERC-7739 policies are always empty here.
    pub fn to_abi(&self) -> abi::Session {
        abi::Session {
            sessionValidator: self.session_validator,
            sessionValidatorInitData: self.session_validator_init_data.clone(),
            salt: self.salt,
            userOpPolicies: self.user_op_policies.clone(),
            erc7739Policies: abi::ERC7739Data {
                allowedERC7739Content: Vec::new(),
                erc1271Policies: Vec::new(),
            },
            actions: self.actions.clone(),
            permitERC4337Paymaster: self.permit_erc4337_paymaster,
        }
    }

    pub fn permission_id(&self) -> B256 {
        ids::permission_id(self)
    }

    pub fn fingerprint(&self) -> B256 {
        ids::session_fingerprint(self)
    }
}

/// The two policy families a session grant can use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyKind {
    #[serde(rename = "spendlimit")]
    SpendLimit,
    #[serde(rename = "sudo")]
    Sudo,
}

impl core::str::FromStr for PolicyKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "spendlimit" => Ok(PolicyKind::SpendLimit),
            "sudo" => Ok(PolicyKind::Sudo),
            other => Err(EngineError::UnknownPolicyKind(other.to_string())),
        }
    }
}

impl core::fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PolicyKind::SpendLimit => f.write_str("spendlimit"),
            PolicyKind::Sudo => f.write_str("sudo"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenLimit {
    pub token: Address,
    pub amount: U256,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAccess {
    pub address: Address,
    pub is_transfer_enabled: bool,
    pub is_swap_enabled: bool,
}

/// A session grant request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy")]
pub enum PolicyParams {
    #[serde(rename = "spendlimit", rename_all = "camelCase")]
    SpendLimit { token_limits: Vec<TokenLimit> },
    #[serde(rename = "sudo", rename_all = "camelCase")]
    Sudo { token_access: Vec<TokenAccess> },
}

impl PolicyParams {
    pub fn kind(&self) -> PolicyKind {
        match self {
            PolicyParams::SpendLimit { .. } => PolicyKind::SpendLimit,
            PolicyParams::Sudo { .. } => PolicyKind::Sudo,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpendLimitValue {
    pub limit: U256,
}

/// New cap for one token. A zero limit disables the token's spend-limit policy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpendLimitUpdate {
    pub address: Address,
    pub spendlimit: SpendLimitValue,
}

impl SpendLimitUpdate {
    pub fn new(address: Address, limit: U256) -> Self {
        Self {
            address,
            spendlimit: SpendLimitValue { limit },
        }
    }

    pub fn disables(&self) -> bool {
        self.spendlimit.limit.is_zero()
    }

    pub fn enables(&self) -> bool {
        !self.disables()
    }
}

/// Per-flag change; `None` leaves that permission untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SudoPermissionChange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swap: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spend: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SudoUpdate {
    pub address: Address,
    #[serde(default)]
    pub permissions: SudoPermissionChange,
}

impl SudoUpdate {
    pub fn new(address: Address, swap: Option<bool>, spend: Option<bool>) -> Self {
        Self {
            address,
            permissions: SudoPermissionChange { swap, spend },
        }
    }
}

/// A delta against an existing session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum UpdateActionParams {
    #[serde(rename = "spendlimit")]
    SpendLimit { updates: Vec<SpendLimitUpdate> },
    #[serde(rename = "sudo")]
    Sudo { updates: Vec<SudoUpdate> },
}

impl UpdateActionParams {
    pub fn kind(&self) -> PolicyKind {
        match self {
            UpdateActionParams::SpendLimit { .. } => PolicyKind::SpendLimit,
            UpdateActionParams::Sudo { .. } => PolicyKind::Sudo,
        }
    }
}
