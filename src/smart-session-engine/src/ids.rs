//! Identifier derivation for smart-session storage keys.
//!
//! Every function here is pure; byte layouts match the on-chain module, since these values are
//! storage keys rather than local handles.

use alloy_primitives::{keccak256, Address, FixedBytes, B256, U256};
use alloy_sol_types::SolValue;

use crate::session::Session;

/// ActionId = keccak256(target || selector), 24 bytes packed.
pub fn action_id(target: Address, selector: FixedBytes<4>) -> B256 {
    let mut buf = Vec::with_capacity(20 + 4);
    buf.extend_from_slice(target.as_slice());
    buf.extend_from_slice(selector.as_slice());
    keccak256(buf)
}

/// PermissionId = keccak256(abi.encode(sessionValidator, sessionValidatorInitData, salt)).
///
/// Policies and actions do not participate: the module keys a permission by its validator
/// binding, so a session enabled with actions and the zero-action shape used for management
/// calls resolve to the same id.
pub fn permission_id(session: &Session) -> B256 {
    let encoded = (
        session.session_validator,
        session.session_validator_init_data.clone(),
        session.salt,
    )
        .abi_encode_params();
    keccak256(encoded)
}

/// ActionPolicyId = keccak256(permissionId || actionId).
pub fn action_policy_id(permission_id: B256, action_id: B256) -> B256 {
    let mut buf = Vec::with_capacity(32 + 32);
    buf.extend_from_slice(permission_id.as_slice());
    buf.extend_from_slice(action_id.as_slice());
    keccak256(buf)
}

/// ConfigId = keccak256(account || actionPolicyId).
///
/// Policy configuration is scoped by both the account and the action policy.
pub fn config_id(account: Address, permission_id: B256, action_id: B256) -> B256 {
    let action_policy_id = action_policy_id(permission_id, action_id);
    let mut buf = Vec::with_capacity(20 + 32);
    buf.extend_from_slice(account.as_slice());
    buf.extend_from_slice(action_policy_id.as_slice());
    keccak256(buf)
}

/// Hash over every session field: the ABI-encoded struct followed by the 32-byte chain id.
pub fn session_fingerprint(session: &Session) -> B256 {
    let mut buf = session.to_abi().abi_encode();
    buf.extend_from_slice(&U256::from(session.chain_id).to_be_bytes::<32>());
    keccak256(buf)
}
