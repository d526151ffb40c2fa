//! Compile session grants into `Session` values.

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::SolValue;
use tracing::debug;

use crate::{
    abi::{ActionData, PolicyData},
    config::ChainContext,
    constants::{
        APPROVE_SELECTOR, EXEC_SELECTOR, GENERIC_EXECUTOR_ADDRESS, SMART_SESSION_MODE_USE,
        TRANSFER_SELECTOR,
    },
    errors::EngineError,
    session::{PolicyParams, Session, TokenAccess, TokenLimit, ValidatorBinding},
    signer::ValidatorSigner,
};

/// Descriptor a session signer needs to operate an enabled session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UseSession {
    pub mode: u8,
    pub permission_id: B256,
    pub signature: Bytes,
}

/// Turns grant requests into sessions for one chain.
#[derive(Clone, Copy, Debug)]
pub struct PolicyCompiler<'a> {
    ctx: &'a ChainContext,
}

impl<'a> PolicyCompiler<'a> {
    pub fn new(ctx: &'a ChainContext) -> Self {
        Self { ctx }
    }

    pub fn compile(
        &self,
        params: &PolicyParams,
        binding: &ValidatorBinding,
    ) -> Result<Session, EngineError> {
        match params {
            PolicyParams::SpendLimit { token_limits } => {
                self.compile_spend_limit(token_limits, binding)
            }
            PolicyParams::Sudo { token_access } => Ok(self.compile_sudo(token_access, binding)),
        }
    }

    /// One transfer action per token, each gated by its own spend-limit policy.
    ///
    /// No user-op policies: authorisation is scoped purely at the action level.
    pub fn compile_spend_limit(
        &self,
        token_limits: &[TokenLimit],
        binding: &ValidatorBinding,
    ) -> Result<Session, EngineError> {
        if token_limits.is_empty() {
            return Err(EngineError::EmptyTokenList("spendlimit"));
        }
        let actions = token_limits
            .iter()
            .map(|limit| ActionData {
                actionTargetSelector: TRANSFER_SELECTOR,
                actionTarget: limit.token,
                actionPolicies: vec![self.spend_limit_policy(limit.token, limit.amount)],
            })
            .collect();
        let session = self.session(binding, Vec::new(), actions);
        debug!(
            permission_id = %session.permission_id(),
            fingerprint = %session.fingerprint(),
            tokens = token_limits.len(),
            "compiled spend-limit session"
        );
        Ok(session)
    }

    /// Executor access plus per-token approve/transfer access, all under sudo.
    pub fn compile_sudo(&self, token_access: &[TokenAccess], binding: &ValidatorBinding) -> Session {
        let mut actions = vec![ActionData {
            actionTargetSelector: EXEC_SELECTOR,
            actionTarget: GENERIC_EXECUTOR_ADDRESS,
            actionPolicies: vec![self.sudo_policy()],
        }];
        for access in token_access {
            if access.is_swap_enabled {
                actions.push(self.sudo_action(access.address, true));
            }
            if access.is_transfer_enabled {
                actions.push(self.sudo_action(access.address, false));
            }
        }
        let session = self.session(binding, vec![self.sudo_policy()], actions);
        debug!(
            permission_id = %session.permission_id(),
            fingerprint = %session.fingerprint(),
            actions = session.actions.len(),
            "compiled sudo session"
        );
        session
    }

    /// Session shape used when operating an enabled session: no policies, no actions.
    pub fn use_session(&self, binding: &ValidatorBinding) -> Session {
        self.session(binding, Vec::new(), Vec::new())
    }

    pub fn use_descriptor(&self, binding: &ValidatorBinding) -> UseSession {
        UseSession {
            mode: SMART_SESSION_MODE_USE,
            permission_id: self.use_session(binding).permission_id(),
            signature: Bytes::new(),
        }
    }

    /// Zero-action session with a sudo user-op policy, used to address an existing permission.
    pub fn management_session(&self, binding: &ValidatorBinding) -> Session {
        self.session(binding, vec![self.sudo_policy()], Vec::new())
    }

    /// Validator binding for a signer, dispatched on its kind.
    pub fn binding_for(
        &self,
        signer: &ValidatorSigner,
        salt: Option<B256>,
    ) -> Result<ValidatorBinding, EngineError> {
        let binding = match signer {
            ValidatorSigner::Ownable(key) => ownable_binding(
                self.ctx.modules.ownable_validator,
                &[key.address()],
            ),
            ValidatorSigner::Passkey(authenticator) => ValidatorBinding::new(
                self.ctx.webauthn_session_validator()?,
                authenticator.enable_data(),
            ),
            ValidatorSigner::Session { inner, .. } => return self.binding_for(inner, salt),
        };
        Ok(match salt {
            Some(salt) => binding.with_salt(salt),
            None => binding,
        })
    }

    pub(crate) fn sudo_policy(&self) -> PolicyData {
        PolicyData {
            policy: self.ctx.modules.sudo_policy,
            initData: Bytes::new(),
        }
    }

    /// Spend-limit policy for one token: `abi.encode(address[] tokens, uint256[] limits)`.
    pub(crate) fn spend_limit_policy(&self, token: Address, limit: U256) -> PolicyData {
        PolicyData {
            policy: self.ctx.modules.spend_limit_policy,
            initData: (vec![token], vec![limit]).abi_encode_params().into(),
        }
    }

    /// Sudo-gated approve (`swap`) or transfer action on `token`.
    pub(crate) fn sudo_action(&self, token: Address, swap: bool) -> ActionData {
        ActionData {
            actionTargetSelector: if swap { APPROVE_SELECTOR } else { TRANSFER_SELECTOR },
            actionTarget: token,
            actionPolicies: vec![self.sudo_policy()],
        }
    }

    fn session(
        &self,
        binding: &ValidatorBinding,
        user_op_policies: Vec<PolicyData>,
        actions: Vec<ActionData>,
    ) -> Session {
        Session {
            session_validator: binding.address,
            session_validator_init_data: binding.init_data.clone(),
            salt: binding.salt_or_default(),
            user_op_policies,
            actions,
            permit_erc4337_paymaster: true,
            chain_id: self.ctx.chain_id,
        }
    }
}

/// Ownable-validator binding: `abi.encode(uint256 threshold, address[] owners)`, threshold 1.
///
/// Owners are sorted ascending, as the validator stores them in a sorted linked list.
pub fn ownable_binding(validator: Address, owners: &[Address]) -> ValidatorBinding {
    let mut owners = owners.to_vec();
    owners.sort();
    let init_data = (U256::from(1u64), owners).abi_encode_params();
    ValidatorBinding::new(validator, init_data)
}
