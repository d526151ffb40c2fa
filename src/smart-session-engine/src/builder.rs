//! Transaction builders for enabling, updating, and removing sessions.
//!
//! Builders never submit anything. When a session is enabled on a fresh account the caller runs
//! the install step before the enable step; `build_enable_session_steps` returns them in order.

use alloy_primitives::{Address, B256};
use alloy_sol_types::SolCall;
use smart_session_types::{ChainReader, ModuleType, Transaction};
use tracing::debug;

use crate::{
    abi::{ActionData, ISmartSession},
    compiler::PolicyCompiler,
    config::ChainContext,
    constants::{APPROVE_SELECTOR, TRANSFER_SELECTOR},
    errors::EngineError,
    ids, modules,
    reader::SudoAccessState,
    session::{
        PolicyParams, SpendLimitUpdate, SudoUpdate, TokenAccess, UpdateActionParams,
        ValidatorBinding,
    },
};

/// Builds smart-session module calls for one chain.
#[derive(Clone, Copy, Debug)]
pub struct SessionTxBuilder<'a> {
    ctx: &'a ChainContext,
    compiler: PolicyCompiler<'a>,
}

impl<'a> SessionTxBuilder<'a> {
    pub fn new(ctx: &'a ChainContext) -> Self {
        Self {
            ctx,
            compiler: PolicyCompiler::new(ctx),
        }
    }

    pub fn compiler(&self) -> &PolicyCompiler<'a> {
        &self.compiler
    }

    /// `None` when the smart-session module is already installed as a validator.
    pub async fn build_install_session_module<R: ChainReader + ?Sized>(
        &self,
        reader: &R,
        account: Address,
    ) -> Option<Transaction> {
        let smart_session = self.ctx.modules.smart_session;
        if modules::is_installed(reader, account, smart_session, ModuleType::Validator).await {
            debug!(%account, "smart-session module already installed");
            return None;
        }
        Some(modules::build_install_module(
            account,
            smart_session,
            ModuleType::Validator,
            Default::default(),
        ))
    }

    pub fn build_enable_session(
        &self,
        params: &PolicyParams,
        binding: &ValidatorBinding,
    ) -> Result<Transaction, EngineError> {
        let session = self.compiler.compile(params, binding)?;
        let call = ISmartSession::enableSessionsCall {
            sessions: vec![session.to_abi()],
        };
        debug!(
            permission_id = %session.permission_id(),
            policy = %params.kind(),
            "built enableSessions"
        );
        Ok(self.session_call(call.abi_encode()))
    }

    /// Install (when needed) followed by enable.
    pub async fn build_enable_session_steps<R: ChainReader + ?Sized>(
        &self,
        reader: &R,
        account: Address,
        params: &PolicyParams,
        binding: &ValidatorBinding,
    ) -> Result<Vec<Transaction>, EngineError> {
        // Compile first so a malformed request never yields a lone install step.
        let enable = self.build_enable_session(params, binding)?;
        let mut steps = Vec::with_capacity(2);
        if let Some(install) = self.build_install_session_module(reader, account).await {
            steps.push(install);
        }
        steps.push(enable);
        Ok(steps)
    }

    pub fn build_remove_session(&self, binding: &ValidatorBinding) -> Transaction {
        let permission_id = self.management_permission_id(binding);
        debug!(%permission_id, "built removeSession");
        let call = ISmartSession::removeSessionCall {
            permissionId: permission_id,
        };
        self.session_call(call.abi_encode())
    }

    /// One `disableActionPolicies` per (token, selector) pair being switched off.
    pub fn build_disable_action_policies(
        &self,
        params: &UpdateActionParams,
        binding: &ValidatorBinding,
    ) -> Vec<Transaction> {
        let permission_id = self.management_permission_id(binding);
        let spend_limit_policy = self.ctx.modules.spend_limit_policy;
        let sudo_policy = self.ctx.modules.sudo_policy;

        let mut pairs = Vec::new();
        match params {
            UpdateActionParams::SpendLimit { updates } => {
                for update in updates.iter().filter(|u| u.disables()) {
                    pairs.push((update.address, TRANSFER_SELECTOR, spend_limit_policy));
                }
            }
            UpdateActionParams::Sudo { updates } => {
                for update in updates {
                    if update.permissions.spend == Some(false) {
                        pairs.push((update.address, TRANSFER_SELECTOR, sudo_policy));
                    }
                    if update.permissions.swap == Some(false) {
                        pairs.push((update.address, APPROVE_SELECTOR, sudo_policy));
                    }
                }
            }
        }

        pairs
            .into_iter()
            .map(|(target, selector, policy)| {
                let call = ISmartSession::disableActionPoliciesCall {
                    permissionId: permission_id,
                    actionId: ids::action_id(target, selector),
                    policies: vec![policy],
                };
                debug!(%target, %selector, "built disableActionPolicies");
                self.session_call(call.abi_encode())
            })
            .collect()
    }

    /// Spend-limit: one `enableActionPolicies` per token, each with its own cap.
    /// Sudo: every enabled pair coalesced into a single `enableActionPolicies`.
    pub fn build_enable_action_policies(
        &self,
        params: &UpdateActionParams,
        binding: &ValidatorBinding,
    ) -> Vec<Transaction> {
        let permission_id = self.management_permission_id(binding);
        match params {
            UpdateActionParams::SpendLimit { updates } => updates
                .iter()
                .filter(|u| u.enables())
                .map(|update| {
                    let action = self.spend_limit_action(update);
                    self.enable_action_policies(permission_id, vec![action])
                })
                .collect(),
            UpdateActionParams::Sudo { updates } => {
                let actions = self.sudo_enable_actions(updates);
                if actions.is_empty() {
                    return Vec::new();
                }
                vec![self.enable_action_policies(permission_id, actions)]
            }
        }
    }

    /// Minimal sudo delta moving `current` on-chain access to `desired`.
    ///
    /// Tokens missing from `current` are treated as having no access.
    pub fn plan_sudo_updates(
        &self,
        current: &[SudoAccessState],
        desired: &[TokenAccess],
    ) -> UpdateActionParams {
        let updates = desired
            .iter()
            .filter_map(|want| {
                let have = current
                    .iter()
                    .find(|state| state.address == want.address)
                    .map(|state| state.permissions)
                    .unwrap_or_default();
                let spend = (have.spend != want.is_transfer_enabled).then_some(want.is_transfer_enabled);
                let swap = (have.swap != want.is_swap_enabled).then_some(want.is_swap_enabled);
                (spend.is_some() || swap.is_some())
                    .then(|| SudoUpdate::new(want.address, swap, spend))
            })
            .collect();
        UpdateActionParams::Sudo { updates }
    }

    fn sudo_enable_actions(&self, updates: &[SudoUpdate]) -> Vec<ActionData> {
        let mut actions = Vec::new();
        for update in updates {
            if update.permissions.spend == Some(true) {
                actions.push(self.compiler.sudo_action(update.address, false));
            }
            if update.permissions.swap == Some(true) {
                actions.push(self.compiler.sudo_action(update.address, true));
            }
        }
        actions
    }

    fn spend_limit_action(&self, update: &SpendLimitUpdate) -> ActionData {
        ActionData {
            actionTargetSelector: TRANSFER_SELECTOR,
            actionTarget: update.address,
            actionPolicies: vec![self
                .compiler
                .spend_limit_policy(update.address, update.spendlimit.limit)],
        }
    }

    fn enable_action_policies(&self, permission_id: B256, actions: Vec<ActionData>) -> Transaction {
        debug!(%permission_id, actions = actions.len(), "built enableActionPolicies");
        let call = ISmartSession::enableActionPoliciesCall {
            permissionId: permission_id,
            actionPolicies: actions,
        };
        self.session_call(call.abi_encode())
    }

    fn management_permission_id(&self, binding: &ValidatorBinding) -> B256 {
        self.compiler.management_session(binding).permission_id()
    }

    fn session_call(&self, data: Vec<u8>) -> Transaction {
        Transaction::call(self.ctx.modules.smart_session, data)
    }
}
