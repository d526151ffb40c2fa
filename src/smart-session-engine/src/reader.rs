//! Policy state reads.
//!
//! Batched reads never fail as a whole. Any element that fails, does not decode, or is reported
//! disabled degrades to the "no access" value for its token so stale or partial data is never
//! presented as active.

use std::collections::BTreeSet;

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::SolCall;
use serde::Serialize;
use smart_session_types::{ChainReader, ContractCall, ReadError, Token};
use tracing::{debug, warn};

use crate::{
    abi::{IERC20, ISmartSession, ISpendingLimitPolicy},
    compiler::PolicyCompiler,
    config::ChainContext,
    constants::{APPROVE_SELECTOR, TRANSFER_SELECTOR},
    errors::EngineError,
    ids,
    session::{PolicyKind, ValidatorBinding},
    utils::format_units,
};

/// Spend-limit policy state for one token. `limit` and `spent` are decimal strings; `balance`
/// is the remaining allowance in raw token units.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SpendLimitState {
    pub address: Address,
    pub limit: String,
    pub spent: String,
    pub balance: U256,
}

impl SpendLimitState {
    fn disabled(address: Address) -> Self {
        Self {
            address,
            limit: "0".to_string(),
            spent: "0".to_string(),
            balance: U256::ZERO,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SudoAccess {
    pub swap: bool,
    pub spend: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SudoAccessState {
    pub address: Address,
    pub permissions: SudoAccess,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PolicyEnabled {
    pub address: Address,
    pub enabled: bool,
}

/// Single-token view combining the account's token balance with its spend-limit allowance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendableTokenInfo {
    pub address: Address,
    pub decimals: u8,
    pub account_balance: String,
    pub limit: String,
    pub spent: String,
    pub balance: String,
}

/// A token the session can use. `holdings` and `usable` are raw token units.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DelegatedToken {
    pub address: Address,
    pub decimals: u8,
    pub holdings: U256,
    pub usable: U256,
}

/// Reads smart-session policy state for one chain through a [`ChainReader`].
pub struct PolicyStateReader<'a, R: ChainReader + ?Sized> {
    ctx: &'a ChainContext,
    reader: &'a R,
}

impl<'a, R: ChainReader + ?Sized> PolicyStateReader<'a, R> {
    pub fn new(ctx: &'a ChainContext, reader: &'a R) -> Self {
        Self { ctx, reader }
    }

    pub async fn read_spend_limit_state(
        &self,
        tokens: &[Token],
        account: Address,
        binding: &ValidatorBinding,
    ) -> Vec<SpendLimitState> {
        if tokens.is_empty() {
            return Vec::new();
        }
        let permission_id = self.permission_id(binding);
        let (policy_calls, enabled_calls) = tokens
            .iter()
            .map(|token| {
                let action_id = ids::action_id(token.address, TRANSFER_SELECTOR);
                (
                    self.policy_data_call(permission_id, action_id, token.address, account),
                    self.enabled_call(account, permission_id, action_id),
                )
            })
            .unzip::<_, _, Vec<_>, Vec<_>>();

        let (policy_results, enabled_results) = futures::join!(
            self.reader.multicall(&policy_calls),
            self.reader.multicall(&enabled_calls)
        );

        tokens
            .iter()
            .enumerate()
            .map(|(i, token)| {
                let policy = element(&policy_results, i).and_then(|out| {
                    ISpendingLimitPolicy::getPolicyDataCall::abi_decode_returns(out, true)
                        .map_err(|_| ReadError::MalformedReturn)
                });
                let enabled = element(&enabled_results, i).and_then(decode_bool);

                match (policy, enabled) {
                    (Ok(data), Ok(true)) => {
                        let (limit, spent) = (data.spendingLimit, data.alreadySpent);
                        SpendLimitState {
                            address: token.address,
                            limit: format_units(limit, token.decimals),
                            spent: format_units(spent, token.decimals),
                            balance: limit.saturating_sub(spent),
                        }
                    }
                    (Ok(_), Ok(false)) => {
                        debug!(token = %token.address, "spend-limit policy disabled");
                        SpendLimitState::disabled(token.address)
                    }
                    (policy, enabled) => {
                        warn!(
                            token = %token.address,
                            policy_err = ?policy.err(),
                            enabled_err = ?enabled.err(),
                            "spend-limit read degraded to default"
                        );
                        SpendLimitState::disabled(token.address)
                    }
                }
            })
            .collect()
    }

    /// Whether the spend-limit policy is enabled on each token's transfer action.
    pub async fn read_policy_enabled(
        &self,
        tokens: &[Token],
        account: Address,
        binding: &ValidatorBinding,
    ) -> Vec<PolicyEnabled> {
        if tokens.is_empty() {
            return Vec::new();
        }
        let permission_id = self.permission_id(binding);
        let calls: Vec<_> = tokens
            .iter()
            .map(|token| {
                let action_id = ids::action_id(token.address, TRANSFER_SELECTOR);
                self.enabled_call(account, permission_id, action_id)
            })
            .collect();
        let results = self.reader.multicall(&calls).await;

        tokens
            .iter()
            .enumerate()
            .map(|(i, token)| {
                let enabled = element(&results, i).and_then(decode_bool).unwrap_or_else(|err| {
                    warn!(token = %token.address, %err, "isActionPolicyEnabled degraded to false");
                    false
                });
                PolicyEnabled {
                    address: token.address,
                    enabled,
                }
            })
            .collect()
    }

    /// Sudo access per token, from one `getEnabledActions` read shared by every token.
    pub async fn read_sudo_access_state(
        &self,
        tokens: &[Token],
        account: Address,
        binding: &ValidatorBinding,
    ) -> Vec<SudoAccessState> {
        if tokens.is_empty() {
            return Vec::new();
        }
        let permission_id = self.permission_id(binding);
        let call = ISmartSession::getEnabledActionsCall {
            account,
            permissionId: permission_id,
        };
        let enabled: BTreeSet<B256> = match self
            .reader
            .call(&ContractCall::new(
                self.ctx.modules.smart_session,
                call.abi_encode(),
            ))
            .await
            .and_then(|out| {
                ISmartSession::getEnabledActionsCall::abi_decode_returns(&out, true)
                    .map_err(|_| ReadError::MalformedReturn)
            }) {
            Ok(ret) => ret._0.into_iter().collect(),
            Err(err) => {
                warn!(%account, %permission_id, %err, "getEnabledActions degraded to no access");
                BTreeSet::new()
            }
        };

        tokens
            .iter()
            .map(|token| SudoAccessState {
                address: token.address,
                permissions: SudoAccess {
                    swap: enabled.contains(&ids::action_id(token.address, APPROVE_SELECTOR)),
                    spend: enabled.contains(&ids::action_id(token.address, TRANSFER_SELECTOR)),
                },
            })
            .collect()
    }

    /// Single-token spend-limit query. Unlike the batched reads, failures propagate.
    pub async fn read_spendable_token_info(
        &self,
        token: Address,
        account: Address,
        binding: &ValidatorBinding,
    ) -> Result<SpendableTokenInfo, EngineError> {
        let balance_call = ContractCall::new(token, IERC20::balanceOfCall { account }.abi_encode());
        let decimals_call = ContractCall::new(token, IERC20::decimalsCall {}.abi_encode());
        let (balance_out, decimals_out) = futures::join!(
            self.reader.call(&balance_call),
            self.reader.call(&decimals_call)
        );
        let account_balance = IERC20::balanceOfCall::abi_decode_returns(
            &balance_out.map_err(EngineError::Read)?,
            true,
        )
        .map_err(|_| EngineError::Read(ReadError::MalformedReturn))?
        ._0;
        let decimals = IERC20::decimalsCall::abi_decode_returns(
            &decimals_out.map_err(EngineError::Read)?,
            true,
        )
        .map_err(|_| EngineError::Read(ReadError::MalformedReturn))?
        ._0;

        let permission_id = self.permission_id(binding);
        let action_id = ids::action_id(token, TRANSFER_SELECTOR);
        let out = self
            .reader
            .call(&self.policy_data_call(permission_id, action_id, token, account))
            .await
            .map_err(EngineError::Read)?;
        let data = ISpendingLimitPolicy::getPolicyDataCall::abi_decode_returns(&out, true)
            .map_err(|_| EngineError::Read(ReadError::MalformedReturn))?;

        Ok(SpendableTokenInfo {
            address: token,
            decimals,
            account_balance: format_units(account_balance, decimals),
            limit: format_units(data.spendingLimit, decimals),
            spent: format_units(data.alreadySpent, decimals),
            balance: format_units(data.spendingLimit.saturating_sub(data.alreadySpent), decimals),
        })
    }

    /// Tokens the session can currently use, with the amount it can move.
    ///
    /// Spend-limit grants cap `usable` at the smaller of the remaining allowance and the
    /// account's holdings; sudo grants may move the full holdings of tokens with swap or spend
    /// access. Tokens with nothing usable are dropped, as is the zero address (native currency).
    /// A failed `balanceOf` counts as zero holdings.
    pub async fn delegated_tokens(
        &self,
        tokens: &[Token],
        account: Address,
        kind: PolicyKind,
        binding: &ValidatorBinding,
    ) -> Vec<DelegatedToken> {
        let tokens: Vec<Token> = tokens
            .iter()
            .filter(|token| !token.address.is_zero())
            .cloned()
            .collect();
        if tokens.is_empty() {
            return Vec::new();
        }

        let balance_calls: Vec<_> = tokens
            .iter()
            .map(|token| {
                ContractCall::new(token.address, IERC20::balanceOfCall { account }.abi_encode())
            })
            .collect();
        let (balances, caps) = futures::join!(
            self.reader.multicall(&balance_calls),
            self.usable_caps(&tokens, account, kind, binding)
        );

        tokens
            .into_iter()
            .zip(caps)
            .enumerate()
            .filter_map(|(i, (token, cap))| {
                let holdings = element(&balances, i)
                    .and_then(|out| {
                        IERC20::balanceOfCall::abi_decode_returns(out, true)
                            .map(|ret| ret._0)
                            .map_err(|_| ReadError::MalformedReturn)
                    })
                    .unwrap_or_else(|err| {
                        warn!(token = %token.address, %err, "balanceOf degraded to zero");
                        U256::ZERO
                    });
                let usable = cap.map_or(holdings, |cap| cap.min(holdings));
                (!usable.is_zero()).then_some(DelegatedToken {
                    address: token.address,
                    decimals: token.decimals,
                    holdings,
                    usable,
                })
            })
            .collect()
    }

    /// Per-token ceiling on what the session may move. `None` means only holdings bound it.
    async fn usable_caps(
        &self,
        tokens: &[Token],
        account: Address,
        kind: PolicyKind,
        binding: &ValidatorBinding,
    ) -> Vec<Option<U256>> {
        match kind {
            PolicyKind::SpendLimit => self
                .read_spend_limit_state(tokens, account, binding)
                .await
                .into_iter()
                .map(|state| Some(state.balance))
                .collect(),
            PolicyKind::Sudo => self
                .read_sudo_access_state(tokens, account, binding)
                .await
                .into_iter()
                .map(|state| {
                    let access = state.permissions.swap || state.permissions.spend;
                    (!access).then_some(U256::ZERO)
                })
                .collect(),
        }
    }

    fn permission_id(&self, binding: &ValidatorBinding) -> B256 {
        PolicyCompiler::new(self.ctx)
            .use_session(binding)
            .permission_id()
    }

    fn policy_data_call(
        &self,
        permission_id: B256,
        action_id: B256,
        token: Address,
        account: Address,
    ) -> ContractCall {
        let call = ISpendingLimitPolicy::getPolicyDataCall {
            id: ids::config_id(account, permission_id, action_id),
            multiplexer: self.ctx.modules.smart_session,
            token,
            userOpSender: account,
        };
        ContractCall::new(self.ctx.modules.spend_limit_policy, call.abi_encode())
    }

    fn enabled_call(&self, account: Address, permission_id: B256, action_id: B256) -> ContractCall {
        let call = ISmartSession::isActionPolicyEnabledCall {
            account,
            permissionId: permission_id,
            actionId: action_id,
            policy: self.ctx.modules.spend_limit_policy,
        };
        ContractCall::new(self.ctx.modules.smart_session, call.abi_encode())
    }
}

/// Batch element `i`; a short batch counts as a failed element.
fn element(results: &[Result<Bytes, ReadError>], i: usize) -> Result<&Bytes, ReadError> {
    match results.get(i) {
        Some(Ok(out)) => Ok(out),
        Some(Err(err)) => Err(err.clone()),
        None => Err(ReadError::MalformedReturn),
    }
}

fn decode_bool(out: &Bytes) -> Result<bool, ReadError> {
    ISmartSession::isActionPolicyEnabledCall::abi_decode_returns(out, true)
        .map(|ret| ret._0)
        .map_err(|_| ReadError::MalformedReturn)
}
