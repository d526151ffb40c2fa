#[cfg(test)]
mod tests {
    use alloy_primitives::{address, b256, Address, Bytes, B256, U256};
    use alloy_sol_types::{SolCall, SolValue};
    use smart_session_types::{ContractCall, ModuleType};

    use crate::abi::{IERC7579Account, ISmartSession};
    use crate::builder::SessionTxBuilder;
    use crate::compiler::{ownable_binding, PolicyCompiler};
    use crate::config::{AddressBook, ChainContext};
    use crate::constants::{
        APPROVE_SELECTOR, EXEC_SELECTOR, GENERIC_EXECUTOR_ADDRESS, SENTINEL_ADDRESS,
        TRANSFER_SELECTOR,
    };
    use crate::errors::EngineError;
    use crate::ids;
    use crate::mock::MockChainReader;
    use crate::modules;
    use crate::reader::{SudoAccess, SudoAccessState};
    use crate::session::{
        PolicyParams, SpendLimitUpdate, SudoUpdate, TokenAccess, TokenLimit, UpdateActionParams,
        ValidatorBinding,
    };
    use crate::signer::{OwnableKeySigner, ValidatorSigner};

    const TOKEN_A: Address = address!("0000000000000000000000000000000000000aaa");
    const TOKEN_B: Address = address!("0000000000000000000000000000000000000bbb");
    const ACCOUNT: Address = address!("4242424242424242424242424242424242424242");

    fn ctx() -> ChainContext {
        AddressBook::builtin().context(8453).unwrap()
    }

    fn binding(ctx: &ChainContext) -> ValidatorBinding {
        ownable_binding(ctx.modules.ownable_validator, &[Address::repeat_byte(0x0e)])
    }

    fn spend_limit(amount: u64) -> PolicyParams {
        PolicyParams::SpendLimit {
            token_limits: vec![TokenLimit {
                token: TOKEN_A,
                amount: U256::from(amount),
            }],
        }
    }

    fn installed_query(ctx: &ChainContext) -> ContractCall {
        let call = IERC7579Account::isModuleInstalledCall {
            moduleTypeId: ModuleType::Validator.type_id(),
            module: ctx.modules.smart_session,
            additionalContext: Bytes::new(),
        };
        ContractCall::new(ACCOUNT, call.abi_encode())
    }

    #[test]
    fn test_spend_limit_grant() {
        let ctx = ctx();
        let binding = binding(&ctx);
        let session = PolicyCompiler::new(&ctx)
            .compile(&spend_limit(1000), &binding)
            .unwrap();

        assert!(session.user_op_policies.is_empty());
        assert_eq!(session.actions.len(), 1);
        let action = &session.actions[0];
        assert_eq!(action.actionTarget, TOKEN_A);
        assert_eq!(action.actionTargetSelector, TRANSFER_SELECTOR);
        assert_eq!(action.actionPolicies.len(), 1);
        assert_eq!(action.actionPolicies[0].policy, ctx.modules.spend_limit_policy);

        let (tokens, limits) =
            <(Vec<Address>, Vec<U256>)>::abi_decode_params(&action.actionPolicies[0].initData, true)
                .unwrap();
        assert_eq!(tokens, vec![TOKEN_A]);
        assert_eq!(limits, vec![U256::from(1000u64)]);

        let tx = SessionTxBuilder::new(&ctx)
            .build_enable_session(&spend_limit(1000), &binding)
            .unwrap();
        assert_eq!(tx.to, ctx.modules.smart_session);
        assert_eq!(tx.value, U256::ZERO);
        let call = ISmartSession::enableSessionsCall::abi_decode(&tx.data, true).unwrap();
        assert_eq!(call.sessions, vec![session.to_abi()]);
    }

    #[test]
    fn test_empty_spend_limit_rejected() {
        let ctx = ctx();
        let params = PolicyParams::SpendLimit {
            token_limits: Vec::new(),
        };
        assert_eq!(
            SessionTxBuilder::new(&ctx)
                .build_enable_session(&params, &binding(&ctx))
                .unwrap_err(),
            EngineError::EmptyTokenList("spendlimit")
        );
    }

    #[test]
    fn test_sudo_grant_transfer_only() {
        let ctx = ctx();
        let params = PolicyParams::Sudo {
            token_access: vec![TokenAccess {
                address: TOKEN_B,
                is_transfer_enabled: true,
                is_swap_enabled: false,
            }],
        };
        let session = PolicyCompiler::new(&ctx)
            .compile(&params, &binding(&ctx))
            .unwrap();

        assert_eq!(session.user_op_policies.len(), 1);
        assert_eq!(session.user_op_policies[0].policy, ctx.modules.sudo_policy);

        let shape: Vec<_> = session
            .actions
            .iter()
            .map(|a| (a.actionTarget, a.actionTargetSelector))
            .collect();
        assert_eq!(
            shape,
            vec![
                (GENERIC_EXECUTOR_ADDRESS, EXEC_SELECTOR),
                (TOKEN_B, TRANSFER_SELECTOR),
            ]
        );
        assert!(session
            .actions
            .iter()
            .all(|a| a.actionPolicies[0].policy == ctx.modules.sudo_policy));
    }

    #[test]
    fn test_compilation_is_idempotent() {
        let ctx = ctx();
        let binding = binding(&ctx);
        let compiler = PolicyCompiler::new(&ctx);
        let a = compiler.compile(&spend_limit(1000), &binding).unwrap();
        let b = compiler.compile(&spend_limit(1000), &binding).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.fingerprint(), b.fingerprint());

        let builder = SessionTxBuilder::new(&ctx);
        assert_eq!(
            builder.build_enable_session(&spend_limit(1000), &binding).unwrap(),
            builder.build_enable_session(&spend_limit(1000), &binding).unwrap()
        );
        assert_ne!(
            a.fingerprint(),
            compiler.compile(&spend_limit(1001), &binding).unwrap().fingerprint()
        );
    }

    #[test]
    fn test_enable_disable_asymmetry() {
        let ctx = ctx();
        let binding = binding(&ctx);
        let builder = SessionTxBuilder::new(&ctx);

        let enable = UpdateActionParams::Sudo {
            updates: vec![
                SudoUpdate::new(TOKEN_A, Some(true), Some(true)),
                SudoUpdate::new(TOKEN_B, Some(true), Some(true)),
            ],
        };
        let txs = builder.build_enable_action_policies(&enable, &binding);
        assert_eq!(txs.len(), 1);
        let call = ISmartSession::enableActionPoliciesCall::abi_decode(&txs[0].data, true).unwrap();
        let pairs: Vec<_> = call
            .actionPolicies
            .iter()
            .map(|a| (a.actionTarget, a.actionTargetSelector))
            .collect();
        assert_eq!(
            pairs,
            vec![
                (TOKEN_A, TRANSFER_SELECTOR),
                (TOKEN_A, APPROVE_SELECTOR),
                (TOKEN_B, TRANSFER_SELECTOR),
                (TOKEN_B, APPROVE_SELECTOR),
            ]
        );
        assert!(builder.build_disable_action_policies(&enable, &binding).is_empty());

        let disable = UpdateActionParams::Sudo {
            updates: vec![
                SudoUpdate::new(TOKEN_A, Some(false), Some(false)),
                SudoUpdate::new(TOKEN_B, Some(false), Some(false)),
            ],
        };
        assert!(builder.build_enable_action_policies(&disable, &binding).is_empty());
        let txs = builder.build_disable_action_policies(&disable, &binding);
        // Two per token: transfer then approve.
        assert_eq!(txs.len(), 4);
        let first = ISmartSession::disableActionPoliciesCall::abi_decode(&txs[0].data, true).unwrap();
        assert_eq!(first.actionId, ids::action_id(TOKEN_A, TRANSFER_SELECTOR));
        assert_eq!(first.policies, vec![ctx.modules.sudo_policy]);
        let second = ISmartSession::disableActionPoliciesCall::abi_decode(&txs[1].data, true).unwrap();
        assert_eq!(second.actionId, ids::action_id(TOKEN_A, APPROVE_SELECTOR));
    }

    #[test]
    fn test_enable_batches_while_disable_splits() {
        let ctx = ctx();
        let binding = binding(&ctx);
        let builder = SessionTxBuilder::new(&ctx);

        let enable = UpdateActionParams::Sudo {
            updates: vec![
                SudoUpdate::new(TOKEN_A, Some(true), None),
                SudoUpdate::new(TOKEN_B, None, Some(true)),
            ],
        };
        assert_eq!(builder.build_enable_action_policies(&enable, &binding).len(), 1);

        let disable = UpdateActionParams::Sudo {
            updates: vec![
                SudoUpdate::new(TOKEN_A, Some(false), None),
                SudoUpdate::new(TOKEN_B, None, Some(false)),
            ],
        };
        assert_eq!(builder.build_disable_action_policies(&disable, &binding).len(), 2);
    }

    #[test]
    fn test_disable_gates_flags_independently() {
        let ctx = ctx();
        let builder = SessionTxBuilder::new(&ctx);
        let params = UpdateActionParams::Sudo {
            updates: vec![
                SudoUpdate::new(TOKEN_A, None, Some(false)),
                SudoUpdate::new(TOKEN_B, Some(false), None),
            ],
        };
        let txs = builder.build_disable_action_policies(&params, &binding(&ctx));
        assert_eq!(txs.len(), 2);
        let action_ids: Vec<_> = txs
            .iter()
            .map(|tx| {
                ISmartSession::disableActionPoliciesCall::abi_decode(&tx.data, true)
                    .unwrap()
                    .actionId
            })
            .collect();
        assert_eq!(
            action_ids,
            vec![
                ids::action_id(TOKEN_A, TRANSFER_SELECTOR),
                ids::action_id(TOKEN_B, APPROVE_SELECTOR),
            ]
        );
    }

    #[test]
    fn test_spend_limit_updates() {
        let ctx = ctx();
        let binding = binding(&ctx);
        let builder = SessionTxBuilder::new(&ctx);
        let params = UpdateActionParams::SpendLimit {
            updates: vec![
                SpendLimitUpdate::new(TOKEN_A, U256::ZERO),
                SpendLimitUpdate::new(TOKEN_B, U256::from(500u64)),
            ],
        };
        let permission_id = PolicyCompiler::new(&ctx)
            .management_session(&binding)
            .permission_id();

        let disabled = builder.build_disable_action_policies(&params, &binding);
        assert_eq!(disabled.len(), 1);
        let call = ISmartSession::disableActionPoliciesCall::abi_decode(&disabled[0].data, true).unwrap();
        assert_eq!(call.permissionId, permission_id);
        assert_eq!(call.actionId, ids::action_id(TOKEN_A, TRANSFER_SELECTOR));
        assert_eq!(call.policies, vec![ctx.modules.spend_limit_policy]);

        let enabled = builder.build_enable_action_policies(&params, &binding);
        assert_eq!(enabled.len(), 1);
        let call = ISmartSession::enableActionPoliciesCall::abi_decode(&enabled[0].data, true).unwrap();
        assert_eq!(call.permissionId, permission_id);
        assert_eq!(call.actionPolicies.len(), 1);
        let (_, limits) = <(Vec<Address>, Vec<U256>)>::abi_decode_params(
            &call.actionPolicies[0].actionPolicies[0].initData,
            true,
        )
        .unwrap();
        assert_eq!(limits, vec![U256::from(500u64)]);
    }

    #[test]
    fn test_remove_targets_enabled_permission() {
        let ctx = ctx();
        let binding = binding(&ctx);
        let enabled = PolicyCompiler::new(&ctx)
            .compile(&spend_limit(1000), &binding)
            .unwrap();
        let tx = SessionTxBuilder::new(&ctx).build_remove_session(&binding);
        let call = ISmartSession::removeSessionCall::abi_decode(&tx.data, true).unwrap();
        assert_eq!(call.permissionId, enabled.permission_id());
        assert_eq!(tx.to, ctx.modules.smart_session);
    }

    #[test]
    fn test_plan_sudo_updates() {
        let ctx = ctx();
        let builder = SessionTxBuilder::new(&ctx);
        let current = vec![SudoAccessState {
            address: TOKEN_A,
            permissions: SudoAccess {
                swap: true,
                spend: true,
            },
        }];
        let desired = vec![
            TokenAccess {
                address: TOKEN_A,
                is_transfer_enabled: true,
                is_swap_enabled: false,
            },
            TokenAccess {
                address: TOKEN_B,
                is_transfer_enabled: true,
                is_swap_enabled: false,
            },
        ];
        assert_eq!(
            builder.plan_sudo_updates(&current, &desired),
            UpdateActionParams::Sudo {
                updates: vec![
                    SudoUpdate::new(TOKEN_A, Some(false), None),
                    SudoUpdate::new(TOKEN_B, None, Some(true)),
                ]
            }
        );
    }

    #[tokio::test]
    async fn test_installed_module_skips_install() {
        let ctx = ctx();
        let reader = MockChainReader::new(8453).respond(installed_query(&ctx), true.abi_encode());
        let builder = SessionTxBuilder::new(&ctx);

        assert!(builder.build_install_session_module(&reader, ACCOUNT).await.is_none());
        let steps = builder
            .build_enable_session_steps(&reader, ACCOUNT, &spend_limit(1000), &binding(&ctx))
            .await
            .unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].to, ctx.modules.smart_session);
    }

    #[tokio::test]
    async fn test_fresh_account_installs_before_enable() {
        let ctx = ctx();
        // Unscripted registry query reverts and counts as not installed.
        let reader = MockChainReader::new(8453);
        let steps = SessionTxBuilder::new(&ctx)
            .build_enable_session_steps(&reader, ACCOUNT, &spend_limit(1000), &binding(&ctx))
            .await
            .unwrap();

        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].to, ACCOUNT);
        let install = IERC7579Account::installModuleCall::abi_decode(&steps[0].data, true).unwrap();
        assert_eq!(install.moduleTypeId, U256::from(1u64));
        assert_eq!(install.module, ctx.modules.smart_session);
        assert!(install.initData.is_empty());
        assert_eq!(steps[1].to, ctx.modules.smart_session);
    }

    #[tokio::test]
    async fn test_malformed_registry_reply_counts_as_not_installed() {
        let ctx = ctx();
        // One byte cannot decode as an ABI bool.
        let reader = MockChainReader::new(8453).respond(installed_query(&ctx), vec![0x01u8]);

        let installed = modules::is_installed(
            &reader,
            ACCOUNT,
            ctx.modules.smart_session,
            ModuleType::Validator,
        )
        .await;
        assert!(!installed);

        let install = SessionTxBuilder::new(&ctx)
            .build_install_session_module(&reader, ACCOUNT)
            .await
            .expect("install step when the registry reply is malformed");
        assert_eq!(install.to, ACCOUNT);
    }

    #[tokio::test]
    async fn test_uninstall_links_previous_entry() {
        let ctx = ctx();
        let module = Address::repeat_byte(0x99);
        let prev_of = |tx: &smart_session_types::Transaction| {
            let call = IERC7579Account::uninstallModuleCall::abi_decode(&tx.data, true).unwrap();
            <(Address, Bytes)>::abi_decode_params(&call.deInitData, true).unwrap().0
        };

        let bare = MockChainReader::new(8453);
        let tx = modules::build_uninstall_module(
            &bare,
            ACCOUNT,
            module,
            ModuleType::Validator,
            ctx.modules.smart_session,
        )
        .await;
        assert_eq!(prev_of(&tx), SENTINEL_ADDRESS);

        let installed = MockChainReader::new(8453).respond(installed_query(&ctx), true.abi_encode());
        let tx = modules::build_uninstall_module(
            &installed,
            ACCOUNT,
            module,
            ModuleType::Validator,
            ctx.modules.smart_session,
        )
        .await;
        assert_eq!(prev_of(&tx), ctx.modules.smart_session);
    }

    #[test]
    fn test_binding_for_signers() {
        let ctx = ctx();
        let compiler = PolicyCompiler::new(&ctx);
        let key = OwnableKeySigner::from_slice(&[0x22; 32]).unwrap();
        let owner = key.address();
        let signer = ValidatorSigner::session(B256::repeat_byte(0x01), ValidatorSigner::Ownable(key));

        let binding = compiler.binding_for(&signer, None).unwrap();
        assert_eq!(binding.address, ctx.modules.ownable_validator);
        let (threshold, owners) =
            <(U256, Vec<Address>)>::abi_decode_params(&binding.init_data, true).unwrap();
        assert_eq!(threshold, U256::from(1u64));
        assert_eq!(owners, vec![owner]);

        let salted = compiler
            .binding_for(&signer, Some(B256::repeat_byte(0x05)))
            .unwrap();
        assert_ne!(
            compiler.use_session(&salted).permission_id(),
            compiler.use_session(&binding).permission_id()
        );
    }

    #[test]
    fn test_default_salt_permission_id_is_pinned() {
        let ctx = ctx();
        let binding = binding(&ctx);
        assert!(binding.salt.is_none());
        assert_eq!(
            PolicyCompiler::new(&ctx).use_session(&binding).permission_id(),
            b256!("c48b60e4e1dc1084fccd34cf3acf7a88e36920ce0b4db6328b2b4675f6400232")
        );
        let explicit_one = binding.clone().with_salt(B256::with_last_byte(1));
        assert_eq!(
            PolicyCompiler::new(&ctx).use_session(&explicit_one).permission_id(),
            b256!("6858923ec92ca7d3c7cc32e23457b3865dd2e2b36257fdd748f1098c991a6fd7")
        );
    }

    #[test]
    fn test_use_descriptor_matches_enabled_session() {
        let ctx = ctx();
        let binding = binding(&ctx);
        let compiler = PolicyCompiler::new(&ctx);
        let descriptor = compiler.use_descriptor(&binding);
        assert_eq!(descriptor.mode, 0x00);
        assert!(descriptor.signature.is_empty());
        assert_eq!(
            descriptor.permission_id,
            compiler.compile(&spend_limit(1), &binding).unwrap().permission_id()
        );
    }
}
