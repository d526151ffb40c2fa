//! Solidity ABI surface of the smart-session module, its policies, and the ERC-7579 account.
//!
//! Struct layouts mirror the on-chain `DataTypes.sol`; field order is part of the encoding and
//! therefore of every identifier derived from it.

#![allow(missing_docs)]

use alloy_sol_types::sol;

sol! {
    #![sol(all_derives)]

    /// A policy contract and the data it is initialised with for one permission.
    struct PolicyData {
        address policy;
        bytes initData;
    }

    /// A (target, selector) pair a session may call, gated by action policies.
    struct ActionData {
        bytes4 actionTargetSelector;
        address actionTarget;
        PolicyData[] actionPolicies;
    }

    struct ERC7739Context {
        bytes32 appDomainSeparator;
        string[] contentName;
    }

    struct ERC7739Data {
        ERC7739Context[] allowedERC7739Content;
        PolicyData[] erc1271Policies;
    }

    /// On-chain session descriptor accepted by `enableSessions`.
    struct Session {
        address sessionValidator;
        bytes sessionValidatorInitData;
        bytes32 salt;
        PolicyData[] userOpPolicies;
        ERC7739Data erc7739Policies;
        ActionData[] actions;
        bool permitERC4337Paymaster;
    }

    interface ISmartSession {
        function enableSessions(Session[] memory sessions) external returns (bytes32[] memory permissionIds);
        function removeSession(bytes32 permissionId) external;
        function enableActionPolicies(bytes32 permissionId, ActionData[] memory actionPolicies) external;
        function disableActionPolicies(bytes32 permissionId, bytes32 actionId, address[] memory policies) external;
        function isActionPolicyEnabled(address account, bytes32 permissionId, bytes32 actionId, address policy)
            external
            view
            returns (bool);
        function getEnabledActions(address account, bytes32 permissionId) external view returns (bytes32[] memory);
    }

    interface ISpendingLimitPolicy {
        function getPolicyData(bytes32 id, address multiplexer, address token, address userOpSender)
            external
            view
            returns (uint256 spendingLimit, uint256 alreadySpent);
    }

    /// ERC-7579 module registry on the account itself.
    interface IERC7579Account {
        function installModule(uint256 moduleTypeId, address module, bytes calldata initData) external payable;
        function uninstallModule(uint256 moduleTypeId, address module, bytes calldata deInitData) external payable;
        function isModuleInstalled(uint256 moduleTypeId, address module, bytes calldata additionalContext)
            external
            view
            returns (bool);
    }

    interface IERC20 {
        function transfer(address to, uint256 value) external returns (bool);
        function approve(address spender, uint256 value) external returns (bool);
        function balanceOf(address account) external view returns (uint256);
        function decimals() external view returns (uint8);
    }

    /// Generic executor that sudo sessions are always allowed to drive.
    interface IAllowanceExecutor {
        function exec(address operator, address token, uint256 amount, address target, bytes calldata data)
            external
            payable
            returns (bytes memory result);
    }
}
