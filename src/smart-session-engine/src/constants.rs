//! Protocol constants shared with the smart-session module and ERC-7579 accounts.

use alloy_primitives::{address, hex, Address, FixedBytes, B256};
use alloy_sol_types::SolCall;

use crate::abi::{IAllowanceExecutor, IERC20};

/// Salt used when a binding does not carry one: the UTF-8 string `"1"` right-padded to 32
/// bytes, as existing sessions were enabled with it.
pub const DEFAULT_SALT: B256 = B256::new(hex!(
    "3100000000000000000000000000000000000000000000000000000000000000"
));

/// Head of the account's singly linked module list.
pub const SENTINEL_ADDRESS: Address = address!("0000000000000000000000000000000000000001");

/// Generic executor every sudo session is granted full access to.
pub const GENERIC_EXECUTOR_ADDRESS: Address = address!("0000000000001ff3684f28c67538d4d072c22734");

/// `transfer(address,uint256)`
pub const TRANSFER_SELECTOR: FixedBytes<4> = FixedBytes(IERC20::transferCall::SELECTOR);

/// `approve(address,uint256)`
pub const APPROVE_SELECTOR: FixedBytes<4> = FixedBytes(IERC20::approveCall::SELECTOR);

/// `exec(address,address,uint256,address,bytes)`
pub const EXEC_SELECTOR: FixedBytes<4> = FixedBytes(IAllowanceExecutor::execCall::SELECTOR);

/// Smart-session signature mode byte for an already enabled session.
pub const SMART_SESSION_MODE_USE: u8 = 0x00;

/// Signature-shaped placeholder accepted by the ownable validator during gas estimation.
pub const OWNABLE_MOCK_SIGNATURE: [u8; 65] = hex!(
    "e8b94748580ca0b4993c9a1b86b5be851bfc076ff5ce3a1ff65bf16392acfcb800f9b4f1aef1555c7fce5599fffb17e7c635502154a0333ba21f3ae491839af51c"
);
