//! ERC-7579 module management on the account itself.

use alloy_primitives::{Address, Bytes};
use alloy_sol_types::{SolCall, SolValue};
use smart_session_types::{ChainReader, ContractCall, ModuleType, Transaction};
use tracing::{debug, warn};

use crate::{abi::IERC7579Account, constants::SENTINEL_ADDRESS};

/// Whether `module` is installed on `account` as `module_type`.
///
/// A failed or undecodable read counts as not installed.
pub async fn is_installed<R: ChainReader + ?Sized>(
    reader: &R,
    account: Address,
    module: Address,
    module_type: ModuleType,
) -> bool {
    let call = IERC7579Account::isModuleInstalledCall {
        moduleTypeId: module_type.type_id(),
        module,
        additionalContext: Bytes::new(),
    };
    let out = match reader
        .call(&ContractCall::new(account, call.abi_encode()))
        .await
    {
        Ok(out) => out,
        Err(err) => {
            warn!(%account, %module, %err, "isModuleInstalled read failed");
            return false;
        }
    };
    match IERC7579Account::isModuleInstalledCall::abi_decode_returns(&out, true) {
        Ok(ret) => ret._0,
        Err(_) => {
            warn!(%account, %module, "isModuleInstalled returned malformed data");
            false
        }
    }
}

pub fn build_install_module(
    account: Address,
    module: Address,
    module_type: ModuleType,
    init_data: Bytes,
) -> Transaction {
    debug!(%account, %module, ?module_type, "built installModule");
    let call = IERC7579Account::installModuleCall {
        moduleTypeId: module_type.type_id(),
        module,
        initData: init_data,
    };
    Transaction::call(account, call.abi_encode())
}

/// Uninstall `module`, linking it out of the account's validator list.
///
/// The previous entry is the smart-session module when that is installed, otherwise the list
/// sentinel.
pub async fn build_uninstall_module<R: ChainReader + ?Sized>(
    reader: &R,
    account: Address,
    module: Address,
    module_type: ModuleType,
    smart_session: Address,
) -> Transaction {
    let prev = if is_installed(reader, account, smart_session, ModuleType::Validator).await {
        smart_session
    } else {
        SENTINEL_ADDRESS
    };
    debug!(%account, %module, %prev, "built uninstallModule");
    let call = IERC7579Account::uninstallModuleCall {
        moduleTypeId: module_type.type_id(),
        module,
        deInitData: (prev, Bytes::new()).abi_encode_params().into(),
    };
    Transaction::call(account, call.abi_encode())
}
