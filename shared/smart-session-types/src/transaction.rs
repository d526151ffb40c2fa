use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

/// A built call, handed to the operation submitter as-is.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Transaction {
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
}

impl Transaction {
    /// Zero-value call to `to` with ABI-encoded `data`.
    pub fn call(to: Address, data: impl Into<Bytes>) -> Self {
        Self {
            to,
            value: U256::ZERO,
            data: data.into(),
        }
    }
}
