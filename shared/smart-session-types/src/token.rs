use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

/// ERC-20 token metadata needed to read and format policy state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub address: Address,
    pub decimals: u8,
}

impl Token {
    pub fn new(address: Address, decimals: u8) -> Self {
        Self { address, decimals }
    }
}
