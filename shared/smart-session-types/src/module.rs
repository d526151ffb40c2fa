use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// ERC-7579 module types handled by the account registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum ModuleType {
    Validator = 1,
    Executor = 2,
    Fallback = 3,
    Hook = 4,
}

impl ModuleType {
    /// The `moduleTypeId` argument of `installModule` / `uninstallModule`.
    pub fn type_id(self) -> U256 {
        U256::from(self as u8)
    }
}

impl TryFrom<u8> for ModuleType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use ModuleType::*;
        let ty = match value {
            1 => Validator,
            2 => Executor,
            3 => Fallback,
            4 => Hook,
            _ => return Err(()),
        };
        Ok(ty)
    }
}

impl core::str::FromStr for ModuleType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "validator" => Ok(ModuleType::Validator),
            "executor" => Ok(ModuleType::Executor),
            "fallback" => Ok(ModuleType::Fallback),
            "hook" => Ok(ModuleType::Hook),
            _ => Err(()),
        }
    }
}
