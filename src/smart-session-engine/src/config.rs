//! Per-chain module addresses.
//!
//! The book is passed in explicitly; nothing here reads the environment. A chain that is not
//! listed resolves to an error unless the book names a `fallbackChain`.

use std::collections::BTreeMap;

use alloy_primitives::{address, Address};
use serde::{Deserialize, Serialize};
use smart_session_types::ChainReader;
use tracing::debug;

use crate::errors::EngineError;

/// Deployed module addresses for one chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleAddresses {
    pub smart_session: Address,
    pub spend_limit_policy: Address,
    pub uni_action_policy: Address,
    pub sudo_policy: Address,
    pub ownable_validator: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webauthn_session_validator: Option<Address>,
}

/// Chain id → module addresses.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressBook {
    pub chains: BTreeMap<u64, ModuleAddresses>,
    /// Chain whose addresses stand in for unlisted chains. Unset means unlisted chains fail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_chain: Option<u64>,
}

/// Module addresses resolved for one chain; every builder and reader works against one of these.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainContext {
    pub chain_id: u64,
    pub modules: ModuleAddresses,
}

const SMART_SESSION: Address = address!("00000000002b0ecfbd0496ee71e01257da0e37de");
const SPEND_LIMIT_POLICY: Address = address!("6d12b354080557a9e74db3c0e2e0c26607597a08");
const OWNABLE_VALIDATOR: Address = address!("2483da3a338895199e5e538530213157e931bf06");

fn deployment(uni_action_policy: Address, sudo_policy: Address) -> ModuleAddresses {
    ModuleAddresses {
        smart_session: SMART_SESSION,
        spend_limit_policy: SPEND_LIMIT_POLICY,
        uni_action_policy,
        sudo_policy,
        ownable_validator: OWNABLE_VALIDATOR,
        webauthn_session_validator: None,
    }
}

impl AddressBook {
    /// Known deployments. No fallback chain is set.
    pub fn builtin() -> Self {
        let base_mainnet = deployment(
            address!("142fc47ae4671ab8da45d09dd9349b7dc15da8c2"),
            address!("a445bd8a6ee29e410892910fea2cab474cb21f92"),
        );
        let testnet_like = deployment(
            address!("f209d6e6c7b3781878ba61b1da2976f80e014815"),
            address!("6a2246fbc8c61ae6f6f55f99c44a58933fcf712d"),
        );
        let bnb_like = deployment(
            address!("2e2183563d1b7a7b39c4fd3824cb2fc872dd8ec9"),
            address!("51db84d818e6b670f69296f2665638970b097269"),
        );

        let mut chains = BTreeMap::new();
        chains.insert(8453, base_mainnet);
        chains.insert(84532, testnet_like.clone()); // Base Sepolia
        chains.insert(11155111, testnet_like.clone()); // Sepolia
        chains.insert(137, testnet_like.clone()); // Polygon
        chains.insert(10, testnet_like); // Optimism
        chains.insert(56, bnb_like.clone()); // BNB Smart Chain
        chains.insert(42161, bnb_like); // Arbitrum One

        Self {
            chains,
            fallback_chain: None,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let book: Self =
            serde_json::from_str(json).map_err(|e| EngineError::AddressBook(e.to_string()))?;
        if let Some(fallback) = book.fallback_chain {
            if !book.chains.contains_key(&fallback) {
                return Err(EngineError::AddressBook(format!(
                    "fallbackChain {fallback} has no entry"
                )));
            }
        }
        Ok(book)
    }

    pub fn with_fallback(mut self, chain_id: u64) -> Self {
        self.fallback_chain = Some(chain_id);
        self
    }

    /// Resolve `chain_id`, consulting the fallback entry only when one is configured.
    pub fn context(&self, chain_id: u64) -> Result<ChainContext, EngineError> {
        let modules = match self.chains.get(&chain_id) {
            Some(m) => m,
            None => {
                let fallback = self
                    .fallback_chain
                    .ok_or(EngineError::UnknownChain(chain_id))?;
                debug!(chain_id, fallback, "using fallback module addresses");
                self.chains
                    .get(&fallback)
                    .ok_or(EngineError::UnknownChain(chain_id))?
            }
        };
        Ok(ChainContext {
            chain_id,
            modules: modules.clone(),
        })
    }

    /// Resolve the chain the reader is connected to.
    pub async fn context_for<R: ChainReader + ?Sized>(
        &self,
        reader: &R,
    ) -> Result<ChainContext, EngineError> {
        let chain_id = reader.chain_id().await.map_err(EngineError::ChainId)?;
        self.context(chain_id)
    }
}

impl ChainContext {
    pub fn new(chain_id: u64, modules: ModuleAddresses) -> Self {
        Self { chain_id, modules }
    }

    pub(crate) fn webauthn_session_validator(&self) -> Result<Address, EngineError> {
        self.modules
            .webauthn_session_validator
            .ok_or(EngineError::MissingModule {
                module: "webauthnSessionValidator",
                chain_id: self.chain_id,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_chain_fails_without_fallback() {
        let book = AddressBook::builtin();
        assert_eq!(book.context(999).unwrap_err(), EngineError::UnknownChain(999));
    }

    #[test]
    fn explicit_fallback_is_honoured() {
        let book = AddressBook::builtin().with_fallback(8453);
        let ctx = book.context(999).unwrap();
        assert_eq!(ctx.chain_id, 999);
        assert_eq!(ctx.modules, book.chains[&8453]);
    }

    #[test]
    fn builtin_differs_per_network() {
        let book = AddressBook::builtin();
        let base = book.context(8453).unwrap();
        let arb = book.context(42161).unwrap();
        assert_eq!(base.modules.smart_session, arb.modules.smart_session);
        assert_ne!(base.modules.sudo_policy, arb.modules.sudo_policy);
    }

    #[test]
    fn loads_from_json() {
        let json = r#"{
            "chains": {
                "31337": {
                    "smartSession": "0x00000000002b0ecfbd0496ee71e01257da0e37de",
                    "spendLimitPolicy": "0x6d12b354080557a9e74db3c0e2e0c26607597a08",
                    "uniActionPolicy": "0xf209d6e6c7b3781878ba61b1da2976f80e014815",
                    "sudoPolicy": "0x6a2246fbc8c61ae6f6f55f99c44a58933fcf712d",
                    "ownableValidator": "0x2483da3a338895199e5e538530213157e931bf06"
                }
            }
        }"#;
        let book = AddressBook::from_json(json).unwrap();
        let ctx = book.context(31337).unwrap();
        assert_eq!(ctx.modules.smart_session, SMART_SESSION);
        assert!(ctx.webauthn_session_validator().is_err());
    }

    #[test]
    fn rejects_dangling_fallback() {
        let json = r#"{ "chains": {}, "fallbackChain": 1 }"#;
        assert!(matches!(
            AddressBook::from_json(json),
            Err(EngineError::AddressBook(_))
        ));
    }
}
