//! Delegated session policy engine for ERC-7579 smart accounts.
//!
//! Compiles spend-limit and sudo grants into smart-session `Session` values, derives the
//! identifiers the on-chain module keys its storage by, builds the transactions that enable,
//! update, and remove sessions, and reads current policy state through a [`ChainReader`].
//!
//! Nothing in this crate submits transactions or holds mutable state.

pub mod abi;
pub mod builder;
pub mod compiler;
pub mod config;
pub mod constants;
pub mod errors;
pub mod ids;
pub mod mock;
pub mod modules;
pub mod reader;
pub mod session;
pub mod signer;
pub mod utils;

mod tests;

pub use builder::SessionTxBuilder;
pub use compiler::{ownable_binding, PolicyCompiler, UseSession};
pub use config::{AddressBook, ChainContext, ModuleAddresses};
pub use errors::{EngineError, SignerError};
pub use reader::{
    DelegatedToken, PolicyEnabled, PolicyStateReader, SpendLimitState, SpendableTokenInfo,
    SudoAccess, SudoAccessState,
};
pub use session::{
    PolicyKind, PolicyParams, Session, SpendLimitUpdate, SudoUpdate, TokenAccess, TokenLimit,
    UpdateActionParams, ValidatorBinding,
};
pub use signer::{
    session_validator_for, OwnableKeySigner, PasskeyAuthenticator, ValidatorKind,
    ValidatorSigner,
};
pub use smart_session_types::{ChainReader, ContractCall, ModuleType, ReadError, Token, Transaction};
