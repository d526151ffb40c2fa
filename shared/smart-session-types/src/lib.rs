//! Shared types for the smart session engine and its tooling.

pub mod module;
pub mod reader;
pub mod token;
pub mod transaction;

pub use module::ModuleType;
pub use reader::{ChainReader, ContractCall, ReadError};
pub use token::Token;
pub use transaction::Transaction;
