use thiserror::Error;

/// Errors during chain reads.
pub use smart_session_types::ReadError;

/// Errors surfaced to callers of the engine.
///
/// Read uncertainty in batched state reads is never reported here; it degrades to the
/// "no access" default instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("no module addresses configured for chain {0}")]
    UnknownChain(u64),
    #[error("module `{module}` is not configured for chain {chain_id}")]
    MissingModule { module: &'static str, chain_id: u64 },
    #[error("unrecognized policy kind `{0}`")]
    UnknownPolicyKind(String),
    #[error("{0} policy requires at least one token")]
    EmptyTokenList(&'static str),
    #[error("chain id unavailable: {0}")]
    ChainId(ReadError),
    #[error("chain read failed: {0}")]
    Read(ReadError),
    #[error("invalid address book: {0}")]
    AddressBook(String),
    #[error(transparent)]
    Signer(#[from] SignerError),
}

/// Errors raised by validator signers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignerError {
    #[error("invalid secp256k1 private key")]
    InvalidKey,
    #[error("signing failed: {0}")]
    Signing(String),
    #[error("passkey authenticator: {0}")]
    Authenticator(String),
}
