use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;
use thiserror::Error;

/// Errors during chain reads.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    /// Used by mocks or partially implemented readers.
    #[error("read not implemented")]
    NotImplemented,
    /// The transport or node failed before the call executed.
    #[error("transport error: {0}")]
    Transport(String),
    /// The call executed and reverted.
    #[error("call reverted")]
    Reverted,
    /// Return data was malformed or could not be decoded.
    #[error("malformed return data")]
    MalformedReturn,
}

/// A single read-only contract call: `target` receives `calldata` (selector + ABI args).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractCall {
    pub target: Address,
    pub calldata: Bytes,
}

impl ContractCall {
    pub fn new(target: Address, calldata: impl Into<Bytes>) -> Self {
        Self {
            target,
            calldata: calldata.into(),
        }
    }
}

/// Chain reader abstraction, implemented over JSON-RPC in tooling and scripted in tests.
///
/// `multicall` reports one result per call, in order. An element failure must never turn
/// into a whole-batch failure; a transport error is repeated for every element instead.
#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn chain_id(&self) -> Result<u64, ReadError>;

    async fn call(&self, _call: &ContractCall) -> Result<Bytes, ReadError> {
        Err(ReadError::NotImplemented)
    }

    async fn multicall(&self, calls: &[ContractCall]) -> Vec<Result<Bytes, ReadError>> {
        let mut out = Vec::with_capacity(calls.len());
        for call in calls {
            out.push(self.call(call).await);
        }
        out
    }
}
