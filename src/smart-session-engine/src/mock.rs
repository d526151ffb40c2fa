//! Scripted [`ChainReader`] for tests and offline tooling.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;
use smart_session_types::{ChainReader, ContractCall, ReadError};

/// Answers calls from a table keyed by `(target, calldata)`. Unscripted calls revert.
#[derive(Debug, Default)]
pub struct MockChainReader {
    chain_id: Option<u64>,
    responses: HashMap<(Address, Bytes), Result<Bytes, ReadError>>,
    log: Mutex<CallLog>,
}

#[derive(Debug, Default)]
struct CallLog {
    calls: Vec<ContractCall>,
    batches: usize,
}

impl MockChainReader {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id: Some(chain_id),
            ..Self::default()
        }
    }

    /// A reader whose chain id query fails.
    pub fn without_chain_id() -> Self {
        Self::default()
    }

    pub fn respond(mut self, call: ContractCall, out: impl Into<Bytes>) -> Self {
        self.responses
            .insert((call.target, call.calldata), Ok(out.into()));
        self
    }

    pub fn fail(mut self, call: ContractCall, err: ReadError) -> Self {
        self.responses.insert((call.target, call.calldata), Err(err));
        self
    }

    /// Every call issued so far, in order, including multicall elements.
    pub fn calls(&self) -> Vec<ContractCall> {
        self.log().calls.clone()
    }

    pub fn multicall_batches(&self) -> usize {
        self.log().batches
    }

    fn log(&self) -> MutexGuard<'_, CallLog> {
        self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn answer(&self, call: &ContractCall) -> Result<Bytes, ReadError> {
        self.log().calls.push(call.clone());
        self.responses
            .get(&(call.target, call.calldata.clone()))
            .cloned()
            .unwrap_or(Err(ReadError::Reverted))
    }
}

#[async_trait]
impl ChainReader for MockChainReader {
    async fn chain_id(&self) -> Result<u64, ReadError> {
        self.chain_id
            .ok_or_else(|| ReadError::Transport("chain id unavailable".to_string()))
    }

    async fn call(&self, call: &ContractCall) -> Result<Bytes, ReadError> {
        self.answer(call)
    }

    async fn multicall(&self, calls: &[ContractCall]) -> Vec<Result<Bytes, ReadError>> {
        self.log().batches += 1;
        calls.iter().map(|call| self.answer(call)).collect()
    }
}
