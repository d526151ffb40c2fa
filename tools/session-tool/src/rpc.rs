//! JSON-RPC [`ChainReader`] over an `ethers` HTTP provider.

use alloy_primitives::{address, Address, Bytes};
use alloy_sol_types::{sol, SolCall};
use anyhow::{Context, Result};
use async_trait::async_trait;
use ethers::{
    providers::{Http, Middleware, Provider, ProviderError, RpcError},
    types::{transaction::eip2718::TypedTransaction, TransactionRequest, H160, U256},
};
use smart_session_types::{ChainReader, ContractCall, ReadError};
use tracing::debug;

/// Multicall3, deployed at the same address on every supported chain.
const MULTICALL3: Address = address!("ca11bde05977b3631167028862be2a173976ca11");

sol! {
    struct Call3 {
        address target;
        bool allowFailure;
        bytes callData;
    }

    struct Call3Result {
        bool success;
        bytes returnData;
    }

    interface IMulticall3 {
        function aggregate3(Call3[] calldata calls) external payable returns (Call3Result[] memory returnData);
    }
}

pub struct EthersChainReader {
    provider: Provider<Http>,
}

impl EthersChainReader {
    pub fn new(rpc_url: &str) -> Result<Self> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .with_context(|| format!("invalid RPC URL {rpc_url}"))?;
        Ok(Self { provider })
    }

    async fn eth_call(&self, target: Address, data: &[u8]) -> Result<Bytes, ReadError> {
        let tx: TypedTransaction = TransactionRequest::new()
            .to(H160::from_slice(target.as_slice()))
            .data(data.to_vec())
            .into();
        let out = self.provider.call(&tx, None).await.map_err(read_error)?;
        Ok(Bytes::from(out.to_vec()))
    }
}

/// A JSON-RPC error response means the node executed the call; anything else is transport.
fn read_error(err: ProviderError) -> ReadError {
    if err.as_error_response().is_some() {
        ReadError::Reverted
    } else {
        ReadError::Transport(err.to_string())
    }
}

/// Chain ids wider than 64 bits are rejected rather than truncated.
fn chain_id_from(id: U256) -> Result<u64, ReadError> {
    if id.bits() > 64 {
        return Err(ReadError::MalformedReturn);
    }
    Ok(id.low_u64())
}

#[async_trait]
impl ChainReader for EthersChainReader {
    async fn chain_id(&self) -> Result<u64, ReadError> {
        let id = self
            .provider
            .get_chainid()
            .await
            .map_err(|e| ReadError::Transport(e.to_string()))?;
        chain_id_from(id)
    }

    async fn call(&self, call: &ContractCall) -> Result<Bytes, ReadError> {
        self.eth_call(call.target, &call.calldata).await
    }

    /// One `aggregate3` with `allowFailure` set, so failures stay per element.
    async fn multicall(&self, calls: &[ContractCall]) -> Vec<Result<Bytes, ReadError>> {
        let batch = IMulticall3::aggregate3Call {
            calls: calls
                .iter()
                .map(|call| Call3 {
                    target: call.target,
                    allowFailure: true,
                    callData: call.calldata.clone(),
                })
                .collect(),
        };
        debug!(calls = calls.len(), "aggregate3");

        let decoded = self
            .eth_call(MULTICALL3, &batch.abi_encode())
            .await
            .and_then(|out| {
                IMulticall3::aggregate3Call::abi_decode_returns(&out, true)
                    .map_err(|_| ReadError::MalformedReturn)
            });

        match decoded {
            Ok(ret) if ret.returnData.len() == calls.len() => ret
                .returnData
                .into_iter()
                .map(|r| {
                    if r.success {
                        Ok(r.returnData)
                    } else {
                        Err(ReadError::Reverted)
                    }
                })
                .collect(),
            Ok(_) => vec![Err(ReadError::MalformedReturn); calls.len()],
            Err(err) => vec![Err(err); calls.len()],
        }
    }
}
