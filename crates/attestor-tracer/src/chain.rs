//! Source-chain access via JSON-RPC.

use alloy_primitives::{Address, Bytes, B256, U64};
use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize};

use attestor_types::RawLogEvent;

use super::ChainRpcError;

/// Read-only view of the source chain used by the tracer and the provers.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Current chain head.
    async fn block_number(&self) -> Result<u64, ChainRpcError>;

    /// Logs in the inclusive block range `[from, to]` matching the filter.
    ///
    /// `topics` is positional; an empty set at a position matches anything.
    async fn get_logs(
        &self,
        from: u64,
        to: u64,
        addresses: &[Address],
        topics: &[Vec<B256>],
    ) -> Result<Vec<RawLogEvent>, ChainRpcError>;

    /// Call data of a transaction.
    async fn transaction_input(&self, tx_hash: B256) -> Result<Bytes, ChainRpcError>;

    /// State root of the block header at `number`.
    async fn state_root(&self, number: u64) -> Result<B256, ChainRpcError>;
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcLog {
    address: Address,
    topics: Vec<B256>,
    data: Bytes,
    block_number: U64,
    log_index: U64,
    transaction_hash: B256,
    #[serde(default)]
    removed: bool,
}

impl From<RpcLog> for RawLogEvent {
    fn from(log: RpcLog) -> Self {
        Self {
            address: log.address,
            topics: log.topics,
            data: log.data,
            block_number: log.block_number.to(),
            log_index: log.log_index.to(),
            tx_hash: log.transaction_hash,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcHeader {
    state_root: B256,
}

#[derive(Debug, Deserialize)]
struct RpcTransaction {
    input: Bytes,
}

/// [`ChainClient`] over plain HTTP JSON-RPC.
#[derive(Debug, Clone)]
pub struct JsonRpcChainClient {
    client: Client,
    rpc_url: String,
}

impl JsonRpcChainClient {
    /// Create a client for an HTTP(S) endpoint.
    ///
    /// WebSocket URLs are converted: `wss://` to `https://` and `ws://` to `http://`.
    pub fn new(rpc_url: &str) -> Self {
        let rpc_url = rpc_url.replace("wss://", "https://").replace("ws://", "http://");
        Self { client: Client::new(), rpc_url }
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: &'static str,
        params: serde_json::Value,
    ) -> Result<Option<T>, ChainRpcError> {
        let req = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params
        });

        let resp = self
            .client
            .post(&self.rpc_url)
            .json(&req)
            .send()
            .await
            .map_err(|e| ChainRpcError::Http { method, message: e.to_string() })?;

        let body: RpcResponse<T> =
            resp.json().await.map_err(|e| ChainRpcError::Http { method, message: e.to_string() })?;

        if let Some(err) = body.error {
            return Err(ChainRpcError::Rpc { method, code: err.code, message: err.message });
        }

        Ok(body.result)
    }
}

#[async_trait]
impl ChainClient for JsonRpcChainClient {
    async fn block_number(&self) -> Result<u64, ChainRpcError> {
        let number: U64 = self
            .request("eth_blockNumber", serde_json::json!([]))
            .await?
            .ok_or(ChainRpcError::MissingResult("eth_blockNumber"))?;
        Ok(number.to())
    }

    async fn get_logs(
        &self,
        from: u64,
        to: u64,
        addresses: &[Address],
        topics: &[Vec<B256>],
    ) -> Result<Vec<RawLogEvent>, ChainRpcError> {
        // empty positions become `null` wildcards
        let topics: Vec<Option<&[B256]>> =
            topics.iter().map(|set| (!set.is_empty()).then_some(set.as_slice())).collect();

        let params = serde_json::json!([{
            "fromBlock": format!("0x{:x}", from),
            "toBlock": format!("0x{:x}", to),
            "address": addresses,
            "topics": topics,
        }]);

        let logs: Vec<RpcLog> = self
            .request("eth_getLogs", params)
            .await?
            .ok_or(ChainRpcError::MissingResult("eth_getLogs"))?;

        Ok(logs.into_iter().filter(|log| !log.removed).map(RawLogEvent::from).collect())
    }

    async fn transaction_input(&self, tx_hash: B256) -> Result<Bytes, ChainRpcError> {
        let tx: RpcTransaction = self
            .request("eth_getTransactionByHash", serde_json::json!([tx_hash]))
            .await?
            .ok_or(ChainRpcError::TransactionNotFound(tx_hash))?;
        Ok(tx.input)
    }

    async fn state_root(&self, number: u64) -> Result<B256, ChainRpcError> {
        let header: RpcHeader = self
            .request("eth_getBlockByNumber", serde_json::json!([format!("0x{:x}", number), false]))
            .await?
            .ok_or(ChainRpcError::BlockNotFound(number))?;
        Ok(header.state_root)
    }
}
