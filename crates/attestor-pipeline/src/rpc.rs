//! Minimal JSON-RPC 2.0 over HTTP, shared by the prover and aggregator clients.

use std::time::Duration;

use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize};

use super::RpcCallError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

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

#[derive(Debug, Clone)]
pub(crate) struct JsonRpcHttp {
    client: Client,
    url: String,
}

impl JsonRpcHttp {
    pub(crate) fn new(url: impl Into<String>) -> Self {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build().unwrap_or_default();
        Self { client, url: url.into() }
    }

    pub(crate) fn url(&self) -> &str {
        &self.url
    }

    /// Call `method`; `Ok(None)` when the server answers with a null result.
    pub(crate) async fn call<T: DeserializeOwned>(
        &self,
        method: &'static str,
        params: serde_json::Value,
    ) -> Result<Option<T>, RpcCallError> {
        let req = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params
        });

        let resp = self
            .client
            .post(&self.url)
            .json(&req)
            .send()
            .await
            .map_err(|e| RpcCallError::Http { method, message: e.to_string() })?;

        let body: RpcResponse<T> =
            resp.json().await.map_err(|e| RpcCallError::Http { method, message: e.to_string() })?;

        if let Some(err) = body.error {
            return Err(RpcCallError::Rpc { method, code: err.code, message: err.message });
        }

        Ok(body.result)
    }
}
