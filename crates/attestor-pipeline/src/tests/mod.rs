//! Pipeline tests with an in-process JSON-RPC endpoint and a scripted chain.

mod header;

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
};

use attestor_tracer::{ChainClient, ChainRpcError};
use attestor_types::RawLogEvent;

/// URL nothing listens on.
pub(crate) const DEAD_URL: &str = "http://127.0.0.1:1";

/// A JSON-RPC server answering each connection with the next canned response.
pub(crate) struct MockRpc {
    pub url: String,
    pub requests: Arc<Mutex<Vec<serde_json::Value>>>,
}

impl MockRpc {
    pub(crate) async fn serve(responses: Vec<serde_json::Value>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));

        let seen = requests.clone();
        tokio::spawn(async move {
            for response in responses {
                let Ok((mut stream, _)) = listener.accept().await else { return };
                let body = read_request_body(&mut stream).await;
                seen.lock().unwrap().push(serde_json::from_slice(&body).unwrap_or_default());

                let payload = response.to_string();
                let reply = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    payload.len(),
                    payload
                );
                let _ = stream.write_all(reply.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        Self { url, requests }
    }

    pub(crate) fn result(result: serde_json::Value) -> serde_json::Value {
        serde_json::json!({ "jsonrpc": "2.0", "id": 1, "result": result })
    }

    pub(crate) fn error(code: i64, message: &str) -> serde_json::Value {
        serde_json::json!({ "jsonrpc": "2.0", "id": 1, "error": { "code": code, "message": message } })
    }

    pub(crate) fn request(&self, index: usize) -> serde_json::Value {
        self.requests.lock().unwrap()[index].clone()
    }
}

async fn read_request_body(stream: &mut TcpStream) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = stream.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            return Vec::new();
        }
        buf.extend_from_slice(&chunk[..n]);

        let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else { continue };
        let headers = String::from_utf8_lossy(&buf[..end]).to_lowercase();
        let len = headers
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);

        let body_start = end + 4;
        while buf.len() < body_start + len {
            let n = stream.read(&mut chunk).await.unwrap_or(0);
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        return buf[body_start..].to_vec();
    }
}

/// Chain with fixed transactions and headers that counts header lookups.
#[derive(Default)]
pub(crate) struct ScriptedChain {
    pub head: u64,
    pub inputs: HashMap<B256, Bytes>,
    pub roots: HashMap<u64, B256>,
    pub root_lookups: AtomicUsize,
}

impl ScriptedChain {
    pub(crate) fn root_lookups(&self) -> usize {
        self.root_lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainClient for ScriptedChain {
    async fn block_number(&self) -> Result<u64, ChainRpcError> {
        Ok(self.head)
    }

    async fn get_logs(
        &self,
        _from: u64,
        _to: u64,
        _addresses: &[Address],
        _topics: &[Vec<B256>],
    ) -> Result<Vec<RawLogEvent>, ChainRpcError> {
        Ok(Vec::new())
    }

    async fn transaction_input(&self, tx_hash: B256) -> Result<Bytes, ChainRpcError> {
        self.inputs.get(&tx_hash).cloned().ok_or(ChainRpcError::TransactionNotFound(tx_hash))
    }

    async fn state_root(&self, number: u64) -> Result<B256, ChainRpcError> {
        self.root_lookups.fetch_add(1, Ordering::SeqCst);
        self.roots.get(&number).copied().ok_or(ChainRpcError::BlockNotFound(number))
    }
}
