//! Signature aggregation sink.

use alloy_primitives::{Bytes, B256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use attestor_types::{SignedSubmission, StateHeader};

use super::{rpc::JsonRpcHttp, RpcCallError, SubmitError};

/// Request layout expected by the aggregator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SubmissionSchema {
    /// Header, signature and operator id.
    #[default]
    Standard,
    /// Also carries the raw BLS public key.
    LegacyPubkey,
}

impl SubmissionSchema {
    pub fn includes_pubkey(self) -> bool {
        matches!(self, Self::LegacyPubkey)
    }
}

/// Accepts signed headers. One call per event, no retry.
#[async_trait]
pub trait Aggregator: Send + Sync {
    async fn submit_task(&self, submission: &SignedSubmission) -> Result<(), SubmitError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TaskRequest<'a> {
    task: &'a StateHeader,
    signature: &'a Bytes,
    operator_id: B256,
    #[serde(skip_serializing_if = "Option::is_none")]
    pubkey: Option<&'a Bytes>,
}

impl<'a> From<&'a SignedSubmission> for TaskRequest<'a> {
    fn from(s: &'a SignedSubmission) -> Self {
        Self {
            task: &s.header,
            signature: &s.signature,
            operator_id: s.operator_id,
            pubkey: s.pubkey.as_ref(),
        }
    }
}

/// [`Aggregator`] over JSON-RPC (`aggregator_submitTask`).
#[derive(Debug, Clone)]
pub struct AggregatorClient {
    rpc: JsonRpcHttp,
}

impl AggregatorClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self { rpc: JsonRpcHttp::new(url) }
    }

    pub fn url(&self) -> &str {
        self.rpc.url()
    }
}

#[async_trait]
impl Aggregator for AggregatorClient {
    async fn submit_task(&self, submission: &SignedSubmission) -> Result<(), SubmitError> {
        let digest = submission.digest;
        let request = TaskRequest::from(submission);

        let result: Option<serde_json::Value> =
            match self.rpc.call("aggregator_submitTask", serde_json::json!([request])).await {
                Ok(result) => result,
                Err(RpcCallError::Rpc { code, message, .. }) => {
                    return Err(SubmitError::Rejected {
                        digest,
                        reason: format!("code={code}: {message}"),
                    });
                }
                Err(e) => return Err(SubmitError::Transport(e)),
            };

        if let Some(serde_json::Value::Bool(false)) = result {
            return Err(SubmitError::Rejected { digest, reason: "aggregator returned false".into() });
        }

        tracing::debug!(
            target: "attestor::aggregator",
            digest = %digest,
            operator_id = %submission.operator_id,
            "task accepted"
        );
        Ok(())
    }
}
