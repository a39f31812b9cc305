//! Hardware prover client.

use alloy_primitives::{Bytes, B256};
use async_trait::async_trait;
use serde::Deserialize;

use attestor_types::{ProofOfExecution, RawLogEvent};

use super::{AttestationReporter, ProofOutcome, ProofSource};
use crate::{rpc::JsonRpcHttp, ProofError, RpcCallError};

/// `prover_getPoe` result. Only `skip` may be omitted; the rest is required unless skipping.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PoeResponse {
    #[serde(default)]
    skip: bool,
    batch_id: Option<u64>,
    start_block: Option<u64>,
    end_block: Option<u64>,
    batch_hash: Option<B256>,
    prev_state_root: Option<B256>,
    new_state_root: Option<B256>,
}

impl PoeResponse {
    fn into_proof(self, tx_hash: B256) -> Result<ProofOfExecution, ProofError> {
        let missing = |field: &str| ProofError::Malformed {
            tx_hash,
            reason: format!("prover_getPoe result has no {field}"),
        };

        let poe = ProofOfExecution {
            batch_id: self.batch_id.ok_or_else(|| missing("batchId"))?,
            start_block: self.start_block.ok_or_else(|| missing("startBlock"))?,
            end_block: self.end_block.ok_or_else(|| missing("endBlock"))?,
            prev_state_root: self.prev_state_root.ok_or_else(|| missing("prevStateRoot"))?,
            new_state_root: self.new_state_root.ok_or_else(|| missing("newStateRoot"))?,
            batch_hash: self.batch_hash.ok_or_else(|| missing("batchHash"))?,
        };

        if poe.end_block < poe.start_block {
            return Err(ProofError::Malformed {
                tx_hash,
                reason: format!("block range {}..{} is reversed", poe.start_block, poe.end_block),
            });
        }
        Ok(poe)
    }
}

/// [`ProofSource`] backed by the remote prover's JSON-RPC API.
#[derive(Debug, Clone)]
pub struct LiveProver {
    rpc: JsonRpcHttp,
}

impl LiveProver {
    pub fn new(prover_url: impl Into<String>) -> Self {
        Self { rpc: JsonRpcHttp::new(prover_url) }
    }

    pub fn url(&self) -> &str {
        self.rpc.url()
    }
}

#[async_trait]
impl ProofSource for LiveProver {
    async fn get_proof(&self, log: &RawLogEvent) -> Result<ProofOutcome, ProofError> {
        let tx_hash = log.tx_hash;
        tracing::info!(
            target: "attestor::prover",
            tx = %tx_hash,
            batch = ?log.topic(2),
            "fetching proof of execution"
        );

        let resp: PoeResponse = self
            .rpc
            .call("prover_getPoe", serde_json::json!([tx_hash]))
            .await
            .and_then(|r| r.ok_or(RpcCallError::MissingResult("prover_getPoe")))
            .map_err(|source| ProofError::Prover { tx_hash, source })?;

        if resp.skip {
            tracing::debug!(target: "attestor::prover", tx = %tx_hash, "prover skipped batch");
            return Ok(ProofOutcome::Skip);
        }

        Ok(ProofOutcome::Proof(resp.into_proof(tx_hash)?))
    }
}

#[async_trait]
impl AttestationReporter for LiveProver {
    async fn attestation_report(&self, pubkey: &[u8]) -> Result<Bytes, ProofError> {
        let pubkey_hex = format!("0x{}", hex::encode(pubkey));
        let report: Bytes = self
            .rpc
            .call("prover_generateAttestationReport", serde_json::json!([pubkey_hex]))
            .await
            .and_then(|r| r.ok_or(RpcCallError::MissingResult("prover_generateAttestationReport")))
            .map_err(ProofError::Report)?;

        tracing::debug!(target: "attestor::prover", len = report.len(), "received attestation report");
        Ok(report)
    }
}
