//! Commit-log handling: proof, header, signature, submission.

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use async_trait::async_trait;

use attestor_pipeline::{
    build_state_header, Aggregator, BlsSigner, ProofOutcome, ProofSource, SubmissionSchema,
    SubmitError,
};
use attestor_tracer::{ChainClient, LogHandler};
use attestor_types::{OperatorId, QuorumConfig, RawLogEvent};

use super::OperatorError;

/// Immutable identity and protocol settings shared by the operator's tasks.
#[derive(Debug, Clone)]
pub struct OperatorIdentity {
    pub address: Address,
    pub operator_id: OperatorId,
    pub identifier: U256,
    pub quorum: QuorumConfig,
    pub schema: SubmissionSchema,
}

/// [`LogHandler`] turning each commit log into a signed header at the aggregator.
pub struct AttestationHandler {
    chain: Arc<dyn ChainClient>,
    proofs: Arc<dyn ProofSource>,
    aggregator: Arc<dyn Aggregator>,
    signer: Arc<BlsSigner>,
    identity: Arc<OperatorIdentity>,
}

impl AttestationHandler {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        proofs: Arc<dyn ProofSource>,
        aggregator: Arc<dyn Aggregator>,
        signer: Arc<BlsSigner>,
        identity: Arc<OperatorIdentity>,
    ) -> Self {
        Self { chain, proofs, aggregator, signer, identity }
    }
}

#[async_trait]
impl LogHandler for AttestationHandler {
    type Error = OperatorError;

    async fn on_new_log(&self, log: &RawLogEvent) -> Result<(), OperatorError> {
        let tx_hash = log.tx_hash;
        let head = self
            .chain
            .block_number()
            .await
            .map_err(|source| OperatorError::ChainHead { tx_hash, source })?;

        let poe = match self.proofs.get_proof(log).await? {
            ProofOutcome::Proof(poe) => poe,
            ProofOutcome::Skip => {
                tracing::info!(
                    target: "attestor::operator",
                    tx = %tx_hash,
                    block = log.block_number,
                    "skipping batch"
                );
                return Ok(());
            }
        };

        let identity = &self.identity;
        let header = build_state_header(&poe, head, identity.identifier, &identity.quorum);
        let submission =
            self.signer.sign_header(header, identity.operator_id, identity.schema.includes_pubkey());

        tracing::debug!(
            target: "attestor::operator",
            batch_id = poe.batch_id,
            start_block = poe.start_block,
            end_block = poe.end_block,
            reference_block = submission.header.reference_block_number,
            digest = %submission.digest,
            "signed state header"
        );

        match self.aggregator.submit_task(&submission).await {
            Ok(()) => {
                tracing::info!(
                    target: "attestor::operator",
                    batch_id = poe.batch_id,
                    tx = %tx_hash,
                    digest = %submission.digest,
                    "submitted task"
                );
                Ok(())
            }
            Err(SubmitError::Rejected { digest, reason }) => {
                // the event is handled; a rejected header is not retried
                tracing::warn!(
                    target: "attestor::operator",
                    batch_id = poe.batch_id,
                    tx = %tx_hash,
                    %digest,
                    %reason,
                    "aggregator rejected task"
                );
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
