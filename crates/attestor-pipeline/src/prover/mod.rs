//! Proof-of-execution retrieval.
//!
//! A [`ProofSource`] maps a commit log to the state transition it proves. The operator picks one
//! implementation at startup and everything downstream is mode-agnostic:
//! - [`LiveProver`]: asks the hardware prover over JSON-RPC
//! - [`SimulationProver`]: rebuilds the proof from chain data without a prover

mod live;
mod simulation;

pub use live::LiveProver;
pub use simulation::{
    decode_block_range, quote_report_data, simulation_quote, SimulationProver,
    BLOCK_CONTEXT_SIZE, SIMULATION_QUOTE_LEN,
};

use std::sync::Arc;

use alloy_primitives::Bytes;
use async_trait::async_trait;

use attestor_types::{ProofOfExecution, RawLogEvent};

use super::ProofError;

/// What a proof source decided about one commit log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProofOutcome {
    Proof(ProofOfExecution),
    /// Duplicate or irrelevant batch; drop the event without error.
    Skip,
}

#[async_trait]
pub trait ProofSource: Send + Sync {
    async fn get_proof(&self, log: &RawLogEvent) -> Result<ProofOutcome, ProofError>;
}

/// Produces the hardware attestation report that binds an operator public key.
#[async_trait]
pub trait AttestationReporter: Send + Sync {
    async fn attestation_report(&self, pubkey: &[u8]) -> Result<Bytes, ProofError>;
}

#[async_trait]
impl<T: ProofSource + ?Sized> ProofSource for Arc<T> {
    async fn get_proof(&self, log: &RawLogEvent) -> Result<ProofOutcome, ProofError> {
        (**self).get_proof(log).await
    }
}

#[async_trait]
impl<T: AttestationReporter + ?Sized> AttestationReporter for Arc<T> {
    async fn attestation_report(&self, pubkey: &[u8]) -> Result<Bytes, ProofError> {
        (**self).attestation_report(pubkey).await
    }
}
