//! Operator error types.

use alloy_primitives::{Address, B256};
use thiserror::Error;

use attestor_pipeline::{ProofError, QuorumError, SubmitError};
use attestor_tracer::{ChainRpcError, TracerError, Transient};

/// Errors talking to the on-chain registries.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("{method} failed: {message}")]
    Call { method: &'static str, message: String, transport: bool },

    #[error("waiting for receipt of {tx_hash}: {message}")]
    Receipt { tx_hash: B256, message: String },

    #[error("transaction {tx_hash} reverted")]
    Reverted { tx_hash: B256 },
}

impl RegistryError {
    pub fn is_transport(&self) -> bool {
        match self {
            Self::Call { transport, .. } => *transport,
            Self::Receipt { .. } => true,
            Self::Reverted { .. } => false,
        }
    }
}

/// A failed attestation registration or renewal step.
#[derive(Debug, Error)]
pub enum AttestationError {
    #[error("obtaining attestation report: {0}")]
    Report(#[from] ProofError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Errors handling a commit log, and fatal startup conditions.
#[derive(Debug, Error)]
pub enum OperatorError {
    #[error("reading chain head for tx {tx_hash}: {source}")]
    ChainHead {
        tx_hash: B256,
        #[source]
        source: ChainRpcError,
    },

    #[error(transparent)]
    Proof(#[from] ProofError),

    #[error(transparent)]
    Submit(#[from] SubmitError),

    #[error("operator {0} is not registered with the coordination layer")]
    NotRegistered(Address),

    #[error("simulation mode does not match the attestation registry: local {local}, remote {remote}")]
    SimulationMismatch { local: bool, remote: bool },

    #[error("registry check failed: {0}")]
    Registry(#[from] RegistryError),

    #[error("initial attestation failed: {0}")]
    Attestation(#[from] AttestationError),

    #[error(transparent)]
    Quorum(#[from] QuorumError),

    #[error(transparent)]
    Tracer(#[from] TracerError),
}

impl OperatorError {
    /// Whether the failure came from an unreachable endpoint.
    pub fn is_transport(&self) -> bool {
        match self {
            Self::ChainHead { source, .. } => source.is_transport(),
            Self::Proof(e) => e.is_transport(),
            Self::Submit(e) => e.is_transport(),
            Self::Registry(e) => e.is_transport(),
            _ => false,
        }
    }
}

impl Transient for OperatorError {
    fn is_transport(&self) -> bool {
        OperatorError::is_transport(self)
    }
}
