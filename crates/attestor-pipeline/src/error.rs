//! Error types for proof retrieval, signing and submission.

use alloy_primitives::B256;
use attestor_tracer::ChainRpcError;
use thiserror::Error;

/// Failure of a JSON-RPC call to the prover or the aggregator.
#[derive(Debug, Error)]
pub enum RpcCallError {
    /// Endpoint unreachable, timed out, or answered with an unreadable body.
    #[error("HTTP error calling {method}: {message}")]
    Http { method: &'static str, message: String },

    #[error("RPC error from {method}: code={code}, message={message}")]
    Rpc { method: &'static str, code: i64, message: String },

    #[error("{0} returned no result")]
    MissingResult(&'static str),
}

impl RpcCallError {
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Http { .. })
    }
}

/// Why `commitBatch` call data could not be turned into a block range.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CallDataError {
    #[error("not a commitBatch call: {0}")]
    Abi(String),

    #[error("chunk {0} is empty")]
    EmptyChunk(usize),

    #[error("chunk {chunk} declares {blocks} blocks but has {len} bytes")]
    TruncatedChunk { chunk: usize, blocks: usize, len: usize },

    #[error("batch commits no blocks")]
    NoBlocks,
}

/// Errors from a [`ProofSource`](crate::ProofSource) or
/// [`AttestationReporter`](crate::AttestationReporter).
#[derive(Debug, Error)]
pub enum ProofError {
    #[error("prover call failed for tx {tx_hash}: {source}")]
    Prover {
        tx_hash: B256,
        #[source]
        source: RpcCallError,
    },

    #[error("chain query failed for tx {tx_hash}: {source}")]
    Chain {
        tx_hash: B256,
        #[source]
        source: ChainRpcError,
    },

    #[error("malformed call data in tx {tx_hash}: {source}")]
    CallData {
        tx_hash: B256,
        #[source]
        source: CallDataError,
    },

    #[error("log from tx {tx_hash} has no topic {index}")]
    MissingTopic { tx_hash: B256, index: usize },

    #[error("unexpected proof for tx {tx_hash}: {reason}")]
    Malformed { tx_hash: B256, reason: String },

    #[error("attestation report request failed: {0}")]
    Report(#[source] RpcCallError),
}

impl ProofError {
    /// Whether retrying later could succeed without anything else changing.
    pub fn is_transport(&self) -> bool {
        match self {
            Self::Prover { source, .. } | Self::Report(source) => source.is_transport(),
            Self::Chain { source, .. } => source.is_transport(),
            _ => false,
        }
    }
}

/// Errors submitting a signed header to the aggregator.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("aggregator unreachable: {0}")]
    Transport(#[source] RpcCallError),

    /// The aggregator answered and refused the task.
    #[error("aggregator rejected task {digest}: {reason}")]
    Rejected { digest: B256, reason: String },
}

impl SubmitError {
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// BLS key and signature handling errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SigningError {
    #[error("invalid BLS secret key: {0}")]
    InvalidSecretKey(String),

    #[error("invalid BLS public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid BLS signature: {0}")]
    InvalidSignature(String),

    #[error("nothing to aggregate")]
    EmptyAggregate,

    #[error("signature verification failed: {0}")]
    Verification(String),
}

/// Quorum parameters that the on-chain verifier would reject.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuorumError {
    #[error("{numbers} quorum numbers but {thresholds} threshold percentages")]
    LengthMismatch { numbers: usize, thresholds: usize },

    #[error("quorum {quorum} threshold {threshold}% exceeds 100")]
    ThresholdAbove100 { quorum: u8, threshold: u8 },

    #[error("no quorums configured")]
    Empty,
}
