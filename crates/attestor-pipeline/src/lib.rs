//! Attestation pipeline: from a commit log to a signed state header at the aggregator.
//!
//! This crate provides the per-event stages of the operator:
//! - Proof retrieval from the hardware prover or by local simulation
//! - State header construction and its keccak256 digest
//! - BLS12-381 signing and signature aggregation
//! - Submission to the aggregator over JSON-RPC

mod aggregator;
mod error;
mod header;
mod prover;
mod rpc;
mod signer;

#[cfg(test)]
mod tests;

pub use aggregator::{Aggregator, AggregatorClient, SubmissionSchema};
pub use error::{CallDataError, ProofError, QuorumError, RpcCallError, SigningError, SubmitError};
pub use header::{
    build_state_header, encode_metadata, header_digest, pack_proof, validate_quorum,
    PACKED_PROOF_LEN, THRESHOLD_DENOMINATOR,
};
pub use prover::{
    decode_block_range, quote_report_data, simulation_quote, AttestationReporter, LiveProver,
    ProofOutcome, ProofSource, SimulationProver, BLOCK_CONTEXT_SIZE, SIMULATION_QUOTE_LEN,
};
pub use signer::{
    aggregate_signatures, verify_aggregate, verify_signature, BlsSigner, BLS_DST, PUBLIC_KEY_LEN,
    SIGNATURE_LEN,
};
