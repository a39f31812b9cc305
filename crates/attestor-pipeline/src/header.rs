//! State header construction and digest.

use alloy_primitives::{keccak256, Bytes, B256, U256};
use alloy_sol_types::SolValue;

use attestor_types::{BatchMetadata, ProofOfExecution, QuorumConfig, StateHeader};

use super::QuorumError;

/// Denominator the on-chain verifier applies to threshold percentages.
pub const THRESHOLD_DENOMINATOR: u8 = 100;

/// Length of the packed proof payload.
pub const PACKED_PROOF_LEN: usize = 96;

mod abi {
    alloy_sol_types::sol! {
        struct StateHeader {
            uint256 identifier;
            bytes metadata;
            bytes state;
            bytes quorumNumbers;
            bytes quorumThresholdPercentages;
            uint32 referenceBlockNumber;
        }
    }
}

/// `prev_state_root || new_state_root || batch_hash`.
pub fn pack_proof(poe: &ProofOfExecution) -> Bytes {
    let mut out = Vec::with_capacity(PACKED_PROOF_LEN);
    out.extend_from_slice(poe.prev_state_root.as_slice());
    out.extend_from_slice(poe.new_state_root.as_slice());
    out.extend_from_slice(poe.batch_hash.as_slice());
    out.into()
}

/// Canonical metadata bytes: `{"batchId":..,"startBlock":..,"endBlock":..}` with no whitespace.
pub fn encode_metadata(md: &BatchMetadata) -> Bytes {
    format!(
        r#"{{"batchId":{},"startBlock":{},"endBlock":{}}}"#,
        md.batch_id, md.start_block, md.end_block
    )
    .into_bytes()
    .into()
}

/// Reject quorum settings the verifier contract could never satisfy.
pub fn validate_quorum(quorum: &QuorumConfig) -> Result<(), QuorumError> {
    if quorum.quorum_numbers.is_empty() {
        return Err(QuorumError::Empty);
    }
    if quorum.quorum_numbers.len() != quorum.threshold_percentages.len() {
        return Err(QuorumError::LengthMismatch {
            numbers: quorum.quorum_numbers.len(),
            thresholds: quorum.threshold_percentages.len(),
        });
    }
    for (&quorum, &threshold) in quorum.quorum_numbers.iter().zip(&quorum.threshold_percentages) {
        if threshold > THRESHOLD_DENOMINATOR {
            return Err(QuorumError::ThresholdAbove100 { quorum, threshold });
        }
    }
    Ok(())
}

/// Build the header operators sign for `poe`.
///
/// `head` is the chain head observed while handling the event; the reference block is one below
/// it, saturating at zero and clamped to `u32`.
pub fn build_state_header(
    poe: &ProofOfExecution,
    head: u64,
    identifier: U256,
    quorum: &QuorumConfig,
) -> StateHeader {
    let reference = head.saturating_sub(1).min(u32::MAX as u64) as u32;

    StateHeader {
        identifier,
        metadata: encode_metadata(&poe.metadata()),
        state: pack_proof(poe),
        quorum_numbers: quorum.quorum_numbers.clone().into(),
        quorum_threshold_percentages: quorum.threshold_percentages.clone().into(),
        reference_block_number: reference,
    }
}

/// keccak256 of the ABI encoding of the header as a single tuple argument.
pub fn header_digest(header: &StateHeader) -> B256 {
    let encoded = abi::StateHeader {
        identifier: header.identifier,
        metadata: header.metadata.clone(),
        state: header.state.clone(),
        quorumNumbers: header.quorum_numbers.clone(),
        quorumThresholdPercentages: header.quorum_threshold_percentages.clone(),
        referenceBlockNumber: header.reference_block_number,
    }
    .abi_encode();

    keccak256(encoded)
}
