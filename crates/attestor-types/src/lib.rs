//! Shared types for the attestor crate family.

use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

/// 32-byte identity assigned to the operator by the coordination-layer registry.
pub type OperatorId = B256;

/// A log matched by the tracer's filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLogEvent {
    /// Contract that emitted the log.
    pub address: Address,
    /// Topic 0 is the event signature; indexed params follow.
    pub topics: Vec<B256>,
    /// Non-indexed event data.
    pub data: Bytes,
    pub block_number: u64,
    /// Index of the log within its block.
    pub log_index: u64,
    /// Transaction that emitted the log.
    pub tx_hash: B256,
}

impl RawLogEvent {
    #[inline]
    pub fn topic(&self, index: usize) -> Option<B256> {
        self.topics.get(index).copied()
    }

    /// Ordering key within a scan window.
    #[inline]
    pub fn position(&self) -> (u64, u64) {
        (self.block_number, self.log_index)
    }
}

/// Proof that a batch moved the source chain from one state root to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofOfExecution {
    pub batch_id: u64,
    pub start_block: u64,
    pub end_block: u64,
    pub prev_state_root: B256,
    pub new_state_root: B256,
    pub batch_hash: B256,
}

impl ProofOfExecution {
    pub fn metadata(&self) -> BatchMetadata {
        BatchMetadata {
            batch_id: self.batch_id,
            start_block: self.start_block,
            end_block: self.end_block,
        }
    }
}

/// Batch identity carried in [`StateHeader::metadata`].
///
/// Field order is part of the signed encoding: the serialized form is
/// `{"batchId":..,"startBlock":..,"endBlock":..}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchMetadata {
    pub batch_id: u64,
    pub start_block: u64,
    pub end_block: u64,
}

/// Canonical message that operators sign and the aggregator collects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateHeader {
    /// Protocol identifier (which rollup/prover family this header belongs to).
    pub identifier: U256,
    /// Serialized [`BatchMetadata`].
    pub metadata: Bytes,
    /// Packed proof payload: `prev_state_root || new_state_root || batch_hash`.
    pub state: Bytes,
    pub quorum_numbers: Bytes,
    /// Per-quorum thresholds, each interpreted against a denominator of 100.
    pub quorum_threshold_percentages: Bytes,
    /// Chain head at build time minus one.
    pub reference_block_number: u32,
}

/// Quorum parameters attached to every header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuorumConfig {
    pub quorum_numbers: Vec<u8>,
    pub threshold_percentages: Vec<u8>,
}

impl Default for QuorumConfig {
    fn default() -> Self {
        Self { quorum_numbers: vec![0], threshold_percentages: vec![0] }
    }
}

/// A signed header ready for the aggregation sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedSubmission {
    pub header: StateHeader,
    pub digest: B256,
    /// Compressed BLS signature over `digest`.
    pub signature: Bytes,
    pub operator_id: OperatorId,
    /// Serialized public key, only sent under the legacy submission schema.
    pub pubkey: Option<Bytes>,
}

/// On-chain attestation state of an operator key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttestationRecord {
    /// keccak256 of the serialized public key.
    pub pubkey_commitment: B256,
    /// Unix seconds of the last accepted attestation report.
    pub last_registered: u64,
    /// Contract-wide validity window in seconds.
    pub validity_secs: u64,
}

impl AttestationRecord {
    /// Unix seconds at which the attestation stops being valid.
    #[inline]
    pub fn deadline(&self) -> u64 {
        self.last_registered.saturating_add(self.validity_secs)
    }
}
