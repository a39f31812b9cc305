//! Prover-less proof reconstruction for simulation deployments.
//!
//! The block range comes from the `commitBatch` call data, the state roots from the block headers
//! at both ends of the range, and the batch hash from the commit log itself.

use std::sync::{Arc, Mutex};

use alloy_primitives::{keccak256, Bytes, B256, U256};
use alloy_sol_types::{sol, SolCall};
use async_trait::async_trait;
use schnellru::{ByLength, LruMap};

use attestor_tracer::{ChainClient, ChainRpcError};
use attestor_types::{ProofOfExecution, RawLogEvent};

use super::{AttestationReporter, ProofOutcome, ProofSource};
use crate::{CallDataError, ProofError};

sol! {
    /// Rollup batch commitment entry point.
    function commitBatch(
        uint8 version,
        bytes parentBatchHeader,
        bytes[] chunks,
        bytes skippedL1MessageBitmap
    );
}

/// Size of one block context inside a chunk; the first 8 bytes are the block number.
pub const BLOCK_CONTEXT_SIZE: usize = 60;

/// Topic carrying the indexed batch index of the commit event.
const BATCH_INDEX_TOPIC: usize = 1;
/// Topic carrying the batch hash of the commit event.
const BATCH_HASH_TOPIC: usize = 2;

const STATE_ROOT_CACHE_SIZE: u32 = 256;

const QUOTE_HEADER_LEN: usize = 48;
const QUOTE_BODY_LEN: usize = 384;
const QUOTE_REPORT_DATA_OFFSET: usize = QUOTE_HEADER_LEN + 320;
const QUOTE_VERSION: u16 = 3;
const QUOTE_ATTESTATION_KEY_TYPE: u16 = 2;

/// Length of a quote produced by [`simulation_quote`].
pub const SIMULATION_QUOTE_LEN: usize = QUOTE_HEADER_LEN + QUOTE_BODY_LEN;

/// Recover the first and last committed block from `commitBatch` call data.
///
/// Each chunk is a block count byte followed by that many [`BLOCK_CONTEXT_SIZE`]-byte contexts.
/// A batch holding a single block yields `(n, n)`.
pub fn decode_block_range(input: &[u8]) -> Result<(u64, u64), CallDataError> {
    let call = commitBatchCall::abi_decode(input).map_err(|e| CallDataError::Abi(e.to_string()))?;

    let mut range: Option<(u64, u64)> = None;
    for (index, chunk) in call.chunks.iter().enumerate() {
        let Some((&count, contexts)) = chunk.split_first() else {
            return Err(CallDataError::EmptyChunk(index));
        };

        let blocks = count as usize;
        if contexts.len() < blocks * BLOCK_CONTEXT_SIZE {
            return Err(CallDataError::TruncatedChunk { chunk: index, blocks, len: chunk.len() });
        }

        for context in contexts.chunks_exact(BLOCK_CONTEXT_SIZE).take(blocks) {
            let mut number = [0u8; 8];
            number.copy_from_slice(&context[..8]);
            let number = u64::from_be_bytes(number);
            range = Some(match range {
                None => (number, number),
                Some((start, _)) => (start, number),
            });
        }
    }

    range.ok_or(CallDataError::NoBlocks)
}

/// Deterministic stand-in for a hardware quote.
///
/// Laid out like an SGX DCAP v3 quote (48-byte header, 384-byte report body) with
/// `keccak256(pubkey)` in the first half of the report data, and no signature section.
pub fn simulation_quote(pubkey: &[u8]) -> Bytes {
    let mut quote = vec![0u8; SIMULATION_QUOTE_LEN];
    quote[0..2].copy_from_slice(&QUOTE_VERSION.to_le_bytes());
    quote[2..4].copy_from_slice(&QUOTE_ATTESTATION_KEY_TYPE.to_le_bytes());
    quote[QUOTE_REPORT_DATA_OFFSET..QUOTE_REPORT_DATA_OFFSET + 32]
        .copy_from_slice(keccak256(pubkey).as_slice());
    quote.into()
}

/// The public key commitment bound in a quote's report data.
pub fn quote_report_data(quote: &[u8]) -> Option<B256> {
    quote.get(QUOTE_REPORT_DATA_OFFSET..QUOTE_REPORT_DATA_OFFSET + 32).map(B256::from_slice)
}

/// [`ProofSource`] that derives proofs from the source chain alone.
pub struct SimulationProver {
    chain: Arc<dyn ChainClient>,
    state_roots: Mutex<LruMap<u64, B256>>,
}

impl std::fmt::Debug for SimulationProver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationProver").finish_non_exhaustive()
    }
}

impl SimulationProver {
    pub fn new(chain: Arc<dyn ChainClient>) -> Self {
        Self { chain, state_roots: Mutex::new(LruMap::new(ByLength::new(STATE_ROOT_CACHE_SIZE))) }
    }

    fn cached_root(&self, number: u64) -> Option<B256> {
        self.state_roots.lock().ok()?.get(&number).copied()
    }

    async fn state_root(&self, number: u64) -> Result<B256, ChainRpcError> {
        if let Some(root) = self.cached_root(number) {
            return Ok(root);
        }

        let root = self.chain.state_root(number).await?;
        if let Ok(mut cache) = self.state_roots.lock() {
            cache.insert(number, root);
        }
        Ok(root)
    }
}

#[async_trait]
impl ProofSource for SimulationProver {
    async fn get_proof(&self, log: &RawLogEvent) -> Result<ProofOutcome, ProofError> {
        let tx_hash = log.tx_hash;
        let batch_hash = log
            .topic(BATCH_HASH_TOPIC)
            .ok_or(ProofError::MissingTopic { tx_hash, index: BATCH_HASH_TOPIC })?;
        let batch_index = log
            .topic(BATCH_INDEX_TOPIC)
            .ok_or(ProofError::MissingTopic { tx_hash, index: BATCH_INDEX_TOPIC })?;
        let batch_id = u64::try_from(U256::from_be_bytes(batch_index.0)).map_err(|_| {
            ProofError::Malformed { tx_hash, reason: format!("batch index {batch_index} overflows u64") }
        })?;

        let input = self
            .chain
            .transaction_input(tx_hash)
            .await
            .map_err(|source| ProofError::Chain { tx_hash, source })?;
        let (start_block, end_block) =
            decode_block_range(&input).map_err(|source| ProofError::CallData { tx_hash, source })?;

        let prev_state_root = self
            .state_root(start_block)
            .await
            .map_err(|source| ProofError::Chain { tx_hash, source })?;
        let new_state_root = self
            .state_root(end_block)
            .await
            .map_err(|source| ProofError::Chain { tx_hash, source })?;

        tracing::debug!(
            target: "attestor::prover",
            tx = %tx_hash,
            batch_id,
            start_block,
            end_block,
            "simulated proof of execution"
        );

        Ok(ProofOutcome::Proof(ProofOfExecution {
            batch_id,
            start_block,
            end_block,
            prev_state_root,
            new_state_root,
            batch_hash,
        }))
    }
}

#[async_trait]
impl AttestationReporter for SimulationProver {
    async fn attestation_report(&self, pubkey: &[u8]) -> Result<Bytes, ProofError> {
        Ok(simulation_quote(pubkey))
    }
}
