//! Operator tests against in-memory chain, prover, aggregator and registries.


use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
        Arc, Mutex, Once,
    },
};

use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use tokio::time::Instant;

use attestor_pipeline::{
    quote_report_data, Aggregator, BlsSigner, ProofError, ProofOutcome, ProofSource, RpcCallError,
    SubmitError,
};
use attestor_tracer::{ChainClient, ChainRpcError};
use attestor_types::{AttestationRecord, OperatorId, ProofOfExecution, RawLogEvent, SignedSubmission};

use super::{AttestationRegistry, Clock, OperatorRegistry, RegistryError};

pub(crate) const CONTRACT: Address = Address::new([0xc0; 20]);
pub(crate) const OPERATOR: Address = Address::new([0x0a; 20]);
pub(crate) const OPERATOR_ID: OperatorId = B256::new([0x1d; 32]);

/// Unix time at which every test starts.
pub(crate) const T0: u64 = 10_000;

static TRACING: Once = Once::new();

pub(crate) fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new("attestor=debug"))
            .with_test_writer()
            .try_init();
    });
}

pub(crate) fn signer() -> Arc<BlsSigner> {
    Arc::new(BlsSigner::from_seed(&[7u8; 32]).unwrap())
}

pub(crate) fn commit_log(block_number: u64, log_index: u64) -> RawLogEvent {
    RawLogEvent {
        address: CONTRACT,
        topics: vec![B256::repeat_byte(0x01), B256::with_last_byte(block_number as u8)],
        data: Bytes::new(),
        block_number,
        log_index,
        tx_hash: B256::with_last_byte(block_number as u8),
    }
}

// ============================================================================
// Clock
// ============================================================================

/// Unix clock driven by tokio's (pausable) time, starting at [`T0`].
pub(crate) struct TestClock {
    start: Instant,
}

impl TestClock {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self { start: Instant::now() })
    }
}

impl Clock for TestClock {
    fn unix_now(&self) -> u64 {
        T0 + self.start.elapsed().as_secs()
    }
}

// ============================================================================
// Chain and prover
// ============================================================================

pub(crate) struct FakeChain {
    pub head: AtomicU64,
    pub logs: Vec<RawLogEvent>,
    pub unreachable: AtomicBool,
}

impl FakeChain {
    pub(crate) fn new(head: u64, logs: Vec<RawLogEvent>) -> Arc<Self> {
        Arc::new(Self { head: AtomicU64::new(head), logs, unreachable: AtomicBool::new(false) })
    }
}

#[async_trait]
impl ChainClient for FakeChain {
    async fn block_number(&self) -> Result<u64, ChainRpcError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(ChainRpcError::Http {
                method: "eth_blockNumber",
                message: "connection refused".into(),
            });
        }
        Ok(self.head.load(Ordering::SeqCst))
    }

    async fn get_logs(
        &self,
        from: u64,
        to: u64,
        _addresses: &[Address],
        _topics: &[Vec<B256>],
    ) -> Result<Vec<RawLogEvent>, ChainRpcError> {
        Ok(self
            .logs
            .iter()
            .filter(|l| l.block_number >= from && l.block_number <= to)
            .cloned()
            .collect())
    }

    async fn transaction_input(&self, tx_hash: B256) -> Result<Bytes, ChainRpcError> {
        Err(ChainRpcError::TransactionNotFound(tx_hash))
    }

    async fn state_root(&self, number: u64) -> Result<B256, ChainRpcError> {
        Err(ChainRpcError::BlockNotFound(number))
    }
}

/// Proof for a log: batch `block_number` covering the ten blocks before it.
pub(crate) fn proof_for(log: &RawLogEvent) -> ProofOfExecution {
    let n = log.block_number;
    ProofOfExecution {
        batch_id: n,
        start_block: n.saturating_sub(10),
        end_block: n,
        prev_state_root: B256::with_last_byte(0xaa),
        new_state_root: B256::with_last_byte(0xbb),
        batch_hash: log.tx_hash,
    }
}

#[derive(Default)]
pub(crate) struct FakeProofs {
    pub skip: HashSet<B256>,
    pub unreachable: HashSet<B256>,
}

#[async_trait]
impl ProofSource for FakeProofs {
    async fn get_proof(&self, log: &RawLogEvent) -> Result<ProofOutcome, ProofError> {
        if self.unreachable.contains(&log.tx_hash) {
            return Err(ProofError::Prover {
                tx_hash: log.tx_hash,
                source: RpcCallError::Http { method: "prover_getPoe", message: "timed out".into() },
            });
        }
        if self.skip.contains(&log.tx_hash) {
            return Ok(ProofOutcome::Skip);
        }
        Ok(ProofOutcome::Proof(proof_for(log)))
    }
}

// ============================================================================
// Aggregator
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum AggregatorMode {
    #[default]
    Accept,
    Reject,
    Unreachable,
}

#[derive(Default)]
pub(crate) struct RecordingAggregator {
    pub mode: Mutex<AggregatorMode>,
    pub submissions: Mutex<Vec<SignedSubmission>>,
}

impl RecordingAggregator {
    pub(crate) fn with_mode(mode: AggregatorMode) -> Arc<Self> {
        Arc::new(Self { mode: Mutex::new(mode), ..Default::default() })
    }

    pub(crate) fn submissions(&self) -> Vec<SignedSubmission> {
        self.submissions.lock().unwrap().clone()
    }
}

#[async_trait]
impl Aggregator for RecordingAggregator {
    async fn submit_task(&self, submission: &SignedSubmission) -> Result<(), SubmitError> {
        self.submissions.lock().unwrap().push(submission.clone());
        match *self.mode.lock().unwrap() {
            AggregatorMode::Accept => Ok(()),
            AggregatorMode::Reject => Err(SubmitError::Rejected {
                digest: submission.digest,
                reason: "duplicate task".into(),
            }),
            AggregatorMode::Unreachable => Err(SubmitError::Transport(RpcCallError::Http {
                method: "aggregator_submitTask",
                message: "connection refused".into(),
            })),
        }
    }
}

// ============================================================================
// Registries
// ============================================================================

/// Attestation registry holding a single key's record.
pub(crate) struct FakeAttestationRegistry {
    pub simulation: bool,
    pub validity_secs: u64,
    pub last_registered: Mutex<Option<u64>>,
    /// Unix times of accepted reports.
    pub accepted: Mutex<Vec<u64>>,
    /// Report data bound into each submitted quote.
    pub report_data: Mutex<Vec<Option<B256>>>,
    pub fail_next: AtomicUsize,
    pub attempts: AtomicUsize,
    clock: Arc<TestClock>,
}

impl FakeAttestationRegistry {
    pub(crate) fn new(clock: Arc<TestClock>, last_registered: Option<u64>) -> Arc<Self> {
        Self::with_validity(clock, last_registered, 1_000)
    }

    pub(crate) fn with_validity(
        clock: Arc<TestClock>,
        last_registered: Option<u64>,
        validity_secs: u64,
    ) -> Arc<Self> {
        Arc::new(Self {
            simulation: false,
            validity_secs,
            last_registered: Mutex::new(last_registered),
            accepted: Mutex::new(Vec::new()),
            report_data: Mutex::new(Vec::new()),
            fail_next: AtomicUsize::new(0),
            attempts: AtomicUsize::new(0),
            clock,
        })
    }

    pub(crate) fn accepted(&self) -> Vec<u64> {
        self.accepted.lock().unwrap().clone()
    }

    pub(crate) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AttestationRegistry for FakeAttestationRegistry {
    async fn simulation(&self) -> Result<bool, RegistryError> {
        Ok(self.simulation)
    }

    async fn is_attested(&self, _commitment: B256) -> Result<bool, RegistryError> {
        let now = self.clock.unix_now();
        Ok(self.last_registered.lock().unwrap().is_some_and(|t| now < t + self.validity_secs))
    }

    async fn attestation_record(
        &self,
        commitment: B256,
    ) -> Result<AttestationRecord, RegistryError> {
        Ok(AttestationRecord {
            pubkey_commitment: commitment,
            last_registered: self.last_registered.lock().unwrap().unwrap_or(0),
            validity_secs: self.validity_secs,
        })
    }

    async fn submit_liveness_proof(&self, report: Bytes) -> Result<B256, RegistryError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        let tx_hash = B256::with_last_byte(attempt as u8);

        let failing = self.fail_next.load(Ordering::SeqCst);
        if failing > 0 {
            self.fail_next.store(failing - 1, Ordering::SeqCst);
            return Err(RegistryError::Reverted { tx_hash });
        }

        let now = self.clock.unix_now();
        self.report_data.lock().unwrap().push(quote_report_data(&report));
        self.accepted.lock().unwrap().push(now);
        *self.last_registered.lock().unwrap() = Some(now);
        Ok(tx_hash)
    }
}

pub(crate) struct FakeOperatorRegistry {
    pub registered: bool,
}

#[async_trait]
impl OperatorRegistry for FakeOperatorRegistry {
    async fn is_operator_registered(&self, operator: Address) -> Result<bool, RegistryError> {
        Ok(self.registered && operator == OPERATOR)
    }

    async fn operator_id(&self, _operator: Address) -> Result<OperatorId, RegistryError> {
        Ok(OPERATOR_ID)
    }
}
