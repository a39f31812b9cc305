//! Attestation lifecycle: register the operator key once, then keep renewing it before expiry.

use std::{
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use alloy_primitives::{Bytes, B256};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use attestor_pipeline::{AttestationReporter, BlsSigner};
use attestor_types::AttestationRecord;

use super::{config::RetryConfig, AttestationError, AttestationRegistry};

/// Wall-clock source, in unix seconds.
pub trait Clock: Send + Sync {
    fn unix_now(&self) -> u64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn unix_now(&self) -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or_default()
    }
}

/// Observable progress of the attestation lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttestationState {
    Unregistered,
    Registering,
    /// Valid until `deadline` (unix seconds).
    Registered { deadline: u64 },
    /// Sleeping until `renew_at` (unix seconds).
    WaitingNearExpiry { renew_at: u64 },
    Renewing,
    /// Last step failed; retrying after `delay`.
    Backoff { attempt: u32, delay: Duration },
}

#[derive(Debug, Clone)]
pub struct RenewalConfig {
    /// How long before the deadline to renew.
    pub margin: Duration,
    pub retry: RetryConfig,
}

impl Default for RenewalConfig {
    fn default() -> Self {
        Self {
            margin: Duration::from_secs(super::config::DEFAULT_RENEWAL_MARGIN_SECS),
            retry: RetryConfig::default(),
        }
    }
}

/// Time to wait before renewing `record` at `now`; zero once inside the margin or past expiry.
pub fn renewal_delay(record: &AttestationRecord, now: u64, margin: Duration) -> Duration {
    let renew_at = record.deadline().saturating_sub(margin.as_secs());
    Duration::from_secs(renew_at.saturating_sub(now))
}

/// Owns the operator's hardware-attestation credential.
pub struct AttestationManager {
    registry: Arc<dyn AttestationRegistry>,
    reporter: Arc<dyn AttestationReporter>,
    pubkey: Bytes,
    commitment: B256,
    config: RenewalConfig,
    clock: Arc<dyn Clock>,
    state: watch::Sender<AttestationState>,
}

impl AttestationManager {
    pub fn new(
        registry: Arc<dyn AttestationRegistry>,
        reporter: Arc<dyn AttestationReporter>,
        signer: &BlsSigner,
        config: RenewalConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (state, _) = watch::channel(AttestationState::Unregistered);
        Self {
            registry,
            reporter,
            pubkey: Bytes::copy_from_slice(&signer.public_key_bytes()),
            commitment: signer.pubkey_commitment(),
            config,
            clock,
            state,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<AttestationState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> AttestationState {
        *self.state.borrow()
    }

    /// Registry key of the operator's public key.
    pub fn commitment(&self) -> B256 {
        self.commitment
    }

    fn publish(&self, state: AttestationState) {
        tracing::debug!(target: "attestor::attestation", ?state, "attestation state");
        self.state.send_replace(state);
    }

    /// First pass: register unless the registry already holds a valid attestation.
    pub async fn ensure_registered(&self) -> Result<(), AttestationError> {
        tracing::info!(
            target: "attestor::attestation",
            commitment = %self.commitment,
            "checking attestation status"
        );

        if self.registry.is_attested(self.commitment).await? {
            tracing::info!(target: "attestor::attestation", "operator key already attested");
        } else {
            self.publish(AttestationState::Registering);
            self.register().await?;
        }

        let record = self.registry.attestation_record(self.commitment).await?;
        self.publish(AttestationState::Registered { deadline: record.deadline() });
        Ok(())
    }

    async fn register(&self) -> Result<B256, AttestationError> {
        let report = self.reporter.attestation_report(&self.pubkey).await?;
        let tx_hash = self.registry.submit_liveness_proof(report).await?;
        tracing::info!(
            target: "attestor::attestation",
            tx = %tx_hash,
            commitment = %self.commitment,
            "registered attestation"
        );
        Ok(tx_hash)
    }

    /// One wait-then-renew cycle. Returns false if cancelled while waiting.
    async fn renew_cycle(&self, cancel: &CancellationToken) -> Result<bool, AttestationError> {
        let record = self.registry.attestation_record(self.commitment).await?;
        let deadline = record.deadline();
        self.publish(AttestationState::Registered { deadline });

        let now = self.clock.unix_now();
        let mut delay = renewal_delay(&record, now, self.config.margin);
        if self.config.margin.as_secs() >= record.validity_secs {
            // a fresh attestation is already inside the margin
            delay = delay.max(Duration::from_secs(self.config.retry.max_delay_secs));
            tracing::error!(
                target: "attestor::attestation",
                margin_secs = self.config.margin.as_secs(),
                validity_secs = record.validity_secs,
                wait_secs = delay.as_secs(),
                "renewal margin is not shorter than the validity window"
            );
        }
        let renew_at = now.saturating_add(delay.as_secs());
        tracing::info!(
            target: "attestor::attestation",
            deadline,
            renew_at,
            wait_secs = delay.as_secs(),
            "next attestation scheduled"
        );
        self.publish(AttestationState::WaitingNearExpiry { renew_at });

        tokio::select! {
            _ = cancel.cancelled() => return Ok(false),
            _ = tokio::time::sleep(delay) => {}
        }

        self.publish(AttestationState::Renewing);
        self.register().await?;
        Ok(true)
    }

    /// Keep the attestation fresh until cancelled.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut attempt = 0u32;

        while !cancel.is_cancelled() {
            match self.renew_cycle(&cancel).await {
                Ok(true) => attempt = 0,
                Ok(false) => break,
                Err(e) => {
                    let delay = self.config.retry.calculate_delay(attempt);
                    tracing::error!(
                        target: "attestor::attestation",
                        error = %e,
                        attempt,
                        retry_in = ?delay,
                        "attestation renewal failed"
                    );
                    self.publish(AttestationState::Backoff { attempt, delay });
                    attempt = attempt.saturating_add(1);

                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        tracing::info!(target: "attestor::attestation", "attestation renewal stopped");
    }
}
