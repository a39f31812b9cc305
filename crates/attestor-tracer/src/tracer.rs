//! Checkpointed log tracer.
//!
//! Each cycle scans one window of confirmed blocks past the checkpoint, hands every matching log
//! to a [`LogHandler`] in `(block, log index)` order, and only then moves the checkpoint to the
//! end of the window. A crash anywhere inside a window replays the whole window on restart.

use std::{sync::Arc, time::Duration};

use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use bon::Builder;
use tokio_util::sync::CancellationToken;

use attestor_types::RawLogEvent;

use super::{ChainClient, CheckpointStore, TracerError, Transient};

/// Receives every log matched by the tracer.
#[async_trait]
pub trait LogHandler: Send + Sync {
    type Error: Transient + Send + Sync + 'static;

    async fn on_new_log(&self, log: &RawLogEvent) -> Result<(), Self::Error>;
}

#[async_trait]
impl<T: LogHandler + ?Sized> LogHandler for Arc<T> {
    type Error = T::Error;

    async fn on_new_log(&self, log: &RawLogEvent) -> Result<(), Self::Error> {
        (**self).on_new_log(log).await
    }
}

/// Tracer filter and pacing.
#[derive(Debug, Clone, Builder)]
pub struct TracerConfig {
    /// Name used in log output.
    #[builder(into, default = "log-tracer".to_string())]
    pub id: String,

    /// Emitting contracts; empty matches any address.
    #[builder(default)]
    pub addresses: Vec<Address>,

    /// Positional topic sets, as in `eth_getLogs`.
    #[builder(default)]
    pub topics: Vec<Vec<B256>>,

    /// Blocks below the head that are not scanned yet.
    #[builder(default = 5)]
    pub confirmation_lag: u64,

    /// Upper bound on the size of one scan window.
    #[builder(default = 100)]
    pub max_blocks_per_window: u64,

    /// Pause between cycles and after failures.
    #[builder(default = Duration::from_secs(12))]
    pub poll_interval: Duration,

    /// Log and drop logs whose handler fails instead of retrying the window.
    /// Transport failures are always retried.
    #[builder(default = true)]
    pub skip_on_error: bool,
}

/// Result of one successful [`LogTracer::scan_once`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No confirmed blocks past the checkpoint.
    Idle { checkpoint: u64, head: u64 },
    /// Window `[from, to]` handled and checkpointed at `to`.
    Advanced { from: u64, to: u64, dispatched: usize, skipped: usize },
}

/// Last block of the next scan window, or None if nothing is confirmed past `checkpoint`.
///
/// `min(checkpoint + max_blocks, head - lag)`, saturating at zero.
pub fn scan_target(
    checkpoint: u64,
    head: u64,
    confirmation_lag: u64,
    max_blocks_per_window: u64,
) -> Option<u64> {
    let confirmed = head.saturating_sub(confirmation_lag);
    let target = checkpoint.saturating_add(max_blocks_per_window).min(confirmed);
    (target > checkpoint).then_some(target)
}

/// Polls the chain for logs and drives a handler with checkpointed progress.
pub struct LogTracer<S, H> {
    client: Arc<dyn ChainClient>,
    store: S,
    handler: H,
    config: TracerConfig,
}

impl<S, H> LogTracer<S, H>
where
    S: CheckpointStore,
    H: LogHandler,
{
    pub fn new(client: Arc<dyn ChainClient>, store: S, handler: H, config: TracerConfig) -> Self {
        Self { client, store, handler, config }
    }

    pub fn config(&self) -> &TracerConfig {
        &self.config
    }

    /// Last fully processed block, or None if the tracer never completed a window.
    pub fn get_checkpoint(&self) -> Result<Option<u64>, TracerError> {
        self.store.load_checkpoint().map_err(TracerError::Checkpoint)
    }

    pub fn set_checkpoint(&self, block_number: u64) -> Result<(), TracerError> {
        self.store.save_checkpoint(block_number).map_err(TracerError::Checkpoint)
    }

    /// Run one scan cycle.
    pub async fn scan_once(&self) -> Result<CycleOutcome, TracerError> {
        let checkpoint = self.get_checkpoint()?.unwrap_or(0);
        let head = self.client.block_number().await?;

        let Some(target) = scan_target(
            checkpoint,
            head,
            self.config.confirmation_lag,
            self.config.max_blocks_per_window,
        ) else {
            return Ok(CycleOutcome::Idle { checkpoint, head });
        };

        let from = checkpoint + 1;
        let mut logs = self
            .client
            .get_logs(from, target, &self.config.addresses, &self.config.topics)
            .await?;
        logs.sort_by_key(RawLogEvent::position);

        tracing::debug!(
            target: "attestor::tracer",
            id = %self.config.id,
            from,
            to = target,
            head,
            logs = logs.len(),
            "scanning window"
        );

        let mut dispatched = 0;
        let mut skipped = 0;
        for log in &logs {
            if log.block_number < from || log.block_number > target {
                tracing::warn!(
                    target: "attestor::tracer",
                    id = %self.config.id,
                    block = log.block_number,
                    from,
                    to = target,
                    "node returned log outside requested range, ignoring"
                );
                continue;
            }

            dispatched += 1;
            if let Err(e) = self.handler.on_new_log(log).await {
                if e.is_transport() {
                    return Err(TracerError::Unreachable {
                        block: log.block_number,
                        log_index: log.log_index,
                        tx_hash: log.tx_hash,
                        reason: e.to_string(),
                    });
                }
                if !self.config.skip_on_error {
                    return Err(TracerError::Handler {
                        block: log.block_number,
                        log_index: log.log_index,
                        tx_hash: log.tx_hash,
                        reason: e.to_string(),
                    });
                }

                skipped += 1;
                tracing::warn!(
                    target: "attestor::tracer",
                    id = %self.config.id,
                    block = log.block_number,
                    log_index = log.log_index,
                    tx = %log.tx_hash,
                    error = %e,
                    "handler failed, skipping log"
                );
            }
        }

        self.set_checkpoint(target)?;

        Ok(CycleOutcome::Advanced { from, to: target, dispatched, skipped })
    }

    /// Scan until cancelled or the checkpoint store fails.
    ///
    /// Cancellation is observed between cycles; a window in flight is finished first.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), TracerError> {
        tracing::info!(
            target: "attestor::tracer",
            id = %self.config.id,
            lag = self.config.confirmation_lag,
            window = self.config.max_blocks_per_window,
            interval = ?self.config.poll_interval,
            skip_on_error = self.config.skip_on_error,
            "starting log tracer"
        );

        while !cancel.is_cancelled() {
            match self.scan_once().await {
                Ok(CycleOutcome::Advanced { from, to, dispatched, skipped }) => {
                    tracing::info!(
                        target: "attestor::tracer",
                        id = %self.config.id,
                        from,
                        to,
                        dispatched,
                        skipped,
                        "checkpoint advanced"
                    );
                }
                Ok(CycleOutcome::Idle { checkpoint, head }) => {
                    tracing::trace!(
                        target: "attestor::tracer",
                        id = %self.config.id,
                        checkpoint,
                        head,
                        "no confirmed blocks"
                    );
                }
                Err(TracerError::Checkpoint(e)) => {
                    tracing::error!(
                        target: "attestor::tracer",
                        id = %self.config.id,
                        error = %e,
                        "checkpoint store failed"
                    );
                    return Err(TracerError::Checkpoint(e));
                }
                Err(e) => {
                    tracing::warn!(
                        target: "attestor::tracer",
                        id = %self.config.id,
                        error = %e,
                        "scan cycle failed, retrying window"
                    );
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }

        tracing::info!(target: "attestor::tracer", id = %self.config.id, "log tracer stopped");
        Ok(())
    }
}
