//! Operator configuration file.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use alloy::signers::local::PrivateKeySigner;
use alloy_primitives::{Address, B256, U256};
use eyre::{eyre, WrapErr};
use serde::{Deserialize, Serialize};

use attestor_pipeline::{validate_quorum, BlsSigner, SubmissionSchema};
use attestor_tracer::TracerConfig;
use attestor_types::QuorumConfig;

/// Default seconds before expiry at which the attestation is renewed.
pub const DEFAULT_RENEWAL_MARGIN_SECS: u64 = 300;

/// Capped exponential backoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryConfig {
    /// Delay before the first retry.
    pub base_delay_secs: u64,

    /// Growth factor per consecutive failure.
    pub multiplier: f64,

    /// Upper bound on any single delay.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { base_delay_secs: 1, multiplier: 2.0, max_delay_secs: 60 }
    }
}

impl RetryConfig {
    /// Delay before retry number `attempt` (0-based).
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let delay = self.base_delay_secs as f64 * self.multiplier.powi(attempt.min(64) as i32);
        Duration::from_secs(delay.min(self.max_delay_secs as f64) as u64)
    }
}

/// Which durable record holds the tracer checkpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CheckpointBackend {
    /// Decimal block number in a text file.
    #[default]
    File,
    Sqlite,
}

/// Commit-log scanning on the source chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskFetcherConfig {
    /// Source chain JSON-RPC endpoint.
    pub endpoint: String,

    #[serde(default)]
    pub topics: Vec<Vec<B256>>,

    #[serde(default)]
    pub addresses: Vec<Address>,

    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u64,

    #[serde(default = "default_confirmation_lag")]
    pub confirmation_lag: u64,

    #[serde(default = "default_max_blocks_per_window")]
    pub max_blocks_per_window: u64,

    #[serde(default = "default_true")]
    pub skip_on_error: bool,

    /// Checkpoint location.
    pub offset_file: PathBuf,

    #[serde(default)]
    pub checkpoint_backend: CheckpointBackend,
}

fn default_scan_interval_secs() -> u64 {
    12
}

fn default_confirmation_lag() -> u64 {
    5
}

fn default_max_blocks_per_window() -> u64 {
    100
}

fn default_true() -> bool {
    true
}

fn default_renewal_margin_secs() -> u64 {
    DEFAULT_RENEWAL_MARGIN_SECS
}

fn default_quorum_numbers() -> Vec<u8> {
    QuorumConfig::default().quorum_numbers
}

fn default_threshold_percentages() -> Vec<u8> {
    QuorumConfig::default().threshold_percentages
}

/// Everything the operator node reads at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorConfig {
    /// Protocol identifier placed in every state header.
    pub identifier: u64,

    /// Derive proofs locally instead of asking the hardware prover.
    #[serde(default)]
    pub simulation: bool,

    /// Hardware prover JSON-RPC endpoint. Unused in simulation.
    #[serde(default)]
    pub prover_url: String,

    pub aggregator_url: String,

    /// Chain hosting the coordination-layer operator registry.
    pub eth_rpc_url: String,

    /// Chain hosting the attestation registry.
    pub attestation_rpc_url: String,

    pub tee_liveness_verifier_address: Address,

    pub registry_coordinator_address: Address,

    /// Operator account registered with the coordination layer.
    pub operator_address: Address,

    /// Hex-encoded 32-byte BLS secret key.
    pub bls_key_file: PathBuf,

    /// Hex-encoded ECDSA key paying for attestation transactions.
    pub attestation_ecdsa_key_file: PathBuf,

    #[serde(default)]
    pub submission_schema: SubmissionSchema,

    #[serde(default = "default_quorum_numbers")]
    pub quorum_numbers: Vec<u8>,

    #[serde(default = "default_threshold_percentages")]
    pub quorum_threshold_percentages: Vec<u8>,

    #[serde(default = "default_renewal_margin_secs")]
    pub renewal_margin_secs: u64,

    #[serde(default)]
    pub retry: RetryConfig,

    pub task_fetcher: TaskFetcherConfig,

    /// Directory relative paths are resolved against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl OperatorConfig {
    /// Read and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).wrap_err_with(|| format!("reading {}", path.display()))?;
        let mut config: Self =
            serde_json::from_str(&raw).wrap_err_with(|| format!("parsing {}", path.display()))?;
        config.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> eyre::Result<()> {
        if self.task_fetcher.max_blocks_per_window == 0 {
            return Err(eyre!("taskFetcher.maxBlocksPerWindow must be positive"));
        }
        if !self.simulation && self.prover_url.is_empty() {
            return Err(eyre!("proverUrl is required outside simulation"));
        }
        if self.retry.base_delay_secs == 0 || self.retry.multiplier < 1.0 {
            return Err(eyre!("retry needs a positive base delay and a multiplier of at least 1"));
        }
        validate_quorum(&self.quorum())?;
        Ok(())
    }

    pub fn quorum(&self) -> QuorumConfig {
        QuorumConfig {
            quorum_numbers: self.quorum_numbers.clone(),
            threshold_percentages: self.quorum_threshold_percentages.clone(),
        }
    }

    pub fn identifier(&self) -> U256 {
        U256::from(self.identifier)
    }

    pub fn renewal_margin(&self) -> Duration {
        Duration::from_secs(self.renewal_margin_secs)
    }

    pub fn tracer_config(&self) -> TracerConfig {
        let fetcher = &self.task_fetcher;
        TracerConfig::builder()
            .id("operator-log-tracer")
            .addresses(fetcher.addresses.clone())
            .topics(fetcher.topics.clone())
            .confirmation_lag(fetcher.confirmation_lag)
            .max_blocks_per_window(fetcher.max_blocks_per_window)
            .poll_interval(Duration::from_secs(fetcher.scan_interval_secs))
            .skip_on_error(fetcher.skip_on_error)
            .build()
    }

    /// Resolve a configured path against the config file's directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    pub fn checkpoint_path(&self) -> PathBuf {
        self.resolve(&self.task_fetcher.offset_file)
    }

    pub fn load_bls_signer(&self) -> eyre::Result<BlsSigner> {
        let secret = read_hex_key(&self.resolve(&self.bls_key_file))?;
        Ok(BlsSigner::from_bytes(&secret)?)
    }

    pub fn load_attestation_signer(&self) -> eyre::Result<PrivateKeySigner> {
        let path = self.resolve(&self.attestation_ecdsa_key_file);
        let secret = read_hex_key(&path)?;
        PrivateKeySigner::from_slice(&secret)
            .map_err(|e| eyre!("invalid ECDSA key in {}: {e}", path.display()))
    }
}

/// Hex key file contents; surrounding whitespace and a `0x` prefix are allowed.
fn read_hex_key(path: &Path) -> eyre::Result<Vec<u8>> {
    let raw = fs::read_to_string(path).wrap_err_with(|| format!("reading {}", path.display()))?;
    let trimmed = raw.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    hex::decode(digits).wrap_err_with(|| format!("decoding hex key in {}", path.display()))
}
