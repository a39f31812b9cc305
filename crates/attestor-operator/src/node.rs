//! Operator startup and task wiring.

use std::{path::PathBuf, sync::Arc};

use alloy_primitives::{Address, U256};
use bon::Builder;
use tokio_util::sync::CancellationToken;

use attestor_pipeline::{
    validate_quorum, Aggregator, AggregatorClient, AttestationReporter, BlsSigner, LiveProver,
    ProofSource, SimulationProver, SubmissionSchema,
};
use attestor_tracer::{
    ChainClient, CheckpointStore, FileCheckpoint, JsonRpcChainClient, LogTracer, SqliteCheckpoint,
    TracerConfig,
};
use attestor_types::{OperatorId, QuorumConfig};

use super::{
    config::{CheckpointBackend, OperatorConfig},
    registry::{read_provider, signing_provider, RegistryCoordinator, TeeLivenessVerifier},
    AttestationHandler, AttestationManager, AttestationRegistry, Clock, OperatorError,
    OperatorIdentity, OperatorRegistry, RenewalConfig, SystemClock,
};

/// A fully wired operator, ready to [`start`](OperatorNode::start).
#[derive(Builder)]
pub struct OperatorNode {
    chain: Arc<dyn ChainClient>,
    proofs: Arc<dyn ProofSource>,
    reporter: Arc<dyn AttestationReporter>,
    aggregator: Arc<dyn Aggregator>,
    attestation_registry: Arc<dyn AttestationRegistry>,
    operator_registry: Arc<dyn OperatorRegistry>,
    signer: Arc<BlsSigner>,
    checkpoint: Box<dyn CheckpointStore>,
    tracer: TracerConfig,

    /// Coordination-layer operator account.
    operator_address: Address,

    #[builder(default)]
    simulation: bool,

    #[builder(default)]
    identifier: U256,

    #[builder(default)]
    quorum: QuorumConfig,

    #[builder(default)]
    schema: SubmissionSchema,

    #[builder(default)]
    renewal: RenewalConfig,

    #[builder(default = Arc::new(SystemClock) as Arc<dyn Clock>)]
    clock: Arc<dyn Clock>,
}

impl OperatorNode {
    /// Wire live clients from a loaded config.
    ///
    /// `checkpoint` overrides the configured checkpoint location.
    pub fn from_config(
        config: &OperatorConfig,
        checkpoint: Option<PathBuf>,
    ) -> eyre::Result<Self> {
        let signer = Arc::new(config.load_bls_signer()?);
        let chain: Arc<dyn ChainClient> =
            Arc::new(JsonRpcChainClient::new(&config.task_fetcher.endpoint));

        let (proofs, reporter): (Arc<dyn ProofSource>, Arc<dyn AttestationReporter>) =
            if config.simulation {
                let prover = Arc::new(SimulationProver::new(chain.clone()));
                (prover.clone() as Arc<dyn ProofSource>, prover as Arc<dyn AttestationReporter>)
            } else {
                let prover = Arc::new(LiveProver::new(config.prover_url.clone()));
                (prover.clone() as Arc<dyn ProofSource>, prover as Arc<dyn AttestationReporter>)
            };

        let attestation_provider =
            signing_provider(config.attestation_rpc_url.parse()?, config.load_attestation_signer()?);
        let eth_provider = read_provider(config.eth_rpc_url.parse()?);

        let path = checkpoint.unwrap_or_else(|| config.checkpoint_path());
        let checkpoint: Box<dyn CheckpointStore> = match config.task_fetcher.checkpoint_backend {
            CheckpointBackend::File => Box::new(FileCheckpoint::new(&path)),
            CheckpointBackend::Sqlite => Box::new(SqliteCheckpoint::open(&path)?),
        };
        tracing::info!(
            target: "attestor::persistence",
            path = %path.display(),
            backend = ?config.task_fetcher.checkpoint_backend,
            "using checkpoint store"
        );

        Ok(Self::builder()
            .chain(chain)
            .proofs(proofs)
            .reporter(reporter)
            .aggregator(Arc::new(AggregatorClient::new(config.aggregator_url.clone())))
            .attestation_registry(Arc::new(TeeLivenessVerifier::new(
                config.tee_liveness_verifier_address,
                attestation_provider,
            )))
            .operator_registry(Arc::new(RegistryCoordinator::new(
                config.registry_coordinator_address,
                eth_provider,
            )))
            .signer(signer)
            .checkpoint(checkpoint)
            .tracer(config.tracer_config())
            .operator_address(config.operator_address)
            .simulation(config.simulation)
            .identifier(config.identifier())
            .quorum(config.quorum())
            .schema(config.submission_schema)
            .renewal(RenewalConfig { margin: config.renewal_margin(), retry: config.retry.clone() })
            .build())
    }

    async fn check_registered(&self) -> Result<OperatorId, OperatorError> {
        let address = self.operator_address;
        if !self.operator_registry.is_operator_registered(address).await? {
            return Err(OperatorError::NotRegistered(address));
        }
        Ok(self.operator_registry.operator_id(address).await?)
    }

    /// Run the operator until `cancel` fires or the tracer fails.
    ///
    /// Startup checks the simulation flag against the attestation registry and the operator's
    /// coordination-layer registration, then completes a first attestation pass before any
    /// event is handled. Renewal runs in its own task afterwards.
    pub async fn start(self, cancel: CancellationToken) -> Result<(), OperatorError> {
        tracing::info!(target: "attestor::operator", "starting operator");
        validate_quorum(&self.quorum)?;

        let remote = self.attestation_registry.simulation().await?;
        if remote != self.simulation {
            return Err(OperatorError::SimulationMismatch { local: self.simulation, remote });
        }

        let operator_id = self.check_registered().await?;

        let manager = Arc::new(AttestationManager::new(
            self.attestation_registry.clone(),
            self.reporter.clone(),
            &self.signer,
            self.renewal.clone(),
            self.clock.clone(),
        ));
        manager.ensure_registered().await?;

        tracing::info!(
            target: "attestor::operator",
            %operator_id,
            address = %self.operator_address,
            commitment = %manager.commitment(),
            simulation = self.simulation,
            "operator started"
        );

        let renewal = tokio::spawn({
            let manager = manager.clone();
            let cancel = cancel.clone();
            async move { manager.run(cancel).await }
        });

        let identity = Arc::new(OperatorIdentity {
            address: self.operator_address,
            operator_id,
            identifier: self.identifier,
            quorum: self.quorum,
            schema: self.schema,
        });
        let handler = AttestationHandler::new(
            self.chain.clone(),
            self.proofs,
            self.aggregator,
            self.signer,
            identity,
        );
        let tracer = LogTracer::new(self.chain, self.checkpoint, handler, self.tracer);

        let result = tracer.run(cancel.clone()).await;

        cancel.cancel();
        if let Err(e) = renewal.await {
            tracing::error!(target: "attestor::attestation", error = %e, "renewal task panicked");
        }

        result.map_err(Into::into)
    }
}
