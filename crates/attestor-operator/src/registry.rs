//! On-chain registries the operator depends on.
//!
//! The attestation registry (`TEELivenessVerifier`) tracks which BLS keys have a fresh hardware
//! attestation; the coordination-layer registry tracks which operators may sign at all.

use alloy::{
    network::EthereumWallet,
    providers::{DynProvider, Provider, ProviderBuilder},
    signers::local::PrivateKeySigner,
};
use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;

use attestor_types::{AttestationRecord, OperatorId};

use super::RegistryError;

alloy::sol! {
    #[sol(rpc)]
    interface ITeeLivenessVerifier {
        function simulation() external view returns (bool);
        function verifyLivenessProof(bytes32 pubkeyHash) external view returns (bool);
        function attestedProvers(bytes32 pubkeyHash) external view returns (bytes32 pubkey, uint256 time);
        function attestValiditySeconds() external view returns (uint256);
        function submitLivenessProof(bytes report) external;
    }

    #[sol(rpc)]
    interface IRegistryCoordinator {
        function isOperatorRegistered(address operator) external view returns (bool);
        function getOperatorId(address operator) external view returns (bytes32);
    }
}

#[async_trait]
pub trait AttestationRegistry: Send + Sync {
    /// Whether the registry accepts simulated quotes.
    async fn simulation(&self) -> Result<bool, RegistryError>;

    /// Whether the key behind `commitment` holds a valid attestation right now.
    async fn is_attested(&self, commitment: B256) -> Result<bool, RegistryError>;

    async fn attestation_record(&self, commitment: B256)
        -> Result<AttestationRecord, RegistryError>;

    /// Submit an attestation report and wait for it to be mined. Returns the tx hash.
    async fn submit_liveness_proof(&self, report: Bytes) -> Result<B256, RegistryError>;
}

#[async_trait]
pub trait OperatorRegistry: Send + Sync {
    async fn is_operator_registered(&self, operator: Address) -> Result<bool, RegistryError>;

    async fn operator_id(&self, operator: Address) -> Result<OperatorId, RegistryError>;
}

fn call_error(method: &'static str, e: alloy::contract::Error) -> RegistryError {
    let transport = matches!(e, alloy::contract::Error::TransportError(_));
    RegistryError::Call { method, message: e.to_string(), transport }
}

/// Provider that signs with `signer`, for sending registry transactions.
pub fn signing_provider(rpc_url: reqwest::Url, signer: PrivateKeySigner) -> DynProvider {
    ProviderBuilder::new().wallet(EthereumWallet::from(signer)).connect_http(rpc_url).erased()
}

/// Read-only provider.
pub fn read_provider(rpc_url: reqwest::Url) -> DynProvider {
    ProviderBuilder::new().connect_http(rpc_url).erased()
}

/// [`AttestationRegistry`] backed by the `TEELivenessVerifier` contract.
#[derive(Clone)]
pub struct TeeLivenessVerifier {
    contract: ITeeLivenessVerifier::ITeeLivenessVerifierInstance<DynProvider>,
}

impl TeeLivenessVerifier {
    pub fn new(address: Address, provider: DynProvider) -> Self {
        Self { contract: ITeeLivenessVerifier::new(address, provider) }
    }

    pub fn address(&self) -> Address {
        *self.contract.address()
    }
}

#[async_trait]
impl AttestationRegistry for TeeLivenessVerifier {
    async fn simulation(&self) -> Result<bool, RegistryError> {
        self.contract.simulation().call().await.map_err(|e| call_error("simulation", e))
    }

    async fn is_attested(&self, commitment: B256) -> Result<bool, RegistryError> {
        self.contract
            .verifyLivenessProof(commitment)
            .call()
            .await
            .map_err(|e| call_error("verifyLivenessProof", e))
    }

    async fn attestation_record(
        &self,
        commitment: B256,
    ) -> Result<AttestationRecord, RegistryError> {
        let prover = self
            .contract
            .attestedProvers(commitment)
            .call()
            .await
            .map_err(|e| call_error("attestedProvers", e))?;
        let validity = self
            .contract
            .attestValiditySeconds()
            .call()
            .await
            .map_err(|e| call_error("attestValiditySeconds", e))?;

        Ok(AttestationRecord {
            pubkey_commitment: commitment,
            last_registered: prover.time.saturating_to(),
            validity_secs: validity.saturating_to(),
        })
    }

    async fn submit_liveness_proof(&self, report: Bytes) -> Result<B256, RegistryError> {
        let pending = self
            .contract
            .submitLivenessProof(report)
            .send()
            .await
            .map_err(|e| call_error("submitLivenessProof", e))?;
        let tx_hash = *pending.tx_hash();

        tracing::info!(target: "attestor::attestation", tx = %tx_hash, "submitted liveness proof");

        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| RegistryError::Receipt { tx_hash, message: e.to_string() })?;
        if !receipt.status() {
            return Err(RegistryError::Reverted { tx_hash });
        }

        Ok(tx_hash)
    }
}

/// [`OperatorRegistry`] backed by the coordination layer's registry coordinator.
#[derive(Clone)]
pub struct RegistryCoordinator {
    contract: IRegistryCoordinator::IRegistryCoordinatorInstance<DynProvider>,
}

impl RegistryCoordinator {
    pub fn new(address: Address, provider: DynProvider) -> Self {
        Self { contract: IRegistryCoordinator::new(address, provider) }
    }
}

#[async_trait]
impl OperatorRegistry for RegistryCoordinator {
    async fn is_operator_registered(&self, operator: Address) -> Result<bool, RegistryError> {
        self.contract
            .isOperatorRegistered(operator)
            .call()
            .await
            .map_err(|e| call_error("isOperatorRegistered", e))
    }

    async fn operator_id(&self, operator: Address) -> Result<OperatorId, RegistryError> {
        self.contract.getOperatorId(operator).call().await.map_err(|e| call_error("getOperatorId", e))
    }
}
