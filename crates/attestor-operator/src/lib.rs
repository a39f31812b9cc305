//! Threshold-attestation operator node.
//!
//! Ties the tracer and the pipeline together:
//! - [`AttestationHandler`] turns each commit log into a signed header at the aggregator
//! - [`AttestationManager`] keeps the operator key's hardware attestation from expiring
//! - [`OperatorNode`] runs the startup checks and drives both until cancelled

mod attestation;
mod error;
mod node;
mod operator;
mod registry;

pub mod config;

#[cfg(test)]
mod tests;

pub use attestation::{
    renewal_delay, AttestationManager, AttestationState, Clock, RenewalConfig, SystemClock,
};
pub use config::{OperatorConfig, RetryConfig};
pub use error::{AttestationError, OperatorError, RegistryError};
pub use node::OperatorNode;
pub use operator::{AttestationHandler, OperatorIdentity};
pub use registry::{
    read_provider, signing_provider, AttestationRegistry, OperatorRegistry, RegistryCoordinator,
    TeeLivenessVerifier,
};
