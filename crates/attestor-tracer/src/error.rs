//! Error types for chain access and log tracing.

use alloy_primitives::B256;
use thiserror::Error;

/// Errors returned by a [`ChainClient`](crate::ChainClient).
#[derive(Debug, Error)]
pub enum ChainRpcError {
    /// The node could not be reached or the response body was unreadable.
    #[error("HTTP error calling {method}: {message}")]
    Http { method: &'static str, message: String },

    /// The node answered with a JSON-RPC error object.
    #[error("RPC error from {method}: code={code}, message={message}")]
    Rpc { method: &'static str, code: i64, message: String },

    /// The response carried neither a result nor an error.
    #[error("{0} returned no result")]
    MissingResult(&'static str),

    #[error("block {0} not found")]
    BlockNotFound(u64),

    #[error("transaction {0} not found")]
    TransactionNotFound(B256),
}

impl ChainRpcError {
    /// Whether the failure is about reaching the node rather than about the data asked for.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Http { .. } | Self::Rpc { .. } | Self::MissingResult(_))
    }
}

/// Failure classification the tracer's retry policy depends on.
pub trait Transient: std::error::Error {
    /// Whether the failure came from an unreachable endpoint rather than from the event itself.
    ///
    /// Such failures never advance the checkpoint, whatever the skip policy says.
    fn is_transport(&self) -> bool;
}

impl Transient for ChainRpcError {
    fn is_transport(&self) -> bool {
        ChainRpcError::is_transport(self)
    }
}

/// Errors that end a tracer cycle.
#[derive(Debug, Error)]
pub enum TracerError {
    /// Chain head or log query failed; the window is retried next cycle.
    #[error("chain RPC error: {0}")]
    Chain(#[from] ChainRpcError),

    /// A handler could not reach one of its endpoints; the window is retried next cycle.
    #[error("handler endpoint unreachable at block {block} (log {log_index}, tx {tx_hash}): {reason}")]
    Unreachable { block: u64, log_index: u64, tx_hash: B256, reason: String },

    /// A handler failed and the tracer is not skip-tolerant.
    #[error("handler failed at block {block} (log {log_index}, tx {tx_hash}): {reason}")]
    Handler { block: u64, log_index: u64, tx_hash: B256, reason: String },

    /// The checkpoint could not be read or written. Unrecoverable.
    #[error("checkpoint store error: {0}")]
    Checkpoint(eyre::Report),
}
