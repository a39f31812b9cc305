//! Resumable chain log tracing for the attestor operator.
//!
//! This crate watches a source chain for logs that need attestation:
//! - Polling the chain head and `eth_getLogs` over JSON-RPC
//! - Holding back a confirmation lag so shallow reorgs never reach the handler
//! - Dispatching logs in `(block, log index)` order
//! - Persisting a checkpoint after each fully handled window
//!
//! # Quick Start
//!
//! ```ignore
//! use attestor_tracer::{FileCheckpoint, JsonRpcChainClient, LogTracer, TracerConfig};
//!
//! let client = Arc::new(JsonRpcChainClient::new("http://localhost:8545"));
//! let config = TracerConfig::builder().topics(vec![vec![COMMIT_BATCH_TOPIC]]).build();
//! let tracer = LogTracer::new(client, FileCheckpoint::new("offset"), handler, config);
//!
//! tracer.run(cancel).await?;
//! ```

mod chain;
mod error;
mod persistence;
mod tracer;


pub use chain::{ChainClient, JsonRpcChainClient};
pub use error::{ChainRpcError, TracerError, Transient};
pub use persistence::{CheckpointStore, FileCheckpoint, SqliteCheckpoint};
pub use tracer::{scan_target, CycleOutcome, LogHandler, LogTracer, TracerConfig};
