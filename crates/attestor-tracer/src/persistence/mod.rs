//! Trait for abstracting checkpoint persistence so different backends can be used.
//!
//! The plain text file is the default; SQLite is available for deployments that already keep
//! operator state in a database.

mod file;
mod sqlite;

use std::sync::Arc;

pub use file::FileCheckpoint;
pub use sqlite::SqliteCheckpoint;

/// Durable record of the last fully processed block.
pub trait CheckpointStore: Send + Sync {
    /// Load the last checkpoint, or None if no checkpoint exists.
    fn load_checkpoint(&self) -> eyre::Result<Option<u64>>;

    /// Save a checkpoint atomically.
    fn save_checkpoint(&self, block_number: u64) -> eyre::Result<()>;
}

impl<T: CheckpointStore + ?Sized> CheckpointStore for Box<T> {
    fn load_checkpoint(&self) -> eyre::Result<Option<u64>> {
        (**self).load_checkpoint()
    }

    fn save_checkpoint(&self, block_number: u64) -> eyre::Result<()> {
        (**self).save_checkpoint(block_number)
    }
}

impl<T: CheckpointStore + ?Sized> CheckpointStore for Arc<T> {
    fn load_checkpoint(&self) -> eyre::Result<Option<u64>> {
        (**self).load_checkpoint()
    }

    fn save_checkpoint(&self, block_number: u64) -> eyre::Result<()> {
        (**self).save_checkpoint(block_number)
    }
}
