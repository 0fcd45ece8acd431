//! Checkpoint storage port
//!
//! Backends persist [`CheckpointRecord`]s keyed by checkpoint id. Pruning of
//! superseded records is the backend's business.

use async_trait::async_trait;
use conductor_domain::{CheckpointId, CheckpointRecord};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CheckpointStoreError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Insert or overwrite the record under its checkpoint id.
    async fn put(&self, record: CheckpointRecord) -> Result<(), CheckpointStoreError>;

    async fn get(&self, id: &CheckpointId) -> Result<Option<CheckpointRecord>, CheckpointStoreError>;
}
