//! Checkpoint store adapters.

use async_trait::async_trait;
use conductor_application::{CheckpointStore, CheckpointStoreError};
use conductor_domain::{CheckpointId, CheckpointRecord};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Checkpoints held in a map; lost when the process exits.
#[derive(Default)]
pub struct InMemoryCheckpointStore {
    records: Mutex<HashMap<CheckpointId, CheckpointRecord>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CheckpointId, CheckpointRecord>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn put(&self, record: CheckpointRecord) -> Result<(), CheckpointStoreError> {
        self.lock().insert(record.checkpoint_id.clone(), record);
        Ok(())
    }

    async fn get(&self, id: &CheckpointId) -> Result<Option<CheckpointRecord>, CheckpointStoreError> {
        Ok(self.lock().get(id).cloned())
    }
}

/// One JSON file per checkpoint id under a directory.
///
/// Writes go to a temporary file that is renamed over the target, so a
/// reader never sees a half-written record.
pub struct FileCheckpointStore {
    directory: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// `None` for ids that could escape the directory.
    fn path_for(&self, id: &CheckpointId) -> Option<PathBuf> {
        let id = id.as_str();
        let safe = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        safe.then(|| self.directory.join(format!("{}.json", id)))
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn put(&self, record: CheckpointRecord) -> Result<(), CheckpointStoreError> {
        let path = self.path_for(&record.checkpoint_id).ok_or_else(|| {
            CheckpointStoreError::Io(format!(
                "invalid checkpoint id '{}'",
                record.checkpoint_id
            ))
        })?;
        let json = serde_json::to_string_pretty(&record)
            .map_err(|e| CheckpointStoreError::Serialization(e.to_string()))?;

        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| CheckpointStoreError::Io(e.to_string()))?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| CheckpointStoreError::Io(e.to_string()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| CheckpointStoreError::Io(e.to_string()))?;

        debug!("Wrote checkpoint {}", path.display());
        Ok(())
    }

    async fn get(&self, id: &CheckpointId) -> Result<Option<CheckpointRecord>, CheckpointStoreError> {
        let Some(path) = self.path_for(id) else {
            return Ok(None);
        };
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CheckpointStoreError::Io(e.to_string())),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| CheckpointStoreError::Serialization(e.to_string()))
    }
}
