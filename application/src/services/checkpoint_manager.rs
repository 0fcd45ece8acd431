//! Checkpoint manager.
//!
//! Snapshots a [`Turn`] into a [`CheckpointRecord`] and restores it. A turn
//! keeps one checkpoint id for its lifetime; every save overwrites it.

use crate::ports::checkpoint_store::{CheckpointStore, CheckpointStoreError};
use crate::ports::clock::Clock;
use conductor_domain::{CheckpointId, CheckpointRecord, SnapshotError, Turn, TurnSnapshot};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("Checkpoint not found: {0}")]
    NotFound(CheckpointId),

    #[error("Checkpoint store error: {0}")]
    Store(#[from] CheckpointStoreError),

    #[error("Invalid snapshot: {0}")]
    Snapshot(#[from] SnapshotError),
}

pub struct CheckpointManager {
    store: Arc<dyn CheckpointStore>,
    clock: Arc<dyn Clock>,
}

impl CheckpointManager {
    pub fn new(store: Arc<dyn CheckpointStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Persist the turn, assigning its checkpoint id on first save.
    pub async fn save(&self, turn: &mut Turn) -> Result<CheckpointId, CheckpointError> {
        let checkpoint_id = turn.checkpoint_id_or_assign(CheckpointId::generate);
        self.put(&checkpoint_id, turn).await?;
        debug!(
            "Checkpoint {} saved for turn {} at {} (round {})",
            checkpoint_id,
            turn.id(),
            turn.state(),
            turn.round_count()
        );
        Ok(checkpoint_id)
    }

    /// Overwrite the checkpoint of a finished turn with its terminal
    /// snapshot, so it can no longer be resumed.
    ///
    /// Turns that never saved a checkpoint are left alone.
    pub async fn retire(&self, turn: &Turn) -> Result<Option<CheckpointId>, CheckpointError> {
        let Some(checkpoint_id) = turn.checkpoint_id().cloned() else {
            return Ok(None);
        };
        if !turn.is_terminal() {
            return Ok(None);
        }
        self.put(&checkpoint_id, turn).await?;
        info!(
            "Checkpoint {} retired: turn {} finished as {}",
            checkpoint_id,
            turn.id(),
            turn.state()
        );
        Ok(Some(checkpoint_id))
    }

    async fn put(&self, checkpoint_id: &CheckpointId, turn: &Turn) -> Result<(), CheckpointError> {
        let state = TurnSnapshot::new(turn.clone()).encode()?;
        let record = CheckpointRecord {
            checkpoint_id: checkpoint_id.clone(),
            conversation_id: turn.conversation_id().clone(),
            state,
            saved_at: self.clock.now(),
        };
        self.store.put(record).await?;
        Ok(())
    }

    /// Restore the turn saved under `checkpoint_id`.
    pub async fn load(&self, checkpoint_id: &CheckpointId) -> Result<Turn, CheckpointError> {
        let record = self
            .store
            .get(checkpoint_id)
            .await?
            .ok_or_else(|| CheckpointError::NotFound(checkpoint_id.clone()))?;
        let snapshot = TurnSnapshot::decode(&record.state)?;
        info!(
            "Checkpoint {} loaded: turn {} at {} (round {})",
            checkpoint_id,
            snapshot.turn.id(),
            snapshot.turn.state(),
            snapshot.turn.round_count()
        );
        Ok(snapshot.turn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::clock::ManualClock;
    use async_trait::async_trait;
    use chrono::Utc;
    use conductor_domain::{ConversationId, TurnId, TurnState};
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MapStore(Mutex<HashMap<CheckpointId, CheckpointRecord>>);

    #[async_trait]
    impl CheckpointStore for MapStore {
        async fn put(&self, record: CheckpointRecord) -> Result<(), CheckpointStoreError> {
            self.0
                .lock()
                .unwrap()
                .insert(record.checkpoint_id.clone(), record);
            Ok(())
        }

        async fn get(
            &self,
            id: &CheckpointId,
        ) -> Result<Option<CheckpointRecord>, CheckpointStoreError> {
            Ok(self.0.lock().unwrap().get(id).cloned())
        }
    }

    fn manager() -> (CheckpointManager, Arc<MapStore>) {
        let store = Arc::new(MapStore::default());
        (
            CheckpointManager::new(store.clone(), Arc::new(ManualClock::default())),
            store,
        )
    }

    fn executing_turn() -> Turn {
        let now = Utc::now();
        let mut turn = Turn::new(TurnId::new("t"), ConversationId::new("c"), "task", now)
            .with_checkpointing(true);
        for state in [TurnState::Analyzing, TurnState::Routing, TurnState::Executing] {
            turn.transition(state, now).unwrap();
        }
        turn
    }

    #[tokio::test]
    async fn test_save_then_load_restores_phase_and_round() {
        let (manager, _store) = manager();
        let mut turn = executing_turn();
        turn.begin_refinement("tighten", 3).unwrap();

        let id = manager.save(&mut turn).await.unwrap();
        let restored = manager.load(&id).await.unwrap();
        assert_eq!(restored.state(), TurnState::Executing);
        assert_eq!(restored.round_count(), 1);
        assert_eq!(restored.checkpoint_id(), Some(&id));
    }

    #[tokio::test]
    async fn test_resave_overwrites_same_id() {
        let (manager, store) = manager();
        let mut turn = executing_turn();
        let first = manager.save(&mut turn).await.unwrap();
        turn.begin_refinement("again", 3).unwrap();
        let second = manager.save(&mut turn).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.0.lock().unwrap().len(), 1);
        assert_eq!(manager.load(&first).await.unwrap().round_count(), 1);
    }

    #[tokio::test]
    async fn test_retired_checkpoint_cannot_be_loaded() {
        let (manager, store) = manager();
        let mut turn = executing_turn();
        let id = manager.save(&mut turn).await.unwrap();

        turn.transition(TurnState::Cancelled, Utc::now()).unwrap();
        assert_eq!(manager.retire(&turn).await.unwrap(), Some(id.clone()));
        assert_eq!(store.0.lock().unwrap().len(), 1);

        let err = manager.load(&id).await.unwrap_err();
        assert!(matches!(
            err,
            CheckpointError::Snapshot(SnapshotError::TerminalTurn(TurnState::Cancelled))
        ));
    }

    #[tokio::test]
    async fn test_retire_without_checkpoint_is_noop() {
        let (manager, store) = manager();
        let mut turn = Turn::new(TurnId::new("t"), ConversationId::new("c"), "task", Utc::now());
        turn.transition(TurnState::Cancelled, Utc::now()).unwrap();

        assert_eq!(manager.retire(&turn).await.unwrap(), None);
        assert!(store.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_load_missing() {
        let (manager, _store) = manager();
        let err = manager.load(&CheckpointId::new("nope")).await.unwrap_err();
        assert!(matches!(err, CheckpointError::NotFound(id) if id.as_str() == "nope"));
    }

    #[tokio::test]
    async fn test_load_corrupt_state() {
        let (manager, store) = manager();
        store.0.lock().unwrap().insert(
            CheckpointId::new("bad"),
            CheckpointRecord {
                checkpoint_id: CheckpointId::new("bad"),
                conversation_id: ConversationId::new("c"),
                state: "not a snapshot".into(),
                saved_at: Utc::now(),
            },
        );
        let err = manager.load(&CheckpointId::new("bad")).await.unwrap_err();
        assert!(matches!(err, CheckpointError::Snapshot(_)));
    }
}
