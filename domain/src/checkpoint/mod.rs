//! Checkpoint domain
//!
//! A [`CheckpointRecord`] is what a storage backend persists; its `state`
//! blob is an encoded [`TurnSnapshot`].

use crate::core::ids::{CheckpointId, ConversationId};
use crate::turn::Turn;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Errors decoding a snapshot.
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Malformed snapshot: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Unsupported snapshot version {found} (expected {SNAPSHOT_VERSION})")]
    UnsupportedVersion { found: u32 },

    #[error("Snapshot holds a finished turn ({0})")]
    TerminalTurn(crate::turn::TurnState),
}

/// Persisted checkpoint, looked up by `checkpoint_id` only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointRecord {
    pub checkpoint_id: CheckpointId,
    pub conversation_id: ConversationId,
    /// Opaque to storage backends.
    pub state: String,
    pub saved_at: DateTime<Utc>,
}

/// Orchestrator state captured at a suspension point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnSnapshot {
    pub version: u32,
    pub turn: Turn,
}

impl TurnSnapshot {
    pub fn new(turn: Turn) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            turn,
        }
    }

    pub fn encode(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode and check that the snapshot can be resumed.
    pub fn decode(state: &str) -> Result<Self, SnapshotError> {
        let snapshot: TurnSnapshot = serde_json::from_str(state)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: snapshot.version,
            });
        }
        if snapshot.turn.is_terminal() {
            return Err(SnapshotError::TerminalTurn(snapshot.turn.state()));
        }
        Ok(snapshot)
    }
}
