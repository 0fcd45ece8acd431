//! Single-flight guard per conversation.
//!
//! At most one turn runs per conversation. A second attempt fails fast with
//! [`ConcurrentExecutionError`]; nothing is queued. The returned
//! [`GuardToken`] releases the conversation when dropped, so every exit path
//! of the orchestrator releases exactly once.

use conductor_domain::{ConversationId, TurnId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Another workflow is already running in conversation {conversation_id} (turn {running})")]
pub struct ConcurrentExecutionError {
    pub conversation_id: ConversationId,
    pub running: TurnId,
}

type RunningMap = Arc<Mutex<HashMap<ConversationId, TurnId>>>;

fn lock(running: &RunningMap) -> MutexGuard<'_, HashMap<ConversationId, TurnId>> {
    running.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Clone, Default)]
pub struct ConcurrencyGuard {
    running: RunningMap,
}

impl ConcurrencyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(
        &self,
        conversation_id: &ConversationId,
        turn_id: &TurnId,
    ) -> Result<GuardToken, ConcurrentExecutionError> {
        let mut running = lock(&self.running);
        if let Some(current) = running.get(conversation_id) {
            warn!(
                "Conversation {} is busy with turn {}, rejecting turn {}",
                conversation_id, current, turn_id
            );
            return Err(ConcurrentExecutionError {
                conversation_id: conversation_id.clone(),
                running: current.clone(),
            });
        }
        running.insert(conversation_id.clone(), turn_id.clone());
        debug!("Conversation {} acquired by turn {}", conversation_id, turn_id);

        Ok(GuardToken {
            running: self.running.clone(),
            conversation_id: conversation_id.clone(),
            turn_id: turn_id.clone(),
        })
    }

    /// Release a token explicitly. Equivalent to dropping it.
    pub fn release(&self, token: GuardToken) {
        drop(token);
    }

    /// The turn currently holding `conversation_id`, if any.
    pub fn running(&self, conversation_id: &ConversationId) -> Option<TurnId> {
        lock(&self.running).get(conversation_id).cloned()
    }
}

/// Proof of holding a conversation. Releases on drop.
pub struct GuardToken {
    running: RunningMap,
    conversation_id: ConversationId,
    turn_id: TurnId,
}

impl GuardToken {
    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    pub fn turn_id(&self) -> &TurnId {
        &self.turn_id
    }
}

impl Drop for GuardToken {
    fn drop(&mut self) {
        let mut running = lock(&self.running);
        if running.get(&self.conversation_id) == Some(&self.turn_id) {
            running.remove(&self.conversation_id);
            debug!(
                "Conversation {} released by turn {}",
                self.conversation_id, self.turn_id
            );
        }
    }
}
