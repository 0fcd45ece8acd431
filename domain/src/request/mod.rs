//! Turn requests
//!
//! Starting a new turn and resuming a checkpoint are mutually exclusive.
//! [`RawTurnRequest`] is the wire shape; converting it into a [`TurnRequest`]
//! rejects every ambiguous combination before anything is mutated.

use crate::core::ids::{CheckpointId, ConversationId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Malformed request errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("A request cannot carry both a message and a checkpointId")]
    MessageWithCheckpoint,

    #[error("A request must carry either a message or a checkpointId")]
    MissingMessageOrCheckpoint,

    #[error("Message must not be blank")]
    BlankMessage,

    #[error("conversationId must not be blank")]
    BlankConversationId,

    #[error("enableCheckpointing is only valid when starting a new turn")]
    CheckpointingOnResume,
}

/// Wire shape accepted from the transport layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTurnRequest {
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub checkpoint_id: Option<String>,
    #[serde(default)]
    pub enable_checkpointing: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTurnRequest {
    pub conversation_id: ConversationId,
    pub message: String,
    pub enable_checkpointing: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeRequest {
    pub conversation_id: ConversationId,
    pub checkpoint_id: CheckpointId,
}

/// A validated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnRequest {
    NewTurn(NewTurnRequest),
    Resume(ResumeRequest),
}

impl TurnRequest {
    pub fn new_turn(conversation_id: impl Into<ConversationId>, message: impl Into<String>) -> Self {
        TurnRequest::NewTurn(NewTurnRequest {
            conversation_id: conversation_id.into(),
            message: message.into(),
            enable_checkpointing: false,
        })
    }

    pub fn resume(
        conversation_id: impl Into<ConversationId>,
        checkpoint_id: impl Into<CheckpointId>,
    ) -> Self {
        TurnRequest::Resume(ResumeRequest {
            conversation_id: conversation_id.into(),
            checkpoint_id: checkpoint_id.into(),
        })
    }

    /// Enable checkpointing on a new-turn request; no effect on resume.
    pub fn with_checkpointing(mut self, enabled: bool) -> Self {
        if let TurnRequest::NewTurn(ref mut req) = self {
            req.enable_checkpointing = enabled;
        }
        self
    }

    pub fn conversation_id(&self) -> &ConversationId {
        match self {
            TurnRequest::NewTurn(req) => &req.conversation_id,
            TurnRequest::Resume(req) => &req.conversation_id,
        }
    }
}

impl TryFrom<RawTurnRequest> for TurnRequest {
    type Error = RequestError;

    fn try_from(raw: RawTurnRequest) -> Result<Self, Self::Error> {
        let conversation_id = match raw.conversation_id {
            Some(id) if !id.trim().is_empty() => ConversationId::new(id),
            _ => return Err(RequestError::BlankConversationId),
        };

        match (raw.message, raw.checkpoint_id) {
            (Some(_), Some(_)) => Err(RequestError::MessageWithCheckpoint),
            (None, None) => Err(RequestError::MissingMessageOrCheckpoint),
            (Some(message), None) => {
                if message.trim().is_empty() {
                    return Err(RequestError::BlankMessage);
                }
                Ok(TurnRequest::NewTurn(NewTurnRequest {
                    conversation_id,
                    message,
                    enable_checkpointing: raw.enable_checkpointing.unwrap_or(false),
                }))
            }
            (None, Some(checkpoint_id)) => {
                if raw.enable_checkpointing.is_some() {
                    return Err(RequestError::CheckpointingOnResume);
                }
                if checkpoint_id.trim().is_empty() {
                    return Err(RequestError::MissingMessageOrCheckpoint);
                }
                Ok(TurnRequest::Resume(ResumeRequest {
                    conversation_id,
                    checkpoint_id: CheckpointId::new(checkpoint_id),
                }))
            }
        }
    }
}
