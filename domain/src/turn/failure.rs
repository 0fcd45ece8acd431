//! Stable failure kinds.
//!
//! Clients branch on [`ErrorKind::as_str`] (the `errorKind` field of
//! `turn.failed`), never on the human-readable message.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable, machine-readable error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Reasoning module failed or timed out during Analyzing.
    AnalysisError,
    /// Reasoning module did not answer in time outside of Analyzing.
    ReasoningTimeout,
    /// Reasoning module failed to produce a routing decision.
    RoutingError,
    /// Routing decision names workers outside the registry.
    InvalidRoutingDecision,
    /// Routing decision assigns zero workers.
    NoWorkersAssigned,
    /// Execution runtime reported a failure.
    ExecutionError,
    /// Execution runtime produced no chunk within the step timeout.
    ExecutionTimeout,
    /// A rejected approval aborted the turn.
    ApprovalRejected,
    /// An expired approval aborted the turn.
    ApprovalTimeout,
    /// Reasoning module failed to produce a quality score.
    ScoringError,
    /// Checkpoint could not be written or read.
    CheckpointError,
    /// Another turn is already running in the conversation.
    ConcurrentExecution,
    /// Malformed new-turn or resume request.
    InvalidRequest,
    /// Resume referenced an unknown checkpoint.
    CheckpointNotFound,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::AnalysisError => "analysis_error",
            ErrorKind::ReasoningTimeout => "reasoning_timeout",
            ErrorKind::RoutingError => "routing_error",
            ErrorKind::InvalidRoutingDecision => "invalid_routing_decision",
            ErrorKind::NoWorkersAssigned => "no_workers_assigned",
            ErrorKind::ExecutionError => "execution_error",
            ErrorKind::ExecutionTimeout => "execution_timeout",
            ErrorKind::ApprovalRejected => "approval_rejected",
            ErrorKind::ApprovalTimeout => "approval_timeout",
            ErrorKind::ScoringError => "scoring_error",
            ErrorKind::CheckpointError => "checkpoint_error",
            ErrorKind::ConcurrentExecution => "concurrent_execution",
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::CheckpointNotFound => "checkpoint_not_found",
        }
    }

    /// Kinds that are rejected before a turn exists (no `turn.failed` is emitted).
    pub fn is_transport_level(&self) -> bool {
        matches!(
            self,
            ErrorKind::ConcurrentExecution
                | ErrorKind::InvalidRequest
                | ErrorKind::CheckpointNotFound
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a turn ended in `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl TurnFailure {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}
