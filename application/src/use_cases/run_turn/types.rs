//! Type definitions for the RunTurn use case.

use crate::services::checkpoint_manager::CheckpointError;
use crate::services::concurrency_guard::ConcurrentExecutionError;
use conductor_domain::{
    CheckpointId, DomainError, ErrorKind, Turn, TurnFailure, TurnResult, TurnState,
};
use thiserror::Error;

/// Requests rejected before any turn runs.
///
/// Nothing is emitted on the event stream for these; the transport layer
/// reports them directly.
#[derive(Error, Debug)]
pub enum RunTurnError {
    #[error(transparent)]
    ConcurrentExecution(#[from] ConcurrentExecutionError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Checkpoint not found: {0}")]
    CheckpointNotFound(CheckpointId),

    #[error("Checkpoint could not be restored: {0}")]
    Checkpoint(CheckpointError),
}

impl RunTurnError {
    /// Stable kind for clients.
    pub fn error_kind(&self) -> ErrorKind {
        match self {
            RunTurnError::ConcurrentExecution(_) => ErrorKind::ConcurrentExecution,
            RunTurnError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            RunTurnError::CheckpointNotFound(_) => ErrorKind::CheckpointNotFound,
            RunTurnError::Checkpoint(_) => ErrorKind::CheckpointError,
        }
    }
}

impl From<CheckpointError> for RunTurnError {
    fn from(e: CheckpointError) -> Self {
        match e {
            CheckpointError::NotFound(id) => RunTurnError::CheckpointNotFound(id),
            other => RunTurnError::Checkpoint(other),
        }
    }
}

/// Output from the RunTurn use case
#[derive(Debug, Clone)]
pub struct RunTurnOutput {
    /// Final (terminal) state of the turn
    pub turn: Turn,
    /// Present when the turn reached `Done`
    pub result: Option<TurnResult>,
}

impl RunTurnOutput {
    pub fn succeeded(&self) -> bool {
        self.turn.state() == TurnState::Done
    }
}

/// Why a phase stopped early.
#[derive(Debug)]
pub(super) enum PhaseError {
    Cancelled,
    Failed(TurnFailure),
    /// A turn invariant was violated while advancing.
    Invariant(DomainError),
}

impl PhaseError {
    pub(super) fn failed(kind: ErrorKind, message: impl Into<String>) -> Self {
        PhaseError::Failed(TurnFailure::new(kind, message))
    }
}

impl From<DomainError> for PhaseError {
    fn from(e: DomainError) -> Self {
        PhaseError::Invariant(e)
    }
}

/// Kind reported when an invariant breaks inside `state`.
pub(super) fn invariant_kind(state: TurnState) -> ErrorKind {
    match state {
        TurnState::Queued | TurnState::Analyzing => ErrorKind::AnalysisError,
        TurnState::Routing => ErrorKind::RoutingError,
        TurnState::Scoring => ErrorKind::ScoringError,
        _ => ErrorKind::ExecutionError,
    }
}
