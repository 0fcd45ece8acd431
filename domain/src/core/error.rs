//! Domain error types

use crate::core::ids::WorkerId;
use crate::turn::state::TurnState;
use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid turn transition: {from} -> {to}")]
    InvalidTransition { from: TurnState, to: TurnState },

    #[error("Turn already finished ({0})")]
    TurnFinished(TurnState),

    #[error("Routing decision assigns no workers")]
    NoWorkersAssigned,

    #[error("Routing decision assigns unknown workers: {}", join_ids(.0))]
    UnknownWorkers(Vec<WorkerId>),

    #[error("Round limit of {max} reached")]
    RoundLimitReached { max: u32 },

    #[error("Approval request is no longer pending")]
    ApprovalNotPending,
}

fn join_ids(ids: &[WorkerId]) -> String {
    ids.iter()
        .map(|id| id.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_workers_display() {
        let error = DomainError::UnknownWorkers(vec![WorkerId::new("ghost"), WorkerId::new("phantom")]);
        assert_eq!(
            error.to_string(),
            "Routing decision assigns unknown workers: ghost, phantom"
        );
    }

    #[test]
    fn test_invalid_transition_display() {
        let error = DomainError::InvalidTransition {
            from: TurnState::Analyzing,
            to: TurnState::Scoring,
        };
        assert_eq!(error.to_string(), "Invalid turn transition: analyzing -> scoring");
    }
}
