//! Turn lifecycle states and the legal transitions between them.
//!
//! ```text
//! Queued → Analyzing → Routing → Executing ⇄ Evaluating → Scoring → Done
//!              │           │          │           │           │
//!              └───────────┴──────────┴─────┬─────┴───────────┘
//!                                           ↓
//!                                   Failed | Cancelled
//! ```
//!
//! `Queued` may also go straight to `Done` when the turn is answered on the
//! fast path.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    Queued,
    Analyzing,
    Routing,
    Executing,
    Evaluating,
    Scoring,
    Done,
    Failed,
    Cancelled,
}

impl TurnState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnState::Queued => "queued",
            TurnState::Analyzing => "analyzing",
            TurnState::Routing => "routing",
            TurnState::Executing => "executing",
            TurnState::Evaluating => "evaluating",
            TurnState::Scoring => "scoring",
            TurnState::Done => "done",
            TurnState::Failed => "failed",
            TurnState::Cancelled => "cancelled",
        }
    }

    /// Terminal states accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TurnState::Done | TurnState::Failed | TurnState::Cancelled
        )
    }

    /// Check whether `self → next` is a legal transition.
    pub fn can_transition_to(&self, next: TurnState) -> bool {
        use TurnState::*;

        if self.is_terminal() {
            return false;
        }
        if matches!(next, Failed | Cancelled) {
            return true;
        }
        matches!(
            (self, next),
            (Queued, Analyzing)
                | (Queued, Done)
                | (Analyzing, Routing)
                | (Routing, Executing)
                | (Executing, Evaluating)
                | (Evaluating, Executing)
                | (Evaluating, Scoring)
                | (Scoring, Done)
        )
    }
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use TurnState::*;

    const ALL: [TurnState; 9] = [
        Queued, Analyzing, Routing, Executing, Evaluating, Scoring, Done, Failed, Cancelled,
    ];

    #[test]
    fn test_happy_path_transitions() {
        let path = [Queued, Analyzing, Routing, Executing, Evaluating, Scoring, Done];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_refine_loop_is_legal() {
        assert!(Evaluating.can_transition_to(Executing));
        assert!(!Scoring.can_transition_to(Executing));
    }

    #[test]
    fn test_skipping_phases_is_illegal() {
        assert!(!Analyzing.can_transition_to(Executing));
        assert!(!Routing.can_transition_to(Scoring));
        assert!(!Executing.can_transition_to(Done));
    }

    #[test]
    fn test_cancel_and_fail_reachable_from_every_non_terminal_state() {
        for state in ALL.iter().filter(|s| !s.is_terminal()) {
            assert!(state.can_transition_to(Cancelled));
            assert!(state.can_transition_to(Failed));
        }
    }

    #[test]
    fn test_terminal_states_are_frozen() {
        for terminal in [Done, Failed, Cancelled] {
            for next in ALL {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn test_serde_uses_snake_case() {
        assert_eq!(serde_json::to_string(&Evaluating).unwrap(), "\"evaluating\"");
        let parsed: TurnState = serde_json::from_str("\"cancelled\"").unwrap();
        assert_eq!(parsed, Cancelled);
    }
}
