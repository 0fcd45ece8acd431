//! Turn domain
//!
//! A [`Turn`](entities::Turn) is one user task moving through the phase
//! state machine defined in [`state`]. Per-phase payloads live in
//! [`value_objects`]; terminal failures carry a stable [`ErrorKind`](failure::ErrorKind).

pub mod entities;
pub mod failure;
pub mod state;
pub mod value_objects;

pub use entities::{PhaseResults, Turn};
pub use failure::{ErrorKind, TurnFailure};
pub use state::TurnState;
pub use value_objects::{
    AnalysisReport, Contribution, ContributionStatus, ExecutionArtifact, ProgressDecision,
    ProgressEvaluation, ProgressVerdict, QualityScore, TaskComplexity,
};
