//! Domain layer for conductor
//!
//! This crate contains the entities, value objects and rules of turn
//! orchestration. It has no dependencies on infrastructure concerns and
//! performs no I/O.
//!
//! # Core Concepts
//!
//! ## Turn
//!
//! A [`Turn`] is one user task moving through the phase state machine:
//!
//! ```text
//! Queued → Analyzing → Routing → Executing ⇄ Evaluating → Scoring → Done
//!    └──────────── fast path ─────────────────────────────────────→ Done
//! ```
//!
//! `Failed` and `Cancelled` are reachable from any non-terminal state.
//!
//! ## Routing
//!
//! A [`RoutingDecision`] assigns workers from the [`WorkerRegistry`] and picks
//! an [`ExecutionMode`]. Decisions are cached under a [`Fingerprint`].
//!
//! ## Approvals
//!
//! Execution may pause on an [`ApprovalRequest`] until an
//! [`ApprovalResponse`] (or expiry) resolves it.

pub mod approval;
pub mod checkpoint;
pub mod conversation;
pub mod core;
pub mod event;
pub mod fast_path;
pub mod request;
pub mod routing;
pub mod turn;

pub use approval::{
    ApprovalDecision, ApprovalError, ApprovalOutcome, ApprovalRequest, ApprovalResponse,
    ApprovalStatus, OperationDescriptor, RiskLevel,
};
pub use checkpoint::{CheckpointRecord, SNAPSHOT_VERSION, SnapshotError, TurnSnapshot};
pub use conversation::{Conversation, ConversationEntry, Role};
pub use crate::core::{
    error::DomainError,
    ids::{ApprovalRequestId, CheckpointId, ConversationId, TurnId, WorkerId},
    string::{normalize_task_text, truncate},
};
pub use event::{TurnEvent, TurnEventKind, TurnResult};
pub use fast_path::{FastPathClassifier, KeywordSimplicityHeuristic, SimplicityHeuristic};
pub use request::{NewTurnRequest, RawTurnRequest, RequestError, ResumeRequest, TurnRequest};
pub use routing::{
    ExecutionMode, Fingerprint, RejectionPolicy, RoutingDecision, Subtask, WorkerProfile,
    WorkerRegistry,
};
pub use turn::{
    AnalysisReport, Contribution, ContributionStatus, ErrorKind, ExecutionArtifact, PhaseResults,
    ProgressDecision, ProgressEvaluation, ProgressVerdict, QualityScore, TaskComplexity, Turn,
    TurnFailure, TurnState,
};
