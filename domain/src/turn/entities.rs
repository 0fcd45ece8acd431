//! The turn entity and its lifecycle record.

use crate::core::error::DomainError;
use crate::event::TurnResult;
use crate::core::ids::{ApprovalRequestId, CheckpointId, ConversationId, TurnId};
use crate::routing::decision::RoutingDecision;
use crate::turn::failure::TurnFailure;
use crate::turn::state::TurnState;
use crate::turn::value_objects::{
    AnalysisReport, ExecutionArtifact, ProgressEvaluation, QualityScore,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Payloads accumulated per phase.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PhaseResults {
    pub analysis: Option<AnalysisReport>,
    pub routing: Option<RoutingDecision>,
    /// Whether `routing` was served from the routing cache.
    pub routed_from_cache: bool,
    /// Latest execution artifact (replaced on every round).
    pub execution: Option<ExecutionArtifact>,
    pub evaluations: Vec<ProgressEvaluation>,
    pub quality: Option<QualityScore>,
    /// Final answer text, set when the turn reaches `Done`.
    pub answer: Option<String>,
    /// Whether the answer came from the fast path.
    pub fast_path: bool,
}

/// One user task and its lifecycle.
///
/// All mutation goes through methods that refuse to touch a terminal turn,
/// so a `done`/`failed`/`cancelled` turn is immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    id: TurnId,
    conversation_id: ConversationId,
    task: String,
    state: TurnState,
    results: PhaseResults,
    round_count: u32,
    supplementary_instructions: Option<String>,
    checkpointing: bool,
    checkpoint_id: Option<CheckpointId>,
    pending_approval: Option<ApprovalRequestId>,
    failure: Option<TurnFailure>,
    created_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl Turn {
    pub fn new(
        id: TurnId,
        conversation_id: ConversationId,
        task: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            conversation_id,
            task: task.into(),
            state: TurnState::Queued,
            results: PhaseResults::default(),
            round_count: 0,
            supplementary_instructions: None,
            checkpointing: false,
            checkpoint_id: None,
            pending_approval: None,
            failure: None,
            created_at,
            finished_at: None,
        }
    }

    pub fn with_checkpointing(mut self, enabled: bool) -> Self {
        self.checkpointing = enabled;
        self
    }

    pub fn id(&self) -> &TurnId {
        &self.id
    }

    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn results(&self) -> &PhaseResults {
        &self.results
    }

    pub fn round_count(&self) -> u32 {
        self.round_count
    }

    pub fn supplementary_instructions(&self) -> Option<&str> {
        self.supplementary_instructions.as_deref()
    }

    pub fn checkpointing_enabled(&self) -> bool {
        self.checkpointing
    }

    pub fn checkpoint_id(&self) -> Option<&CheckpointId> {
        self.checkpoint_id.as_ref()
    }

    pub fn pending_approval(&self) -> Option<&ApprovalRequestId> {
        self.pending_approval.as_ref()
    }

    pub fn failure(&self) -> Option<&TurnFailure> {
        self.failure.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    fn ensure_mutable(&self) -> Result<(), DomainError> {
        if self.state.is_terminal() {
            Err(DomainError::TurnFinished(self.state))
        } else {
            Ok(())
        }
    }

    /// Move to `to`, returning the previous state.
    pub fn transition(&mut self, to: TurnState, now: DateTime<Utc>) -> Result<TurnState, DomainError> {
        self.ensure_mutable()?;
        let from = self.state;
        if !from.can_transition_to(to) {
            return Err(DomainError::InvalidTransition { from, to });
        }
        self.state = to;
        if to.is_terminal() {
            self.finished_at = Some(now);
            self.pending_approval = None;
        }
        Ok(from)
    }

    /// Transition to `Failed`, recording why.
    pub fn fail(&mut self, failure: TurnFailure, now: DateTime<Utc>) -> Result<TurnState, DomainError> {
        self.ensure_mutable()?;
        self.failure = Some(failure);
        self.transition(TurnState::Failed, now)
    }

    pub fn record_analysis(&mut self, report: AnalysisReport) -> Result<(), DomainError> {
        self.ensure_mutable()?;
        self.results.analysis = Some(report);
        Ok(())
    }

    pub fn record_routing(&mut self, decision: RoutingDecision, cached: bool) -> Result<(), DomainError> {
        self.ensure_mutable()?;
        self.results.routing = Some(decision);
        self.results.routed_from_cache = cached;
        Ok(())
    }

    pub fn record_execution(&mut self, artifact: ExecutionArtifact) -> Result<(), DomainError> {
        self.ensure_mutable()?;
        self.results.execution = Some(artifact);
        Ok(())
    }

    pub fn record_evaluation(&mut self, evaluation: ProgressEvaluation) -> Result<(), DomainError> {
        self.ensure_mutable()?;
        self.results.evaluations.push(evaluation);
        Ok(())
    }

    pub fn record_quality(&mut self, score: QualityScore) -> Result<(), DomainError> {
        self.ensure_mutable()?;
        self.results.quality = Some(score);
        Ok(())
    }

    pub fn record_answer(&mut self, answer: impl Into<String>) -> Result<(), DomainError> {
        self.ensure_mutable()?;
        self.results.answer = Some(answer.into());
        Ok(())
    }

    /// Answer produced by the fast path, bypassing every phase.
    pub fn record_fast_path_answer(&mut self, answer: impl Into<String>) -> Result<(), DomainError> {
        self.ensure_mutable()?;
        self.results.answer = Some(answer.into());
        self.results.fast_path = true;
        Ok(())
    }

    /// The final result, once the turn is `Done`.
    pub fn result(&self) -> Option<TurnResult> {
        if self.state != TurnState::Done {
            return None;
        }
        Some(TurnResult {
            text: self.results.answer.clone().unwrap_or_default(),
            quality: self.results.quality.clone(),
            fast_path: self.results.fast_path,
            rounds: self.round_count,
        })
    }

    /// Whether another Executing round is allowed under `max_round_count`.
    pub fn can_refine(&self, max_round_count: u32) -> bool {
        self.round_count < max_round_count
    }

    /// Start a refinement round: bump `round_count` and store the instructions
    /// for the next dispatch. Returns the new round number.
    pub fn begin_refinement(
        &mut self,
        instructions: impl Into<String>,
        max_round_count: u32,
    ) -> Result<u32, DomainError> {
        self.ensure_mutable()?;
        if !self.can_refine(max_round_count) {
            return Err(DomainError::RoundLimitReached {
                max: max_round_count,
            });
        }
        self.round_count += 1;
        self.supplementary_instructions = Some(instructions.into());
        Ok(self.round_count)
    }

    pub fn set_pending_approval(&mut self, request: Option<ApprovalRequestId>) -> Result<(), DomainError> {
        self.ensure_mutable()?;
        self.pending_approval = request;
        Ok(())
    }

    /// Assign the checkpoint id on first save; later saves keep it.
    pub fn checkpoint_id_or_assign(&mut self, generate: impl FnOnce() -> CheckpointId) -> CheckpointId {
        self.checkpoint_id.get_or_insert_with(generate).clone()
    }
}
