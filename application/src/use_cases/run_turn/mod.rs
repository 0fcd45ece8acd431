//! Run Turn use case
//!
//! Drives one turn through the phase state machine:
//!
//! | State      | Collaborator                      | Fatal error kinds                          |
//! |------------|-----------------------------------|--------------------------------------------|
//! | Analyzing  | `ReasoningModule::analyze`        | `analysis_error`                           |
//! | Routing    | routing cache, then `route`       | `routing_error`, `invalid_routing_decision`, `no_workers_assigned` |
//! | Executing  | `ExecutionRuntime`, approvals     | `execution_error`, `execution_timeout`, `approval_rejected`, `approval_timeout` |
//! | Evaluating | `evaluate_progress`               | `reasoning_timeout`                        |
//! | Scoring    | `score_quality`                   | `scoring_error`, `reasoning_timeout`       |
//!
//! Simple first turns skip all of it through the fast path. The conversation
//! is held by the [`ConcurrencyGuard`](crate::services::concurrency_guard::ConcurrencyGuard)
//! for the whole run, approval waits included.

mod approval;
mod dispatch;
mod phases;
mod types;


pub use types::{RunTurnError, RunTurnOutput};

use types::{PhaseError, invariant_kind};

use crate::config::OrchestratorParams;
use crate::ports::conversation_store::ConversationStore;
use crate::ports::event_sink::{NoEventSink, TurnEventSink};
use crate::ports::execution_runtime::ExecutionRuntime;
use crate::ports::reasoning::{ReasoningError, ReasoningModule};
use crate::services::TurnServices;
use crate::use_cases::shared::{Bounded, bounded, is_cancelled};
use chrono::{DateTime, Utc};
use conductor_domain::{
    Conversation, ConversationEntry, ConversationId, ErrorKind, FastPathClassifier, NewTurnRequest,
    ResumeRequest, Turn, TurnEvent, TurnEventKind, TurnFailure, TurnId, TurnRequest, TurnState,
    WorkerRegistry,
};
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Use case for running one turn
pub struct RunTurnUseCase<R: ReasoningModule + 'static, X: ExecutionRuntime + 'static> {
    reasoning: Arc<R>,
    runtime: Arc<X>,
    conversations: Arc<dyn ConversationStore>,
    registry: Arc<WorkerRegistry>,
    services: TurnServices,
    params: OrchestratorParams,
    cancellation_token: Option<CancellationToken>,
}

impl<R, X> Clone for RunTurnUseCase<R, X>
where
    R: ReasoningModule + 'static,
    X: ExecutionRuntime + 'static,
{
    fn clone(&self) -> Self {
        Self {
            reasoning: self.reasoning.clone(),
            runtime: self.runtime.clone(),
            conversations: self.conversations.clone(),
            registry: self.registry.clone(),
            services: self.services.clone(),
            params: self.params.clone(),
            cancellation_token: self.cancellation_token.clone(),
        }
    }
}

impl<R: ReasoningModule + 'static, X: ExecutionRuntime + 'static> RunTurnUseCase<R, X> {
    pub fn new(
        reasoning: Arc<R>,
        runtime: Arc<X>,
        conversations: Arc<dyn ConversationStore>,
        registry: Arc<WorkerRegistry>,
        services: TurnServices,
    ) -> Self {
        Self {
            reasoning,
            runtime,
            conversations,
            registry,
            services,
            params: OrchestratorParams::default(),
            cancellation_token: None,
        }
    }

    pub fn with_params(mut self, params: OrchestratorParams) -> Self {
        self.params = params;
        self
    }

    /// Set a cancellation token for cooperative cancellation of the turn
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    pub fn services(&self) -> &TurnServices {
        &self.services
    }

    pub fn params(&self) -> &OrchestratorParams {
        &self.params
    }

    /// Run a turn without observing its events
    pub async fn execute(&self, request: TurnRequest) -> Result<RunTurnOutput, RunTurnError> {
        self.execute_with_events(request, &NoEventSink).await
    }

    /// Run a turn, streaming its events to `sink`
    ///
    /// Returns `Err` only for requests rejected before a turn exists; every
    /// turn that starts ends in `Ok` with a terminal state.
    pub async fn execute_with_events(
        &self,
        request: TurnRequest,
        sink: &dyn TurnEventSink,
    ) -> Result<RunTurnOutput, RunTurnError> {
        match request {
            TurnRequest::NewTurn(req) => self.start(req, sink).await,
            TurnRequest::Resume(req) => self.resume(req, sink).await,
        }
    }

    async fn start(
        &self,
        req: NewTurnRequest,
        sink: &dyn TurnEventSink,
    ) -> Result<RunTurnOutput, RunTurnError> {
        let turn_id = TurnId::generate();
        let _guard = self
            .services
            .guard
            .try_acquire(&req.conversation_id, &turn_id)?;

        info!(
            "Starting turn {} in conversation {}",
            turn_id, req.conversation_id
        );
        let mut turn = Turn::new(turn_id, req.conversation_id, req.message, self.now())
            .with_checkpointing(req.enable_checkpointing);

        let conversation = self.load_conversation(turn.conversation_id()).await;
        let thread_context = conversation
            .as_ref()
            .and_then(|c| c.thread_context().map(str::to_string));

        if let Some(conversation) = &conversation
            && FastPathClassifier::should_fast_path(
                turn.task(),
                conversation,
                self.reasoning.simplicity_heuristic(),
            )
            && self.try_fast_path(&mut turn, sink).await
        {
            return Ok(self.finish(turn).await);
        }

        self.drive(&mut turn, thread_context.as_deref(), sink).await;
        Ok(self.finish(turn).await)
    }

    async fn resume(
        &self,
        req: ResumeRequest,
        sink: &dyn TurnEventSink,
    ) -> Result<RunTurnOutput, RunTurnError> {
        let mut turn = self.services.checkpoints.load(&req.checkpoint_id).await?;
        if turn.conversation_id() != &req.conversation_id {
            return Err(RunTurnError::InvalidRequest(format!(
                "checkpoint {} does not belong to conversation {}",
                req.checkpoint_id, req.conversation_id
            )));
        }

        let _guard = self
            .services
            .guard
            .try_acquire(&req.conversation_id, turn.id())?;

        info!(
            "Resuming turn {} at {} (round {})",
            turn.id(),
            turn.state(),
            turn.round_count()
        );
        if let Some(request_id) = turn.pending_approval().cloned() {
            info!(
                "Discarding approval {} recorded in checkpoint; the round is dispatched again",
                request_id
            );
            if let Err(e) = turn.set_pending_approval(None) {
                warn!("Could not clear pending approval: {}", e);
            }
        }

        let conversation = self.load_conversation(turn.conversation_id()).await;
        let thread_context = conversation
            .as_ref()
            .and_then(|c| c.thread_context().map(str::to_string));

        self.drive(&mut turn, thread_context.as_deref(), sink).await;
        Ok(self.finish(turn).await)
    }

    /// Answer directly. Returns `true` when the turn reached a terminal
    /// state, `false` to fall back to the full pipeline.
    async fn try_fast_path(&self, turn: &mut Turn, sink: &dyn TurnEventSink) -> bool {
        info!("Turn {} takes the fast path", turn.id());
        match self.reason(self.reasoning.respond_directly(turn.task())).await {
            Bounded::Ready(Ok(answer)) => {
                let now = self.now();
                let recorded = turn
                    .record_fast_path_answer(answer)
                    .and_then(|_| turn.transition(TurnState::Done, now));
                match recorded {
                    Ok(_) => {
                        self.complete(turn, sink).await;
                        true
                    }
                    Err(e) => {
                        warn!("Fast path result could not be recorded: {}", e);
                        false
                    }
                }
            }
            Bounded::Ready(Err(e)) => {
                warn!("Fast path failed, running full pipeline: {}", e);
                false
            }
            Bounded::TimedOut => {
                warn!("Fast path timed out, running full pipeline");
                false
            }
            Bounded::Cancelled => {
                self.cancel(turn, sink);
                true
            }
        }
    }

    /// Run phases until the turn is terminal.
    async fn drive(&self, turn: &mut Turn, thread_context: Option<&str>, sink: &dyn TurnEventSink) {
        while !turn.is_terminal() {
            if is_cancelled(&self.cancellation_token) {
                self.cancel(turn, sink);
                break;
            }

            let step = match turn.state() {
                TurnState::Queued => self.advance(turn, TurnState::Analyzing, sink).await,
                TurnState::Analyzing => self.analyze(turn, sink).await,
                TurnState::Routing => self.route(turn, sink).await,
                TurnState::Executing => self.execute_round(turn, thread_context, sink).await,
                TurnState::Evaluating => self.evaluate(turn, sink).await,
                TurnState::Scoring => self.score(turn, sink).await,
                TurnState::Done | TurnState::Failed | TurnState::Cancelled => break,
            };

            match step {
                Ok(()) => {}
                Err(PhaseError::Cancelled) => self.cancel(turn, sink),
                Err(PhaseError::Failed(failure)) => self.fail(turn, failure, sink),
                Err(PhaseError::Invariant(e)) => {
                    error!("Turn {} broke an invariant in {}: {}", turn.id(), turn.state(), e);
                    let kind = invariant_kind(turn.state());
                    self.fail(turn, TurnFailure::new(kind, e.to_string()), sink);
                }
            }
        }
    }

    /// Transition and announce it. Entering Executing saves a checkpoint
    /// when checkpointing is enabled.
    async fn advance(
        &self,
        turn: &mut Turn,
        to: TurnState,
        sink: &dyn TurnEventSink,
    ) -> Result<(), PhaseError> {
        let from = turn.transition(to, self.now())?;
        info!("Turn {}: {} -> {}", turn.id(), from, to);
        self.emit(sink, turn.id(), TurnEventKind::PhaseChanged { from, to });

        if to == TurnState::Executing && turn.checkpointing_enabled() {
            self.services
                .checkpoints
                .save(turn)
                .await
                .map_err(|e| {
                    PhaseError::failed(ErrorKind::CheckpointError, e.to_string())
                })?;
        }
        Ok(())
    }

    fn fail(&self, turn: &mut Turn, failure: TurnFailure, sink: &dyn TurnEventSink) {
        let kind = failure.kind;
        let message = failure.message.clone();
        match turn.fail(failure, self.now()) {
            Ok(from) => {
                warn!("Turn {} failed ({}): {}", turn.id(), kind, message);
                self.emit(
                    sink,
                    turn.id(),
                    TurnEventKind::PhaseChanged {
                        from,
                        to: TurnState::Failed,
                    },
                );
                self.emit(
                    sink,
                    turn.id(),
                    TurnEventKind::TurnFailed {
                        error_kind: kind,
                        message,
                    },
                );
            }
            Err(e) => error!("Turn {} could not be failed: {}", turn.id(), e),
        }
    }

    fn cancel(&self, turn: &mut Turn, sink: &dyn TurnEventSink) {
        let expired = self.services.broker.expire_turn(turn.id());
        if !expired.is_empty() {
            debug!("Expired {} pending approvals of turn {}", expired.len(), turn.id());
        }
        match turn.transition(TurnState::Cancelled, self.now()) {
            Ok(from) => {
                info!("Turn {} cancelled in {}", turn.id(), from);
                self.emit(
                    sink,
                    turn.id(),
                    TurnEventKind::PhaseChanged {
                        from,
                        to: TurnState::Cancelled,
                    },
                );
                self.emit(sink, turn.id(), TurnEventKind::TurnCancelled);
            }
            Err(e) => error!("Turn {} could not be cancelled: {}", turn.id(), e),
        }
    }

    /// Announce a `Done` turn and record it in the conversation.
    async fn complete(&self, turn: &Turn, sink: &dyn TurnEventSink) {
        let Some(result) = turn.result() else {
            return;
        };
        info!("Turn {} completed", turn.id());
        let text = result.text.clone();
        self.emit(sink, turn.id(), TurnEventKind::TurnCompleted { result });

        let at = self.now();
        let entries = vec![
            ConversationEntry::user(turn.id().clone(), turn.task(), at),
            ConversationEntry::assistant(turn.id().clone(), text, at),
        ];
        if let Err(e) = self
            .conversations
            .append(turn.conversation_id(), entries)
            .await
        {
            warn!(
                "Failed to record turn {} in conversation {}: {}",
                turn.id(),
                turn.conversation_id(),
                e
            );
        }
    }

    /// Release per-turn state. A checkpointed turn gets its terminal
    /// snapshot written over the checkpoint so it cannot run again.
    async fn finish(&self, turn: Turn) -> RunTurnOutput {
        self.services.broker.expire_turn(turn.id());
        self.services.broker.forget_turn(turn.id());
        if let Err(e) = self.services.checkpoints.retire(&turn).await {
            warn!("Checkpoint of turn {} could not be retired: {}", turn.id(), e);
        }
        let result = turn.result();
        RunTurnOutput { turn, result }
    }

    /// An unreadable conversation disables the fast path instead of failing the turn.
    async fn load_conversation(&self, id: &ConversationId) -> Option<Conversation> {
        match self.conversations.load_or_create(id).await {
            Ok(conversation) => Some(conversation),
            Err(e) => {
                warn!("Could not load conversation {}: {}", id, e);
                None
            }
        }
    }

    /// Bound a reasoning call by the reasoning timeout and the cancel token.
    async fn reason<T>(
        &self,
        call: impl Future<Output = Result<T, ReasoningError>>,
    ) -> Bounded<Result<T, ReasoningError>> {
        bounded(call, self.params.reasoning_timeout, &self.cancellation_token).await
    }

    fn emit(&self, sink: &dyn TurnEventSink, turn_id: &TurnId, kind: TurnEventKind) {
        sink.emit(TurnEvent::new(turn_id.clone(), self.now(), kind));
    }

    fn now(&self) -> DateTime<Utc> {
        self.services.clock.now()
    }
}
