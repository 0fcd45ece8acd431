//! Executing phase: dispatch one round to the assigned workers.
//!
//! Each execution mode decides the order of steps and what earlier output a
//! step sees. Approval outcomes are applied per step; whether a discarded
//! step sinks the turn follows [`ExecutionMode::rejection_policy`].

use super::RunTurnUseCase;
use super::types::PhaseError;
use crate::ports::event_sink::TurnEventSink;
use crate::ports::execution_runtime::{
    ExecutionRuntime, InterruptRequest, WorkerAssignment, WorkerEvent,
};
use crate::ports::reasoning::ReasoningModule;
use crate::use_cases::shared::{Bounded, bounded};
use conductor_domain::{
    ApprovalOutcome, Contribution, ContributionStatus, ErrorKind, ExecutionArtifact,
    ExecutionMode, RejectionPolicy, RoutingDecision, Turn, TurnEventKind, TurnState, WorkerId,
};
use futures::future::try_join_all;
use tracing::{debug, info, warn};

/// Read-only view of the turn for the duration of one round.
pub(super) struct RoundContext<'a> {
    /// Turn as it was when the round started.
    pub(super) base: &'a Turn,
    pub(super) decision: &'a RoutingDecision,
    pub(super) thread_context: Option<&'a str>,
}

/// One unit of work for one worker.
#[derive(Debug, Clone)]
struct StepSpec {
    worker: WorkerId,
    subtask_index: Option<usize>,
    /// The worker's share of the task, if the decision split it.
    part: Option<String>,
}

/// Earlier output shown to a step.
struct Prior<'a> {
    label: String,
    outputs: Vec<&'a Contribution>,
}

impl<R: ReasoningModule + 'static, X: ExecutionRuntime + 'static> RunTurnUseCase<R, X> {
    pub(super) async fn execute_round(
        &self,
        turn: &mut Turn,
        thread_context: Option<&str>,
        sink: &dyn TurnEventSink,
    ) -> Result<(), PhaseError> {
        let decision = turn.results().routing.clone().ok_or_else(|| {
            PhaseError::failed(ErrorKind::ExecutionError, "no routing decision recorded")
        })?;
        let base = turn.clone();
        let ctx = RoundContext {
            base: &base,
            decision: &decision,
            thread_context,
        };

        info!(
            "Turn {} executing round {} in {} mode",
            turn.id(),
            turn.round_count(),
            decision.mode
        );
        let contributions = match decision.mode {
            ExecutionMode::Delegated => self.dispatch_delegated(&ctx, sink).await?,
            ExecutionMode::Sequential => self.dispatch_sequential(&ctx, sink).await?,
            ExecutionMode::Parallel => self.dispatch_parallel(&ctx, sink).await?,
            ExecutionMode::Handoff => self.dispatch_handoff(&ctx, sink).await?,
            ExecutionMode::Discussion => self.dispatch_discussion(&ctx, sink).await?,
        };

        let artifact = ExecutionArtifact::new(decision.mode, turn.round_count(), contributions);
        enforce_rejection_policy(turn, &artifact)?;
        turn.record_execution(artifact)?;
        self.advance(turn, TurnState::Evaluating, sink).await
    }

    /// A single worker takes the whole task, subtasks included.
    async fn dispatch_delegated(
        &self,
        ctx: &RoundContext<'_>,
        sink: &dyn TurnEventSink,
    ) -> Result<Vec<Contribution>, PhaseError> {
        let worker = ctx.decision.workers.first().cloned().ok_or_else(|| {
            PhaseError::failed(ErrorKind::NoWorkersAssigned, "no worker to delegate to")
        })?;
        let part = (!ctx.decision.subtasks.is_empty()).then(|| {
            ctx.decision
                .subtasks
                .iter()
                .enumerate()
                .map(|(i, s)| format!("{}. {}", i + 1, s.description))
                .collect::<Vec<_>>()
                .join("\n")
        });
        let step = StepSpec {
            worker,
            subtask_index: None,
            part,
        };
        let instructions = compose_instructions(ctx, &step, None);
        let contribution = self.run_step(ctx, &step, instructions, sink).await?;
        Ok(vec![contribution])
    }

    /// Steps run in order; each sees everything completed before it.
    async fn dispatch_sequential(
        &self,
        ctx: &RoundContext<'_>,
        sink: &dyn TurnEventSink,
    ) -> Result<Vec<Contribution>, PhaseError> {
        let mut contributions: Vec<Contribution> = Vec::new();
        for step in planned_steps(ctx.decision) {
            let prior = Prior {
                label: "Previous steps".to_string(),
                outputs: contributions.iter().filter(|c| c.is_completed()).collect(),
            };
            let instructions = compose_instructions(ctx, &step, Some(prior));
            let contribution = self.run_step(ctx, &step, instructions, sink).await?;
            contributions.push(contribution);
        }
        Ok(contributions)
    }

    /// All steps at once, none sees another's output.
    async fn dispatch_parallel(
        &self,
        ctx: &RoundContext<'_>,
        sink: &dyn TurnEventSink,
    ) -> Result<Vec<Contribution>, PhaseError> {
        let steps = planned_steps(ctx.decision);
        let runs = steps.iter().map(|step| {
            let instructions = compose_instructions(ctx, step, None);
            self.run_step(ctx, step, instructions, sink)
        });
        try_join_all(runs).await
    }

    /// Each step receives the previous step's output. A discarded step ends
    /// the chain.
    async fn dispatch_handoff(
        &self,
        ctx: &RoundContext<'_>,
        sink: &dyn TurnEventSink,
    ) -> Result<Vec<Contribution>, PhaseError> {
        let mut contributions: Vec<Contribution> = Vec::new();
        for step in planned_steps(ctx.decision) {
            let prior = contributions.last().map(|last| Prior {
                label: format!("Handoff from {}", last.worker),
                outputs: vec![last],
            });
            let instructions = compose_instructions(ctx, &step, prior);
            let contribution = self.run_step(ctx, &step, instructions, sink).await?;
            let stop = !contribution.is_completed();
            contributions.push(contribution);
            if stop {
                debug!("Handoff chain stopped at {}", step.worker);
                break;
            }
        }
        Ok(contributions)
    }

    /// Every assigned worker weighs in on the whole task in turn.
    async fn dispatch_discussion(
        &self,
        ctx: &RoundContext<'_>,
        sink: &dyn TurnEventSink,
    ) -> Result<Vec<Contribution>, PhaseError> {
        let mut contributions: Vec<Contribution> = Vec::new();
        for worker in &ctx.decision.workers {
            let step = StepSpec {
                worker: worker.clone(),
                subtask_index: None,
                part: None,
            };
            let prior = Prior {
                label: "Discussion so far".to_string(),
                outputs: contributions.iter().filter(|c| c.is_completed()).collect(),
            };
            let instructions = compose_instructions(ctx, &step, Some(prior));
            let contribution = self.run_step(ctx, &step, instructions, sink).await?;
            contributions.push(contribution);
        }
        Ok(contributions)
    }

    /// Start one worker and drain its stream.
    ///
    /// Every wait on the runtime is bounded by the step timeout, which
    /// restarts on each received event. Time spent waiting for an approval
    /// is bounded by the approval timeout instead.
    async fn run_step(
        &self,
        ctx: &RoundContext<'_>,
        step: &StepSpec,
        instructions: String,
        sink: &dyn TurnEventSink,
    ) -> Result<Contribution, PhaseError> {
        let timeout = self.params.execution_step_timeout;
        let token = &self.cancellation_token;
        let turn_id = ctx.base.id();
        let assignment = WorkerAssignment {
            turn_id: turn_id.clone(),
            worker: step.worker.clone(),
            instructions,
            round: ctx.base.round_count(),
            thread_context: ctx.thread_context.map(str::to_string),
        };

        let mut stream = match bounded(self.runtime.start(assignment), timeout, token).await {
            Bounded::Ready(Ok(stream)) => stream,
            Bounded::Ready(Err(e)) => {
                return Err(PhaseError::failed(ErrorKind::ExecutionError, e.to_string()));
            }
            Bounded::TimedOut => {
                return Err(PhaseError::failed(
                    ErrorKind::ExecutionTimeout,
                    format!("worker {} did not start within {:?}", step.worker, timeout),
                ));
            }
            Bounded::Cancelled => return Err(PhaseError::Cancelled),
        };

        let mut text = String::new();
        let mut streamed = false;
        loop {
            let event = match bounded(stream.receiver.recv(), timeout, token).await {
                Bounded::Ready(Some(event)) => event,
                Bounded::Ready(None) => break,
                Bounded::TimedOut => {
                    return Err(PhaseError::failed(
                        ErrorKind::ExecutionTimeout,
                        format!("worker {} was silent for {:?}", step.worker, timeout),
                    ));
                }
                Bounded::Cancelled => return Err(PhaseError::Cancelled),
            };

            match event {
                WorkerEvent::Delta(chunk) => {
                    streamed = true;
                    text.push_str(&chunk);
                    self.emit_delta(sink, ctx, &step.worker, chunk);
                }
                WorkerEvent::Interrupt(request) => {
                    let InterruptRequest {
                        operation,
                        risk_level,
                        reply,
                    } = request;
                    let outcome = self.await_approval(ctx, operation, risk_level, sink).await?;
                    let discarded = match &outcome {
                        ApprovalOutcome::Rejected { reason } => Some(Contribution::rejected(
                            step.worker.clone(),
                            step.subtask_index,
                            reason.clone(),
                        )),
                        ApprovalOutcome::Expired => {
                            Some(Contribution::expired(step.worker.clone(), step.subtask_index))
                        }
                        ApprovalOutcome::Approved(_) | ApprovalOutcome::Modified(_) => None,
                    };
                    if reply.send(outcome).is_err() {
                        debug!("Worker {} stopped waiting for its approval", step.worker);
                    }
                    if let Some(contribution) = discarded {
                        info!(
                            "Step of worker {} discarded after approval denial",
                            step.worker
                        );
                        return Ok(contribution);
                    }
                }
                WorkerEvent::Completed(full) => {
                    if !streamed && !full.is_empty() {
                        text = full;
                        self.emit_delta(sink, ctx, &step.worker, text.clone());
                    }
                    break;
                }
                WorkerEvent::Error(message) => {
                    return Err(PhaseError::failed(
                        ErrorKind::ExecutionError,
                        format!("worker {} failed: {}", step.worker, message),
                    ));
                }
            }
        }

        Ok(Contribution::completed(
            step.worker.clone(),
            step.subtask_index,
            text,
        ))
    }

    fn emit_delta(
        &self,
        sink: &dyn TurnEventSink,
        ctx: &RoundContext<'_>,
        worker: &WorkerId,
        text: String,
    ) {
        self.emit(
            sink,
            ctx.base.id(),
            TurnEventKind::ExecutionDelta {
                text,
                worker_id: worker.clone(),
            },
        );
    }
}

/// One step per subtask, or one per worker when the task was not split.
fn planned_steps(decision: &RoutingDecision) -> Vec<StepSpec> {
    if decision.subtasks.is_empty() {
        return decision
            .workers
            .iter()
            .map(|worker| StepSpec {
                worker: worker.clone(),
                subtask_index: None,
                part: None,
            })
            .collect();
    }
    decision
        .subtasks
        .iter()
        .enumerate()
        .filter_map(|(i, subtask)| {
            decision.worker_for(i).map(|worker| StepSpec {
                worker: worker.clone(),
                subtask_index: Some(i),
                part: Some(subtask.description.clone()),
            })
        })
        .collect()
}

fn compose_instructions(ctx: &RoundContext<'_>, step: &StepSpec, prior: Option<Prior<'_>>) -> String {
    let mut out = format!("Task: {}", ctx.base.task());

    if let Some(part) = &step.part {
        out.push_str("\n\nYour part:\n");
        out.push_str(part);
    }

    if let Some(prior) = prior.filter(|p| !p.outputs.is_empty()) {
        out.push_str(&format!("\n\n{}:", prior.label));
        for contribution in prior.outputs {
            out.push_str(&format!("\n[{}]\n{}", contribution.worker, contribution.text));
        }
    }

    if let Some(extra) = ctx.base.supplementary_instructions() {
        out.push_str("\n\nRevise the previous attempt:\n");
        out.push_str(extra);
    }
    out
}

/// Turn discarded steps into a failure where the mode requires it.
fn enforce_rejection_policy(turn: &Turn, artifact: &ExecutionArtifact) -> Result<(), PhaseError> {
    let Some(first) = artifact.contributions.iter().find(|c| !c.is_completed()) else {
        return Ok(());
    };
    let (kind, message) = match &first.status {
        ContributionStatus::Rejected { reason } => (
            ErrorKind::ApprovalRejected,
            format!("operation of worker {} rejected: {}", first.worker, reason),
        ),
        _ => (
            ErrorKind::ApprovalTimeout,
            format!("approval for worker {} expired", first.worker),
        ),
    };

    match artifact.mode.rejection_policy() {
        RejectionPolicy::AbortTurn => Err(PhaseError::failed(kind, message)),
        RejectionPolicy::AbortStep if artifact.completed_count() == 0 => Err(PhaseError::failed(
            kind,
            format!("every step was discarded; last: {}", message),
        )),
        RejectionPolicy::AbortStep => {
            warn!(
                "Turn {}: {} of {} steps discarded ({})",
                turn.id(),
                artifact.discarded_count(),
                artifact.contributions.len(),
                message
            );
            Ok(())
        }
    }
}
