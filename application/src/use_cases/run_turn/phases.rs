//! Analyzing, Routing, Evaluating and Scoring phases.
//!
//! Executing lives in [`dispatch`](super::dispatch).

use super::RunTurnUseCase;
use super::types::PhaseError;
use crate::ports::event_sink::TurnEventSink;
use crate::ports::execution_runtime::ExecutionRuntime;
use crate::ports::reasoning::ReasoningModule;
use crate::use_cases::shared::Bounded;
use conductor_domain::{
    DomainError, ErrorKind, ExecutionArtifact, Fingerprint, ProgressDecision, ProgressEvaluation,
    ProgressVerdict, QualityScore, Turn, TurnEventKind, TurnState,
};
use tracing::{debug, error, info, warn};

impl<R: ReasoningModule + 'static, X: ExecutionRuntime + 'static> RunTurnUseCase<R, X> {
    pub(super) async fn analyze(
        &self,
        turn: &mut Turn,
        sink: &dyn TurnEventSink,
    ) -> Result<(), PhaseError> {
        let report = match self.reason(self.reasoning.analyze(turn.task())).await {
            Bounded::Ready(Ok(report)) => report,
            Bounded::Ready(Err(e)) => {
                return Err(PhaseError::failed(ErrorKind::AnalysisError, e.to_string()));
            }
            Bounded::TimedOut => {
                return Err(PhaseError::failed(
                    ErrorKind::AnalysisError,
                    format!("analysis timed out after {:?}", self.params.reasoning_timeout),
                ));
            }
            Bounded::Cancelled => return Err(PhaseError::Cancelled),
        };

        debug!(
            "Turn {} analysis: complexity={:?}, capabilities={:?}",
            turn.id(),
            report.complexity,
            report.required_capabilities
        );
        turn.record_analysis(report)?;
        self.advance(turn, TurnState::Routing, sink).await
    }

    /// Look the decision up by fingerprint before asking the reasoning module.
    pub(super) async fn route(
        &self,
        turn: &mut Turn,
        sink: &dyn TurnEventSink,
    ) -> Result<(), PhaseError> {
        let fingerprint = Fingerprint::compute(turn.task(), self.registry.ids());

        let (decision, cached) = match self.services.routing_cache.get(&fingerprint) {
            Some(decision) => {
                debug!("Routing cache hit for turn {} ({})", turn.id(), fingerprint);
                (decision, true)
            }
            None => {
                let analysis = turn.results().analysis.clone().unwrap_or_default();
                let call = self
                    .reasoning
                    .route(turn.task(), &analysis, self.registry.as_ref());
                match self.reason(call).await {
                    Bounded::Ready(Ok(decision)) => (decision, false),
                    Bounded::Ready(Err(e)) => {
                        return Err(PhaseError::failed(ErrorKind::RoutingError, e.to_string()));
                    }
                    Bounded::TimedOut => {
                        return Err(PhaseError::failed(
                            ErrorKind::ReasoningTimeout,
                            "routing timed out",
                        ));
                    }
                    Bounded::Cancelled => return Err(PhaseError::Cancelled),
                }
            }
        };

        if let Err(e) = decision.validate(self.registry.as_ref()) {
            return Err(match e {
                DomainError::NoWorkersAssigned => {
                    PhaseError::failed(ErrorKind::NoWorkersAssigned, e.to_string())
                }
                other => {
                    error!("Rejected routing decision for turn {}: {}", turn.id(), other);
                    PhaseError::failed(ErrorKind::InvalidRoutingDecision, other.to_string())
                }
            });
        }

        if !cached {
            self.services.routing_cache.put(fingerprint, decision.clone());
        }

        info!(
            "Turn {} routed to {:?} in {} mode{}",
            turn.id(),
            decision
                .workers
                .iter()
                .map(|w| w.as_str())
                .collect::<Vec<_>>(),
            decision.mode,
            if cached { " (cached)" } else { "" }
        );
        turn.record_routing(decision.clone(), cached)?;
        self.emit(
            sink,
            turn.id(),
            TurnEventKind::RoutingDecided { decision, cached },
        );
        self.advance(turn, TurnState::Executing, sink).await
    }

    /// Ask whether the last artifact needs another round. At the round limit
    /// the turn proceeds without consulting the reasoning module.
    pub(super) async fn evaluate(
        &self,
        turn: &mut Turn,
        sink: &dyn TurnEventSink,
    ) -> Result<(), PhaseError> {
        let round = turn.round_count();
        let max = self.params.max_round_count;

        let decision = if !turn.can_refine(max) {
            warn!(
                "Turn {} reached the round limit ({}); proceeding to scoring",
                turn.id(),
                max
            );
            None
        } else {
            let artifact = self.current_artifact(turn)?;
            let call = self
                .reasoning
                .evaluate_progress(turn.task(), &artifact, round);
            match self.reason(call).await {
                Bounded::Ready(Ok(decision)) => Some(decision),
                Bounded::Ready(Err(e)) => {
                    warn!(
                        "Progress evaluation failed for turn {}, proceeding: {}",
                        turn.id(),
                        e
                    );
                    None
                }
                Bounded::TimedOut => {
                    return Err(PhaseError::failed(
                        ErrorKind::ReasoningTimeout,
                        "progress evaluation timed out",
                    ));
                }
                Bounded::Cancelled => return Err(PhaseError::Cancelled),
            }
        };

        match decision {
            Some(ProgressDecision::Refine { instructions }) => {
                let next = turn.begin_refinement(instructions, max)?;
                info!("Turn {} refines round {} (next round {})", turn.id(), round, next);
                self.record_verdict(turn, ProgressVerdict::Refine, round, false, sink)?;
                self.advance(turn, TurnState::Executing, sink).await
            }
            Some(ProgressDecision::Proceed) => {
                self.record_verdict(turn, ProgressVerdict::Proceed, round, false, sink)?;
                self.advance(turn, TurnState::Scoring, sink).await
            }
            None => {
                self.record_verdict(turn, ProgressVerdict::Proceed, round, true, sink)?;
                self.advance(turn, TurnState::Scoring, sink).await
            }
        }
    }

    fn record_verdict(
        &self,
        turn: &mut Turn,
        verdict: ProgressVerdict,
        round: u32,
        forced: bool,
        sink: &dyn TurnEventSink,
    ) -> Result<(), PhaseError> {
        turn.record_evaluation(ProgressEvaluation {
            verdict,
            round,
            forced,
        })?;
        self.emit(
            sink,
            turn.id(),
            TurnEventKind::ProgressEvaluated {
                decision: verdict,
                round,
                forced,
            },
        );
        Ok(())
    }

    /// Score the final artifact. A score below the threshold is reported
    /// but does not fail the turn.
    pub(super) async fn score(
        &self,
        turn: &mut Turn,
        sink: &dyn TurnEventSink,
    ) -> Result<(), PhaseError> {
        let artifact = self.current_artifact(turn)?;
        let assessment = match self
            .reason(self.reasoning.score_quality(turn.task(), &artifact))
            .await
        {
            Bounded::Ready(Ok(assessment)) => assessment,
            Bounded::Ready(Err(e)) => {
                return Err(PhaseError::failed(ErrorKind::ScoringError, e.to_string()));
            }
            Bounded::TimedOut => {
                return Err(PhaseError::failed(
                    ErrorKind::ReasoningTimeout,
                    "quality scoring timed out",
                ));
            }
            Bounded::Cancelled => return Err(PhaseError::Cancelled),
        };

        let quality = QualityScore::new(
            assessment.score,
            assessment.gaps,
            self.params.quality_threshold,
        );
        if !quality.meets_threshold {
            warn!(
                "Turn {} scored {:.1}, below threshold {:.1}",
                turn.id(),
                quality.score,
                self.params.quality_threshold
            );
        }
        self.emit(
            sink,
            turn.id(),
            TurnEventKind::QualityScored {
                score: quality.score,
                gaps: quality.gaps.clone(),
                meets_threshold: quality.meets_threshold,
            },
        );
        turn.record_quality(quality)?;
        turn.record_answer(artifact.text())?;
        self.advance(turn, TurnState::Done, sink).await?;
        self.complete(turn, sink).await;
        Ok(())
    }

    fn current_artifact(&self, turn: &Turn) -> Result<ExecutionArtifact, PhaseError> {
        turn.results().execution.clone().ok_or_else(|| {
            PhaseError::failed(
                ErrorKind::ExecutionError,
                "no execution artifact recorded",
            )
        })
    }
}
