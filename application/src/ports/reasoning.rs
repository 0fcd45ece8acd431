//! Reasoning module port
//!
//! The reasoning module is the opaque natural-language component that
//! analyses tasks, produces routing decisions, judges progress and scores
//! quality. The orchestrator only sees structured results.

use async_trait::async_trait;
use conductor_domain::{
    AnalysisReport, ExecutionArtifact, ProgressDecision, RoutingDecision, SimplicityHeuristic,
    WorkerRegistry,
};
use thiserror::Error;

/// Errors that can occur while calling the reasoning module
#[derive(Error, Debug)]
pub enum ReasoningError {
    #[error("Malformed output: {0}")]
    Malformed(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Timeout")]
    Timeout,
}

/// Raw quality judgement; the orchestrator applies the threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityAssessment {
    pub score: f32,
    pub gaps: Vec<String>,
}

impl QualityAssessment {
    pub fn new(score: f32) -> Self {
        Self {
            score,
            gaps: Vec::new(),
        }
    }

    pub fn with_gap(mut self, gap: impl Into<String>) -> Self {
        self.gaps.push(gap.into());
        self
    }
}

/// Port for the reasoning/classification module.
#[async_trait]
pub trait ReasoningModule: Send + Sync {
    /// Cheap synchronous check used by the fast-path classifier.
    fn simplicity_heuristic(&self) -> &dyn SimplicityHeuristic;

    /// Answer a simple task directly (fast path).
    async fn respond_directly(&self, task: &str) -> Result<String, ReasoningError>;

    /// Complexity signals, required capabilities and tool recommendations.
    async fn analyze(&self, task: &str) -> Result<AnalysisReport, ReasoningError>;

    /// Choose workers, mode and subtasks.
    async fn route(
        &self,
        task: &str,
        analysis: &AnalysisReport,
        registry: &WorkerRegistry,
    ) -> Result<RoutingDecision, ReasoningError>;

    /// Decide whether the artifact of `round` needs another pass.
    async fn evaluate_progress(
        &self,
        task: &str,
        artifact: &ExecutionArtifact,
        round: u32,
    ) -> Result<ProgressDecision, ReasoningError>;

    async fn score_quality(
        &self,
        task: &str,
        artifact: &ExecutionArtifact,
    ) -> Result<QualityAssessment, ReasoningError>;
}
