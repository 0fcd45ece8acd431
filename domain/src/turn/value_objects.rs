//! Per-phase payloads accumulated on a turn.
//!
//! - [`AnalysisReport`]: output of Analyzing
//! - [`ExecutionArtifact`] / [`Contribution`]: raw result of Executing
//! - [`ProgressDecision`] / [`ProgressEvaluation`]: verdict of Evaluating
//! - [`QualityScore`]: output of Scoring

use crate::core::ids::WorkerId;
use crate::routing::decision::ExecutionMode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse complexity signal reported by the reasoning module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskComplexity {
    Simple,
    #[default]
    Moderate,
    Complex,
}

/// Result of the Analyzing phase.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub complexity: TaskComplexity,
    /// Capabilities a worker needs to handle the task.
    pub required_capabilities: Vec<String>,
    /// Tools the reasoning module suggests for the task.
    pub recommended_tools: Vec<String>,
}

impl AnalysisReport {
    pub fn new(complexity: TaskComplexity) -> Self {
        Self {
            complexity,
            ..Default::default()
        }
    }

    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.required_capabilities.push(capability.into());
        self
    }

    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.recommended_tools.push(tool.into());
        self
    }
}

/// Outcome of one dispatched step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ContributionStatus {
    Completed,
    /// An approval inside this step was rejected; the step's output is discarded.
    Rejected { reason: String },
    /// An approval inside this step expired; treated like a rejection.
    Expired,
}

/// Output of a single worker for one step of the execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contribution {
    pub worker: WorkerId,
    /// Index into the routing decision's subtasks, when the step maps to one.
    pub subtask_index: Option<usize>,
    pub text: String,
    #[serde(flatten)]
    pub status: ContributionStatus,
}

impl Contribution {
    pub fn completed(worker: WorkerId, subtask_index: Option<usize>, text: impl Into<String>) -> Self {
        Self {
            worker,
            subtask_index,
            text: text.into(),
            status: ContributionStatus::Completed,
        }
    }

    /// A rejected step never carries output.
    pub fn rejected(worker: WorkerId, subtask_index: Option<usize>, reason: impl Into<String>) -> Self {
        Self {
            worker,
            subtask_index,
            text: String::new(),
            status: ContributionStatus::Rejected {
                reason: reason.into(),
            },
        }
    }

    pub fn expired(worker: WorkerId, subtask_index: Option<usize>) -> Self {
        Self {
            worker,
            subtask_index,
            text: String::new(),
            status: ContributionStatus::Expired,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.status, ContributionStatus::Completed)
    }
}

/// Raw result artifact of the Executing phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionArtifact {
    pub mode: ExecutionMode,
    /// Round in which this artifact was produced.
    pub round: u32,
    pub contributions: Vec<Contribution>,
}

impl ExecutionArtifact {
    pub fn new(mode: ExecutionMode, round: u32, contributions: Vec<Contribution>) -> Self {
        Self {
            mode,
            round,
            contributions,
        }
    }

    /// Combined text of completed contributions, in dispatch order.
    pub fn text(&self) -> String {
        self.contributions
            .iter()
            .filter(|c| c.is_completed())
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn completed_count(&self) -> usize {
        self.contributions.iter().filter(|c| c.is_completed()).count()
    }

    pub fn discarded_count(&self) -> usize {
        self.contributions.len() - self.completed_count()
    }
}

/// Verdict of the Evaluating phase as reported by the reasoning module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum ProgressDecision {
    /// Loop back to Executing with supplementary instructions.
    Refine { instructions: String },
    /// Advance to Scoring.
    Proceed,
}

impl ProgressDecision {
    pub fn is_refine(&self) -> bool {
        matches!(self, ProgressDecision::Refine { .. })
    }
}

/// Wire-level verdict carried by `progress.evaluated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressVerdict {
    Refine,
    Proceed,
}

impl fmt::Display for ProgressVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressVerdict::Refine => write!(f, "refine"),
            ProgressVerdict::Proceed => write!(f, "proceed"),
        }
    }
}

/// Recorded outcome of one Evaluating pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvaluation {
    pub verdict: ProgressVerdict,
    /// Round being evaluated.
    pub round: u32,
    /// True when the round limit forced `proceed`.
    pub forced: bool,
}

/// Result of the Scoring phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityScore {
    /// Score in `0.0..=10.0`.
    pub score: f32,
    pub gaps: Vec<String>,
    pub meets_threshold: bool,
}

impl QualityScore {
    /// Build a score, clamping to `0..=10` and deriving `meets_threshold`.
    pub fn new(score: f32, gaps: Vec<String>, threshold: f32) -> Self {
        let score = if score.is_nan() { 0.0 } else { score.clamp(0.0, 10.0) };
        Self {
            score,
            gaps,
            meets_threshold: score >= threshold,
        }
    }
}
