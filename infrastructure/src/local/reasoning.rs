//! Keyword-driven reasoning module.

use super::words;
use async_trait::async_trait;
use conductor_application::{QualityAssessment, ReasoningError, ReasoningModule};
use conductor_domain::{
    AnalysisReport, ExecutionArtifact, ExecutionMode, KeywordSimplicityHeuristic,
    ProgressDecision, RoutingDecision, SimplicityHeuristic, Subtask, TaskComplexity,
    WorkerRegistry,
};
use std::collections::BTreeSet;
use tracing::debug;

/// Words that suggest a tool, and the tool they suggest.
const TOOL_HINTS: &[(&str, &str)] = &[
    ("search", "search"),
    ("find", "search"),
    ("run", "shell"),
    ("test", "shell"),
    ("deploy", "shell"),
    ("file", "filesystem"),
    ("read", "filesystem"),
];

/// Reasoning module that works from word matching alone.
///
/// Capabilities are matched against the task's words, so the worker
/// registry's capability vocabulary drives routing.
pub struct OfflineReasoningModule {
    heuristic: KeywordSimplicityHeuristic,
    vocabulary: BTreeSet<String>,
}

impl OfflineReasoningModule {
    pub fn new(registry: &WorkerRegistry) -> Self {
        let vocabulary = registry
            .profiles()
            .flat_map(|p| p.capabilities.iter())
            .map(|c| c.to_lowercase())
            .collect();
        Self {
            heuristic: KeywordSimplicityHeuristic::default(),
            vocabulary,
        }
    }

    pub fn with_heuristic(mut self, heuristic: KeywordSimplicityHeuristic) -> Self {
        self.heuristic = heuristic;
        self
    }
}

/// Evaluate a single `a <op> b` expression found in `task`.
fn arithmetic(task: &str) -> Option<String> {
    let expr: String = task
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | '+' | '-' | '*' | '/' | 'x'))
        .collect();
    let split = expr
        .char_indices()
        .skip(1)
        .find(|(_, c)| matches!(c, '+' | '-' | '*' | '/' | 'x'))?;
    let (left, rest) = expr.split_at(split.0);
    let right = &rest[1..];
    let a: f64 = left.parse().ok()?;
    let b: f64 = right.parse().ok()?;
    let value = match split.1 {
        '+' => a + b,
        '-' => a - b,
        '*' | 'x' => a * b,
        '/' if b != 0.0 => a / b,
        _ => return None,
    };
    Some(if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{:.4}", value)
            .trim_end_matches('0')
            .to_string()
    })
}

#[async_trait]
impl ReasoningModule for OfflineReasoningModule {
    fn simplicity_heuristic(&self) -> &dyn SimplicityHeuristic {
        &self.heuristic
    }

    async fn respond_directly(&self, task: &str) -> Result<String, ReasoningError> {
        match arithmetic(task) {
            Some(answer) => Ok(answer),
            None => Err(ReasoningError::RequestFailed(
                "no direct answer available offline".into(),
            )),
        }
    }

    async fn analyze(&self, task: &str) -> Result<AnalysisReport, ReasoningError> {
        let task_words: Vec<String> = words(task).collect();
        if task_words.is_empty() {
            return Err(ReasoningError::Malformed("task has no words".into()));
        }

        let capabilities: BTreeSet<&String> = task_words
            .iter()
            .filter(|w| self.vocabulary.contains(*w))
            .collect();
        let complexity = if capabilities.len() >= 2 || task_words.len() > 40 {
            TaskComplexity::Complex
        } else if capabilities.is_empty() && task_words.len() <= 12 {
            TaskComplexity::Simple
        } else {
            TaskComplexity::Moderate
        };

        let mut report = AnalysisReport::new(complexity);
        for capability in capabilities {
            report = report.with_capability(capability.as_str());
        }
        let tools: BTreeSet<&str> = TOOL_HINTS
            .iter()
            .filter(|(hint, _)| task_words.iter().any(|w| w == hint))
            .map(|(_, tool)| *tool)
            .collect();
        for tool in tools {
            report = report.with_tool(tool);
        }
        Ok(report)
    }

    async fn route(
        &self,
        task: &str,
        analysis: &AnalysisReport,
        registry: &WorkerRegistry,
    ) -> Result<RoutingDecision, ReasoningError> {
        let mut workers: Vec<_> = registry
            .with_any_capability(&analysis.required_capabilities)
            .into_iter()
            .map(|p| p.id.clone())
            .collect();
        if workers.is_empty() {
            workers.extend(registry.ids().next().cloned());
        }

        let parts: Vec<&str> = task
            .split(" then ")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        let mode = match (workers.len(), analysis.complexity) {
            (1, _) if parts.len() < 2 => ExecutionMode::Delegated,
            (n, TaskComplexity::Complex) if n >= 3 => ExecutionMode::Discussion,
            _ if parts.len() >= 2 => ExecutionMode::Handoff,
            _ => ExecutionMode::Sequential,
        };

        let mut decision = RoutingDecision::new(workers, mode).with_rationale(format!(
            "matched capabilities {:?}",
            analysis.required_capabilities
        ));
        if parts.len() >= 2 {
            for part in parts {
                decision = decision.with_subtask(Subtask::new(part));
            }
        }
        for tool in &analysis.recommended_tools {
            decision = decision.with_tool(tool.as_str());
        }
        debug!("Offline routing: {:?}", decision);
        Ok(decision)
    }

    async fn evaluate_progress(
        &self,
        _task: &str,
        _artifact: &ExecutionArtifact,
        _round: u32,
    ) -> Result<ProgressDecision, ReasoningError> {
        Ok(ProgressDecision::Proceed)
    }

    async fn score_quality(
        &self,
        _task: &str,
        artifact: &ExecutionArtifact,
    ) -> Result<QualityAssessment, ReasoningError> {
        let text = artifact.text();
        if text.trim().is_empty() {
            return Ok(QualityAssessment::new(0.0).with_gap("no output was produced"));
        }
        let length_score = 4.0 + (words(&text).count() as f32 / 10.0);
        let mut assessment = QualityAssessment::new(length_score.min(10.0));
        if artifact.discarded_count() > 0 {
            assessment.score = (assessment.score - 2.0).max(0.0);
            assessment = assessment.with_gap(format!(
                "{} step(s) discarded after approval denial",
                artifact.discarded_count()
            ));
        }
        Ok(assessment)
    }
}
