//! Routing decision and execution modes.

use crate::core::error::DomainError;
use crate::core::ids::WorkerId;
use crate::routing::registry::WorkerRegistry;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the Executing phase dispatches work to the assigned workers.
///
/// Selected once during Routing and never changed mid-Executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// The whole task goes to a single worker.
    Delegated,
    /// Subtasks run one after another, each seeing the previous output.
    Sequential,
    /// Subtasks run concurrently and their outputs are merged.
    Parallel,
    /// Workers take over from each other in order; each continues the last one's work.
    Handoff,
    /// Every worker answers the task in turn, seeing the discussion so far.
    Discussion,
}

/// What a rejected or expired approval does to the running turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionPolicy {
    /// Discard the triggering step's output; the remaining steps continue.
    AbortStep,
    /// Fail the whole turn.
    AbortTurn,
}

impl ExecutionMode {
    pub const ALL: [ExecutionMode; 5] = [
        ExecutionMode::Delegated,
        ExecutionMode::Sequential,
        ExecutionMode::Parallel,
        ExecutionMode::Handoff,
        ExecutionMode::Discussion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Delegated => "delegated",
            ExecutionMode::Sequential => "sequential",
            ExecutionMode::Parallel => "parallel",
            ExecutionMode::Handoff => "handoff",
            ExecutionMode::Discussion => "discussion",
        }
    }

    /// Delegated and handoff carry a single chain of work, so losing a step
    /// leaves nothing to continue from.
    pub fn rejection_policy(&self) -> RejectionPolicy {
        match self {
            ExecutionMode::Delegated | ExecutionMode::Handoff => RejectionPolicy::AbortTurn,
            ExecutionMode::Sequential | ExecutionMode::Parallel | ExecutionMode::Discussion => {
                RejectionPolicy::AbortStep
            }
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "delegated" | "delegate" => Ok(ExecutionMode::Delegated),
            "sequential" | "seq" => Ok(ExecutionMode::Sequential),
            "parallel" | "par" => Ok(ExecutionMode::Parallel),
            "handoff" | "hand_off" => Ok(ExecutionMode::Handoff),
            "discussion" | "discuss" => Ok(ExecutionMode::Discussion),
            _ => Err(format!("Invalid ExecutionMode: {}", s)),
        }
    }
}

/// A unit of work in the routing plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    pub description: String,
    /// Worker pinned to this subtask; unpinned subtasks go round-robin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker: Option<WorkerId>,
}

impl Subtask {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            worker: None,
        }
    }

    pub fn assigned_to(mut self, worker: WorkerId) -> Self {
        self.worker = Some(worker);
        self
    }
}

/// The chosen worker set, execution mode, and subtask plan for a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingDecision {
    pub workers: Vec<WorkerId>,
    pub mode: ExecutionMode,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
    #[serde(default)]
    pub tool_plan: Vec<String>,
    #[serde(default)]
    pub rationale: String,
}

impl RoutingDecision {
    pub fn new(workers: Vec<WorkerId>, mode: ExecutionMode) -> Self {
        Self {
            workers,
            mode,
            subtasks: Vec::new(),
            tool_plan: Vec::new(),
            rationale: String::new(),
        }
    }

    pub fn with_subtask(mut self, subtask: Subtask) -> Self {
        self.subtasks.push(subtask);
        self
    }

    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tool_plan.push(tool.into());
        self
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = rationale.into();
        self
    }

    /// Check the decision against the registry.
    ///
    /// An empty worker set is reported before any membership check.
    pub fn validate(&self, registry: &WorkerRegistry) -> Result<(), DomainError> {
        if self.workers.is_empty() {
            return Err(DomainError::NoWorkersAssigned);
        }
        let mut unknown = registry.unknown_in(&self.workers);
        unknown.extend(
            self.subtasks
                .iter()
                .filter_map(|s| s.worker.as_ref())
                .filter(|w| !self.workers.contains(w))
                .cloned(),
        );
        if unknown.is_empty() {
            Ok(())
        } else {
            unknown.sort();
            unknown.dedup();
            Err(DomainError::UnknownWorkers(unknown))
        }
    }

    /// Worker for subtask `index`: its pinned worker, or round-robin over `workers`.
    pub fn worker_for(&self, index: usize) -> Option<&WorkerId> {
        self.subtasks
            .get(index)
            .and_then(|s| s.worker.as_ref())
            .or_else(|| match self.workers.len() {
                0 => None,
                n => self.workers.get(index % n),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::registry::WorkerProfile;

    fn registry() -> WorkerRegistry {
        WorkerRegistry::new(vec![
            WorkerProfile::new("coder", "writes code"),
            WorkerProfile::new("writer", "writes prose"),
        ])
    }

    #[test]
    fn test_rejection_policy_per_mode() {
        assert_eq!(ExecutionMode::Delegated.rejection_policy(), RejectionPolicy::AbortTurn);
        assert_eq!(ExecutionMode::Handoff.rejection_policy(), RejectionPolicy::AbortTurn);
        assert_eq!(ExecutionMode::Sequential.rejection_policy(), RejectionPolicy::AbortStep);
        assert_eq!(ExecutionMode::Parallel.rejection_policy(), RejectionPolicy::AbortStep);
        assert_eq!(ExecutionMode::Discussion.rejection_policy(), RejectionPolicy::AbortStep);
    }

    #[test]
    fn test_mode_from_str_and_display() {
        for mode in ExecutionMode::ALL {
            assert_eq!(mode.as_str().parse::<ExecutionMode>().unwrap(), mode);
        }
        assert_eq!("SEQ".parse::<ExecutionMode>().unwrap(), ExecutionMode::Sequential);
        assert!("broadcast".parse::<ExecutionMode>().is_err());
        assert_eq!(ExecutionMode::Handoff.to_string(), "handoff");
    }

    #[test]
    fn test_validate_accepts_known_workers() {
        let decision = RoutingDecision::new(
            vec![WorkerId::new("coder"), WorkerId::new("writer")],
            ExecutionMode::Parallel,
        );
        assert!(decision.validate(&registry()).is_ok());
    }

    #[test]
    fn test_validate_empty_workers() {
        let decision = RoutingDecision::new(vec![], ExecutionMode::Delegated);
        assert_eq!(decision.validate(&registry()), Err(DomainError::NoWorkersAssigned));
    }

    #[test]
    fn test_validate_unknown_workers() {
        let decision = RoutingDecision::new(
            vec![WorkerId::new("coder"), WorkerId::new("ghost")],
            ExecutionMode::Sequential,
        );
        assert_eq!(
            decision.validate(&registry()),
            Err(DomainError::UnknownWorkers(vec![WorkerId::new("ghost")]))
        );
    }

    #[test]
    fn test_validate_subtask_pinned_outside_assignment() {
        let decision = RoutingDecision::new(vec![WorkerId::new("coder")], ExecutionMode::Sequential)
            .with_subtask(Subtask::new("draft").assigned_to(WorkerId::new("writer")));
        assert_eq!(
            decision.validate(&registry()),
            Err(DomainError::UnknownWorkers(vec![WorkerId::new("writer")]))
        );
    }

    #[test]
    fn test_worker_for_round_robin() {
        let decision = RoutingDecision::new(
            vec![WorkerId::new("a"), WorkerId::new("b")],
            ExecutionMode::Sequential,
        )
        .with_subtask(Subtask::new("one"))
        .with_subtask(Subtask::new("two"))
        .with_subtask(Subtask::new("three").assigned_to(WorkerId::new("a")));

        assert_eq!(decision.worker_for(0), Some(&WorkerId::new("a")));
        assert_eq!(decision.worker_for(1), Some(&WorkerId::new("b")));
        assert_eq!(decision.worker_for(2), Some(&WorkerId::new("a")));
        assert_eq!(decision.worker_for(3), Some(&WorkerId::new("b")));
    }

    #[test]
    fn test_decision_wire_shape() {
        let decision = RoutingDecision::new(vec![WorkerId::new("coder")], ExecutionMode::Delegated)
            .with_tool("shell");
        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(json["mode"], "delegated");
        assert_eq!(json["workers"][0], "coder");
        assert_eq!(json["toolPlan"][0], "shell");
    }
}
