//! Turn event stream protocol
//!
//! Every event serializes to one JSON object carrying `type`, `turnId` and
//! `timestamp` plus the variant's fields, e.g.
//!
//! ```json
//! {"type":"phase.changed","turnId":"turn-1","timestamp":"…","from":"analyzing","to":"routing"}
//! ```

use crate::approval::{ApprovalStatus, OperationDescriptor, RiskLevel};
use crate::core::ids::{ApprovalRequestId, TurnId, WorkerId};
use crate::routing::RoutingDecision;
use crate::turn::{ErrorKind, ProgressVerdict, QualityScore, TurnState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Final payload of `turn.completed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnResult {
    pub text: String,
    /// Absent on the fast path, which skips Scoring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<QualityScore>,
    #[serde(default)]
    pub fast_path: bool,
    pub rounds: u32,
}

/// Variant-specific part of a [`TurnEvent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum TurnEventKind {
    #[serde(rename = "phase.changed")]
    PhaseChanged { from: TurnState, to: TurnState },

    #[serde(rename = "routing.decided")]
    RoutingDecided {
        decision: RoutingDecision,
        cached: bool,
    },

    #[serde(rename = "execution.delta")]
    ExecutionDelta { text: String, worker_id: WorkerId },

    #[serde(rename = "approval.requested")]
    ApprovalRequested {
        request_id: ApprovalRequestId,
        operation_descriptor: OperationDescriptor,
        risk_level: RiskLevel,
    },

    #[serde(rename = "approval.resolved")]
    ApprovalResolved {
        request_id: ApprovalRequestId,
        status: ApprovalStatus,
    },

    #[serde(rename = "progress.evaluated")]
    ProgressEvaluated {
        decision: ProgressVerdict,
        round: u32,
        forced: bool,
    },

    #[serde(rename = "quality.scored")]
    QualityScored {
        score: f32,
        gaps: Vec<String>,
        meets_threshold: bool,
    },

    #[serde(rename = "turn.completed")]
    TurnCompleted { result: TurnResult },

    #[serde(rename = "turn.failed")]
    TurnFailed {
        error_kind: ErrorKind,
        message: String,
    },

    #[serde(rename = "turn.cancelled")]
    TurnCancelled,
}

impl TurnEventKind {
    /// The `type` string on the wire.
    pub fn type_name(&self) -> &'static str {
        match self {
            TurnEventKind::PhaseChanged { .. } => "phase.changed",
            TurnEventKind::RoutingDecided { .. } => "routing.decided",
            TurnEventKind::ExecutionDelta { .. } => "execution.delta",
            TurnEventKind::ApprovalRequested { .. } => "approval.requested",
            TurnEventKind::ApprovalResolved { .. } => "approval.resolved",
            TurnEventKind::ProgressEvaluated { .. } => "progress.evaluated",
            TurnEventKind::QualityScored { .. } => "quality.scored",
            TurnEventKind::TurnCompleted { .. } => "turn.completed",
            TurnEventKind::TurnFailed { .. } => "turn.failed",
            TurnEventKind::TurnCancelled => "turn.cancelled",
        }
    }

    /// `turn.completed`, `turn.failed` and `turn.cancelled` end the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TurnEventKind::TurnCompleted { .. }
                | TurnEventKind::TurnFailed { .. }
                | TurnEventKind::TurnCancelled
        )
    }
}

/// One line of the event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnEvent {
    pub turn_id: TurnId,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: TurnEventKind,
}

impl TurnEvent {
    pub fn new(turn_id: TurnId, timestamp: DateTime<Utc>, kind: TurnEventKind) -> Self {
        Self {
            turn_id,
            timestamp,
            kind,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(kind: TurnEventKind) -> serde_json::Value {
        serde_json::to_value(TurnEvent::new(TurnId::new("turn-1"), Utc::now(), kind)).unwrap()
    }

    #[test]
    fn test_envelope_fields() {
        let json = event(TurnEventKind::TurnCancelled);
        assert_eq!(json["type"], "turn.cancelled");
        assert_eq!(json["turnId"], "turn-1");
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_phase_changed_shape() {
        let json = event(TurnEventKind::PhaseChanged {
            from: TurnState::Analyzing,
            to: TurnState::Routing,
        });
        assert_eq!(json["type"], "phase.changed");
        assert_eq!(json["from"], "analyzing");
        assert_eq!(json["to"], "routing");
    }

    #[test]
    fn test_camel_case_fields() {
        let json = event(TurnEventKind::ExecutionDelta {
            text: "hel".into(),
            worker_id: WorkerId::new("coder"),
        });
        assert_eq!(json["workerId"], "coder");

        let json = event(TurnEventKind::TurnFailed {
            error_kind: ErrorKind::NoWorkersAssigned,
            message: "none".into(),
        });
        assert_eq!(json["errorKind"], "no_workers_assigned");

        let json = event(TurnEventKind::ApprovalRequested {
            request_id: ApprovalRequestId::new("apr-1"),
            operation_descriptor: OperationDescriptor::new("shell", "ls"),
            risk_level: RiskLevel::High,
        });
        assert_eq!(json["requestId"], "apr-1");
        assert_eq!(json["riskLevel"], "high");
        assert_eq!(json["operationDescriptor"]["name"], "shell");
    }

    #[test]
    fn test_progress_evaluated_shape() {
        let json = event(TurnEventKind::ProgressEvaluated {
            decision: ProgressVerdict::Refine,
            round: 1,
            forced: false,
        });
        assert_eq!(json["decision"], "refine");
        assert_eq!(json["round"], 1);
    }

    #[test]
    fn test_parse_event_line() {
        let parsed: TurnEvent = serde_json::from_value(json!({
            "type": "approval.resolved",
            "turnId": "turn-7",
            "timestamp": "2025-01-01T00:00:00Z",
            "requestId": "apr-3",
            "status": "expired"
        }))
        .unwrap();
        assert_eq!(parsed.turn_id, TurnId::new("turn-7"));
        assert_eq!(
            parsed.kind,
            TurnEventKind::ApprovalResolved {
                request_id: ApprovalRequestId::new("apr-3"),
                status: ApprovalStatus::Expired,
            }
        );
    }

    #[test]
    fn test_terminal_kinds() {
        assert!(TurnEventKind::TurnCancelled.is_terminal());
        assert!(
            !TurnEventKind::PhaseChanged {
                from: TurnState::Queued,
                to: TurnState::Analyzing
            }
            .is_terminal()
        );
    }
}
