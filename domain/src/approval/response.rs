//! Approval responses from external actors.

use crate::approval::entities::{ApprovalStatus, OperationDescriptor};
use crate::core::ids::ApprovalRequestId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while resolving approvals.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApprovalError {
    #[error("Unknown approval request: {0}")]
    NotFound(ApprovalRequestId),

    #[error("Approval request {0} was already resolved ({1})")]
    AlreadyResolved(ApprovalRequestId, ApprovalStatus),

    #[error("A reason is required when rejecting")]
    MissingReason,
}

/// Decision carried by an approval response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    Approved,
    Modified,
    Rejected,
}

impl ApprovalDecision {
    pub fn status(&self) -> ApprovalStatus {
        match self {
            ApprovalDecision::Approved => ApprovalStatus::Approved,
            ApprovalDecision::Modified => ApprovalStatus::Modified,
            ApprovalDecision::Rejected => ApprovalStatus::Rejected,
        }
    }
}

/// Wire shape: `{requestId, decision, modifiedPayload?, reason?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalResponse {
    pub request_id: ApprovalRequestId,
    pub decision: ApprovalDecision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_payload: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ApprovalResponse {
    pub fn approve(request_id: ApprovalRequestId) -> Self {
        Self {
            request_id,
            decision: ApprovalDecision::Approved,
            modified_payload: None,
            reason: None,
        }
    }

    pub fn modify(request_id: ApprovalRequestId, payload: serde_json::Value) -> Self {
        Self {
            request_id,
            decision: ApprovalDecision::Modified,
            modified_payload: Some(payload),
            reason: None,
        }
    }

    pub fn reject(request_id: ApprovalRequestId, reason: impl Into<String>) -> Self {
        Self {
            request_id,
            decision: ApprovalDecision::Rejected,
            modified_payload: None,
            reason: Some(reason.into()),
        }
    }

    /// `reason` must be present and non-blank on rejection.
    pub fn validate(&self) -> Result<(), ApprovalError> {
        let has_reason = self
            .reason
            .as_deref()
            .is_some_and(|r| !r.trim().is_empty());
        if self.decision == ApprovalDecision::Rejected && !has_reason {
            return Err(ApprovalError::MissingReason);
        }
        Ok(())
    }

    /// Outcome delivered to the suspended execution step.
    pub fn into_outcome(self, original: &OperationDescriptor) -> ApprovalOutcome {
        match self.decision {
            ApprovalDecision::Approved => ApprovalOutcome::Approved(original.clone()),
            ApprovalDecision::Modified => {
                let mut op = original.clone();
                if let Some(payload) = self.modified_payload {
                    op.payload = payload;
                }
                ApprovalOutcome::Modified(op)
            }
            ApprovalDecision::Rejected => ApprovalOutcome::Rejected {
                reason: self.reason.unwrap_or_default(),
            },
        }
    }
}

/// What the suspended execution step receives when its approval resolves.
#[derive(Debug, Clone, PartialEq)]
pub enum ApprovalOutcome {
    Approved(OperationDescriptor),
    /// Approved with an edited operation.
    Modified(OperationDescriptor),
    Rejected { reason: String },
    /// Nobody answered in time; handled like a rejection.
    Expired,
}

impl ApprovalOutcome {
    pub fn is_allowed(&self) -> bool {
        matches!(self, ApprovalOutcome::Approved(_) | ApprovalOutcome::Modified(_))
    }

    pub fn status(&self) -> ApprovalStatus {
        match self {
            ApprovalOutcome::Approved(_) => ApprovalStatus::Approved,
            ApprovalOutcome::Modified(_) => ApprovalStatus::Modified,
            ApprovalOutcome::Rejected { .. } => ApprovalStatus::Rejected,
            ApprovalOutcome::Expired => ApprovalStatus::Expired,
        }
    }
}
