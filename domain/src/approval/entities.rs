//! Approval request entity

use crate::core::error::DomainError;
use crate::core::ids::{ApprovalRequestId, TurnId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Risk level reported by the execution runtime for an interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// Read-only or easily reversible
    Low,
    Medium,
    /// Modifies state outside the conversation
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            _ => Err(format!("Invalid RiskLevel: {}", s)),
        }
    }
}

/// Lifecycle of an approval request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Modified,
    Rejected,
    Expired,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Modified => "modified",
            ApprovalStatus::Rejected => "rejected",
            ApprovalStatus::Expired => "expired",
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, ApprovalStatus::Pending)
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The operation the worker wants to perform, as described by the runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationDescriptor {
    pub name: String,
    pub summary: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl OperationDescriptor {
    pub fn new(name: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            summary: summary.into(),
            payload: serde_json::Value::Null,
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

/// A pending or resolved human-approval request (Entity)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRequest {
    pub request_id: ApprovalRequestId,
    pub turn_id: TurnId,
    pub operation: OperationDescriptor,
    pub risk_level: RiskLevel,
    status: ApprovalStatus,
    pub created_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
}

impl ApprovalRequest {
    pub fn new(
        request_id: ApprovalRequestId,
        turn_id: TurnId,
        operation: OperationDescriptor,
        risk_level: RiskLevel,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            request_id,
            turn_id,
            operation,
            risk_level,
            status: ApprovalStatus::Pending,
            created_at,
            resolved_at: None,
        }
    }

    pub fn status(&self) -> ApprovalStatus {
        self.status
    }

    pub fn resolved_at(&self) -> Option<DateTime<Utc>> {
        self.resolved_at
    }

    /// Resolve the request. Only a pending request can be resolved, and
    /// only to a non-pending status.
    pub fn resolve(&mut self, status: ApprovalStatus, now: DateTime<Utc>) -> Result<(), DomainError> {
        if !self.status.is_pending() || status.is_pending() {
            return Err(DomainError::ApprovalNotPending);
        }
        self.status = status;
        self.resolved_at = Some(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ApprovalRequest {
        ApprovalRequest::new(
            ApprovalRequestId::new("apr-1"),
            TurnId::new("turn-1"),
            OperationDescriptor::new("shell", "rm -rf build/"),
            RiskLevel::High,
            Utc::now(),
        )
    }

    #[test]
    fn test_resolve_once() {
        let mut req = request();
        assert!(req.status().is_pending());
        req.resolve(ApprovalStatus::Approved, Utc::now()).unwrap();
        assert_eq!(req.status(), ApprovalStatus::Approved);
        assert!(req.resolved_at().is_some());

        assert_eq!(
            req.resolve(ApprovalStatus::Rejected, Utc::now()),
            Err(DomainError::ApprovalNotPending)
        );
        assert_eq!(req.status(), ApprovalStatus::Approved);
    }

    #[test]
    fn test_cannot_resolve_to_pending() {
        let mut req = request();
        assert!(req.resolve(ApprovalStatus::Pending, Utc::now()).is_err());
        assert!(req.resolved_at().is_none());
    }

    #[test]
    fn test_risk_level_ordering_and_parse() {
        assert!(RiskLevel::High > RiskLevel::Low);
        assert_eq!("HIGH".parse::<RiskLevel>().unwrap(), RiskLevel::High);
        assert!("extreme".parse::<RiskLevel>().is_err());
    }
}
