//! Approval broker.
//!
//! Tracks human-approval requests raised mid-Execution. The suspended step
//! waits on the [`PendingApproval`] receiver; [`ApprovalBroker::resolve`] or
//! [`ApprovalBroker::expire`] fulfils it exactly once.

use crate::ports::clock::Clock;
use conductor_domain::{
    ApprovalError, ApprovalOutcome, ApprovalRequest, ApprovalRequestId, ApprovalResponse,
    ApprovalStatus, OperationDescriptor, RiskLevel, TurnId,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::oneshot;
use tracing::{info, warn};

struct BrokerEntry {
    request: ApprovalRequest,
    responder: Option<oneshot::Sender<ApprovalOutcome>>,
}

/// A freshly raised request and the channel its resolution arrives on.
pub struct PendingApproval {
    pub request: ApprovalRequest,
    pub receiver: oneshot::Receiver<ApprovalOutcome>,
}

pub struct ApprovalBroker {
    clock: Arc<dyn Clock>,
    requests: Mutex<HashMap<ApprovalRequestId, BrokerEntry>>,
}

impl ApprovalBroker {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            requests: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ApprovalRequestId, BrokerEntry>> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a new pending request for `turn_id`.
    pub fn raise(
        &self,
        turn_id: &TurnId,
        operation: OperationDescriptor,
        risk_level: RiskLevel,
    ) -> PendingApproval {
        let request = ApprovalRequest::new(
            ApprovalRequestId::generate(),
            turn_id.clone(),
            operation,
            risk_level,
            self.clock.now(),
        );
        let (tx, rx) = oneshot::channel();
        info!(
            "Approval {} raised for turn {}: {} ({} risk)",
            request.request_id, turn_id, request.operation.name, risk_level
        );
        self.lock().insert(
            request.request_id.clone(),
            BrokerEntry {
                request: request.clone(),
                responder: Some(tx),
            },
        );
        PendingApproval {
            request,
            receiver: rx,
        }
    }

    /// Apply an external response. Only the first resolution is accepted.
    pub fn resolve(&self, response: ApprovalResponse) -> Result<ApprovalRequest, ApprovalError> {
        response.validate()?;
        let now = self.clock.now();
        let mut requests = self.lock();
        let entry = requests
            .get_mut(&response.request_id)
            .ok_or_else(|| ApprovalError::NotFound(response.request_id.clone()))?;

        let status = response.decision.status();
        Self::settle(entry, status, now)?;
        let outcome = response.into_outcome(&entry.request.operation);
        info!("Approval {} resolved: {}", entry.request.request_id, status);
        if let Some(tx) = entry.responder.take() {
            // The waiting step may have been abandoned already
            let _ = tx.send(outcome);
        }
        Ok(entry.request.clone())
    }

    /// Expire a pending request; the waiting step sees it as rejected.
    pub fn expire(&self, request_id: &ApprovalRequestId) -> Result<ApprovalRequest, ApprovalError> {
        let now = self.clock.now();
        let mut requests = self.lock();
        let entry = requests
            .get_mut(request_id)
            .ok_or_else(|| ApprovalError::NotFound(request_id.clone()))?;
        Self::settle(entry, ApprovalStatus::Expired, now)?;
        warn!("Approval {} expired", request_id);
        if let Some(tx) = entry.responder.take() {
            let _ = tx.send(ApprovalOutcome::Expired);
        }
        Ok(entry.request.clone())
    }

    fn settle(
        entry: &mut BrokerEntry,
        status: ApprovalStatus,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), ApprovalError> {
        let current = entry.request.status();
        entry
            .request
            .resolve(status, now)
            .map_err(|_| ApprovalError::AlreadyResolved(entry.request.request_id.clone(), current))
    }

    /// Expire every pending request of a turn. Returns the expired ids.
    pub fn expire_turn(&self, turn_id: &TurnId) -> Vec<ApprovalRequestId> {
        let pending: Vec<ApprovalRequestId> = self
            .lock()
            .values()
            .filter(|e| &e.request.turn_id == turn_id && e.request.status().is_pending())
            .map(|e| e.request.request_id.clone())
            .collect();
        pending
            .into_iter()
            .filter(|id| self.expire(id).is_ok())
            .collect()
    }

    /// Drop all records of a finished turn.
    pub fn forget_turn(&self, turn_id: &TurnId) {
        self.lock().retain(|_, e| &e.request.turn_id != turn_id);
    }

    pub fn get(&self, request_id: &ApprovalRequestId) -> Option<ApprovalRequest> {
        self.lock().get(request_id).map(|e| e.request.clone())
    }

    /// Outstanding requests, oldest first.
    pub fn pending(&self) -> Vec<ApprovalRequest> {
        let mut pending: Vec<ApprovalRequest> = self
            .lock()
            .values()
            .filter(|e| e.request.status().is_pending())
            .map(|e| e.request.clone())
            .collect();
        pending.sort_by_key(|r| r.created_at);
        pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::clock::ManualClock;
    use serde_json::json;

    fn broker() -> ApprovalBroker {
        ApprovalBroker::new(Arc::new(ManualClock::default()))
    }

    fn op() -> OperationDescriptor {
        OperationDescriptor::new("shell", "rm -rf build").with_payload(json!({"cmd": "rm -rf build"}))
    }

    #[tokio::test]
    async fn test_resolve_unblocks_waiter() {
        let broker = broker();
        let pending = broker.raise(&TurnId::new("t"), op(), RiskLevel::High);
        let id = pending.request.request_id.clone();

        let resolved = broker.resolve(ApprovalResponse::approve(id.clone())).unwrap();
        assert_eq!(resolved.status(), ApprovalStatus::Approved);
        assert_eq!(pending.receiver.await.unwrap(), ApprovalOutcome::Approved(op()));
    }

    #[tokio::test]
    async fn test_second_resolution_rejected_and_status_unchanged() {
        let broker = broker();
        let pending = broker.raise(&TurnId::new("t"), op(), RiskLevel::High);
        let id = pending.request.request_id.clone();

        broker
            .resolve(ApprovalResponse::reject(id.clone(), "unsafe"))
            .unwrap();
        let err = broker.resolve(ApprovalResponse::approve(id.clone())).unwrap_err();
        assert_eq!(
            err,
            ApprovalError::AlreadyResolved(id.clone(), ApprovalStatus::Rejected)
        );
        assert_eq!(broker.get(&id).unwrap().status(), ApprovalStatus::Rejected);
        assert!(broker.expire(&id).is_err());
        assert_eq!(
            pending.receiver.await.unwrap(),
            ApprovalOutcome::Rejected {
                reason: "unsafe".into()
            }
        );
    }

    #[test]
    fn test_reject_without_reason_leaves_request_pending() {
        let broker = broker();
        let pending = broker.raise(&TurnId::new("t"), op(), RiskLevel::Low);
        let id = pending.request.request_id.clone();

        let mut response = ApprovalResponse::reject(id.clone(), "x");
        response.reason = None;
        assert_eq!(broker.resolve(response), Err(ApprovalError::MissingReason));
        assert!(broker.get(&id).unwrap().status().is_pending());
    }

    #[test]
    fn test_unknown_request() {
        let broker = broker();
        let id = ApprovalRequestId::new("apr-missing");
        assert_eq!(
            broker.resolve(ApprovalResponse::approve(id.clone())),
            Err(ApprovalError::NotFound(id))
        );
    }

    #[tokio::test]
    async fn test_expire_turn_only_touches_that_turn() {
        let broker = broker();
        let a = broker.raise(&TurnId::new("a"), op(), RiskLevel::Medium);
        let b = broker.raise(&TurnId::new("b"), op(), RiskLevel::Medium);

        let expired = broker.expire_turn(&TurnId::new("a"));
        assert_eq!(expired, vec![a.request.request_id.clone()]);
        assert_eq!(a.receiver.await.unwrap(), ApprovalOutcome::Expired);

        let pending = broker.pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].request_id, b.request.request_id);
    }

    #[test]
    fn test_forget_turn() {
        let broker = broker();
        let a = broker.raise(&TurnId::new("a"), op(), RiskLevel::Low);
        broker.forget_turn(&TurnId::new("a"));
        assert!(broker.get(&a.request.request_id).is_none());
    }

    #[test]
    fn test_resolve_after_waiter_dropped_still_records() {
        let broker = broker();
        let pending = broker.raise(&TurnId::new("t"), op(), RiskLevel::Low);
        let id = pending.request.request_id.clone();
        drop(pending);
        let resolved = broker
            .resolve(ApprovalResponse::modify(id, json!({"cmd": "ls"})))
            .unwrap();
        assert_eq!(resolved.status(), ApprovalStatus::Modified);
    }
}
