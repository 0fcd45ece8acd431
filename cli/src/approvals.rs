//! Answers approval requests raised while a turn runs.

use conductor_application::ApprovalBroker;
use conductor_domain::{ApprovalRequestId, ApprovalResponse, OperationDescriptor, RiskLevel};
use conductor_infrastructure::ApprovalPolicy;
use std::io::{BufRead, IsTerminal, Write};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

pub struct ApprovalResponder {
    broker: Arc<ApprovalBroker>,
    policy: ApprovalPolicy,
    /// How long to wait for a terminal answer before leaving the request to expire
    answer_timeout: Duration,
    lines: Option<mpsc::UnboundedReceiver<String>>,
}

impl ApprovalResponder {
    pub fn new(broker: Arc<ApprovalBroker>, policy: ApprovalPolicy, answer_timeout: Duration) -> Self {
        let lines = (policy == ApprovalPolicy::Interactive && std::io::stdin().is_terminal())
            .then(spawn_stdin_reader);
        Self {
            broker,
            policy,
            answer_timeout,
            lines,
        }
    }

    /// Decide one request and hand the answer to the broker.
    pub async fn answer(
        &mut self,
        request_id: &ApprovalRequestId,
        operation: &OperationDescriptor,
        risk_level: RiskLevel,
    ) {
        let response = match self.policy {
            ApprovalPolicy::AutoApprove => ApprovalResponse::approve(request_id.clone()),
            ApprovalPolicy::AutoReject => {
                ApprovalResponse::reject(request_id.clone(), "rejected by approval policy")
            }
            ApprovalPolicy::Interactive => match self.ask(operation, risk_level).await {
                Some(true) => ApprovalResponse::approve(request_id.clone()),
                Some(false) => ApprovalResponse::reject(request_id.clone(), "rejected by operator"),
                None => {
                    warn!(
                        "No answer for approval {}; it will expire on its own",
                        request_id
                    );
                    return;
                }
            },
        };

        match self.broker.resolve(response) {
            Ok(request) => debug!("Answered approval {}", request.request_id),
            // Usually the request expired while we were asking
            Err(e) => warn!("Approval {} not resolved: {}", request_id, e),
        }
    }

    async fn ask(&mut self, operation: &OperationDescriptor, risk_level: RiskLevel) -> Option<bool> {
        let lines = self.lines.as_mut()?;

        let mut stderr = std::io::stderr();
        let _ = write!(
            stderr,
            "Approve {} ({} risk)? {}\n[y/N] ",
            operation.name, risk_level, operation.summary
        );
        let _ = stderr.flush();

        let line = tokio::time::timeout(self.answer_timeout, lines.recv())
            .await
            .ok()??;
        Some(parse_answer(&line))
    }
}

/// Read stdin on a plain thread so a pending read never holds up shutdown.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn parse_answer(line: &str) -> bool {
    matches!(line.trim().to_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_application::SystemClock;
    use conductor_domain::{ApprovalStatus, TurnId};

    fn operation() -> OperationDescriptor {
        OperationDescriptor::new("deploy", "deploy to prod")
            .with_payload(serde_json::json!({"target": "prod"}))
    }

    #[test]
    fn test_parse_answer() {
        assert!(parse_answer("y"));
        assert!(parse_answer(" YES \n"));
        assert!(!parse_answer(""));
        assert!(!parse_answer("no"));
    }

    #[tokio::test]
    async fn test_auto_policies_resolve_pending_request() {
        let broker = Arc::new(ApprovalBroker::new(Arc::new(SystemClock)));

        let approve = broker.raise(&TurnId::new("t1"), operation(), RiskLevel::High);
        let mut responder = ApprovalResponder::new(
            broker.clone(),
            ApprovalPolicy::AutoApprove,
            Duration::from_secs(1),
        );
        responder
            .answer(&approve.request.request_id, &operation(), RiskLevel::High)
            .await;
        assert_eq!(approve.receiver.await.unwrap().status(), ApprovalStatus::Approved);

        let reject = broker.raise(&TurnId::new("t2"), operation(), RiskLevel::High);
        let mut responder = ApprovalResponder::new(
            broker.clone(),
            ApprovalPolicy::AutoReject,
            Duration::from_secs(1),
        );
        responder
            .answer(&reject.request.request_id, &operation(), RiskLevel::High)
            .await;
        assert_eq!(reject.receiver.await.unwrap().status(), ApprovalStatus::Rejected);
    }
}
