//! Human approval wait inside an execution step.

use super::RunTurnUseCase;
use super::dispatch::RoundContext;
use super::types::PhaseError;
use crate::ports::event_sink::TurnEventSink;
use crate::ports::execution_runtime::ExecutionRuntime;
use crate::ports::reasoning::ReasoningModule;
use crate::services::approval_broker::PendingApproval;
use crate::use_cases::shared::{Bounded, bounded};
use conductor_domain::{
    ApprovalOutcome, ApprovalStatus, OperationDescriptor, RiskLevel, TurnEventKind,
};
use tracing::{debug, warn};

impl<R: ReasoningModule + 'static, X: ExecutionRuntime + 'static> RunTurnUseCase<R, X> {
    /// Raise an approval request and suspend until it is resolved, expires,
    /// or the turn is cancelled.
    ///
    /// The conversation stays locked while waiting. With checkpointing on,
    /// the suspended turn is saved with the pending request id.
    pub(super) async fn await_approval(
        &self,
        ctx: &RoundContext<'_>,
        operation: OperationDescriptor,
        risk_level: RiskLevel,
        sink: &dyn TurnEventSink,
    ) -> Result<ApprovalOutcome, PhaseError> {
        let turn_id = ctx.base.id();
        let PendingApproval {
            request,
            mut receiver,
        } = self.services.broker.raise(turn_id, operation, risk_level);
        let request_id = request.request_id.clone();

        self.emit(
            sink,
            turn_id,
            TurnEventKind::ApprovalRequested {
                request_id: request_id.clone(),
                operation_descriptor: request.operation,
                risk_level,
            },
        );

        if ctx.base.checkpointing_enabled() {
            let mut suspended = ctx.base.clone();
            suspended.set_pending_approval(Some(request_id.clone()))?;
            if let Err(e) = self.services.checkpoints.save(&mut suspended).await {
                warn!(
                    "Could not checkpoint turn {} while awaiting {}: {}",
                    turn_id, request_id, e
                );
            }
        }

        let timeout = self.params.approval_timeout;
        let outcome = match bounded(&mut receiver, timeout, &self.cancellation_token).await {
            Bounded::Ready(Ok(outcome)) => outcome,
            Bounded::Ready(Err(_)) => ApprovalOutcome::Expired,
            Bounded::TimedOut => {
                warn!("Approval {} timed out after {:?}", request_id, timeout);
                match self.services.broker.expire(&request_id) {
                    Ok(_) => ApprovalOutcome::Expired,
                    // Resolved at the deadline; the answer is already in the channel.
                    Err(e) => {
                        debug!("Approval {} settled before expiry: {}", request_id, e);
                        receiver.try_recv().unwrap_or(ApprovalOutcome::Expired)
                    }
                }
            }
            Bounded::Cancelled => {
                if self.services.broker.expire(&request_id).is_ok() {
                    self.emit(
                        sink,
                        turn_id,
                        TurnEventKind::ApprovalResolved {
                            request_id,
                            status: ApprovalStatus::Expired,
                        },
                    );
                }
                return Err(PhaseError::Cancelled);
            }
        };

        self.emit(
            sink,
            turn_id,
            TurnEventKind::ApprovalResolved {
                request_id,
                status: outcome.status(),
            },
        );
        Ok(outcome)
    }
}
