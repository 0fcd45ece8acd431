//! Execution runtime port
//!
//! The execution runtime runs one worker agent on one assignment and
//! streams its output back as [`WorkerEvent`]s. A worker that needs human
//! approval sends [`WorkerEvent::Interrupt`] and waits on the reply channel.

use async_trait::async_trait;
use conductor_domain::{ApprovalOutcome, OperationDescriptor, RiskLevel, TurnId, WorkerId};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// Errors starting a worker.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Worker not available: {0}")]
    WorkerUnavailable(WorkerId),

    #[error("Failed to start worker: {0}")]
    StartFailed(String),
}

/// One dispatched step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerAssignment {
    pub turn_id: TurnId,
    pub worker: WorkerId,
    pub instructions: String,
    pub round: u32,
    /// Opaque conversation thread token owned by the runtime.
    pub thread_context: Option<String>,
}

/// Human-in-the-loop interrupt raised mid-step.
#[derive(Debug)]
pub struct InterruptRequest {
    pub operation: OperationDescriptor,
    pub risk_level: RiskLevel,
    /// Receives the resolution. A rejected or expired outcome means the
    /// operation must not be performed.
    pub reply: oneshot::Sender<ApprovalOutcome>,
}

impl InterruptRequest {
    /// Build an interrupt and the receiver the worker waits on.
    pub fn new(
        operation: OperationDescriptor,
        risk_level: RiskLevel,
    ) -> (Self, oneshot::Receiver<ApprovalOutcome>) {
        let (reply, rx) = oneshot::channel();
        (
            Self {
                operation,
                risk_level,
                reply,
            },
            rx,
        )
    }
}

/// Streamed output of a worker.
#[derive(Debug)]
pub enum WorkerEvent {
    Delta(String),
    Interrupt(InterruptRequest),
    /// Final text; used only when no deltas were streamed.
    Completed(String),
    Error(String),
}

/// Handle for receiving a worker's events.
pub struct WorkerStream {
    pub receiver: mpsc::Receiver<WorkerEvent>,
}

impl WorkerStream {
    pub fn new(receiver: mpsc::Receiver<WorkerEvent>) -> Self {
        Self { receiver }
    }
}

/// Port for the agent execution runtime.
#[async_trait]
pub trait ExecutionRuntime: Send + Sync {
    async fn start(&self, assignment: WorkerAssignment) -> Result<WorkerStream, RuntimeError>;
}
