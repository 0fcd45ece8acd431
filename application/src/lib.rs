//! Application layer for conductor
//!
//! This crate contains the turn orchestrator, the services it shares between
//! turns, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod services;
pub mod use_cases;

// Re-export commonly used types
pub use config::{OrchestratorParams, RoutingCacheConfig};
pub use ports::{
    checkpoint_store::{CheckpointStore, CheckpointStoreError},
    clock::{Clock, ManualClock, SystemClock},
    conversation_store::{ConversationStore, ConversationStoreError},
    event_sink::{ChannelEventSink, CompositeEventSink, NoEventSink, TurnEventSink},
    execution_runtime::{
        ExecutionRuntime, InterruptRequest, RuntimeError, WorkerAssignment, WorkerEvent,
        WorkerStream,
    },
    reasoning::{QualityAssessment, ReasoningError, ReasoningModule},
};
pub use services::{
    TurnServices,
    approval_broker::{ApprovalBroker, PendingApproval},
    checkpoint_manager::{CheckpointError, CheckpointManager},
    concurrency_guard::{ConcurrencyGuard, ConcurrentExecutionError, GuardToken},
    routing_cache::{CacheStats, RoutingCache},
};
pub use use_cases::run_turn::{RunTurnError, RunTurnOutput, RunTurnUseCase};
