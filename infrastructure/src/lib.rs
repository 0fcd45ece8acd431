//! Infrastructure layer for conductor
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, plus configuration file loading.

pub mod config;
pub mod local;
pub mod logging;
pub mod storage;

// Re-export commonly used types
pub use config::{ApprovalPolicy, ConfigLoader, ConfigValidationError, FileConfig};
pub use local::{OfflineExecutionRuntime, OfflineReasoningModule};
pub use logging::JsonlEventSink;
pub use storage::{FileCheckpointStore, InMemoryCheckpointStore, InMemoryConversationStore};
