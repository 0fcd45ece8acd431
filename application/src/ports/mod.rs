//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod checkpoint_store;
pub mod clock;
pub mod conversation_store;
pub mod event_sink;
pub mod execution_runtime;
pub mod reasoning;
