//! Application-level configuration.
//!
//! - [`OrchestratorParams`]: phase loop control (round limit, timeouts)
//! - [`RoutingCacheConfig`]: routing cache ttl and size bound

pub mod orchestrator_params;

pub use orchestrator_params::{OrchestratorParams, RoutingCacheConfig};
