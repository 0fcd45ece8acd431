//! Routing domain
//!
//! - [`RoutingDecision`](decision::RoutingDecision): which workers run a turn and how
//! - [`Fingerprint`](fingerprint::Fingerprint): routing cache key
//! - [`WorkerRegistry`](registry::WorkerRegistry): the known worker set

pub mod decision;
pub mod fingerprint;
pub mod registry;

pub use decision::{ExecutionMode, RejectionPolicy, RoutingDecision, Subtask};
pub use fingerprint::Fingerprint;
pub use registry::{WorkerProfile, WorkerRegistry};
