//! Orchestrator parameters: phase loop control.
//!
//! [`OrchestratorParams`] groups the static parameters that control the
//! phase loop in [`RunTurnUseCase`](crate::use_cases::run_turn::RunTurnUseCase).
//! These are application-layer concerns, not domain policy.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Phase loop control parameters.
///
/// Every suspension point has its own timeout:
///
/// | Suspension point        | Timeout                  | Error kind on expiry                 |
/// |-------------------------|--------------------------|--------------------------------------|
/// | Reasoning module call   | `reasoning_timeout`      | `analysis_error` / `reasoning_timeout` |
/// | Next execution chunk    | `execution_step_timeout` | `execution_timeout`                  |
/// | Approval wait           | `approval_timeout`       | request expires (treated as rejected) |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorParams {
    /// Maximum number of refinement rounds (Executing ⇄ Evaluating).
    pub max_round_count: u32,
    pub reasoning_timeout: Duration,
    pub execution_step_timeout: Duration,
    pub approval_timeout: Duration,
    /// Score at or above which `meets_threshold` is set.
    pub quality_threshold: f32,
}

impl Default for OrchestratorParams {
    fn default() -> Self {
        Self {
            max_round_count: 3,
            reasoning_timeout: Duration::from_secs(60),
            execution_step_timeout: Duration::from_secs(120),
            approval_timeout: Duration::from_secs(300),
            quality_threshold: 7.0,
        }
    }
}

impl OrchestratorParams {
    // ==================== Builder Methods ====================

    pub fn with_max_round_count(mut self, max: u32) -> Self {
        self.max_round_count = max;
        self
    }

    pub fn with_reasoning_timeout(mut self, timeout: Duration) -> Self {
        self.reasoning_timeout = timeout;
        self
    }

    pub fn with_execution_step_timeout(mut self, timeout: Duration) -> Self {
        self.execution_step_timeout = timeout;
        self
    }

    pub fn with_approval_timeout(mut self, timeout: Duration) -> Self {
        self.approval_timeout = timeout;
        self
    }

    pub fn with_quality_threshold(mut self, threshold: f32) -> Self {
        self.quality_threshold = threshold;
        self
    }
}

/// Routing cache sizing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingCacheConfig {
    /// Entries at least this old are treated as a miss.
    pub ttl: Duration,
    /// Maximum number of live entries.
    pub max_size: usize,
}

impl Default for RoutingCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            max_size: 1024,
        }
    }
}

impl RoutingCacheConfig {
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }
}
