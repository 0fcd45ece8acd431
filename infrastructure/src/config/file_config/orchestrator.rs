//! Orchestrator and routing cache configuration (`[orchestrator]`, `[routing_cache]`)

use conductor_application::{OrchestratorParams, RoutingCacheConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw orchestrator configuration from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOrchestratorConfig {
    /// Refinement rounds allowed before Scoring is forced
    pub max_round_count: u32,
    pub reasoning_timeout_secs: u64,
    /// Silence allowed between two chunks of a worker stream
    pub execution_step_timeout_secs: u64,
    pub approval_timeout_secs: u64,
    /// Score (0-10) a result must reach to be reported as meeting the bar
    pub quality_threshold: f32,
}

impl Default for FileOrchestratorConfig {
    fn default() -> Self {
        let params = OrchestratorParams::default();
        Self {
            max_round_count: params.max_round_count,
            reasoning_timeout_secs: params.reasoning_timeout.as_secs(),
            execution_step_timeout_secs: params.execution_step_timeout.as_secs(),
            approval_timeout_secs: params.approval_timeout.as_secs(),
            quality_threshold: params.quality_threshold,
        }
    }
}

impl FileOrchestratorConfig {
    pub fn to_params(&self) -> OrchestratorParams {
        OrchestratorParams::default()
            .with_max_round_count(self.max_round_count)
            .with_reasoning_timeout(Duration::from_secs(self.reasoning_timeout_secs))
            .with_execution_step_timeout(Duration::from_secs(self.execution_step_timeout_secs))
            .with_approval_timeout(Duration::from_secs(self.approval_timeout_secs))
            .with_quality_threshold(self.quality_threshold)
    }
}

/// Raw routing cache configuration from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRoutingCacheConfig {
    pub ttl_secs: u64,
    pub max_size: usize,
}

impl Default for FileRoutingCacheConfig {
    fn default() -> Self {
        let config = RoutingCacheConfig::default();
        Self {
            ttl_secs: config.ttl.as_secs(),
            max_size: config.max_size,
        }
    }
}

impl FileRoutingCacheConfig {
    pub fn to_config(&self) -> RoutingCacheConfig {
        RoutingCacheConfig::default()
            .with_ttl(Duration::from_secs(self.ttl_secs))
            .with_max_size(self.max_size)
    }
}
