//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and converted into application types.

mod approvals;
mod orchestrator;
mod storage;
mod workers;

pub use approvals::{ApprovalPolicy, FileApprovalsConfig};
pub use orchestrator::{FileOrchestratorConfig, FileRoutingCacheConfig};
pub use storage::{FileCheckpointsConfig, FileEventsConfig, FileLoggingConfig};
pub use workers::FileWorkerConfig;

use conductor_domain::WorkerRegistry;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Error, PartialEq)]
pub enum ConfigValidationError {
    #[error("{0} cannot be 0")]
    ZeroValue(&'static str),

    #[error("quality_threshold must be between 0 and 10, got {0}")]
    InvalidThreshold(f32),

    #[error("worker id cannot be empty")]
    EmptyWorkerId,

    #[error("worker '{0}' is defined more than once")]
    DuplicateWorker(String),

    #[error("at least one worker must be configured")]
    NoWorkers,
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub orchestrator: FileOrchestratorConfig,
    pub routing_cache: FileRoutingCacheConfig,
    pub checkpoints: FileCheckpointsConfig,
    pub events: FileEventsConfig,
    pub logging: FileLoggingConfig,
    pub approvals: FileApprovalsConfig,
    pub workers: Vec<FileWorkerConfig>,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            orchestrator: FileOrchestratorConfig::default(),
            routing_cache: FileRoutingCacheConfig::default(),
            checkpoints: FileCheckpointsConfig::default(),
            events: FileEventsConfig::default(),
            logging: FileLoggingConfig::default(),
            approvals: FileApprovalsConfig::default(),
            workers: workers::default_workers(),
        }
    }
}

impl FileConfig {
    /// Reject values the orchestrator cannot run with.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let o = &self.orchestrator;
        for (name, value) in [
            ("orchestrator.reasoning_timeout_secs", o.reasoning_timeout_secs),
            (
                "orchestrator.execution_step_timeout_secs",
                o.execution_step_timeout_secs,
            ),
            ("orchestrator.approval_timeout_secs", o.approval_timeout_secs),
            ("routing_cache.ttl_secs", self.routing_cache.ttl_secs),
        ] {
            if value == 0 {
                return Err(ConfigValidationError::ZeroValue(name));
            }
        }
        if self.routing_cache.max_size == 0 {
            return Err(ConfigValidationError::ZeroValue("routing_cache.max_size"));
        }
        if !(0.0..=10.0).contains(&o.quality_threshold) {
            return Err(ConfigValidationError::InvalidThreshold(o.quality_threshold));
        }

        if self.workers.is_empty() {
            return Err(ConfigValidationError::NoWorkers);
        }
        let mut seen = HashSet::new();
        for worker in &self.workers {
            let id = worker.id.trim();
            if id.is_empty() {
                return Err(ConfigValidationError::EmptyWorkerId);
            }
            if !seen.insert(id) {
                return Err(ConfigValidationError::DuplicateWorker(id.to_string()));
            }
        }
        Ok(())
    }

    pub fn worker_registry(&self) -> WorkerRegistry {
        WorkerRegistry::new(self.workers.iter().map(FileWorkerConfig::to_profile))
    }
}
