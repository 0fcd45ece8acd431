//! Storage and output locations (`[checkpoints]`, `[events]`, `[logging]`)

use serde::{Deserialize, Serialize};

/// Raw checkpoint configuration from TOML
///
/// Without a directory checkpoints live in memory and die with the process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileCheckpointsConfig {
    pub directory: Option<String>,
}

/// Raw event transcript configuration from TOML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileEventsConfig {
    /// Append every turn event to this JSONL file
    pub jsonl_path: Option<String>,
}

/// Raw diagnostic logging configuration from TOML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// Directory for daily rolling log files
    pub directory: Option<String>,
}
