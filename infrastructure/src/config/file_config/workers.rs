//! Worker registry configuration (`[[workers]]` array)

use conductor_domain::WorkerProfile;
use serde::{Deserialize, Serialize};

/// Raw worker entry from TOML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileWorkerConfig {
    pub id: String,
    pub description: String,
    pub capabilities: Vec<String>,
}

impl FileWorkerConfig {
    pub fn new(id: &str, description: &str, capabilities: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            description: description.to_string(),
            capabilities: capabilities.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn to_profile(&self) -> WorkerProfile {
        self.capabilities.iter().fold(
            WorkerProfile::new(self.id.trim(), self.description.as_str()),
            |profile, capability| profile.with_capability(capability.as_str()),
        )
    }
}

/// Registry used when the configuration names no workers.
pub(super) fn default_workers() -> Vec<FileWorkerConfig> {
    vec![
        FileWorkerConfig::new(
            "coder",
            "Writes and changes code",
            &["code", "implement", "debug", "refactor"],
        ),
        FileWorkerConfig::new(
            "reviewer",
            "Reviews changes and finds defects",
            &["review", "test", "analyze"],
        ),
        FileWorkerConfig::new(
            "writer",
            "Writes documentation and summaries",
            &["docs", "write", "explain"],
        ),
    ]
}
