//! Routing cache key.

use crate::core::ids::WorkerId;
use crate::core::string::normalize_task_text;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Deterministic hash of the normalized task text and the available worker set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Worker order and duplicates do not affect the result.
    pub fn compute<'a>(task: &str, workers: impl IntoIterator<Item = &'a WorkerId>) -> Self {
        let mut ids: Vec<&str> = workers.into_iter().map(|w| w.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();

        let mut hasher = Sha256::new();
        hasher.update(normalize_task_text(task).as_bytes());
        hasher.update([0u8]);
        for id in ids {
            hasher.update(id.as_bytes());
            hasher.update([0u8]);
        }
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
