//! Known worker agents.

use crate::core::ids::WorkerId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A worker agent the execution runtime can run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerProfile {
    pub id: WorkerId,
    pub description: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

impl WorkerProfile {
    pub fn new(id: impl Into<WorkerId>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            capabilities: Vec::new(),
        }
    }

    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.push(capability.into());
        self
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities
            .iter()
            .any(|c| c.eq_ignore_ascii_case(capability))
    }
}

/// The set of workers a routing decision may assign, ordered by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerRegistry {
    workers: BTreeMap<WorkerId, WorkerProfile>,
}

impl WorkerRegistry {
    /// Later profiles with a duplicate id replace earlier ones.
    pub fn new(profiles: impl IntoIterator<Item = WorkerProfile>) -> Self {
        Self {
            workers: profiles.into_iter().map(|p| (p.id.clone(), p)).collect(),
        }
    }

    pub fn get(&self, id: &WorkerId) -> Option<&WorkerProfile> {
        self.workers.get(id)
    }

    pub fn contains(&self, id: &WorkerId) -> bool {
        self.workers.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &WorkerId> {
        self.workers.keys()
    }

    pub fn profiles(&self) -> impl Iterator<Item = &WorkerProfile> {
        self.workers.values()
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Ids from `ids` that are not registered.
    pub fn unknown_in(&self, ids: &[WorkerId]) -> Vec<WorkerId> {
        ids.iter().filter(|id| !self.contains(id)).cloned().collect()
    }

    /// Workers that have any of the given capabilities.
    pub fn with_any_capability(&self, capabilities: &[String]) -> Vec<&WorkerProfile> {
        self.workers
            .values()
            .filter(|p| capabilities.iter().any(|c| p.has_capability(c)))
            .collect()
    }
}
