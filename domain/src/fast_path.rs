//! Fast-path classification
//!
//! Simple, history-free tasks bypass the full pipeline and are answered
//! directly by the reasoning module.

use crate::conversation::Conversation;

/// Cheap synchronous check owned by the reasoning module.
pub trait SimplicityHeuristic: Send + Sync {
    fn is_simple(&self, task: &str) -> bool;
}

/// Length and keyword based [`SimplicityHeuristic`].
#[derive(Debug, Clone)]
pub struct KeywordSimplicityHeuristic {
    /// Tasks longer than this (in chars) are never simple.
    pub max_chars: usize,
    /// Any of these words marks the task as complex.
    pub complex_keywords: Vec<String>,
}

impl Default for KeywordSimplicityHeuristic {
    fn default() -> Self {
        Self {
            max_chars: 80,
            complex_keywords: [
                "implement", "refactor", "analyze", "analyse", "build", "write", "create",
                "design", "debug", "compare", "plan", "review", "fix", "deploy",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl KeywordSimplicityHeuristic {
    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }
}

impl SimplicityHeuristic for KeywordSimplicityHeuristic {
    fn is_simple(&self, task: &str) -> bool {
        let task = task.trim();
        if task.is_empty() || task.chars().count() > self.max_chars || task.contains('\n') {
            return false;
        }
        !task
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .any(|word| {
                self.complex_keywords
                    .iter()
                    .any(|k| word.eq_ignore_ascii_case(k))
            })
    }
}

/// Decides whether a turn may bypass the pipeline.
pub struct FastPathClassifier;

impl FastPathClassifier {
    /// Never fast-paths a conversation that carries history, whatever the
    /// heuristic says: the direct responder is stateless.
    pub fn should_fast_path(
        task: &str,
        conversation: &Conversation,
        heuristic: &dyn SimplicityHeuristic,
    ) -> bool {
        if conversation.has_history() || conversation.has_assistant_output() {
            return false;
        }
        heuristic.is_simple(task)
    }
}
