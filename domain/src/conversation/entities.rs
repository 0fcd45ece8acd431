//! Conversation domain entities

use crate::core::ids::{ConversationId, TurnId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of an entry in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One recorded message of a finished turn (Entity)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub turn_id: TurnId,
    pub role: Role,
    pub content: String,
    pub at: DateTime<Utc>,
}

impl ConversationEntry {
    pub fn user(turn_id: TurnId, content: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            turn_id,
            role: Role::User,
            content: content.into(),
            at,
        }
    }

    pub fn assistant(turn_id: TurnId, content: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            turn_id,
            role: Role::Assistant,
            content: content.into(),
            at,
        }
    }
}

/// A conversation thread (Entity)
///
/// Created on the first message and only ever appended to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    id: ConversationId,
    entries: Vec<ConversationEntry>,
    /// Opaque thread token owned by the execution runtime.
    thread_context: Option<String>,
}

impl Conversation {
    pub fn new(id: ConversationId) -> Self {
        Self {
            id,
            entries: Vec::new(),
            thread_context: None,
        }
    }

    pub fn with_thread_context(mut self, token: impl Into<String>) -> Self {
        self.thread_context = Some(token.into());
        self
    }

    pub fn id(&self) -> &ConversationId {
        &self.id
    }

    pub fn entries(&self) -> &[ConversationEntry] {
        &self.entries
    }

    pub fn thread_context(&self) -> Option<&str> {
        self.thread_context.as_deref()
    }

    pub fn set_thread_context(&mut self, token: Option<String>) {
        self.thread_context = token;
    }

    pub fn append(&mut self, entry: ConversationEntry) {
        self.entries.push(entry);
    }

    /// Record a finished turn as a user/assistant pair.
    pub fn record_turn(
        &mut self,
        turn_id: &TurnId,
        task: &str,
        answer: &str,
        at: DateTime<Utc>,
    ) {
        self.append(ConversationEntry::user(turn_id.clone(), task, at));
        self.append(ConversationEntry::assistant(turn_id.clone(), answer, at));
    }

    /// True when the thread already carries anything a stateless responder would lose.
    pub fn has_history(&self) -> bool {
        !self.entries.is_empty() || self.thread_context.is_some()
    }

    pub fn has_assistant_output(&self) -> bool {
        self.entries.iter().any(|e| e.role == Role::Assistant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_conversation_is_empty() {
        let conv = Conversation::new(ConversationId::new("c"));
        assert!(!conv.has_history());
        assert!(!conv.has_assistant_output());
        assert!(conv.entries().is_empty());
    }

    #[test]
    fn test_record_turn_appends_pair() {
        let mut conv = Conversation::new(ConversationId::new("c"));
        conv.record_turn(&TurnId::new("t1"), "hi", "hello", Utc::now());
        assert_eq!(conv.entries().len(), 2);
        assert_eq!(conv.entries()[0].role, Role::User);
        assert_eq!(conv.entries()[1].role, Role::Assistant);
        assert!(conv.has_assistant_output());
    }

    #[test]
    fn test_thread_context_counts_as_history() {
        let conv = Conversation::new(ConversationId::new("c")).with_thread_context("thread-9");
        assert!(conv.has_history());
        assert!(!conv.has_assistant_output());
    }
}
