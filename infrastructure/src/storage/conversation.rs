//! In-memory conversation store.

use async_trait::async_trait;
use conductor_application::{ConversationStore, ConversationStoreError};
use conductor_domain::{Conversation, ConversationEntry, ConversationId};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Conversations keyed by id, created empty on first use.
#[derive(Default)]
pub struct InMemoryConversationStore {
    conversations: Mutex<HashMap<ConversationId, Conversation>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ConversationId, Conversation>> {
        self.conversations.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Seed or replace a conversation, e.g. one carrying a thread token.
    pub fn insert(&self, conversation: Conversation) {
        self.lock().insert(conversation.id().clone(), conversation);
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn load_or_create(
        &self,
        id: &ConversationId,
    ) -> Result<Conversation, ConversationStoreError> {
        Ok(self
            .lock()
            .entry(id.clone())
            .or_insert_with(|| Conversation::new(id.clone()))
            .clone())
    }

    async fn append(
        &self,
        id: &ConversationId,
        entries: Vec<ConversationEntry>,
    ) -> Result<(), ConversationStoreError> {
        let mut conversations = self.lock();
        let conversation = conversations
            .entry(id.clone())
            .or_insert_with(|| Conversation::new(id.clone()));
        for entry in entries {
            conversation.append(entry);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use conductor_domain::TurnId;

    #[tokio::test]
    async fn test_load_creates_empty() {
        let store = InMemoryConversationStore::new();
        let conversation = store
            .load_or_create(&ConversationId::new("c"))
            .await
            .unwrap();
        assert!(!conversation.has_history());
    }

    #[tokio::test]
    async fn test_append_accumulates() {
        let store = InMemoryConversationStore::new();
        let id = ConversationId::new("c");
        let turn = TurnId::new("t");
        store
            .append(
                &id,
                vec![
                    ConversationEntry::user(turn.clone(), "hi", Utc::now()),
                    ConversationEntry::assistant(turn, "hello", Utc::now()),
                ],
            )
            .await
            .unwrap();

        let conversation = store.load_or_create(&id).await.unwrap();
        assert_eq!(conversation.entries().len(), 2);
        assert!(conversation.has_assistant_output());
    }

    #[tokio::test]
    async fn test_seeded_thread_context_counts_as_history() {
        let store = InMemoryConversationStore::new();
        store.insert(Conversation::new(ConversationId::new("c")).with_thread_context("thr-1"));
        let conversation = store
            .load_or_create(&ConversationId::new("c"))
            .await
            .unwrap();
        assert!(conversation.has_history());
    }
}
