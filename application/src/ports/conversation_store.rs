//! Conversation storage port

use async_trait::async_trait;
use conductor_domain::{Conversation, ConversationEntry, ConversationId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConversationStoreError {
    #[error("Storage error: {0}")]
    Storage(String),
}

#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Load a conversation, creating an empty one on first use.
    async fn load_or_create(&self, id: &ConversationId) -> Result<Conversation, ConversationStoreError>;

    async fn append(
        &self,
        id: &ConversationId,
        entries: Vec<ConversationEntry>,
    ) -> Result<(), ConversationStoreError>;
}
