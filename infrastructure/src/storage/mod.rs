//! Storage adapters for checkpoints and conversations.
//!
//! [`FileCheckpointStore`] is selected when `[checkpoints] directory` is set;
//! everything else lives in process memory.

mod checkpoint;
mod conversation;

pub use checkpoint::{FileCheckpointStore, InMemoryCheckpointStore};
pub use conversation::InMemoryConversationStore;
