//! Conversation domain

pub mod entities;

pub use entities::{Conversation, ConversationEntry, Role};
