//! Conversation storage.
//!
//! The store exclusively owns conversations and their turns. Callers read
//! through shared references and mutate only through `append` and
//! `relabel_if_placeholder`, so turn history can only grow.

use crate::conversation::{Conversation, ConversationId, Turn};
use thiserror::Error;

/// Error type for store operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Conversation not found: {0}")]
    NotFound(ConversationId),
}

/// Read/append interface over a set of conversations.
pub trait ConversationStore {
    /// Create an empty conversation and return its identifier.
    fn create(&mut self) -> ConversationId;

    /// Look up a conversation.
    fn get(&self, id: &ConversationId) -> Option<&Conversation>;

    /// All conversations, oldest first.
    fn list(&self) -> Vec<&Conversation>;

    /// Append a turn to a conversation. Returns the new turn's index.
    fn append(&mut self, id: &ConversationId, turn: Turn) -> Result<usize, StoreError>;

    /// Set the label if it is still the placeholder.
    ///
    /// Returns `true` when the label changed.
    fn relabel_if_placeholder(
        &mut self,
        id: &ConversationId,
        label: &str,
    ) -> Result<bool, StoreError>;

    /// Whether a conversation exists.
    fn contains(&self, id: &ConversationId) -> bool {
        self.get(id).is_some()
    }
}

/// In-memory store. Conversations live for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    conversations: Vec<Conversation>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn get_mut(&mut self, id: &ConversationId) -> Result<&mut Conversation, StoreError> {
        self.conversations
            .iter_mut()
            .find(|c| c.id() == id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }
}

impl ConversationStore for MemoryStore {
    fn create(&mut self) -> ConversationId {
        let id = ConversationId::new();
        self.conversations.push(Conversation::new(id.clone()));
        id
    }

    fn get(&self, id: &ConversationId) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id() == id)
    }

    fn list(&self) -> Vec<&Conversation> {
        self.conversations.iter().collect()
    }

    fn append(&mut self, id: &ConversationId, turn: Turn) -> Result<usize, StoreError> {
        Ok(self.get_mut(id)?.push(turn))
    }

    fn relabel_if_placeholder(
        &mut self,
        id: &ConversationId,
        label: &str,
    ) -> Result<bool, StoreError> {
        Ok(self.get_mut(id)?.relabel_if_placeholder(label))
    }
}
