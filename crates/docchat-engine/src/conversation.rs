//! Conversation and turn types.
//!
//! A [`Conversation`] is an ordered, append-only list of [`Turn`]s plus a
//! display label. Turns are never edited or removed once created.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Label every conversation starts with until its first answered prompt.
pub const PLACEHOLDER_LABEL: &str = "New chat";

/// Identifier of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    /// Generate a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Borrow the identifier as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConversationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Source of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emitter {
    /// The person typing prompts.
    User,
    /// The answering backend.
    Assistant,
    /// A failure produced by the client itself.
    Error,
}

impl Emitter {
    /// Lowercase name used in logs and exports.
    pub fn as_str(self) -> &'static str {
        match self {
            Emitter::User => "user",
            Emitter::Assistant => "assistant",
            Emitter::Error => "error",
        }
    }
}

/// A single message in a conversation.
///
/// Fields are private so a turn cannot change after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    emitter: Emitter,
    message: String,
    created_at: DateTime<Utc>,
}

impl Turn {
    /// Create a turn stamped with the current time.
    pub fn new(emitter: Emitter, message: impl Into<String>) -> Self {
        Self {
            emitter,
            message: message.into(),
            created_at: Utc::now(),
        }
    }

    /// Create a user turn.
    pub fn user(message: impl Into<String>) -> Self {
        Self::new(Emitter::User, message)
    }

    /// Create an assistant turn.
    pub fn assistant(message: impl Into<String>) -> Self {
        Self::new(Emitter::Assistant, message)
    }

    /// Create an error turn.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Emitter::Error, message)
    }

    pub fn emitter(&self) -> Emitter {
        self.emitter
    }

    /// The raw message text, exactly as received.
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// The message text as it should be shown.
    pub fn display_text(&self) -> &str {
        display_text(&self.message)
    }
}

/// Normalize a message for display.
///
/// Answers frequently start with a blank paragraph; a single leading
/// `"\n\n"` is dropped. Anything else is returned unchanged.
pub fn display_text(message: &str) -> &str {
    message.strip_prefix("\n\n").unwrap_or(message)
}

/// A conversation: identifier, label and ordered turns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    id: ConversationId,
    label: String,
    /// Set once the placeholder has been replaced.
    #[serde(default)]
    labeled: bool,
    turns: Vec<Turn>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Create an empty conversation carrying the placeholder label.
    pub fn new(id: ConversationId) -> Self {
        let now = Utc::now();
        Self {
            id,
            label: PLACEHOLDER_LABEL.to_string(),
            labeled: false,
            turns: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> &ConversationId {
        &self.id
    }

    /// Display label ("New chat" until the first answer arrives).
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether the label has never been replaced.
    pub fn has_placeholder_label(&self) -> bool {
        !self.labeled
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Append a turn. Returns the index it was stored at.
    pub(crate) fn push(&mut self, turn: Turn) -> usize {
        self.turns.push(turn);
        self.updated_at = Utc::now();
        self.turns.len() - 1
    }

    /// Replace the placeholder label. No-op once a real label is set.
    pub(crate) fn relabel_if_placeholder(&mut self, label: &str) -> bool {
        if !self.has_placeholder_label() {
            return false;
        }
        self.label = label.to_string();
        self.labeled = true;
        self.updated_at = Utc::now();
        true
    }

    /// Render the conversation as a markdown transcript.
    pub fn to_markdown(&self) -> String {
        use std::fmt::Write;

        let mut out = format!("# {}\n\n", self.label);
        for turn in &self.turns {
            let heading = match turn.emitter {
                Emitter::User => "You",
                Emitter::Assistant => "Assistant",
                Emitter::Error => "Error",
            };
            let _ = write!(out, "**{heading}:** {}\n\n", turn.display_text());
        }
        out
    }
}
