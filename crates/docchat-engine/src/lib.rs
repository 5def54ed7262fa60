//! docchat-engine: Headless conversation engine for docchat
//!
//! This crate provides the core logic behind the docchat client:
//! - Conversation and turn model with append-only history
//! - Conversation store interface and in-memory store
//! - Chat session with selection state and in-flight guard
//! - HTTP backend client for the `/ask` endpoint
//! - Configuration

pub mod backend;
pub mod config;
pub mod conversation;
pub mod protocol;
pub mod session;
pub mod store;

// Re-export commonly used types
pub use backend::{
    dispatch, Answer, AskBackend, AskFailure, AskOutcome, BackendError, HttpBackend,
    SERVER_UNREACHABLE,
};
pub use config::{Config, ConfigError};
pub use conversation::{
    display_text, Conversation, ConversationId, Emitter, Turn, PLACEHOLDER_LABEL,
};
pub use protocol::{build_history, AskRequest, AskResponse, HistoryEntry, HistoryRole, RetrievedDoc};
pub use session::{
    ChatSession, Completion, IgnoreReason, PendingAsk, Selection, SessionError, Submission,
};
pub use store::{ConversationStore, MemoryStore, StoreError};
pub use tokio_util::sync::CancellationToken;

/// Returns the engine version.
pub fn engine_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_version() {
        let version = engine_version();
        assert!(!version.is_empty());
        assert!(version.starts_with("0."));
    }
}
