//! Wire types for the backend's `/ask` endpoint.

use crate::conversation::{Emitter, Turn};
use serde::{Deserialize, Serialize};

/// Role tag the backend expects on history entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryRole {
    Human,
    Ai,
}

/// One prior turn as sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: HistoryRole,
    pub content: String,
}

/// Request body for `POST /ask`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskRequest {
    pub question: String,
    pub chat_history: Vec<HistoryEntry>,
}

impl AskRequest {
    /// Build a request from a prompt and the turns that preceded it.
    pub fn new(question: impl Into<String>, turns: &[Turn]) -> Self {
        Self {
            question: question.into(),
            chat_history: build_history(turns),
        }
    }
}

/// A document the backend retrieved while answering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievedDoc {
    pub file_name: String,
    pub page_content: String,
}

/// Successful response body for `POST /ask`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
    #[serde(default)]
    pub retrieved_docs: Vec<RetrievedDoc>,
}

/// Map conversation turns to backend history.
///
/// Error turns are client-side artifacts and are never replayed.
pub fn build_history(turns: &[Turn]) -> Vec<HistoryEntry> {
    turns
        .iter()
        .filter_map(|turn| {
            let role = match turn.emitter() {
                Emitter::User => HistoryRole::Human,
                Emitter::Assistant => HistoryRole::Ai,
                Emitter::Error => return None,
            };
            Some(HistoryEntry {
                role,
                content: turn.message().to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_json_snapshot;

    #[test]
    fn test_history_skips_error_turns() {
        let turns = vec![
            Turn::user("first"),
            Turn::error("Server Unreachable"),
            Turn::user("first again"),
            Turn::assistant("answer"),
        ];

        let history = build_history(&turns);
        assert_eq!(history.len(), 3);
        assert!(history.iter().all(|e| e.content != "Server Unreachable"));
        assert_eq!(history[0].role, HistoryRole::Human);
        assert_eq!(history[2].role, HistoryRole::Ai);
    }

    #[test]
    fn test_history_keeps_raw_message() {
        let turns = vec![Turn::assistant("\n\nLeading blank line")];
        assert_eq!(build_history(&turns)[0].content, "\n\nLeading blank line");
    }

    #[test]
    fn test_request_body_shape() {
        let turns = vec![Turn::user("Hi"), Turn::assistant("Hello!")];
        let request = AskRequest::new("What is in the handbook?", &turns);

        assert_json_snapshot!(request, @r###"
        {
          "question": "What is in the handbook?",
          "chat_history": [
            {
              "role": "human",
              "content": "Hi"
            },
            {
              "role": "ai",
              "content": "Hello!"
            }
          ]
        }
        "###);
    }

    #[test]
    fn test_response_without_docs() {
        let response: AskResponse = serde_json::from_str(r#"{"answer":"Hello"}"#).unwrap();
        assert_eq!(response.answer, "Hello");
        assert!(response.retrieved_docs.is_empty());
    }

    #[test]
    fn test_response_with_docs() {
        let body = r#"{
            "answer": "See the policy.",
            "retrieved_docs": [{"file_name": "policy.docx", "page_content": "..."}]
        }"#;
        let response: AskResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.retrieved_docs[0].file_name, "policy.docx");
    }

    #[test]
    fn test_response_missing_answer_is_rejected() {
        assert!(serde_json::from_str::<AskResponse>(r#"{"detail":"boom"}"#).is_err());
    }
}
