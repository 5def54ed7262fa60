//! Backend client for the question-answering service.
//!
//! [`AskBackend`] is the seam between the session and the network;
//! [`HttpBackend`] is the reqwest implementation. [`dispatch`] collapses
//! every failure into the single user-facing [`SERVER_UNREACHABLE`] outcome.

use crate::protocol::{AskRequest, AskResponse, RetrievedDoc};
use reqwest::StatusCode;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Message shown for every failed ask, whatever the cause.
pub const SERVER_UNREACHABLE: &str = "Server Unreachable";

/// Errors from talking to the backend.
///
/// These stay internal: they are logged, then reported to the user as
/// [`SERVER_UNREACHABLE`].
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Unexpected status: {0}")]
    Status(u16),

    #[error("Invalid response body: {0}")]
    Decode(#[source] reqwest::Error),
}

/// Something that can answer an [`AskRequest`].
pub trait AskBackend: Send + Sync {
    /// Send one question and wait for the answer.
    fn ask(
        &self,
        request: &AskRequest,
    ) -> impl Future<Output = Result<AskResponse, BackendError>> + Send;
}

/// HTTP implementation posting JSON to `{base_url}/ask`.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    ask_url: String,
}

impl HttpBackend {
    /// Create a backend for the given base URL.
    ///
    /// Without a timeout a request waits until the server answers or the
    /// connection fails.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, BackendError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(BackendError::Transport)?;

        Ok(Self {
            client,
            ask_url: ask_url(base_url),
        })
    }

    /// Full URL requests are posted to.
    pub fn ask_url(&self) -> &str {
        &self.ask_url
    }
}

impl AskBackend for HttpBackend {
    async fn ask(&self, request: &AskRequest) -> Result<AskResponse, BackendError> {
        debug!(
            url = %self.ask_url,
            history_len = request.chat_history.len(),
            "Sending question"
        );

        let response = self
            .client
            .post(&self.ask_url)
            .json(request)
            .send()
            .await
            .map_err(BackendError::Transport)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(BackendError::Status(status.as_u16()));
        }

        response
            .json::<AskResponse>()
            .await
            .map_err(BackendError::Decode)
    }
}

fn ask_url(base_url: &str) -> String {
    format!("{}/ask", base_url.trim_end_matches('/'))
}

/// A successful answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    /// Answer text, used verbatim as the assistant turn.
    pub text: String,
    /// Documents the backend says it used.
    pub sources: Vec<RetrievedDoc>,
}

impl From<AskResponse> for Answer {
    fn from(response: AskResponse) -> Self {
        Self {
            text: response.answer,
            sources: response.retrieved_docs,
        }
    }
}

/// A failed ask, carrying the message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct AskFailure {
    message: String,
}

impl AskFailure {
    pub fn server_unreachable() -> Self {
        Self {
            message: SERVER_UNREACHABLE.to_string(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Result of one ask: the answer, or the opaque failure.
pub type AskOutcome = Result<Answer, AskFailure>;

/// Send a request and collapse the result into an [`AskOutcome`].
///
/// Returns `None` if `cancel` fires before the backend answers.
pub async fn dispatch<B: AskBackend>(
    backend: &B,
    request: &AskRequest,
    cancel: &CancellationToken,
) -> Option<AskOutcome> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => {
            debug!("Ask cancelled before completion");
            None
        }
        result = backend.ask(request) => Some(collapse(result)),
    }
}

fn collapse(result: Result<AskResponse, BackendError>) -> AskOutcome {
    match result {
        Ok(response) => {
            let sources: Vec<&str> = response
                .retrieved_docs
                .iter()
                .map(|d| d.file_name.as_str())
                .collect();
            debug!(?sources, "Answer received");
            Ok(Answer::from(response))
        }
        Err(e) => {
            warn!(error = %e, "Ask failed");
            Err(AskFailure::server_unreachable())
        }
    }
}
