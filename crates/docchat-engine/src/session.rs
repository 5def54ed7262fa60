//! Chat session: selection state, in-flight guard and turn bookkeeping.
//!
//! A submission goes through three steps:
//!
//! 1. [`ChatSession::submit`] validates the prompt, snapshots the history,
//!    appends the user turn and marks the conversation in flight.
//! 2. The returned [`PendingAsk`] is sent with [`dispatch`] (usually on a
//!    spawned task, so the UI keeps running).
//! 3. [`ChatSession::complete`] appends the assistant or error turn, applies
//!    the label update and releases the guard.
//!
//! When nothing is selected the session moves
//! `NoConversation -> Creating { pending_prompt } -> Selected(id)`; the
//! caller creates the conversation and hands the id back through
//! [`ChatSession::conversation_created`], which re-submits the held prompt.

use std::collections::HashSet;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::backend::{dispatch, AskBackend, AskOutcome};
use crate::conversation::{Conversation, ConversationId, Emitter, Turn};
use crate::protocol::AskRequest;
use crate::store::{ConversationStore, StoreError};

/// Which conversation new prompts go to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    /// Nothing selected; the next prompt creates a conversation.
    #[default]
    NoConversation,
    /// A conversation is being created for `pending_prompt`.
    Creating { pending_prompt: String },
    /// Prompts go to this conversation.
    Selected(ConversationId),
}

/// Why a submission did not produce a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Prompt was empty or whitespace.
    EmptyPrompt,
    /// The conversation already has a request outstanding.
    InFlight,
    /// A conversation is still being created for an earlier prompt.
    CreationPending,
}

/// Result of [`ChatSession::submit`].
#[derive(Debug)]
pub enum Submission {
    /// Nothing happened: no turn appended, no request to send.
    Ignored(IgnoreReason),
    /// Create a conversation and pass its id to
    /// [`ChatSession::conversation_created`].
    NeedsConversation,
    /// The user turn is recorded; send this request.
    Ready(PendingAsk),
}

/// A request that has been recorded but not yet resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAsk {
    conversation: ConversationId,
    prompt: String,
    request: AskRequest,
}

impl PendingAsk {
    pub fn conversation(&self) -> &ConversationId {
        &self.conversation
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn request(&self) -> &AskRequest {
        &self.request
    }
}

/// What [`ChatSession::complete`] changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub conversation: ConversationId,
    /// Index of the appended turn.
    pub turn_index: usize,
    /// Emitter of the appended turn (`Assistant` or `Error`).
    pub emitter: Emitter,
    /// New label, if this answer replaced the placeholder.
    pub label_update: Option<String>,
}

/// Errors from session operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("No request in flight for conversation {0}")]
    NotInFlight(ConversationId),
}

/// Conversation state shared between the input and the renderer.
#[derive(Debug)]
pub struct ChatSession<S> {
    store: S,
    selection: Selection,
    in_flight: HashSet<ConversationId>,
}

impl<S: ConversationStore> ChatSession<S> {
    /// Create a session with nothing selected.
    pub fn new(store: S) -> Self {
        Self {
            store,
            selection: Selection::NoConversation,
            in_flight: HashSet::new(),
        }
    }

    /// Read access to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Id of the selected conversation, if any.
    pub fn selected_id(&self) -> Option<&ConversationId> {
        match &self.selection {
            Selection::Selected(id) => Some(id),
            _ => None,
        }
    }

    /// The selected conversation, if any.
    pub fn selected(&self) -> Option<&Conversation> {
        self.selected_id().and_then(|id| self.store.get(id))
    }

    /// Whether `id` has a request outstanding.
    pub fn is_in_flight(&self, id: &ConversationId) -> bool {
        self.in_flight.contains(id)
    }

    /// Whether any conversation has a request outstanding.
    pub fn any_in_flight(&self) -> bool {
        !self.in_flight.is_empty()
    }

    /// Select an existing conversation.
    pub fn select(&mut self, id: &ConversationId) -> Result<(), SessionError> {
        if !self.store.contains(id) {
            return Err(StoreError::NotFound(id.clone()).into());
        }
        self.selection = Selection::Selected(id.clone());
        Ok(())
    }

    /// Create an empty conversation and select it.
    pub fn start_new(&mut self) -> ConversationId {
        let id = self.store.create();
        debug!(conversation = %id, "Started new conversation");
        self.selection = Selection::Selected(id.clone());
        id
    }

    /// Create an empty conversation without touching the selection.
    ///
    /// Pair with [`ChatSession::conversation_created`] to finish a
    /// `Creating` transition.
    pub fn create_conversation(&mut self) -> ConversationId {
        self.store.create()
    }

    /// Deselect; the next prompt will create a conversation.
    pub fn clear_selection(&mut self) {
        self.selection = Selection::NoConversation;
    }

    /// Submit a prompt against the current selection.
    pub fn submit(&mut self, prompt: &str) -> Submission {
        if prompt.trim().is_empty() {
            return Submission::Ignored(IgnoreReason::EmptyPrompt);
        }

        match &self.selection {
            Selection::NoConversation => self.await_conversation(prompt),
            Selection::Creating { .. } => Submission::Ignored(IgnoreReason::CreationPending),
            Selection::Selected(id) => {
                let id = id.clone();
                self.submit_to(id, prompt)
            }
        }
    }

    /// Finish the `Creating` transition.
    ///
    /// Selects `id` and, if a prompt was waiting on the creation, submits
    /// it and returns the resulting request.
    pub fn conversation_created(&mut self, id: ConversationId) -> Option<PendingAsk> {
        let previous = std::mem::replace(&mut self.selection, Selection::Selected(id.clone()));
        let Selection::Creating { pending_prompt } = previous else {
            return None;
        };

        match self.submit_to(id, &pending_prompt) {
            Submission::Ready(pending) => Some(pending),
            Submission::Ignored(_) | Submission::NeedsConversation => None,
        }
    }

    /// Record the outcome of a request.
    pub fn complete(
        &mut self,
        pending: PendingAsk,
        outcome: AskOutcome,
    ) -> Result<Completion, SessionError> {
        let PendingAsk {
            conversation,
            prompt,
            ..
        } = pending;

        if !self.in_flight.remove(&conversation) {
            return Err(SessionError::NotInFlight(conversation));
        }

        let completion = match outcome {
            Ok(answer) => {
                let turn_index = self
                    .store
                    .append(&conversation, Turn::assistant(answer.text))?;
                let relabeled = self.store.relabel_if_placeholder(&conversation, &prompt)?;
                Completion {
                    conversation,
                    turn_index,
                    emitter: Emitter::Assistant,
                    label_update: relabeled.then_some(prompt),
                }
            }
            Err(failure) => {
                let turn_index = self
                    .store
                    .append(&conversation, Turn::error(failure.message()))?;
                Completion {
                    conversation,
                    turn_index,
                    emitter: Emitter::Error,
                    label_update: None,
                }
            }
        };

        info!(
            conversation = %completion.conversation,
            emitter = completion.emitter.as_str(),
            relabeled = completion.label_update.is_some(),
            "Ask resolved"
        );
        Ok(completion)
    }

    /// Release the guard for a request that will never complete.
    ///
    /// Nothing is appended. Returns `false` if the request was not in flight.
    pub fn abandon(&mut self, pending: PendingAsk) -> bool {
        debug!(conversation = %pending.conversation, "Abandoning ask");
        self.in_flight.remove(&pending.conversation)
    }

    /// Run a whole ask cycle: create if needed, send, record.
    ///
    /// Returns `Ok(None)` when the prompt was ignored or `cancel` fired.
    pub async fn ask<B: AskBackend>(
        &mut self,
        backend: &B,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Completion>, SessionError> {
        let pending = match self.submit(prompt) {
            Submission::Ready(pending) => pending,
            Submission::NeedsConversation => {
                let id = self.store.create();
                match self.conversation_created(id) {
                    Some(pending) => pending,
                    None => return Ok(None),
                }
            }
            Submission::Ignored(reason) => {
                debug!(?reason, "Prompt ignored");
                return Ok(None);
            }
        };

        match dispatch(backend, pending.request(), cancel).await {
            Some(outcome) => self.complete(pending, outcome).map(Some),
            None => {
                self.abandon(pending);
                Ok(None)
            }
        }
    }

    fn await_conversation(&mut self, prompt: &str) -> Submission {
        self.selection = Selection::Creating {
            pending_prompt: prompt.to_string(),
        };
        Submission::NeedsConversation
    }

    fn submit_to(&mut self, id: ConversationId, prompt: &str) -> Submission {
        if self.in_flight.contains(&id) {
            return Submission::Ignored(IgnoreReason::InFlight);
        }

        // History is the turns before this prompt.
        let Some(conversation) = self.store.get(&id) else {
            return self.await_conversation(prompt);
        };
        let request = AskRequest::new(prompt, conversation.turns());

        if self.store.append(&id, Turn::user(prompt)).is_err() {
            return self.await_conversation(prompt);
        }
        self.in_flight.insert(id.clone());

        debug!(
            conversation = %id,
            history_len = request.chat_history.len(),
            "Prompt submitted"
        );

        Submission::Ready(PendingAsk {
            conversation: id,
            prompt: prompt.to_string(),
            request,
        })
    }
}
