//! Application state and update logic for the docchat TUI.

use std::cell::Cell;

use crate::clipboard::ClipboardManager;
use crate::event::{key_to_action, Action};
use crate::ui::widgets::TextInputState;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEventKind};
use docchat_engine::{
    display_text, AskOutcome, ChatSession, Conversation, ConversationId, ConversationStore,
    Emitter, IgnoreReason, MemoryStore, PendingAsk, Selection, Submission,
};
use tracing::{debug, warn};

/// Example prompts offered on an empty conversation.
pub const EXAMPLES: [&str; 3] = [
    "How do I get started with the library?",
    "What options does the configuration file support?",
    "Explain the main concepts covered in the documentation.",
];

/// Lines scrolled per mouse wheel step.
const WHEEL_STEP: usize = 3;

/// Lines scrolled per PgUp/PgDn.
const PAGE_STEP: usize = 10;

/// Ticks a notification stays visible (about 3 seconds at 4 Hz).
const NOTIFICATION_TICKS: usize = 12;

/// The current screen being displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Screen {
    #[default]
    Chat,
    QuitConfirm,
}

/// Application state.
#[derive(Debug)]
pub struct App {
    pub should_quit: bool,
    pub show_help: bool,
    pub screen: Screen,

    /// Conversations, selection and in-flight guard.
    pub session: ChatSession<MemoryStore>,

    pub input_state: TextInputState,

    /// Transcript scroll, counted in lines up from the newest line.
    pub scroll_from_bottom: usize,

    /// Largest useful `scroll_from_bottom`, updated by the renderer.
    pub scroll_limit: Cell<usize>,

    /// Tick counter for the spinner.
    pub tick: usize,

    /// Notification message (displayed temporarily, cleared after some ticks).
    pub notification: Option<String>,
    notification_ttl: usize,

    /// Next entry of [`EXAMPLES`] for Ctrl+O.
    example_index: usize,

    /// Shown in the status bar.
    pub backend_url: String,

    clipboard: ClipboardManager,
}

impl App {
    /// Create a new app instance.
    pub fn new(backend_url: impl Into<String>) -> Self {
        Self::with_clipboard(backend_url.into(), ClipboardManager::new())
    }

    /// App for tests: no system clipboard.
    #[cfg(test)]
    pub fn new_for_test() -> Self {
        Self::with_clipboard("http://localhost:8000".to_string(), ClipboardManager::disabled())
    }

    fn with_clipboard(backend_url: String, clipboard: ClipboardManager) -> Self {
        Self {
            should_quit: false,
            show_help: false,
            screen: Screen::Chat,
            session: ChatSession::new(MemoryStore::new()),
            input_state: TextInputState::new(),
            scroll_from_bottom: 0,
            scroll_limit: Cell::new(0),
            tick: 0,
            notification: None,
            notification_ttl: 0,
            example_index: 0,
            backend_url,
            clipboard,
        }
    }

    /// Conversations in sidebar order, newest first.
    pub fn conversations(&self) -> Vec<&Conversation> {
        let mut conversations = self.session.store().list();
        conversations.reverse();
        conversations
    }

    /// Whether the selected conversation is waiting for an answer, or one
    /// is being created for a prompt.
    pub fn is_waiting(&self) -> bool {
        match self.session.selection() {
            Selection::Creating { .. } => true,
            Selection::Selected(id) => self.session.is_in_flight(id),
            Selection::NoConversation => false,
        }
    }

    /// Handle a key press. Returns a request to send, if one was submitted.
    pub fn handle_key(&mut self, key: KeyEvent) -> Option<PendingAsk> {
        if key.kind == KeyEventKind::Release {
            return None;
        }

        if self.screen == Screen::QuitConfirm {
            self.handle_quit_confirm_key(key);
            return None;
        }

        let action = key_to_action(key);

        if self.show_help {
            match action {
                Action::Quit => self.should_quit = true,
                _ => self.show_help = false,
            }
            return None;
        }

        if action == Action::None {
            self.edit_input(key);
            return None;
        }
        self.handle_action(action)
    }

    /// Handle a mouse event (wheel scrolling only).
    pub fn handle_mouse(&mut self, kind: MouseEventKind) {
        match kind {
            MouseEventKind::ScrollUp => self.scroll_up(WHEEL_STEP),
            MouseEventKind::ScrollDown => self.scroll_down(WHEEL_STEP),
            _ => {}
        }
    }

    /// Handle an action.
    pub fn handle_action(&mut self, action: Action) -> Option<PendingAsk> {
        match action {
            Action::Quit => self.should_quit = true,
            Action::Help => self.show_help = !self.show_help,
            Action::Back => self.screen = Screen::QuitConfirm,
            Action::Send => return self.submit_input(),
            Action::Newline => self.input_state.insert('\n'),
            Action::NewChat => {
                let id = self.session.start_new();
                debug!(conversation = %id, "New chat");
                self.scroll_from_bottom = 0;
            }
            Action::NextChat => self.cycle_conversation(true),
            Action::PrevChat => self.cycle_conversation(false),
            Action::PageUp => self.scroll_up(PAGE_STEP),
            Action::PageDown => self.scroll_down(PAGE_STEP),
            Action::CopyAnswer => self.copy_last_answer(),
            Action::CopyTranscript => self.copy_transcript(),
            Action::Example => {
                self.input_state.set(EXAMPLES[self.example_index]);
                self.example_index = (self.example_index + 1) % EXAMPLES.len();
            }
            Action::None => {}
        }
        None
    }

    /// Submit the input to the session.
    ///
    /// The input is cleared only when the prompt was accepted; a suppressed
    /// prompt stays in the box.
    pub fn submit_input(&mut self) -> Option<PendingAsk> {
        let prompt = self.input_state.content().to_string();
        match self.session.submit(&prompt) {
            Submission::Ready(pending) => {
                self.input_state.submit();
                self.scroll_from_bottom = 0;
                Some(pending)
            }
            Submission::NeedsConversation => {
                self.input_state.submit();
                self.scroll_from_bottom = 0;
                None
            }
            Submission::Ignored(IgnoreReason::EmptyPrompt) => None,
            Submission::Ignored(IgnoreReason::InFlight | IgnoreReason::CreationPending) => {
                self.set_notification("Waiting for the current answer");
                None
            }
        }
    }

    /// Finish a pending conversation creation, if any.
    ///
    /// Called once per loop iteration, so creation completes after the
    /// submitting key has been handled.
    pub fn resume_creation(&mut self) -> Option<PendingAsk> {
        if !matches!(self.session.selection(), Selection::Creating { .. }) {
            return None;
        }
        let id = self.session.create_conversation();
        self.session.conversation_created(id)
    }

    /// Record the result of a finished request.
    pub fn apply_outcome(&mut self, pending: PendingAsk, outcome: AskOutcome) {
        match self.session.complete(pending, outcome) {
            Ok(completion) => {
                if self.session.selected_id() == Some(&completion.conversation) {
                    self.scroll_from_bottom = 0;
                }
            }
            Err(e) => {
                warn!(error = %e, "Could not record answer");
                self.set_notification(format!("Could not record answer: {e}"));
            }
        }
    }

    /// Drop a request that was cancelled before it finished.
    pub fn abandon(&mut self, pending: PendingAsk) {
        self.session.abandon(pending);
    }

    /// Increment tick counter and update time-based state.
    pub fn tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);

        if self.notification_ttl > 0 {
            self.notification_ttl -= 1;
            if self.notification_ttl == 0 {
                self.notification = None;
            }
        }
    }

    /// Text of the newest assistant turn in the selected conversation.
    pub fn last_answer(&self) -> Option<&str> {
        self.session
            .selected()?
            .turns()
            .iter()
            .rev()
            .find(|turn| turn.emitter() == Emitter::Assistant)
            .map(|turn| display_text(turn.message()))
    }

    fn set_notification(&mut self, msg: impl Into<String>) {
        self.notification = Some(msg.into());
        self.notification_ttl = NOTIFICATION_TICKS;
    }

    fn handle_quit_confirm_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('y' | 'Y') | KeyCode::Enter => self.should_quit = true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            KeyCode::Char('n' | 'N') | KeyCode::Esc => self.screen = Screen::Chat,
            _ => {}
        }
    }

    fn edit_input(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('v') if ctrl => {
                if let Some(text) = self.clipboard.paste() {
                    self.input_state.insert_str(&text);
                }
            }
            KeyCode::Char(_) if ctrl => {}
            KeyCode::Char(c) => self.input_state.insert(c),
            KeyCode::Backspace => self.input_state.backspace(),
            KeyCode::Delete => self.input_state.delete(),
            KeyCode::Left => self.input_state.move_left(),
            KeyCode::Right => self.input_state.move_right(),
            KeyCode::Home => self.input_state.move_home(),
            KeyCode::End => self.input_state.move_end(),
            KeyCode::Up => {
                if self.input_state.is_empty() || self.input_state.is_browsing_history() {
                    self.input_state.history_prev();
                } else {
                    self.scroll_up(1);
                }
            }
            KeyCode::Down => {
                if self.input_state.is_browsing_history() {
                    self.input_state.history_next();
                } else {
                    self.scroll_down(1);
                }
            }
            _ => {}
        }
    }

    fn cycle_conversation(&mut self, forward: bool) {
        if matches!(self.session.selection(), Selection::Creating { .. }) {
            return;
        }

        let ids: Vec<ConversationId> = self
            .conversations()
            .into_iter()
            .map(|c| c.id().clone())
            .collect();
        if ids.is_empty() {
            return;
        }

        let current = self
            .session
            .selected_id()
            .and_then(|id| ids.iter().position(|other| other == id));
        let next = match (current, forward) {
            (None, _) => 0,
            (Some(i), true) => (i + 1) % ids.len(),
            (Some(i), false) => (i + ids.len() - 1) % ids.len(),
        };

        if self.session.select(&ids[next]).is_ok() {
            self.scroll_from_bottom = 0;
        }
    }

    fn scroll_up(&mut self, lines: usize) {
        self.scroll_from_bottom = self
            .scroll_from_bottom
            .saturating_add(lines)
            .min(self.scroll_limit.get());
    }

    fn scroll_down(&mut self, lines: usize) {
        self.scroll_from_bottom = self.scroll_from_bottom.saturating_sub(lines);
    }

    fn copy_last_answer(&mut self) {
        let Some(answer) = self.last_answer().map(str::to_string) else {
            self.set_notification("No answer to copy");
            return;
        };
        let message = if self.clipboard.copy(&answer) {
            "Copied answer"
        } else {
            "Clipboard unavailable"
        };
        self.set_notification(message);
    }

    fn copy_transcript(&mut self) {
        let Some(markdown) = self.session.selected().map(Conversation::to_markdown) else {
            self.set_notification("No conversation to copy");
            return;
        };
        let message = if self.clipboard.copy(&markdown) {
            "Copied conversation"
        } else {
            "Clipboard unavailable"
        };
        self.set_notification(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docchat_engine::{Answer, AskFailure, PLACEHOLDER_LABEL, SERVER_UNREACHABLE};

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.handle_key(press(KeyCode::Char(c)));
        }
    }

    fn answer(text: &str) -> AskOutcome {
        Ok(Answer {
            text: text.to_string(),
            sources: vec![],
        })
    }

    /// Send `prompt` in a fresh app and return the request it produced.
    fn first_ask(app: &mut App, prompt: &str) -> PendingAsk {
        type_text(app, prompt);
        assert!(app.handle_key(press(KeyCode::Enter)).is_none());
        app.resume_creation().unwrap()
    }

    #[test]
    fn test_first_message_creates_conversation() {
        let mut app = App::new_for_test();
        type_text(&mut app, "hello");
        assert!(app.handle_key(press(KeyCode::Enter)).is_none());

        assert!(app.input_state.is_empty());
        assert!(app.is_waiting());
        assert!(app.conversations().is_empty());

        let pending = app.resume_creation().unwrap();
        assert_eq!(pending.prompt(), "hello");
        assert_eq!(app.conversations().len(), 1);
        assert!(app.resume_creation().is_none());
    }

    #[test]
    fn test_answer_relabels_conversation() {
        let mut app = App::new_for_test();
        let pending = first_ask(&mut app, "what is X?");
        let id = pending.conversation().clone();

        app.apply_outcome(pending, answer("X is Y"));

        let conversation = app.session.store().get(&id).unwrap();
        assert_eq!(conversation.label(), "what is X?");
        assert_eq!(conversation.turns().len(), 2);
        assert_eq!(app.last_answer(), Some("X is Y"));
        assert!(!app.is_waiting());
    }

    #[test]
    fn test_failure_keeps_placeholder() {
        let mut app = App::new_for_test();
        let pending = first_ask(&mut app, "q");
        let id = pending.conversation().clone();

        app.apply_outcome(pending, Err(AskFailure::server_unreachable()));

        let conversation = app.session.store().get(&id).unwrap();
        assert_eq!(conversation.label(), PLACEHOLDER_LABEL);
        assert_eq!(conversation.turns()[1].message(), SERVER_UNREACHABLE);
    }

    #[test]
    fn test_submit_while_waiting_keeps_input() {
        let mut app = App::new_for_test();
        let _pending = first_ask(&mut app, "first");

        type_text(&mut app, "second");
        assert!(app.handle_key(press(KeyCode::Enter)).is_none());

        assert_eq!(app.input_state.content(), "second");
        assert!(app.notification.is_some());
        assert_eq!(app.session.selected().unwrap().turns().len(), 1);
    }

    #[test]
    fn test_empty_enter_does_nothing() {
        let mut app = App::new_for_test();
        type_text(&mut app, "   ");
        assert!(app.handle_key(press(KeyCode::Enter)).is_none());
        assert!(app.resume_creation().is_none());
        assert!(app.conversations().is_empty());
    }

    #[test]
    fn test_new_chat_and_cycle() {
        let mut app = App::new_for_test();
        app.handle_key(ctrl('n'));
        app.handle_key(ctrl('n'));
        let order: Vec<ConversationId> =
            app.conversations().iter().map(|c| c.id().clone()).collect();
        assert_eq!(app.session.selected_id(), Some(&order[0]));

        app.handle_key(press(KeyCode::Tab));
        assert_eq!(app.session.selected_id(), Some(&order[1]));

        app.handle_key(press(KeyCode::Tab));
        assert_eq!(app.session.selected_id(), Some(&order[0]));

        app.handle_key(KeyEvent::new(KeyCode::BackTab, KeyModifiers::SHIFT));
        assert_eq!(app.session.selected_id(), Some(&order[1]));
    }

    #[test]
    fn test_example_fills_input() {
        let mut app = App::new_for_test();
        app.handle_key(ctrl('o'));
        assert_eq!(app.input_state.content(), EXAMPLES[0]);
        app.handle_key(ctrl('o'));
        assert_eq!(app.input_state.content(), EXAMPLES[1]);
    }

    #[test]
    fn test_ctrl_enter_inserts_newline() {
        let mut app = App::new_for_test();
        type_text(&mut app, "a");
        app.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::CONTROL));
        type_text(&mut app, "b");
        assert_eq!(app.input_state.content(), "a\nb");
    }

    #[test]
    fn test_plain_q_is_typed_not_quit() {
        let mut app = App::new_for_test();
        type_text(&mut app, "q");
        assert!(!app.should_quit);
        assert_eq!(app.input_state.content(), "q");
    }

    #[test]
    fn test_esc_asks_before_quitting() {
        let mut app = App::new_for_test();
        app.handle_key(press(KeyCode::Esc));
        assert_eq!(app.screen, Screen::QuitConfirm);

        app.handle_key(press(KeyCode::Char('n')));
        assert_eq!(app.screen, Screen::Chat);
        assert!(!app.should_quit);

        app.handle_key(press(KeyCode::Esc));
        app.handle_key(press(KeyCode::Char('y')));
        assert!(app.should_quit);
    }

    #[test]
    fn test_help_closes_on_any_key() {
        let mut app = App::new_for_test();
        app.handle_key(press(KeyCode::F(1)));
        assert!(app.show_help);
        app.handle_key(press(KeyCode::Char('x')));
        assert!(!app.show_help);
        assert!(app.input_state.is_empty());
    }

    #[test]
    fn test_ctrl_c_quits() {
        let mut app = App::new_for_test();
        app.handle_key(ctrl('c'));
        assert!(app.should_quit);
    }

    #[test]
    fn test_up_recalls_history_when_empty() {
        let mut app = App::new_for_test();
        let pending = first_ask(&mut app, "earlier question");
        app.apply_outcome(pending, answer("ok"));

        app.handle_key(press(KeyCode::Up));
        assert_eq!(app.input_state.content(), "earlier question");
        app.handle_key(press(KeyCode::Down));
        assert!(app.input_state.is_empty());
    }

    #[test]
    fn test_scroll_is_clamped_and_reset_on_answer() {
        let mut app = App::new_for_test();
        let pending = first_ask(&mut app, "q");

        app.scroll_limit.set(5);
        app.handle_key(press(KeyCode::PageUp));
        assert_eq!(app.scroll_from_bottom, 5);

        app.apply_outcome(pending, answer("a"));
        assert_eq!(app.scroll_from_bottom, 0);
    }

    #[test]
    fn test_arrows_scroll_transcript_while_typing() {
        let mut app = App::new_for_test();
        app.scroll_limit.set(5);
        type_text(&mut app, "draft");

        app.handle_key(press(KeyCode::Up));
        app.handle_key(press(KeyCode::Up));
        assert_eq!(app.scroll_from_bottom, 2);
        assert_eq!(app.input_state.content(), "draft");

        app.handle_key(press(KeyCode::Down));
        assert_eq!(app.scroll_from_bottom, 1);
    }

    #[test]
    fn test_copy_without_answer_notifies() {
        let mut app = App::new_for_test();
        app.handle_key(ctrl('y'));
        assert_eq!(app.notification.as_deref(), Some("No answer to copy"));
    }

    #[test]
    fn test_abandon_releases_conversation() {
        let mut app = App::new_for_test();
        let pending = first_ask(&mut app, "q");
        app.abandon(pending);
        assert!(!app.is_waiting());
    }

    #[test]
    fn test_notification_expires() {
        let mut app = App::new_for_test();
        app.handle_key(ctrl('y'));
        for _ in 0..NOTIFICATION_TICKS {
            app.tick();
        }
        assert!(app.notification.is_none());
    }
}
