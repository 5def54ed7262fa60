//! Event handling for the docchat TUI.

use crossterm::event::{self, Event as CrosstermEvent, KeyCode, KeyEvent, KeyModifiers, MouseEvent};
use std::time::Duration;
use tokio::sync::mpsc;

/// Events that can occur in the TUI.
#[derive(Debug, Clone)]
pub enum Event {
    Key(KeyEvent),
    Mouse(MouseEvent),
    /// A tick event for animations and notification expiry.
    Tick,
    Resize(u16, u16),
}

/// Event handler that polls crossterm on a background thread.
pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<Event>,
    _tx: mpsc::UnboundedSender<Event>,
}

impl EventHandler {
    /// Create a new event handler with the specified tick rate.
    pub fn new(tick_rate_ms: u64) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let tx_clone = tx.clone();

        // crossterm's poll/read block, so they get their own thread.
        std::thread::spawn(move || {
            let tick_rate = Duration::from_millis(tick_rate_ms);
            loop {
                let event = if event::poll(tick_rate).unwrap_or(false) {
                    match event::read() {
                        Ok(CrosstermEvent::Key(key)) => Some(Event::Key(key)),
                        Ok(CrosstermEvent::Mouse(mouse)) => Some(Event::Mouse(mouse)),
                        Ok(CrosstermEvent::Resize(w, h)) => Some(Event::Resize(w, h)),
                        _ => None,
                    }
                } else {
                    Some(Event::Tick)
                };

                if let Some(event) = event {
                    if tx_clone.send(event).is_err() {
                        break;
                    }
                }
            }
        });

        Self { rx, _tx: tx }
    }

    /// Get the next event, waiting until one is available.
    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}

/// Key action that can be performed in the TUI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    Help,
    Back,
    /// Send the input.
    Send,
    /// Insert a line break into the input.
    Newline,
    NewChat,
    NextChat,
    PrevChat,
    PageUp,
    PageDown,
    CopyAnswer,
    CopyTranscript,
    /// Put the next example prompt into the input.
    Example,
    None,
}

/// Map a key to a chat-screen action.
///
/// Plain characters map to [`Action::None`]; they belong to the text input.
pub fn key_to_action(key: KeyEvent) -> Action {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let alt = key.modifiers.contains(KeyModifiers::ALT);
    let shift = key.modifiers.contains(KeyModifiers::SHIFT);

    match key.code {
        KeyCode::Char('c') if ctrl => Action::Quit,
        KeyCode::Char('n') if ctrl => Action::NewChat,
        KeyCode::Char('y') if ctrl => Action::CopyAnswer,
        KeyCode::Char('t') if ctrl => Action::CopyTranscript,
        KeyCode::Char('o') if ctrl => Action::Example,
        // Many terminals report Ctrl+Enter as plain Enter; Alt/Shift+Enter
        // are accepted as fallbacks.
        KeyCode::Enter if ctrl || alt || shift => Action::Newline,
        KeyCode::Enter => Action::Send,
        KeyCode::F(1) => Action::Help,
        KeyCode::Esc => Action::Back,
        KeyCode::Tab => Action::NextChat,
        KeyCode::BackTab => Action::PrevChat,
        KeyCode::PageUp => Action::PageUp,
        KeyCode::PageDown => Action::PageDown,
        _ => Action::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn test_control_shortcuts() {
        assert_eq!(
            key_to_action(key(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Action::Quit
        );
        assert_eq!(
            key_to_action(key(KeyCode::Char('n'), KeyModifiers::CONTROL)),
            Action::NewChat
        );
        assert_eq!(
            key_to_action(key(KeyCode::Char('y'), KeyModifiers::CONTROL)),
            Action::CopyAnswer
        );
    }

    #[test]
    fn test_enter_variants() {
        assert_eq!(
            key_to_action(key(KeyCode::Enter, KeyModifiers::NONE)),
            Action::Send
        );
        assert_eq!(
            key_to_action(key(KeyCode::Enter, KeyModifiers::CONTROL)),
            Action::Newline
        );
        assert_eq!(
            key_to_action(key(KeyCode::Enter, KeyModifiers::ALT)),
            Action::Newline
        );
    }

    #[test]
    fn test_plain_characters_are_not_actions() {
        assert_eq!(
            key_to_action(key(KeyCode::Char('q'), KeyModifiers::NONE)),
            Action::None
        );
        assert_eq!(
            key_to_action(key(KeyCode::Char('c'), KeyModifiers::NONE)),
            Action::None
        );
    }

    #[test]
    fn test_arrows_are_left_to_the_input() {
        assert_eq!(
            key_to_action(key(KeyCode::Up, KeyModifiers::NONE)),
            Action::None
        );
        assert_eq!(
            key_to_action(key(KeyCode::Down, KeyModifiers::NONE)),
            Action::None
        );
    }

    #[test]
    fn test_tab_switches_conversation() {
        assert_eq!(
            key_to_action(key(KeyCode::Tab, KeyModifiers::NONE)),
            Action::NextChat
        );
        assert_eq!(
            key_to_action(key(KeyCode::BackTab, KeyModifiers::SHIFT)),
            Action::PrevChat
        );
    }
}
