//! System clipboard access.

use arboard::Clipboard;
use tracing::debug;

/// Wraps the system clipboard, which may be unavailable (e.g. over SSH).
pub struct ClipboardManager {
    clipboard: Option<Clipboard>,
}

impl ClipboardManager {
    pub fn new() -> Self {
        let clipboard = match Clipboard::new() {
            Ok(clipboard) => Some(clipboard),
            Err(e) => {
                debug!(error = %e, "Clipboard unavailable");
                None
            }
        };
        Self { clipboard }
    }

    /// A manager that never touches the system clipboard.
    pub fn disabled() -> Self {
        Self { clipboard: None }
    }

    /// Copy text; returns whether it worked.
    pub fn copy(&mut self, text: &str) -> bool {
        match self.clipboard.as_mut() {
            Some(clipboard) => clipboard.set_text(text).is_ok(),
            None => false,
        }
    }

    pub fn paste(&mut self) -> Option<String> {
        self.clipboard.as_mut()?.get_text().ok()
    }
}

impl Default for ClipboardManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ClipboardManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClipboardManager")
            .field("available", &self.clipboard.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_clipboard() {
        let mut clipboard = ClipboardManager::disabled();
        assert!(!clipboard.copy("text"));
        assert!(clipboard.paste().is_none());
    }
}
