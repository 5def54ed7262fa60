//! Screen definitions for the docchat TUI.

pub mod chat;

use crate::app::App;
use ratatui::{buffer::Buffer, layout::Rect, widgets::Widget};

/// Trait for screens that can be rendered.
pub trait Screen {
    /// Render the screen to the buffer.
    fn render(&self, app: &App, area: Rect, buf: &mut Buffer);
}

/// Render the help overlay.
pub fn render_help_overlay(area: Rect, buf: &mut Buffer) {
    use crate::ui::centered_fixed;
    use crate::ui::theme::Styles;
    use ratatui::widgets::{Block, Borders, Clear, Paragraph};

    let help_text = r"
  Chat
    Enter              Send question
    Ctrl+Enter         New line
    Up / Down          Previous questions
    Ctrl+O             Use an example question

  Conversations
    Ctrl+N             New chat
    Tab / Shift+Tab    Next/prev chat
    PgUp / PgDn        Scroll transcript

  Clipboard
    Ctrl+Y             Copy last answer
    Ctrl+T             Copy chat as markdown
    Ctrl+V             Paste

  Esc quit  Ctrl+C quit now  F1 help

  [Press any key to close]
";

    let width = 52.min(area.width.saturating_sub(4));
    let height = 24.min(area.height.saturating_sub(2));
    let overlay_area = centered_fixed(width, height, area);

    Clear.render(overlay_area, buf);

    let block = Block::default()
        .title(" Help ")
        .title_style(Styles::title())
        .borders(Borders::ALL)
        .border_style(Styles::border_active())
        .style(Styles::default());

    Paragraph::new(help_text)
        .block(block)
        .style(Styles::default())
        .render(overlay_area, buf);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::buffer_to_string;

    #[test]
    fn test_help_overlay_lists_keys() {
        let area = Rect::new(0, 0, 80, 30);
        let mut buf = Buffer::empty(area);
        render_help_overlay(area, &mut buf);
        let text = buffer_to_string(&buf);
        assert!(text.contains("Help"));
        assert!(text.contains("Ctrl+N"));
        assert!(text.contains("Copy last answer"));
    }
}
