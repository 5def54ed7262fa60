//! Markdown styling configuration.

use ratatui::style::{Modifier, Style};

use crate::ui::theme::Palette;

/// Styles for rendering markdown elements.
#[derive(Debug, Clone, Copy)]
pub struct MarkdownStyles {
    pub h1: Style,
    pub h2: Style,
    /// H3 and deeper.
    pub h3: Style,
    pub code: Style,
    pub code_block: Style,
    pub emphasis: Style,
    pub strong: Style,
    pub list_marker: Style,
    pub link: Style,
    pub blockquote: Style,
    pub text: Style,
    pub strikethrough: Style,
    pub rule: Style,
}

impl MarkdownStyles {
    /// Styles for text drawn on `base` (the bubble background).
    pub fn on(base: Style) -> Self {
        let bold = base.add_modifier(Modifier::BOLD);
        Self {
            h1: bold.fg(Palette::ACCENT),
            h2: bold,
            h3: bold.fg(Palette::DIM),
            code: base.fg(Palette::WARNING),
            code_block: base.fg(Palette::WARNING),
            emphasis: Style::default().add_modifier(Modifier::ITALIC),
            strong: Style::default().add_modifier(Modifier::BOLD),
            list_marker: base.fg(Palette::DIM),
            link: Style::default()
                .fg(Palette::ACCENT)
                .add_modifier(Modifier::UNDERLINED),
            blockquote: base.fg(Palette::DIM).add_modifier(Modifier::ITALIC),
            text: base,
            strikethrough: Style::default().add_modifier(Modifier::CROSSED_OUT),
            rule: base.fg(Palette::BORDER),
        }
    }
}

impl Default for MarkdownStyles {
    fn default() -> Self {
        Self::on(crate::ui::theme::Styles::default())
    }
}
