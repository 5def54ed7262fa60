//! Layout helpers for the docchat TUI.

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Width of the conversation sidebar.
const SIDEBAR_WIDTH: u16 = 28;

/// Height of the input box, borders included.
const INPUT_HEIGHT: u16 = 5;

/// Create a centered rect with fixed dimensions.
pub fn centered_fixed(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}

/// Create the main layout with status bar at bottom.
pub fn main_layout(area: Rect) -> (Rect, Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(area);
    (chunks[0], chunks[1])
}

/// Areas of the chat screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatAreas {
    pub sidebar: Rect,
    pub transcript: Rect,
    pub input: Rect,
}

/// Split the main area into sidebar, transcript and input.
///
/// The sidebar is dropped on narrow terminals.
pub fn chat_layout(area: Rect) -> ChatAreas {
    let sidebar_width = if area.width >= SIDEBAR_WIDTH * 3 {
        SIDEBAR_WIDTH
    } else {
        0
    };

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(sidebar_width), Constraint::Min(10)])
        .split(area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(INPUT_HEIGHT)])
        .split(columns[1]);

    ChatAreas {
        sidebar: columns[0],
        transcript: rows[0],
        input: rows[1],
    }
}
