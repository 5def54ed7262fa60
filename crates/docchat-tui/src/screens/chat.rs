//! Chat screen: conversation sidebar, transcript and input.

use crate::app::{App, EXAMPLES};
use crate::screens::Screen;
use crate::text::{render_markdown, truncate_to_width, wrap_lines, wrap_text, MarkdownStyles};
use crate::ui::theme::{spinner, turn_body_style, turn_marker, Styles, Symbols};
use crate::ui::widgets::{KeyHint, StatusBar};
use crate::ui::{centered_fixed, chat_layout, main_layout};
use docchat_engine::{Emitter, Selection, Turn};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget},
};

/// The chat screen.
pub struct ChatScreen;

impl Screen for ChatScreen {
    fn render(&self, app: &App, area: Rect, buf: &mut Buffer) {
        let (main_area, status_area) = main_layout(area);
        let areas = chat_layout(main_area);

        if areas.sidebar.width > 0 {
            render_sidebar(app, areas.sidebar, buf);
        }
        render_transcript(app, areas.transcript, buf);
        render_input(app, areas.input, buf);

        let hints = vec![
            KeyHint::new("Enter", "Send"),
            KeyHint::new("^N", "New"),
            KeyHint::new("Tab", "Switch"),
            KeyHint::new("^Y", "Copy"),
            KeyHint::new("F1", "Help"),
        ];
        let mode = if app.is_waiting() { "Waiting" } else { "Chat" };
        let right = app.notification.as_deref().unwrap_or(&app.backend_url);
        StatusBar::new(mode)
            .hints(hints)
            .right(right)
            .render(status_area, buf);
    }
}

fn render_sidebar(app: &App, area: Rect, buf: &mut Buffer) {
    let block = Block::default()
        .title(" Chats ")
        .title_style(Styles::title())
        .borders(Borders::ALL)
        .border_style(Styles::border())
        .style(Styles::default());

    let inner = block.inner(area);
    block.render(area, buf);

    let label_width = usize::from(inner.width).saturating_sub(4);
    let selected = app.session.selected_id();
    let mut lines = Vec::new();

    if let Selection::Creating { pending_prompt } = app.session.selection() {
        lines.push(Line::from(vec![
            Span::styled(format!("{} ", Symbols::SELECTED), Styles::highlight()),
            Span::styled(format!("{} ", spinner(app.tick)), Styles::warning()),
            Span::styled(truncate_to_width(pending_prompt, label_width), Styles::dim()),
        ]));
    }

    for conversation in app.conversations() {
        let is_selected = selected == Some(conversation.id());
        let marker = if is_selected { Symbols::SELECTED } else { " " };
        let status = if app.session.is_in_flight(conversation.id()) {
            spinner(app.tick)
        } else {
            " "
        };
        let style = if is_selected {
            Styles::highlight()
        } else {
            Styles::default()
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{marker} "), style),
            Span::styled(format!("{status} "), Styles::warning()),
            Span::styled(truncate_to_width(conversation.label(), label_width), style),
        ]));
    }

    if lines.is_empty() {
        lines.push(Line::from(Span::styled(" No chats yet", Styles::dim())));
        lines.push(Line::from(Span::styled(" Ctrl+N to start", Styles::dim())));
    }

    Paragraph::new(lines)
        .style(Styles::default())
        .render(inner, buf);
}

fn render_transcript(app: &App, area: Rect, buf: &mut Buffer) {
    let title = app
        .session
        .selected()
        .map_or_else(|| " docchat ".to_string(), |c| format!(" {} ", c.label()));
    let block = Block::default()
        .title(truncate_to_width(&title, usize::from(area.width).saturating_sub(4)))
        .title_style(Styles::title())
        .borders(Borders::ALL)
        .border_style(Styles::border_active())
        .style(Styles::default());

    let inner = block.inner(area);
    block.render(area, buf);

    let turns = app.session.selected().map(docchat_engine::Conversation::turns);
    let lines = match turns {
        Some(turns) if !turns.is_empty() => {
            let mut lines = transcript_lines(turns, usize::from(inner.width));
            if app.is_waiting() {
                lines.push(Line::from(Span::styled(
                    format!("{} Searching the docs...", spinner(app.tick)),
                    Styles::warning(),
                )));
            }
            lines
        }
        _ if app.is_waiting() => vec![Line::from(Span::styled(
            format!("{} Starting a new chat...", spinner(app.tick)),
            Styles::warning(),
        ))],
        _ => empty_state_lines(),
    };

    // Show the window that ends `scroll_from_bottom` lines above the newest line.
    let height = usize::from(inner.height);
    let max_scroll = lines.len().saturating_sub(height);
    app.scroll_limit.set(max_scroll);
    let offset = app.scroll_from_bottom.min(max_scroll);
    let start = max_scroll - offset;

    let visible: Vec<Line<'static>> = lines.into_iter().skip(start).take(height).collect();
    Paragraph::new(visible)
        .style(Styles::default())
        .render(inner, buf);
}

/// Marker line, body and a blank separator for each turn.
fn transcript_lines(turns: &[Turn], width: usize) -> Vec<Line<'static>> {
    let body_width = width.saturating_sub(2).max(1);
    let mut lines = Vec::new();

    for turn in turns {
        let emitter = turn.emitter();
        let (marker, marker_style) = turn_marker(emitter);
        lines.push(Line::from(Span::styled(marker, marker_style)));

        let body_style = turn_body_style(emitter);
        let body = match emitter {
            Emitter::Assistant => wrap_lines(
                render_markdown(turn.display_text(), MarkdownStyles::on(body_style)),
                body_width,
            ),
            Emitter::User | Emitter::Error => wrap_text(turn.display_text(), body_width)
                .into_iter()
                .map(|text| Line::from(Span::styled(text, body_style)))
                .collect(),
        };

        for line in body {
            let mut spans = vec![Span::styled("  ", body_style)];
            spans.extend(line.spans);
            lines.push(Line::from(spans));
        }
        lines.push(Line::default());
    }

    lines
}

fn empty_state_lines() -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::default(),
        Line::from(Span::styled(
            "  Ask questions about your documentation.",
            Styles::highlight(),
        )),
        Line::default(),
        Line::from(Span::styled("  Examples", Styles::title())),
    ];
    for example in EXAMPLES {
        lines.push(Line::from(Span::styled(
            format!("    \"{example}\""),
            Styles::default(),
        )));
    }
    lines.extend([
        Line::from(Span::styled(
            "    Ctrl+O puts the next example in the input",
            Styles::dim(),
        )),
        Line::default(),
        Line::from(Span::styled("  Capabilities", Styles::title())),
        Line::from(Span::styled(
            "    Remembers what was said earlier in the chat",
            Styles::default(),
        )),
        Line::from(Span::styled(
            "    Answers from the indexed documentation",
            Styles::default(),
        )),
        Line::default(),
        Line::from(Span::styled("  Limitations", Styles::title())),
        Line::from(Span::styled(
            "    May occasionally produce incorrect information",
            Styles::default(),
        )),
        Line::from(Span::styled(
            "    Knows nothing outside the indexed documents",
            Styles::default(),
        )),
    ]);
    lines
}

fn render_input(app: &App, area: Rect, buf: &mut Buffer) {
    let waiting = app.is_waiting();
    let block = Block::default()
        .title(" Ask ")
        .title_style(Styles::title())
        .borders(Borders::ALL)
        .border_style(if waiting {
            Styles::border()
        } else {
            Styles::border_active()
        })
        .style(Styles::default());

    let inner = block.inner(area);
    block.render(area, buf);

    app.input_state
        .widget()
        .focused(!waiting)
        .placeholder("Ask a question...")
        .render(inner, buf);
}

/// Quit confirmation overlay.
pub struct QuitConfirmScreen;

impl Screen for QuitConfirmScreen {
    fn render(&self, app: &App, area: Rect, buf: &mut Buffer) {
        ChatScreen.render(app, area, buf);

        let width = 44.min(area.width.saturating_sub(4));
        let height = 8.min(area.height.saturating_sub(2));
        let overlay_area = centered_fixed(width, height, area);

        Clear.render(overlay_area, buf);

        let block = Block::default()
            .title(" Quit docchat? ")
            .title_style(Styles::title())
            .borders(Borders::ALL)
            .border_style(Styles::border_active())
            .style(Styles::default());

        let inner = block.inner(overlay_area);
        block.render(overlay_area, buf);

        let mut lines = vec![
            Line::default(),
            Line::from(Span::styled(
                "  Chats are not saved after you quit.",
                Styles::default(),
            )),
        ];
        if app.session.any_in_flight() {
            lines.push(Line::from(Span::styled(
                "  Pending answers will be discarded.",
                Styles::warning(),
            )));
        }
        lines.push(Line::default());
        lines.push(Line::from(vec![
            Span::styled("  ", Styles::default()),
            Span::styled("[y]", Styles::key_hint()),
            Span::styled(" Quit   ", Styles::default()),
            Span::styled("[n]", Styles::key_hint()),
            Span::styled(" Stay", Styles::default()),
        ]));

        Paragraph::new(lines)
            .style(Styles::default())
            .render(inner, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        create_test_app, render_screen_to_string, render_screen_to_string_sized,
    };
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use docchat_engine::{Answer, AskFailure, AskOutcome, PendingAsk};

    fn ask(app: &mut App, prompt: &str) -> PendingAsk {
        app.input_state.set(prompt);
        match app.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)) {
            Some(pending) => pending,
            None => app.resume_creation().unwrap(),
        }
    }

    fn answer(text: &str) -> AskOutcome {
        Ok(Answer {
            text: text.to_string(),
            sources: vec![],
        })
    }

    #[test]
    fn test_empty_state_shows_examples() {
        let app = create_test_app();
        let screen = render_screen_to_string(&ChatScreen, &app);
        assert!(screen.contains("Ask questions about your documentation."));
        assert!(screen.contains(EXAMPLES[0]));
        assert!(screen.contains("Limitations"));
        assert!(screen.contains("Ask a question..."));
    }

    #[test]
    fn test_transcript_shows_markers_and_answer() {
        let mut app = create_test_app();
        let pending = ask(&mut app, "what is X?");
        app.apply_outcome(pending, answer("\n\nX is **Y**"));

        let screen = render_screen_to_string_sized(&ChatScreen, &app, 100, 30);
        assert!(screen.contains("[you]"));
        assert!(screen.contains("what is X?"));
        assert!(screen.contains("[docs]"));
        assert!(screen.contains("X is Y"));
        assert!(screen.contains("Chats"));
    }

    #[test]
    fn test_error_turn_rendered() {
        let mut app = create_test_app();
        let pending = ask(&mut app, "q");
        app.apply_outcome(pending, Err(AskFailure::server_unreachable()));

        let screen = render_screen_to_string(&ChatScreen, &app);
        assert!(screen.contains("[!]"));
        assert!(screen.contains("Server Unreachable"));
    }

    #[test]
    fn test_waiting_shows_spinner_line() {
        let mut app = create_test_app();
        let _pending = ask(&mut app, "q");
        let screen = render_screen_to_string(&ChatScreen, &app);
        assert!(screen.contains("Searching the docs..."));
        assert!(screen.contains("Waiting"));
    }

    #[test]
    fn test_sidebar_lists_labels() {
        let mut app = create_test_app();
        let pending = ask(&mut app, "first topic");
        app.apply_outcome(pending, answer("a"));
        app.handle_key(KeyEvent::new(KeyCode::Char('n'), KeyModifiers::CONTROL));

        let screen = render_screen_to_string_sized(&ChatScreen, &app, 100, 30);
        assert!(screen.contains("first topic"));
        assert!(screen.contains("New chat"));
    }

    #[test]
    fn test_long_transcript_follows_newest() {
        let mut app = create_test_app();
        for i in 0..8 {
            let pending = ask(&mut app, &format!("question {i}"));
            app.apply_outcome(pending, answer(&format!("answer {i}")));
        }

        let screen = render_screen_to_string(&ChatScreen, &app);
        assert!(screen.contains("answer 7"));
        assert!(!screen.contains("answer 0"));
        assert!(app.scroll_limit.get() > 0);
    }

    #[test]
    fn test_quit_confirm_overlay() {
        let app = create_test_app();
        let screen = render_screen_to_string(&QuitConfirmScreen, &app);
        assert!(screen.contains("Quit docchat?"));
        assert!(screen.contains("[y]"));
    }
}
