//! Markdown rendering using pulldown-cmark.
//!
//! Answers come back from the documentation backend as markdown; this turns
//! them into styled lines. Wrapping is done afterwards by [`super::wrap_lines`].

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::{
    style::Style,
    text::{Line, Span},
};

use super::styles::MarkdownStyles;

/// Render markdown text to styled lines.
pub fn render_markdown(input: &str, styles: MarkdownStyles) -> Vec<Line<'static>> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut renderer = Renderer::new(styles);
    for event in Parser::new_ext(input, options) {
        renderer.handle(event);
    }
    renderer.finish()
}

/// One level of list nesting; `next` is the number of the next ordered item.
struct ListLevel {
    next: Option<u64>,
}

struct Renderer {
    lines: Vec<Line<'static>>,
    styles: MarkdownStyles,
    style_stack: Vec<Style>,
    spans: Vec<Span<'static>>,
    lists: Vec<ListLevel>,
    pending_marker: Option<String>,
    code_block: bool,
    quote_depth: usize,
}

impl Renderer {
    fn new(styles: MarkdownStyles) -> Self {
        Self {
            lines: Vec::new(),
            styles,
            style_stack: Vec::new(),
            spans: Vec::new(),
            lists: Vec::new(),
            pending_marker: None,
            code_block: false,
            quote_depth: 0,
        }
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.flush();
        while self.lines.last().is_some_and(|line| line.spans.is_empty()) {
            self.lines.pop();
        }
        self.lines
    }

    fn handle(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => {
                self.prefix();
                self.spans
                    .push(Span::styled(format!("`{code}`"), self.styles.code));
            }
            Event::SoftBreak => self.text(" "),
            Event::HardBreak => self.flush(),
            Event::Rule => {
                self.flush();
                self.lines
                    .push(Line::from(Span::styled("-".repeat(24), self.styles.rule)));
                self.blank();
            }
            Event::TaskListMarker(checked) => {
                self.prefix();
                let checkbox = if checked { "[x] " } else { "[ ] " };
                self.spans
                    .push(Span::styled(checkbox, self.styles.list_marker));
            }
            // Raw HTML and footnotes are shown as-is or dropped.
            Event::Html(html) | Event::InlineHtml(html) => self.text(&html),
            Event::FootnoteReference(_) => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading { level, .. } => {
                self.flush();
                let style = match level {
                    HeadingLevel::H1 => self.styles.h1,
                    HeadingLevel::H2 => self.styles.h2,
                    _ => self.styles.h3,
                };
                self.style_stack.push(style);
            }
            Tag::Emphasis => self.style_stack.push(self.styles.emphasis),
            Tag::Strong => self.style_stack.push(self.styles.strong),
            Tag::Strikethrough => self.style_stack.push(self.styles.strikethrough),
            Tag::Link { .. } => self.style_stack.push(self.styles.link),
            Tag::CodeBlock(kind) => {
                self.flush();
                self.code_block = true;
                if let CodeBlockKind::Fenced(lang) = kind {
                    if !lang.is_empty() {
                        self.lines.push(Line::from(Span::styled(
                            format!("{}[{lang}]", self.indent()),
                            self.styles.list_marker,
                        )));
                    }
                }
            }
            Tag::List(start) => {
                self.flush();
                self.lists.push(ListLevel { next: start });
            }
            Tag::Item => {
                self.flush();
                let indent = "  ".repeat(self.lists.len().saturating_sub(1));
                let marker = match self.lists.last_mut() {
                    Some(ListLevel { next: Some(n) }) => {
                        let marker = format!("{indent}{n}. ");
                        *n += 1;
                        marker
                    }
                    _ => format!("{indent}- "),
                };
                self.pending_marker = Some(marker);
            }
            Tag::BlockQuote => {
                self.flush();
                self.quote_depth += 1;
            }
            Tag::Paragraph
            | Tag::Image { .. }
            | Tag::Table(_)
            | Tag::TableHead
            | Tag::TableRow
            | Tag::TableCell
            | Tag::FootnoteDefinition(_)
            | Tag::MetadataBlock(_)
            | Tag::HtmlBlock => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Heading(_) => {
                self.flush();
                self.style_stack.pop();
                self.blank();
            }
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough | TagEnd::Link => {
                self.style_stack.pop();
            }
            TagEnd::CodeBlock => {
                self.flush();
                self.code_block = false;
                self.blank();
            }
            TagEnd::List(_) => {
                self.flush();
                self.lists.pop();
                if self.lists.is_empty() {
                    self.blank();
                }
            }
            TagEnd::Item => self.flush(),
            TagEnd::BlockQuote => {
                self.flush();
                self.quote_depth = self.quote_depth.saturating_sub(1);
            }
            TagEnd::Paragraph => {
                self.flush();
                // Tight list items end without a blank line.
                if self.lists.is_empty() {
                    self.blank();
                }
            }
            TagEnd::TableCell => self.text(" "),
            TagEnd::TableRow | TagEnd::TableHead => self.flush(),
            TagEnd::Table => self.blank(),
            TagEnd::Image
            | TagEnd::FootnoteDefinition
            | TagEnd::MetadataBlock(_)
            | TagEnd::HtmlBlock => {}
        }
    }

    fn text(&mut self, text: &str) {
        if self.code_block {
            let indent = self.indent();
            for line in text.lines() {
                self.spans.push(Span::styled(
                    format!("{indent}  {line}"),
                    self.styles.code_block,
                ));
                self.flush();
            }
            return;
        }

        self.prefix();
        let style = self
            .style_stack
            .iter()
            .fold(self.styles.text, |acc, s| acc.patch(*s));
        self.spans.push(Span::styled(text.to_string(), style));
    }

    /// Emit the quote bar and any pending list marker at the start of a line.
    fn prefix(&mut self) {
        if self.spans.is_empty() && self.quote_depth > 0 {
            self.spans.push(Span::styled(
                "| ".repeat(self.quote_depth),
                self.styles.blockquote,
            ));
        }
        if let Some(marker) = self.pending_marker.take() {
            self.spans.push(Span::styled(marker, self.styles.list_marker));
        }
    }

    fn indent(&self) -> String {
        "  ".repeat(self.lists.len())
    }

    fn flush(&mut self) {
        if !self.spans.is_empty() {
            self.lines.push(Line::from(std::mem::take(&mut self.spans)));
        }
    }

    fn blank(&mut self) {
        if self.lines.last().is_some_and(|line| !line.spans.is_empty()) {
            self.lines.push(Line::default());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::style::Modifier;

    fn render(input: &str) -> Vec<String> {
        render_markdown(input, MarkdownStyles::default())
            .iter()
            .map(|line| line.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn test_render_empty() {
        assert!(render("").is_empty());
    }

    #[test]
    fn test_paragraphs_are_separated() {
        let lines = render("First paragraph.\n\nSecond paragraph.");
        assert_eq!(lines, vec!["First paragraph.", "", "Second paragraph."]);
    }

    #[test]
    fn test_soft_break_joins_lines() {
        assert_eq!(render("one\ntwo"), vec!["one two"]);
    }

    #[test]
    fn test_heading_is_styled() {
        let lines = render_markdown("# Title\n\nbody", MarkdownStyles::default());
        assert_eq!(lines[0].spans[0].content, "Title");
        assert!(lines[0].spans[0]
            .style
            .add_modifier
            .contains(Modifier::BOLD));
    }

    #[test]
    fn test_inline_code_keeps_backticks() {
        assert_eq!(render("Use `pip install` here"), vec!["Use `pip install` here"]);
    }

    #[test]
    fn test_code_block_with_language() {
        let lines = render("```python\nimport os\nprint(1)\n```");
        assert_eq!(lines, vec!["[python]", "  import os", "  print(1)"]);
    }

    #[test]
    fn test_bullet_and_ordered_lists() {
        assert_eq!(render("- a\n- b"), vec!["- a", "- b"]);
        assert_eq!(render("3. x\n4. y"), vec!["3. x", "4. y"]);
    }

    #[test]
    fn test_nested_list_indents() {
        assert_eq!(render("- a\n  - b"), vec!["- a", "  - b"]);
    }

    #[test]
    fn test_task_list() {
        assert_eq!(
            render("- [ ] todo\n- [x] done"),
            vec!["- [ ] todo", "- [x] done"]
        );
    }

    #[test]
    fn test_blockquote_prefix() {
        assert_eq!(render("> quoted"), vec!["| quoted"]);
    }

    #[test]
    fn test_nested_emphasis_patches_styles() {
        let lines = render_markdown("**bold *both***", MarkdownStyles::default());
        let both = lines[0]
            .spans
            .iter()
            .find(|s| s.content == "both")
            .unwrap();
        assert!(both.style.add_modifier.contains(Modifier::BOLD));
        assert!(both.style.add_modifier.contains(Modifier::ITALIC));
    }
}
