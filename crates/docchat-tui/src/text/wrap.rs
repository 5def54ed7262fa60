//! Wrapping styled lines to the transcript width.

use ratatui::{
    style::Style,
    text::{Line, Span},
};
use unicode_width::UnicodeWidthStr;

/// Wrap plain text, keeping explicit line breaks.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }
    text.split('\n')
        .flat_map(|line| {
            if line.is_empty() {
                vec![String::new()]
            } else {
                textwrap::wrap(line, width)
                    .into_iter()
                    .map(std::borrow::Cow::into_owned)
                    .collect()
            }
        })
        .collect()
}

/// Wrap styled lines so no line is wider than `width` cells.
pub fn wrap_lines(lines: Vec<Line<'static>>, width: usize) -> Vec<Line<'static>> {
    if width == 0 {
        return lines;
    }
    lines
        .into_iter()
        .flat_map(|line| wrap_line(line, width))
        .collect()
}

/// Greedy word wrap across spans.
///
/// Words longer than the width are split by character. Whitespace at the
/// start of a continuation line is dropped.
fn wrap_line(line: Line<'static>, width: usize) -> Vec<Line<'static>> {
    if line.width() <= width {
        return vec![line];
    }

    let mut out = LineBuilder::new(width);
    for span in &line.spans {
        for word in split_words(&span.content) {
            out.push_word(word, span.style);
        }
    }
    out.finish()
}

/// Split into alternating runs of whitespace and non-whitespace.
fn split_words(text: &str) -> Vec<&str> {
    let mut words = Vec::new();
    let mut start = 0;
    let mut in_space = None;
    for (i, ch) in text.char_indices() {
        let space = ch.is_whitespace();
        if in_space.is_some_and(|prev| prev != space) {
            words.push(&text[start..i]);
            start = i;
        }
        in_space = Some(space);
    }
    if start < text.len() {
        words.push(&text[start..]);
    }
    words
}

struct LineBuilder {
    width: usize,
    lines: Vec<Line<'static>>,
    spans: Vec<Span<'static>>,
    used: usize,
}

impl LineBuilder {
    fn new(width: usize) -> Self {
        Self {
            width,
            lines: Vec::new(),
            spans: Vec::new(),
            used: 0,
        }
    }

    fn push_word(&mut self, word: &str, style: Style) {
        let word_width = word.width();
        let is_space = word.chars().all(char::is_whitespace);

        if self.used + word_width <= self.width {
            self.append(word, style);
            return;
        }
        if is_space {
            self.break_line();
            return;
        }
        if self.used > 0 && word_width <= self.width {
            self.break_line();
            self.append(word, style);
            return;
        }

        // Hard-split a word that cannot fit on any line.
        let mut chunk = String::new();
        for ch in word.chars() {
            let ch_width = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
            if self.used + chunk.width() + ch_width > self.width {
                self.append(&std::mem::take(&mut chunk), style);
                self.break_line();
            }
            chunk.push(ch);
        }
        self.append(&chunk, style);
    }

    fn append(&mut self, text: &str, style: Style) {
        if text.is_empty() || (self.used == 0 && text.chars().all(char::is_whitespace)) {
            return;
        }
        self.used += text.width();
        match self.spans.last_mut() {
            Some(last) if last.style == style => last.content.to_mut().push_str(text),
            _ => self.spans.push(Span::styled(text.to_string(), style)),
        }
    }

    fn break_line(&mut self) {
        if let Some(last) = self.spans.last_mut() {
            let trimmed = last.content.trim_end().to_string();
            last.content = trimmed.into();
        }
        self.lines.push(Line::from(std::mem::take(&mut self.spans)));
        self.used = 0;
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        if !self.spans.is_empty() || self.lines.is_empty() {
            self.break_line();
        }
        self.lines
    }
}
