//! Truncation to a cell width.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Truncate to at most `max_width` cells, ending in "..." when cut.
///
/// Only the first line is kept; sidebar labels are single-line.
pub fn truncate_to_width(s: &str, max_width: usize) -> String {
    let first_line = s.lines().next().unwrap_or_default();
    let cut = first_line.len() != s.trim_end().len();

    if !cut && first_line.width() <= max_width {
        return first_line.to_string();
    }

    let target = max_width.saturating_sub(3);
    let mut result = String::new();
    let mut width = 0;
    for ch in first_line.chars() {
        let ch_width = ch.width().unwrap_or(0);
        if width + ch_width > target {
            break;
        }
        result.push(ch);
        width += ch_width;
    }
    result.push_str("...");
    result
}
