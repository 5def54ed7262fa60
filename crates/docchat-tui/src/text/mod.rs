//! Text rendering utilities: markdown, wrapping and truncation.

mod markdown;
mod styles;
mod width;
mod wrap;

pub use markdown::render_markdown;
pub use styles::MarkdownStyles;
pub use width::truncate_to_width;
pub use wrap::{wrap_lines, wrap_text};
