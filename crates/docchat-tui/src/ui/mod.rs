//! UI building blocks for the docchat TUI: layout, theme and widgets.

pub mod layout;
pub mod theme;
pub mod widgets;

pub use layout::*;
pub use theme::*;
pub use widgets::*;
