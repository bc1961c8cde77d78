//! Document model: rope-backed text buffer, reversible edits and history.
//!
//! All mutations flow through [`TextBuffer::apply`] so that every change is
//! an [`EditOperation`] that [`HistoryStack`] can invert.

mod buffer;
mod format;
mod history;

pub use buffer::{EditOperation, TextBuffer};
pub use format::{FormatCommand, FormatEdit};
pub use history::{HistoryEntry, HistoryStack};
