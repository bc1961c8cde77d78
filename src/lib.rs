// Only allow lints that are either transitive-dependency noise or
// genuinely opinionated style choices that don't indicate real issues.
#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    // module_name_repetitions is pure style preference (e.g. editor::EditorError)
    clippy::module_name_repetitions
)]

//! # MDFlex
//!
//! The editing core of a live-preview markdown editor.
//!
//! MDFlex keeps a markdown buffer and its rendered preview in sync while the
//! author types:
//! - Rope-backed buffer with reversible edits and coalescing undo/redo
//! - CommonMark + GFM rendering into a serializable block tree
//! - Syntax-highlighted fenced code blocks
//! - Debounced rendering on a background worker, never two at once
//! - Edit/read modes with proportional scroll mirroring
//! - Standalone, themed HTML export
//!
//! ## Architecture
//!
//! Edits enter through [`session::Session`], which applies them to the
//! [`editor::TextBuffer`], records them in the [`editor::HistoryStack`] and
//! notifies the [`scheduler::RenderScheduler`]. Once the debounce period
//! passes the [`document::MarkdownRenderer`] produces new content, which the
//! session hands to its subscribers.
//!
//! ## Modules
//!
//! - [`editor`]: Text buffer, edit operations, history and formatting commands
//! - [`document`]: Markdown rendering
//! - [`highlight`]: Code block highlighting
//! - [`scheduler`]: Debounced render scheduling and the render worker
//! - [`view`]: Edit/read mode and scroll mirroring
//! - [`session`]: The public editing API
//! - [`stats`]: Word and character counts
//! - [`export`]: Standalone HTML export
//! - [`theme`]: Theme palettes and zoom
//! - [`config`]: Saved default flags

pub mod config;
pub mod document;
pub mod editor;
pub mod error;
pub mod export;
pub mod fs;
pub mod highlight;
pub mod perf;
pub mod scheduler;
pub mod session;
pub mod stats;
pub mod theme;
pub mod view;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::document::{MarkdownRenderer, RenderedContent};
    pub use crate::editor::{EditOperation, FormatCommand};
    pub use crate::error::EditorError;
    pub use crate::session::{Session, SessionConfig};
    pub use crate::theme::{Presentation, Theme, Zoom};
    pub use crate::view::ViewMode;
}
