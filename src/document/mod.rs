//! Markdown rendering into a structured, serializable tree.
//!
//! [`MarkdownRenderer`] parses with comrak (CommonMark plus tables,
//! strikethrough, task lists and autolinks), computes a heading outline with
//! unique anchors, and hands fenced code to a [`crate::highlight::Highlighter`].

mod parser;
mod types;

pub use parser::{MAX_NESTING, MarkdownRenderer};
pub use types::{
    Alignment, Block, CodeBlock, HeadingRef, Inline, List, ListItem, RenderedContent, Table,
    inline_text,
};
