//! Toolbar formatting commands expressed as buffer edits.
//!
//! Each command turns the buffer's cursor/selection into one or more
//! [`EditOperation`]s that the session records as a single history entry.

use super::buffer::{EditOperation, TextBuffer};
use crate::error::Result;

const TABLE_TEMPLATE: &str = "| Header 1 | Header 2 | Header 3 |
|----------|----------|----------|
| Cell 1   | Cell 2   | Cell 3   |
| Cell 4   | Cell 5   | Cell 6   |
";

/// A formatting command from the editor toolbar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatCommand {
    Bold,
    Italic,
    Strikethrough,
    InlineCode,
    /// Replace the current line's heading marker with `level` hashes (1–6).
    Heading(u8),
    BulletList,
    NumberedList,
    TaskList,
    Link,
    Image,
    Table,
    Quote,
    CodeBlock,
    HorizontalRule,
}

/// Result of planning a command: the edits plus where the cursor should land.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatEdit {
    pub ops: Vec<EditOperation>,
    pub cursor: usize,
}

impl FormatCommand {
    /// Plan the edits this command makes to `buffer`.
    ///
    /// # Errors
    /// Propagates [`crate::error::EditorError::InvalidOperation`] if the
    /// buffer's selection is stale.
    pub fn plan(self, buffer: &TextBuffer) -> Result<FormatEdit> {
        match self {
            Self::Bold => wrap(buffer, "**", "**"),
            Self::Italic => wrap(buffer, "*", "*"),
            Self::Strikethrough => wrap(buffer, "~~", "~~"),
            Self::InlineCode => wrap(buffer, "`", "`"),
            Self::Heading(level) => heading(buffer, level.clamp(1, 6)),
            Self::BulletList => line_prefix(buffer, "- "),
            Self::NumberedList => line_prefix(buffer, "1. "),
            Self::TaskList => line_prefix(buffer, "- [ ] "),
            Self::Link => Ok(match selected(buffer)? {
                Some((range, text)) => {
                    replace_selection(buffer, range, format!("[{text}](url)"))?
                }
                None => insert_at_cursor(buffer, "[link text](url)"),
            }),
            Self::Image => Ok(insert_at_cursor(buffer, "![alt text](image_url)")),
            Self::Table => Ok(insert_at_cursor(buffer, TABLE_TEMPLATE)),
            Self::Quote => match selected(buffer)? {
                Some((range, text)) => {
                    let quoted = text
                        .split('\n')
                        .map(|line| format!("> {line}"))
                        .collect::<Vec<_>>()
                        .join("\n");
                    replace_selection(buffer, range, quoted)
                }
                None => line_prefix(buffer, "> "),
            },
            Self::CodeBlock => Ok(match selected(buffer)? {
                Some((range, text)) => {
                    replace_selection(buffer, range, format!("```\n{text}\n```"))?
                }
                None => insert_at_cursor(buffer, "```language\ncode here\n```"),
            }),
            Self::HorizontalRule => Ok(insert_at_cursor(buffer, "\n---\n")),
        }
    }
}

fn selected(buffer: &TextBuffer) -> Result<Option<(std::ops::Range<usize>, String)>> {
    let Some(range) = buffer.selection() else {
        return Ok(None);
    };
    let op = buffer.delete_op(range.start, range.len())?;
    let EditOperation::Delete { deleted_text, .. } = op else {
        return Ok(None);
    };
    Ok(Some((range, deleted_text)))
}

fn insert_at_cursor(buffer: &TextBuffer, text: &str) -> FormatEdit {
    let offset = buffer.cursor();
    FormatEdit {
        cursor: offset + text.chars().count(),
        ops: vec![EditOperation::insert(offset, text)],
    }
}

fn replace_selection(
    buffer: &TextBuffer,
    range: std::ops::Range<usize>,
    text: String,
) -> Result<FormatEdit> {
    let cursor = range.start + text.chars().count();
    let op = buffer.replace_op(range.start, range.len(), text)?;
    Ok(FormatEdit {
        ops: vec![op],
        cursor,
    })
}

/// Surround the selection with markers, or insert an empty pair and place
/// the cursor between them.
fn wrap(buffer: &TextBuffer, prefix: &str, suffix: &str) -> Result<FormatEdit> {
    let prefix_len = prefix.chars().count();
    if let Some(range) = buffer.selection() {
        let end = range.end + prefix_len;
        return Ok(FormatEdit {
            ops: vec![
                EditOperation::insert(range.start, prefix),
                EditOperation::insert(end, suffix),
            ],
            cursor: end + suffix.chars().count(),
        });
    }
    let offset = buffer.cursor();
    Ok(FormatEdit {
        ops: vec![EditOperation::insert(offset, format!("{prefix}{suffix}"))],
        cursor: offset + prefix_len,
    })
}

fn line_prefix(buffer: &TextBuffer, prefix: &str) -> Result<FormatEdit> {
    let start = buffer.line_start(buffer.cursor());
    Ok(FormatEdit {
        ops: vec![EditOperation::insert(start, prefix)],
        cursor: buffer.cursor() + prefix.chars().count(),
    })
}

fn heading(buffer: &TextBuffer, level: u8) -> Result<FormatEdit> {
    let start = buffer.line_start(buffer.cursor());
    let line = buffer.line_text(start);
    let body = line.trim_start_matches('#').trim_start();
    let new_line = format!("{} {body}", "#".repeat(usize::from(level)));
    let cursor = start + new_line.chars().count();
    let op = buffer.replace_op(start, line.chars().count(), new_line)?;
    Ok(FormatEdit {
        ops: vec![op],
        cursor,
    })
}
