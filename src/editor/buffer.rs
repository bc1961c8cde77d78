use std::ops::Range;

use ropey::Rope;
use serde::{Deserialize, Serialize};

use crate::error::{EditorError, Result};

/// A reversible edit against a [`TextBuffer`].
///
/// Offsets and lengths count Unicode scalar values, not bytes. Deletions and
/// replacements carry the text they remove so the operation can be inverted
/// without consulting the buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditOperation {
    Insert {
        offset: usize,
        text: String,
    },
    Delete {
        offset: usize,
        length: usize,
        deleted_text: String,
    },
    Replace {
        offset: usize,
        length: usize,
        old_text: String,
        new_text: String,
    },
}

impl EditOperation {
    /// Insert `text` at `offset`.
    pub fn insert(offset: usize, text: impl Into<String>) -> Self {
        Self::Insert {
            offset,
            text: text.into(),
        }
    }

    /// Offset the operation starts at.
    pub const fn offset(&self) -> usize {
        match self {
            Self::Insert { offset, .. }
            | Self::Delete { offset, .. }
            | Self::Replace { offset, .. } => *offset,
        }
    }

    /// Offset just past the text this operation leaves behind.
    pub fn end_offset(&self) -> usize {
        match self {
            Self::Insert { offset, text } => offset + text.chars().count(),
            Self::Delete { offset, .. } => *offset,
            Self::Replace {
                offset, new_text, ..
            } => offset + new_text.chars().count(),
        }
    }

    /// The operation that undoes this one.
    pub fn inverted(&self) -> Self {
        match self {
            Self::Insert { offset, text } => Self::Delete {
                offset: *offset,
                length: text.chars().count(),
                deleted_text: text.clone(),
            },
            Self::Delete {
                offset,
                deleted_text,
                ..
            } => Self::Insert {
                offset: *offset,
                text: deleted_text.clone(),
            },
            Self::Replace {
                offset,
                old_text,
                new_text,
                ..
            } => Self::Replace {
                offset: *offset,
                length: new_text.chars().count(),
                old_text: new_text.clone(),
                new_text: old_text.clone(),
            },
        }
    }

    /// A single typed character, the only kind of edit history may merge.
    pub(crate) fn typed_char(&self) -> Option<char> {
        let Self::Insert { text, .. } = self else {
            return None;
        };
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) if ch != '\n' => Some(ch),
            _ => None,
        }
    }
}

/// A rope-backed markdown buffer with cursor, selection and dirty tracking.
///
/// Every mutation goes through [`TextBuffer::apply`], which either applies
/// the whole operation or leaves the buffer untouched.
pub struct TextBuffer {
    rope: Rope,
    saved: String,
    cursor: usize,
    anchor: Option<usize>,
    dirty: bool,
}

impl TextBuffer {
    /// Create a clean buffer holding `text`.
    pub fn from_text(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            saved: text.to_string(),
            cursor: 0,
            anchor: None,
            dirty: false,
        }
    }

    /// Create an empty buffer.
    pub fn empty() -> Self {
        Self::from_text("")
    }

    /// The full text content of the buffer.
    pub fn current_text(&self) -> String {
        self.rope.to_string()
    }

    /// Length in chars.
    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    pub fn is_empty(&self) -> bool {
        self.rope.len_chars() == 0
    }

    /// Whether the text differs from the last saved snapshot.
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Record the current text as the saved snapshot.
    pub fn mark_saved(&mut self) {
        self.saved = self.rope.to_string();
        self.dirty = false;
    }

    /// The current cursor position (char offset).
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// Move the cursor, dropping any selection.
    pub fn set_cursor(&mut self, offset: usize) {
        self.cursor = offset.min(self.len_chars());
        self.anchor = None;
    }

    /// Select `range`, leaving the cursor at its end.
    pub fn select(&mut self, range: Range<usize>) {
        let len = self.len_chars();
        self.anchor = Some(range.start.min(len));
        self.cursor = range.end.min(len);
    }

    /// The selected range, if any and non-empty.
    pub fn selection(&self) -> Option<Range<usize>> {
        let anchor = self.anchor?;
        let range = anchor.min(self.cursor)..anchor.max(self.cursor);
        (!range.is_empty()).then_some(range)
    }

    /// Text of `range`, or `None` when it lies outside the buffer.
    pub fn slice(&self, range: Range<usize>) -> Option<String> {
        if range.start > range.end || range.end > self.len_chars() {
            return None;
        }
        Some(self.rope.slice(range).to_string())
    }

    /// Build a `Delete` for `length` chars at `offset`, capturing the text.
    ///
    /// # Errors
    /// Returns [`EditorError::InvalidOperation`] when the range is out of bounds.
    pub fn delete_op(&self, offset: usize, length: usize) -> Result<EditOperation> {
        let end = offset.saturating_add(length);
        let deleted_text = self
            .slice(offset..end)
            .ok_or_else(|| EditorError::out_of_range(offset, end, self.len_chars()))?;
        Ok(EditOperation::Delete {
            offset,
            length,
            deleted_text,
        })
    }

    /// Build a `Replace` of `length` chars at `offset` with `new_text`.
    ///
    /// # Errors
    /// Returns [`EditorError::InvalidOperation`] when the range is out of bounds.
    pub fn replace_op(
        &self,
        offset: usize,
        length: usize,
        new_text: impl Into<String>,
    ) -> Result<EditOperation> {
        let end = offset.saturating_add(length);
        let old_text = self
            .slice(offset..end)
            .ok_or_else(|| EditorError::out_of_range(offset, end, self.len_chars()))?;
        Ok(EditOperation::Replace {
            offset,
            length,
            old_text,
            new_text: new_text.into(),
        })
    }

    /// Apply an operation atomically.
    ///
    /// # Errors
    /// Returns [`EditorError::InvalidOperation`] when the operation's range
    /// lies outside the buffer or its recorded text does not match. The
    /// buffer is unchanged in that case.
    pub fn apply(&mut self, op: &EditOperation) -> Result<()> {
        self.validate(op)?;
        match op {
            EditOperation::Insert { offset, text } => {
                self.rope.insert(*offset, text);
            }
            EditOperation::Delete { offset, length, .. } => {
                self.rope.remove(*offset..offset + length);
            }
            EditOperation::Replace {
                offset,
                length,
                new_text,
                ..
            } => {
                self.rope.remove(*offset..offset + length);
                self.rope.insert(*offset, new_text);
            }
        }
        self.cursor = op.end_offset();
        self.anchor = None;
        self.refresh_dirty();
        Ok(())
    }

    /// Apply several operations as one unit, rolling back on failure.
    ///
    /// # Errors
    /// Returns the first operation's error; operations already applied are
    /// reverted so the buffer ends up unchanged.
    pub fn apply_all(&mut self, ops: &[EditOperation]) -> Result<()> {
        for (idx, op) in ops.iter().enumerate() {
            if let Err(err) = self.apply(op) {
                for done in ops[..idx].iter().rev() {
                    // Inverses of just-applied ops always validate.
                    let _ = self.apply(&done.inverted());
                }
                return Err(err);
            }
        }
        Ok(())
    }

    /// The operation that undoes `op`.
    pub fn invert(&self, op: &EditOperation) -> EditOperation {
        op.inverted()
    }

    /// Find the next occurrence of `query` at or after `from`, wrapping to
    /// the start of the buffer. Returns the matched char range.
    pub fn find(&self, query: &str, from: usize) -> Option<Range<usize>> {
        if query.is_empty() {
            return None;
        }
        let text = self.current_text();
        let from_byte = self.rope.char_to_byte(from.min(self.len_chars()));
        let byte_idx = text[from_byte..]
            .find(query)
            .map(|idx| idx + from_byte)
            .or_else(|| text.find(query))?;
        let start = self.rope.byte_to_char(byte_idx);
        Some(start..start + query.chars().count())
    }

    /// Char offset of the start of the line containing `offset`.
    pub fn line_start(&self, offset: usize) -> usize {
        let offset = offset.min(self.len_chars());
        self.rope.line_to_char(self.rope.char_to_line(offset))
    }

    /// Content of the line containing `offset`, without its line break.
    pub fn line_text(&self, offset: usize) -> String {
        let offset = offset.min(self.len_chars());
        let line = self.rope.line(self.rope.char_to_line(offset)).to_string();
        line.trim_end_matches('\n').trim_end_matches('\r').to_string()
    }

    /// Total number of lines in the buffer.
    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    fn validate(&self, op: &EditOperation) -> Result<()> {
        let len = self.len_chars();
        match op {
            EditOperation::Insert { offset, .. } => {
                if *offset > len {
                    return Err(EditorError::out_of_range(*offset, *offset, len));
                }
            }
            EditOperation::Delete {
                offset,
                length,
                deleted_text,
            }
            | EditOperation::Replace {
                offset,
                length,
                old_text: deleted_text,
                ..
            } => {
                let end = offset.saturating_add(*length);
                let Some(current) = self.slice(*offset..end) else {
                    return Err(EditorError::out_of_range(*offset, end, len));
                };
                if current != *deleted_text {
                    return Err(EditorError::text_mismatch(*offset));
                }
            }
        }
        Ok(())
    }

    fn refresh_dirty(&mut self) {
        self.dirty =
            self.rope.len_bytes() != self.saved.len() || self.rope != self.saved.as_str();
    }
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Debug for TextBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextBuffer")
            .field(
                "rope",
                &format_args!("Rope({} chars)", self.rope.len_chars()),
            )
            .field("cursor", &self.cursor)
            .field("anchor", &self.anchor)
            .field("dirty", &self.dirty)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // --- Construction and basic queries ---

    #[test]
    fn test_empty_buffer_has_one_line() {
        let buf = TextBuffer::empty();
        assert_eq!(buf.line_count(), 1);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_from_text_preserves_content() {
        let buf = TextBuffer::from_text("hello\nworld");
        assert_eq!(buf.current_text(), "hello\nworld");
        assert_eq!(buf.line_count(), 2);
    }

    #[test]
    fn test_new_buffer_is_clean() {
        let buf = TextBuffer::from_text("hello");
        assert!(!buf.is_dirty());
    }

    // --- Insert ---

    #[test]
    fn test_insert_at_end() {
        let mut buf = TextBuffer::from_text("abc");
        buf.apply(&EditOperation::insert(3, "X")).unwrap();
        assert_eq!(buf.current_text(), "abcX");
        assert_eq!(buf.cursor(), 4);
    }

    #[test]
    fn test_insert_in_middle() {
        let mut buf = TextBuffer::from_text("abc");
        buf.apply(&EditOperation::insert(1, "X")).unwrap();
        assert_eq!(buf.current_text(), "aXbc");
    }

    #[test]
    fn test_insert_counts_chars_not_bytes() {
        let mut buf = TextBuffer::from_text("café");
        buf.apply(&EditOperation::insert(4, "!")).unwrap();
        assert_eq!(buf.current_text(), "café!");
    }

    #[test]
    fn test_insert_past_end_is_rejected() {
        let mut buf = TextBuffer::from_text("abc");
        let err = buf.apply(&EditOperation::insert(4, "X")).unwrap_err();
        assert!(matches!(err, EditorError::InvalidOperation { offset: 4, .. }));
        assert_eq!(buf.current_text(), "abc");
        assert!(!buf.is_dirty());
    }

    // --- Delete / Replace ---

    #[test]
    fn test_delete_op_captures_text() {
        let buf = TextBuffer::from_text("hello world");
        let op = buf.delete_op(5, 6).unwrap();
        assert_eq!(
            op,
            EditOperation::Delete {
                offset: 5,
                length: 6,
                deleted_text: " world".to_string(),
            }
        );
    }

    #[test]
    fn test_delete_removes_range() {
        let mut buf = TextBuffer::from_text("hello world");
        let op = buf.delete_op(5, 6).unwrap();
        buf.apply(&op).unwrap();
        assert_eq!(buf.current_text(), "hello");
        assert_eq!(buf.cursor(), 5);
    }

    #[test]
    fn test_delete_out_of_range_is_rejected() {
        let buf = TextBuffer::from_text("abc");
        assert!(buf.delete_op(2, 5).is_err());
    }

    #[test]
    fn test_delete_with_stale_text_is_rejected() {
        let mut buf = TextBuffer::from_text("abc");
        let op = EditOperation::Delete {
            offset: 0,
            length: 1,
            deleted_text: "z".to_string(),
        };
        assert!(buf.apply(&op).is_err());
        assert_eq!(buf.current_text(), "abc");
    }

    #[test]
    fn test_replace_swaps_text() {
        let mut buf = TextBuffer::from_text("hello world");
        let op = buf.replace_op(6, 5, "there").unwrap();
        buf.apply(&op).unwrap();
        assert_eq!(buf.current_text(), "hello there");
        assert_eq!(buf.cursor(), 11);
    }

    // --- Inversion ---

    #[test]
    fn test_invert_insert_restores_text() {
        let mut buf = TextBuffer::from_text("abc");
        let op = EditOperation::insert(1, "XY");
        buf.apply(&op).unwrap();
        buf.apply(&buf.invert(&op)).unwrap();
        assert_eq!(buf.current_text(), "abc");
    }

    #[test]
    fn test_invert_replace_restores_text() {
        let mut buf = TextBuffer::from_text("one two");
        let op = buf.replace_op(4, 3, "three").unwrap();
        buf.apply(&op).unwrap();
        buf.apply(&op.inverted()).unwrap();
        assert_eq!(buf.current_text(), "one two");
    }

    #[test]
    fn test_apply_all_rolls_back_on_failure() {
        let mut buf = TextBuffer::from_text("abc");
        let ops = vec![EditOperation::insert(0, "X"), EditOperation::insert(99, "Y")];
        assert!(buf.apply_all(&ops).is_err());
        assert_eq!(buf.current_text(), "abc");
    }

    // --- Dirty tracking ---

    #[test]
    fn test_insert_marks_dirty() {
        let mut buf = TextBuffer::from_text("hello");
        buf.apply(&EditOperation::insert(5, "!")).unwrap();
        assert!(buf.is_dirty());
    }

    #[test]
    fn test_returning_to_saved_text_is_clean() {
        let mut buf = TextBuffer::from_text("hello");
        let op = EditOperation::insert(5, "!");
        buf.apply(&op).unwrap();
        buf.apply(&op.inverted()).unwrap();
        assert!(!buf.is_dirty());
    }

    #[test]
    fn test_mark_saved_resets_dirty() {
        let mut buf = TextBuffer::from_text("hello");
        buf.apply(&EditOperation::insert(0, "> ")).unwrap();
        buf.mark_saved();
        assert!(!buf.is_dirty());
        buf.apply(&buf.delete_op(0, 2).unwrap()).unwrap();
        assert!(buf.is_dirty(), "original text now differs from saved");
    }

    // --- Cursor and selection ---

    #[test]
    fn test_set_cursor_clamps() {
        let mut buf = TextBuffer::from_text("abc");
        buf.set_cursor(100);
        assert_eq!(buf.cursor(), 3);
    }

    #[test]
    fn test_selection_is_normalized() {
        let mut buf = TextBuffer::from_text("hello world");
        buf.select(5..0);
        assert_eq!(buf.selection(), Some(0..5));
    }

    #[test]
    fn test_empty_selection_is_none() {
        let mut buf = TextBuffer::from_text("hello");
        buf.select(2..2);
        assert_eq!(buf.selection(), None);
    }

    #[test]
    fn test_apply_clears_selection() {
        let mut buf = TextBuffer::from_text("hello");
        buf.select(0..5);
        buf.apply(&EditOperation::insert(5, "!")).unwrap();
        assert_eq!(buf.selection(), None);
    }

    // --- Lines and search ---

    #[test]
    fn test_line_start_and_text() {
        let buf = TextBuffer::from_text("first\nsecond line\nthird");
        assert_eq!(buf.line_start(9), 6);
        assert_eq!(buf.line_text(9), "second line");
    }

    #[test]
    fn test_find_wraps_around() {
        let buf = TextBuffer::from_text("alpha beta alpha");
        assert_eq!(buf.find("alpha", 1), Some(11..16));
        assert_eq!(buf.find("alpha", 12), Some(0..5));
        assert_eq!(buf.find("gamma", 0), None);
    }

    #[test]
    fn test_find_reports_char_offsets() {
        let buf = TextBuffer::from_text("é é target");
        assert_eq!(buf.find("target", 0), Some(4..10));
    }

    #[test]
    fn test_typed_char_only_for_single_non_newline_insert() {
        assert_eq!(EditOperation::insert(0, "a").typed_char(), Some('a'));
        assert_eq!(EditOperation::insert(0, "\n").typed_char(), None);
        assert_eq!(EditOperation::insert(0, "ab").typed_char(), None);
    }
}
