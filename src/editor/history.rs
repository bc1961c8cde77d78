use std::collections::VecDeque;
use std::time::{Duration, Instant};

use super::buffer::{EditOperation, TextBuffer};
use crate::error::Result;

/// One user-visible action: a keystroke run, a paste, a formatting command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    ops: Vec<EditOperation>,
    /// Last time a typed character was merged into this entry.
    touched_at: Option<Instant>,
}

impl HistoryEntry {
    /// An entry made of a single operation.
    pub fn single(op: EditOperation) -> Self {
        Self {
            ops: vec![op],
            touched_at: None,
        }
    }

    /// An entry made of several operations applied in order.
    pub fn batch(ops: Vec<EditOperation>) -> Self {
        Self {
            ops,
            touched_at: None,
        }
    }

    /// Operations in application order.
    pub fn ops(&self) -> &[EditOperation] {
        &self.ops
    }

    /// Whether `next` continues the typing run this entry ends with.
    fn continues_typing(&self, next: &EditOperation) -> bool {
        let Some(last) = self.ops.last() else {
            return false;
        };
        let Some(prev_ch) = last.typed_char() else {
            return false;
        };
        let Some(ch) = next.typed_char() else {
            return false;
        };
        // A space ends the word being typed; the next word starts a new step.
        let word_break = prev_ch.is_whitespace() && !ch.is_whitespace();
        !word_break && next.offset() == last.end_offset()
    }
}

/// Linear undo/redo history.
///
/// Recording an entry clears the redo stack; only [`HistoryStack::undo`]
/// ever pushes onto it.
#[derive(Debug, Clone)]
pub struct HistoryStack {
    undo_stack: VecDeque<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
    coalesce_window: Duration,
    max_depth: usize,
    /// Cleared by cursor jumps and mode changes so the next keystroke starts
    /// a fresh entry.
    coalescing_open: bool,
}

impl HistoryStack {
    pub const DEFAULT_MAX_DEPTH: usize = 1000;

    /// Create an empty history merging keystrokes typed within `coalesce_window`.
    pub fn new(coalesce_window: Duration) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            coalesce_window,
            max_depth: Self::DEFAULT_MAX_DEPTH,
            coalescing_open: false,
        }
    }

    /// Cap the number of undo steps kept; the oldest are dropped first.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Number of undo steps available.
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Forget all history (e.g. after loading a different document).
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.coalescing_open = false;
    }

    /// End the current typing run so the next keystroke is its own step.
    pub const fn seal(&mut self) {
        self.coalescing_open = false;
    }

    /// Push an already-applied entry. Clears the redo stack.
    pub fn record(&mut self, entry: HistoryEntry) {
        self.record_at(entry, Instant::now());
    }

    /// Like [`HistoryStack::record`] with an explicit timestamp for the
    /// coalescing window.
    pub fn record_at(&mut self, entry: HistoryEntry, now: Instant) {
        self.redo_stack.clear();
        let typed = entry.ops.len() == 1 && entry.ops[0].typed_char().is_some();

        if typed && self.coalescing_open {
            if let Some(top) = self.undo_stack.back_mut() {
                let within_window = top
                    .touched_at
                    .is_some_and(|at| now.saturating_duration_since(at) <= self.coalesce_window);
                if within_window && top.continues_typing(&entry.ops[0]) {
                    top.ops.extend(entry.ops);
                    top.touched_at = Some(now);
                    return;
                }
            }
        }

        let mut entry = entry;
        entry.touched_at = typed.then_some(now);
        self.coalescing_open = typed;
        self.undo_stack.push_back(entry);
        while self.undo_stack.len() > self.max_depth {
            self.undo_stack.pop_front();
        }
    }

    /// Undo the most recent entry against `buffer`.
    ///
    /// Returns the inverse operations that were applied, or `None` when there
    /// is nothing to undo.
    ///
    /// # Errors
    /// Fails only if the buffer was mutated outside the history; the entry
    /// is put back and the buffer left unchanged.
    pub fn undo(&mut self, buffer: &mut TextBuffer) -> Result<Option<Vec<EditOperation>>> {
        let Some(entry) = self.undo_stack.pop_back() else {
            return Ok(None);
        };
        let inverse: Vec<EditOperation> =
            entry.ops.iter().rev().map(EditOperation::inverted).collect();
        if let Err(err) = buffer.apply_all(&inverse) {
            self.undo_stack.push_back(entry);
            return Err(err);
        }
        self.coalescing_open = false;
        self.redo_stack.push(HistoryEntry {
            touched_at: None,
            ..entry
        });
        Ok(Some(inverse))
    }

    /// Re-apply the most recently undone entry.
    ///
    /// # Errors
    /// Same conditions as [`HistoryStack::undo`].
    pub fn redo(&mut self, buffer: &mut TextBuffer) -> Result<Option<Vec<EditOperation>>> {
        let Some(entry) = self.redo_stack.pop() else {
            return Ok(None);
        };
        if let Err(err) = buffer.apply_all(&entry.ops) {
            self.redo_stack.push(entry);
            return Err(err);
        }
        let applied = entry.ops.clone();
        self.coalescing_open = false;
        self.undo_stack.push_back(entry);
        Ok(Some(applied))
    }
}

impl Default for HistoryStack {
    fn default() -> Self {
        Self::new(Duration::from_millis(1000))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_str(
        buf: &mut TextBuffer,
        history: &mut HistoryStack,
        text: &str,
        start: Instant,
    ) {
        for (idx, ch) in text.chars().enumerate() {
            let op = EditOperation::insert(buf.cursor(), ch.to_string());
            buf.apply(&op).unwrap();
            history.record_at(HistoryEntry::single(op), start + Duration::from_millis(idx as u64));
        }
    }

    #[test]
    fn test_undo_on_empty_history_is_noop() {
        let mut buf = TextBuffer::from_text("abc");
        let mut history = HistoryStack::default();
        assert_eq!(history.undo(&mut buf).unwrap(), None);
        assert_eq!(history.redo(&mut buf).unwrap(), None);
        assert_eq!(buf.current_text(), "abc");
    }

    #[test]
    fn test_insert_undo_redo() {
        let mut buf = TextBuffer::from_text("abc");
        let mut history = HistoryStack::default();
        let op = EditOperation::insert(1, "X");
        buf.apply(&op).unwrap();
        history.record(HistoryEntry::single(op));

        let inverse = history.undo(&mut buf).unwrap().unwrap();
        assert_eq!(buf.current_text(), "abc");
        assert!(matches!(inverse[0], EditOperation::Delete { offset: 1, .. }));

        history.redo(&mut buf).unwrap();
        assert_eq!(buf.current_text(), "aXbc");
    }

    #[test]
    fn test_record_clears_redo() {
        let mut buf = TextBuffer::from_text("");
        let mut history = HistoryStack::default();
        let op = EditOperation::insert(0, "one");
        buf.apply(&op).unwrap();
        history.record(HistoryEntry::single(op));
        history.undo(&mut buf).unwrap();
        assert!(history.can_redo());

        let op = EditOperation::insert(0, "two");
        buf.apply(&op).unwrap();
        history.record(HistoryEntry::single(op));
        assert!(!history.can_redo());
    }

    #[test]
    fn test_batch_entry_undoes_in_reverse_order() {
        let mut buf = TextBuffer::from_text("word");
        let mut history = HistoryStack::default();
        let ops = vec![EditOperation::insert(0, "**"), EditOperation::insert(6, "**")];
        buf.apply_all(&ops).unwrap();
        assert_eq!(buf.current_text(), "**word**");
        history.record(HistoryEntry::batch(ops));

        history.undo(&mut buf).unwrap();
        assert_eq!(buf.current_text(), "word");
    }

    #[test]
    fn test_typed_word_coalesces_into_one_step() {
        let mut buf = TextBuffer::empty();
        let mut history = HistoryStack::default();
        type_str(&mut buf, &mut history, "hello", Instant::now());
        assert_eq!(history.undo_depth(), 1);

        history.undo(&mut buf).unwrap();
        assert_eq!(buf.current_text(), "");
    }

    #[test]
    fn test_seal_breaks_typing_run() {
        let mut buf = TextBuffer::empty();
        let mut history = HistoryStack::default();
        let start = Instant::now();
        type_str(&mut buf, &mut history, "ab", start);
        history.seal();
        type_str(&mut buf, &mut history, "cd", start + Duration::from_millis(5));
        assert_eq!(history.undo_depth(), 2);

        history.undo(&mut buf).unwrap();
        assert_eq!(buf.current_text(), "ab");
    }

    #[test]
    fn test_pause_longer_than_window_starts_new_step() {
        let mut buf = TextBuffer::empty();
        let mut history = HistoryStack::new(Duration::from_millis(100));
        let start = Instant::now();
        type_str(&mut buf, &mut history, "ab", start);
        type_str(&mut buf, &mut history, "cd", start + Duration::from_millis(500));
        assert_eq!(history.undo_depth(), 2);
    }

    #[test]
    fn test_non_contiguous_insert_starts_new_step() {
        let mut buf = TextBuffer::from_text("xxxx");
        let mut history = HistoryStack::default();
        let now = Instant::now();
        for (offset, ch) in [(0, "a"), (3, "b")] {
            let op = EditOperation::insert(offset, ch);
            buf.apply(&op).unwrap();
            history.record_at(HistoryEntry::single(op), now);
        }
        assert_eq!(history.undo_depth(), 2);
    }

    #[test]
    fn test_newline_and_paste_are_separate_steps() {
        let mut buf = TextBuffer::empty();
        let mut history = HistoryStack::default();
        let now = Instant::now();
        type_str(&mut buf, &mut history, "ab", now);
        for text in ["\n", "pasted text"] {
            let op = EditOperation::insert(buf.cursor(), text);
            buf.apply(&op).unwrap();
            history.record_at(HistoryEntry::single(op), now);
        }
        assert_eq!(history.undo_depth(), 3);
    }

    #[test]
    fn test_space_then_word_splits_steps() {
        let mut buf = TextBuffer::empty();
        let mut history = HistoryStack::default();
        type_str(&mut buf, &mut history, "hi there", Instant::now());
        assert_eq!(history.undo_depth(), 2);
        history.undo(&mut buf).unwrap();
        assert_eq!(buf.current_text(), "hi ");
    }

    #[test]
    fn test_max_depth_drops_oldest() {
        let mut buf = TextBuffer::empty();
        let mut history = HistoryStack::default().with_max_depth(2);
        for text in ["one ", "two ", "three "] {
            let op = EditOperation::insert(buf.cursor(), text);
            buf.apply(&op).unwrap();
            history.record(HistoryEntry::single(op));
        }
        assert_eq!(history.undo_depth(), 2);
        history.undo(&mut buf).unwrap();
        history.undo(&mut buf).unwrap();
        assert_eq!(history.undo(&mut buf).unwrap(), None);
        assert_eq!(buf.current_text(), "one ");
    }

    #[test]
    fn test_failed_undo_keeps_entry() {
        let mut buf = TextBuffer::from_text("abc");
        let mut history = HistoryStack::default();
        let op = EditOperation::insert(3, "X");
        buf.apply(&op).unwrap();
        history.record(HistoryEntry::single(op));

        // Mutate behind the history's back so the inverse no longer matches.
        let mut other = TextBuffer::from_text("abc");
        assert!(history.undo(&mut other).is_err());
        assert!(history.can_undo());
        assert_eq!(other.current_text(), "abc");
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn arb_step() -> impl Strategy<Value = (bool, usize, usize, String)> {
            (any::<bool>(), 0..64usize, 0..8usize, "[a-zé \n#*]{0,6}")
        }

        proptest! {
            #[test]
            fn undo_all_restores_original(
                original in "[a-z \n]{0,40}",
                steps in proptest::collection::vec(arb_step(), 0..20),
            ) {
                let mut buf = TextBuffer::from_text(&original);
                let mut history = HistoryStack::new(Duration::ZERO);
                let mut recorded = 0usize;
                for (insert, pos, len, text) in steps {
                    let offset = pos % (buf.len_chars() + 1);
                    let op = if insert || buf.is_empty() {
                        EditOperation::insert(offset, text)
                    } else {
                        let length = len.min(buf.len_chars() - offset);
                        buf.replace_op(offset, length, text).unwrap()
                    };
                    buf.apply(&op).unwrap();
                    history.seal();
                    history.record(HistoryEntry::single(op));
                    recorded += 1;
                }
                for _ in 0..recorded {
                    history.undo(&mut buf).unwrap();
                }
                prop_assert_eq!(buf.current_text(), original);
                prop_assert!(!buf.is_dirty());
            }

            #[test]
            fn redo_all_restores_final(
                original in "[a-z]{0,20}",
                inserts in proptest::collection::vec((0..32usize, "[a-z]{1,4}"), 1..10),
            ) {
                let mut buf = TextBuffer::from_text(&original);
                let mut history = HistoryStack::new(Duration::ZERO);
                for (pos, text) in &inserts {
                    let op = EditOperation::insert(pos % (buf.len_chars() + 1), text.clone());
                    buf.apply(&op).unwrap();
                    history.seal();
                    history.record(HistoryEntry::single(op));
                }
                let edited = buf.current_text();
                while history.undo(&mut buf).unwrap().is_some() {}
                while history.redo(&mut buf).unwrap().is_some() {}
                prop_assert_eq!(buf.current_text(), edited);
            }
        }
    }
}
