//! Editor-surface interface.
//!
//! The pipeline never talks to a concrete editor. It consumes the narrow
//! [`EditorView`] trait: cursor and line queries, range reads, and the two
//! mutations a commit needs. [`ScratchBuffer`] is a ropey-backed in-memory
//! implementation used by the demo binary and the tests.

use std::path::{Path, PathBuf};

use ropey::Rope;

use crate::language::CharClass;

/// Identity of one editor view. Two views over the same file are distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewId(pub u64);

/// A low-level editing event emitted by the editor surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditEvent {
    /// A single character was inserted (`Some`) or deleted (`None`) at the
    /// cursor.
    CharModified(Option<char>),
    /// The cursor moved to `offset`. `from_edit` is true when the move was
    /// itself caused by a character edit.
    PosChanged { offset: usize, from_edit: bool },
}

/// The slice of editor functionality the completion pipeline depends on.
///
/// All offsets are absolute character offsets.
pub trait EditorView {
    /// Identity of this view.
    fn view_id(&self) -> ViewId;

    /// Current cursor offset.
    fn cursor(&self) -> usize;

    /// Moves the cursor.
    fn set_cursor(&mut self, offset: usize);

    /// Total character count.
    fn len_chars(&self) -> usize;

    /// Line number (0-indexed) containing `offset`.
    fn line_of(&self, offset: usize) -> usize;

    /// Offset of the first character of `line`.
    fn line_start(&self, line: usize) -> usize;

    /// Reads the text in `[start, end)`. Out-of-range bounds are clamped.
    fn text_range(&self, start: usize, end: usize) -> String;

    /// Full buffer contents.
    fn text(&self) -> String;

    /// Inserts `text` at `offset`.
    fn insert(&mut self, offset: usize, text: &str);

    /// Deletes `[start, end)`.
    fn delete(&mut self, start: usize, end: usize);

    /// File backing this view, if any.
    fn path(&self) -> Option<&Path>;

    /// Declared language id (e.g. "rust").
    fn language_id(&self) -> &str;
}

/// Text of the cursor's line from line start up to `offset`.
pub fn line_text_before(view: &dyn EditorView, offset: usize) -> String {
    let start = view.line_start(view.line_of(offset));
    view.text_range(start, offset)
}

/// The character immediately before `offset`, if any.
pub fn char_before(view: &dyn EditorView, offset: usize) -> Option<char> {
    if offset == 0 {
        return None;
    }
    view.text_range(offset - 1, offset).chars().next()
}

/// The word (per `class`) ending at `offset`, scanning backwards.
pub fn word_before(view: &dyn EditorView, offset: usize, class: &CharClass) -> String {
    let mut start = offset.min(view.len_chars());
    while start > 0 {
        let Some(ch) = view.text_range(start - 1, start).chars().next() else {
            break;
        };
        if class.contains(ch) {
            start -= 1;
        } else {
            break;
        }
    }
    view.text_range(start, offset)
}

/// The span of the word (per `class`) surrounding `offset`, scanning in both
/// directions. Returns `(start, end)`; empty when the cursor is not in a word.
pub fn word_span(view: &dyn EditorView, offset: usize, class: &CharClass) -> (usize, usize) {
    let len = view.len_chars();
    let mut start = offset.min(len);
    while start > 0 {
        let Some(ch) = view.text_range(start - 1, start).chars().next() else {
            break;
        };
        if class.contains(ch) {
            start -= 1;
        } else {
            break;
        }
    }
    let mut end = offset.min(len);
    while end < len {
        let Some(ch) = view.text_range(end, end + 1).chars().next() else {
            break;
        };
        if class.contains(ch) {
            end += 1;
        } else {
            break;
        }
    }
    (start, end)
}

/// In-memory editor view backed by a rope.
///
/// Test double and demo-binary surface; real hosts supply their own
/// [`EditorView`].
pub struct ScratchBuffer {
    view: ViewId,
    rope: Rope,
    cursor: usize,
    path: Option<PathBuf>,
    language: String,
}

impl ScratchBuffer {
    /// Creates an empty scratch buffer for `language`.
    #[must_use]
    pub fn new(view: ViewId, language: impl Into<String>) -> Self {
        Self {
            view,
            rope: Rope::new(),
            cursor: 0,
            path: None,
            language: language.into(),
        }
    }

    /// Creates a scratch buffer with initial contents, cursor at the end.
    #[must_use]
    pub fn from_text(view: ViewId, language: impl Into<String>, text: &str) -> Self {
        let rope = Rope::from_str(text);
        let cursor = rope.len_chars();
        Self {
            view,
            rope,
            cursor,
            path: None,
            language: language.into(),
        }
    }

    /// Associates a file path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Inserts a character at the cursor and advances it, as a keystroke
    /// would.
    pub fn type_char(&mut self, ch: char) {
        let cursor = self.cursor;
        self.insert(cursor, &ch.to_string());
        self.cursor = cursor + 1;
    }

    /// Deletes the character before the cursor, as backspace would.
    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            let cursor = self.cursor;
            self.delete(cursor - 1, cursor);
            self.cursor = cursor - 1;
        }
    }
}

impl EditorView for ScratchBuffer {
    fn view_id(&self) -> ViewId {
        self.view
    }

    fn cursor(&self) -> usize {
        self.cursor
    }

    fn set_cursor(&mut self, offset: usize) {
        self.cursor = offset.min(self.rope.len_chars());
    }

    fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    fn line_of(&self, offset: usize) -> usize {
        self.rope.char_to_line(offset.min(self.rope.len_chars()))
    }

    fn line_start(&self, line: usize) -> usize {
        let line = line.min(self.rope.len_lines().saturating_sub(1));
        self.rope.line_to_char(line)
    }

    fn text_range(&self, start: usize, end: usize) -> String {
        let len = self.rope.len_chars();
        let start = start.min(len);
        let end = end.min(len);
        if start >= end {
            return String::new();
        }
        self.rope.slice(start..end).to_string()
    }

    fn text(&self) -> String {
        self.rope.to_string()
    }

    fn insert(&mut self, offset: usize, text: &str) {
        let offset = offset.min(self.rope.len_chars());
        self.rope.insert(offset, text);
    }

    fn delete(&mut self, start: usize, end: usize) {
        let len = self.rope.len_chars();
        let start = start.min(len);
        let end = end.min(len);
        if start < end {
            self.rope.remove(start..end);
        }
    }

    fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn language_id(&self) -> &str {
        &self.language
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn word_class() -> CharClass {
        CharClass::word("_")
    }

    #[test]
    fn test_scratch_buffer_type_and_backspace() {
        let mut buf = ScratchBuffer::new(ViewId(1), "rust");
        buf.type_char('f');
        buf.type_char('o');
        buf.type_char('o');
        assert_eq!(buf.text(), "foo");
        assert_eq!(buf.cursor(), 3);

        buf.backspace();
        assert_eq!(buf.text(), "fo");
        assert_eq!(buf.cursor(), 2);
    }

    #[test]
    fn test_text_range_clamps_bounds() {
        let buf = ScratchBuffer::from_text(ViewId(1), "rust", "hello");
        assert_eq!(buf.text_range(0, 100), "hello");
        assert_eq!(buf.text_range(3, 2), "");
        assert_eq!(buf.text_range(50, 60), "");
    }

    #[test]
    fn test_line_queries() {
        let buf = ScratchBuffer::from_text(ViewId(1), "rust", "one\ntwo\nthree");
        assert_eq!(buf.line_of(0), 0);
        assert_eq!(buf.line_of(4), 1);
        assert_eq!(buf.line_start(1), 4);
        assert_eq!(buf.line_start(2), 8);
    }

    #[test]
    fn test_line_text_before() {
        let mut buf = ScratchBuffer::from_text(ViewId(1), "rust", "fn main\nlet fo");
        buf.set_cursor(14);
        assert_eq!(line_text_before(&buf, 14), "let fo");
    }

    #[test]
    fn test_char_before() {
        let buf = ScratchBuffer::from_text(ViewId(1), "rust", "ab");
        assert_eq!(char_before(&buf, 0), None);
        assert_eq!(char_before(&buf, 1), Some('a'));
        assert_eq!(char_before(&buf, 2), Some('b'));
    }

    #[test]
    fn test_word_before_stops_at_non_word() {
        let buf = ScratchBuffer::from_text(ViewId(1), "rust", "let foo_bar");
        assert_eq!(word_before(&buf, 11, &word_class()), "foo_bar");
        assert_eq!(word_before(&buf, 3, &word_class()), "let");
        assert_eq!(word_before(&buf, 4, &word_class()), "");
    }

    #[test]
    fn test_word_span_covers_both_sides() {
        let mut buf = ScratchBuffer::from_text(ViewId(1), "rust", "let foobar;");
        buf.set_cursor(7);
        assert_eq!(word_span(&buf, 7, &word_class()), (4, 10));
        assert_eq!(word_span(&buf, 11, &word_class()), (11, 11));
    }

    #[test]
    fn test_insert_delete_roundtrip() {
        let mut buf = ScratchBuffer::from_text(ViewId(1), "rust", "fo");
        buf.delete(0, 2);
        buf.insert(0, "foobar");
        assert_eq!(buf.text(), "foobar");
    }
}
