//! Rope storage and grapheme helpers behind the in-memory surface.
//!
//! Positions are (line, byte) pairs. Byte offsets produced by [`grapheme`]
//! always land on grapheme cluster boundaries.

use anyhow::Result;
use ropey::Rope;

/// Named text held in a `ropey::Rope`.
#[derive(Clone)]
pub struct Buffer {
    rope: Rope,
    pub name: String,
}

/// (line index, byte offset within the line).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Position {
    pub line: usize,
    pub byte: usize,
}

impl Position {
    pub fn new(line: usize, byte: usize) -> Self {
        Self { line, byte }
    }

    pub fn origin() -> Self {
        Self::default()
    }
}

impl Buffer {
    pub fn from_str(name: impl Into<String>, content: &str) -> Result<Self> {
        Ok(Self {
            rope: Rope::from_str(content),
            name: name.into(),
        })
    }

    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Line `idx` without its terminator.
    pub fn line(&self, idx: usize) -> Option<String> {
        if idx >= self.rope.len_lines() {
            return None;
        }
        let mut line = self.rope.line(idx).to_string();
        if line.ends_with('\n') {
            line.pop();
        }
        Some(line)
    }

    /// Byte length of line `idx`, terminator excluded. Zero past the end.
    pub fn line_len(&self, idx: usize) -> usize {
        if idx >= self.rope.len_lines() {
            return 0;
        }
        let line = self.rope.line(idx);
        let len = line.len_bytes();
        if len > 0 && line.char(line.len_chars() - 1) == '\n' {
            len - 1
        } else {
            len
        }
    }

    /// Pull `pos` back inside the buffer: last line at most, line end at most.
    pub fn clamp(&self, pos: Position) -> Position {
        let line = pos.line.min(self.line_count().saturating_sub(1));
        Position::new(line, pos.byte.min(self.line_len(line)))
    }

    /// Absolute byte offset of `pos` after clamping.
    pub fn offset_of(&self, pos: Position) -> usize {
        let pos = self.clamp(pos);
        self.rope.line_to_byte(pos.line) + pos.byte
    }

    pub fn position_of(&self, offset: usize) -> Position {
        let offset = offset.min(self.rope.len_bytes());
        let line = self.rope.byte_to_line(offset);
        Position::new(line, offset - self.rope.line_to_byte(line))
    }

    /// Insert `text` at `pos`; returns the position right after it.
    pub fn insert(&mut self, pos: Position, text: &str) -> Position {
        let offset = self.offset_of(pos);
        self.rope.insert(self.rope.byte_to_char(offset), text);
        self.position_of(offset + text.len())
    }

    /// Remove the absolute byte range `[start, end)` and return it.
    pub fn remove(&mut self, start: usize, end: usize) -> String {
        let total = self.rope.len_bytes();
        let (start, end) = (start.min(total), end.min(total));
        if start >= end {
            return String::new();
        }
        let range = self.rope.byte_to_char(start)..self.rope.byte_to_char(end);
        let removed = self.rope.slice(range.clone()).to_string();
        self.rope.remove(range);
        removed
    }
}

/// Single-line grapheme and display-width helpers.
pub mod grapheme {
    use unicode_segmentation::UnicodeSegmentation;
    use unicode_width::UnicodeWidthStr;

    pub fn iter(line: &str) -> impl Iterator<Item = &str> {
        line.graphemes(true)
    }

    /// Start of the cluster before `byte`; 0 at the line start.
    pub fn prev_boundary(line: &str, byte: usize) -> usize {
        if byte == 0 || byte > line.len() {
            return 0;
        }
        line.grapheme_indices(true)
            .map(|(idx, _)| idx)
            .take_while(|idx| *idx < byte)
            .last()
            .unwrap_or(0)
    }

    /// Start of the cluster after the one at `byte`; the line length at the end.
    pub fn next_boundary(line: &str, byte: usize) -> usize {
        if byte >= line.len() {
            return line.len();
        }
        line.grapheme_indices(true)
            .map(|(idx, _)| idx)
            .find(|idx| *idx > byte)
            .unwrap_or(line.len())
    }

    /// Byte offset of the cluster covering display column `col`.
    pub fn byte_at_col(line: &str, col: usize) -> usize {
        let mut acc = 0;
        for (idx, g) in line.grapheme_indices(true) {
            if acc >= col {
                return idx;
            }
            acc += g.width().max(1);
        }
        line.len()
    }

    /// Display columns taken by the text before `byte`.
    pub fn visual_col(line: &str, byte: usize) -> usize {
        line.grapheme_indices(true)
            .take_while(|(idx, _)| *idx < byte)
            .map(|(_, g)| g.width().max(1))
            .sum()
    }

    pub fn is_word(g: &str) -> bool {
        g.chars().next().is_some_and(|c| c == '_' || c.is_alphanumeric())
    }

    pub fn is_blank(g: &str) -> bool {
        g.chars().all(char::is_whitespace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_drop_terminators() {
        let b = Buffer::from_str("test", "hello\nworld").unwrap();
        assert_eq!(b.line_count(), 2);
        assert_eq!(b.line(0).as_deref(), Some("hello"));
        assert_eq!(b.line(1).as_deref(), Some("world"));
        assert_eq!(b.line(2), None);
        assert_eq!(b.line_len(0), 5);
        assert_eq!(b.line_len(9), 0);
    }

    #[test]
    fn clamp_limits_line_and_byte() {
        let b = Buffer::from_str("t", "ab\ncde").unwrap();
        assert_eq!(b.clamp(Position::new(7, 9)), Position::new(1, 3));
        assert_eq!(b.clamp(Position::new(0, 9)), Position::new(0, 2));
    }

    #[test]
    fn combining_mark_is_one_cluster() {
        let s = "e\u{301}";
        let nb = grapheme::next_boundary(s, 0);
        assert_eq!(nb, s.len());
        assert_eq!(grapheme::prev_boundary(s, nb), 0);
    }

    #[test]
    fn wide_cluster_columns() {
        let s = "a\u{6f22}b";
        let after_cjk = grapheme::next_boundary(s, 1);
        assert_eq!(grapheme::visual_col(s, after_cjk), 3);
        assert_eq!(grapheme::byte_at_col(s, 3), after_cjk);
    }

    #[test]
    fn insert_spanning_lines() {
        let mut b = Buffer::from_str("t", "abcd").unwrap();
        let end = b.insert(Position::new(0, 2), "X\nY");
        assert_eq!(b.text(), "abX\nYcd");
        assert_eq!(end, Position::new(1, 1));
    }

    #[test]
    fn remove_returns_text() {
        let mut b = Buffer::from_str("t", "hello world").unwrap();
        assert_eq!(b.remove(5, 11), " world");
        assert_eq!(b.text(), "hello");
        assert_eq!(b.remove(4, 2), "");
    }

    #[test]
    fn offsets_map_back_to_positions() {
        let b = Buffer::from_str("t", "ab\ncde\n").unwrap();
        let pos = Position::new(1, 2);
        assert_eq!(b.position_of(b.offset_of(pos)), pos);
    }
}
