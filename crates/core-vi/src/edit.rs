//! Text edits on spans of a surface: delete, yank, case mapping, shifting,
//! joining, pasting and character replacement.

use core_surface::{EditorSurface, Position, Selection, SelectionKind};
use core_text::grapheme;
use smallvec::SmallVec;
use tracing::trace;

use crate::motion::first_non_blank;

/// Indentation added or removed by `>` and `<`.
pub const SHIFT_WIDTH: usize = 4;

/// Region an operator acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Span {
    /// `[start, end)`; an `end` past its line's last byte includes the newline.
    Chars { start: Position, end: Position },
    /// Whole lines `first..=last`.
    Lines { first: usize, last: usize },
    /// Visual columns `left..=right` on lines `first..=last`.
    Block {
        first: usize,
        last: usize,
        left: usize,
        right: usize,
    },
}

/// One contiguous piece of a line: `(line, start_byte, end_byte)`.
type Segment = (usize, usize, usize);

fn line(surface: &dyn EditorSurface, idx: usize) -> String {
    surface.line(idx).unwrap_or_default()
}

impl Span {
    /// Span covered by a visual selection (the character under the head is
    /// included).
    pub fn from_selection(surface: &dyn EditorSurface, selection: &Selection) -> Span {
        let (start, end) = selection.ordered();
        match selection.kind {
            SelectionKind::Characterwise => {
                let content = line(surface, end.line);
                let end = if end.byte >= content.len() {
                    Position::new(end.line, content.len() + 1)
                } else {
                    Position::new(end.line, grapheme::next_boundary(&content, end.byte))
                };
                Span::Chars { start, end }
            }
            SelectionKind::Linewise => Span::Lines {
                first: start.line,
                last: end.line,
            },
            SelectionKind::Blockwise => {
                let a = grapheme::visual_col(&line(surface, selection.anchor.line), selection.anchor.byte);
                let h = grapheme::visual_col(&line(surface, selection.head.line), selection.head.byte);
                Span::Block {
                    first: start.line,
                    last: end.line,
                    left: a.min(h),
                    right: a.max(h),
                }
            }
        }
    }

    /// Where the cursor goes after the span is consumed.
    pub fn start(&self, surface: &dyn EditorSurface) -> Position {
        match *self {
            Span::Chars { start, .. } => start,
            Span::Lines { first, .. } => Position::new(first, first_non_blank(surface, first)),
            Span::Block { first, left, .. } => {
                Position::new(first, grapheme::byte_at_col(&line(surface, first), left))
            }
        }
    }

    pub fn lines(&self) -> (usize, usize) {
        match *self {
            Span::Chars { start, end } => (start.line, end.line),
            Span::Lines { first, last } | Span::Block { first, last, .. } => (first, last),
        }
    }

    pub fn is_linewise(&self) -> bool {
        matches!(self, Span::Lines { .. })
    }
}

fn segments(surface: &dyn EditorSurface, span: &Span) -> SmallVec<[Segment; 8]> {
    let mut out = SmallVec::new();
    match *span {
        Span::Chars { start, end } => {
            for idx in start.line..=end.line {
                let len = surface.line_len(idx);
                let s = if idx == start.line { start.byte.min(len) } else { 0 };
                let e = if idx == end.line { end.byte.min(len) } else { len };
                out.push((idx, s, e.max(s)));
            }
        }
        Span::Lines { first, last } => {
            for idx in first..=last {
                out.push((idx, 0, surface.line_len(idx)));
            }
        }
        Span::Block {
            first,
            last,
            left,
            right,
        } => {
            for idx in first..=last {
                let content = line(surface, idx);
                let s = grapheme::byte_at_col(&content, left);
                let e = grapheme::byte_at_col(&content, right + 1);
                out.push((idx, s, e.max(s)));
            }
        }
    }
    out
}

/// Text covered by `span` in register form: linewise text ends with `\n`,
/// block rows are joined with `\n`.
pub fn text(surface: &dyn EditorSurface, span: &Span) -> String {
    match *span {
        Span::Lines { first, last } => (first..=last)
            .map(|idx| format!("{}\n", line(surface, idx)))
            .collect(),
        Span::Block { .. } => segments(surface, span)
            .iter()
            .map(|&(idx, s, e)| line(surface, idx)[s..e].to_string())
            .collect::<Vec<_>>()
            .join("\n"),
        Span::Chars { end, .. } => {
            let mut out = segments(surface, span)
                .iter()
                .map(|&(idx, s, e)| line(surface, idx)[s..e].to_string())
                .collect::<Vec<_>>()
                .join("\n");
            if end.byte > surface.line_len(end.line) && end.line + 1 < surface.line_count() {
                out.push('\n');
            }
            out
        }
    }
}

/// Remove `span`; returns the removed text in register form.
pub fn delete(surface: &mut dyn EditorSurface, span: &Span) -> String {
    let removed = text(surface, span);
    match *span {
        Span::Chars { start, end } => {
            surface.delete(start, end);
        }
        Span::Lines { first, last } => {
            let final_line = surface.line_count().saturating_sub(1);
            if last < final_line {
                surface.delete(Position::new(first, 0), Position::new(last, usize::MAX));
            } else if first > 0 {
                let prev_len = surface.line_len(first - 1);
                surface.delete(
                    Position::new(first - 1, prev_len),
                    Position::new(last, surface.line_len(last)),
                );
            } else {
                surface.delete(Position::origin(), Position::new(last, surface.line_len(last)));
            }
        }
        Span::Block { .. } => {
            for &(idx, s, e) in segments(surface, span).iter().rev() {
                if s < e {
                    surface.delete(Position::new(idx, s), Position::new(idx, e));
                }
            }
        }
    }
    trace!(target: "vi.edit", ?span, len = removed.len(), "span_deleted");
    removed
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Case {
    Toggle,
    Lower,
    Upper,
}

fn map_case(text: &str, case: Case) -> String {
    match case {
        Case::Lower => text.to_lowercase(),
        Case::Upper => text.to_uppercase(),
        Case::Toggle => text
            .chars()
            .flat_map(|c| {
                let mapped: Vec<char> = if c.is_uppercase() {
                    c.to_lowercase().collect()
                } else {
                    c.to_uppercase().collect()
                };
                mapped
            })
            .collect(),
    }
}

/// Change the case of every character in `span`.
pub fn change_case(surface: &mut dyn EditorSurface, span: &Span, case: Case) {
    for (idx, s, e) in segments(surface, span) {
        let content = line(surface, idx);
        let piece = &content[s..e];
        let mapped = map_case(piece, case);
        if mapped != piece {
            surface.delete(Position::new(idx, s), Position::new(idx, e));
            surface.insert(Position::new(idx, s), &mapped);
        }
    }
}

/// Shift lines `first..=last` right or left by [`SHIFT_WIDTH`].
pub fn shift(surface: &mut dyn EditorSurface, first: usize, last: usize, right: bool) {
    for idx in first..=last.min(surface.line_count().saturating_sub(1)) {
        let content = line(surface, idx);
        if right {
            if !content.is_empty() {
                surface.insert(Position::new(idx, 0), &" ".repeat(SHIFT_WIDTH));
            }
        } else {
            let remove = if content.starts_with('\t') {
                1
            } else {
                content
                    .bytes()
                    .take(SHIFT_WIDTH)
                    .take_while(|b| *b == b' ')
                    .count()
            };
            if remove > 0 {
                surface.delete(Position::new(idx, 0), Position::new(idx, remove));
            }
        }
    }
}

/// Join lines `first..=last` into one, separated by single spaces.
/// Returns the position of the last join point.
pub fn join(surface: &mut dyn EditorSurface, first: usize, last: usize) -> Position {
    let last = last.min(surface.line_count().saturating_sub(1));
    let mut at = Position::new(first, surface.line_len(first));
    for _ in first..last {
        let len = surface.line_len(first);
        let next = line(surface, first + 1);
        let blanks = next.len() - next.trim_start().len();
        surface.delete(Position::new(first, len), Position::new(first + 1, blanks));
        at = Position::new(first, len);
        let rest = &next[blanks..];
        if len > 0 && !rest.is_empty() && !rest.starts_with(')') {
            surface.insert(at, " ");
        }
    }
    at
}

/// Insert register `text` `count` times relative to `cursor`. Text ending in
/// a newline is pasted linewise. Returns the new cursor.
pub fn paste(
    surface: &mut dyn EditorSurface,
    cursor: Position,
    text: &str,
    after: bool,
    count: usize,
) -> Position {
    let count = count.max(1);
    if let Some(body) = text.strip_suffix('\n') {
        let lines = format!("{body}\n").repeat(count);
        let target = if after { cursor.line + 1 } else { cursor.line };
        if target < surface.line_count() {
            surface.insert(Position::new(target, 0), &lines);
        } else {
            let end = Position::new(cursor.line, surface.line_len(cursor.line));
            let trimmed = lines.strip_suffix('\n').unwrap_or(&lines);
            surface.insert(end, &format!("\n{trimmed}"));
        }
        return Position::new(target, first_non_blank(surface, target));
    }
    let content = line(surface, cursor.line);
    let at = if after && !content.is_empty() {
        Position::new(cursor.line, grapheme::next_boundary(&content, cursor.byte))
    } else {
        cursor
    };
    let end = surface.insert(at, &text.repeat(count));
    let end_line = line(surface, end.line);
    Position::new(end.line, grapheme::prev_boundary(&end_line, end.byte))
}

/// Replace `count` graphemes from `pos` with `with`. Fails (no change) when
/// the line is too short.
pub fn replace_chars(surface: &mut dyn EditorSurface, pos: Position, with: char, count: usize) -> bool {
    let content = line(surface, pos.line);
    let mut end = pos.byte;
    for _ in 0..count.max(1) {
        if end >= content.len() {
            return false;
        }
        end = grapheme::next_boundary(&content, end);
    }
    surface.delete(pos, Position::new(pos.line, end));
    let replacement: String = std::iter::repeat_n(with, count.max(1)).collect();
    surface.insert(pos, &replacement);
    true
}
