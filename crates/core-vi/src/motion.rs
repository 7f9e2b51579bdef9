//! Cursor motions over an editor surface.
//!
//! Motions are pure: they read the surface and return the target position.
//! Horizontal motions stay on the current line. Positions past the last
//! grapheme are allowed so operator ranges can reach the line end; use
//! [`normalize`] before resting the Normal-mode cursor.

use core_surface::{EditorSurface, Position};
use core_text::grapheme;

use crate::parser::Motion;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Class {
    Blank,
    Word,
    Punct,
}

fn class_of(g: &str) -> Class {
    if grapheme::is_blank(g) {
        Class::Blank
    } else if grapheme::is_word(g) {
        Class::Word
    } else {
        Class::Punct
    }
}

fn line(surface: &dyn EditorSurface, idx: usize) -> String {
    surface.line(idx).unwrap_or_default()
}

/// Rest the cursor on a real character: a position at or past the end of a
/// non-empty line moves to the start of its last grapheme.
pub fn normalize(surface: &dyn EditorSurface, pos: Position) -> Position {
    let last = surface.line_count().saturating_sub(1);
    let line_idx = pos.line.min(last);
    let content = line(surface, line_idx);
    let byte = if content.is_empty() {
        0
    } else if pos.byte >= content.len() {
        grapheme::prev_boundary(&content, content.len())
    } else {
        pos.byte
    };
    Position::new(line_idx, byte)
}

/// First non-blank byte of a line.
pub fn first_non_blank(surface: &dyn EditorSurface, idx: usize) -> usize {
    let content = line(surface, idx);
    content
        .find(|c: char| !c.is_whitespace())
        .unwrap_or(content.len())
}

/// Target of `motion` applied `count` times from `pos`. `explicit` tells
/// `G`/`gg` whether the count names a line.
pub fn apply(
    surface: &dyn EditorSurface,
    pos: Position,
    motion: Motion,
    count: usize,
    explicit: bool,
) -> Position {
    let count = count.max(1);
    let last_line = surface.line_count().saturating_sub(1);
    match motion {
        Motion::Left => {
            let content = line(surface, pos.line);
            let mut byte = pos.byte.min(content.len());
            for _ in 0..count {
                byte = grapheme::prev_boundary(&content, byte);
            }
            Position::new(pos.line, byte)
        }
        Motion::Right => {
            let content = line(surface, pos.line);
            let mut byte = pos.byte;
            for _ in 0..count {
                byte = grapheme::next_boundary(&content, byte);
            }
            Position::new(pos.line, byte)
        }
        Motion::Down | Motion::Up => {
            let target = if motion == Motion::Down {
                (pos.line + count).min(last_line)
            } else {
                pos.line.saturating_sub(count)
            };
            let col = grapheme::visual_col(&line(surface, pos.line), pos.byte);
            let content = line(surface, target);
            Position::new(target, grapheme::byte_at_col(&content, col))
        }
        Motion::LineStart => Position::new(pos.line, 0),
        Motion::FirstNonBlank => Position::new(pos.line, first_non_blank(surface, pos.line)),
        Motion::LineEnd => {
            let target = (pos.line + count - 1).min(last_line);
            Position::new(target, surface.line_len(target))
        }
        Motion::GotoLine | Motion::FirstLine => {
            let target = if explicit {
                (count - 1).min(last_line)
            } else if motion == Motion::GotoLine {
                last_line
            } else {
                0
            };
            Position::new(target, first_non_blank(surface, target))
        }
        Motion::WordForward => (0..count).fold(pos, |p, _| word_forward(surface, p)),
        Motion::WordBackward => (0..count).fold(pos, |p, _| word_backward(surface, p)),
        Motion::WordEnd => (0..count).fold(pos, |p, _| word_end(surface, p)),
    }
}

/// Grapheme at `byte` of `content`, if any.
fn grapheme_at(content: &str, byte: usize) -> Option<&str> {
    if byte >= content.len() {
        return None;
    }
    let next = grapheme::next_boundary(content, byte);
    Some(&content[byte..next])
}

/// Start of the next word. An empty line counts as a word.
fn word_forward(surface: &dyn EditorSurface, pos: Position) -> Position {
    let last_line = surface.line_count().saturating_sub(1);
    let mut line_idx = pos.line;
    let mut content = line(surface, line_idx);
    let mut byte = pos.byte.min(content.len());

    // skip the rest of the current word
    if let Some(g) = grapheme_at(&content, byte) {
        let class = class_of(g);
        if class != Class::Blank {
            while let Some(g) = grapheme_at(&content, byte) {
                if class_of(g) != class {
                    break;
                }
                byte = grapheme::next_boundary(&content, byte);
            }
        }
    }
    // skip blanks, crossing lines
    loop {
        while let Some(g) = grapheme_at(&content, byte) {
            if class_of(g) != Class::Blank {
                return Position::new(line_idx, byte);
            }
            byte = grapheme::next_boundary(&content, byte);
        }
        if line_idx >= last_line {
            return Position::new(line_idx, content.len());
        }
        line_idx += 1;
        content = line(surface, line_idx);
        byte = 0;
        if content.is_empty() {
            return Position::new(line_idx, 0);
        }
    }
}

/// Start of the current or previous word.
fn word_backward(surface: &dyn EditorSurface, pos: Position) -> Position {
    let mut line_idx = pos.line;
    let mut content = line(surface, line_idx);
    let mut byte = pos.byte.min(content.len());
    loop {
        // step back over blanks
        while byte > 0 {
            let prev = grapheme::prev_boundary(&content, byte);
            if class_of(&content[prev..byte]) != Class::Blank {
                break;
            }
            byte = prev;
        }
        if byte > 0 {
            break;
        }
        if line_idx == 0 {
            return Position::new(0, 0);
        }
        line_idx -= 1;
        content = line(surface, line_idx);
        byte = content.len();
        if content.is_empty() {
            return Position::new(line_idx, 0);
        }
    }
    let prev = grapheme::prev_boundary(&content, byte);
    let class = class_of(&content[prev..byte]);
    byte = prev;
    while byte > 0 {
        let prev = grapheme::prev_boundary(&content, byte);
        if class_of(&content[prev..byte]) != class {
            break;
        }
        byte = prev;
    }
    Position::new(line_idx, byte)
}

/// Last grapheme of the current or next word.
fn word_end(surface: &dyn EditorSurface, pos: Position) -> Position {
    let last_line = surface.line_count().saturating_sub(1);
    let mut line_idx = pos.line;
    let mut content = line(surface, line_idx);
    let mut byte = grapheme::next_boundary(&content, pos.byte.min(content.len()));
    loop {
        while let Some(g) = grapheme_at(&content, byte) {
            if class_of(g) != Class::Blank {
                break;
            }
            byte = grapheme::next_boundary(&content, byte);
        }
        if byte < content.len() {
            break;
        }
        if line_idx >= last_line {
            return normalize(surface, Position::new(line_idx, content.len()));
        }
        line_idx += 1;
        content = line(surface, line_idx);
        byte = 0;
    }
    let class = grapheme_at(&content, byte).map(class_of).unwrap_or(Class::Blank);
    loop {
        let next = grapheme::next_boundary(&content, byte);
        match grapheme_at(&content, next) {
            Some(g) if class_of(g) == class => byte = next,
            _ => break,
        }
    }
    Position::new(line_idx, byte)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_surface::TextSurface;
    use pretty_assertions::assert_eq;

    fn surface(text: &str) -> TextSurface {
        TextSurface::new("t", text).unwrap()
    }

    fn run(s: &TextSurface, from: (usize, usize), motion: Motion, count: usize) -> (usize, usize) {
        let p = apply(s, Position::new(from.0, from.1), motion, count, false);
        (p.line, p.byte)
    }

    #[test]
    fn horizontal_motions_stay_on_line() {
        let s = surface("abc\ndef");
        assert_eq!(run(&s, (0, 1), Motion::Left, 5), (0, 0));
        assert_eq!(run(&s, (0, 1), Motion::Right, 1), (0, 2));
        assert_eq!(run(&s, (0, 1), Motion::Right, 9), (0, 3));
        assert_eq!(run(&s, (1, 2), Motion::LineStart, 1), (1, 0));
        assert_eq!(run(&s, (0, 0), Motion::LineEnd, 1), (0, 3));
        assert_eq!(run(&s, (0, 0), Motion::LineEnd, 2), (1, 3));
    }

    #[test]
    fn vertical_motion_keeps_column() {
        let s = surface("abcdef\nab\nabcdef");
        assert_eq!(run(&s, (0, 4), Motion::Down, 1), (1, 2));
        assert_eq!(run(&s, (0, 4), Motion::Down, 2), (2, 4));
        assert_eq!(run(&s, (2, 1), Motion::Up, 9), (0, 1));
    }

    #[test]
    fn word_motions() {
        let s = surface("foo bar.baz\n  qux");
        assert_eq!(run(&s, (0, 0), Motion::WordForward, 1), (0, 4));
        assert_eq!(run(&s, (0, 4), Motion::WordForward, 1), (0, 7));
        assert_eq!(run(&s, (0, 8), Motion::WordForward, 1), (1, 2));
        assert_eq!(run(&s, (1, 2), Motion::WordBackward, 1), (0, 8));
        assert_eq!(run(&s, (0, 5), Motion::WordBackward, 1), (0, 4));
        assert_eq!(run(&s, (0, 0), Motion::WordEnd, 1), (0, 2));
        assert_eq!(run(&s, (0, 2), Motion::WordEnd, 1), (0, 6));
    }

    #[test]
    fn goto_lines() {
        let s = surface("a\n  b\nc");
        assert_eq!(run(&s, (0, 0), Motion::GotoLine, 1), (2, 0));
        assert_eq!(run(&s, (2, 0), Motion::FirstLine, 1), (0, 0));
        let p = apply(&s, Position::origin(), Motion::GotoLine, 2, true);
        assert_eq!(p, Position::new(1, 2));
    }

    #[test]
    fn normalize_rests_on_last_char() {
        let s = surface("abc\n");
        assert_eq!(normalize(&s, Position::new(0, 3)), Position::new(0, 2));
        assert_eq!(normalize(&s, Position::new(1, 4)), Position::new(1, 0));
    }
}
