//! vi command parsing.
//!
//! Grammar of a command in Normal mode:
//!
//! ```text
//! ["x] [count] body
//! body := motion | op [count] (motion | op) | simple | r<char> | insert | visual
//! ```
//!
//! The parser is pure: it resolves the pending text to a [`ViCommand`], says
//! more characters are needed, or rejects it. Register and count prefixes are
//! folded the same way for every body; operator counts multiply.

use core_mode::{CTRL_V, ESC};
use tracing::trace;

const MAX_COUNT: usize = 999_999;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    Left,
    Down,
    Up,
    Right,
    LineStart,
    FirstNonBlank,
    LineEnd,
    WordForward,
    WordBackward,
    WordEnd,
    /// `G`: last line, or line `count` when a count was given.
    GotoLine,
    /// `gg`: first line, or line `count`.
    FirstLine,
}

impl Motion {
    fn from_char(c: char) -> Option<Self> {
        Some(match c {
            'h' => Motion::Left,
            'j' => Motion::Down,
            'k' => Motion::Up,
            'l' | ' ' => Motion::Right,
            '0' => Motion::LineStart,
            '^' => Motion::FirstNonBlank,
            '$' => Motion::LineEnd,
            'w' => Motion::WordForward,
            'b' => Motion::WordBackward,
            'e' => Motion::WordEnd,
            'G' => Motion::GotoLine,
            _ => return None,
        })
    }

    /// Operators applied with these motions act on whole lines.
    pub fn is_linewise(self) -> bool {
        matches!(
            self,
            Motion::Down | Motion::Up | Motion::GotoLine | Motion::FirstLine
        )
    }

    /// Motions whose target character is part of an operator range.
    pub fn is_inclusive(self) -> bool {
        matches!(self, Motion::WordEnd)
    }
}

/// Register and count prefix of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Prefix {
    pub register: Option<char>,
    pub count: Option<usize>,
}

impl Prefix {
    pub fn count_or_one(&self) -> usize {
        self.count.unwrap_or(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViCommand {
    Motion {
        motion: Motion,
        count: usize,
        explicit: bool,
    },
    Operator {
        op: char,
        motion: Motion,
        count: usize,
        explicit: bool,
        register: Option<char>,
    },
    /// Doubled operator (`dd`, `yy`, `cc`, `>>`, `<<`).
    Linewise {
        op: char,
        count: usize,
        register: Option<char>,
    },
    /// `x X D C Y p P J ~`
    Simple {
        key: char,
        count: usize,
        register: Option<char>,
    },
    Replace {
        with: char,
        count: usize,
    },
    /// `a A i I o O R s S`
    Insert {
        key: char,
        count: usize,
    },
    /// `v V K ^V`
    Visual(char),
    /// Operator applied to the visual selection.
    VisualOperator {
        key: char,
        register: Option<char>,
        count: usize,
    },
    Escape,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parse {
    Complete(ViCommand),
    Incomplete,
    Invalid,
}

const OPERATORS: &[char] = &['d', 'y', 'c', '>', '<'];
const SIMPLE: &[char] = &['x', 'X', 'D', 'C', 'Y', 'p', 'P', 'J', '~'];
const INSERTS: &[char] = &['a', 'A', 'i', 'I', 'o', 'O', 'R', 's', 'S'];
const VISUAL_OPS: &[char] = &[
    'd', 'x', 'X', 'y', 'Y', 'D', '>', '<', 'J', '~', 'u', 'U', 'c', 's', 'C', 'S', 'R', 'I', 'A',
];

fn is_visual_key(c: char) -> bool {
    matches!(c, 'v' | 'V' | 'K') || c == CTRL_V
}

/// Split `"x` and count off the front of `text`. `None` while the register
/// name is still missing.
pub fn split_prefix(text: &str) -> Option<(Prefix, &str)> {
    let mut prefix = Prefix::default();
    let mut rest = text;
    if let Some(after) = rest.strip_prefix('"') {
        let mut chars = after.chars();
        prefix.register = Some(chars.next()?);
        rest = chars.as_str();
    }
    let (count, after) = take_count(rest);
    prefix.count = count;
    Some((prefix, after))
}

fn take_count(text: &str) -> (Option<usize>, &str) {
    if !text.starts_with(|c: char| ('1'..='9').contains(&c)) {
        return (None, text);
    }
    let end = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    let count = text[..end]
        .bytes()
        .fold(0usize, |acc, b| {
            acc.saturating_mul(10).saturating_add((b - b'0') as usize)
        })
        .min(MAX_COUNT);
    (Some(count), &text[end..])
}

/// Whether the command body (after its prefix) is a macro command.
pub fn is_macro_body(body: &str) -> bool {
    body.starts_with(['q', '@'])
}

/// Parse pending command text. `visual` selects the visual-mode grammar where
/// operators act on the selection instead of waiting for a motion.
pub fn parse(text: &str, visual: bool) -> Parse {
    let Some((prefix, body)) = split_prefix(text) else {
        return Parse::Incomplete;
    };
    let result = parse_body(prefix, body, visual);
    trace!(target: "vi.parse", text, visual, ?result, "parse");
    result
}

fn parse_body(prefix: Prefix, body: &str, visual: bool) -> Parse {
    let mut chars = body.chars();
    let Some(first) = chars.next() else {
        return Parse::Incomplete;
    };
    let rest = chars.as_str();
    let count = prefix.count_or_one();
    let register = prefix.register;

    if first == ESC {
        return Parse::Complete(ViCommand::Escape);
    }
    if is_visual_key(first) {
        return single(rest, ViCommand::Visual(first));
    }
    if let Some(motion) = motion_of(first, rest) {
        return match motion {
            Ok(motion) => Parse::Complete(ViCommand::Motion {
                motion,
                count,
                explicit: prefix.count.is_some(),
            }),
            Err(parse) => parse,
        };
    }
    if visual {
        if VISUAL_OPS.contains(&first) {
            return single(
                rest,
                ViCommand::VisualOperator {
                    key: first,
                    register,
                    count,
                },
            );
        }
        return Parse::Invalid;
    }
    if OPERATORS.contains(&first) {
        return parse_operator(first, prefix, rest);
    }
    if SIMPLE.contains(&first) {
        return single(
            rest,
            ViCommand::Simple {
                key: first,
                count,
                register,
            },
        );
    }
    if INSERTS.contains(&first) {
        return single(rest, ViCommand::Insert { key: first, count });
    }
    if first == 'r' {
        let mut rest = rest.chars();
        return match (rest.next(), rest.next()) {
            (None, _) => Parse::Incomplete,
            (Some(ESC), _) => Parse::Complete(ViCommand::Escape),
            (Some(with), None) => Parse::Complete(ViCommand::Replace { with, count }),
            _ => Parse::Invalid,
        };
    }
    Parse::Invalid
}

/// `Some(Ok)` for a complete motion, `Some(Err(Incomplete))` for a lone `g`,
/// `None` when `first` starts no motion.
fn motion_of(first: char, rest: &str) -> Option<Result<Motion, Parse>> {
    if first == 'g' {
        return Some(match rest {
            "" => Err(Parse::Incomplete),
            "g" => Ok(Motion::FirstLine),
            _ => Err(Parse::Invalid),
        });
    }
    let motion = Motion::from_char(first)?;
    Some(if rest.is_empty() {
        Ok(motion)
    } else {
        Err(Parse::Invalid)
    })
}

fn parse_operator(op: char, prefix: Prefix, rest: &str) -> Parse {
    let (post, rest) = take_count(rest);
    let count = prefix
        .count_or_one()
        .saturating_mul(post.unwrap_or(1))
        .min(MAX_COUNT);
    let explicit = prefix.count.is_some() || post.is_some();
    let mut chars = rest.chars();
    let Some(next) = chars.next() else {
        return Parse::Incomplete;
    };
    if next == op {
        return single(
            chars.as_str(),
            ViCommand::Linewise {
                op,
                count,
                register: prefix.register,
            },
        );
    }
    match motion_of(next, chars.as_str()) {
        Some(Ok(motion)) => Parse::Complete(ViCommand::Operator {
            op,
            motion,
            count,
            explicit,
            register: prefix.register,
        }),
        Some(Err(parse)) => parse,
        None => Parse::Invalid,
    }
}

fn single(rest: &str, command: ViCommand) -> Parse {
    if rest.is_empty() {
        Parse::Complete(command)
    } else {
        Parse::Invalid
    }
}
