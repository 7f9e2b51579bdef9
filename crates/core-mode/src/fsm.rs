//! The six-state vi mode machine.
//!
//! Invariants:
//! - exactly one state is active;
//! - `InsertBlock` is only entered from `VisualBlock`;
//! - the state changes only through [`ModeFsm::transition`].

use crate::{CTRL_V, ESC};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum Mode {
    #[default]
    Normal,
    Insert,
    InsertBlock,
    Visual,
    VisualLine,
    VisualBlock,
}

impl Mode {
    pub fn is_insert(self) -> bool {
        matches!(self, Mode::Insert | Mode::InsertBlock)
    }

    pub fn is_visual(self) -> bool {
        matches!(self, Mode::Visual | Mode::VisualLine | Mode::VisualBlock)
    }

    pub fn label(self) -> &'static str {
        match self {
            Mode::Normal => "",
            Mode::Insert => "insert",
            Mode::InsertBlock => "insert block",
            Mode::Visual => "visual",
            Mode::VisualLine => "visual line",
            Mode::VisualBlock => "visual block",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisualKind {
    Char,
    Line,
    Block,
}

impl VisualKind {
    fn mode(self) -> Mode {
        match self {
            VisualKind::Char => Mode::Visual,
            VisualKind::Line => Mode::VisualLine,
            VisualKind::Block => Mode::VisualBlock,
        }
    }

    fn of(mode: Mode) -> Option<Self> {
        match mode {
            Mode::Visual => Some(VisualKind::Char),
            Mode::VisualLine => Some(VisualKind::Line),
            Mode::VisualBlock => Some(VisualKind::Block),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// Insert-entering command from Normal.
    Insert,
    /// One of the visual keys.
    Visual(VisualKind),
    Escape,
    /// Selection-consuming operator (delete, yank, shift, ...).
    Operator,
    /// Selection-consuming operator that continues in insert.
    Change,
}

const NORMAL_INSERT: &[&str] = &["a", "A", "i", "I", "o", "O", "R", "s", "S", "C", "cc"];
const VISUAL_OPERATORS: &[char] = &['d', 'x', 'X', 'y', 'Y', 'D', '>', '<', 'J', '~', 'u', 'U'];
const VISUAL_CHANGE: &[char] = &['c', 's', 'C', 'S', 'R'];

/// Drop a leading `"x` register prefix and count.
fn strip_prefix(text: &str) -> &str {
    let mut rest = text;
    if let Some(after) = rest.strip_prefix('"') {
        let mut chars = after.chars();
        if chars.next().is_some() {
            rest = chars.as_str();
        }
    }
    if rest.starts_with(|c: char| ('1'..='9').contains(&c)) {
        rest = rest.trim_start_matches(|c: char| c.is_ascii_digit());
    }
    rest
}

fn visual_key(body: &str) -> Option<VisualKind> {
    match body {
        "v" => Some(VisualKind::Char),
        "V" => Some(VisualKind::Line),
        "K" => Some(VisualKind::Block),
        _ if body.len() == 1 && body.starts_with(CTRL_V) => Some(VisualKind::Block),
        _ => None,
    }
}

fn single(body: &str) -> Option<char> {
    let mut chars = body.chars();
    let c = chars.next()?;
    chars.next().is_none().then_some(c)
}

impl Trigger {
    /// Classify command text as a trigger for a machine currently in `mode`.
    pub fn classify(text: &str, mode: Mode) -> Option<Trigger> {
        let body = strip_prefix(text);
        if body.is_empty() {
            return None;
        }
        let is_escape = single(body) == Some(ESC);
        match mode {
            Mode::Normal => {
                if NORMAL_INSERT.contains(&body)
                    || (body.starts_with('c') && body.len() > 1 && !body.ends_with(ESC))
                {
                    Some(Trigger::Insert)
                } else {
                    visual_key(body).map(Trigger::Visual)
                }
            }
            Mode::Insert | Mode::InsertBlock => is_escape.then_some(Trigger::Escape),
            Mode::Visual | Mode::VisualLine | Mode::VisualBlock => {
                if is_escape {
                    return Some(Trigger::Escape);
                }
                if let Some(kind) = visual_key(body) {
                    return Some(Trigger::Visual(kind));
                }
                let c = single(body)?;
                if VISUAL_OPERATORS.contains(&c) {
                    Some(Trigger::Operator)
                } else if VISUAL_CHANGE.contains(&c)
                    || (mode == Mode::VisualBlock && matches!(c, 'I' | 'A'))
                {
                    Some(Trigger::Change)
                } else {
                    None
                }
            }
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct ModeFsm {
    state: Mode,
}

impl ModeFsm {
    pub fn state(&self) -> Mode {
        self.state
    }

    /// Apply `trigger`; returns the resulting state. `readonly` keeps the
    /// machine out of the insert states.
    pub fn transition(&mut self, trigger: Trigger, readonly: bool) -> Mode {
        use Mode::*;
        let next = match (self.state, trigger) {
            (_, Trigger::Escape) => Normal,
            (Normal, Trigger::Insert) => {
                if readonly {
                    Normal
                } else {
                    Insert
                }
            }
            (Normal, Trigger::Visual(kind)) => kind.mode(),
            (current, Trigger::Visual(kind)) if current.is_visual() => {
                if VisualKind::of(current) == Some(kind) {
                    Normal
                } else {
                    kind.mode()
                }
            }
            (current, Trigger::Operator) if current.is_visual() => Normal,
            (VisualBlock, Trigger::Change) => {
                if readonly {
                    Normal
                } else {
                    InsertBlock
                }
            }
            (Visual | VisualLine, Trigger::Change) => {
                if readonly {
                    Normal
                } else {
                    Insert
                }
            }
            (current, _) => current,
        };
        self.state = next;
        next
    }
}
