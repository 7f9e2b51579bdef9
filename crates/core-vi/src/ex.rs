//! Line commands: `:` ex commands, `/` `?` find, `=` calc and `!` exec.
//!
//! [`ExLine::parse`] turns the raw `:` buffer into a structured command with
//! no side effects; [`LineExecutor`] runs any line command against the
//! surface bound to the [`ExCommand`].

use core_command::{CommandExecutor, CommandKind, ExCommand};
use core_macros::ViMacrosMode;
use core_surface::{EditorSurface, Position, ProcessRunner, SurfaceRef, Ui, UNNAMED_REGISTER, Workspace};
use regex::Regex;
use tracing::{debug, info, warn};

use crate::calc;
use crate::edit::{self, Span};
use crate::motion::first_non_blank;

/// Status pane for command feedback.
pub const TEXT_PANE: &str = "PaneText";

/// A line address; numbers are 1-based as typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Address {
    Current,
    Last,
    Line(usize),
}

impl Address {
    fn resolve(self, current: usize, line_count: usize) -> usize {
        let last = line_count.saturating_sub(1);
        match self {
            Address::Current => current.min(last),
            Address::Last => last,
            Address::Line(n) => n.saturating_sub(1).min(last),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineRange {
    pub start: Option<Address>,
    pub end: Option<Address>,
    pub whole: bool,
}

impl LineRange {
    pub fn is_empty(&self) -> bool {
        self.start.is_none() && !self.whole
    }

    /// Zero-based inclusive lines; defaults to the current line.
    pub fn resolve(&self, current: usize, line_count: usize) -> (usize, usize) {
        if self.whole {
            return (0, line_count.saturating_sub(1));
        }
        let start = self
            .start
            .unwrap_or(Address::Current)
            .resolve(current, line_count);
        let end = self.end.map_or(start, |a| a.resolve(current, line_count));
        (start.min(end), start.max(end))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExLine {
    Goto(Address),
    Delete(LineRange),
    Yank(LineRange),
    Substitute {
        range: LineRange,
        pattern: String,
        replacement: String,
        global: bool,
    },
    Edit(String),
    Set(String),
    Registers,
    Macros,
    Unknown(String),
}

fn parse_address(s: &str) -> (Option<Address>, &str) {
    if let Some(rest) = s.strip_prefix('.') {
        return (Some(Address::Current), rest);
    }
    if let Some(rest) = s.strip_prefix('$') {
        return (Some(Address::Last), rest);
    }
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    match s[..end].parse() {
        Ok(n) => (Some(Address::Line(n)), &s[end..]),
        Err(_) => (None, s),
    }
}

fn parse_range(s: &str) -> (LineRange, &str) {
    if let Some(rest) = s.strip_prefix('%') {
        return (
            LineRange {
                whole: true,
                ..LineRange::default()
            },
            rest,
        );
    }
    let (start, rest) = parse_address(s);
    let mut range = LineRange {
        start,
        ..LineRange::default()
    };
    if start.is_some()
        && let Some(after) = rest.strip_prefix(',')
    {
        let (end, rest) = parse_address(after);
        range.end = end;
        return (range, rest);
    }
    (range, rest)
}

fn parse_substitute(range: LineRange, body: &str) -> Option<ExLine> {
    let mut chars = body.chars();
    let delim = chars.next()?;
    if delim.is_alphanumeric() || delim.is_whitespace() {
        return None;
    }
    let mut parts = chars.as_str().splitn(3, delim);
    let pattern = parts.next()?.to_string();
    let replacement = parts.next().unwrap_or("").to_string();
    let flags = parts.next().unwrap_or("");
    Some(ExLine::Substitute {
        range,
        pattern,
        replacement,
        global: flags.contains('g'),
    })
}

impl ExLine {
    pub fn parse(raw: &str) -> ExLine {
        let body = raw.trim().trim_start_matches(':').trim_start();
        let (range, rest) = parse_range(body);
        let rest = rest.trim();
        if rest.is_empty() {
            return match (range.end, range.start) {
                (Some(addr), _) | (None, Some(addr)) => ExLine::Goto(addr),
                _ => ExLine::Unknown(body.to_string()),
            };
        }
        let (name, arg) = match rest.find(char::is_whitespace) {
            Some(i) => (&rest[..i], rest[i..].trim()),
            None => (rest, ""),
        };
        match name {
            "d" | "delete" => return ExLine::Delete(range),
            "y" | "yank" => return ExLine::Yank(range),
            "e" | "edit" if !arg.is_empty() => return ExLine::Edit(arg.to_string()),
            "set" | "se" if !arg.is_empty() => return ExLine::Set(arg.to_string()),
            "reg" | "registers" | "display" => return ExLine::Registers,
            "macros" => return ExLine::Macros,
            _ => {}
        }
        if let Some(after) = rest
            .strip_prefix("substitute")
            .or_else(|| rest.strip_prefix('s'))
            && let Some(sub) = parse_substitute(range, after)
        {
            return sub;
        }
        ExLine::Unknown(rest.to_string())
    }
}

/// Translate a vi replacement (`&`, `\1`) into regex syntax.
fn replacement_template(rep: &str) -> String {
    let mut out = String::with_capacity(rep.len());
    let mut chars = rep.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(d) if d.is_ascii_digit() => {
                    out.push_str("${");
                    out.push(d);
                    out.push('}');
                }
                Some('$') => out.push_str("$$"),
                Some(other) => out.push(other),
                None => out.push('\\'),
            },
            '&' => out.push_str("${0}"),
            '$' => out.push_str("$$"),
            c => out.push(c),
        }
    }
    out
}

/// Last search, reused by an empty `/` or `?`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Find {
    pub pattern: String,
    pub forward: bool,
}

fn search(surface: &dyn EditorSurface, re: &Regex, forward: bool) -> Option<Position> {
    let n = surface.line_count().max(1);
    let cur = surface.cursor();
    for step in 0..=n {
        let idx = if forward {
            (cur.line + step) % n
        } else {
            (cur.line + n - step % n) % n
        };
        let content = surface.line(idx).unwrap_or_default();
        let found = if forward {
            if step == 0 {
                let from = core_text::grapheme::next_boundary(&content, cur.byte);
                re.find_at(&content, from).map(|m| m.start())
            } else {
                re.find(&content)
                    .map(|m| m.start())
                    .filter(|&s| step < n || s <= cur.byte)
            }
        } else {
            re.find_iter(&content)
                .map(|m| m.start())
                .filter(|&s| match step {
                    0 => s < cur.byte,
                    s_ if s_ == n => s >= cur.byte,
                    _ => true,
                })
                .last()
        };
        if let Some(byte) = found {
            return Some(Position::new(idx, byte));
        }
    }
    None
}

/// Runs complete line commands. Built from disjoint borrows of the engine.
pub struct LineExecutor<'a> {
    pub ui: &'a mut Ui,
    pub macros: &'a ViMacrosMode,
    pub workspace: &'a mut Option<Box<dyn Workspace>>,
    pub process: &'a mut Option<Box<dyn ProcessRunner>>,
    pub last_find: &'a mut Option<Find>,
    pub readonly: bool,
}

impl LineExecutor<'_> {
    fn status(&mut self, text: &str) {
        self.ui.status.set_status(text, TEXT_PANE);
    }

    fn editable(&mut self, surface: &SurfaceRef) -> bool {
        if self.readonly || surface.borrow().is_readonly() {
            self.status("readonly");
            return false;
        }
        true
    }

    fn ex(&mut self, command: &mut ExCommand, surface: SurfaceRef) -> bool {
        let line = ExLine::parse(command.text());
        debug!(target: "vi.ex", ?line, "ex_parsed");
        match line {
            ExLine::Goto(addr) => {
                let mut s = surface.borrow_mut();
                let target = addr.resolve(s.cursor().line, s.line_count());
                let byte = first_non_blank(&*s, target);
                s.set_cursor(Position::new(target, byte));
                true
            }
            ExLine::Delete(range) | ExLine::Yank(range) => {
                let delete = matches!(line, ExLine::Delete(_));
                if delete && !self.editable(&surface) {
                    return false;
                }
                let mut s = surface.borrow_mut();
                let (first, last) = range.resolve(s.cursor().line, s.line_count());
                let span = Span::Lines { first, last };
                let text = if delete {
                    let removed = edit::delete(&mut *s, &span);
                    let line = first.min(s.line_count().saturating_sub(1));
                    let byte = first_non_blank(&*s, line);
                    s.set_cursor(Position::new(line, byte));
                    removed
                } else {
                    edit::text(&*s, &span)
                };
                s.set_register(UNNAMED_REGISTER, &text);
                true
            }
            ExLine::Substitute {
                range,
                pattern,
                replacement,
                global,
            } => {
                if !self.editable(&surface) {
                    return false;
                }
                let re = match Regex::new(&pattern) {
                    Ok(re) => re,
                    Err(e) => {
                        self.status(&format!("invalid pattern: {e}"));
                        return false;
                    }
                };
                let template = replacement_template(&replacement);
                let changed = {
                    let mut s = surface.borrow_mut();
                    let (first, last) = range.resolve(s.cursor().line, s.line_count());
                    let mut changed = 0;
                    for idx in first..=last {
                        let content = s.line(idx).unwrap_or_default();
                        let new = if global {
                            re.replace_all(&content, template.as_str())
                        } else {
                            re.replace(&content, template.as_str())
                        };
                        if new != content {
                            let len = content.len();
                            s.delete(Position::new(idx, 0), Position::new(idx, len));
                            s.insert(Position::new(idx, 0), &new);
                            changed += 1;
                        }
                    }
                    changed
                };
                info!(target: "vi.ex", pattern = %pattern, changed, "substitute");
                if changed == 0 {
                    self.status(&format!("pattern not found: {pattern}"));
                    return false;
                }
                self.status(&format!("{changed} lines changed"));
                true
            }
            ExLine::Edit(name) => {
                let Some(workspace) = self.workspace.as_mut() else {
                    self.status("no workspace");
                    return false;
                };
                match workspace.open(&name) {
                    Some(next) => {
                        command.set_surface(Some(next));
                        info!(target: "vi.ex", name = %name, "surface_switched");
                        self.status(&name);
                        true
                    }
                    None => {
                        self.status(&format!("cannot open: {name}"));
                        false
                    }
                }
            }
            ExLine::Set(option) => match option.as_str() {
                "ro" | "readonly" | "noro" | "noreadonly" => {
                    surface.borrow_mut().set_readonly(!option.starts_with("no"));
                    true
                }
                _ => {
                    self.status(&format!("unknown option: {option}"));
                    false
                }
            },
            ExLine::Registers => {
                let listing = {
                    let s = surface.borrow();
                    std::iter::once(UNNAMED_REGISTER)
                        .chain('0'..='9')
                        .chain('a'..='z')
                        .filter_map(|r| {
                            s.register(r)
                                .filter(|t| !t.is_empty())
                                .map(|t| format!("\"{r} {}", t.escape_debug()))
                        })
                        .collect::<Vec<_>>()
                        .join(" | ")
                };
                self.status(&listing);
                true
            }
            ExLine::Macros => {
                let names = self.macros.macros().borrow().macro_names().join(" ");
                let pane = self.macros.pane().to_string();
                self.ui.status.set_status(&names, &pane);
                true
            }
            ExLine::Unknown(text) => {
                self.status(&format!("unknown command: {text}"));
                false
            }
        }
    }

    fn find(&mut self, command: &ExCommand, surface: SurfaceRef) -> bool {
        let text = command.text();
        let forward = text.starts_with('/');
        let pattern = &text[1..];
        let find = if pattern.is_empty() {
            match self.last_find.as_ref() {
                Some(last) => Find {
                    pattern: last.pattern.clone(),
                    forward,
                },
                None => {
                    self.status("no previous pattern");
                    return false;
                }
            }
        } else {
            Find {
                pattern: pattern.to_string(),
                forward,
            }
        };
        let re = match Regex::new(&find.pattern) {
            Ok(re) => re,
            Err(e) => {
                self.status(&format!("invalid pattern: {e}"));
                return false;
            }
        };
        let found = search(&*surface.borrow(), &re, forward);
        *self.last_find = Some(find.clone());
        match found {
            Some(pos) => {
                surface.borrow_mut().set_cursor(pos);
                true
            }
            None => {
                self.status(&format!("pattern not found: {}", find.pattern));
                false
            }
        }
    }

    fn calc(&mut self, command: &ExCommand) -> bool {
        match calc::evaluate(&command.text()[1..]) {
            Ok(value) => {
                self.status(&calc::format(value));
                true
            }
            Err(e) => {
                self.status(&e.to_string());
                false
            }
        }
    }

    fn exec(&mut self, command: &ExCommand) -> bool {
        let cmd = command.text()[1..].trim().to_string();
        let Some(runner) = self.process.as_mut() else {
            self.status("process execution unavailable");
            return false;
        };
        match runner.run(&cmd, None) {
            Ok(output) => {
                info!(target: "vi.ex", command = %cmd, bytes = output.len(), "exec_ok");
                let first = output.lines().next().unwrap_or("").to_string();
                self.status(&first);
                true
            }
            Err(e) => {
                warn!(target: "vi.ex", command = %cmd, error = %e, "exec_failed");
                self.status(&format!("{cmd}: {e}"));
                false
            }
        }
    }
}

impl CommandExecutor for LineExecutor<'_> {
    fn execute(&mut self, command: &mut ExCommand) -> bool {
        let Some(surface) = command.surface().cloned() else {
            return false;
        };
        match command.kind() {
            CommandKind::Command => self.ex(command, surface),
            CommandKind::Find => self.find(command, surface),
            CommandKind::Calc => self.calc(command),
            CommandKind::Exec => self.exec(command),
            CommandKind::Vi | CommandKind::None => false,
        }
    }
}
