//! The vi engine: keystroke path, command execution and macro playback.

use std::cell::RefCell;
use std::rc::Rc;

use core_command::{CommandKind, ExCommand};
use core_config::{Config, PlaybackSwitch};
use core_macros::{Macros, Request, Transition, ViMacrosMode};
use core_mode::{ESC, Mode, ModeListener, ViMode};
use core_surface::{
    Dialog, EditorSurface, Position, ProcessRunner, Selection, SelectionKind, StatusSink,
    SurfaceRef, Ui, UNNAMED_REGISTER, Workspace,
};
use core_text::grapheme;
use tracing::{debug, info, trace};

use crate::edit::{self, Case, Span};
use crate::ex::{Find, LineExecutor, TEXT_PANE};
use crate::motion::{self, first_non_blank};
use crate::parser::{self, Motion, Parse, ViCommand, is_macro_body};
use crate::{BACKSPACE, DELETE};

/// Status pane showing the current mode.
pub const MODE_PANE: &str = "PaneMode";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BlockInsert {
    first: usize,
    last: usize,
    col: usize,
}

/// Text typed since the last insert began, replayed on `Esc` for counts and
/// block inserts.
#[derive(Debug)]
struct InsertState {
    text: String,
    count: usize,
    overwrite: bool,
    block: Option<BlockInsert>,
}

impl Default for InsertState {
    fn default() -> Self {
        Self {
            text: String::new(),
            count: 1,
            overwrite: false,
            block: None,
        }
    }
}

impl InsertState {
    fn finish(&mut self, s: &mut dyn EditorSurface, from: Mode) {
        let text = std::mem::take(&mut self.text);
        if from == Mode::InsertBlock {
            if let Some(block) = self.block
                && !text.is_empty()
                && !text.contains('\n')
            {
                for idx in block.first + 1..=block.last {
                    let content = s.line(idx).unwrap_or_default();
                    if grapheme::visual_col(&content, content.len()) < block.col {
                        continue;
                    }
                    let byte = grapheme::byte_at_col(&content, block.col);
                    s.insert(Position::new(idx, byte), &text);
                }
                trace!(target: "vi.edit", first = block.first, last = block.last, col = block.col, "block_insert_replayed");
            }
        } else if self.count > 1 && !text.is_empty() {
            let cur = s.cursor();
            let end = s.insert(cur, &text.repeat(self.count - 1));
            s.set_cursor(end);
        }
        let cur = s.cursor();
        if cur.byte > 0 {
            let content = s.line(cur.line).unwrap_or_default();
            s.set_cursor(Position::new(cur.line, grapheme::prev_boundary(&content, cur.byte)));
        }
        *self = InsertState::default();
    }
}

/// Mode callbacks, built per transition from disjoint borrows of [`Vi`].
struct ModeCallbacks<'a> {
    surface: Option<SurfaceRef>,
    insert: &'a mut InsertState,
    block: Option<BlockInsert>,
}

impl ModeListener for ModeCallbacks<'_> {
    fn on_insert(&mut self, command: &str, block: bool) {
        self.insert.text.clear();
        self.insert.block = if block { self.block } else { None };
        trace!(target: "vi.mode", command, block, "insert_entered");
    }

    fn on_normal(&mut self, from: Mode) {
        let Some(surface) = &self.surface else {
            return;
        };
        let mut s = surface.borrow_mut();
        if from.is_insert() {
            self.insert.finish(&mut *s, from);
        }
        s.clear_selection();
    }
}

fn selection_kind(mode: Mode) -> Option<SelectionKind> {
    match mode {
        Mode::Visual => Some(SelectionKind::Characterwise),
        Mode::VisualLine => Some(SelectionKind::Linewise),
        Mode::VisualBlock => Some(SelectionKind::Blockwise),
        _ => None,
    }
}

fn line(s: &dyn EditorSurface, idx: usize) -> String {
    s.line(idx).unwrap_or_default()
}

/// Byte `count` graphemes right of `byte`, stopping at the line end.
fn graphemes_right(content: &str, byte: usize, count: usize) -> usize {
    (0..count).fold(byte, |b, _| grapheme::next_boundary(content, b))
}

fn store(s: &mut dyn EditorSurface, register: Option<char>, text: &str) {
    s.set_register(register.unwrap_or(UNNAMED_REGISTER), text);
}

/// vi engine bound to one surface at a time.
///
/// Every key goes through [`Vi::key`]; complete commands can be run at once
/// with [`Vi::command`]. Macro playback feeds recorded keys back through
/// `key`, so a replayed macro behaves exactly like the typed keys did.
pub struct Vi {
    mode: ViMode,
    macros: ViMacrosMode,
    command: ExCommand,
    ui: Ui,
    workspace: Option<Box<dyn Workspace>>,
    process: Option<Box<dyn ProcessRunner>>,
    insert: InsertState,
    last_find: Option<Find>,
    /// Name the outermost `@` command of a [`Vi::command`] call resolved to.
    resolved: Option<String>,
    readonly: bool,
    on_surface_switch: PlaybackSwitch,
}

impl Vi {
    pub fn new(surface: Option<SurfaceRef>, macros: Rc<RefCell<Macros>>, config: &Config) -> Self {
        Self {
            mode: ViMode::new(),
            macros: ViMacrosMode::new(macros, config.macros()),
            command: ExCommand::new(surface),
            ui: Ui::default(),
            workspace: None,
            process: None,
            insert: InsertState::default(),
            last_find: None,
            resolved: None,
            readonly: config.file.vi.readonly,
            on_surface_switch: config.playback_switch(),
        }
    }

    pub fn with_dialog(mut self, dialog: Box<dyn Dialog>) -> Self {
        self.ui.dialog = dialog;
        self
    }

    pub fn with_status(mut self, status: Box<dyn StatusSink>) -> Self {
        self.ui.status = status;
        self
    }

    pub fn with_workspace(mut self, workspace: Box<dyn Workspace>) -> Self {
        self.workspace = Some(workspace);
        self
    }

    pub fn with_process(mut self, process: Box<dyn ProcessRunner>) -> Self {
        self.process = Some(process);
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode.get()
    }

    pub fn macros(&self) -> &ViMacrosMode {
        &self.macros
    }

    /// The pending command and its surface binding.
    pub fn ex_command(&self) -> &ExCommand {
        &self.command
    }

    pub fn surface(&self) -> Option<SurfaceRef> {
        self.command.surface().cloned()
    }

    pub fn set_surface(&mut self, surface: Option<SurfaceRef>) {
        self.command.set_surface(surface);
    }

    /// Engine-wide readonly flag or the bound surface's own.
    pub fn is_readonly(&self) -> bool {
        self.readonly || self.command.surface().is_some_and(|s| s.borrow().is_readonly())
    }

    /// Interrupt from outside (focus loss, toolkit escape): drop the pending
    /// command and return to Normal.
    pub fn escape(&mut self) -> bool {
        let before = self.mode();
        self.command.clear();
        let changed = self.escape_mode();
        self.report_mode(Some(before));
        changed
    }

    /// Process one key. Returns whether the key caused an action; keys that
    /// only extend a pending command return false.
    pub fn key(&mut self, c: char) -> bool {
        let was_recording = self.macros.is_recording();
        let before = self.mode();
        let handled = if self.mode.is_insert() {
            self.insert_key(c)
        } else {
            self.command_key(c)
        };
        if was_recording && self.macros.is_recording() {
            self.macros.record_key(c);
        }
        self.report_mode(Some(before));
        handled
    }

    /// Run a complete command. Line commands (`:`, `/`, `?`, `=`, `!`) and
    /// macro commands run as a whole; anything else is fed key by key.
    pub fn command(&mut self, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        let body = text.trim_end_matches(['\r', '\n']);
        let is_line = CommandKind::classify(body).is_line();
        let is_macro = parser::split_prefix(body).is_some_and(|(_, b)| is_macro_body(b));
        if self.mode.is_insert() || !(is_line || is_macro) {
            let mut handled = false;
            for c in text.chars() {
                handled = self.key(c);
            }
            return handled;
        }
        let was_recording = self.macros.is_recording();
        let before = self.mode();
        self.resolved = None;
        self.command.set(body);
        let handled = if is_line {
            self.exec_line()
        } else {
            self.run_pending(true)
        };
        if was_recording && self.macros.is_recording() {
            for c in self.recordable(body, is_line).chars() {
                self.macros.record_key(c);
            }
        }
        self.report_mode(Some(before));
        handled
    }

    /// Replay macro `name` `repeat` times through the keystroke path. The
    /// pending command and its surface binding are restored afterwards.
    pub fn playback(&mut self, name: &str, repeat: usize) -> bool {
        if repeat == 0 {
            return false;
        }
        let snapshot = self.command.clone();
        let Some(keys) = self.macros.begin_playback(name, &mut self.ui) else {
            return false;
        };
        self.command.clear();
        let label = self.macros.status_label();
        self.ui.status.set_status(&label, self.macros.pane());
        info!(target: "vi.macros", name, repeat, depth = self.macros.fsm().depth(), "playback_start");

        let mut completed = 0;
        let mut aborted = false;
        'steps: for step in 1..=repeat {
            self.macros.fsm_mut().set_step(step, repeat);
            if repeat > 1 {
                let label = self.macros.status_label();
                self.ui.status.set_status(&label, self.macros.pane());
            }
            let bound = self.command.clone();
            for c in keys.chars() {
                if self.macros.fsm().abort_requested() {
                    aborted = true;
                    break 'steps;
                }
                self.key(c);
            }
            completed = step;
            if !self.command.is_same_surface(&bound) {
                info!(
                    target: "vi.macros",
                    name,
                    step,
                    policy = ?self.on_surface_switch,
                    "playback_surface_switched"
                );
                if self.on_surface_switch == PlaybackSwitch::Abort {
                    if step < repeat {
                        let pane = self.macros.pane().to_string();
                        self.ui
                            .status
                            .set_status(&format!("{name}: surface switched, playback stopped"), &pane);
                    }
                    break;
                }
            }
        }
        aborted |= self.macros.fsm().abort_requested();
        self.macros.end_playback();
        self.command.restore(&snapshot);
        let label = self.macros.status_label();
        self.ui.status.set_status(&label, self.macros.pane());
        info!(target: "vi.macros", name, completed, aborted, "playback_done");
        !aborted
    }

    /// Keys that replay `body` through [`Vi::key`]. Line commands need their
    /// Enter; a resolved `@` reference is stored as `@name@` so it resolves the
    /// same way without `complete`.
    fn recordable(&self, body: &str, is_line: bool) -> String {
        if is_line {
            return format!("{body}\r");
        }
        let reference = parser::split_prefix(body)
            .map(|(_, rest)| rest)
            .filter(|rest| rest.starts_with('@'));
        match (reference, &self.resolved) {
            (Some(rest), Some(name)) => {
                format!("{}@{name}@", &body[..body.len() - rest.len()])
            }
            _ => body.to_string(),
        }
    }

    fn report_mode(&mut self, before: Option<Mode>) {
        let now = self.mode();
        if before != Some(now) {
            self.ui.status.set_status(now.label(), MODE_PANE);
        }
    }

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

    fn escape_mode(&mut self) -> bool {
        let mut callbacks = ModeCallbacks {
            surface: self.command.surface().cloned(),
            insert: &mut self.insert,
            block: None,
        };
        self.mode.escape(&mut callbacks)
    }

    fn transition_mode(&mut self, text: &str, block: Option<BlockInsert>) -> bool {
        let readonly = self.is_readonly();
        let mut callbacks = ModeCallbacks {
            surface: self.command.surface().cloned(),
            insert: &mut self.insert,
            block,
        };
        self.mode.transition(text, readonly, &mut callbacks)
    }

    fn insert_key(&mut self, c: char) -> bool {
        if c == ESC {
            return self.escape_mode();
        }
        let Some(surface) = self.command.surface().cloned() else {
            return false;
        };
        let mut s = surface.borrow_mut();
        let cur = s.cursor();
        if matches!(c, BACKSPACE | DELETE) {
            if cur.byte == 0 {
                return false;
            }
            let prev = grapheme::prev_boundary(&line(&*s, cur.line), cur.byte);
            s.delete(Position::new(cur.line, prev), cur);
            s.set_cursor(Position::new(cur.line, prev));
            self.insert.text.pop();
            return true;
        }
        let c = if c == '\r' { '\n' } else { c };
        if self.insert.overwrite && c != '\n' {
            let content = line(&*s, cur.line);
            if cur.byte < content.len() {
                let end = grapheme::next_boundary(&content, cur.byte);
                s.delete(cur, Position::new(cur.line, end));
            }
        }
        let end = s.insert(cur, c.encode_utf8(&mut [0; 4]));
        s.set_cursor(end);
        self.insert.text.push(c);
        true
    }

    fn command_key(&mut self, c: char) -> bool {
        if c == ESC {
            if !self.command.is_empty() {
                trace!(target: "vi.command", pending = self.command.text(), "pending_cleared");
                self.command.clear();
                return true;
            }
            return self.escape_mode();
        }
        if self.command.kind().is_line() {
            return match c {
                '\r' | '\n' => self.exec_line(),
                BACKSPACE | DELETE => {
                    self.command.pop();
                    true
                }
                _ => {
                    self.command.append(c);
                    false
                }
            };
        }
        if matches!(c, '\r' | '\n') {
            if self.pending_macro() {
                return self.run_pending(true);
            }
            if !self.command.is_empty() {
                self.command.clear();
                return false;
            }
            return self.next_line();
        }
        if matches!(c, BACKSPACE | DELETE) && !self.command.is_empty() {
            self.command.pop();
            return true;
        }
        self.command.append(c);
        if self.command.kind().is_line() {
            return false;
        }
        self.run_pending(false)
    }

    /// `Enter` in Normal mode: first non-blank of the next line.
    fn next_line(&mut self) -> bool {
        let Some(surface) = self.command.surface().cloned() else {
            return false;
        };
        let mut s = surface.borrow_mut();
        let cur = s.cursor();
        if cur.line + 1 >= s.line_count() {
            return false;
        }
        let byte = first_non_blank(&*s, cur.line + 1);
        s.set_cursor(Position::new(cur.line + 1, byte));
        true
    }

    fn pending_macro(&self) -> bool {
        parser::split_prefix(self.command.text()).is_some_and(|(_, body)| is_macro_body(body))
    }

    fn exec_line(&mut self) -> bool {
        if self.command.surface().is_none() {
            self.status("no surface");
            self.command.clear();
            return false;
        }
        let mut executor = LineExecutor {
            ui: &mut self.ui,
            macros: &self.macros,
            workspace: &mut self.workspace,
            process: &mut self.process,
            last_find: &mut self.last_find,
            readonly: self.readonly,
        };
        let handled = self.command.exec(&mut executor);
        debug!(target: "vi.command", text = self.command.text(), handled, "line_command");
        self.command.clear();
        handled
    }

    fn run_pending(&mut self, complete: bool) -> bool {
        let text = self.command.text().to_string();
        let Some((prefix, body)) = parser::split_prefix(&text) else {
            return false;
        };
        if is_macro_body(body) {
            return self.run_macro(body, prefix.count_or_one(), complete);
        }
        match parser::parse(&text, self.mode.is_visual()) {
            Parse::Incomplete => {
                if complete {
                    self.command.clear();
                }
                false
            }
            Parse::Invalid => {
                debug!(target: "vi.command", text = %text, "invalid_command");
                self.command.clear();
                false
            }
            Parse::Complete(command) => {
                self.command.clear();
                self.execute(command, &text)
            }
        }
    }

    fn run_macro(&mut self, body: &str, repeat: usize, complete: bool) -> bool {
        match self.macros.transition(body, complete, repeat, &mut self.ui) {
            Transition::Incomplete => {
                if complete {
                    self.command.clear();
                }
                false
            }
            Transition::Ignored | Transition::Cancelled | Transition::NotFound => {
                self.command.clear();
                false
            }
            Transition::Done { request, .. } => {
                self.command.clear();
                if let Some(Request::Playback { name, .. } | Request::Expand { name, .. }) = &request
                    && self.resolved.is_none()
                {
                    self.resolved = Some(name.clone());
                }
                match request {
                    None => true,
                    Some(Request::Playback { name, repeat }) => self.playback(&name, repeat),
                    Some(Request::Expand { name, repeat }) => self.expand(&name, repeat),
                }
            }
        }
    }

    /// Insert the expansion of variable `name` at the cursor.
    fn expand(&mut self, name: &str, repeat: usize) -> bool {
        let Some(surface) = self.command.surface().cloned() else {
            self.status("no surface");
            return false;
        };
        if !self.editable(&surface) {
            return false;
        }
        let (filename, line_idx) = {
            let s = surface.borrow();
            (s.name().to_string(), s.cursor().line)
        };
        let Some(text) = self.macros.expand(name, &filename, line_idx, &mut self.ui) else {
            return false;
        };
        let mut s = surface.borrow_mut();
        let cur = s.cursor();
        let end = s.insert(cur, &text.repeat(repeat));
        s.set_cursor(end);
        info!(target: "vi.macros", name, repeat, len = text.len(), "variable_expanded");
        true
    }

    fn execute(&mut self, command: ViCommand, text: &str) -> bool {
        let Some(surface) = self.command.surface().cloned() else {
            self.status("no surface");
            return false;
        };
        trace!(target: "vi.command", ?command, "execute");
        match command {
            ViCommand::Escape => self.escape_mode(),
            ViCommand::Motion {
                motion,
                count,
                explicit,
            } => self.move_cursor(&surface, motion, count, explicit),
            ViCommand::Operator {
                op,
                motion,
                count,
                explicit,
                register,
            } => {
                let span = motion_span(&*surface.borrow(), op, motion, count, explicit);
                self.operator(&surface, op, span, register, text)
            }
            ViCommand::Linewise {
                op,
                count,
                register,
            } => {
                let span = {
                    let s = surface.borrow();
                    let first = s.cursor().line;
                    let last = (first + count - 1).min(s.line_count().saturating_sub(1));
                    Span::Lines { first, last }
                };
                self.operator(&surface, op, span, register, text)
            }
            ViCommand::Simple {
                key,
                count,
                register,
            } => self.simple(&surface, key, count, register, text),
            ViCommand::Replace { with, count } => {
                if !self.editable(&surface) {
                    return false;
                }
                let with = if with == '\r' { '\n' } else { with };
                let mut s = surface.borrow_mut();
                let cur = s.cursor();
                if !edit::replace_chars(&mut *s, cur, with, count) {
                    return false;
                }
                let end = graphemes_right(&line(&*s, cur.line), cur.byte, count - 1);
                s.set_cursor(Position::new(cur.line, end));
                true
            }
            ViCommand::Insert { key, count } => self.insert_command(&surface, key, count, text),
            ViCommand::Visual(_) => self.visual_key(&surface, text),
            ViCommand::VisualOperator {
                key,
                register,
                count,
            } => self.visual_operator(&surface, key, register, count, text),
        }
    }

    fn move_cursor(&mut self, surface: &SurfaceRef, m: Motion, count: usize, explicit: bool) -> bool {
        let mut s = surface.borrow_mut();
        let cur = s.cursor();
        let target = motion::normalize(&*s, motion::apply(&*s, cur, m, count, explicit));
        s.set_cursor(target);
        if self.mode.is_visual()
            && let Some(mut selection) = s.selection()
        {
            selection.head = target;
            s.select(selection);
        }
        target != cur
    }

    fn operator(
        &mut self,
        surface: &SurfaceRef,
        op: char,
        span: Span,
        register: Option<char>,
        text: &str,
    ) -> bool {
        if op != 'y' && !self.editable(surface) {
            return false;
        }
        {
            let mut s = surface.borrow_mut();
            match op {
                'y' => {
                    let yanked = edit::text(&*s, &span);
                    store(&mut *s, register, &yanked);
                    let start = span.start(&*s);
                    if !span.is_linewise() {
                        s.set_cursor(start);
                    }
                }
                'd' => {
                    let removed = edit::delete(&mut *s, &span);
                    store(&mut *s, register, &removed);
                    let start = span.start(&*s);
                    let start = motion::normalize(&*s, start);
                    s.set_cursor(start);
                }
                'c' => {
                    let removed = match span {
                        Span::Lines { first, last } => {
                            // change keeps one empty line
                            let yanked = edit::text(&*s, &span);
                            let end = Position::new(last, s.line_len(last));
                            s.delete(Position::new(first, 0), end);
                            s.set_cursor(Position::new(first, 0));
                            yanked
                        }
                        _ => {
                            let removed = edit::delete(&mut *s, &span);
                            let start = span.start(&*s);
                            s.set_cursor(start);
                            removed
                        }
                    };
                    store(&mut *s, register, &removed);
                }
                '>' | '<' => {
                    let (first, last) = span.lines();
                    edit::shift(&mut *s, first, last, op == '>');
                    let byte = first_non_blank(&*s, first);
                    s.set_cursor(Position::new(first, byte));
                }
                _ => return false,
            }
        }
        if op == 'c' {
            self.transition_mode(text, None);
        }
        true
    }

    fn simple(
        &mut self,
        surface: &SurfaceRef,
        key: char,
        count: usize,
        register: Option<char>,
        text: &str,
    ) -> bool {
        if key != 'Y' && !self.editable(surface) {
            return false;
        }
        let (content, cur) = {
            let s = surface.borrow();
            let cur = s.cursor();
            (line(&*s, cur.line), cur)
        };
        match key {
            'x' | 'X' => {
                let (start, end) = if key == 'x' {
                    (cur.byte, graphemes_right(&content, cur.byte, count))
                } else {
                    let start = (0..count).fold(cur.byte, |b, _| grapheme::prev_boundary(&content, b));
                    (start, cur.byte)
                };
                if start >= end {
                    return false;
                }
                let span = Span::Chars {
                    start: Position::new(cur.line, start),
                    end: Position::new(cur.line, end),
                };
                self.operator(surface, 'd', span, register, text)
            }
            'D' | 'C' => {
                let span = Span::Chars {
                    start: cur,
                    end: Position::new(cur.line, content.len()),
                };
                self.operator(surface, if key == 'D' { 'd' } else { 'c' }, span, register, text)
            }
            'Y' => {
                let last = {
                    let s = surface.borrow();
                    (cur.line + count - 1).min(s.line_count().saturating_sub(1))
                };
                let span = Span::Lines {
                    first: cur.line,
                    last,
                };
                self.operator(surface, 'y', span, register, text)
            }
            'p' | 'P' => {
                let pasted = surface
                    .borrow()
                    .register(register.unwrap_or(UNNAMED_REGISTER))
                    .filter(|t| !t.is_empty());
                let Some(pasted) = pasted else {
                    self.status("register empty");
                    return false;
                };
                let mut s = surface.borrow_mut();
                let at = edit::paste(&mut *s, cur, &pasted, key == 'p', count);
                s.set_cursor(at);
                true
            }
            'J' => {
                let mut s = surface.borrow_mut();
                if cur.line + 1 >= s.line_count() {
                    return false;
                }
                let at = edit::join(&mut *s, cur.line, cur.line + count.max(2) - 1);
                s.set_cursor(at);
                true
            }
            '~' => {
                let end = graphemes_right(&content, cur.byte, count);
                if end <= cur.byte {
                    return false;
                }
                let mut s = surface.borrow_mut();
                let span = Span::Chars {
                    start: cur,
                    end: Position::new(cur.line, end),
                };
                edit::change_case(&mut *s, &span, Case::Toggle);
                let next = motion::normalize(&*s, Position::new(cur.line, end));
                s.set_cursor(next);
                true
            }
            _ => false,
        }
    }

    fn insert_command(&mut self, surface: &SurfaceRef, key: char, count: usize, text: &str) -> bool {
        if self.is_readonly() {
            self.transition_mode(text, None);
            self.status("readonly");
            return false;
        }
        {
            let mut s = surface.borrow_mut();
            let cur = s.cursor();
            let content = line(&*s, cur.line);
            let target = match key {
                'a' if !content.is_empty() => {
                    Position::new(cur.line, grapheme::next_boundary(&content, cur.byte))
                }
                'A' => Position::new(cur.line, content.len()),
                'I' => Position::new(cur.line, first_non_blank(&*s, cur.line)),
                'o' => {
                    s.insert(Position::new(cur.line, content.len()), "\n");
                    Position::new(cur.line + 1, 0)
                }
                'O' => {
                    s.insert(Position::new(cur.line, 0), "\n");
                    Position::new(cur.line, 0)
                }
                's' => {
                    let end = graphemes_right(&content, cur.byte, count);
                    let removed = s.delete(cur, Position::new(cur.line, end));
                    store(&mut *s, None, &removed);
                    cur
                }
                'S' => {
                    let removed = s.delete(Position::new(cur.line, 0), Position::new(cur.line, content.len()));
                    store(&mut *s, None, &format!("{removed}\n"));
                    Position::new(cur.line, 0)
                }
                _ => cur,
            };
            s.set_cursor(target);
        }
        self.transition_mode(text, None);
        self.insert.overwrite = key == 'R';
        self.insert.count = if matches!(key, 'i' | 'a' | 'I' | 'A') { count } else { 1 };
        true
    }

    fn visual_key(&mut self, surface: &SurfaceRef, text: &str) -> bool {
        let before = self.mode();
        if !self.transition_mode(text, None) {
            return false;
        }
        let Some(kind) = selection_kind(self.mode()) else {
            return true;
        };
        let mut s = surface.borrow_mut();
        let cur = s.cursor();
        let selection = match s.selection() {
            Some(mut selection) if before.is_visual() => {
                selection.kind = kind;
                selection
            }
            _ => Selection::new(cur, cur, kind),
        };
        s.select(selection);
        true
    }

    fn visual_operator(
        &mut self,
        surface: &SurfaceRef,
        key: char,
        register: Option<char>,
        count: usize,
        text: &str,
    ) -> bool {
        let from = self.mode();
        if matches!(key, 'I' | 'A') && from != Mode::VisualBlock {
            return false;
        }
        let selection = surface.borrow().selection();
        let Some(selection) = selection else {
            self.escape_mode();
            return false;
        };
        if !matches!(key, 'y' | 'Y') && !self.editable(surface) {
            self.escape_mode();
            return false;
        }
        let span = Span::from_selection(&*surface.borrow(), &selection);
        let (first, last) = span.lines();
        let lines = Span::Lines { first, last };
        let mut block = None;
        {
            let mut s = surface.borrow_mut();
            let cursor = match key {
                'y' | 'Y' => {
                    let target = if key == 'Y' { lines } else { span };
                    let yanked = edit::text(&*s, &target);
                    store(&mut *s, register, &yanked);
                    target.start(&*s)
                }
                'd' | 'x' | 'X' | 'D' => {
                    let target = if matches!(key, 'X' | 'D') { lines } else { span };
                    let removed = edit::delete(&mut *s, &target);
                    store(&mut *s, register, &removed);
                    motion::normalize(&*s, target.start(&*s))
                }
                '>' | '<' => {
                    for _ in 0..count {
                        edit::shift(&mut *s, first, last, key == '>');
                    }
                    Position::new(first, first_non_blank(&*s, first))
                }
                'J' => edit::join(&mut *s, first, last.max(first + 1)),
                '~' | 'u' | 'U' => {
                    let case = match key {
                        '~' => Case::Toggle,
                        'u' => Case::Lower,
                        _ => Case::Upper,
                    };
                    edit::change_case(&mut *s, &span, case);
                    motion::normalize(&*s, span.start(&*s))
                }
                'I' | 'A' => {
                    let Span::Block { left, right, .. } = span else {
                        return false;
                    };
                    let col = if key == 'I' { left } else { right + 1 };
                    block = Some(BlockInsert { first, last, col });
                    let byte = grapheme::byte_at_col(&line(&*s, first), col);
                    Position::new(first, byte)
                }
                _ => {
                    // c s C S R
                    let target = match span {
                        Span::Block { .. } if !matches!(key, 'C' | 'S' | 'R') => span,
                        Span::Block { .. } | Span::Lines { .. } => lines,
                        Span::Chars { .. } if matches!(key, 'c' | 's') => span,
                        Span::Chars { .. } => lines,
                    };
                    let removed = match target {
                        Span::Lines { first, last } => {
                            let yanked = edit::text(&*s, &target);
                            let end = Position::new(last, s.line_len(last));
                            s.delete(Position::new(first, 0), end);
                            yanked
                        }
                        _ => edit::delete(&mut *s, &target),
                    };
                    store(&mut *s, register, &removed);
                    if let Span::Block { left, .. } = target {
                        block = Some(BlockInsert {
                            first,
                            last,
                            col: left,
                        });
                    }
                    target.start(&*s)
                }
            };
            s.set_cursor(cursor);
        }
        self.transition_mode(text, block);
        if self.mode.is_insert() {
            surface.borrow_mut().clear_selection();
        }
        debug!(target: "vi.edit", key = %key, ?from, to = ?self.mode(), "visual_operator");
        true
    }
}

/// Range covered by `op` + `motion` from the cursor.
fn motion_span(s: &dyn EditorSurface, op: char, m: Motion, count: usize, explicit: bool) -> Span {
    let cur = s.cursor();
    let content = line(s, cur.line);
    let on_blank = grapheme::iter(&content[cur.byte.min(content.len())..])
        .next()
        .is_none_or(grapheme::is_blank);
    // `cw` on a word changes to its end
    let m = if op == 'c' && m == Motion::WordForward && !on_blank {
        Motion::WordEnd
    } else {
        m
    };
    let target = motion::apply(s, cur, m, count, explicit);
    if m.is_linewise() {
        return Span::Lines {
            first: cur.line.min(target.line),
            last: cur.line.max(target.line),
        };
    }
    let (start, end) = if target < cur { (target, cur) } else { (cur, target) };
    let end = if m.is_inclusive() {
        Position::new(end.line, grapheme::next_boundary(&line(s, end.line), end.byte))
    } else if m == Motion::WordForward && end.line > start.line {
        Position::new(start.line, s.line_len(start.line))
    } else {
        end
    };
    if start == end {
        debug!(target: "vi.edit", op = %op, motion = ?m, "empty_motion_span");
    }
    Span::Chars { start, end }
}
