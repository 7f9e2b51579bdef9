#![allow(dead_code)] // Shared across the integration tests; each test binary uses a subset of helpers.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use anyhow::{Result, bail};
use core_config::Config;
use core_macros::Macros;
use core_surface::{
    Dialog, EditorSurface, Position, ProcessRunner, Selection, StatusSink, SurfaceId, SurfaceRef,
    TextSurface, into_ref,
};
use core_vi::Vi;

/// Status messages in arrival order, shared with the engine.
#[derive(Clone, Default)]
pub struct StatusLog(Rc<RefCell<Vec<(String, String)>>>);

impl StatusSink for StatusLog {
    fn set_status(&mut self, text: &str, pane: &str) {
        self.0.borrow_mut().push((pane.to_string(), text.to_string()));
    }
}

impl StatusLog {
    /// Last message shown on `pane`.
    pub fn last(&self, pane: &str) -> Option<String> {
        self.0
            .borrow()
            .iter()
            .rev()
            .find(|(p, _)| p == pane)
            .map(|(_, t)| t.clone())
    }

    pub fn contains(&self, text: &str) -> bool {
        self.0.borrow().iter().any(|(_, t)| t == text)
    }
}

/// Dialog answering from a queue; an exhausted queue cancels.
#[derive(Default)]
pub struct ScriptedDialog {
    answers: VecDeque<Option<String>>,
}

impl ScriptedDialog {
    pub fn new(answers: &[Option<&str>]) -> Self {
        Self {
            answers: answers.iter().map(|a| a.map(str::to_string)).collect(),
        }
    }
}

impl Dialog for ScriptedDialog {
    fn prompt_choice(&mut self, _title: &str, choices: &[String]) -> Option<String> {
        self.answers
            .pop_front()
            .flatten()
            .filter(|a| choices.contains(a))
    }

    fn prompt_text(&mut self, _title: &str, _default: &str) -> Option<String> {
        self.answers.pop_front().flatten()
    }
}

/// Runner echoing the command back, or failing for `false`.
pub struct EchoRunner;

impl ProcessRunner for EchoRunner {
    fn run(&mut self, command: &str, _input: Option<&str>) -> Result<String> {
        if command == "false" {
            bail!("exit status 1");
        }
        Ok(format!("ran {command}\nsecond line"))
    }
}

/// Text surface that logs every `insert` call.
pub struct LoggingSurface {
    inner: TextSurface,
    pub inserts: Rc<RefCell<Vec<String>>>,
}

impl LoggingSurface {
    pub fn new(content: &str) -> Self {
        Self {
            inner: TextSurface::new("logged", content).unwrap(),
            inserts: Rc::default(),
        }
    }
}

impl EditorSurface for LoggingSurface {
    fn id(&self) -> SurfaceId {
        self.inner.id()
    }
    fn name(&self) -> &str {
        self.inner.name()
    }
    fn text(&self) -> String {
        self.inner.text()
    }
    fn line_count(&self) -> usize {
        self.inner.line_count()
    }
    fn line(&self, idx: usize) -> Option<String> {
        self.inner.line(idx)
    }
    fn cursor(&self) -> Position {
        self.inner.cursor()
    }
    fn set_cursor(&mut self, pos: Position) {
        self.inner.set_cursor(pos)
    }
    fn insert(&mut self, pos: Position, text: &str) -> Position {
        self.inserts.borrow_mut().push(text.to_string());
        self.inner.insert(pos, text)
    }
    fn delete(&mut self, start: Position, end: Position) -> String {
        self.inner.delete(start, end)
    }
    fn selection(&self) -> Option<Selection> {
        self.inner.selection()
    }
    fn select(&mut self, selection: Selection) {
        self.inner.select(selection)
    }
    fn clear_selection(&mut self) {
        self.inner.clear_selection()
    }
    fn is_readonly(&self) -> bool {
        self.inner.is_readonly()
    }
    fn set_readonly(&mut self, readonly: bool) {
        self.inner.set_readonly(readonly)
    }
    fn has_focus(&self) -> bool {
        self.inner.has_focus()
    }
    fn set_focus(&mut self, focus: bool) {
        self.inner.set_focus(focus)
    }
    fn register(&self, name: char) -> Option<String> {
        self.inner.register(name)
    }
    fn set_register(&mut self, name: char, text: &str) {
        self.inner.set_register(name, text)
    }
}

pub fn surface(text: &str) -> SurfaceRef {
    into_ref(TextSurface::new("main", text).unwrap())
}

pub struct Harness {
    pub vi: Vi,
    pub surface: SurfaceRef,
    pub macros: Rc<RefCell<Macros>>,
    pub status: StatusLog,
}

impl Harness {
    pub fn new(text: &str) -> Self {
        Self::with_config(text, &Config::default())
    }

    pub fn with_config(text: &str, config: &Config) -> Self {
        Self::build(surface(text), Macros::new(), config)
    }

    pub fn with_macros(text: &str, macros: &[(&str, &str)]) -> Self {
        let mut registry = Macros::new();
        for (name, keys) in macros {
            registry.set(name, keys);
        }
        Self::build(surface(text), registry, &Config::default())
    }

    pub fn build(surface: SurfaceRef, macros: Macros, config: &Config) -> Self {
        let macros = Rc::new(RefCell::new(macros));
        let status = StatusLog::default();
        let vi = Vi::new(Some(surface.clone()), macros.clone(), config)
            .with_status(Box::new(status.clone()));
        Self {
            vi,
            surface,
            macros,
            status,
        }
    }

    /// Apply builder calls to the engine.
    pub fn map_vi(self, f: impl FnOnce(Vi) -> Vi) -> Self {
        Self {
            vi: f(self.vi),
            ..self
        }
    }

    /// Feed keys one by one.
    pub fn keys(&mut self, keys: &str) -> &mut Self {
        for c in keys.chars() {
            self.vi.key(c);
        }
        self
    }

    pub fn text(&self) -> String {
        self.surface.borrow().text()
    }

    pub fn cursor(&self) -> (usize, usize) {
        let pos = self.surface.borrow().cursor();
        (pos.line, pos.byte)
    }

    pub fn set_cursor(&mut self, line: usize, byte: usize) {
        self.surface.borrow_mut().set_cursor(Position::new(line, byte));
    }

    pub fn register(&self, name: char) -> Option<String> {
        self.surface.borrow().register(name)
    }
}
