//! UI collaborators consumed by the vi core.
//!
//! Concrete toolkits bind these through adapters. The defaults here are
//! non-interactive: [`NoDialog`] cancels every prompt and [`LogStatus`] sends
//! status text to the log.

use std::collections::BTreeMap;

use anyhow::Result;
use tracing::{debug, info};

use crate::{SurfaceRef, TextSurface, into_ref};

/// Choice / text-entry prompts. `None` means the user cancelled.
pub trait Dialog {
    fn prompt_choice(&mut self, title: &str, choices: &[String]) -> Option<String>;
    fn prompt_text(&mut self, title: &str, default: &str) -> Option<String>;
}

/// Single-method status sink: show `text` in the pane called `pane`.
pub trait StatusSink {
    fn set_status(&mut self, text: &str, pane: &str);
}

/// Document switching (`:e name`). Returns the surface now active for `name`.
pub trait Workspace {
    fn open(&mut self, name: &str) -> Option<SurfaceRef>;
}

/// Shell command execution for `!cmd`. `input` is piped to stdin when present.
pub trait ProcessRunner {
    fn run(&mut self, command: &str, input: Option<&str>) -> Result<String>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoDialog;

impl Dialog for NoDialog {
    fn prompt_choice(&mut self, title: &str, choices: &[String]) -> Option<String> {
        debug!(target: "ui.dialog", title, choices = choices.len(), "prompt_choice_cancelled");
        None
    }

    fn prompt_text(&mut self, title: &str, _default: &str) -> Option<String> {
        debug!(target: "ui.dialog", title, "prompt_text_cancelled");
        None
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LogStatus;

impl StatusSink for LogStatus {
    fn set_status(&mut self, text: &str, pane: &str) {
        info!(target: "ui.status", pane, text, "status");
    }
}

/// Dialog + status pair handed to the façades that need user interaction.
pub struct Ui {
    pub dialog: Box<dyn Dialog>,
    pub status: Box<dyn StatusSink>,
}

impl Ui {
    pub fn new(dialog: Box<dyn Dialog>, status: Box<dyn StatusSink>) -> Self {
        Self { dialog, status }
    }
}

impl Default for Ui {
    fn default() -> Self {
        Self::new(Box::new(NoDialog), Box::new(LogStatus))
    }
}

/// Named set of in-memory surfaces; `open` creates an empty surface on first use.
#[derive(Default)]
pub struct SurfaceSet {
    surfaces: BTreeMap<String, SurfaceRef>,
    active: Option<String>,
}

impl SurfaceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, surface: SurfaceRef) {
        let name = name.into();
        if self.active.is_none() {
            self.active = Some(name.clone());
        }
        self.surfaces.insert(name, surface);
    }

    pub fn get(&self, name: &str) -> Option<SurfaceRef> {
        self.surfaces.get(name).cloned()
    }

    pub fn active(&self) -> Option<SurfaceRef> {
        self.active.as_deref().and_then(|n| self.get(n))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.surfaces.keys().map(String::as_str)
    }
}

impl Workspace for SurfaceSet {
    fn open(&mut self, name: &str) -> Option<SurfaceRef> {
        if !self.surfaces.contains_key(name) {
            let surface = TextSurface::new(name, "").ok()?;
            self.surfaces.insert(name.to_string(), into_ref(surface));
            debug!(target: "ui.workspace", name, "surface_created");
        }
        self.active = Some(name.to_string());
        self.get(name)
    }
}

impl<W: Workspace + ?Sized> Workspace for std::rc::Rc<std::cell::RefCell<W>> {
    fn open(&mut self, name: &str) -> Option<SurfaceRef> {
        self.borrow_mut().open(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn open_creates_then_reuses() {
        let mut set = SurfaceSet::new();
        let first = set.open("notes").unwrap();
        let again = set.open("notes").unwrap();
        assert!(Rc::ptr_eq(&first, &again));
        assert!(Rc::ptr_eq(&set.active().unwrap(), &first));
    }

    #[test]
    fn first_inserted_is_active() {
        let mut set = SurfaceSet::new();
        set.insert("a", into_ref(TextSurface::new("a", "x").unwrap()));
        set.insert("b", into_ref(TextSurface::new("b", "y").unwrap()));
        assert_eq!(set.active().unwrap().borrow().text(), "x");
        assert_eq!(set.names().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
