//! Pending command buffer (`ex_command`).
//!
//! An [`ExCommand`] owns the text typed so far plus the editor surface the
//! command will run against. Its [`CommandKind`] is a pure function of the
//! first character and is recomputed on every mutation.
//!
//! The surface binding is a swappable handle. Executing a command may switch
//! documents (`:e other`) and rebind it; callers that must survive such a side
//! effect clone the command first and [`ExCommand::restore`] it afterwards.

use std::fmt;
use std::rc::Rc;

use core_surface::{SurfaceId, SurfaceRef};
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandKind {
    #[default]
    None,
    /// `:` ex command line.
    Command,
    /// `=` calculator.
    Calc,
    /// `!` shell command.
    Exec,
    /// `/` or `?` search.
    Find,
    /// Anything else: a vi motion / operator command.
    Vi,
}

impl CommandKind {
    pub fn classify(text: &str) -> Self {
        match text.chars().next() {
            None => CommandKind::None,
            Some(':') => CommandKind::Command,
            Some('=') => CommandKind::Calc,
            Some('!') => CommandKind::Exec,
            Some('/') | Some('?') => CommandKind::Find,
            Some(_) => CommandKind::Vi,
        }
    }

    /// Kinds that are edited as a line and executed on Enter.
    pub fn is_line(self) -> bool {
        matches!(
            self,
            CommandKind::Command | CommandKind::Calc | CommandKind::Exec | CommandKind::Find
        )
    }
}

/// Runs a complete command against the surface bound to it.
pub trait CommandExecutor {
    fn execute(&mut self, command: &mut ExCommand) -> bool;
}

#[derive(Clone, Default)]
pub struct ExCommand {
    text: String,
    kind: CommandKind,
    surface: Option<SurfaceRef>,
}

impl fmt::Debug for ExCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExCommand")
            .field("text", &self.text)
            .field("kind", &self.kind)
            .field("surface", &self.surface_id())
            .finish()
    }
}

impl ExCommand {
    pub fn new(surface: Option<SurfaceRef>) -> Self {
        Self {
            text: String::new(),
            kind: CommandKind::None,
            surface,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn surface(&self) -> Option<&SurfaceRef> {
        self.surface.as_ref()
    }

    pub fn surface_id(&self) -> Option<SurfaceId> {
        self.surface.as_ref().map(|s| s.borrow().id())
    }

    /// Rebind to another surface (or unbind).
    pub fn set_surface(&mut self, surface: Option<SurfaceRef>) {
        debug!(target: "vi.command", from = ?self.surface_id(), to = ?surface.as_ref().map(|s| s.borrow().id()), "surface_rebind");
        self.surface = surface;
    }

    /// Whether both commands target the same surface instance.
    pub fn is_same_surface(&self, other: &ExCommand) -> bool {
        match (&self.surface, &other.surface) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }

    pub fn set(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.reclassify();
    }

    pub fn append(&mut self, c: char) {
        self.text.push(c);
        self.reclassify();
    }

    pub fn append_str(&mut self, text: &str) {
        self.text.push_str(text);
        self.reclassify();
    }

    /// Remove the last character (command line backspace).
    pub fn pop(&mut self) -> Option<char> {
        let c = self.text.pop();
        self.reclassify();
        c
    }

    /// Append `c` and execute the result. Returns whether execution ran.
    pub fn append_exec(&mut self, c: char, executor: &mut dyn CommandExecutor) -> bool {
        self.append(c);
        self.exec(executor)
    }

    /// Execute through `executor`. Fails without a bound surface.
    pub fn exec(&mut self, executor: &mut dyn CommandExecutor) -> bool {
        if self.surface.is_none() {
            debug!(target: "vi.command", text = %self.text, "exec_without_surface");
            return false;
        }
        trace!(target: "vi.command", text = %self.text, kind = ?self.kind, "exec");
        executor.execute(self)
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.kind = CommandKind::None;
    }

    /// Replace text and surface binding with `other`'s.
    pub fn restore(&mut self, other: &ExCommand) {
        debug!(target: "vi.command", text = %other.text, surface = ?other.surface_id(), "restore");
        self.text = other.text.clone();
        self.kind = other.kind;
        self.surface = other.surface.clone();
    }

    fn reclassify(&mut self) {
        self.kind = CommandKind::classify(&self.text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_surface::{TextSurface, into_ref};
    use proptest::prelude::*;

    struct Echo(Vec<String>);

    impl CommandExecutor for Echo {
        fn execute(&mut self, command: &mut ExCommand) -> bool {
            self.0.push(command.text().to_string());
            true
        }
    }

    fn surface() -> SurfaceRef {
        into_ref(TextSurface::new("t", "abc").unwrap())
    }

    #[test]
    fn classification_by_first_char() {
        assert_eq!(CommandKind::classify(""), CommandKind::None);
        assert_eq!(CommandKind::classify(":w"), CommandKind::Command);
        assert_eq!(CommandKind::classify("=1+1"), CommandKind::Calc);
        assert_eq!(CommandKind::classify("!ls"), CommandKind::Exec);
        assert_eq!(CommandKind::classify("/x"), CommandKind::Find);
        assert_eq!(CommandKind::classify("?x"), CommandKind::Find);
        assert_eq!(CommandKind::classify("dw"), CommandKind::Vi);
    }

    #[test]
    fn mutation_reclassifies() {
        let mut cmd = ExCommand::new(None);
        cmd.append(':');
        assert_eq!(cmd.kind(), CommandKind::Command);
        cmd.pop();
        assert_eq!(cmd.kind(), CommandKind::None);
        cmd.set("yy");
        assert_eq!(cmd.kind(), CommandKind::Vi);
        cmd.clear();
        assert!(cmd.is_empty());
        assert_eq!(cmd.kind(), CommandKind::None);
    }

    #[test]
    fn exec_without_surface_fails() {
        let mut cmd = ExCommand::new(None);
        let mut echo = Echo(Vec::new());
        assert!(!cmd.append_exec('x', &mut echo));
        assert!(echo.0.is_empty());
    }

    #[test]
    fn append_exec_runs_with_surface() {
        let mut cmd = ExCommand::new(Some(surface()));
        cmd.set(":1");
        let mut echo = Echo(Vec::new());
        assert!(cmd.append_exec('0', &mut echo));
        assert_eq!(echo.0, vec![":10".to_string()]);
    }

    #[test]
    fn restore_brings_back_text_and_binding() {
        let first = surface();
        let mut cmd = ExCommand::new(Some(first.clone()));
        cmd.set(":e");
        let saved = cmd.clone();
        cmd.set_surface(Some(surface()));
        cmd.set("x");
        assert!(!cmd.is_same_surface(&saved));
        cmd.restore(&saved);
        assert!(cmd.is_same_surface(&saved));
        assert_eq!(cmd.text(), ":e");
        assert_eq!(cmd.kind(), CommandKind::Command);
    }

    proptest! {
        #[test]
        fn classify_is_idempotent(text in ".{0,12}") {
            let mut cmd = ExCommand::new(None);
            cmd.set(text.clone());
            let first = cmd.kind();
            cmd.set(text.clone());
            prop_assert_eq!(first, cmd.kind());
            prop_assert_eq!(first, CommandKind::classify(&text));
        }

        #[test]
        fn clear_always_yields_none(text in ".{0,12}") {
            let mut cmd = ExCommand::new(None);
            cmd.set(text);
            cmd.clear();
            prop_assert!(cmd.is_empty());
            prop_assert_eq!(cmd.kind(), CommandKind::None);
        }
    }
}
