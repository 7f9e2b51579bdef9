//! Editor surface: the abstract text-buffer / cursor / selection owner the vi
//! core issues commands against, plus the UI collaborators it reports to.
//!
//! The vi engine never names a concrete widget. Everything it needs from the
//! editor is expressed by [`EditorSurface`]; dialogs, status panes, document
//! switching and process execution are separate capability traits in
//! [`collab`]. [`TextSurface`] is the in-memory binding used by the command
//! line driver and the tests.
//!
//! Surfaces are shared through [`SurfaceRef`] (`Rc<RefCell<..>>`). All access
//! happens on the single UI thread; callers keep borrows short and never hold
//! one across a call back into the engine.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

pub use core_text::Position;

pub mod collab;
pub mod registers;
pub mod text_surface;

pub use collab::{
    Dialog, LogStatus, NoDialog, ProcessRunner, StatusSink, SurfaceSet, Ui, Workspace,
};
pub use registers::{Registers, UNNAMED_REGISTER};
pub use text_surface::TextSurface;

/// Shared handle to an editor surface.
pub type SurfaceRef = Rc<RefCell<dyn EditorSurface>>;

/// Wrap a concrete surface into a shared handle.
pub fn into_ref<S: EditorSurface + 'static>(surface: S) -> SurfaceRef {
    Rc::new(RefCell::new(surface))
}

/// Stable identity of a surface for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub u64);

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionKind {
    Characterwise,
    Linewise,
    Blockwise,
}

/// A selection keeps the position where it started (`anchor`) and the moving
/// end (`head`, normally the cursor).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub anchor: Position,
    pub head: Position,
    pub kind: SelectionKind,
}

impl Selection {
    pub fn new(anchor: Position, head: Position, kind: SelectionKind) -> Self {
        Self { anchor, head, kind }
    }

    /// Endpoints ordered so that `start <= end`.
    pub fn ordered(&self) -> (Position, Position) {
        if self.anchor <= self.head {
            (self.anchor, self.head)
        } else {
            (self.head, self.anchor)
        }
    }

    /// Inclusive line range covered by the selection.
    pub fn lines(&self) -> std::ops::RangeInclusive<usize> {
        let (start, end) = self.ordered();
        start.line..=end.line
    }
}

/// Capability set of the widget that owns the text.
///
/// `line` returns content without the line terminator. Positions passed in are
/// clamped by the implementation; out-of-range requests never panic.
pub trait EditorSurface {
    fn id(&self) -> SurfaceId;
    fn name(&self) -> &str;

    fn text(&self) -> String;
    fn line_count(&self) -> usize;
    fn line(&self, idx: usize) -> Option<String>;

    fn cursor(&self) -> Position;
    fn set_cursor(&mut self, pos: Position);

    /// Insert `text` at `pos`; returns the position after the inserted text.
    fn insert(&mut self, pos: Position, text: &str) -> Position;
    /// Delete `[start, end)`; returns the removed text.
    fn delete(&mut self, start: Position, end: Position) -> String;

    fn selection(&self) -> Option<Selection>;
    fn select(&mut self, selection: Selection);
    fn clear_selection(&mut self);

    fn is_readonly(&self) -> bool;
    fn set_readonly(&mut self, readonly: bool);
    fn has_focus(&self) -> bool;
    fn set_focus(&mut self, focus: bool);

    /// Named yank buffer contents.
    fn register(&self, name: char) -> Option<String>;
    fn set_register(&mut self, name: char, text: &str);

    /// Byte length of a line without terminator.
    fn line_len(&self, idx: usize) -> usize {
        self.line(idx).map(|l| l.len()).unwrap_or(0)
    }
}
