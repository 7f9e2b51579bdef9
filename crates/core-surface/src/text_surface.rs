//! In-memory editor surface backed by a rope buffer.

use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Result;
use core_text::{Buffer, Position};
use tracing::trace;

use crate::{EditorSurface, Registers, Selection, SurfaceId};

static NEXT_SURFACE_ID: AtomicU64 = AtomicU64::new(1);

pub struct TextSurface {
    id: SurfaceId,
    buffer: Buffer,
    cursor: Position,
    selection: Option<Selection>,
    readonly: bool,
    focus: bool,
    registers: Registers,
}

impl TextSurface {
    pub fn new(name: impl Into<String>, content: &str) -> Result<Self> {
        let id = SurfaceId(NEXT_SURFACE_ID.fetch_add(1, Ordering::Relaxed));
        Ok(Self {
            id,
            buffer: Buffer::from_str(name, content)?,
            cursor: Position::origin(),
            selection: None,
            readonly: false,
            focus: false,
            registers: Registers::default(),
        })
    }

    fn clamp(&self, pos: Position) -> Position {
        self.buffer.clamp(pos)
    }
}

impl EditorSurface for TextSurface {
    fn id(&self) -> SurfaceId {
        self.id
    }

    fn name(&self) -> &str {
        &self.buffer.name
    }

    fn text(&self) -> String {
        self.buffer.text()
    }

    fn line_count(&self) -> usize {
        self.buffer.line_count()
    }

    fn line(&self, idx: usize) -> Option<String> {
        self.buffer.line(idx)
    }

    fn cursor(&self) -> Position {
        self.cursor
    }

    fn set_cursor(&mut self, pos: Position) {
        self.cursor = self.clamp(pos);
    }

    fn insert(&mut self, pos: Position, text: &str) -> Position {
        let pos = self.clamp(pos);
        let end = self.buffer.insert(pos, text);
        trace!(target: "surface.edit", surface = %self.id, line = pos.line, byte = pos.byte, len = text.len(), "insert");
        end
    }

    fn delete(&mut self, start: Position, end: Position) -> String {
        let a = self.buffer.offset_of(start);
        let b = self.buffer.offset_of(end);
        // A line end position clamps before the terminator; `end` past the last
        // column of a line means "including the newline".
        let b = if end.line < self.buffer.line_count() && end.byte > self.buffer.line_len(end.line) {
            b + 1
        } else {
            b
        };
        let removed = self.buffer.remove(a.min(b), a.max(b));
        trace!(target: "surface.edit", surface = %self.id, len = removed.len(), "delete");
        self.cursor = self.clamp(self.cursor);
        removed
    }

    fn selection(&self) -> Option<Selection> {
        self.selection
    }

    fn select(&mut self, selection: Selection) {
        self.selection = Some(selection);
    }

    fn clear_selection(&mut self) {
        self.selection = None;
    }

    fn is_readonly(&self) -> bool {
        self.readonly
    }

    fn set_readonly(&mut self, readonly: bool) {
        self.readonly = readonly;
    }

    fn has_focus(&self) -> bool {
        self.focus
    }

    fn set_focus(&mut self, focus: bool) {
        self.focus = focus;
    }

    fn register(&self, name: char) -> Option<String> {
        self.registers.get(name).map(str::to_string)
    }

    fn set_register(&mut self, name: char, text: &str) {
        self.registers.set(name, text);
    }
}
