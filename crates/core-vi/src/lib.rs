//! vi engine.
//!
//! [`Vi`] owns the keystroke path of one editor surface: every key is
//! appended to the pending [`core_command::ExCommand`], classified, and then
//! either waits for more input, runs as a line command, is handed to the macro
//! façade (`q…` / `@…`) or parses into a vi command that edits the surface.
//! Macro playback feeds recorded keys back through the same path.

pub mod calc;
pub mod edit;
pub mod engine;
pub mod ex;
pub mod motion;
pub mod parser;

pub use engine::{MODE_PANE, Vi};
pub use ex::{ExLine, Find, LineExecutor, TEXT_PANE};
pub use parser::{Motion, Parse, ViCommand};

/// Backspace as delivered by most terminals and toolkits.
pub const BACKSPACE: char = '\u{8}';
pub const DELETE: char = '\u{7f}';
