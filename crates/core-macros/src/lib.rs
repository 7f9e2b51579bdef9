//! Macro recording, playback and variable expansion.
//!
//! - [`registry::Macros`]: the session-owned store of recorded macros and
//!   variables, persisted as TOML.
//! - [`fsm::MacrosFsm`]: the record/playback state machine.
//! - [`mode::ViMacrosMode`]: façade that interprets `q…` / `@…` command text,
//!   prompts through the dialog collaborator and reports on the status pane.
//!
//! Playback itself is driven by the engine that owns the keystroke path: the
//! façade answers with a [`mode::Request`] and the engine feeds the recorded
//! keys back through itself between `begin_playback` and `end_playback`.

pub mod fsm;
pub mod mode;
pub mod registry;
pub mod variable;

pub use fsm::{Event, MacrosFsm, Recorded, State};
pub use mode::{Request, Transition, ViMacrosMode};
pub use registry::Macros;
pub use variable::{ExpandContext, Variable, VariableKind};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MacrosError {
    #[error("unknown variable: {0}")]
    UnknownVariable(String),
    #[error("input cancelled for: {0}")]
    Cancelled(String),
    #[error("template nesting too deep at: {0}")]
    TemplateDepth(String),
    #[error("invalid macro name: {0:?}")]
    InvalidName(String),
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
