//! vi mode handling (Normal / Insert / Visual variants).
//!
//! [`fsm::ModeFsm`] is the pure state machine: it only knows states and
//! triggers. [`ViMode`] is the façade the engine talks to: it classifies
//! command text into a trigger, asks the machine for the next state and fires
//! the [`ModeListener`] callbacks.

pub mod fsm;

pub use fsm::{Mode, ModeFsm, Trigger, VisualKind};
use tracing::debug;

pub const ESC: char = '\u{1b}';
pub const CTRL_V: char = '\u{16}';

/// Side effects of mode changes.
pub trait ModeListener {
    /// Entered insert (or block insert) because of `command`.
    fn on_insert(&mut self, _command: &str, _block: bool) {}
    /// Returned to Normal from `from`.
    fn on_normal(&mut self, _from: Mode) {}
}

/// Listener that ignores every callback.
pub struct NoopListener;

impl ModeListener for NoopListener {}

#[derive(Debug, Default, Clone)]
pub struct ViMode {
    fsm: ModeFsm,
}

impl ViMode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Mode {
        self.fsm.state()
    }

    pub fn is_insert(&self) -> bool {
        self.get().is_insert()
    }

    pub fn is_visual(&self) -> bool {
        self.get().is_visual()
    }

    /// Status bar label.
    pub fn label(&self) -> &'static str {
        self.get().label()
    }

    /// Feed command text. Returns true iff the text is a mode trigger in the
    /// current state, even when `readonly` kept the mode from changing.
    pub fn transition(
        &mut self,
        command: &str,
        readonly: bool,
        listener: &mut dyn ModeListener,
    ) -> bool {
        let from = self.get();
        let Some(trigger) = Trigger::classify(command, from) else {
            return false;
        };
        let to = self.fsm.transition(trigger, readonly);
        debug!(target: "vi.mode", ?from, ?to, ?trigger, command, readonly, "transition");
        self.notify(from, to, command, listener);
        true
    }

    /// Force Normal from any state. Returns whether the mode changed.
    pub fn escape(&mut self, listener: &mut dyn ModeListener) -> bool {
        let from = self.get();
        let to = self.fsm.transition(Trigger::Escape, false);
        debug!(target: "vi.mode", ?from, ?to, "escape");
        self.notify(from, to, "\u{1b}", listener);
        from != to
    }

    fn notify(&self, from: Mode, to: Mode, command: &str, listener: &mut dyn ModeListener) {
        if from == to {
            return;
        }
        match to {
            Mode::Insert => listener.on_insert(command, false),
            Mode::InsertBlock => listener.on_insert(command, true),
            Mode::Normal => listener.on_normal(from),
            _ => {}
        }
    }
}
