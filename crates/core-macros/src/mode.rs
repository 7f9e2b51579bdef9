//! `q` / `@` command interpretation on top of [`MacrosFsm`].

use std::cell::RefCell;
use std::rc::Rc;

use core_config::MacrosConfig;
use core_surface::Ui;
use tracing::{debug, info};

use crate::fsm::{Event, MacrosFsm, State};
use crate::registry::Macros;
use crate::variable::ExpandContext;

/// Work the engine must do after a successful transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Replay macro `name` `repeat` times.
    Playback { name: String, repeat: usize },
    /// Insert the expansion of variable `name` `repeat` times.
    Expand { name: String, repeat: usize },
}

/// Outcome of [`ViMacrosMode::transition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Not a macro command.
    Ignored,
    /// Not resolvable yet; wait for more characters.
    Incomplete,
    /// Dialog closed without a choice. Nothing changed.
    Cancelled,
    /// Name could not be resolved. The status pane says which.
    NotFound,
    /// `consumed` characters of the command were handled.
    Done {
        consumed: usize,
        request: Option<Request>,
    },
}

impl Transition {
    /// Numeric form: 0 not handled / incomplete, 1 cancelled, 2 not found,
    /// otherwise the number of characters consumed.
    ///
    /// The codes overlap: `Done` with one or two characters consumed reads
    /// the same as `Cancelled` / `NotFound`. Match on the variant to tell
    /// them apart; the number is for logs.
    pub fn code(&self) -> usize {
        match self {
            Transition::Ignored | Transition::Incomplete => 0,
            Transition::Cancelled => 1,
            Transition::NotFound => 2,
            Transition::Done { consumed, .. } => *consumed,
        }
    }

    pub fn is_incomplete(&self) -> bool {
        matches!(self, Transition::Incomplete)
    }
}

pub struct ViMacrosMode {
    fsm: MacrosFsm,
    macros: Rc<RefCell<Macros>>,
    pane: String,
}

impl ViMacrosMode {
    pub fn new(macros: Rc<RefCell<Macros>>, config: &MacrosConfig) -> Self {
        Self {
            fsm: MacrosFsm::new(config.max_depth),
            macros,
            pane: config.status_pane.clone(),
        }
    }

    pub fn fsm(&self) -> &MacrosFsm {
        &self.fsm
    }

    pub fn fsm_mut(&mut self) -> &mut MacrosFsm {
        &mut self.fsm
    }

    pub fn macros(&self) -> &Rc<RefCell<Macros>> {
        &self.macros
    }

    pub fn pane(&self) -> &str {
        &self.pane
    }

    pub fn is_recording(&self) -> bool {
        self.fsm.is_recording()
    }

    pub fn is_playing(&self) -> bool {
        self.fsm.is_playing()
    }

    /// Capture a live key for the active recording.
    pub fn record_key(&mut self, c: char) {
        self.fsm.record_key(c);
    }

    /// Status text describing the machine ("recording a", "playing b").
    pub fn status_label(&self) -> String {
        match self.fsm.state() {
            State::Idle => String::new(),
            State::Recording => format!("recording {}", self.fsm.recording_name().unwrap_or("")),
            State::PlayingBack | State::PlayingBackWhileRecording => {
                let name = self.fsm.playback_name().unwrap_or("");
                match self.fsm.step() {
                    Some((step, steps)) if steps > 1 => format!("playing {name} ({step}/{steps})"),
                    _ => format!("playing {name}"),
                }
            }
        }
    }

    /// Interpret `command` (starting with `q` or `@`).
    pub fn transition(
        &mut self,
        command: &str,
        complete: bool,
        repeat: usize,
        ui: &mut Ui,
    ) -> Transition {
        if command.is_empty() || repeat == 0 {
            return Transition::Incomplete;
        }
        let consumed = command.chars().count();
        let mut chars = command.chars();
        let first = chars.next();
        let rest = chars.as_str();
        let result = match first {
            Some('q') => self.transition_record(rest, consumed, complete, ui),
            Some('@') => self.transition_playback(rest, consumed, complete, repeat, ui),
            _ => Transition::Ignored,
        };
        debug!(
            target: "vi.macros",
            command,
            complete,
            repeat,
            state = ?self.fsm.state(),
            code = result.code(),
            "macro_transition"
        );
        result
    }

    fn transition_record(
        &mut self,
        name: &str,
        consumed: usize,
        complete: bool,
        ui: &mut Ui,
    ) -> Transition {
        match self.fsm.state() {
            State::Recording => {
                self.fsm.process(Event::Stop);
                if let Some(recorded) = self.fsm.take_finished() {
                    let mut macros = self.macros.borrow_mut();
                    macros.set(&recorded.name, &recorded.text);
                    macros.set_last(&recorded.name);
                    info!(target: "vi.macros", name = %recorded.name, len = recorded.text.len(), "recording_stored");
                    ui.status.set_status(&format!("recorded {}", recorded.name), &self.pane);
                }
                return Transition::Done {
                    consumed: 1,
                    request: None,
                };
            }
            State::PlayingBackWhileRecording => {
                self.fsm.process(Event::Stop);
                ui.status.set_status("playback aborted", &self.pane);
                return Transition::Done {
                    consumed: 1,
                    request: None,
                };
            }
            State::PlayingBack => {
                // swallow the whole `q<name>` so the name is not run as a command
                if name.is_empty() && !complete {
                    return Transition::Incomplete;
                }
                debug!(target: "vi.macros", name, "record_ignored_during_playback");
                return Transition::Done {
                    consumed,
                    request: None,
                };
            }
            State::Idle => {}
        }
        let name = if name.is_empty() {
            if !complete {
                return Transition::Incomplete;
            }
            match ui.dialog.prompt_text("Enter Macro", "") {
                Some(name) => name,
                None => return Transition::Cancelled,
            }
        } else {
            name.to_string()
        };
        if !Macros::is_valid_name(&name) {
            ui.status.set_status(&format!("invalid macro name: {name}"), &self.pane);
            return Transition::NotFound;
        }
        self.fsm.process(Event::Record(&name));
        info!(target: "vi.macros", name = %name, "recording_started");
        ui.status.set_status(&format!("recording {name}"), &self.pane);
        Transition::Done {
            consumed,
            request: None,
        }
    }

    fn transition_playback(
        &mut self,
        rest: &str,
        consumed: usize,
        complete: bool,
        repeat: usize,
        ui: &mut Ui,
    ) -> Transition {
        if rest.is_empty() {
            if !complete {
                return Transition::Incomplete;
            }
            return self.choose(None, consumed, repeat, ui);
        }
        if rest == "@" {
            let last = self.macros.borrow().last().map(str::to_string);
            return match last {
                Some(name) => self.resolve(&name, consumed, repeat, ui),
                None => self.choose(None, consumed, repeat, ui),
            };
        }
        if let Some(inner) = rest.strip_suffix('@') {
            let name = inner
                .strip_prefix('(')
                .and_then(|s| s.strip_suffix(')'))
                .unwrap_or(inner);
            return self.resolve(name, consumed, repeat, ui);
        }
        if rest.starts_with('(') {
            if complete {
                ui.status.set_status(&format!("unknown macro: {rest}"), &self.pane);
                return Transition::NotFound;
            }
            return Transition::Incomplete;
        }
        let candidates = self.macros.borrow().candidates(rest);
        match candidates.as_slice() {
            [] => {
                ui.status.set_status(&format!("unknown macro: {rest}"), &self.pane);
                if complete {
                    Transition::NotFound
                } else {
                    Transition::Incomplete
                }
            }
            [only] => {
                ui.status.set_status(only, &self.pane);
                let only = only.clone();
                self.resolve(&only, consumed, repeat, ui)
            }
            many => {
                if complete && many.iter().any(|c| c == rest) {
                    return self.resolve(rest, consumed, repeat, ui);
                }
                ui.status.set_status(rest, &self.pane);
                if complete {
                    let many = many.to_vec();
                    self.choose(Some(&many), consumed, repeat, ui)
                } else {
                    Transition::Incomplete
                }
            }
        }
    }

    fn choose(
        &mut self,
        candidates: Option<&[String]>,
        consumed: usize,
        repeat: usize,
        ui: &mut Ui,
    ) -> Transition {
        let choices = match candidates {
            Some(c) => c.to_vec(),
            None => self.macros.borrow().macro_names(),
        };
        if choices.is_empty() {
            ui.status.set_status("no macros", &self.pane);
            return Transition::NotFound;
        }
        match ui.dialog.prompt_choice("Select Macro", &choices) {
            Some(name) => self.resolve(&name, consumed, repeat, ui),
            None => Transition::Cancelled,
        }
    }

    fn resolve(&mut self, name: &str, consumed: usize, repeat: usize, ui: &mut Ui) -> Transition {
        let request = {
            let macros = self.macros.borrow();
            if macros.is_recorded(name) {
                Some(Request::Playback {
                    name: name.to_string(),
                    repeat,
                })
            } else if macros.is_variable(name) {
                Some(Request::Expand {
                    name: name.to_string(),
                    repeat,
                })
            } else {
                None
            }
        };
        match request {
            Some(request) => Transition::Done {
                consumed,
                request: Some(request),
            },
            None => {
                ui.status.set_status(&format!("unknown macro: {name}"), &self.pane);
                Transition::NotFound
            }
        }
    }

    /// Enter playback of `name`. Returns the keys to replay, or `None` when
    /// the macro is unknown or nesting is too deep.
    pub fn begin_playback(&mut self, name: &str, ui: &mut Ui) -> Option<String> {
        let Some(keys) = self.macros.borrow().get(name).map(str::to_string) else {
            ui.status.set_status(&format!("unknown macro: {name}"), &self.pane);
            return None;
        };
        if !self.fsm.process(Event::Playback(name)) {
            ui.status.set_status(&format!("cannot play {name}"), &self.pane);
            return None;
        }
        if self.fsm.depth() == 1 {
            self.macros.borrow_mut().set_last(name);
        }
        Some(keys)
    }

    pub fn end_playback(&mut self) {
        self.fsm.process(Event::PlaybackDone);
    }

    /// Expand variable `name`; failures are reported on the status pane.
    pub fn expand(&mut self, name: &str, filename: &str, line: usize, ui: &mut Ui) -> Option<String> {
        let mut ctx = ExpandContext {
            filename,
            line,
            dialog: &mut *ui.dialog,
        };
        let result = self.macros.borrow_mut().expand(name, &mut ctx);
        match result {
            Ok(text) => Some(text),
            Err(e) => {
                ui.status.set_status(&e.to_string(), &self.pane);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variable::{Variable, VariableKind};
    use core_surface::{Dialog, StatusSink};
    use pretty_assertions::assert_eq;

    #[derive(Clone, Default)]
    struct Shared(Rc<RefCell<Vec<String>>>);

    impl StatusSink for Shared {
        fn set_status(&mut self, text: &str, _pane: &str) {
            self.0.borrow_mut().push(text.to_string());
        }
    }

    struct Scripted(Option<String>);

    impl Dialog for Scripted {
        fn prompt_choice(&mut self, _title: &str, choices: &[String]) -> Option<String> {
            self.0.clone().filter(|c| choices.contains(c))
        }
        fn prompt_text(&mut self, _title: &str, _default: &str) -> Option<String> {
            self.0.clone()
        }
    }

    fn setup(answer: Option<&str>) -> (ViMacrosMode, Ui, Shared) {
        let mut macros = Macros::new();
        macros.set("me1", "x");
        macros.set("me2", "y");
        macros.set_variable(Variable::new("Who", VariableKind::Fixed, "me"));
        let status = Shared::default();
        let ui = Ui::new(
            Box::new(Scripted(answer.map(str::to_string))),
            Box::new(status.clone()),
        );
        let mode = ViMacrosMode::new(Rc::new(RefCell::new(macros)), &MacrosConfig::default());
        (mode, ui, status)
    }

    fn playback(name: &str, repeat: usize, consumed: usize) -> Transition {
        Transition::Done {
            consumed,
            request: Some(Request::Playback {
                name: name.into(),
                repeat,
            }),
        }
    }

    #[test]
    fn ambiguous_prefix_waits_and_full_name_plays() {
        let (mut mode, mut ui, status) = setup(None);
        let t = mode.transition("@me", false, 1, &mut ui);
        assert_eq!(t, Transition::Incomplete);
        assert_eq!(t.code(), 0);
        assert_eq!(status.0.borrow().last().unwrap(), "me");
        assert_eq!(mode.transition("@me1", false, 1, &mut ui), playback("me1", 1, 4));
    }

    #[test]
    fn unique_prefix_autocompletes() {
        let (mut mode, mut ui, status) = setup(None);
        assert_eq!(
            mode.transition("@W", false, 1, &mut ui),
            Transition::Done {
                consumed: 2,
                request: Some(Request::Expand {
                    name: "Who".into(),
                    repeat: 1
                })
            }
        );
        assert_eq!(status.0.borrow().last().unwrap(), "Who");
    }

    #[test]
    fn unknown_prefix_waits_until_complete() {
        let (mut mode, mut ui, status) = setup(None);
        assert_eq!(mode.transition("@zz", false, 1, &mut ui), Transition::Incomplete);
        assert!(status.0.borrow().last().unwrap().contains("zz"));
        let t = mode.transition("@zz", true, 1, &mut ui);
        assert_eq!(t.code(), 2);
    }

    #[test]
    fn bare_at_needs_completion_then_dialog() {
        let (mut mode, mut ui, _) = setup(None);
        assert_eq!(mode.transition("@", false, 1, &mut ui), Transition::Incomplete);
        assert_eq!(mode.transition("@", true, 1, &mut ui), Transition::Cancelled);
        let (mut mode, mut ui, _) = setup(Some("me2"));
        assert_eq!(mode.transition("@", true, 2, &mut ui), playback("me2", 2, 1));
    }

    #[test]
    fn at_at_uses_last_or_dialog() {
        let (mut mode, mut ui, _) = setup(None);
        assert_eq!(mode.transition("@@", false, 1, &mut ui), Transition::Cancelled);
        mode.macros().borrow_mut().set_last("me1");
        assert_eq!(mode.transition("@@", false, 1, &mut ui), playback("me1", 1, 2));
    }

    #[test]
    fn trailing_sigil_and_bracket_forms() {
        let (mut mode, mut ui, _) = setup(None);
        assert_eq!(mode.transition("@me1@", false, 1, &mut ui), playback("me1", 1, 5));
        assert_eq!(mode.transition("@me@", false, 1, &mut ui), Transition::NotFound);
        assert_eq!(mode.transition("@(me", false, 1, &mut ui), Transition::Incomplete);
        assert_eq!(
            mode.transition("@(Who)@", false, 1, &mut ui),
            Transition::Done {
                consumed: 7,
                request: Some(Request::Expand {
                    name: "Who".into(),
                    repeat: 1
                })
            }
        );
    }

    #[test]
    fn complete_ambiguous_prefers_exact_then_dialog() {
        let mut macros = Macros::new();
        macros.set("a", "x");
        macros.set("ab", "y");
        let mut mode = ViMacrosMode::new(Rc::new(RefCell::new(macros)), &MacrosConfig::default());
        let mut ui = Ui::new(Box::new(Scripted(Some("ab".into()))), Box::new(Shared::default()));
        assert_eq!(mode.transition("@a", false, 1, &mut ui), Transition::Incomplete);
        assert_eq!(mode.transition("@a", true, 1, &mut ui), playback("a", 1, 2));

        mode.macros().borrow_mut().erase("a");
        mode.macros().borrow_mut().set("abc", "z");
        assert_eq!(mode.transition("@a", true, 1, &mut ui), playback("ab", 1, 2));
    }

    #[test]
    fn invalid_preconditions_are_noops() {
        let (mut mode, mut ui, _) = setup(None);
        assert_eq!(mode.transition("", true, 1, &mut ui), Transition::Incomplete);
        assert_eq!(mode.transition("@me1", true, 0, &mut ui), Transition::Incomplete);
        assert_eq!(mode.transition("x", true, 1, &mut ui), Transition::Ignored);
        assert_eq!(mode.fsm().state(), State::Idle);
    }

    #[test]
    fn qa_records_until_bare_q() {
        let (mut mode, mut ui, _) = setup(None);
        assert_eq!(
            mode.transition("qa", true, 1, &mut ui),
            Transition::Done {
                consumed: 2,
                request: None
            }
        );
        assert_eq!(mode.fsm().state(), State::Recording);
        assert_eq!(mode.status_label(), "recording a");
        for c in "dd".chars() {
            mode.record_key(c);
        }
        assert_eq!(mode.transition("q", false, 1, &mut ui).code(), 1);
        assert_eq!(mode.fsm().state(), State::Idle);
        assert_eq!(mode.macros().borrow().get("a"), Some("dd"));
        assert_eq!(mode.macros().borrow().last(), Some("a"));
    }

    #[test]
    fn bare_q_prompts_for_name() {
        let (mut mode, mut ui, _) = setup(None);
        assert_eq!(mode.transition("q", false, 1, &mut ui), Transition::Incomplete);
        assert_eq!(mode.transition("q", true, 1, &mut ui), Transition::Cancelled);
        assert_eq!(mode.fsm().state(), State::Idle);

        let (mut mode, mut ui, _) = setup(Some("long_name"));
        assert!(matches!(mode.transition("q", true, 1, &mut ui), Transition::Done { .. }));
        assert_eq!(mode.fsm().recording_name(), Some("long_name"));
    }

    #[test]
    fn invalid_record_name_reports() {
        let (mut mode, mut ui, status) = setup(None);
        assert_eq!(mode.transition("q!", false, 1, &mut ui), Transition::NotFound);
        assert!(status.0.borrow().last().unwrap().contains("invalid"));
        assert_eq!(mode.fsm().state(), State::Idle);
    }

    #[test]
    fn begin_playback_tracks_last_for_outermost_only() {
        let (mut mode, mut ui, _) = setup(None);
        assert_eq!(mode.begin_playback("me1", &mut ui).as_deref(), Some("x"));
        assert_eq!(mode.begin_playback("me2", &mut ui).as_deref(), Some("y"));
        assert_eq!(mode.macros().borrow().last(), Some("me1"));
        mode.end_playback();
        mode.end_playback();
        assert_eq!(mode.fsm().state(), State::Idle);
        assert!(mode.begin_playback("nope", &mut ui).is_none());
    }

    #[test]
    fn record_during_playback_waits_for_the_name() {
        let (mut mode, mut ui, _) = setup(None);
        mode.begin_playback("me1", &mut ui);
        assert_eq!(mode.transition("q", false, 1, &mut ui), Transition::Incomplete);
        assert_eq!(
            mode.transition("qa", false, 1, &mut ui),
            Transition::Done {
                consumed: 2,
                request: None
            }
        );
        assert_eq!(mode.fsm().state(), State::PlayingBack);
        assert!(!mode.is_recording());
    }

    #[test]
    fn status_label_shows_repeat_progress() {
        let (mut mode, mut ui, _) = setup(None);
        mode.begin_playback("me1", &mut ui);
        assert_eq!(mode.status_label(), "playing me1");
        mode.fsm_mut().set_step(2, 3);
        assert_eq!(mode.status_label(), "playing me1 (2/3)");
        mode.begin_playback("me2", &mut ui);
        assert_eq!(mode.status_label(), "playing me2");
        mode.end_playback();
        assert_eq!(mode.status_label(), "playing me1 (2/3)");
    }

    #[test]
    fn codes_overlap_but_variants_differ() {
        let stopped = Transition::Done {
            consumed: 1,
            request: None,
        };
        assert_eq!(stopped.code(), Transition::Cancelled.code());
        assert_ne!(stopped, Transition::Cancelled);
        assert_eq!(playback("a", 1, 2).code(), Transition::NotFound.code());
        assert_ne!(playback("a", 1, 2), Transition::NotFound);
    }

    #[test]
    fn expand_reports_failures() {
        let (mut mode, mut ui, status) = setup(None);
        assert_eq!(mode.expand("Who", "f", 0, &mut ui).as_deref(), Some("me"));
        assert!(mode.expand("Nope", "f", 0, &mut ui).is_none());
        assert!(status.0.borrow().last().unwrap().contains("unknown variable"));
    }
}
