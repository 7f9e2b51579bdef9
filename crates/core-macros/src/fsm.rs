//! Record / playback state machine.
//!
//! ```text
//!   Idle ──Record──▶ Recording ──Stop──▶ Idle
//!    │                   │
//! Playback            Playback
//!    ▼                   ▼
//! PlayingBack    PlayingBackWhileRecording
//!    │ PlaybackDone      │ PlaybackDone / Stop
//!    ▼                   ▼
//!   Idle             Recording
//! ```
//!
//! Nested playback (a macro invoking another macro) does not add states: a
//! depth counter tracks it and the machine leaves a playback state only when
//! the outermost playback completes. A `Stop` arriving while playing back
//! during a recording cannot end the live recording; it aborts the playback
//! and drops back to `Recording`. The playback loops still report
//! `PlaybackDone` while they unwind; keys are captured again once the last
//! one has.

use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum State {
    #[default]
    Idle,
    Recording,
    PlayingBack,
    PlayingBackWhileRecording,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event<'a> {
    Record(&'a str),
    Stop,
    Playback(&'a str),
    PlaybackDone,
}

/// Text captured by a finished recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    pub name: String,
    pub text: String,
}

/// One active playback: macro name and repeat progress.
#[derive(Debug, Clone)]
struct Frame {
    name: String,
    step: usize,
    steps: usize,
}

#[derive(Debug, Clone)]
pub struct MacrosFsm {
    state: State,
    recording: Option<String>,
    text: String,
    playing: Vec<Frame>,
    max_depth: usize,
    abort: bool,
    finished: Option<Recorded>,
}

impl Default for MacrosFsm {
    fn default() -> Self {
        Self::new(32)
    }
}

impl MacrosFsm {
    pub fn new(max_depth: usize) -> Self {
        Self {
            state: State::Idle,
            recording: None,
            text: String::new(),
            playing: Vec::new(),
            max_depth: max_depth.max(1),
            abort: false,
            finished: None,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.state, State::Recording | State::PlayingBackWhileRecording)
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.state, State::PlayingBack | State::PlayingBackWhileRecording)
    }

    /// Name of the macro being recorded.
    pub fn recording_name(&self) -> Option<&str> {
        self.recording.as_deref()
    }

    /// Name of the innermost macro being played back.
    pub fn playback_name(&self) -> Option<&str> {
        self.playing.last().map(|f| f.name.as_str())
    }

    pub fn depth(&self) -> usize {
        self.playing.len()
    }

    /// Text recorded so far.
    pub fn recorded_text(&self) -> &str {
        &self.text
    }

    /// Repeat progress of the innermost playback as (step, steps).
    pub fn step(&self) -> Option<(usize, usize)> {
        self.playing.last().map(|f| (f.step, f.steps))
    }

    pub fn set_step(&mut self, step: usize, steps: usize) {
        if let Some(frame) = self.playing.last_mut() {
            frame.step = step;
            frame.steps = steps;
        }
    }

    /// Set once a `Stop` aborted the current playback; cleared when the
    /// outermost playback completes.
    pub fn abort_requested(&self) -> bool {
        self.abort
    }

    /// Capture a key typed while recording. Replayed keys are ignored.
    pub fn record_key(&mut self, c: char) {
        if self.state == State::Recording && self.playing.is_empty() {
            self.text.push(c);
        }
    }

    /// Recording completed by the last `Stop`, if any.
    pub fn take_finished(&mut self) -> Option<Recorded> {
        self.finished.take()
    }

    /// Apply `event`. Returns false when the event is not allowed in the
    /// current state (the state is then unchanged).
    pub fn process(&mut self, event: Event<'_>) -> bool {
        use State::*;
        let from = self.state;
        let to = match (from, event) {
            (Idle, Event::Record(name)) => {
                self.recording = Some(name.to_string());
                self.text.clear();
                Recording
            }
            (Recording, Event::Stop) => {
                let name = self.recording.take().unwrap_or_default();
                self.finished = Some(Recorded {
                    name,
                    text: std::mem::take(&mut self.text),
                });
                Idle
            }
            (PlayingBackWhileRecording, Event::Stop) => {
                self.abort = true;
                Recording
            }
            (Idle | Recording | PlayingBack | PlayingBackWhileRecording, Event::Playback(name)) => {
                if self.abort {
                    debug!(target: "vi.macros", name, "playback_refused_after_abort");
                    return false;
                }
                if self.playing.len() >= self.max_depth {
                    warn!(target: "vi.macros", name, depth = self.playing.len(), "playback_depth_exceeded");
                    return false;
                }
                self.playing.push(Frame {
                    name: name.to_string(),
                    step: 0,
                    steps: 0,
                });
                match from {
                    Recording => PlayingBackWhileRecording,
                    Idle => PlayingBack,
                    other => other,
                }
            }
            (PlayingBack | PlayingBackWhileRecording, Event::PlaybackDone) => {
                self.playing.pop();
                if self.playing.is_empty() {
                    self.abort = false;
                    if from == PlayingBack { Idle } else { Recording }
                } else {
                    from
                }
            }
            (Recording, Event::PlaybackDone) if !self.playing.is_empty() => {
                // playback loops unwinding after an abort
                self.playing.pop();
                if self.playing.is_empty() {
                    self.abort = false;
                }
                Recording
            }
            _ => {
                debug!(target: "vi.macros", ?from, ?event, "event_ignored");
                return false;
            }
        };
        self.state = to;
        debug!(target: "vi.macros", ?from, ?to, ?event, depth = self.playing.len(), "fsm_transition");
        true
    }
}
