//! Panel view model: the transient popup with full controls.
//!
//! Created fresh each time the popup opens, seeded from a `getState` reply and
//! then kept current by merging broadcast messages. Everything the popup
//! renders is derived here so a front end only copies fields out.

use std::f64::consts::PI;
use std::time::Duration;

use crate::events::PanelMessage;
use crate::protocol::{Command, StateView};
use crate::timer::{format_time, parse_minutes, DEFAULT_MINUTES};

/// Radius of the progress ring, in the popup's SVG units.
pub const RING_RADIUS: f64 = 54.0;
/// How long the completion highlight stays on.
pub const CELEBRATION: Duration = Duration::from_secs(3);

pub const STATUS_INVALID_CUSTOM: &str = "Please enter a valid time (1-999 minutes)";

#[derive(Debug, Clone, PartialEq)]
pub struct PanelView {
    state: StateView,
    presets: [u32; 5],
    active_preset: Option<u32>,
    status: String,
    celebrating: bool,
}

impl PanelView {
    /// What the popup shows before its `getState` request is answered.
    pub fn placeholder(presets: [u32; 5]) -> Self {
        let total = DEFAULT_MINUTES * 60;
        Self::from_state(
            StateView {
                is_running: false,
                is_paused: false,
                remaining_seconds: total,
                total_seconds: total,
                current_preset: DEFAULT_MINUTES,
                time_string: format_time(total),
            },
            presets,
        )
    }

    pub fn from_state(state: StateView, presets: [u32; 5]) -> Self {
        let mut view = Self {
            state,
            presets,
            active_preset: None,
            status: String::new(),
            celebrating: false,
        };
        view.highlight_preset(view.state.current_preset);
        view
    }

    /// Replace the mirrored state wholesale (a fresh `getState` reply).
    pub fn replace(&mut self, state: StateView) {
        self.highlight_preset(state.current_preset);
        self.state = state;
    }

    /// Merge one broadcast.
    pub fn apply(&mut self, message: &PanelMessage) {
        match message {
            PanelMessage::TimerStarted => {
                self.set_phase(true, false);
                self.status = "Timer running...".into();
            }
            PanelMessage::TimerPaused => {
                self.set_phase(false, true);
                self.status = "Timer paused".into();
            }
            PanelMessage::TimerReset => {
                self.set_phase(false, false);
                self.set_remaining(self.state.total_seconds);
                self.status = "Timer reset".into();
            }
            PanelMessage::TimerCompleted => {
                self.set_phase(false, false);
                self.set_remaining(self.state.total_seconds);
                self.status = "Timer completed! Ready to start again.".into();
                self.celebrating = true;
            }
            PanelMessage::PresetChanged { preset } => {
                self.state.current_preset = *preset;
                self.state.total_seconds = preset * 60;
                self.set_remaining(preset * 60);
                self.highlight_preset(*preset);
                self.status = format!("Timer set to {preset} minutes");
            }
            PanelMessage::TimerUpdate {
                remaining_seconds, ..
            } => self.set_remaining(*remaining_seconds),
        }
    }

    fn set_phase(&mut self, is_running: bool, is_paused: bool) {
        self.state.is_running = is_running;
        self.state.is_paused = is_paused;
    }

    fn set_remaining(&mut self, seconds: u32) {
        self.state.remaining_seconds = seconds;
        self.state.time_string = format_time(seconds);
    }

    fn highlight_preset(&mut self, minutes: u32) {
        self.active_preset = self.presets.contains(&minutes).then_some(minutes);
    }

    // ── Derived display ─────────────────────────────────────────────

    pub fn state(&self) -> &StateView {
        &self.state
    }

    pub fn minutes_text(&self) -> String {
        format!("{:02}", self.state.remaining_seconds / 60)
    }

    pub fn seconds_text(&self) -> String {
        format!("{:02}", self.state.remaining_seconds % 60)
    }

    /// Remaining share of the total, 1.0 when full.
    pub fn progress(&self) -> f64 {
        if self.state.total_seconds == 0 {
            return 0.0;
        }
        self.state.remaining_seconds as f64 / self.state.total_seconds as f64
    }

    /// Stroke dash offset for the ring: 0 when full, the circumference when empty.
    pub fn ring_dash_offset(&self) -> f64 {
        let circumference = 2.0 * PI * RING_RADIUS;
        circumference - self.progress() * circumference
    }

    pub fn start_enabled(&self) -> bool {
        !self.state.is_running
    }

    pub fn pause_enabled(&self) -> bool {
        self.state.is_running
    }

    pub fn start_label(&self) -> &'static str {
        if self.state.is_running {
            "Running..."
        } else if self.state.is_paused {
            "Resume"
        } else {
            "Start"
        }
    }

    pub fn presets(&self) -> [u32; 5] {
        self.presets
    }

    pub fn active_preset(&self) -> Option<u32> {
        self.active_preset
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn is_celebrating(&self) -> bool {
        self.celebrating
    }

    /// Called [`CELEBRATION`] after completion.
    pub fn finish_celebration(&mut self) {
        self.celebrating = false;
    }

    // ── User actions ────────────────────────────────────────────────

    pub fn start(&self) -> Command {
        Command::Start
    }

    pub fn pause(&self) -> Command {
        Command::Pause
    }

    pub fn reset(&self) -> Command {
        Command::Reset
    }

    pub fn select_preset(&self, minutes: u32) -> Command {
        Command::SetPreset(minutes as i64)
    }

    /// Validate the custom-minutes field. Invalid input sets the status line
    /// and sends nothing.
    pub fn submit_custom(&mut self, input: &str) -> Option<Command> {
        match parse_minutes(input) {
            Ok(minutes) => Some(Command::SetCustom(minutes as i64)),
            Err(_) => {
                self.status = STATUS_INVALID_CUSTOM.into();
                None
            }
        }
    }
}
