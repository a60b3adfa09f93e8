//! Timer engine implementation.
//!
//! The engine is a pure countdown state machine. It owns no clock and no
//! thread: the Authority drives `tick()` once per second while the engine is
//! `Running`, and turns each returned [`Transition`] into persistence, badge
//! and broadcast side effects.
//!
//! ## State Transitions
//!
//! ```text
//! Stopped --start--> Running --pause--> Paused --start--> Running
//! any --reset--> Stopped
//! any --set_duration--> Stopped
//! Running --tick(remaining hits 0)--> Stopped (remaining = total)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new();
//! engine.start();
//! // Once per second while running:
//! if let Some(Transition::Completed) = engine.tick() { /* notify */ }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::protocol::StateView;
use crate::storage::Snapshot;

pub const DEFAULT_MINUTES: u32 = 25;
pub const MIN_MINUTES: u32 = 1;
pub const MAX_MINUTES: u32 = 999;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Stopped,
    Running,
    Paused,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Running => "running",
            Self::Paused => "paused",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "stopped" => Some(Self::Stopped),
            "running" => Some(Self::Running),
            "paused" => Some(Self::Paused),
            _ => None,
        }
    }
}

/// What a command or tick changed. `None` from an engine method means nothing
/// changed and no side effects are due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Entered `Running`; `resumed` is true when leaving `Paused`.
    Started { resumed: bool },
    Paused,
    Reset { from: Phase },
    /// One second elapsed and time is left.
    Ticked { remaining_secs: u32 },
    /// Remaining time reached zero; the engine is `Stopped` and refilled.
    Completed,
    DurationChanged { minutes: u32, from: Phase },
}

/// Check a duration request against the accepted minute range.
pub fn validate_minutes(minutes: i64) -> Result<u32, ValidationError> {
    if (MIN_MINUTES as i64..=MAX_MINUTES as i64).contains(&minutes) {
        Ok(minutes as u32)
    } else {
        Err(ValidationError::DurationOutOfRange {
            minutes,
            min: MIN_MINUTES,
            max: MAX_MINUTES,
        })
    }
}

/// Parse typed minutes (surrounding whitespace allowed) and range-check them.
pub fn parse_minutes(input: &str) -> Result<u32, ValidationError> {
    let minutes = input
        .trim()
        .parse::<i64>()
        .map_err(|_| ValidationError::NotANumber(input.to_string()))?;
    validate_minutes(minutes)
}

/// `M:SS` with unpadded minutes, e.g. `25:00`, `4:07`, `0:00`.
pub fn format_time(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Core timer engine. The single writer of timer state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerEngine {
    phase: Phase,
    remaining_secs: u32,
    total_secs: u32,
    preset_minutes: u32,
}

impl Default for TimerEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerEngine {
    /// Fresh engine at the default duration, `Stopped`.
    pub fn new() -> Self {
        Self::with_minutes(DEFAULT_MINUTES)
    }

    /// Fresh engine at `minutes`, clamped into the accepted range.
    pub fn with_minutes(minutes: u32) -> Self {
        let minutes = minutes.clamp(MIN_MINUTES, MAX_MINUTES);
        Self {
            phase: Phase::Stopped,
            remaining_secs: minutes * 60,
            total_secs: minutes * 60,
            preset_minutes: minutes,
        }
    }

    /// Rebuild from a persisted snapshot. Missing or out-of-range fields fall
    /// back to the configured default duration.
    pub fn from_snapshot(snapshot: &Snapshot, default_minutes: u32) -> Self {
        let fallback = Self::with_minutes(default_minutes);
        let total_secs = if snapshot.total_seconds > 0 {
            snapshot.total_seconds
        } else {
            fallback.total_secs
        };
        let remaining_secs = if snapshot.remaining_seconds > 0 && snapshot.remaining_seconds <= total_secs {
            snapshot.remaining_seconds
        } else {
            total_secs
        };
        let preset_minutes = if snapshot.current_preset > 0 {
            snapshot.current_preset
        } else {
            fallback.preset_minutes
        };
        Self {
            phase: snapshot.timer_state,
            remaining_secs,
            total_secs,
            preset_minutes,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn total_secs(&self) -> u32 {
        self.total_secs
    }

    pub fn preset_minutes(&self) -> u32 {
        self.preset_minutes
    }

    pub fn time_string(&self) -> String {
        format_time(self.remaining_secs)
    }

    /// Full state as returned to `getState` and pushed in `updateTimerState`.
    pub fn view(&self) -> StateView {
        StateView {
            is_running: self.phase == Phase::Running,
            is_paused: self.phase == Phase::Paused,
            remaining_seconds: self.remaining_secs,
            total_seconds: self.total_secs,
            current_preset: self.preset_minutes,
            time_string: self.time_string(),
        }
    }

    /// The persisted record.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            timer_state: self.phase,
            remaining_seconds: self.remaining_secs,
            total_seconds: self.total_secs,
            current_preset: self.preset_minutes,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self) -> Option<Transition> {
        match self.phase {
            Phase::Running => None,
            from => {
                self.phase = Phase::Running;
                Some(Transition::Started {
                    resumed: from == Phase::Paused,
                })
            }
        }
    }

    pub fn pause(&mut self) -> Option<Transition> {
        if self.phase != Phase::Running {
            return None;
        }
        self.phase = Phase::Paused;
        Some(Transition::Paused)
    }

    pub fn reset(&mut self) -> Option<Transition> {
        let from = self.phase;
        self.phase = Phase::Stopped;
        self.remaining_secs = self.total_secs;
        Some(Transition::Reset { from })
    }

    /// `pause` if running, otherwise `start` (which also resumes).
    pub fn toggle(&mut self) -> Option<Transition> {
        if self.phase == Phase::Running {
            self.pause()
        } else {
            self.start()
        }
    }

    /// Out-of-range minutes leave the engine untouched.
    pub fn set_duration(&mut self, minutes: i64) -> Option<Transition> {
        let minutes = validate_minutes(minutes).ok()?;
        let from = self.phase;
        self.phase = Phase::Stopped;
        self.preset_minutes = minutes;
        self.total_secs = minutes * 60;
        self.remaining_secs = self.total_secs;
        Some(Transition::DurationChanged { minutes, from })
    }

    /// Advance one second. Only meaningful while running.
    pub fn tick(&mut self) -> Option<Transition> {
        if self.phase != Phase::Running {
            return None;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            self.phase = Phase::Stopped;
            self.remaining_secs = self.total_secs;
            return Some(Transition::Completed);
        }
        Some(Transition::Ticked {
            remaining_secs: self.remaining_secs,
        })
    }
}
