use serde::{Deserialize, Serialize};

use crate::protocol::StateView;

/// Broadcast from the Authority to the panel (and anything else listening on
/// the runtime channel). Best effort, at most once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "action",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum PanelMessage {
    TimerStarted,
    TimerPaused,
    TimerReset,
    TimerCompleted,
    PresetChanged {
        preset: u32,
    },
    TimerUpdate {
        remaining_seconds: u32,
        time_string: String,
    },
}

/// Control message for the overlay agent living in one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "data", rename_all = "camelCase")]
pub enum OverlayMessage {
    ShowOverlay,
    HideOverlay,
    UpdateTimer(String),
    UpdateTimerState(StateView),
}
