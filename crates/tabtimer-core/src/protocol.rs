//! Command messages sent by mirrors to the Authority.
//!
//! Wire shape is `{ "action": <name>, "data": <payload> }`, the same envelope
//! the broadcast side uses (see [`crate::events`]).

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A request from the panel or an overlay. Only `GetState` expects a reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "data", rename_all = "camelCase")]
pub enum Command {
    #[serde(alias = "overlayStart")]
    Start,
    #[serde(alias = "overlayPause")]
    Pause,
    #[serde(alias = "overlayReset")]
    Reset,
    ResetAndOpenPopup,
    ToggleTimer,
    SetPreset(i64),
    SetCustom(i64),
    GetState,
}

impl Command {
    /// Decode one message from the wire.
    pub fn decode(raw: &str) -> Result<Self, ValidationError> {
        serde_json::from_str(raw).map_err(|e| ValidationError::MalformedMessage(e.to_string()))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Pause => "pause",
            Self::Reset => "reset",
            Self::ResetAndOpenPopup => "resetAndOpenPopup",
            Self::ToggleTimer => "toggleTimer",
            Self::SetPreset(_) => "setPreset",
            Self::SetCustom(_) => "setCustom",
            Self::GetState => "getState",
        }
    }
}

/// Full current state, the `getState` reply and `updateTimerState` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateView {
    pub is_running: bool,
    pub is_paused: bool,
    pub remaining_seconds: u32,
    pub total_seconds: u32,
    pub current_preset: u32,
    pub time_string: String,
}
