use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::StorageError;
use crate::timer::{Phase, TimerEngine};

/// The persisted key/value record. Written after every state change, read
/// once when the Authority starts and once by each overlay on page load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub timer_state: Phase,
    pub remaining_seconds: u32,
    pub total_seconds: u32,
    pub current_preset: u32,
}

impl Snapshot {
    /// Whether a freshly loaded overlay should show itself.
    pub fn overlay_visible(&self) -> bool {
        matches!(self.timer_state, Phase::Running | Phase::Paused) && self.remaining_seconds > 0
    }
}

/// Where snapshots live. `load` returns `None` when nothing has been saved yet.
pub trait SnapshotStore: Send + 'static {
    fn load(&self) -> Result<Option<Snapshot>, StorageError>;
    fn save(&self, snapshot: &Snapshot) -> Result<(), StorageError>;
}

/// Build the engine from whatever the store has, falling back to defaults on
/// an empty store or a read failure.
pub fn restore_engine(store: &dyn SnapshotStore, default_minutes: u32) -> TimerEngine {
    match store.load() {
        Ok(Some(snapshot)) => TimerEngine::from_snapshot(&snapshot, default_minutes),
        Ok(None) => TimerEngine::with_minutes(default_minutes),
        Err(e) => {
            warn!("Error loading state: {e}");
            TimerEngine::with_minutes(default_minutes)
        }
    }
}
