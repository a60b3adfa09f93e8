use std::sync::{Arc, Mutex};

use super::{Snapshot, SnapshotStore};
use crate::error::StorageError;

/// In-memory snapshot store. Clones share the same slot, so a test can hand
/// one clone to the Authority and inspect the other.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    snapshot: Option<Snapshot>,
    writes: usize,
    fail: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        let store = Self::new();
        store.lock().snapshot = Some(snapshot);
        store
    }

    /// Make every subsequent load and save fail.
    pub fn set_failing(&self, fail: bool) {
        self.lock().fail = fail;
    }

    pub fn current(&self) -> Option<Snapshot> {
        self.lock().snapshot
    }

    /// Number of successful saves.
    pub fn writes(&self) -> usize {
        self.lock().writes
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        // A poisoned slot still holds a valid snapshot.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self) -> Result<Option<Snapshot>, StorageError> {
        let inner = self.lock();
        if inner.fail {
            return Err(StorageError::Unavailable("memory store is failing".into()));
        }
        Ok(inner.snapshot)
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), StorageError> {
        let mut inner = self.lock();
        if inner.fail {
            return Err(StorageError::Unavailable("memory store is failing".into()));
        }
        inner.snapshot = Some(*snapshot);
        inner.writes += 1;
        Ok(())
    }
}
