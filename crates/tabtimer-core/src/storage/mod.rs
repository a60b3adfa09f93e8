mod config;
pub mod database;
mod memory;
mod snapshot;

pub use config::{BadgeConfig, Config, NotificationsConfig, OverlayConfig, PagesConfig, TimerConfig};
pub use database::Database;
pub use memory::MemoryStore;
pub use snapshot::{restore_engine, Snapshot, SnapshotStore};

use std::path::PathBuf;

use crate::error::StorageError;

/// Returns `~/.config/tabtimer[-dev]/` based on TABTIMER_ENV.
///
/// Set TABTIMER_ENV=dev to use the development data directory, or
/// TABTIMER_DATA_DIR to pick the directory outright.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, StorageError> {
    let dir = match std::env::var_os("TABTIMER_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("TABTIMER_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("tabtimer-dev")
            } else {
                base_dir.join("tabtimer")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(StorageError::DataDir)?;
    Ok(dir)
}
