//! # Tabtimer Core Library
//!
//! Core logic for a Pomodoro countdown that lives in the browser: a single
//! background Authority owns the timer, a floating overlay mirrors it inside
//! every page, and a popup panel mirrors it with full controls.
//!
//! ## Architecture
//!
//! - **Timer Engine**: a pure state machine (`Stopped`, `Running`, `Paused`)
//!   advanced one second per `tick()`
//! - **Authority**: the tokio task that owns the engine, the interval, the
//!   snapshot store, and fans every change out to the mirrors
//! - **Mirrors**: [`OverlayAgent`] and [`PanelView`] rebuild their display
//!   from pushed messages and never mutate timer state
//! - **Storage**: SQLite key/value snapshot and TOML configuration
//! - **Host**: the platform seam (tabs, popup, badge, notifications)
//!
//! Delivery to mirrors is best effort and at most once. Nothing is retried.

pub mod authority;
pub mod error;
pub mod events;
pub mod host;
pub mod overlay;
pub mod panel;
pub mod protocol;
pub mod storage;
pub mod timer;

pub use authority::{Authority, AuthorityHandle};
pub use error::{ConfigError, CoreError, DeliveryError, StorageError, ValidationError};
pub use events::{OverlayMessage, PanelMessage};
pub use host::{Badge, Host, LocalHost, Tab};
pub use overlay::{OverlayAgent, PageContext};
pub use panel::PanelView;
pub use protocol::{Command, StateView};
pub use storage::{Config, Database, MemoryStore, Snapshot, SnapshotStore};
pub use timer::{format_time, Phase, TimerEngine, Transition};
