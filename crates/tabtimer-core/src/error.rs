//! Core error types for tabtimer-core.
//!
//! The Authority never lets any of these escape its event loop: storage
//! failures are logged and replaced by defaults, delivery failures are
//! swallowed. They exist so the seams (store, host, config) can report what
//! went wrong to whoever logs it.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for tabtimer-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Snapshot persistence errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A message could not reach a mirror
    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The authority task is gone
    #[error("Timer authority is not running")]
    AuthorityClosed,
}

/// Snapshot store errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(#[from] rusqlite::Error),

    /// A stored value could not be decoded
    #[error("Corrupt value for key '{key}': {value}")]
    Corrupt { key: String, value: String },

    /// The backing store refused the operation
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Could not resolve or create the data directory
    #[error("Data directory unavailable: {0}")]
    DataDir(#[source] std::io::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Key does not exist in the config tree
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Best-effort delivery failures between the Authority and its mirrors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// No popup is open to receive the message
    #[error("No receiver is listening")]
    NoReceiver,

    /// The page has no agent, or refuses one
    #[error("Tab {tab_id} cannot receive messages")]
    TabUnreachable { tab_id: u32 },

    /// Script injection refused (privileged page, closed tab, ...)
    #[error("Injection into tab {tab_id} failed: {reason}")]
    InjectionRefused { tab_id: u32, reason: String },
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Duration outside the accepted minute range
    #[error("Duration {minutes} is outside {min}..={max} minutes")]
    DurationOutOfRange { minutes: i64, min: u32, max: u32 },

    /// Duration input was not a number
    #[error("Not a number of minutes: '{0}'")]
    NotANumber(String),

    /// A wire message could not be decoded
    #[error("Malformed message: {0}")]
    MalformedMessage(String),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
