//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Default duration and the five panel presets
//! - Badge colors and the completion glyph
//! - Notification and speech text
//! - Overlay animation and injection delays
//! - Which page URLs never receive an overlay
//!
//! Configuration is stored at `~/.config/tabtimer/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::data_dir;
use crate::error::ConfigError;
use crate::timer::{DEFAULT_MINUTES, MAX_MINUTES, MIN_MINUTES};

/// Duration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "default_minutes")]
    pub default_minutes: u32,
    /// The five duration buttons shown by the panel.
    #[serde(default = "default_presets")]
    pub presets: [u32; 5],
}

/// Toolbar badge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BadgeConfig {
    #[serde(default = "default_running_color")]
    pub running_color: String,
    #[serde(default = "default_complete_color")]
    pub complete_color: String,
    #[serde(default = "default_complete_glyph")]
    pub complete_glyph: String,
    #[serde(default = "default_complete_revert_secs")]
    pub complete_revert_secs: u64,
}

/// Notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_message")]
    pub message: String,
    #[serde(default = "default_true")]
    pub speech_enabled: bool,
    #[serde(default = "default_speech_text")]
    pub speech_text: String,
    #[serde(default = "default_one")]
    pub speech_rate: f32,
    #[serde(default = "default_one")]
    pub speech_pitch: f32,
    #[serde(default = "default_speech_volume")]
    pub speech_volume: f32,
    #[serde(default = "default_speech_lang")]
    pub speech_lang: String,
}

/// Overlay timing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayConfig {
    #[serde(default = "default_hide_animation_ms")]
    pub hide_animation_ms: u64,
    #[serde(default = "default_inject_settle_ms")]
    pub inject_settle_ms: u64,
    #[serde(default = "default_popup_open_delay_ms")]
    pub popup_open_delay_ms: u64,
}

/// Page eligibility configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagesConfig {
    #[serde(default = "default_blocked_prefixes")]
    pub blocked_prefixes: Vec<String>,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/tabtimer/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub badge: BadgeConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub overlay: OverlayConfig,
    #[serde(default)]
    pub pages: PagesConfig,
}

// Default functions
fn default_minutes() -> u32 {
    DEFAULT_MINUTES
}
fn default_presets() -> [u32; 5] {
    [5, 15, 25, 45, 60]
}
fn default_running_color() -> String {
    "#667eea".into()
}
fn default_complete_color() -> String {
    "#48bb78".into()
}
fn default_complete_glyph() -> String {
    "✓".into()
}
fn default_complete_revert_secs() -> u64 {
    5
}
fn default_true() -> bool {
    true
}
fn default_title() -> String {
    "Pomodoro Timer".into()
}
fn default_message() -> String {
    "Time is up! Your Pomodoro session has completed.".into()
}
fn default_speech_text() -> String {
    "Timer completed".into()
}
fn default_one() -> f32 {
    1.0
}
fn default_speech_volume() -> f32 {
    0.7
}
fn default_speech_lang() -> String {
    "en-US".into()
}
fn default_hide_animation_ms() -> u64 {
    300
}
fn default_inject_settle_ms() -> u64 {
    500
}
fn default_popup_open_delay_ms() -> u64 {
    100
}
fn default_blocked_prefixes() -> Vec<String> {
    vec!["chrome://".into(), "chrome-extension://".into()]
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            default_minutes: default_minutes(),
            presets: default_presets(),
        }
    }
}

impl Default for BadgeConfig {
    fn default() -> Self {
        Self {
            running_color: default_running_color(),
            complete_color: default_complete_color(),
            complete_glyph: default_complete_glyph(),
            complete_revert_secs: default_complete_revert_secs(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            title: default_title(),
            message: default_message(),
            speech_enabled: true,
            speech_text: default_speech_text(),
            speech_rate: 1.0,
            speech_pitch: 1.0,
            speech_volume: 0.7,
            speech_lang: default_speech_lang(),
        }
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            hide_animation_ms: 300,
            inject_settle_ms: 500,
            popup_open_delay_ms: 100,
        }
    }
}

impl Default for PagesConfig {
    fn default() -> Self {
        Self {
            blocked_prefixes: default_blocked_prefixes(),
        }
    }
}

impl OverlayConfig {
    pub fn hide_animation(&self) -> Duration {
        Duration::from_millis(self.hide_animation_ms)
    }

    pub fn inject_settle(&self) -> Duration {
        Duration::from_millis(self.inject_settle_ms)
    }

    pub fn popup_open_delay(&self) -> Duration {
        Duration::from_millis(self.popup_open_delay_ms)
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("config.toml"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load from disk or return default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content).map_err(|message| ConfigError::LoadFailed {
                path,
                message,
            }),
            Err(_) => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
        }
    }

    /// Parse TOML and check value ranges.
    pub fn parse(content: &str) -> Result<Self, String> {
        let cfg: Config = toml::from_str(content).map_err(|e| e.to_string())?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), String> {
        let range = MIN_MINUTES..=MAX_MINUTES;
        if !range.contains(&self.timer.default_minutes) {
            return Err(format!(
                "timer.default_minutes must be within {MIN_MINUTES}..={MAX_MINUTES}"
            ));
        }
        if let Some(bad) = self.timer.presets.iter().find(|m| !range.contains(m)) {
            return Err(format!("timer.presets entry {bad} is out of range"));
        }
        Ok(())
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path()?;
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.clone(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(&path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not fit the
    /// existing type or range.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let next: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        next.validate().map_err(|message| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        })?;
        *self = next;
        Ok(())
    }

    /// Set a config value by key and save.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!("Using default configuration: {e}");
                Self::default()
            }
        }
    }
}
