//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Focus timer phase lengths and long-break cadence
//! - The category that absorbs tasks of deleted categories
//! - Daily and weekly focus goals used by the stats summaries
//!
//! Configuration is stored at `~/.config/taskflow/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;
use crate::task::category::FALLBACK_CATEGORY_ID;
use crate::timer::{CycleCounting, TimerSettings};

/// Focus timer configuration, in minutes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "default_work_minutes")]
    pub work_minutes: u32,
    #[serde(default = "default_short_break_minutes")]
    pub short_break_minutes: u32,
    #[serde(default = "default_long_break_minutes")]
    pub long_break_minutes: u32,
    #[serde(default = "default_sessions_before_long_break")]
    pub sessions_before_long_break: u32,
    /// Which completed work sessions count toward the next long break.
    #[serde(default)]
    pub cycle_counting: CycleCounting,
}

/// Task repository configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TasksConfig {
    /// Built-in category receiving tasks whose category is deleted.
    #[serde(default = "default_fallback_category")]
    pub fallback_category: String,
}

/// Focus goals, in minutes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalsConfig {
    #[serde(default = "default_daily_focus_minutes")]
    pub daily_focus_minutes: u32,
    #[serde(default = "default_weekly_focus_minutes")]
    pub weekly_focus_minutes: u32,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/taskflow/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub tasks: TasksConfig,
    #[serde(default)]
    pub goals: GoalsConfig,
}

// Default functions
fn default_work_minutes() -> u32 {
    25
}
fn default_short_break_minutes() -> u32 {
    5
}
fn default_long_break_minutes() -> u32 {
    15
}
fn default_sessions_before_long_break() -> u32 {
    4
}
fn default_fallback_category() -> String {
    FALLBACK_CATEGORY_ID.into()
}
fn default_daily_focus_minutes() -> u32 {
    4 * 60
}
fn default_weekly_focus_minutes() -> u32 {
    25 * 60
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            work_minutes: default_work_minutes(),
            short_break_minutes: default_short_break_minutes(),
            long_break_minutes: default_long_break_minutes(),
            sessions_before_long_break: default_sessions_before_long_break(),
            cycle_counting: CycleCounting::default(),
        }
    }
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            fallback_category: default_fallback_category(),
        }
    }
}

impl Default for GoalsConfig {
    fn default() -> Self {
        Self {
            daily_focus_minutes: default_daily_focus_minutes(),
            weekly_focus_minutes: default_weekly_focus_minutes(),
        }
    }
}

/// `"timer.work_minutes"` -> `"/timer/work_minutes"`.
fn json_pointer(key: &str) -> Option<String> {
    if key.is_empty() || key.split('.').any(str::is_empty) {
        return None;
    }
    Some(format!("/{}", key.replace('.', "/")))
}

/// Parse `raw` into the JSON type already held by `slot`.
fn coerce_like(slot: &serde_json::Value, raw: &str) -> Result<serde_json::Value, String> {
    use serde_json::Value;

    match slot {
        Value::Bool(_) => raw.parse::<bool>().map(Value::Bool).map_err(|e| e.to_string()),
        Value::Number(_) => raw
            .parse::<u64>()
            .map(Value::from)
            .map_err(|_| format!("cannot parse '{raw}' as number")),
        Value::Object(_) | Value::Array(_) => serde_json::from_str(raw).map_err(|e| e.to_string()),
        _ => Ok(Value::String(raw.to_string())),
    }
}

impl Config {
    /// Default location of the config file.
    pub fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("config.toml"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load from the default location, writing defaults on first run.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            let cfg = Self::default();
            cfg.save_to(&path)?;
            Ok(cfg)
        }
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::ParseFailed(e.to_string()))
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// Persist to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Load from disk, returning default on error.
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(error = %e, "falling back to default configuration");
                Self::default()
            }
        }
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        match json.pointer(&json_pointer(key)?)? {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key. Does not write to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not fit the
    /// type of the existing entry.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        let slot = json_pointer(key)
            .and_then(|pointer| json.pointer_mut(&pointer))
            .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        *slot = coerce_like(slot, value).map_err(|message| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        })?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Timer settings in seconds, as consumed by the focus timer.
    pub fn timer_settings(&self) -> TimerSettings {
        TimerSettings {
            work_secs: u64::from(self.timer.work_minutes) * 60,
            short_break_secs: u64::from(self.timer.short_break_minutes) * 60,
            long_break_secs: u64::from(self.timer.long_break_minutes) * 60,
            sessions_before_long_break: self.timer.sessions_before_long_break.max(1),
        }
    }
}
