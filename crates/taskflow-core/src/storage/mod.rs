mod config;
pub mod database;
pub mod memory;

pub use config::{Config, GoalsConfig, TasksConfig, TimerConfig};
pub use database::Database;
pub use memory::MemoryStore;

use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::PersistenceError;

/// Key holding the serialized task list.
pub const TASKS_KEY: &str = "taskflow-tasks";
/// Key holding the serialized category list.
pub const CATEGORIES_KEY: &str = "taskflow-categories";
/// Key present only while a focus session is open (running or paused).
pub const ACTIVE_TIMER_KEY: &str = "taskflow-active-timer";
/// Key holding the completed session log.
pub const SESSIONS_KEY: &str = "taskflow-sessions";
/// Key holding the timer settings last applied through `update_settings`.
pub const TIMER_SETTINGS_KEY: &str = "taskflow-timer-settings";

/// String key/value contract the repository and timer persist through.
///
/// Implementations take `&self`; the core is single-threaded and shares one
/// store between components through `Rc<dyn KeyValueStore>`.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;
    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError>;
    fn remove(&self, key: &str) -> Result<(), PersistenceError>;
}

/// Decode the JSON payload stored under `key`.
///
/// `Ok(None)` means the key is absent, which callers treat as "no state".
pub(crate) fn read_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, PersistenceError> {
    match store.get(key)? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| PersistenceError::Malformed {
                key: key.to_string(),
                source,
            }),
        None => Ok(None),
    }
}

/// Encode `value` as JSON and store it under `key`.
pub(crate) fn write_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), PersistenceError> {
    let raw = serde_json::to_string(value).map_err(|source| PersistenceError::Encode {
        key: key.to_string(),
        source,
    })?;
    store.set(key, &raw)
}

/// Returns `~/.config/taskflow[-dev]/` based on TASKFLOW_ENV.
///
/// Set TASKFLOW_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("TASKFLOW_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("taskflow-dev")
    } else {
        base_dir.join("taskflow")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
