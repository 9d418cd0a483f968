//! # Taskflow Core Library
//!
//! The stateful engine behind the Taskflow productivity app: a task/category
//! repository with derived views, a phase-based focus timer, and read-only
//! statistics over both. Rendering, navigation and hosting live elsewhere;
//! the host owns the one-second tick and the choice of key/value store.
//!
//! ## Architecture
//!
//! - **Task Repository**: canonical tasks and categories, cached per-category
//!   counts, filters/search/sort views, persisted after every mutation
//! - **Focus Timer**: work / short break / long break state machine driven
//!   by `tick()`, with an append-only session log
//! - **Storage**: `KeyValueStore` contract with SQLite and in-memory
//!   implementations, plus TOML configuration
//! - **Stats**: daily/weekly focus summaries over sessions and tasks
//!
//! ## Key Components
//!
//! - [`TaskRepository`]: task and category CRUD and views
//! - [`FocusTimer`]: focus timer state machine
//! - [`FocusStats`]: aggregation over the session log and task list
//! - [`Database`]: SQLite-backed key/value store
//! - [`Config`]: application configuration management

pub mod error;
pub mod events;
pub mod logging;
pub mod stats;
pub mod storage;
pub mod task;
pub mod timer;

pub use error::{ConfigError, CoreError, InvariantViolation, PersistenceError};
pub use events::Event;
pub use stats::{format_minutes, DailySummary, DayProgress, FocusStats, GoalProgress};
pub use storage::{Config, Database, KeyValueStore, MemoryStore};
pub use task::{
    Category, CategoryPatch, Priority, Task, TaskDraft, TaskFilter, TaskPatch, TaskRepository,
    TaskStatus,
};
pub use timer::{CycleCounting, FocusTimer, Phase, Session, SettingsPatch, TimerSettings};
