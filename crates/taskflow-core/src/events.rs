use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::{Phase, Session, TimerSettings};

/// Every effective focus timer command produces an Event.
/// The host polls them to drive notifications and redraws.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        phase: Phase,
        duration_secs: u64,
        task_id: Option<String>,
        at: DateTime<Utc>,
    },
    TimerPaused {
        time_left_secs: u64,
        at: DateTime<Utc>,
    },
    TimerResumed {
        time_left_secs: u64,
        at: DateTime<Utc>,
    },
    /// A phase ran to zero (or was completed by hand) and its session was
    /// logged.
    PhaseCompleted {
        completed: Phase,
        next: Phase,
        session: Option<Session>,
        at: DateTime<Utc>,
    },
    /// Manual phase switch; any open session was discarded.
    PhaseChanged {
        phase: Phase,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        at: DateTime<Utc>,
    },
    SettingsUpdated {
        settings: TimerSettings,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        phase: Phase,
        is_running: bool,
        time_left_secs: u64,
        total_secs: u64,
        progress_pct: f64,
        task_title: Option<String>,
        at: DateTime<Utc>,
    },
}
