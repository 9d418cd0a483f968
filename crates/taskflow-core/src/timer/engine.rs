//! Focus timer engine.
//!
//! A phase state machine (work / short break / long break) with an
//! orthogonal running flag. It owns no thread or timer: the host calls
//! `tick()` once per second while the timer runs.
//!
//! ## State Transitions
//!
//! ```text
//! Work -> ShortBreak -> Work -> ... -> Work -> LongBreak -> Work
//! ```
//!
//! Every `sessions_before_long_break`-th completed work session is followed
//! by a long break. `set_phase()` and `reset()` jump directly and discard the
//! open session instead of logging it.
//!
//! ## Usage
//!
//! ```ignore
//! let mut timer = FocusTimer::load(store, config.timer_settings(), config.timer.cycle_counting);
//! timer.start(Some(task.id.clone()), Some(task.title.clone()));
//! // Once per second:
//! if let Some(Event::PhaseCompleted { next, .. }) = timer.tick() { /* notify */ }
//! ```

use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::phase::{CycleCounting, Phase, SettingsPatch, TimerSettings};
use super::session::Session;
use crate::events::Event;
use crate::storage::{
    read_json, write_json, KeyValueStore, ACTIVE_TIMER_KEY, SESSIONS_KEY, TIMER_SETTINGS_KEY,
};

/// Title reported when the active session is not tied to a task.
pub const NO_TASK_TITLE: &str = "No task";

/// Persisted record of an open session, present only while one exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveTimer {
    pub phase: Phase,
    pub time_left_secs: u64,
    pub session: Session,
}

/// Core focus timer.
pub struct FocusTimer {
    settings: TimerSettings,
    cycle_counting: CycleCounting,
    phase: Phase,
    /// Remaining seconds in the current phase.
    time_left_secs: u64,
    is_running: bool,
    active_session: Option<Session>,
    /// Append-only log of completed sessions.
    sessions: Vec<Session>,
    store: Rc<dyn KeyValueStore>,
    degraded: bool,
}

impl FocusTimer {
    /// Create an idle timer in the work phase with an empty session log.
    pub fn new(
        store: Rc<dyn KeyValueStore>,
        settings: TimerSettings,
        cycle_counting: CycleCounting,
    ) -> Self {
        let mut settings = settings;
        settings.merge(SettingsPatch::default());
        Self {
            time_left_secs: settings.length_of(Phase::Work),
            settings,
            cycle_counting,
            phase: Phase::Work,
            is_running: false,
            active_session: None,
            sessions: Vec::new(),
            store,
            degraded: false,
        }
    }

    /// Restore the timer from `store`.
    ///
    /// Settings saved through [`update_settings`](Self::update_settings)
    /// take precedence over `settings`. An open session comes back paused at
    /// the remaining time it was persisted with. Malformed payloads are
    /// logged and ignored.
    pub fn load(
        store: Rc<dyn KeyValueStore>,
        settings: TimerSettings,
        cycle_counting: CycleCounting,
    ) -> Self {
        let mut timer = Self::new(store, settings, cycle_counting);

        if let Some(saved) = timer.read::<TimerSettings>(TIMER_SETTINGS_KEY) {
            timer.settings = saved;
            timer.settings.merge(SettingsPatch::default());
            timer.time_left_secs = timer.phase_length_secs();
        }
        if let Some(sessions) = timer.read::<Vec<Session>>(SESSIONS_KEY) {
            timer.sessions = sessions;
        }
        if let Some(active) = timer.read::<ActiveTimer>(ACTIVE_TIMER_KEY) {
            timer.phase = active.phase;
            timer.time_left_secs = active.time_left_secs.min(timer.phase_length_secs());
            timer.active_session = Some(active.session);
        }

        tracing::debug!(
            phase = %timer.phase,
            sessions = timer.sessions.len(),
            restored = timer.active_session.is_some(),
            "focus timer loaded"
        );
        timer
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    pub fn time_left_secs(&self) -> u64 {
        self.time_left_secs
    }

    pub fn settings(&self) -> &TimerSettings {
        &self.settings
    }

    pub fn cycle_counting(&self) -> CycleCounting {
        self.cycle_counting
    }

    pub fn active_session(&self) -> Option<&Session> {
        self.active_session.as_ref()
    }

    /// Completed sessions, oldest first.
    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn completed_session_count(&self) -> usize {
        self.sessions.iter().filter(|s| !s.is_open()).count()
    }

    /// Configured length of the current phase in seconds.
    pub fn phase_length_secs(&self) -> u64 {
        self.settings.length_of(self.phase)
    }

    /// 0.0 .. 100.0 progress within the current phase.
    pub fn progress_pct(&self) -> f64 {
        let total = self.phase_length_secs();
        if total == 0 {
            return 0.0;
        }
        let elapsed = total as f64 - self.time_left_secs as f64;
        (elapsed / total as f64 * 100.0).clamp(0.0, 100.0)
    }

    /// Remaining time as `MM:SS`.
    pub fn formatted_time(&self) -> String {
        format!(
            "{:02}:{:02}",
            self.time_left_secs / 60,
            self.time_left_secs % 60
        )
    }

    pub fn current_task_title(&self) -> &str {
        self.active_session
            .as_ref()
            .and_then(|s| s.task_title.as_deref())
            .unwrap_or(NO_TASK_TITLE)
    }

    /// `true` after a failed write, until the next successful one.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            phase: self.phase,
            is_running: self.is_running,
            time_left_secs: self.time_left_secs,
            total_secs: self.phase_length_secs(),
            progress_pct: self.progress_pct(),
            task_title: self
                .active_session
                .as_ref()
                .and_then(|s| s.task_title.clone()),
            at: Utc::now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Open a session for the current phase and start counting down.
    ///
    /// Ineffective while running. With a paused session open this resumes it
    /// rather than opening a second one.
    pub fn start(&mut self, task_id: Option<String>, task_title: Option<String>) -> Option<Event> {
        if self.is_running {
            return None;
        }
        if self.active_session.is_some() {
            return self.resume();
        }

        let now = Utc::now();
        let session = Session::open(
            self.phase,
            self.settings.minutes_of(self.phase),
            task_id.clone(),
            task_title,
            now,
        );
        tracing::debug!(session_id = %session.id, phase = %self.phase, "focus session opened");
        self.active_session = Some(session);
        self.is_running = true;
        self.persist_active();

        Some(Event::TimerStarted {
            phase: self.phase,
            duration_secs: self.phase_length_secs(),
            task_id,
            at: now,
        })
    }

    /// Advance the countdown by one second. Returns the completion event on
    /// the tick that reaches zero.
    pub fn tick(&mut self) -> Option<Event> {
        if !self.is_running {
            return None;
        }
        self.time_left_secs = self.time_left_secs.saturating_sub(1);
        if self.time_left_secs == 0 {
            return self.complete_phase();
        }
        self.persist_active();
        None
    }

    /// Stop counting down, keeping the session open and the remaining time.
    pub fn pause(&mut self) -> Option<Event> {
        if !self.is_running {
            return None;
        }
        self.is_running = false;
        self.persist_active();
        Some(Event::TimerPaused {
            time_left_secs: self.time_left_secs,
            at: Utc::now(),
        })
    }

    /// Continue a paused session from the preserved remaining time.
    pub fn resume(&mut self) -> Option<Event> {
        if self.is_running || self.active_session.is_none() {
            return None;
        }
        self.is_running = true;
        self.persist_active();
        Some(Event::TimerResumed {
            time_left_secs: self.time_left_secs,
            at: Utc::now(),
        })
    }

    /// Close the open session into the log and move to the next phase.
    pub fn complete_phase(&mut self) -> Option<Event> {
        let now = Utc::now();
        self.is_running = false;

        let logged = self.active_session.take().map(|mut session| {
            session.end_at = Some(now);
            self.sessions.push(session.clone());
            session
        });

        let completed = self.phase;
        let next = self.next_phase(now);
        self.phase = next;
        self.time_left_secs = self.phase_length_secs();

        tracing::info!(completed = %completed, next = %next, logged = logged.is_some(), "phase completed");
        self.persist_active();
        if logged.is_some() {
            self.persist_sessions();
        }

        Some(Event::PhaseCompleted {
            completed,
            next,
            session: logged,
            at: now,
        })
    }

    /// Jump to `phase` at its full length, discarding any open session.
    pub fn set_phase(&mut self, phase: Phase) -> Option<Event> {
        self.discard_session();
        self.phase = phase;
        self.time_left_secs = self.phase_length_secs();
        self.persist_active();
        Some(Event::PhaseChanged {
            phase,
            duration_secs: self.time_left_secs,
            at: Utc::now(),
        })
    }

    /// Back to an idle work phase, discarding any open session.
    pub fn reset(&mut self) -> Option<Event> {
        self.discard_session();
        self.phase = Phase::Work;
        self.time_left_secs = self.phase_length_secs();
        self.persist_active();
        Some(Event::TimerReset { at: Utc::now() })
    }

    /// Merge new settings. While not running the current phase restarts at
    /// its new length.
    pub fn update_settings(&mut self, patch: SettingsPatch) -> Option<Event> {
        self.settings.merge(patch);
        if !self.is_running {
            self.time_left_secs = self.phase_length_secs();
        }
        self.persist_active();
        if let Err(e) = write_json(self.store.as_ref(), TIMER_SETTINGS_KEY, &self.settings) {
            self.report_write_failure(TIMER_SETTINGS_KEY, &e);
        }
        Some(Event::SettingsUpdated {
            settings: self.settings,
            at: Utc::now(),
        })
    }

    pub fn set_cycle_counting(&mut self, cycle_counting: CycleCounting) {
        self.cycle_counting = cycle_counting;
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn next_phase(&self, now: DateTime<Utc>) -> Phase {
        match self.phase {
            Phase::Work => {
                let completed = self.completed_work_sessions(now);
                let cadence = self.settings.sessions_before_long_break.max(1) as usize;
                if completed > 0 && completed % cadence == 0 {
                    Phase::LongBreak
                } else {
                    Phase::ShortBreak
                }
            }
            Phase::ShortBreak | Phase::LongBreak => Phase::Work,
        }
    }

    fn completed_work_sessions(&self, now: DateTime<Utc>) -> usize {
        let today = now.date_naive();
        self.sessions
            .iter()
            .filter(|s| !s.phase.is_break())
            .filter_map(|s| s.end_at)
            .filter(|end| match self.cycle_counting {
                CycleCounting::Lifetime => true,
                CycleCounting::Daily => end.date_naive() == today,
            })
            .count()
    }

    fn discard_session(&mut self) {
        self.is_running = false;
        if let Some(session) = self.active_session.take() {
            tracing::debug!(session_id = %session.id, "focus session discarded");
        }
    }

    fn read<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        match read_json(self.store.as_ref(), key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "failed to load timer state; ignoring");
                None
            }
        }
    }

    fn persist_active(&mut self) {
        let result = match &self.active_session {
            Some(session) => {
                let record = ActiveTimer {
                    phase: self.phase,
                    time_left_secs: self.time_left_secs,
                    session: session.clone(),
                };
                write_json(self.store.as_ref(), ACTIVE_TIMER_KEY, &record)
            }
            None => self.store.remove(ACTIVE_TIMER_KEY),
        };
        match result {
            Ok(()) => self.degraded = false,
            Err(e) => self.report_write_failure(ACTIVE_TIMER_KEY, &e),
        }
    }

    fn persist_sessions(&mut self) {
        if let Err(e) = write_json(self.store.as_ref(), SESSIONS_KEY, &self.sessions) {
            self.report_write_failure(SESSIONS_KEY, &e);
        }
    }

    fn report_write_failure(&mut self, key: &str, error: &crate::error::PersistenceError) {
        tracing::warn!(key, error = %error, "failed to persist timer state; continuing unpersisted");
        self.degraded = true;
    }
}
