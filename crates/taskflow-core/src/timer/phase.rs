use serde::{Deserialize, Serialize};
use std::fmt;

/// Focus timer phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Work,
    ShortBreak,
    LongBreak,
}

impl Phase {
    pub fn is_break(self) -> bool {
        !matches!(self, Phase::Work)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Work => write!(f, "work"),
            Phase::ShortBreak => write!(f, "short_break"),
            Phase::LongBreak => write!(f, "long_break"),
        }
    }
}

/// Which completed work sessions count toward the next long break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleCounting {
    /// Every work session in the log.
    #[default]
    Lifetime,
    /// Only work sessions that ended on the current (UTC) day.
    Daily,
}

/// Phase lengths in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSettings {
    pub work_secs: u64,
    pub short_break_secs: u64,
    pub long_break_secs: u64,
    /// Work sessions per long break; always at least 1.
    pub sessions_before_long_break: u32,
}

impl TimerSettings {
    /// Configured length of `phase` in seconds.
    pub fn length_of(&self, phase: Phase) -> u64 {
        match phase {
            Phase::Work => self.work_secs,
            Phase::ShortBreak => self.short_break_secs,
            Phase::LongBreak => self.long_break_secs,
        }
    }

    /// Nominal length of `phase` in whole minutes, as recorded on sessions.
    pub fn minutes_of(&self, phase: Phase) -> u32 {
        u32::try_from(self.length_of(phase) / 60).unwrap_or(u32::MAX)
    }

    /// Merge `patch` into these settings.
    pub fn merge(&mut self, patch: SettingsPatch) {
        if let Some(secs) = patch.work_secs {
            self.work_secs = secs;
        }
        if let Some(secs) = patch.short_break_secs {
            self.short_break_secs = secs;
        }
        if let Some(secs) = patch.long_break_secs {
            self.long_break_secs = secs;
        }
        if let Some(n) = patch.sessions_before_long_break {
            self.sessions_before_long_break = n;
        }
        self.sessions_before_long_break = self.sessions_before_long_break.max(1);
    }
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            work_secs: 25 * 60,
            short_break_secs: 5 * 60,
            long_break_secs: 15 * 60,
            sessions_before_long_break: 4,
        }
    }
}

/// Partial settings update. `None` keeps the current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettingsPatch {
    pub work_secs: Option<u64>,
    pub short_break_secs: Option<u64>,
    pub long_break_secs: Option<u64>,
    pub sessions_before_long_break: Option<u32>,
}
