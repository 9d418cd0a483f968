//! Statistics module for Taskflow
//!
//! Read-only aggregation over the focus session log and the task list:
//! focus minutes per day and in total, completed task counts, daily
//! summaries, week progress against a goal and focus streaks. Nothing here
//! mutates state; callers pass borrowed snapshots from the timer and the
//! repository.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::task::Task;
use crate::timer::Session;

/// One day's aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub focus_minutes: u64,
    pub completed_tasks: usize,
    /// 0..=100
    pub productivity: u32,
}

/// Progress of one weekday against the daily goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayProgress {
    pub date: NaiveDate,
    /// 0.0 ..= 100.0
    pub progress: f64,
    pub is_today: bool,
}

/// Today's focus time against the daily goal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalProgress {
    /// Rounded, 0..=100
    pub percentage: u32,
    pub total: String,
    pub goal: String,
}

/// Aggregator over borrowed sessions and tasks.
#[derive(Debug, Clone, Copy)]
pub struct FocusStats<'a> {
    sessions: &'a [Session],
    tasks: &'a [Task],
}

impl<'a> FocusStats<'a> {
    pub fn new(sessions: &'a [Session], tasks: &'a [Task]) -> Self {
        Self { sessions, tasks }
    }

    fn focus_sessions(&self) -> impl Iterator<Item = &'a Session> {
        let sessions: &'a [Session] = self.sessions;
        sessions
            .iter()
            .filter(|s| !s.phase.is_break() && !s.is_open())
    }

    /// Nominal minutes of every completed work session.
    pub fn total_focus_minutes(&self) -> u64 {
        self.focus_sessions()
            .map(|s| u64::from(s.duration_minutes))
            .sum()
    }

    /// Minutes of completed work sessions started on `date` (UTC).
    pub fn focus_minutes_for_day(&self, date: NaiveDate) -> u64 {
        self.focus_sessions()
            .filter(|s| s.start_at.date_naive() == date)
            .map(|s| u64::from(s.duration_minutes))
            .sum()
    }

    /// Tasks whose completion was stamped on `date` (UTC).
    pub fn completed_task_count_for_day(&self, date: NaiveDate) -> usize {
        self.tasks
            .iter()
            .filter(|t| t.completed_at.is_some_and(|at| at.date_naive() == date))
            .count()
    }

    pub fn completed_session_count(&self) -> usize {
        self.sessions.iter().filter(|s| !s.is_open()).count()
    }

    pub fn daily_summary(&self, date: NaiveDate) -> DailySummary {
        let focus_minutes = self.focus_minutes_for_day(date);
        let completed_tasks = self.completed_task_count_for_day(date);
        DailySummary {
            date,
            focus_minutes,
            completed_tasks,
            productivity: productivity(completed_tasks, focus_minutes),
        }
    }

    /// Focus minutes from Monday of `today`'s week through `today`.
    pub fn weekly_focus_minutes(&self, today: NaiveDate) -> u64 {
        let monday = week_start(today);
        (0..=today.weekday().num_days_from_monday())
            .map(|offset| self.focus_minutes_for_day(monday + Duration::days(i64::from(offset))))
            .sum()
    }

    /// Monday through Sunday of `today`'s week, each as a percentage of
    /// `daily_goal_minutes` clamped to 100.
    pub fn week_progress(&self, today: NaiveDate, daily_goal_minutes: u32) -> Vec<DayProgress> {
        let monday = week_start(today);
        (0..7)
            .map(|offset| {
                let date = monday + Duration::days(offset);
                DayProgress {
                    date,
                    progress: percent_of(self.focus_minutes_for_day(date), daily_goal_minutes),
                    is_today: date == today,
                }
            })
            .collect()
    }

    pub fn focus_progress(&self, today: NaiveDate, daily_goal_minutes: u32) -> GoalProgress {
        let total = self.focus_minutes_for_day(today);
        GoalProgress {
            percentage: percent_of(total, daily_goal_minutes).round() as u32,
            total: format_minutes(total),
            goal: format_minutes(u64::from(daily_goal_minutes)),
        }
    }

    /// Consecutive days with focus time, ending today (or yesterday when
    /// nothing has been logged yet today).
    pub fn current_streak(&self, today: NaiveDate) -> u32 {
        let mut day = if self.focus_minutes_for_day(today) > 0 {
            today
        } else {
            today - Duration::days(1)
        };
        let mut streak = 0;
        while self.focus_minutes_for_day(day) > 0 {
            streak += 1;
            day -= Duration::days(1);
        }
        streak
    }
}

/// Completed tasks per focused hour, scaled by 10 and capped at 100.
fn productivity(completed_tasks: usize, focus_minutes: u64) -> u32 {
    if focus_minutes == 0 {
        return 0;
    }
    let per_hour = completed_tasks as f64 / (focus_minutes as f64 / 60.0);
    (per_hour * 10.0).min(100.0).round() as u32
}

fn percent_of(minutes: u64, goal_minutes: u32) -> f64 {
    if goal_minutes == 0 {
        return 0.0;
    }
    (minutes as f64 / f64::from(goal_minutes) * 100.0).min(100.0)
}

fn week_start(day: NaiveDate) -> NaiveDate {
    day - Duration::days(i64::from(day.weekday().num_days_from_monday()))
}

/// `"1h 5m"` for an hour or more, `"45m"` otherwise.
pub fn format_minutes(minutes: u64) -> String {
    let hours = minutes / 60;
    let mins = minutes % 60;
    if hours > 0 {
        format!("{hours}h {mins}m")
    } else {
        format!("{mins}m")
    }
}
