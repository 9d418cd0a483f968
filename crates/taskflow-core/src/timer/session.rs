use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Phase;

/// One timed interval in the focus log.
///
/// A session is open while `end_at` is unset. The task id and title are a
/// snapshot taken at start; deleting the task later does not touch them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_title: Option<String>,
    pub start_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_at: Option<DateTime<Utc>>,
    pub phase: Phase,
    /// Nominal phase length, not measured wall-clock time
    #[serde(alias = "duration")]
    pub duration_minutes: u32,
}

impl Session {
    pub(crate) fn open(
        phase: Phase,
        duration_minutes: u32,
        task_id: Option<String>,
        task_title: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            task_id,
            task_title,
            start_at: now,
            end_at: None,
            phase,
            duration_minutes,
        }
    }

    pub fn is_open(&self) -> bool {
        self.end_at.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_session_has_no_end() {
        let session = Session::open(Phase::Work, 25, Some("t1".into()), Some("Write".into()), Utc::now());
        assert!(session.is_open());
        assert_eq!(session.duration_minutes, 25);
        assert!(!session.id.is_empty());
    }

    #[test]
    fn legacy_duration_field_is_accepted() {
        let raw = r#"{"id":"1","taskId":"task1","startAt":"2024-01-01T09:00:00.000Z",
                      "endAt":"2024-01-01T09:25:00.000Z","phase":"work","duration":25}"#;
        let session: Session = serde_json::from_str(raw).unwrap();
        assert_eq!(session.duration_minutes, 25);
        assert!(session.task_title.is_none());
        assert!(!session.is_open());
    }
}
