//! Derived task views: conjunctive filters, text search and the default
//! presentation order.

use std::cmp::Ordering;

use super::{Priority, Task, TaskStatus};

/// Conjunctive task filter. Unset predicates match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub category_id: Option<String>,
    pub priority: Option<Priority>,
    pub search_text: Option<String>,
}

impl TaskFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn category(mut self, category_id: impl Into<String>) -> Self {
        self.category_id = Some(category_id.into());
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search_text = Some(text.into());
        self
    }

    pub fn matches(&self, task: &Task) -> bool {
        if self.status.is_some_and(|s| s != task.status) {
            return false;
        }
        if self
            .category_id
            .as_deref()
            .is_some_and(|c| c != task.category_id)
        {
            return false;
        }
        if self.priority.is_some_and(|p| p != task.priority) {
            return false;
        }
        match self.search_text.as_deref() {
            Some(text) => matches_query(task, text),
            None => true,
        }
    }
}

/// Case-insensitive substring match over title, description and tags.
/// A blank query matches every task.
pub fn matches_query(task: &Task, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    task.title.to_lowercase().contains(&needle)
        || task
            .description
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(&needle))
        || task
            .tags
            .iter()
            .any(|tag| tag.to_lowercase().contains(&needle))
}

/// Default presentation order: active before completed, then priority high
/// to low, then newest first.
pub fn presentation_order(a: &Task, b: &Task) -> Ordering {
    a.is_completed()
        .cmp(&b.is_completed())
        .then_with(|| b.priority.cmp(&a.priority))
        .then_with(|| b.created_at.cmp(&a.created_at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn task(id: &str, status: TaskStatus, priority: Priority, age_min: i64) -> Task {
        Task {
            id: id.into(),
            title: format!("Task {id}"),
            description: None,
            category_id: "work".into(),
            priority,
            status,
            created_at: Utc::now() - Duration::minutes(age_min),
            due_at: None,
            estimated_minutes: None,
            spent_minutes: 0,
            tags: Vec::new(),
            completed_at: None,
        }
    }

    #[test]
    fn search_covers_title_description_and_tags() {
        let mut t = task("1", TaskStatus::Active, Priority::Low, 0);
        t.title = "Refactor Parser".into();
        t.description = Some("Split the LEXER out".into());
        t.tags = vec!["Backend".into()];

        assert!(matches_query(&t, "parser"));
        assert!(matches_query(&t, "lexer"));
        assert!(matches_query(&t, "backEND"));
        assert!(matches_query(&t, "   "));
        assert!(!matches_query(&t, "frontend"));
    }

    #[test]
    fn filter_is_conjunctive() {
        let t = task("1", TaskStatus::Active, Priority::High, 0);
        assert!(TaskFilter::new().matches(&t));
        assert!(TaskFilter::new()
            .status(TaskStatus::Active)
            .priority(Priority::High)
            .category("work")
            .matches(&t));
        assert!(!TaskFilter::new()
            .status(TaskStatus::Active)
            .priority(Priority::Low)
            .matches(&t));
        assert!(!TaskFilter::new().category("health").matches(&t));
        assert!(!TaskFilter::new().search("nothing").matches(&t));
    }

    #[test]
    fn presentation_order_ranks_status_priority_then_recency() {
        let mut tasks = vec![
            task("done-high", TaskStatus::Completed, Priority::High, 0),
            task("low-new", TaskStatus::Active, Priority::Low, 1),
            task("high-old", TaskStatus::Active, Priority::High, 30),
            task("high-new", TaskStatus::Active, Priority::High, 2),
            task("medium", TaskStatus::Active, Priority::Medium, 5),
        ];
        tasks.sort_by(presentation_order);
        let ids: Vec<_> = tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["high-new", "high-old", "medium", "low-new", "done-high"]
        );
    }
}
