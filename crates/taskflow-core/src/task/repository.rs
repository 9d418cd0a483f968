//! Task/category repository.
//!
//! Owns the canonical task and category lists. Every mutation re-derives the
//! cached category counts and writes both lists through the shared
//! [`KeyValueStore`] before returning. Write failures are logged and leave
//! the repository running in a degraded, unpersisted mode.
//!
//! ## Usage
//!
//! ```ignore
//! let store: Rc<dyn KeyValueStore> = Rc::new(Database::open()?);
//! let mut repo = TaskRepository::load(store, &config.tasks.fallback_category);
//! let task = repo.add_task(TaskDraft::new("Write report", "work"))?;
//! repo.toggle_status(&task.id);
//! ```

use std::rc::Rc;

use chrono::{DateTime, Duration, NaiveDate, Utc};

use super::category::{Category, CategoryPatch, FALLBACK_CATEGORY_ID};
use super::filter::{matches_query, presentation_order, TaskFilter};
use super::{normalize_tags, Priority, Task, TaskDraft, TaskPatch, TaskStatus};
use crate::error::{InvariantViolation, PersistenceError};
use crate::storage::{read_json, write_json, KeyValueStore, CATEGORIES_KEY, TASKS_KEY};

/// Window used by [`TaskRepository::upcoming_tasks`].
const UPCOMING_WINDOW_DAYS: i64 = 7;

/// Stopwatch attached to a single task.
#[derive(Debug, Clone)]
struct Tracking {
    task_id: String,
    started_at: DateTime<Utc>,
}

pub struct TaskRepository {
    tasks: Vec<Task>,
    categories: Vec<Category>,
    fallback_category: String,
    tracking: Option<Tracking>,
    store: Rc<dyn KeyValueStore>,
    degraded: bool,
}

impl TaskRepository {
    /// Create an empty repository with the built-in categories.
    ///
    /// Nothing is read from or written to `store` until the first mutation.
    pub fn new(store: Rc<dyn KeyValueStore>, fallback_category: &str) -> Self {
        let mut repo = Self {
            tasks: Vec::new(),
            categories: Category::builtins(),
            fallback_category: FALLBACK_CATEGORY_ID.to_string(),
            tracking: None,
            store,
            degraded: false,
        };
        repo.set_fallback_category(fallback_category);
        repo
    }

    /// Create a repository from the state persisted in `store`.
    ///
    /// Never fails: absent keys yield the default state and malformed
    /// payloads are logged and replaced by defaults.
    pub fn load(store: Rc<dyn KeyValueStore>, fallback_category: &str) -> Self {
        let mut repo = Self::new(store, fallback_category);
        repo.reload();
        repo
    }

    /// Replace in-memory state with what the store currently holds.
    pub fn reload(&mut self) {
        self.tracking = None;
        self.degraded = false;

        self.categories = match read_json::<Vec<Category>>(self.store.as_ref(), CATEGORIES_KEY) {
            Ok(Some(categories)) => categories,
            Ok(None) => Category::builtins(),
            Err(e) => {
                self.report_read_failure(CATEGORIES_KEY, &e);
                Category::builtins()
            }
        };

        self.tasks = match read_json::<Vec<Task>>(self.store.as_ref(), TASKS_KEY) {
            Ok(Some(tasks)) => tasks,
            Ok(None) => Vec::new(),
            Err(e) => {
                self.report_read_failure(TASKS_KEY, &e);
                Vec::new()
            }
        };

        self.repair();
        tracing::debug!(
            tasks = self.tasks.len(),
            categories = self.categories.len(),
            "task repository loaded"
        );
    }

    /// Write tasks and categories to the store.
    ///
    /// Mutations call this implicitly; the explicit form surfaces the error
    /// instead of only logging it.
    pub fn save(&mut self) -> Result<(), PersistenceError> {
        let result = write_json(self.store.as_ref(), TASKS_KEY, &self.tasks)
            .and_then(|()| write_json(self.store.as_ref(), CATEGORIES_KEY, &self.categories));
        self.degraded = result.is_err();
        result
    }

    /// `true` after a failed write, until the next successful one.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Canonical storage order (most recently added first).
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn fallback_category(&self) -> &str {
        &self.fallback_category
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    /// Tasks matching every predicate set on `filter`, in storage order.
    pub fn filtered_tasks(&self, filter: &TaskFilter) -> Vec<&Task> {
        self.tasks.iter().filter(|t| filter.matches(t)).collect()
    }

    /// Case-insensitive search over title, description and tags.
    /// A blank query returns every task.
    pub fn search(&self, query: &str) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| matches_query(t, query))
            .collect()
    }

    /// All tasks in presentation order: active first, then by priority,
    /// then newest first.
    pub fn sorted_tasks(&self) -> Vec<&Task> {
        let mut view: Vec<&Task> = self.tasks.iter().collect();
        view.sort_by(|a, b| presentation_order(a, b));
        view
    }

    pub fn active_tasks(&self) -> Vec<&Task> {
        self.filtered_tasks(&TaskFilter::new().status(TaskStatus::Active))
    }

    pub fn completed_tasks(&self) -> Vec<&Task> {
        self.filtered_tasks(&TaskFilter::new().status(TaskStatus::Completed))
    }

    pub fn tasks_by_priority(&self, priority: Priority) -> Vec<&Task> {
        self.filtered_tasks(&TaskFilter::new().priority(priority))
    }

    pub fn tasks_by_category(&self, category_id: &str) -> Vec<&Task> {
        self.filtered_tasks(&TaskFilter::new().category(category_id))
    }

    /// Tasks created on `day` (UTC).
    pub fn today_tasks(&self, day: NaiveDate) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| t.created_at.date_naive() == day)
            .collect()
    }

    /// Active tasks due within the next week, soonest first.
    pub fn upcoming_tasks(&self, now: DateTime<Utc>) -> Vec<&Task> {
        let horizon = now + Duration::days(UPCOMING_WINDOW_DAYS);
        let mut view: Vec<&Task> = self
            .tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Active)
            .filter(|t| t.due_at.is_some_and(|due| due > now && due <= horizon))
            .collect();
        view.sort_by_key(|t| t.due_at);
        view
    }

    /// Total tracked minutes across all tasks.
    pub fn total_time_spent(&self) -> u64 {
        self.tasks.iter().map(|t| u64::from(t.spent_minutes)).sum()
    }

    // ── Task commands ────────────────────────────────────────────────

    /// Create a task from `draft`. The task starts active with no tracked
    /// time and is placed at the front of the list.
    ///
    /// # Errors
    /// Rejects drafts whose category does not exist.
    pub fn add_task(&mut self, draft: TaskDraft) -> Result<Task, InvariantViolation> {
        self.require_category(&draft.category_id)?;

        let task = Task {
            id: uuid::Uuid::new_v4().to_string(),
            title: draft.title,
            description: draft.description,
            category_id: draft.category_id,
            priority: draft.priority,
            status: TaskStatus::Active,
            created_at: Utc::now(),
            due_at: draft.due_at,
            estimated_minutes: draft.estimated_minutes,
            spent_minutes: 0,
            tags: normalize_tags(draft.tags),
            completed_at: None,
        };
        tracing::debug!(task_id = %task.id, category_id = %task.category_id, "task added");

        self.tasks.insert(0, task.clone());
        self.recount_categories();
        self.persist();
        Ok(task)
    }

    /// Apply `patch` to the task `id`.
    ///
    /// Returns `Ok(None)` when no such task exists. A status change stamps
    /// or clears `completed_at`. An empty patch writes nothing.
    ///
    /// # Errors
    /// Rejects a patch that moves the task to a nonexistent category; the
    /// task is left untouched.
    pub fn update_task(
        &mut self,
        id: &str,
        patch: TaskPatch,
    ) -> Result<Option<Task>, InvariantViolation> {
        let Some(index) = self.position(id) else {
            return Ok(None);
        };
        if patch.is_empty() {
            return Ok(Some(self.tasks[index].clone()));
        }
        if let Some(category_id) = patch.category_id.as_deref() {
            self.require_category(category_id)?;
        }

        let now = Utc::now();
        let task = &mut self.tasks[index];
        let previous_category = task.category_id.clone();

        if let Some(title) = patch.title {
            task.title = title;
        }
        if let Some(description) = patch.description {
            task.description = description;
        }
        if let Some(category_id) = patch.category_id {
            task.category_id = category_id;
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        if let Some(status) = patch.status {
            task.set_status(status, now);
        }
        if let Some(due_at) = patch.due_at {
            task.due_at = due_at;
        }
        if let Some(estimated) = patch.estimated_minutes {
            task.estimated_minutes = estimated;
        }
        if let Some(tags) = patch.tags {
            task.tags = normalize_tags(tags);
        }

        let updated = task.clone();
        if updated.category_id != previous_category {
            self.recount_categories();
        }
        tracing::debug!(task_id = %id, "task updated");
        self.persist();
        Ok(Some(updated))
    }

    /// Flip the task between active and completed.
    pub fn toggle_status(&mut self, id: &str) -> Option<Task> {
        let index = self.position(id)?;
        let task = &mut self.tasks[index];
        let next = task.status.toggled();
        task.set_status(next, Utc::now());
        let updated = task.clone();
        tracing::debug!(task_id = %id, status = ?updated.status, "task status toggled");
        self.persist();
        Some(updated)
    }

    /// Remove the task. Returns `false` for an unknown id.
    ///
    /// Historical focus sessions keep their cached task title; a running
    /// stopwatch on this task is discarded without crediting time.
    pub fn delete_task(&mut self, id: &str) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };
        self.tasks.remove(index);
        if self.tracking.as_ref().is_some_and(|t| t.task_id == id) {
            self.tracking = None;
        }
        tracing::debug!(task_id = %id, "task deleted");
        self.recount_categories();
        self.persist();
        true
    }

    /// Add tracked minutes to a task. Returns the new total, or `None` for
    /// an unknown id.
    pub fn add_time_to_task(&mut self, id: &str, minutes: u32) -> Option<u32> {
        let index = self.position(id)?;
        let task = &mut self.tasks[index];
        task.spent_minutes = task.spent_minutes.saturating_add(minutes);
        let total = task.spent_minutes;
        self.persist();
        Some(total)
    }

    /// Explicitly zero the tracked time of a task.
    pub fn reset_spent_minutes(&mut self, id: &str) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };
        self.tasks[index].spent_minutes = 0;
        self.persist();
        true
    }

    // ── Time tracking ────────────────────────────────────────────────

    /// Start the stopwatch on `id`, crediting and stopping any stopwatch
    /// already running. Returns `false` for an unknown id.
    pub fn start_tracking(&mut self, id: &str) -> bool {
        self.start_tracking_at(id, Utc::now())
    }

    pub fn start_tracking_at(&mut self, id: &str, now: DateTime<Utc>) -> bool {
        if self.position(id).is_none() {
            return false;
        }
        if self.tracking.is_some() {
            self.stop_tracking_at(now);
        }
        self.tracking = Some(Tracking {
            task_id: id.to_string(),
            started_at: now,
        });
        true
    }

    /// Stop the stopwatch and credit the whole minutes elapsed to its task.
    pub fn stop_tracking(&mut self) -> Option<u32> {
        self.stop_tracking_at(Utc::now())
    }

    pub fn stop_tracking_at(&mut self, now: DateTime<Utc>) -> Option<u32> {
        let tracking = self.tracking.take()?;
        let minutes = elapsed_minutes(tracking.started_at, now);
        self.add_time_to_task(&tracking.task_id, minutes)?;
        Some(minutes)
    }

    pub fn tracked_task(&self) -> Option<&Task> {
        self.tracking.as_ref().and_then(|t| self.task(&t.task_id))
    }

    pub fn tracking_elapsed_minutes(&self) -> u32 {
        self.tracking_elapsed_minutes_at(Utc::now())
    }

    pub fn tracking_elapsed_minutes_at(&self, now: DateTime<Utc>) -> u32 {
        self.tracking
            .as_ref()
            .map(|t| elapsed_minutes(t.started_at, now))
            .unwrap_or(0)
    }

    // ── Category commands ────────────────────────────────────────────

    /// Create a custom category.
    pub fn add_category(
        &mut self,
        name: impl Into<String>,
        color: impl Into<String>,
        icon: impl Into<String>,
    ) -> Category {
        let category = Category {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            color: color.into(),
            icon: icon.into(),
            is_custom: true,
            task_count: 0,
        };
        tracing::debug!(category_id = %category.id, "category added");
        self.categories.push(category.clone());
        self.persist();
        category
    }

    /// Rename, recolour or re-icon a category. `None` for an unknown id.
    pub fn update_category(&mut self, id: &str, patch: CategoryPatch) -> Option<Category> {
        let category = self.categories.iter_mut().find(|c| c.id == id)?;
        patch.apply(category);
        let updated = category.clone();
        self.persist();
        Some(updated)
    }

    /// Delete a custom category, moving its tasks to the fallback category.
    ///
    /// Returns `Ok(false)` for an unknown id.
    ///
    /// # Errors
    /// Built-in categories are refused and nothing changes.
    pub fn delete_category(&mut self, id: &str) -> Result<bool, InvariantViolation> {
        let Some(category) = self.category(id) else {
            return Ok(false);
        };
        if !category.is_custom || id == self.fallback_category {
            return Err(InvariantViolation::BuiltinCategory { id: id.to_string() });
        }

        let fallback = self.fallback_category.clone();
        let mut moved = 0usize;
        for task in self.tasks.iter_mut().filter(|t| t.category_id == id) {
            task.category_id = fallback.clone();
            moved += 1;
        }
        self.categories.retain(|c| c.id != id);
        tracing::debug!(category_id = %id, moved, fallback = %fallback, "category deleted");

        self.recount_categories();
        self.persist();
        Ok(true)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn position(&self, id: &str) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }

    fn require_category(&self, id: &str) -> Result<(), InvariantViolation> {
        if self.category(id).is_some() {
            Ok(())
        } else {
            Err(InvariantViolation::UnknownCategory { id: id.to_string() })
        }
    }

    fn set_fallback_category(&mut self, id: &str) {
        let usable = self.category(id).is_some_and(|c| !c.is_custom);
        if usable {
            self.fallback_category = id.to_string();
        } else {
            tracing::warn!(
                requested = %id,
                using = FALLBACK_CATEGORY_ID,
                "fallback category must be a built-in category"
            );
            self.fallback_category = FALLBACK_CATEGORY_ID.to_string();
        }
    }

    fn recount_categories(&mut self) {
        for category in &mut self.categories {
            category.task_count = self
                .tasks
                .iter()
                .filter(|t| t.category_id == category.id)
                .count();
        }
    }

    /// Bring loaded state back in line with the repository invariants.
    fn repair(&mut self) {
        for builtin in Category::builtins() {
            match self.categories.iter_mut().find(|c| c.id == builtin.id) {
                Some(existing) if existing.is_custom => {
                    tracing::warn!(category_id = %existing.id, "built-in category stored as custom; restoring");
                    existing.is_custom = false;
                }
                Some(_) => {}
                None => self.categories.push(builtin),
            }
        }

        let now = Utc::now();
        let fallback = self.fallback_category.clone();
        for task in &mut self.tasks {
            if !self.categories.iter().any(|c| c.id == task.category_id) {
                tracing::warn!(
                    task_id = %task.id,
                    category_id = %task.category_id,
                    fallback = %fallback,
                    "task references unknown category; moving to fallback"
                );
                task.category_id = fallback.clone();
            }
            match task.status {
                TaskStatus::Completed if task.completed_at.is_none() => {
                    task.completed_at = Some(now);
                }
                TaskStatus::Active if task.completed_at.is_some() => {
                    task.completed_at = None;
                }
                _ => {}
            }
            task.tags = normalize_tags(std::mem::take(&mut task.tags));
        }

        self.recount_categories();
    }

    fn persist(&mut self) {
        if let Err(e) = self.save() {
            tracing::warn!(error = %e, "failed to persist tasks; continuing unpersisted");
        }
    }

    fn report_read_failure(&mut self, key: &str, error: &PersistenceError) {
        tracing::warn!(key, error = %error, "failed to load persisted state; using defaults");
        if !matches!(error, PersistenceError::Malformed { .. }) {
            self.degraded = true;
        }
    }
}

fn elapsed_minutes(from: DateTime<Utc>, to: DateTime<Utc>) -> u32 {
    u32::try_from((to - from).num_minutes().max(0)).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn repo() -> (Rc<MemoryStore>, TaskRepository) {
        let store = Rc::new(MemoryStore::new());
        let repo = TaskRepository::new(store.clone(), FALLBACK_CATEGORY_ID);
        (store, repo)
    }

    fn count_of(repo: &TaskRepository, id: &str) -> usize {
        repo.category(id).map(|c| c.task_count).unwrap_or(0)
    }

    #[test]
    fn add_task_assigns_identity_and_defaults() {
        let (store, mut repo) = repo();
        let task = repo
            .add_task(TaskDraft::new("A", "work").priority(Priority::High))
            .unwrap();

        assert!(!task.id.is_empty());
        assert_eq!(task.status, TaskStatus::Active);
        assert_eq!(task.spent_minutes, 0);
        assert!(task.completed_at.is_none());
        assert_eq!(repo.tasks().iter().filter(|t| t.id == task.id).count(), 1);
        assert_eq!(count_of(&repo, "work"), 1);
        assert!(store.contains(TASKS_KEY));
        assert!(store.contains(CATEGORIES_KEY));
    }

    #[test]
    fn add_task_rejects_unknown_category() {
        let (_store, mut repo) = repo();
        let err = repo.add_task(TaskDraft::new("A", "nope")).unwrap_err();
        assert_eq!(err, InvariantViolation::UnknownCategory { id: "nope".into() });
        assert!(repo.tasks().is_empty());
    }

    #[test]
    fn toggle_status_stamps_and_clears_completed_at() {
        let (_store, mut repo) = repo();
        let task = repo.add_task(TaskDraft::new("A", "work")).unwrap();

        let done = repo.toggle_status(&task.id).unwrap();
        assert_eq!(done.status, TaskStatus::Completed);
        assert!(done.completed_at.is_some());

        let reopened = repo.toggle_status(&task.id).unwrap();
        assert_eq!(reopened.status, TaskStatus::Active);
        assert!(reopened.completed_at.is_none());

        assert!(repo.toggle_status("missing").is_none());
    }

    #[test]
    fn update_unknown_id_is_noop() {
        let (_store, mut repo) = repo();
        repo.add_task(TaskDraft::new("A", "work")).unwrap();
        let before = repo.tasks().to_vec();
        let result = repo.update_task("missing", TaskPatch::status(TaskStatus::Completed));
        assert_eq!(result, Ok(None));
        assert_eq!(repo.tasks(), before.as_slice());
    }

    #[test]
    fn update_moving_category_recounts() {
        let (_store, mut repo) = repo();
        let task = repo.add_task(TaskDraft::new("A", "work")).unwrap();
        repo.update_task(&task.id, TaskPatch::category("health"))
            .unwrap()
            .unwrap();
        assert_eq!(count_of(&repo, "work"), 0);
        assert_eq!(count_of(&repo, "health"), 1);
    }

    #[test]
    fn update_to_unknown_category_is_rejected() {
        let (_store, mut repo) = repo();
        let task = repo.add_task(TaskDraft::new("A", "work")).unwrap();
        let patch = TaskPatch {
            title: Some("renamed".into()),
            category_id: Some("ghost".into()),
            ..TaskPatch::default()
        };
        assert!(repo.update_task(&task.id, patch).is_err());
        let stored = repo.task(&task.id).unwrap();
        assert_eq!(stored.title, "A");
        assert_eq!(stored.category_id, "work");
    }

    #[test]
    fn update_overwrites_fields_and_clears_nullable_ones() {
        let (_store, mut repo) = repo();
        let task = repo
            .add_task(TaskDraft::new("A", "work").description("first").estimated_minutes(30))
            .unwrap();
        let updated = repo
            .update_task(
                &task.id,
                TaskPatch {
                    description: Some(None),
                    estimated_minutes: Some(Some(45)),
                    tags: Some(vec!["x".into(), "x".into()]),
                    ..TaskPatch::default()
                },
            )
            .unwrap()
            .unwrap();
        assert!(updated.description.is_none());
        assert_eq!(updated.estimated_minutes, Some(45));
        assert_eq!(updated.tags, vec!["x"]);
    }

    #[test]
    fn delete_task_recounts() {
        let (_store, mut repo) = repo();
        let a = repo.add_task(TaskDraft::new("A", "work")).unwrap();
        repo.add_task(TaskDraft::new("B", "work")).unwrap();
        assert!(repo.delete_task(&a.id));
        assert!(!repo.delete_task(&a.id));
        assert_eq!(repo.tasks().len(), 1);
        assert_eq!(count_of(&repo, "work"), 1);
    }

    #[test]
    fn add_time_accumulates_and_reset_zeroes() {
        let (_store, mut repo) = repo();
        let task = repo.add_task(TaskDraft::new("A", "work")).unwrap();
        assert_eq!(repo.add_time_to_task(&task.id, 10), Some(10));
        assert_eq!(repo.add_time_to_task(&task.id, 5), Some(15));
        assert_eq!(repo.add_time_to_task("missing", 5), None);
        assert_eq!(repo.total_time_spent(), 15);
        assert!(repo.reset_spent_minutes(&task.id));
        assert_eq!(repo.task(&task.id).unwrap().spent_minutes, 0);
    }

    #[test]
    fn delete_builtin_category_is_refused() {
        let (_store, mut repo) = repo();
        let task = repo.add_task(TaskDraft::new("A", "work")).unwrap();
        let before = repo.categories().to_vec();
        assert_eq!(
            repo.delete_category("work"),
            Err(InvariantViolation::BuiltinCategory { id: "work".into() })
        );
        assert_eq!(repo.categories(), before.as_slice());
        assert_eq!(repo.task(&task.id).unwrap().category_id, "work");
    }

    #[test]
    fn delete_custom_category_reassigns_members() {
        let (_store, mut repo) = repo();
        let custom = repo.add_category("Garden", "#00ff00", "lucide:leaf");
        let a = repo.add_task(TaskDraft::new("A", custom.id.clone())).unwrap();
        let b = repo.add_task(TaskDraft::new("B", custom.id.clone())).unwrap();
        let other = repo.add_task(TaskDraft::new("C", "health")).unwrap();
        assert_eq!(count_of(&repo, &custom.id), 2);

        assert_eq!(repo.delete_category(&custom.id), Ok(true));
        assert!(repo.category(&custom.id).is_none());
        assert_eq!(repo.task(&a.id).unwrap().category_id, FALLBACK_CATEGORY_ID);
        assert_eq!(repo.task(&b.id).unwrap().category_id, FALLBACK_CATEGORY_ID);
        assert_eq!(repo.task(&other.id).unwrap().category_id, "health");
        assert_eq!(repo.tasks().len(), 3);
        assert_eq!(count_of(&repo, FALLBACK_CATEGORY_ID), 2);
        assert_eq!(repo.delete_category(&custom.id), Ok(false));
    }

    #[test]
    fn unknown_fallback_is_replaced_by_default() {
        let store = Rc::new(MemoryStore::new());
        let other = TaskRepository::new(store, "does-not-exist");
        assert_eq!(other.fallback_category(), FALLBACK_CATEGORY_ID);

        let store = Rc::new(MemoryStore::new());
        let learning = TaskRepository::new(store, "learning");
        assert_eq!(learning.fallback_category(), "learning");
    }

    #[test]
    fn update_category_cannot_touch_counts() {
        let (_store, mut repo) = repo();
        repo.add_task(TaskDraft::new("A", "work")).unwrap();
        let updated = repo
            .update_category(
                "work",
                CategoryPatch {
                    name: Some("Job".into()),
                    ..CategoryPatch::default()
                },
            )
            .unwrap();
        assert_eq!(updated.name, "Job");
        assert_eq!(updated.task_count, 1);
        assert!(repo.update_category("missing", CategoryPatch::default()).is_none());
    }

    #[test]
    fn views_do_not_reorder_storage() {
        let (_store, mut repo) = repo();
        repo.add_task(TaskDraft::new("low", "work").priority(Priority::Low))
            .unwrap();
        repo.add_task(TaskDraft::new("high", "work").priority(Priority::High))
            .unwrap();
        let before: Vec<String> = repo.tasks().iter().map(|t| t.id.clone()).collect();

        let sorted = repo.sorted_tasks();
        assert_eq!(sorted[0].title, "high");
        let _ = repo.filtered_tasks(&TaskFilter::new().priority(Priority::Low));

        let after: Vec<String> = repo.tasks().iter().map(|t| t.id.clone()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn upcoming_tasks_window_and_order() {
        let (_store, mut repo) = repo();
        let now = Utc::now();
        let later = repo
            .add_task(TaskDraft::new("later", "work").due_at(now + Duration::days(5)))
            .unwrap();
        let soon = repo
            .add_task(TaskDraft::new("soon", "work").due_at(now + Duration::hours(3)))
            .unwrap();
        repo.add_task(TaskDraft::new("far", "work").due_at(now + Duration::days(10)))
            .unwrap();
        repo.add_task(TaskDraft::new("past", "work").due_at(now - Duration::hours(1)))
            .unwrap();
        let done = repo
            .add_task(TaskDraft::new("done", "work").due_at(now + Duration::days(1)))
            .unwrap();
        repo.toggle_status(&done.id);

        let ids: Vec<&str> = repo
            .upcoming_tasks(now)
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(ids, vec![soon.id.as_str(), later.id.as_str()]);
    }

    #[test]
    fn today_tasks_matches_creation_day() {
        let (_store, mut repo) = repo();
        repo.add_task(TaskDraft::new("A", "work")).unwrap();
        let today = Utc::now().date_naive();
        assert_eq!(repo.today_tasks(today).len(), 1);
        assert!(repo.today_tasks(today - Duration::days(1)).is_empty());
    }

    #[test]
    fn tracking_credits_whole_minutes() {
        let (_store, mut repo) = repo();
        let task = repo.add_task(TaskDraft::new("A", "work")).unwrap();
        let start = Utc::now();
        assert!(repo.start_tracking_at(&task.id, start));
        assert!(!repo.start_tracking_at("missing", start));
        assert_eq!(repo.tracked_task().map(|t| t.id.as_str()), Some(task.id.as_str()));
        assert_eq!(
            repo.tracking_elapsed_minutes_at(start + Duration::seconds(150)),
            2
        );

        let credited = repo.stop_tracking_at(start + Duration::seconds(610));
        assert_eq!(credited, Some(10));
        assert_eq!(repo.task(&task.id).unwrap().spent_minutes, 10);
        assert!(repo.tracked_task().is_none());
        assert_eq!(repo.stop_tracking(), None);
    }

    #[test]
    fn switching_tracked_task_credits_previous() {
        let (_store, mut repo) = repo();
        let a = repo.add_task(TaskDraft::new("A", "work")).unwrap();
        let b = repo.add_task(TaskDraft::new("B", "work")).unwrap();
        let start = Utc::now();
        repo.start_tracking_at(&a.id, start);
        repo.start_tracking_at(&b.id, start + Duration::minutes(7));
        assert_eq!(repo.task(&a.id).unwrap().spent_minutes, 7);
        assert_eq!(repo.tracked_task().unwrap().id, b.id);
    }

    #[test]
    fn deleting_tracked_task_discards_stopwatch() {
        let (_store, mut repo) = repo();
        let a = repo.add_task(TaskDraft::new("A", "work")).unwrap();
        repo.start_tracking(&a.id);
        repo.delete_task(&a.id);
        assert!(repo.tracked_task().is_none());
        assert_eq!(repo.stop_tracking(), None);
    }

    #[test]
    fn load_repairs_inconsistent_payload() {
        let store = Rc::new(MemoryStore::new());
        store
            .set(
                TASKS_KEY,
                r#"[
                    {"id":"1","title":"orphan","categoryId":"gone","priority":"low",
                     "status":"active","createdAt":"2024-01-01T00:00:00Z",
                     "completedAt":"2024-01-02T00:00:00Z","tags":[]},
                    {"id":"2","title":"done","categoryId":"work","priority":"high",
                     "status":"completed","createdAt":"2024-01-01T00:00:00Z","tags":["a","a"]}
                ]"#,
            )
            .unwrap();
        store
            .set(
                CATEGORIES_KEY,
                r##"[{"id":"work","name":"Work","color":"#000","icon":"x","taskCount":99}]"##,
            )
            .unwrap();

        let repo = TaskRepository::load(store, FALLBACK_CATEGORY_ID);
        let orphan = repo.task("1").unwrap();
        assert_eq!(orphan.category_id, FALLBACK_CATEGORY_ID);
        assert!(orphan.completed_at.is_none());
        let done = repo.task("2").unwrap();
        assert!(done.completed_at.is_some());
        assert_eq!(done.tags, vec!["a"]);
        assert_eq!(repo.categories().len(), 4);
        assert_eq!(count_of(&repo, "work"), 1);
        assert_eq!(count_of(&repo, FALLBACK_CATEGORY_ID), 1);
    }

    #[test]
    fn malformed_payload_falls_back_to_defaults() {
        let store = Rc::new(MemoryStore::new());
        store.set(TASKS_KEY, "{broken").unwrap();
        store.set(CATEGORIES_KEY, "[1, 2").unwrap();
        let repo = TaskRepository::load(store, FALLBACK_CATEGORY_ID);
        assert!(repo.tasks().is_empty());
        assert_eq!(repo.categories(), Category::builtins().as_slice());
        assert!(!repo.is_degraded());
    }

    #[test]
    fn builtin_stored_as_custom_stays_undeletable() {
        let store = Rc::new(MemoryStore::new());
        store
            .set(
                CATEGORIES_KEY,
                r##"[{"id":"personal","name":"Personal","color":"#5df27e",
                      "icon":"lucide:home","isCustom":true,"taskCount":0}]"##,
            )
            .unwrap();

        let mut repo = TaskRepository::load(store, FALLBACK_CATEGORY_ID);
        assert!(!repo.category("personal").unwrap().is_custom);

        let task = repo.add_task(TaskDraft::new("A", "personal")).unwrap();
        assert_eq!(
            repo.delete_category("personal"),
            Err(InvariantViolation::BuiltinCategory {
                id: "personal".into()
            })
        );
        assert!(repo.category("personal").is_some());
        assert_eq!(repo.task(&task.id).unwrap().category_id, "personal");
        assert_eq!(count_of(&repo, "personal"), 1);
    }

    #[test]
    fn load_moves_orphans_to_configured_fallback() {
        let store = Rc::new(MemoryStore::new());
        store
            .set(
                TASKS_KEY,
                r#"[{"id":"1","title":"orphan","categoryId":"gone-custom","priority":"low",
                     "status":"active","createdAt":"2024-01-01T00:00:00Z","tags":[]}]"#,
            )
            .unwrap();

        let mut repo = TaskRepository::load(store, "learning");
        assert_eq!(repo.fallback_category(), "learning");
        assert_eq!(repo.task("1").unwrap().category_id, "learning");

        let custom = repo.add_category("Garden", "#0f0", "lucide:leaf");
        let moved = repo.add_task(TaskDraft::new("B", custom.id.clone())).unwrap();
        repo.delete_category(&custom.id).unwrap();
        assert_eq!(repo.task(&moved.id).unwrap().category_id, "learning");

        repo.reload();
        assert_eq!(repo.task("1").unwrap().category_id, "learning");
        assert_eq!(count_of(&repo, "learning"), 2);
    }

    #[test]
    fn empty_patch_leaves_store_untouched() {
        let (store, mut repo) = repo();
        let task = repo.add_task(TaskDraft::new("A", "work")).unwrap();
        store.remove(TASKS_KEY).unwrap();

        let same = repo.update_task(&task.id, TaskPatch::default()).unwrap();
        assert_eq!(same.as_ref(), Some(&task));
        assert!(!store.contains(TASKS_KEY));
    }
}
