//! In-memory task store.

use parking_lot::RwLock;
use taskbox_proto::{ProjectId, Task, TaskId, TaskPatch};

/// Insertion-ordered task collection.
///
/// All methods take `&self`; each mutation runs to completion under a write
/// lock, so readers never observe a half-applied change. Tasks are not
/// persisted.
#[derive(Debug, Default)]
pub struct TaskStore {
    tasks: RwLock<Vec<Task>>,
}

impl TaskStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `task`.
    ///
    /// The id is not checked for uniqueness; adding the same id twice yields
    /// two entries.
    pub fn add_task(&self, task: Task) {
        tracing::debug!(task_id = %task.id, "adding task");
        self.tasks.write().push(task);
    }

    /// Merges the fields present in `patch` into the task with `id`.
    ///
    /// No-op if the id is unknown. Returns whether a task was updated.
    pub fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> bool {
        self.with_task_mut(id, |task| patch.apply_to(task))
    }

    /// Removes the task with `id`. No-op if the id is unknown.
    ///
    /// Project memberships naming this id are left in place.
    pub fn delete_task(&self, id: &TaskId) -> bool {
        let mut tasks = self.tasks.write();
        let before = tasks.len();
        tasks.retain(|t| &t.id != id);
        let removed = tasks.len() != before;
        drop(tasks);
        tracing::debug!(task_id = %id, removed, "delete task");
        removed
    }

    /// Flips `is_completed` on the task with `id`. No-op if the id is unknown.
    pub fn toggle_task_completion(&self, id: &TaskId) -> bool {
        self.with_task_mut(id, |task| task.is_completed = !task.is_completed)
    }

    /// Returns the tasks named by `task_ids`, in that order.
    ///
    /// Ids with no matching task are skipped. `project_id` only labels the
    /// query in logs; membership is entirely described by `task_ids`.
    #[must_use]
    pub fn get_tasks_by_project(&self, project_id: &ProjectId, task_ids: &[TaskId]) -> Vec<Task> {
        let tasks = self.tasks.read();
        let found: Vec<Task> = task_ids
            .iter()
            .filter_map(|id| tasks.iter().find(|t| &t.id == id).cloned())
            .collect();
        drop(tasks);
        if found.len() < task_ids.len() {
            tracing::trace!(
                project_id = %project_id,
                dangling = task_ids.len() - found.len(),
                "skipped task ids with no task"
            );
        }
        found
    }

    /// Returns a copy of the task with `id`, if any.
    #[must_use]
    pub fn get_task(&self, id: &TaskId) -> Option<Task> {
        self.tasks.read().iter().find(|t| &t.id == id).cloned()
    }

    /// Returns a snapshot of all tasks in insertion order.
    #[must_use]
    pub fn all_tasks(&self) -> Vec<Task> {
        self.tasks.read().clone()
    }

    /// Returns the number of tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.read().len()
    }

    /// Returns `true` if there are no tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.read().is_empty()
    }

    /// Applies `f` to the first task with `id`, returning whether one matched.
    fn with_task_mut(&self, id: &TaskId, f: impl FnOnce(&mut Task)) -> bool {
        let mut tasks = self.tasks.write();
        let Some(task) = tasks.iter_mut().find(|t| &t.id == id) else {
            tracing::debug!(task_id = %id, "task not found, ignoring");
            return false;
        };
        f(task);
        true
    }
}
