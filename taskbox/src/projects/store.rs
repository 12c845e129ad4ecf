//! Project store with task membership and read-time hydration.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use taskbox_proto::codec::PROJECT_STORAGE_KEY;
use taskbox_proto::{NewProject, Project, ProjectId, ProjectPatch, ProjectWithTasks, TaskId};

use super::ProjectError;
use crate::persist::{KeyValueStore, PersistenceAdapter, SnapshotWriter};
use crate::tasks::TaskStore;

#[derive(Debug, Default)]
struct ProjectState {
    projects: Vec<Project>,
    selected: Option<ProjectId>,
}

/// Insertion-ordered project collection plus the selected-project pointer.
///
/// In-memory state changes synchronously under a write lock. When the store
/// was built with [`load`](Self::load), every mutation also queues a
/// snapshot of the project list for the background writer: state is visible
/// immediately and persisted eventually. A crash before the writer catches up
/// loses the unwritten mutations.
pub struct ProjectStore {
    state: RwLock<ProjectState>,
    tasks: Arc<TaskStore>,
    writer: Option<SnapshotWriter<Vec<Project>>>,
}

impl ProjectStore {
    /// Creates an empty store with no persistence.
    #[must_use]
    pub fn in_memory(tasks: Arc<TaskStore>) -> Self {
        Self {
            state: RwLock::new(ProjectState::default()),
            tasks,
            writer: None,
        }
    }

    /// Restores the project list from `adapter` and starts the snapshot
    /// writer. Must be called from within a tokio runtime.
    ///
    /// A missing or unreadable snapshot yields an empty store. The selected
    /// project is not persisted and starts out as `None`.
    pub async fn load<S>(adapter: Arc<PersistenceAdapter<S>>, tasks: Arc<TaskStore>) -> Self
    where
        S: KeyValueStore + 'static,
    {
        let projects: Vec<Project> = adapter
            .get(PROJECT_STORAGE_KEY)
            .await
            .unwrap_or_default();
        tracing::info!(count = projects.len(), "loaded projects");

        let (writer, _handle) = SnapshotWriter::spawn(adapter, PROJECT_STORAGE_KEY);
        Self {
            state: RwLock::new(ProjectState {
                projects,
                selected: None,
            }),
            tasks,
            writer: Some(writer),
        }
    }

    /// Creates a project, appends it, and makes it the selected project.
    pub fn add_project(&self, input: NewProject) -> Project {
        let project = input.into_project(Utc::now());
        let mut state = self.state.write();
        state.projects.push(project.clone());
        state.selected = Some(project.id.clone());
        self.persist(&state);
        drop(state);
        tracing::debug!(project_id = %project.id, "added project");
        project
    }

    /// Merges `patch` into the project with `id` and refreshes `updated_at`.
    ///
    /// The in-memory change is applied before this returns; the durable write
    /// trails it. No-op if the id is unknown. Returns whether a project was
    /// updated.
    #[allow(clippy::unused_async)]
    pub async fn update_project(&self, id: &ProjectId, patch: &ProjectPatch) -> bool {
        self.with_project_mut(id, |project| patch.apply_to(project, Utc::now()))
    }

    /// Removes the project with `id`, clearing the selection if it pointed
    /// there. No-op if the id is unknown.
    pub fn delete_project(&self, id: &ProjectId) -> bool {
        let mut state = self.state.write();
        let before = state.projects.len();
        state.projects.retain(|p| &p.id != id);
        let removed = state.projects.len() != before;
        if state.selected.as_ref() == Some(id) {
            state.selected = None;
        }
        if removed {
            self.persist(&state);
        }
        drop(state);
        tracing::debug!(project_id = %id, removed, "delete project");
        removed
    }

    /// Points the selection at `id`, or clears it.
    ///
    /// The id is not checked against the collection.
    pub fn set_selected_project(&self, id: Option<ProjectId>) {
        self.state.write().selected = id;
    }

    /// Returns the selected project id, if any.
    #[must_use]
    pub fn selected_project_id(&self) -> Option<ProjectId> {
        self.state.read().selected.clone()
    }

    /// Returns the project with `id`.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectError::NotFound`] if no project has that id.
    pub fn get_project(&self, id: &ProjectId) -> Result<Project, ProjectError> {
        self.state
            .read()
            .projects
            .iter()
            .find(|p| &p.id == id)
            .cloned()
            .ok_or_else(|| ProjectError::NotFound(id.clone()))
    }

    /// Returns a snapshot of all projects in insertion order.
    #[must_use]
    pub fn get_all_projects(&self) -> Vec<Project> {
        self.state.read().projects.clone()
    }

    /// Returns every project hydrated with its existing member tasks.
    #[must_use]
    pub fn get_all_projects_with_tasks(&self) -> Vec<ProjectWithTasks> {
        self.get_all_projects()
            .into_iter()
            .map(|project| self.hydrate(project))
            .collect()
    }

    /// Returns the project with `id` hydrated with its existing member
    /// tasks, or `None` if there is no such project.
    #[must_use]
    pub fn get_project_with_tasks(&self, id: &ProjectId) -> Option<ProjectWithTasks> {
        let project = self
            .state
            .read()
            .projects
            .iter()
            .find(|p| &p.id == id)
            .cloned()?;
        Some(self.hydrate(project))
    }

    /// Appends `task_id` to the project's membership list.
    ///
    /// Duplicates are not filtered: adding the same task twice lists it
    /// twice. No-op if the project is unknown.
    pub fn add_task_to_project(&self, project_id: &ProjectId, task_id: &TaskId) -> bool {
        self.with_project_mut(project_id, |project| {
            project.task_ids.push(task_id.clone());
            project.updated_at = Utc::now();
        })
    }

    /// Removes every occurrence of `task_id` from the project's membership
    /// list. No-op if the project is unknown.
    pub fn remove_task_from_project(&self, project_id: &ProjectId, task_id: &TaskId) -> bool {
        self.with_project_mut(project_id, |project| {
            project.task_ids.retain(|id| id != task_id);
            project.updated_at = Utc::now();
        })
    }

    /// Returns the number of projects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().projects.len()
    }

    /// Returns `true` if there are no projects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.read().projects.is_empty()
    }

    /// Waits until every mutation made so far has been written to storage.
    ///
    /// Returns immediately for an in-memory store.
    pub async fn flush(&self) {
        if let Some(writer) = &self.writer {
            writer.flush().await;
        }
    }

    fn hydrate(&self, project: Project) -> ProjectWithTasks {
        let tasks = self
            .tasks
            .get_tasks_by_project(&project.id, &project.task_ids);
        ProjectWithTasks { project, tasks }
    }

    /// Applies `f` to the project with `id` and queues a snapshot, returning
    /// whether a project matched.
    fn with_project_mut(&self, id: &ProjectId, f: impl FnOnce(&mut Project)) -> bool {
        let mut state = self.state.write();
        let Some(project) = state.projects.iter_mut().find(|p| &p.id == id) else {
            tracing::debug!(project_id = %id, "project not found, ignoring");
            return false;
        };
        f(project);
        self.persist(&state);
        true
    }

    /// Queues a snapshot while the write lock is still held, so snapshots
    /// reach the writer in mutation order.
    fn persist(&self, state: &ProjectState) {
        if let Some(writer) = &self.writer {
            writer.write(state.projects.clone());
        }
    }
}
