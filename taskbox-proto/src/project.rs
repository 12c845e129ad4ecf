//! Project record types for `TaskBox`.
//!
//! A [`Project`] groups tasks by id. Membership is an ordered list of
//! [`TaskId`]s that may outlive the tasks it names; readers hydrate it into a
//! [`ProjectWithTasks`] and drop the dangling entries.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::task::{Task, TaskId};

/// Length of the random suffix in generated project ids.
const PROJECT_ID_SUFFIX_LEN: usize = 9;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Project identifier of the form `project-<unix millis>-<base36 suffix>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(String);

impl ProjectId {
    /// Generates an id stamped with the current time.
    #[must_use]
    pub fn new() -> Self {
        Self::generate_at(Utc::now())
    }

    /// Generates an id stamped with `now`.
    #[must_use]
    pub fn generate_at(now: DateTime<Utc>) -> Self {
        let mut rng = rand::rng();
        let suffix: String = (0..PROJECT_ID_SUFFIX_LEN)
            .map(|_| char::from(BASE36[rng.random_range(0..BASE36.len())]))
            .collect();
        Self(format!("project-{}-{suffix}", now.timestamp_millis()))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ProjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for ProjectId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ProjectId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for ProjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state derived from [`Project::is_completed`].
///
/// Deletion is terminal and has no state here: a deleted project simply
/// stops existing in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectStatus {
    /// Work in progress.
    Active,
    /// Marked done.
    Completed,
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// A named group of tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Unique project identifier.
    pub id: ProjectId,
    /// Display title.
    pub title: String,
    /// Optional free-form notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Optional planned start.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    /// Optional planned end.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    /// Whether the project has been marked done.
    #[serde(default)]
    pub is_completed: bool,
    /// Member task ids in insertion order. May name deleted tasks.
    #[serde(default)]
    pub task_ids: Vec<TaskId>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Returns the lifecycle state of this project.
    #[must_use]
    pub const fn status(&self) -> ProjectStatus {
        if self.is_completed {
            ProjectStatus::Completed
        } else {
            ProjectStatus::Active
        }
    }
}

/// Input for creating a [`Project`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewProject {
    /// Project title.
    pub title: String,
    /// Optional description.
    pub description: Option<String>,
    /// Optional planned start.
    pub start_date: Option<DateTime<Utc>>,
    /// Optional planned end.
    pub end_date: Option<DateTime<Utc>>,
}

impl NewProject {
    /// Starts a new project with the given title.
    #[must_use]
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the planned date range.
    #[must_use]
    pub const fn with_dates(
        mut self,
        start_date: Option<DateTime<Utc>>,
        end_date: Option<DateTime<Utc>>,
    ) -> Self {
        self.start_date = start_date;
        self.end_date = end_date;
        self
    }

    /// Materializes the project with a fresh id and `now` as both timestamps.
    #[must_use]
    pub fn into_project(self, now: DateTime<Utc>) -> Project {
        Project {
            id: ProjectId::generate_at(now),
            title: self.title,
            description: self.description,
            start_date: self.start_date,
            end_date: self.end_date,
            is_completed: false,
            task_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// A partial update to a [`Project`].
///
/// Membership is not patchable here; it changes only through the store's
/// add/remove task operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectPatch {
    /// New title.
    pub title: Option<String>,
    /// New description, or `Some(None)` to clear it.
    pub description: Option<Option<String>>,
    /// New start date, or `Some(None)` to clear it.
    pub start_date: Option<Option<DateTime<Utc>>>,
    /// New end date, or `Some(None)` to clear it.
    pub end_date: Option<Option<DateTime<Utc>>>,
    /// New completion flag.
    pub is_completed: Option<bool>,
}

impl ProjectPatch {
    /// A patch that only sets the completion flag.
    #[must_use]
    pub fn completed(is_completed: bool) -> Self {
        Self {
            is_completed: Some(is_completed),
            ..Self::default()
        }
    }

    /// A patch that only replaces the title.
    #[must_use]
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    /// Merges the present fields into `project` and stamps `updated_at`.
    pub fn apply_to(&self, project: &mut Project, now: DateTime<Utc>) {
        if let Some(title) = &self.title {
            project.title.clone_from(title);
        }
        if let Some(description) = &self.description {
            project.description.clone_from(description);
        }
        if let Some(start_date) = self.start_date {
            project.start_date = start_date;
        }
        if let Some(end_date) = self.end_date {
            project.end_date = end_date;
        }
        if let Some(is_completed) = self.is_completed {
            project.is_completed = is_completed;
        }
        project.updated_at = now;
    }
}

/// A project with its member tasks attached.
///
/// Built at read time; it is a snapshot and goes stale as soon as either
/// store changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectWithTasks {
    /// The project record.
    #[serde(flatten)]
    pub project: Project,
    /// Existing member tasks, in `task_ids` order.
    pub tasks: Vec<Task>,
}
