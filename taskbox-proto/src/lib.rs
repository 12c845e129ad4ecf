//! Shared data model and storage encoding for `TaskBox`.

pub mod codec;
pub mod project;
pub mod task;

pub use project::{NewProject, Project, ProjectId, ProjectPatch, ProjectStatus, ProjectWithTasks};
pub use task::{MAX_TASK_TITLE_LENGTH, NewTask, Task, TaskError, TaskId, TaskPatch};
