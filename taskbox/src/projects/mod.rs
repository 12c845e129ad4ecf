//! Project collection for `TaskBox`.
//!
//! The [`ProjectStore`] owns project records, their task membership lists and
//! the "selected project" pointer. It reads the
//! [`TaskStore`](crate::tasks::TaskStore) on demand to hydrate projects with
//! their tasks, and never mutates it.
//!
//! Lookups are forgiving except for [`ProjectStore::get_project`], which is
//! the one operation that fails on an unknown id.

pub mod store;

pub use store::ProjectStore;

use taskbox_proto::ProjectId;
use thiserror::Error;

/// Errors that can occur during project operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProjectError {
    /// Project with the given ID was not found.
    #[error("project not found: {0}")]
    NotFound(ProjectId),
}
