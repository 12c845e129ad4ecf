//! Task collection for `TaskBox`.
//!
//! The [`TaskStore`] owns every [`Task`](taskbox_proto::Task) record. Its
//! mutations are forgiving: operations on an unknown id leave the collection
//! unchanged instead of failing, so a UI can retry freely.

pub mod store;

pub use store::TaskStore;
pub use taskbox_proto::task::TaskError;
