//! Property-based tests for the persisted project layout.
//!
//! Uses proptest to verify:
//! 1. Any project collection survives `encode_projects` → `decode_projects`.
//! 2. The persisted layout is a bare JSON array with camelCase keys.
//! 3. Arbitrary text never panics `decode_projects` (returns `Err`).
//! 4. A task survives the generic `encode` → `decode` pair.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::{DateTime, Utc};
use proptest::prelude::*;
use taskbox_proto::codec::{decode, decode_projects, encode, encode_projects};
use taskbox_proto::{Project, ProjectId, Task, TaskId};

/// Strategy for timestamps between 1970 and 2100 at millisecond precision.
fn arb_timestamp() -> impl Strategy<Value = DateTime<Utc>> {
    (0i64..4_102_444_800_000)
        .prop_map(|ms| DateTime::from_timestamp_millis(ms).unwrap_or_default())
}

fn arb_task_id() -> impl Strategy<Value = TaskId> {
    "[a-z0-9-]{1,36}".prop_map(TaskId::from)
}

fn arb_project_id() -> impl Strategy<Value = ProjectId> {
    "project-[0-9]{1,13}-[a-z0-9]{9}".prop_map(ProjectId::from)
}

fn arb_task() -> impl Strategy<Value = Task> {
    (
        arb_task_id(),
        "[^\x00]{1,64}",
        proptest::option::of("[^\x00]{0,128}"),
        proptest::option::of(arb_timestamp()),
        any::<bool>(),
    )
        .prop_map(|(id, title, description, due_date, is_completed)| Task {
            id,
            title,
            description,
            due_date,
            is_completed,
        })
}

fn arb_project() -> impl Strategy<Value = Project> {
    (
        arb_project_id(),
        "[^\x00]{1,64}",
        proptest::option::of("[^\x00]{0,128}"),
        proptest::option::of(arb_timestamp()),
        proptest::option::of(arb_timestamp()),
        any::<bool>(),
        prop::collection::vec(arb_task_id(), 0..8),
        (arb_timestamp(), arb_timestamp()),
    )
        .prop_map(
            |(id, title, description, start_date, end_date, is_completed, task_ids, (c, u))| {
                Project {
                    id,
                    title,
                    description,
                    start_date,
                    end_date,
                    is_completed,
                    task_ids,
                    created_at: c,
                    updated_at: u,
                }
            },
        )
}

proptest! {
    #[test]
    fn project_collection_roundtrip(projects in prop::collection::vec(arb_project(), 0..6)) {
        let text = encode_projects(&projects).expect("encode should succeed");
        let decoded = decode_projects(&text).expect("decode should succeed");
        prop_assert_eq!(decoded, projects);
    }

    #[test]
    fn persisted_layout_is_bare_camel_case_array(projects in prop::collection::vec(arb_project(), 1..4)) {
        let text = encode_projects(&projects).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        let array = value.as_array().unwrap();
        prop_assert_eq!(array.len(), projects.len());
        for entry in array {
            prop_assert!(entry.get("taskIds").is_some());
            prop_assert!(entry.get("isCompleted").is_some());
            prop_assert!(entry.get("createdAt").is_some());
            prop_assert!(entry.get("task_ids").is_none());
        }
    }

    #[test]
    fn decode_never_panics(text in ".*") {
        let _ = decode_projects(&text);
    }

    #[test]
    fn task_roundtrip(task in arb_task()) {
        let text = encode(&task).unwrap();
        let decoded: Task = decode(&text).unwrap();
        prop_assert_eq!(decoded, task);
    }
}
