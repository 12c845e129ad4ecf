//! Property-based tests for store invariants.
//!
//! Uses proptest to verify:
//! 1. Deleting tasks keeps the survivors in insertion order.
//! 2. Toggling completion twice restores the task.
//! 3. A patch changes exactly the fields it carries.
//! 4. Removing a task from a project drops every copy and keeps the rest
//!    of the membership order.
//! 5. Hydration never yields tasks outside the membership list.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::collections::HashSet;
use std::sync::Arc;

use proptest::prelude::*;
use taskbox::projects::ProjectStore;
use taskbox::tasks::TaskStore;
use taskbox_proto::{NewProject, NewTask, Task, TaskId, TaskPatch};

fn make_task(n: usize) -> Task {
    NewTask::titled(format!("task {n}"))
        .with_id(format!("t{n}"))
        .build(256)
        .unwrap()
}

fn filled_store(count: usize) -> TaskStore {
    let store = TaskStore::new();
    for n in 0..count {
        store.add_task(make_task(n));
    }
    store
}

fn arb_patch() -> impl Strategy<Value = TaskPatch> {
    (
        proptest::option::of("[a-z ]{1,20}"),
        proptest::option::of(proptest::option::of("[a-z ]{0,20}")),
        proptest::option::of(any::<bool>()),
    )
        .prop_map(|(title, description, is_completed)| TaskPatch {
            title,
            description,
            due_date: None,
            is_completed,
        })
}

proptest! {
    #[test]
    fn deletes_preserve_survivor_order(
        count in 1usize..20,
        deletions in prop::collection::vec(0usize..20, 0..10),
    ) {
        let store = filled_store(count);
        let deleted: HashSet<usize> = deletions.iter().copied().filter(|n| *n < count).collect();
        for n in &deletions {
            store.delete_task(&TaskId::from(format!("t{n}")));
        }

        let expected: Vec<String> = (0..count)
            .filter(|n| !deleted.contains(n))
            .map(|n| format!("t{n}"))
            .collect();
        let actual: Vec<String> = store
            .all_tasks()
            .into_iter()
            .map(|t| t.id.as_str().to_string())
            .collect();
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn double_toggle_is_identity(count in 1usize..10, pick in 0usize..10) {
        let store = filled_store(count);
        let id = TaskId::from(format!("t{}", pick % count));
        let before = store.get_task(&id).unwrap();

        prop_assert!(store.toggle_task_completion(&id));
        prop_assert_ne!(store.get_task(&id).unwrap().is_completed, before.is_completed);
        prop_assert!(store.toggle_task_completion(&id));
        prop_assert_eq!(store.get_task(&id).unwrap(), before);
    }

    #[test]
    fn patch_changes_only_present_fields(patch in arb_patch()) {
        let store = TaskStore::new();
        let original = NewTask::titled("original")
            .with_id("t")
            .with_description("notes")
            .build(256)
            .unwrap();
        store.add_task(original.clone());

        prop_assert!(store.update_task(&original.id, &patch));
        let updated = store.get_task(&original.id).unwrap();

        prop_assert_eq!(&updated.id, &original.id);
        prop_assert_eq!(updated.due_date, original.due_date);
        prop_assert_eq!(
            &updated.title,
            patch.title.as_ref().unwrap_or(&original.title)
        );
        prop_assert_eq!(
            &updated.description,
            patch.description.as_ref().unwrap_or(&original.description)
        );
        prop_assert_eq!(
            updated.is_completed,
            patch.is_completed.unwrap_or(original.is_completed)
        );
    }

    #[test]
    fn removal_drops_all_copies_and_keeps_order(
        membership in prop::collection::vec(0usize..5, 0..15),
        target in 0usize..5,
    ) {
        let tasks = Arc::new(filled_store(5));
        let projects = ProjectStore::in_memory(Arc::clone(&tasks));
        let project = projects.add_project(NewProject::titled("P"));
        for n in &membership {
            projects.add_task_to_project(&project.id, &TaskId::from(format!("t{n}")));
        }

        let target_id = TaskId::from(format!("t{target}"));
        prop_assert!(projects.remove_task_from_project(&project.id, &target_id));

        let expected: Vec<TaskId> = membership
            .iter()
            .filter(|n| **n != target)
            .map(|n| TaskId::from(format!("t{n}")))
            .collect();
        prop_assert_eq!(projects.get_project(&project.id).unwrap().task_ids, expected);
    }

    #[test]
    fn hydration_is_subset_of_membership(
        membership in prop::collection::vec(0usize..8, 0..12),
        deletions in prop::collection::vec(0usize..8, 0..4),
    ) {
        let tasks = Arc::new(filled_store(8));
        let projects = ProjectStore::in_memory(Arc::clone(&tasks));
        let project = projects.add_project(NewProject::titled("P"));
        for n in &membership {
            projects.add_task_to_project(&project.id, &TaskId::from(format!("t{n}")));
        }
        for n in &deletions {
            tasks.delete_task(&TaskId::from(format!("t{n}")));
        }

        let view = projects.get_project_with_tasks(&project.id).unwrap();
        let expected: Vec<TaskId> = membership
            .iter()
            .filter(|n| !deletions.contains(*n))
            .map(|n| TaskId::from(format!("t{n}")))
            .collect();
        let actual: Vec<TaskId> = view.tasks.into_iter().map(|t| t.id).collect();
        prop_assert_eq!(actual, expected);
    }
}
