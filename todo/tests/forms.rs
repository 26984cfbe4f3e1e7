//! Add and edit forms over the in-memory task store.

#![allow(clippy::expect_used, clippy::unwrap_used)] // Test code uses expect for clear failure messages

use chrono::Local;
use std::sync::Arc;
use std::time::Duration;
use tasklist::edit::format_timestamp;
use tasklist::{AddTodoController, AddTodoSideEffect, EditTodoController, EditTodoSideEffect, InputError};
use tasklist_core::task::{Task, TaskId};
use tasklist_core::todo_store::TodoStore;
use tasklist_testing::helpers::init_tracing;
use tasklist_testing::{test_clock, test_time, InMemoryTodoStore};

const WAIT: Duration = Duration::from_secs(2);

fn add_form(todos: &InMemoryTodoStore) -> AddTodoController {
    init_tracing();
    AddTodoController::new(Arc::new(todos.clone()), Arc::new(test_clock()))
}

async fn stored(todos: &InMemoryTodoStore, name: &str) -> Task {
    let id = todos.insert(Task::new(name, false, test_time())).await.unwrap();
    todos.task(id).unwrap()
}

#[tokio::test]
async fn add_form_saves_a_new_task() {
    let todos = InMemoryTodoStore::new();
    let form = add_form(&todos);

    form.name_changed("Buy milk").await.unwrap();
    form.important_changed(true).await.unwrap();
    let outcome = form.save_and_wait(WAIT).await.unwrap();

    let AddTodoSideEffect::TodoAdded { id } = outcome else {
        panic!("expected TodoAdded, got {outcome:?}");
    };
    let task = todos.task(id).expect("task was not stored");
    assert_eq!(task.name, "Buy milk");
    assert!(task.important);
    assert!(!task.completed);
    assert_eq!(task.created_at, test_time());

    let state = form.state().await;
    assert!(state.name.is_empty());
    assert!(!state.important);
    assert!(!state.saving);
}

#[tokio::test]
async fn add_form_keeps_names_as_typed() {
    let todos = InMemoryTodoStore::new();
    let form = add_form(&todos);

    form.name_changed("  padded  ").await.unwrap();
    let outcome = form.save_and_wait(WAIT).await.unwrap();

    let AddTodoSideEffect::TodoAdded { id } = outcome else {
        panic!("expected TodoAdded, got {outcome:?}");
    };
    assert_eq!(todos.task(id).unwrap().name, "  padded  ");
}

#[tokio::test]
async fn add_form_rejects_blank_names() {
    let todos = InMemoryTodoStore::new();
    let form = add_form(&todos);

    form.name_changed(" \t ").await.unwrap();
    let outcome = form.save_and_wait(WAIT).await.unwrap();

    assert_eq!(outcome, AddTodoSideEffect::InvalidInput(InputError::EmptyName));
    assert!(todos.is_empty());
    assert_eq!(form.state().await.name, " \t ");
}

#[tokio::test]
async fn add_form_reports_storage_failure_and_keeps_input() {
    let todos = InMemoryTodoStore::new();
    todos.set_failing(true);
    let form = add_form(&todos);

    form.name_changed("Buy milk").await.unwrap();
    let outcome = form.save_and_wait(WAIT).await.unwrap();

    assert!(matches!(outcome, AddTodoSideEffect::StorageFailed { .. }));
    let state = form.state().await;
    assert_eq!(state.name, "Buy milk");
    assert!(!state.saving);

    todos.set_failing(false);
    let outcome = form.save_and_wait(WAIT).await.unwrap();
    assert!(matches!(outcome, AddTodoSideEffect::TodoAdded { .. }));
    assert_eq!(todos.len(), 1);
}

#[tokio::test]
async fn edit_form_starts_from_the_task() {
    init_tracing();
    let todos = InMemoryTodoStore::new();
    let task = stored(&todos, "Buy milk").await;

    let form = EditTodoController::new(Arc::new(todos.clone()), task.clone(), "%Y-%m-%d");
    let state = form.state().await;

    assert_eq!(state.name, "Buy milk");
    assert!(!state.important);
    assert_eq!(
        state.timestamp,
        test_time().with_timezone(&Local).format("%Y-%m-%d").to_string()
    );
    assert_eq!(state.timestamp, format_timestamp(task.created_at, "%Y-%m-%d"));
}

#[tokio::test]
async fn edit_form_updates_name_and_importance_only() {
    init_tracing();
    let todos = InMemoryTodoStore::new();
    let task = stored(&todos, "Buy milk").await;
    todos.update(task.clone().with_completed(true)).await.unwrap();
    let task = todos.task(task.id).unwrap();

    let form = EditTodoController::new(Arc::new(todos.clone()), task.clone(), "%H:%M");
    form.name_changed("Buy oat milk").await.unwrap();
    form.important_changed(true).await.unwrap();
    let outcome = form.save_and_wait(WAIT).await.unwrap();

    let EditTodoSideEffect::TodoUpdated { task: updated } = outcome else {
        panic!("expected TodoUpdated, got {outcome:?}");
    };
    let back = todos.task(task.id).unwrap();
    assert_eq!(back, updated);
    assert_eq!(back.name, "Buy oat milk");
    assert!(back.important);
    assert!(back.completed);
    assert_eq!(back.created_at, task.created_at);
    assert_eq!(form.state().await.task, back);
}

#[tokio::test]
async fn edit_form_rejects_blank_names() {
    init_tracing();
    let todos = InMemoryTodoStore::new();
    let task = stored(&todos, "Buy milk").await;

    let form = EditTodoController::new(Arc::new(todos.clone()), task.clone(), "%Y");
    form.name_changed("   ").await.unwrap();
    let outcome = form.save_and_wait(WAIT).await.unwrap();

    assert_eq!(outcome, EditTodoSideEffect::InvalidInput(InputError::EmptyName));
    assert_eq!(todos.task(task.id).unwrap().name, "Buy milk");
}

#[tokio::test]
async fn editing_a_deleted_task_fails() {
    init_tracing();
    let todos = InMemoryTodoStore::new();
    let ghost = Task::new("gone", false, test_time()).with_id(TaskId::new(42));

    let form = EditTodoController::new(Arc::new(todos.clone()), ghost, "%Y");
    form.name_changed("still gone").await.unwrap();
    let outcome = form.save_and_wait(WAIT).await.unwrap();

    assert!(matches!(outcome, EditTodoSideEffect::StorageFailed { .. }));
    assert!(todos.is_empty());
}
