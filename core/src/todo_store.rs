//! Todo store trait and related types.
//!
//! The todo store persists [`Task`] records and answers live queries: a
//! query returns a stream that yields the matching tasks immediately and then
//! again after every committed insert, update or delete, until the stream is
//! dropped.
//!
//! # Implementations
//!
//! - `SqliteTodoStore` (in `tasklist-sqlite` crate): Embedded database
//! - `InMemoryTodoStore` (in `tasklist-testing` crate): Fast, deterministic testing
//!
//! # Example
//!
//! ```no_run
//! use futures::StreamExt;
//! use tasklist_core::settings::TaskSort;
//! use tasklist_core::task::{Task, TaskQuery};
//! use tasklist_core::todo_store::{TodoStore, TodoStoreError};
//!
//! async fn example<S: TodoStore>(store: &S) -> Result<(), TodoStoreError> {
//!     let id = store.insert(Task::new("Buy milk", false, chrono::Utc::now())).await?;
//!
//!     let mut todos = store.query(TaskQuery::new("milk", false, TaskSort::DateAscending));
//!     if let Some(snapshot) = todos.next().await {
//!         assert!(snapshot?.iter().any(|t| t.id == id));
//!     }
//!     Ok(())
//! }
//! ```

use crate::task::{Task, TaskId, TaskQuery};
use futures::Stream;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur during todo store operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TodoStoreError {
    /// The task failed validation (e.g. blank name); nothing was written.
    #[error("Invalid task: {0}")]
    Validation(String),

    /// No task with this identity exists.
    #[error("Task not found: {0}")]
    NotFound(TaskId),

    /// The underlying storage is unavailable or rejected the operation.
    #[error("Database error: {0}")]
    Database(String),
}

/// Convenience alias for todo store results
pub type Result<T> = std::result::Result<T, TodoStoreError>;

/// Live stream of query snapshots
///
/// Each item fully replaces the previous one.
pub type TaskStream = Pin<Box<dyn Stream<Item = Result<Vec<Task>>> + Send>>;

/// Rejects names that are empty or whitespace-only.
///
/// # Errors
///
/// Returns [`TodoStoreError::Validation`] for a blank name.
pub fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(TodoStoreError::Validation(
            "Task name cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Persistence for tasks.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; controllers share one store as
/// `Arc<dyn TodoStore>` and effects capture clones of that `Arc`.
///
/// # Idempotency
///
/// Only `delete` is idempotent. Re-issuing `insert` creates a second task
/// with a new identity.
///
/// # Dyn Compatibility
///
/// This trait uses explicit `Pin<Box<dyn Future>>` returns instead of `async fn`
/// to enable trait object usage (`Arc<dyn TodoStore>`).
pub trait TodoStore: Send + Sync {
    /// Open a live query.
    ///
    /// The stream yields the current matching tasks, ordered per
    /// `query.sort`, then a fresh snapshot after every change to the task
    /// collection. A failed read yields one `Err` and the stream keeps
    /// waiting for the next change. Dropping the stream ends the subscription.
    fn query(&self, query: TaskQuery) -> TaskStream;

    /// Insert a task and return its newly assigned identity.
    ///
    /// Any identity carried by `task` is ignored. `completed` and
    /// `created_at` are stored as given.
    ///
    /// # Errors
    ///
    /// - `Validation`: blank name
    /// - `Database`: storage failure
    fn insert(&self, task: Task) -> Pin<Box<dyn Future<Output = Result<TaskId>> + Send + '_>>;

    /// Replace name, importance and completion of the task with `task.id`.
    ///
    /// `created_at` is never rewritten.
    ///
    /// # Errors
    ///
    /// - `Validation`: blank name
    /// - `NotFound`: no task with this identity
    /// - `Database`: storage failure
    fn update(&self, task: Task) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Delete the task with `task.id`. Deleting a missing task succeeds.
    ///
    /// # Errors
    ///
    /// Returns `Database` on storage failure.
    fn delete(&self, task: Task) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Delete every completed task, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `Database` on storage failure.
    fn delete_all_completed(&self) -> Pin<Box<dyn Future<Output = Result<u64>> + Send + '_>>;

    /// Delete every task, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `Database` on storage failure.
    fn delete_all(&self) -> Pin<Box<dyn Future<Output = Result<u64>> + Send + '_>>;

    /// Load a single task.
    ///
    /// # Errors
    ///
    /// Returns `Database` on storage failure.
    fn get(&self, id: TaskId) -> Pin<Box<dyn Future<Output = Result<Option<Task>>> + Send + '_>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_names_are_invalid() {
        assert!(validate_name("").is_err());
        assert!(validate_name("   \t").is_err());
        assert_eq!(validate_name(" Buy milk "), Ok(()));
    }

    #[test]
    fn not_found_display() {
        let error = TodoStoreError::NotFound(TaskId::new(42));
        assert_eq!(error.to_string(), "Task not found: 42");
    }
}
