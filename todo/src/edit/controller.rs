//! Presentation-facing handle for the edit-task form.

use super::reducer::{EditTodoEnvironment, EditTodoReducer};
use super::types::{EditTodoAction, EditTodoSideEffect, EditTodoState};
use std::sync::Arc;
use std::time::Duration;
use tasklist_core::task::Task;
use tasklist_core::todo_store::TodoStore;
use tasklist_runtime::side_effect::{self, SideEffectReceiver};
use tasklist_runtime::{EffectHandle, Store, StoreError};
use tokio::sync::{watch, Mutex};

type EditStore = Store<EditTodoState, EditTodoAction, EditTodoEnvironment, EditTodoReducer>;

/// Drives one edit-task form
pub struct EditTodoController {
    store: EditStore,
    side_effects: Mutex<SideEffectReceiver<EditTodoSideEffect>>,
}

impl EditTodoController {
    /// Opens the form on `task`, rendering its creation time with `timestamp_format`
    #[must_use]
    pub fn new(todos: Arc<dyn TodoStore>, task: Task, timestamp_format: &str) -> Self {
        let (sender, receiver) = side_effect::channel();
        let env = EditTodoEnvironment::new(todos, sender);

        Self {
            store: Store::new(
                EditTodoState::new(task, timestamp_format),
                EditTodoReducer::new(),
                env,
            ),
            side_effects: Mutex::new(receiver),
        }
    }

    /// Snapshot of the form
    pub async fn state(&self) -> EditTodoState {
        self.store.state(Clone::clone).await
    }

    /// Notified after every state change
    #[must_use]
    pub fn state_changes(&self) -> watch::Receiver<u64> {
        self.store.state_changes()
    }

    /// Next one-shot notification, waiting up to `timeout`
    pub async fn next_side_effect(&self, timeout: Duration) -> Option<EditTodoSideEffect> {
        self.side_effects.lock().await.recv_timeout(timeout).await
    }

    /// Name field edited
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once the store is shut down.
    pub async fn name_changed(&self, name: impl Into<String>) -> Result<EffectHandle, StoreError> {
        self.store.send(EditTodoAction::NameChanged { name: name.into() }).await
    }

    /// Importance checkbox toggled
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once the store is shut down.
    pub async fn important_changed(&self, important: bool) -> Result<EffectHandle, StoreError> {
        self.store.send(EditTodoAction::ImportantChanged { important }).await
    }

    /// Save button pressed
    ///
    /// The outcome arrives as a side effect: `TodoUpdated`, `InvalidInput`
    /// or `StorageFailed`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once the store is shut down.
    pub async fn save(&self) -> Result<EffectHandle, StoreError> {
        self.store.send(EditTodoAction::SaveRequested).await
    }

    /// Save and wait for its outcome
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if no outcome is posted within `timeout`.
    pub async fn save_and_wait(&self, timeout: Duration) -> Result<EditTodoSideEffect, StoreError> {
        self.save().await?;
        self.next_side_effect(timeout).await.ok_or(StoreError::Timeout)
    }
}
