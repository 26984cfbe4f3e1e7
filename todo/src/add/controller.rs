//! Presentation-facing handle for the add-task form.

use super::reducer::{AddTodoEnvironment, AddTodoReducer};
use super::types::{AddTodoAction, AddTodoSideEffect, AddTodoState};
use std::sync::Arc;
use std::time::Duration;
use tasklist_core::environment::Clock;
use tasklist_core::todo_store::TodoStore;
use tasklist_runtime::side_effect::{self, SideEffectReceiver};
use tasklist_runtime::{EffectHandle, Store, StoreError};
use tokio::sync::{watch, Mutex};

type AddStore = Store<AddTodoState, AddTodoAction, AddTodoEnvironment, AddTodoReducer>;

/// Drives one add-task form
pub struct AddTodoController {
    store: AddStore,
    side_effects: Mutex<SideEffectReceiver<AddTodoSideEffect>>,
}

impl AddTodoController {
    /// Creates an empty form
    #[must_use]
    pub fn new(todos: Arc<dyn TodoStore>, clock: Arc<dyn Clock>) -> Self {
        let (sender, receiver) = side_effect::channel();
        let env = AddTodoEnvironment::new(todos, clock, sender);

        Self {
            store: Store::new(AddTodoState::new(), AddTodoReducer::new(), env),
            side_effects: Mutex::new(receiver),
        }
    }

    /// Snapshot of the form
    pub async fn state(&self) -> AddTodoState {
        self.store.state(Clone::clone).await
    }

    /// Notified after every state change
    #[must_use]
    pub fn state_changes(&self) -> watch::Receiver<u64> {
        self.store.state_changes()
    }

    /// Next one-shot notification, waiting up to `timeout`
    pub async fn next_side_effect(&self, timeout: Duration) -> Option<AddTodoSideEffect> {
        self.side_effects.lock().await.recv_timeout(timeout).await
    }

    /// Name field edited
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once the store is shut down.
    pub async fn name_changed(&self, name: impl Into<String>) -> Result<EffectHandle, StoreError> {
        self.store.send(AddTodoAction::NameChanged { name: name.into() }).await
    }

    /// Importance checkbox toggled
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once the store is shut down.
    pub async fn important_changed(&self, important: bool) -> Result<EffectHandle, StoreError> {
        self.store.send(AddTodoAction::ImportantChanged { important }).await
    }

    /// Save button pressed
    ///
    /// The outcome arrives as a side effect: `TodoAdded`, `InvalidInput`
    /// or `StorageFailed`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once the store is shut down.
    pub async fn save(&self) -> Result<EffectHandle, StoreError> {
        self.store.send(AddTodoAction::SaveRequested).await
    }

    /// Save and wait for its outcome
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if no outcome is posted within `timeout`.
    pub async fn save_and_wait(&self, timeout: Duration) -> Result<AddTodoSideEffect, StoreError> {
        self.save().await?;
        self.next_side_effect(timeout).await.ok_or(StoreError::Timeout)
    }
}
