//! Presentation-facing handle for the task list screen.

use super::reducer::{TodoListEnvironment, TodoListReducer};
use super::types::{TodoListAction, TodoListOptions, TodoListSideEffect, TodoListState};
use std::sync::Arc;
use std::time::Duration;
use tasklist_core::settings::{SettingsStore, TaskSort};
use tasklist_core::task::Task;
use tasklist_core::todo_store::TodoStore;
use tasklist_runtime::side_effect::{self, SideEffectReceiver};
use tasklist_runtime::{EffectHandle, Store, StoreError};
use tokio::sync::{broadcast, watch, Mutex};

type ListStore = Store<TodoListState, TodoListAction, TodoListEnvironment, TodoListReducer>;

/// Drives one task list screen
///
/// Intent methods return as soon as the action is reduced; the returned
/// [`EffectHandle`] completes when the store call it started has finished.
pub struct TodoListController {
    store: ListStore,
    side_effects: Mutex<SideEffectReceiver<TodoListSideEffect>>,
}

impl TodoListController {
    /// Creates an inactive list over the given stores
    #[must_use]
    pub fn new(
        todos: Arc<dyn TodoStore>,
        settings: Arc<dyn SettingsStore>,
        options: TodoListOptions,
    ) -> Self {
        let (sender, receiver) = side_effect::channel();
        let env = TodoListEnvironment::new(todos, settings, sender, options);

        Self {
            store: Store::new(TodoListState::new(), TodoListReducer::new(), env),
            side_effects: Mutex::new(receiver),
        }
    }

    async fn send(&self, action: TodoListAction) -> Result<EffectHandle, StoreError> {
        self.store.send(action).await
    }

    /// Snapshot of the current state
    pub async fn state(&self) -> TodoListState {
        self.store.state(Clone::clone).await
    }

    /// Notified after every state change
    #[must_use]
    pub fn state_changes(&self) -> watch::Receiver<u64> {
        self.store.state_changes()
    }

    /// Every feedback action, after it was reduced
    #[must_use]
    pub fn subscribe_actions(&self) -> broadcast::Receiver<TodoListAction> {
        self.store.subscribe_actions()
    }

    /// Send an action and wait for the first feedback action matching `predicate`
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if nothing matches within `timeout`.
    pub async fn send_and_wait_for<F>(
        &self,
        action: TodoListAction,
        predicate: F,
        timeout: Duration,
    ) -> Result<TodoListAction, StoreError>
    where
        F: Fn(&TodoListAction) -> bool,
    {
        self.store.send_and_wait_for(action, predicate, timeout).await
    }

    /// Wait until the state satisfies `predicate`
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if it does not happen within `timeout`.
    pub async fn wait_until<F>(&self, timeout: Duration, predicate: F) -> Result<TodoListState, StoreError>
    where
        F: Fn(&TodoListState) -> bool,
    {
        let mut changes = self.store.state_changes();
        tokio::time::timeout(timeout, async {
            loop {
                let state = self.state().await;
                if predicate(&state) {
                    return Ok(state);
                }
                if changes.changed().await.is_err() {
                    return Err(StoreError::ChannelClosed);
                }
            }
        })
        .await
        .map_err(|_| StoreError::Timeout)?
    }

    /// Activate and wait for the first query result
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if no result arrives within `timeout`.
    pub async fn activate_and_wait(&self, timeout: Duration) -> Result<TodoListState, StoreError> {
        if self.store.state(|s| s.active && s.preferences_loaded).await {
            return Ok(self.state().await);
        }
        let mut results = self.store.subscribe_actions();
        self.activate().await?;

        tokio::time::timeout(timeout, async {
            loop {
                match results.recv().await {
                    Ok(TodoListAction::TodosLoaded { .. } | TodoListAction::QueryFailed { .. }) => {
                        return Ok(());
                    },
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {},
                    Err(broadcast::error::RecvError::Closed) => return Err(StoreError::ChannelClosed),
                }
            }
        })
        .await
        .map_err(|_| StoreError::Timeout)??;

        Ok(self.state().await)
    }

    /// Next one-shot notification, waiting up to `timeout`
    pub async fn next_side_effect(&self, timeout: Duration) -> Option<TodoListSideEffect> {
        self.side_effects.lock().await.recv_timeout(timeout).await
    }

    /// Next one-shot notification if one is already queued
    pub async fn try_side_effect(&self) -> Option<TodoListSideEffect> {
        self.side_effects.lock().await.try_recv()
    }

    /// Stop the live query and timers, then wait for pending store calls
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if store calls are still
    /// running after the default shutdown timeout.
    pub async fn close(&self) -> Result<(), StoreError> {
        self.store.close().await
    }

    // ========== Intents ==========

    /// The screen became visible
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`close`](Self::close).
    pub async fn activate(&self) -> Result<EffectHandle, StoreError> {
        self.send(TodoListAction::Activate).await
    }

    /// The screen went away
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`close`](Self::close).
    pub async fn deactivate(&self) -> Result<EffectHandle, StoreError> {
        self.send(TodoListAction::Deactivate).await
    }

    /// Search text edited
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`close`](Self::close).
    pub async fn query_changed(&self, query: impl Into<String>) -> Result<EffectHandle, StoreError> {
        self.send(TodoListAction::QueryChanged { query: query.into() }).await
    }

    /// Checkbox toggled
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`close`](Self::close).
    pub async fn task_checked(&self, task: Task, completed: bool) -> Result<EffectHandle, StoreError> {
        self.send(TodoListAction::TaskChecked { task, completed }).await
    }

    /// Task swiped away
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`close`](Self::close).
    pub async fn delete_task(&self, task: Task) -> Result<EffectHandle, StoreError> {
        self.send(TodoListAction::DeleteTask { task }).await
    }

    /// Restore the most recently deleted task
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`close`](Self::close).
    pub async fn undo_delete(&self) -> Result<EffectHandle, StoreError> {
        self.send(TodoListAction::UndoDelete).await
    }

    /// Search field opened
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`close`](Self::close).
    pub async fn search_expanded(&self) -> Result<EffectHandle, StoreError> {
        self.send(TodoListAction::SearchExpanded).await
    }

    /// Search field closed
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`close`](Self::close).
    pub async fn search_collapsed(&self) -> Result<EffectHandle, StoreError> {
        self.send(TodoListAction::SearchCollapsed).await
    }

    /// Overflow menu opened
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`close`](Self::close).
    pub async fn menu_expanded(&self) -> Result<EffectHandle, StoreError> {
        self.send(TodoListAction::MenuExpanded).await
    }

    /// Overflow menu closed
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`close`](Self::close).
    pub async fn menu_collapsed(&self) -> Result<EffectHandle, StoreError> {
        self.send(TodoListAction::MenuCollapsed).await
    }

    /// Sort menu opened
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`close`](Self::close).
    pub async fn sort_expanded(&self) -> Result<EffectHandle, StoreError> {
        self.send(TodoListAction::SortExpanded).await
    }

    /// Sort menu closed
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`close`](Self::close).
    pub async fn sort_collapsed(&self) -> Result<EffectHandle, StoreError> {
        self.send(TodoListAction::SortCollapsed).await
    }

    /// Sort order picked
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`close`](Self::close).
    pub async fn sort_selected(&self, sort: TaskSort) -> Result<EffectHandle, StoreError> {
        self.send(TodoListAction::SortSelected { sort }).await
    }

    /// "Hide completed" toggled
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`close`](Self::close).
    pub async fn hide_completed_toggled(&self) -> Result<EffectHandle, StoreError> {
        self.send(TodoListAction::HideCompletedToggled).await
    }

    /// Ask to delete completed tasks
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`close`](Self::close).
    pub async fn delete_completed_dialog_shown(&self) -> Result<EffectHandle, StoreError> {
        self.send(TodoListAction::DeleteCompletedDialogShown).await
    }

    /// "Delete completed?" cancelled
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`close`](Self::close).
    pub async fn delete_completed_dialog_dismissed(&self) -> Result<EffectHandle, StoreError> {
        self.send(TodoListAction::DeleteCompletedDialogDismissed).await
    }

    /// "Delete completed?" confirmed
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`close`](Self::close).
    pub async fn delete_completed_confirmed(&self) -> Result<EffectHandle, StoreError> {
        self.send(TodoListAction::DeleteCompletedConfirmed).await
    }

    /// Ask to delete every task
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`close`](Self::close).
    pub async fn delete_all_dialog_shown(&self) -> Result<EffectHandle, StoreError> {
        self.send(TodoListAction::DeleteAllDialogShown).await
    }

    /// "Delete all?" cancelled
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`close`](Self::close).
    pub async fn delete_all_dialog_dismissed(&self) -> Result<EffectHandle, StoreError> {
        self.send(TodoListAction::DeleteAllDialogDismissed).await
    }

    /// "Delete all?" confirmed
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`close`](Self::close).
    pub async fn delete_all_confirmed(&self) -> Result<EffectHandle, StoreError> {
        self.send(TodoListAction::DeleteAllConfirmed).await
    }
}
