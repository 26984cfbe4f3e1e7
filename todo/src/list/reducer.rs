//! Reducer logic for the task list screen.
//!
//! The list never mutates `todos` itself: every change goes to the store and
//! comes back through the live query, which is the only writer of `todos`.

use super::types::{
    PreferenceRefresh, TodoListAction, TodoListOptions, TodoListSideEffect, TodoListState,
    TODOS_QUERY, UNDO_WINDOW,
};
use futures::StreamExt;
use std::sync::Arc;
use tasklist_core::settings::{Preferences, SettingsStore, TaskSort};
use tasklist_core::task::Task;
use tasklist_core::todo_store::TodoStore;
use tasklist_core::{
    async_effect, delay, effect::Effect, reducer::Reducer, smallvec, stream_effect, SmallVec,
};
use tasklist_runtime::serial::SerialQueue;
use tasklist_runtime::side_effect::SideEffectSender;

/// Environment dependencies for the list reducer
#[derive(Clone)]
pub struct TodoListEnvironment {
    /// Task persistence
    pub todos: Arc<dyn TodoStore>,
    /// Preference persistence
    pub settings: Arc<dyn SettingsStore>,
    /// One-shot notifications for the presentation layer
    pub side_effects: SideEffectSender<TodoListSideEffect>,
    /// Undo window and preference refresh policy
    pub options: TodoListOptions,
    /// Store writes, committed in the order their intents were reduced
    pub writes: SerialQueue,
}

impl TodoListEnvironment {
    /// Creates a new `TodoListEnvironment`
    #[must_use]
    pub fn new(
        todos: Arc<dyn TodoStore>,
        settings: Arc<dyn SettingsStore>,
        side_effects: SideEffectSender<TodoListSideEffect>,
        options: TodoListOptions,
    ) -> Self {
        Self {
            todos,
            settings,
            side_effects,
            options,
            writes: SerialQueue::new(),
        }
    }

    fn live(&self) -> bool {
        self.options.preference_refresh == PreferenceRefresh::Live
    }
}

/// Reducer for the task list screen
#[derive(Clone, Debug, Default)]
pub struct TodoListReducer;

impl TodoListReducer {
    /// Creates a new `TodoListReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// (Re)opens the live query for the current parameters
    ///
    /// The previous subscription is aborted by the runtime because both run
    /// under [`TODOS_QUERY`]; the generation bump drops anything it already
    /// queued.
    fn open_query(state: &mut TodoListState, env: &TodoListEnvironment) -> Effect<TodoListAction> {
        state.generation += 1;
        let generation = state.generation;
        let query = state.current_query();
        tracing::debug!(generation, ?query, "Opening live query");

        stream_effect!(env.todos.query(query).map(move |result| match result {
            Ok(todos) => TodoListAction::TodosLoaded { generation, todos },
            Err(error) => TodoListAction::QueryFailed {
                generation,
                error: error.to_string(),
            },
        }))
        .cancellable(TODOS_QUERY)
    }

    /// Reopens the query if one is open, otherwise does nothing
    fn requery(state: &mut TodoListState, env: &TodoListEnvironment) -> Effect<TodoListAction> {
        if state.active && state.preferences_loaded {
            Self::open_query(state, env)
        } else {
            Effect::None
        }
    }

    /// Empties the undo slot; the returned effect stops its timer
    fn forfeit_undo(state: &mut TodoListState) -> Effect<TodoListAction> {
        match state.last_deleted.take() {
            Some(task) => {
                tracing::debug!(id = %task.id, "Undo forfeited");
                Effect::Cancel(UNDO_WINDOW)
            },
            None => Effect::None,
        }
    }

    fn post(env: &TodoListEnvironment, side_effect: TodoListSideEffect) -> Effect<TodoListAction> {
        let side_effects = env.side_effects.clone();
        async_effect! {
            side_effects.post(side_effect);
            None
        }
    }

    fn update_task(env: &TodoListEnvironment, task: Task) -> Effect<TodoListAction> {
        let todos = Arc::clone(&env.todos);
        let turn = env.writes.ticket();
        async_effect! {
            match turn.run(todos.update(task)).await {
                Ok(()) => None,
                Err(error) => Some(TodoListAction::StorageFailed { error: error.to_string() }),
            }
        }
    }

    fn delete_task(env: &TodoListEnvironment, task: Task) -> Effect<TodoListAction> {
        let todos = Arc::clone(&env.todos);
        let turn = env.writes.ticket();
        async_effect! {
            match turn.run(todos.delete(task.clone())).await {
                Ok(()) => Some(TodoListAction::TaskDeleted { task }),
                Err(error) => Some(TodoListAction::DeleteFailed { task, error: error.to_string() }),
            }
        }
    }

    fn restore_task(env: &TodoListEnvironment, task: &Task) -> Effect<TodoListAction> {
        let todos = Arc::clone(&env.todos);
        let task = task.unsaved();
        let turn = env.writes.ticket();
        async_effect! {
            match turn.run(todos.insert(task)).await {
                Ok(id) => Some(TodoListAction::TaskRestored { id }),
                Err(error) => Some(TodoListAction::StorageFailed { error: error.to_string() }),
            }
        }
    }

    fn delete_completed(env: &TodoListEnvironment) -> Effect<TodoListAction> {
        let todos = Arc::clone(&env.todos);
        let turn = env.writes.ticket();
        async_effect! {
            match turn.run(todos.delete_all_completed()).await {
                Ok(removed) => {
                    tracing::info!(removed, "Deleted completed tasks");
                    None
                },
                Err(error) => Some(TodoListAction::StorageFailed { error: error.to_string() }),
            }
        }
    }

    fn delete_all(env: &TodoListEnvironment) -> Effect<TodoListAction> {
        let todos = Arc::clone(&env.todos);
        let turn = env.writes.ticket();
        async_effect! {
            match turn.run(todos.delete_all()).await {
                Ok(removed) => {
                    tracing::info!(removed, "Deleted all tasks");
                    None
                },
                Err(error) => Some(TodoListAction::StorageFailed { error: error.to_string() }),
            }
        }
    }

    fn load_preferences(env: &TodoListEnvironment) -> Effect<TodoListAction> {
        let settings = Arc::clone(&env.settings);
        async_effect! {
            let preferences = settings.current().await.unwrap_or_else(|error| {
                tracing::warn!(%error, "Reading preferences failed, using defaults");
                Preferences::default()
            });
            Some(TodoListAction::PreferencesLoaded { preferences })
        }
    }

    fn save_sort(env: &TodoListEnvironment, sort: TaskSort) -> Effect<TodoListAction> {
        let settings = Arc::clone(&env.settings);
        let turn = env.writes.ticket();
        async_effect! {
            match turn.run(settings.update_sort(sort)).await {
                Ok(()) => Some(TodoListAction::PreferencesSaved),
                Err(error) => Some(TodoListAction::StorageFailed { error: error.to_string() }),
            }
        }
    }

    fn save_hide_completed(env: &TodoListEnvironment, hide_completed: bool) -> Effect<TodoListAction> {
        let settings = Arc::clone(&env.settings);
        let turn = env.writes.ticket();
        async_effect! {
            match turn.run(settings.update_hide_completed(hide_completed)).await {
                Ok(()) => Some(TodoListAction::PreferencesSaved),
                Err(error) => Some(TodoListAction::StorageFailed { error: error.to_string() }),
            }
        }
    }

    /// True if a result tagged `generation` belongs to the open query
    fn is_current(state: &TodoListState, generation: u64) -> bool {
        if state.active && generation == state.generation {
            return true;
        }
        tracing::debug!(
            generation,
            current = state.generation,
            "Dropping result of a stale query"
        );
        false
    }
}

impl Reducer for TodoListReducer {
    type State = TodoListState;
    type Action = TodoListAction;
    type Environment = TodoListEnvironment;

    #[allow(clippy::too_many_lines)] // One arm per action
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        if action.is_intent() {
            tracing::debug!(intent = action.name(), "List intent");
        }

        match action {
            // ========== Lifecycle ==========
            TodoListAction::Activate => {
                if state.active {
                    return SmallVec::new();
                }
                state.active = true;
                smallvec![Self::load_preferences(env)]
            },

            TodoListAction::PreferencesLoaded { preferences } => {
                if !state.active {
                    return SmallVec::new();
                }
                state.sort = preferences.sort;
                state.hide_completed = preferences.hide_completed;
                state.preferences_loaded = true;
                smallvec![Self::open_query(state, env)]
            },

            TodoListAction::Deactivate => {
                if !state.active {
                    return SmallVec::new();
                }
                state.active = false;
                state.preferences_loaded = false;
                state.generation += 1;
                state.last_deleted = None;
                smallvec![Effect::Cancel(TODOS_QUERY), Effect::Cancel(UNDO_WINDOW)]
            },

            // ========== Query ==========
            TodoListAction::QueryChanged { query } => {
                if query == state.query {
                    return SmallVec::new();
                }
                state.query = query;
                smallvec![Self::requery(state, env)]
            },

            TodoListAction::TodosLoaded { generation, todos } => {
                if Self::is_current(state, generation) {
                    state.todos = todos;
                    state.last_error = None;
                }
                SmallVec::new()
            },

            TodoListAction::QueryFailed { generation, error } => {
                if !Self::is_current(state, generation) {
                    return SmallVec::new();
                }
                state.last_error = Some(error.clone());
                smallvec![Self::post(env, TodoListSideEffect::StorageFailed { message: error })]
            },

            // ========== Task mutations ==========
            TodoListAction::TaskChecked { task, completed } => {
                let forfeit = Self::forfeit_undo(state);
                smallvec![forfeit, Self::update_task(env, task.with_completed(completed))]
            },

            TodoListAction::DeleteTask { task } => {
                let forfeit = Self::forfeit_undo(state);
                state.last_deleted = Some(task.clone());
                smallvec![forfeit, Self::delete_task(env, task)]
            },

            TodoListAction::TaskDeleted { task } => {
                if state.last_deleted.as_ref().map(|t| t.id) != Some(task.id) {
                    tracing::debug!(id = %task.id, "Delete committed after undo moved on");
                    return SmallVec::new();
                }
                tracing::info!(id = %task.id, "Task deleted, undo offered");
                let undo_window = env.options.undo_window;
                smallvec![
                    Self::post(env, TodoListSideEffect::TaskDeleted { task, undo_window }),
                    delay! {
                        duration: undo_window,
                        action: TodoListAction::UndoWindowExpired
                    }
                    .cancellable(UNDO_WINDOW),
                ]
            },

            TodoListAction::UndoDelete => match state.last_deleted.take() {
                Some(task) => smallvec![Effect::Cancel(UNDO_WINDOW), Self::restore_task(env, &task)],
                None => {
                    tracing::debug!("Nothing to undo");
                    SmallVec::new()
                },
            },

            TodoListAction::DeleteFailed { task, error } => {
                tracing::error!(%error, id = %task.id, "Deleting task failed");
                if state.last_deleted.as_ref().map(|t| t.id) == Some(task.id) {
                    state.last_deleted = None;
                }
                state.last_error = Some(error.clone());
                smallvec![Self::post(env, TodoListSideEffect::StorageFailed { message: error })]
            },

            TodoListAction::TaskRestored { id } => {
                tracing::info!(%id, "Deleted task restored");
                SmallVec::new()
            },

            TodoListAction::UndoWindowExpired => {
                state.last_deleted = None;
                SmallVec::new()
            },

            // ========== Search and menus ==========
            TodoListAction::SearchExpanded => {
                state.search_expanded = true;
                SmallVec::new()
            },

            TodoListAction::SearchCollapsed => {
                state.search_expanded = false;
                if state.query.is_empty() {
                    return SmallVec::new();
                }
                state.query.clear();
                smallvec![Self::requery(state, env)]
            },

            TodoListAction::MenuExpanded => {
                state.menu_expanded = true;
                SmallVec::new()
            },

            TodoListAction::MenuCollapsed => {
                state.menu_expanded = false;
                SmallVec::new()
            },

            TodoListAction::SortExpanded => {
                state.sort_expanded = true;
                SmallVec::new()
            },

            TodoListAction::SortCollapsed => {
                state.sort_expanded = false;
                SmallVec::new()
            },

            // ========== Preferences ==========
            TodoListAction::SortSelected { sort } => {
                state.sort_expanded = false;
                let forfeit = Self::forfeit_undo(state);
                let requery = if env.live() && sort != state.sort {
                    state.sort = sort;
                    Self::requery(state, env)
                } else {
                    Effect::None
                };
                smallvec![forfeit, Self::save_sort(env, sort), requery]
            },

            TodoListAction::HideCompletedToggled => {
                state.menu_expanded = false;
                let forfeit = Self::forfeit_undo(state);
                let hide_completed = !state.hide_completed;
                let requery = if env.live() {
                    state.hide_completed = hide_completed;
                    Self::requery(state, env)
                } else {
                    Effect::None
                };
                smallvec![forfeit, Self::save_hide_completed(env, hide_completed), requery]
            },

            TodoListAction::PreferencesSaved => {
                tracing::debug!("Preference persisted");
                SmallVec::new()
            },

            // ========== Bulk deletes ==========
            TodoListAction::DeleteCompletedDialogShown => {
                state.menu_expanded = false;
                state.delete_completed_dialog = true;
                smallvec![Self::post(env, TodoListSideEffect::ConfirmDeleteCompleted)]
            },

            TodoListAction::DeleteCompletedDialogDismissed => {
                state.delete_completed_dialog = false;
                SmallVec::new()
            },

            TodoListAction::DeleteCompletedConfirmed => {
                if !state.delete_completed_dialog {
                    tracing::warn!("Delete completed was not confirmed through its dialog");
                    return SmallVec::new();
                }
                state.delete_completed_dialog = false;
                let forfeit = Self::forfeit_undo(state);
                smallvec![forfeit, Self::delete_completed(env)]
            },

            TodoListAction::DeleteAllDialogShown => {
                state.menu_expanded = false;
                state.delete_all_dialog = true;
                smallvec![Self::post(env, TodoListSideEffect::ConfirmDeleteAll)]
            },

            TodoListAction::DeleteAllDialogDismissed => {
                state.delete_all_dialog = false;
                SmallVec::new()
            },

            TodoListAction::DeleteAllConfirmed => {
                if !state.delete_all_dialog {
                    tracing::warn!("Delete all was not confirmed through its dialog");
                    return SmallVec::new();
                }
                state.delete_all_dialog = false;
                let forfeit = Self::forfeit_undo(state);
                smallvec![forfeit, Self::delete_all(env)]
            },

            // ========== Failures ==========
            TodoListAction::StorageFailed { error } => {
                tracing::error!(%error, "Task list storage operation failed");
                state.last_error = Some(error.clone());
                smallvec![Self::post(env, TodoListSideEffect::StorageFailed { message: error })]
            },
        }
    }
}
