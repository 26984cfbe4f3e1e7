//! Reducer logic for the edit-task form.

use super::types::{EditTodoAction, EditTodoSideEffect, EditTodoState};
use crate::input::InputError;
use std::sync::Arc;
use tasklist_core::todo_store::TodoStore;
use tasklist_core::{async_effect, effect::Effect, reducer::Reducer, smallvec, SmallVec};
use tasklist_runtime::side_effect::SideEffectSender;

/// Environment dependencies for the edit-task reducer
#[derive(Clone)]
pub struct EditTodoEnvironment {
    /// Task persistence
    pub todos: Arc<dyn TodoStore>,
    /// One-shot notifications for the presentation layer
    pub side_effects: SideEffectSender<EditTodoSideEffect>,
}

impl EditTodoEnvironment {
    /// Creates a new `EditTodoEnvironment`
    #[must_use]
    pub fn new(todos: Arc<dyn TodoStore>, side_effects: SideEffectSender<EditTodoSideEffect>) -> Self {
        Self { todos, side_effects }
    }

    fn post(&self, side_effect: EditTodoSideEffect) -> Effect<EditTodoAction> {
        let side_effects = self.side_effects.clone();
        async_effect! {
            side_effects.post(side_effect);
            None
        }
    }
}

/// Reducer for the edit-task form
#[derive(Clone, Debug, Default)]
pub struct EditTodoReducer;

impl EditTodoReducer {
    /// Creates a new `EditTodoReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Reducer for EditTodoReducer {
    type State = EditTodoState;
    type Action = EditTodoAction;
    type Environment = EditTodoEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            EditTodoAction::NameChanged { name } => {
                state.name = name;
                SmallVec::new()
            },

            EditTodoAction::ImportantChanged { important } => {
                state.important = important;
                SmallVec::new()
            },

            EditTodoAction::SaveRequested => {
                if state.saving {
                    tracing::debug!("Save already in flight");
                    return SmallVec::new();
                }
                if let Err(error) = InputError::check_name(&state.name) {
                    tracing::debug!(%error, "Edit form rejected");
                    return smallvec![env.post(EditTodoSideEffect::InvalidInput(error))];
                }

                state.saving = true;
                let task = state.edited();
                let todos = Arc::clone(&env.todos);
                smallvec![async_effect! {
                    match todos.update(task.clone()).await {
                        Ok(()) => Some(EditTodoAction::Saved { task }),
                        Err(error) => Some(EditTodoAction::SaveFailed { error: error.to_string() }),
                    }
                }]
            },

            EditTodoAction::Saved { task } => {
                tracing::info!(id = %task.id, "Task updated");
                state.saving = false;
                state.task = task.clone();
                smallvec![env.post(EditTodoSideEffect::TodoUpdated { task })]
            },

            EditTodoAction::SaveFailed { error } => {
                tracing::error!(%error, id = %state.task.id, "Updating task failed");
                state.saving = false;
                smallvec![env.post(EditTodoSideEffect::StorageFailed { message: error })]
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tasklist_core::task::{Task, TaskId};
    use tasklist_runtime::side_effect::{self, SideEffectReceiver};
    use tasklist_testing::reducer_test::run_futures;
    use tasklist_testing::{assertions, test_time, InMemoryTodoStore, ReducerTest};

    async fn setup() -> (EditTodoEnvironment, InMemoryTodoStore, SideEffectReceiver<EditTodoSideEffect>, Task) {
        let todos = InMemoryTodoStore::new();
        let id = todos.insert(Task::new("Call mom", true, test_time())).await.unwrap();
        let task = todos.task(id).unwrap();
        let (sender, receiver) = side_effect::channel();
        (EditTodoEnvironment::new(Arc::new(todos.clone()), sender), todos, receiver, task)
    }

    #[tokio::test]
    async fn unchanged_save_keeps_identity_and_created_at() {
        let (env, todos, mut side_effects, task) = setup().await;
        let mut state = EditTodoState::new(task.clone(), "%Y");

        let effects = EditTodoReducer::new().reduce(&mut state, EditTodoAction::SaveRequested, &env);
        let produced = run_futures(effects).await;
        assert_eq!(produced, vec![EditTodoAction::Saved { task: task.clone() }]);

        let effects = EditTodoReducer::new().reduce(&mut state, EditTodoAction::Saved { task: task.clone() }, &env);
        run_futures(effects).await;

        assert_eq!(todos.task(task.id), Some(task.clone()));
        assert_eq!(side_effects.try_recv(), Some(EditTodoSideEffect::TodoUpdated { task }));
        assert!(!state.saving);
    }

    #[tokio::test]
    async fn save_applies_name_and_importance() {
        let (env, todos, _, task) = setup().await;
        let mut state = EditTodoState::new(task.clone(), "%Y");
        state.name = "Call mum".to_string();
        state.important = false;

        let effects = EditTodoReducer::new().reduce(&mut state, EditTodoAction::SaveRequested, &env);
        assert!(state.saving);
        run_futures(effects).await;

        let stored = todos.task(task.id).unwrap();
        assert_eq!(stored.name, "Call mum");
        assert!(!stored.important);
        assert_eq!(stored.created_at, task.created_at);
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let (env, todos, mut side_effects, task) = setup().await;
        let mut state = EditTodoState::new(task.clone(), "%Y");
        state.name = "  ".to_string();

        let effects = EditTodoReducer::new().reduce(&mut state, EditTodoAction::SaveRequested, &env);
        run_futures(effects).await;

        assert_eq!(
            side_effects.try_recv(),
            Some(EditTodoSideEffect::InvalidInput(InputError::EmptyName))
        );
        assert_eq!(todos.task(task.id).unwrap().name, "Call mom");
    }

    #[tokio::test]
    async fn missing_task_reports_not_found() {
        let (env, _, _, task) = setup().await;
        let ghost = task.with_id(TaskId::new(99));
        let mut state = EditTodoState::new(ghost, "%Y");

        let effects = EditTodoReducer::new().reduce(&mut state, EditTodoAction::SaveRequested, &env);
        let produced = run_futures(effects).await;

        let [EditTodoAction::SaveFailed { error }] = produced.as_slice() else {
            unreachable!("expected SaveFailed, got {produced:?}");
        };
        assert!(error.contains("99"));
    }

    #[tokio::test]
    async fn save_while_saving_is_ignored() {
        let (env, _, _, task) = setup().await;
        let mut state = EditTodoState::new(task, "%Y");
        state.saving = true;

        ReducerTest::new(EditTodoReducer::new())
            .with_env(env)
            .given_state(state)
            .when_action(EditTodoAction::SaveRequested)
            .then_effects(|effects| assertions::assert_no_effects(effects))
            .run();
    }
}
