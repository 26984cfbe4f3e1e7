//! Reducer logic for the add-task form.

use super::types::{AddTodoAction, AddTodoSideEffect, AddTodoState};
use crate::input::InputError;
use std::sync::Arc;
use tasklist_core::environment::Clock;
use tasklist_core::task::Task;
use tasklist_core::todo_store::TodoStore;
use tasklist_core::{async_effect, effect::Effect, reducer::Reducer, smallvec, SmallVec};
use tasklist_runtime::side_effect::SideEffectSender;

/// Environment dependencies for the add-task reducer
#[derive(Clone)]
pub struct AddTodoEnvironment {
    /// Task persistence
    pub todos: Arc<dyn TodoStore>,
    /// Clock for creation timestamps
    pub clock: Arc<dyn Clock>,
    /// One-shot notifications for the presentation layer
    pub side_effects: SideEffectSender<AddTodoSideEffect>,
}

impl AddTodoEnvironment {
    /// Creates a new `AddTodoEnvironment`
    #[must_use]
    pub fn new(
        todos: Arc<dyn TodoStore>,
        clock: Arc<dyn Clock>,
        side_effects: SideEffectSender<AddTodoSideEffect>,
    ) -> Self {
        Self {
            todos,
            clock,
            side_effects,
        }
    }

    fn post(&self, side_effect: AddTodoSideEffect) -> Effect<AddTodoAction> {
        let side_effects = self.side_effects.clone();
        async_effect! {
            side_effects.post(side_effect);
            None
        }
    }
}

/// Reducer for the add-task form
#[derive(Clone, Debug, Default)]
pub struct AddTodoReducer;

impl AddTodoReducer {
    /// Creates a new `AddTodoReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Reducer for AddTodoReducer {
    type State = AddTodoState;
    type Action = AddTodoAction;
    type Environment = AddTodoEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            AddTodoAction::NameChanged { name } => {
                state.name = name;
                SmallVec::new()
            },

            AddTodoAction::ImportantChanged { important } => {
                state.important = important;
                SmallVec::new()
            },

            AddTodoAction::SaveRequested => {
                if state.saving {
                    tracing::debug!("Save already in flight");
                    return SmallVec::new();
                }
                if let Err(error) = InputError::check_name(&state.name) {
                    tracing::debug!(%error, "Add form rejected");
                    return smallvec![env.post(AddTodoSideEffect::InvalidInput(error))];
                }

                state.saving = true;
                let task = Task::new(state.name.clone(), state.important, env.clock.now());
                let todos = Arc::clone(&env.todos);
                smallvec![async_effect! {
                    match todos.insert(task).await {
                        Ok(id) => Some(AddTodoAction::Saved { id }),
                        Err(error) => Some(AddTodoAction::SaveFailed { error: error.to_string() }),
                    }
                }]
            },

            AddTodoAction::Saved { id } => {
                tracing::info!(%id, "Task added");
                *state = AddTodoState::new();
                smallvec![env.post(AddTodoSideEffect::TodoAdded { id })]
            },

            AddTodoAction::SaveFailed { error } => {
                tracing::error!(%error, "Adding task failed");
                state.saving = false;
                smallvec![env.post(AddTodoSideEffect::StorageFailed { message: error })]
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tasklist_core::task::TaskId;
    use tasklist_runtime::side_effect::{self, SideEffectReceiver};
    use tasklist_testing::reducer_test::run_futures;
    use tasklist_testing::{assertions, test_clock, test_time, InMemoryTodoStore, ReducerTest};

    fn env() -> (AddTodoEnvironment, InMemoryTodoStore, SideEffectReceiver<AddTodoSideEffect>) {
        let todos = InMemoryTodoStore::new();
        let (sender, receiver) = side_effect::channel();
        let env = AddTodoEnvironment::new(Arc::new(todos.clone()), Arc::new(test_clock()), sender);
        (env, todos, receiver)
    }

    fn filled(name: &str) -> AddTodoState {
        AddTodoState {
            name: name.to_string(),
            ..AddTodoState::new()
        }
    }

    #[test]
    fn fields_are_set_one_by_one() {
        let (env, _, _) = env();

        ReducerTest::new(AddTodoReducer::new())
            .with_env(env)
            .given_state(AddTodoState::new())
            .when_action(AddTodoAction::NameChanged { name: "Buy milk".into() })
            .when_action(AddTodoAction::ImportantChanged { important: true })
            .then_state(|state| {
                assert_eq!(state.name, "Buy milk");
                assert!(state.important);
                assert!(!state.saving);
            })
            .then_effects(|effects| assertions::assert_no_effects(effects))
            .run();
    }

    #[tokio::test]
    async fn blank_name_signals_invalid_input_without_insert() {
        let (env, todos, mut side_effects) = env();

        for name in ["", "   \t"] {
            let mut state = filled(name);
            let effects = AddTodoReducer::new().reduce(&mut state, AddTodoAction::SaveRequested, &env);
            assert!(run_futures(effects).await.is_empty());
            assert!(!state.saving);
            assert_eq!(
                side_effects.try_recv(),
                Some(AddTodoSideEffect::InvalidInput(InputError::EmptyName))
            );
        }
        assert!(todos.is_empty());
    }

    #[tokio::test]
    async fn save_inserts_uncompleted_task_stamped_now() {
        let (env, todos, _) = env();
        let mut state = AddTodoState {
            important: true,
            ..filled("Buy milk")
        };

        let effects = AddTodoReducer::new().reduce(&mut state, AddTodoAction::SaveRequested, &env);
        assert!(state.saving);
        let produced = run_futures(effects).await;

        let [AddTodoAction::Saved { id }] = produced.as_slice() else {
            unreachable!("expected Saved, got {produced:?}");
        };
        let stored = todos.task(*id).unwrap();
        assert_eq!(stored.name, "Buy milk");
        assert!(stored.important);
        assert!(!stored.completed);
        assert_eq!(stored.created_at, test_time());
    }

    #[test]
    fn save_while_saving_is_ignored() {
        let (env, _, _) = env();

        ReducerTest::new(AddTodoReducer::new())
            .with_env(env)
            .given_state(AddTodoState {
                saving: true,
                ..filled("Buy milk")
            })
            .when_action(AddTodoAction::SaveRequested)
            .then_effects(|effects| assertions::assert_no_effects(effects))
            .run();
    }

    #[tokio::test]
    async fn saved_resets_form_and_notifies() {
        let (env, _, mut side_effects) = env();
        let mut state = AddTodoState {
            saving: true,
            important: true,
            ..filled("Buy milk")
        };

        let effects = AddTodoReducer::new().reduce(
            &mut state,
            AddTodoAction::Saved { id: TaskId::new(3) },
            &env,
        );
        run_futures(effects).await;

        assert_eq!(state, AddTodoState::new());
        assert_eq!(
            side_effects.try_recv(),
            Some(AddTodoSideEffect::TodoAdded { id: TaskId::new(3) })
        );
    }

    #[tokio::test]
    async fn failed_insert_keeps_fields() {
        let (env, todos, mut side_effects) = env();
        todos.set_failing(true);
        let mut state = filled("Buy milk");

        let effects = AddTodoReducer::new().reduce(&mut state, AddTodoAction::SaveRequested, &env);
        let produced = run_futures(effects).await;
        let [AddTodoAction::SaveFailed { error }] = produced.as_slice() else {
            unreachable!("expected SaveFailed, got {produced:?}");
        };

        let effects = AddTodoReducer::new().reduce(
            &mut state,
            AddTodoAction::SaveFailed { error: error.clone() },
            &env,
        );
        run_futures(effects).await;

        assert_eq!(state.name, "Buy milk");
        assert!(!state.saving);
        assert!(matches!(
            side_effects.try_recv(),
            Some(AddTodoSideEffect::StorageFailed { .. })
        ));
    }
}
