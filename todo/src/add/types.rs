//! State, actions and side effects of the add-task form.

use crate::input::InputError;
use serde::{Deserialize, Serialize};
use tasklist_core::task::TaskId;
use tasklist_macros::Action;

/// Fields of the add-task form
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddTodoState {
    /// Name as typed
    pub name: String,
    /// Importance flag
    pub important: bool,
    /// An insert is in flight
    pub saving: bool,
}

impl AddTodoState {
    /// Creates an empty form
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Inputs of the add-task reducer
#[derive(Action, Clone, Debug, PartialEq, Eq)]
pub enum AddTodoAction {
    /// Name field edited
    #[intent]
    NameChanged {
        /// New text
        name: String,
    },

    /// Importance checkbox toggled
    #[intent]
    ImportantChanged {
        /// New value
        important: bool,
    },

    /// Save button pressed
    #[intent]
    SaveRequested,

    /// The task was inserted
    #[feedback]
    Saved {
        /// Identity assigned by the store
        id: TaskId,
    },

    /// The insert failed
    #[feedback]
    SaveFailed {
        /// Store error message
        error: String,
    },
}

/// One-shot notifications for the add-task form
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddTodoSideEffect {
    /// The form cannot be saved as filled in
    InvalidInput(InputError),
    /// The task was added; the form can close
    TodoAdded {
        /// Identity of the new task
        id: TaskId,
    },
    /// The store rejected the insert
    StorageFailed {
        /// Human-readable message
        message: String,
    },
}
