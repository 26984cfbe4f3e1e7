//! State, actions and side effects of the edit-task form.

use crate::input::InputError;
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use tasklist_core::task::Task;
use tasklist_macros::Action;

/// Renders `created_at` in local time with a `strftime` format
///
/// Falls back to RFC 3339 when the format cannot be rendered.
#[must_use]
pub fn format_timestamp(created_at: DateTime<Utc>, format: &str) -> String {
    let mut rendered = String::new();
    if write!(rendered, "{}", created_at.with_timezone(&Local).format(format)).is_err() {
        tracing::warn!(format, "Unrenderable timestamp format");
        return created_at.to_rfc3339();
    }
    rendered
}

/// Fields of the edit-task form
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditTodoState {
    /// The task being edited, as last saved
    pub task: Task,
    /// Name as typed
    pub name: String,
    /// Importance flag
    pub important: bool,
    /// Creation time, formatted for display
    pub timestamp: String,
    /// An update is in flight
    pub saving: bool,
}

impl EditTodoState {
    /// Opens the form on an existing task
    #[must_use]
    pub fn new(task: Task, timestamp_format: &str) -> Self {
        Self {
            name: task.name.clone(),
            important: task.important,
            timestamp: format_timestamp(task.created_at, timestamp_format),
            saving: false,
            task,
        }
    }

    /// The task as it would be saved
    #[must_use]
    pub fn edited(&self) -> Task {
        Task {
            name: self.name.clone(),
            important: self.important,
            ..self.task.clone()
        }
    }
}

/// Inputs of the edit-task reducer
#[derive(Action, Clone, Debug, PartialEq, Eq)]
pub enum EditTodoAction {
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

    /// The task was updated
    #[feedback]
    Saved {
        /// The task as stored
        task: Task,
    },

    /// The update failed
    #[feedback]
    SaveFailed {
        /// Store error message
        error: String,
    },
}

/// One-shot notifications for the edit-task form
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditTodoSideEffect {
    /// The form cannot be saved as filled in
    InvalidInput(InputError),
    /// The task was updated; the form can close
    TodoUpdated {
        /// The task as stored
        task: Task,
    },
    /// The store rejected the update
    StorageFailed {
        /// Human-readable message
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tasklist_core::task::TaskId;

    fn task() -> Task {
        let created_at = Utc
            .with_ymd_and_hms(2025, 6, 15, 12, 0, 0)
            .single()
            .unwrap_or_default();
        Task::new("Call mom", true, created_at).with_id(TaskId::new(4))
    }

    #[test]
    fn form_starts_from_task() {
        let state = EditTodoState::new(task(), "%Y");

        assert_eq!(state.name, "Call mom");
        assert!(state.important);
        assert_eq!(state.timestamp, "2025");
        assert_eq!(state.edited(), task());
    }

    #[test]
    fn edited_keeps_identity_and_dates() {
        let mut state = EditTodoState::new(task().with_completed(true), "%Y");
        state.name = "Call mum".to_string();
        state.important = false;

        let edited = state.edited();
        assert_eq!(edited.id, TaskId::new(4));
        assert_eq!(edited.name, "Call mum");
        assert!(!edited.important);
        assert!(edited.completed);
        assert_eq!(edited.created_at, task().created_at);
    }

    #[test]
    fn broken_format_falls_back_to_rfc3339() {
        let created_at = task().created_at;

        assert_eq!(format_timestamp(created_at, "%Q"), created_at.to_rfc3339());
    }
}
