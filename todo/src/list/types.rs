//! State, actions and side effects of the task list screen.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tasklist_core::effect::EffectId;
use tasklist_core::settings::{Preferences, TaskSort};
use tasklist_core::task::{Task, TaskId, TaskQuery};
use tasklist_macros::Action;
use thiserror::Error;

/// Live query of the visible tasks
pub const TODOS_QUERY: EffectId = EffectId::new("todo-list/query");

/// Timer that ends the undo offer
pub const UNDO_WINDOW: EffectId = EffectId::new("todo-list/undo-window");

/// When a change of sort order or hide-completed reaches the open list
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreferenceRefresh {
    /// Re-query as soon as the preference changes
    #[default]
    Live,
    /// Persist only; the open list keeps the values read on activation
    Frozen,
}

/// Error returned when parsing an unknown refresh policy
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown preference refresh policy: {0} (expected `live` or `frozen`)")]
pub struct ParsePreferenceRefreshError(String);

impl FromStr for PreferenceRefresh {
    type Err = ParsePreferenceRefreshError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "live" => Ok(Self::Live),
            "frozen" => Ok(Self::Frozen),
            _ => Err(ParsePreferenceRefreshError(s.to_string())),
        }
    }
}

impl fmt::Display for PreferenceRefresh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Live => "live",
            Self::Frozen => "frozen",
        })
    }
}

/// Tunables of the list controller
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TodoListOptions {
    /// How long a deleted task can be restored
    pub undo_window: Duration,
    /// See [`PreferenceRefresh`]
    pub preference_refresh: PreferenceRefresh,
}

impl Default for TodoListOptions {
    fn default() -> Self {
        Self {
            undo_window: Duration::from_secs(4),
            preference_refresh: PreferenceRefresh::Live,
        }
    }
}

/// What the task list screen shows
///
/// `todos` is replaced wholesale by every live-query snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoListState {
    /// Search text
    pub query: String,
    /// Tasks matching the current query, in display order
    pub todos: Vec<Task>,
    /// Search field open
    pub search_expanded: bool,
    /// Overflow menu open
    pub menu_expanded: bool,
    /// Sort menu open
    pub sort_expanded: bool,
    /// Completed tasks hidden (as used by the open query)
    pub hide_completed: bool,
    /// "Delete completed?" confirmation showing
    pub delete_completed_dialog: bool,
    /// "Delete all?" confirmation showing
    pub delete_all_dialog: bool,
    /// Sort order used by the open query
    pub sort: TaskSort,
    /// Generation of the open query; older results are dropped
    pub generation: u64,
    /// Task of the most recent delete intent, restorable until the undo window closes
    pub last_deleted: Option<Task>,
    /// Last storage failure, cleared by the next good snapshot
    pub last_error: Option<String>,
    /// Between `Activate` and `Deactivate`
    pub active: bool,
    /// Preferences were read and the query is open
    pub preferences_loaded: bool,
}

impl TodoListState {
    /// Creates an inactive, empty list
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The query the list is (or would be) subscribed to
    #[must_use]
    pub fn current_query(&self) -> TaskQuery {
        TaskQuery::new(self.query.clone(), self.hide_completed, self.sort)
    }

    /// True while a deleted task can be restored
    #[must_use]
    pub const fn can_undo(&self) -> bool {
        self.last_deleted.is_some()
    }

    /// Number of visible completed tasks
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.todos.iter().filter(|t| t.completed).count()
    }
}

/// Inputs of the list reducer
#[derive(Action, Clone, Debug, PartialEq)]
pub enum TodoListAction {
    // ========== Intents ==========
    /// The screen became visible: read preferences, then open the query
    #[intent]
    Activate,

    /// The screen went away: close the query, forget the undo slot
    #[intent]
    Deactivate,

    /// Search text edited
    #[intent]
    QueryChanged {
        /// New search text
        query: String,
    },

    /// Checkbox toggled on a task
    #[intent]
    TaskChecked {
        /// Task as displayed
        task: Task,
        /// New completion state
        completed: bool,
    },

    /// Task swiped away
    #[intent]
    DeleteTask {
        /// Task as displayed
        task: Task,
    },

    /// Restore the most recently deleted task
    #[intent]
    UndoDelete,

    /// Search field opened
    #[intent]
    SearchExpanded,

    /// Search field closed; clears the search text
    #[intent]
    SearchCollapsed,

    /// Overflow menu opened
    #[intent]
    MenuExpanded,

    /// Overflow menu closed
    #[intent]
    MenuCollapsed,

    /// Sort menu opened
    #[intent]
    SortExpanded,

    /// Sort menu closed
    #[intent]
    SortCollapsed,

    /// Sort order picked from the sort menu
    #[intent]
    SortSelected {
        /// Chosen order
        sort: TaskSort,
    },

    /// "Hide completed" menu entry
    #[intent]
    HideCompletedToggled,

    /// "Delete completed" menu entry
    #[intent]
    DeleteCompletedDialogShown,

    /// "Delete completed?" cancelled
    #[intent]
    DeleteCompletedDialogDismissed,

    /// "Delete completed?" confirmed
    #[intent]
    DeleteCompletedConfirmed,

    /// "Delete all" menu entry
    #[intent]
    DeleteAllDialogShown,

    /// "Delete all?" cancelled
    #[intent]
    DeleteAllDialogDismissed,

    /// "Delete all?" confirmed
    #[intent]
    DeleteAllConfirmed,

    // ========== Feedback ==========
    /// Preferences read on activation (defaults if unreadable)
    #[feedback]
    PreferencesLoaded {
        /// Stored preferences
        preferences: Preferences,
    },

    /// Snapshot from the live query
    #[feedback]
    TodosLoaded {
        /// Query generation that produced it
        generation: u64,
        /// Matching tasks in display order
        todos: Vec<Task>,
    },

    /// The live query could not read the store
    #[feedback]
    QueryFailed {
        /// Query generation that failed
        generation: u64,
        /// Store error message
        error: String,
    },

    /// A task delete was committed
    #[feedback]
    TaskDeleted {
        /// The deleted task
        task: Task,
    },

    /// Deleting a task failed; it is still stored
    #[feedback]
    DeleteFailed {
        /// The task that was not deleted
        task: Task,
        /// Store error message
        error: String,
    },

    /// An undone task was re-inserted
    #[feedback]
    TaskRestored {
        /// Its new identity
        id: TaskId,
    },

    /// The undo offer ran out
    #[feedback]
    UndoWindowExpired,

    /// A preference write was committed
    #[feedback]
    PreferencesSaved,

    /// A store operation failed
    #[feedback]
    StorageFailed {
        /// Store error message
        error: String,
    },
}

/// One-shot notifications for the list screen
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TodoListSideEffect {
    /// Offer to undo the delete for `undo_window`
    TaskDeleted {
        /// The deleted task
        task: Task,
        /// How long the offer stands
        undo_window: Duration,
    },
    /// Ask the user to confirm deleting completed tasks
    ConfirmDeleteCompleted,
    /// Ask the user to confirm deleting every task
    ConfirmDeleteAll,
    /// Show a storage error
    StorageFailed {
        /// Human-readable message
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_policy_parses_case_insensitively() {
        assert_eq!("live".parse(), Ok(PreferenceRefresh::Live));
        assert_eq!("FROZEN".parse(), Ok(PreferenceRefresh::Frozen));
        assert!("sometimes".parse::<PreferenceRefresh>().is_err());
        assert_eq!(PreferenceRefresh::Frozen.to_string(), "frozen");
    }

    #[test]
    fn intents_and_feedback_are_classified() {
        assert!(TodoListAction::Activate.is_intent());
        assert!(TodoListAction::UndoWindowExpired.is_feedback());
        assert_eq!(TodoListAction::SearchCollapsed.name(), "SearchCollapsed");
    }

    #[test]
    fn current_query_reflects_state() {
        let state = TodoListState {
            query: "milk".to_string(),
            hide_completed: true,
            sort: TaskSort::NameDescending,
            ..TodoListState::new()
        };

        assert_eq!(
            state.current_query(),
            TaskQuery::new("milk", true, TaskSort::NameDescending)
        );
        assert!(!state.can_undo());
    }
}
