//! Task records and list queries.
//!
//! A [`Task`] is a single to-do item. Identity is assigned by the
//! [`TodoStore`](crate::todo_store::TodoStore) on insert; until then a task
//! carries [`TaskId::UNSAVED`].
//!
//! [`TaskQuery`] describes what the list screen asks the store for: a
//! free-text filter, whether completed tasks are hidden, and the sort order.
//! Embedded-database stores evaluate it in SQL; [`TaskQuery::apply`] is the
//! reference evaluation used by in-memory stores and property tests.

use crate::settings::TaskSort;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Identity of a persisted task
///
/// Identities are opaque integers handed out by the store. `0` means the task
/// has not been saved yet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(i64);

impl TaskId {
    /// Identity of a task that has not been persisted
    pub const UNSAVED: Self = Self(0);

    /// Creates a `TaskId` from its raw value
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw value
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Returns true once the store has assigned this identity
    #[must_use]
    pub const fn is_saved(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for TaskId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// A single to-do item
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Store-assigned identity (`TaskId::UNSAVED` before insert)
    pub id: TaskId,
    /// Short description shown in the list
    pub name: String,
    /// Whether the task is flagged as important
    pub important: bool,
    /// Whether the task is done
    pub completed: bool,
    /// When the task was created; never changes after insert
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Creates an unsaved, uncompleted task
    #[must_use]
    pub fn new(name: impl Into<String>, important: bool, created_at: DateTime<Utc>) -> Self {
        Self {
            id: TaskId::UNSAVED,
            name: name.into(),
            important,
            completed: false,
            created_at,
        }
    }

    /// Returns this task with the given identity
    #[must_use]
    pub fn with_id(mut self, id: TaskId) -> Self {
        self.id = id;
        self
    }

    /// Returns this task with its completion flag set
    #[must_use]
    pub fn with_completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }

    /// Returns a copy with identity reset, ready to be inserted again
    ///
    /// Re-inserting produces a fresh identity; every other field is kept.
    #[must_use]
    pub fn unsaved(&self) -> Self {
        self.clone().with_id(TaskId::UNSAVED)
    }
}

/// Parameters of a live task query
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskQuery {
    /// Case-insensitive substring the name must contain (empty matches all)
    pub text: String,
    /// Exclude completed tasks
    pub hide_completed: bool,
    /// Result ordering
    pub sort: TaskSort,
}

impl TaskQuery {
    /// Creates a query
    #[must_use]
    pub fn new(text: impl Into<String>, hide_completed: bool, sort: TaskSort) -> Self {
        Self {
            text: text.into(),
            hide_completed,
            sort,
        }
    }

    /// Returns true if `task` belongs in the result set
    ///
    /// `(!hide_completed || !task.completed) && name contains text`, where the
    /// substring test ignores ASCII case.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        if self.hide_completed && task.completed {
            return false;
        }
        if self.text.is_empty() {
            return true;
        }
        task.name
            .to_ascii_lowercase()
            .contains(&self.text.to_ascii_lowercase())
    }

    /// Orders two tasks according to `self.sort`
    ///
    /// Ties fall back to identity, i.e. insertion order.
    #[must_use]
    pub fn compare(&self, a: &Task, b: &Task) -> Ordering {
        let primary = match self.sort {
            TaskSort::NameAscending => compare_names(&a.name, &b.name),
            TaskSort::NameDescending => compare_names(&b.name, &a.name),
            TaskSort::DateAscending => a.created_at.cmp(&b.created_at),
            TaskSort::DateDescending => b.created_at.cmp(&a.created_at),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }

    /// Filters and orders `tasks`
    #[must_use]
    pub fn apply(&self, tasks: impl IntoIterator<Item = Task>) -> Vec<Task> {
        let mut matching: Vec<Task> = tasks.into_iter().filter(|t| self.matches(t)).collect();
        matching.sort_by(|a, b| self.compare(a, b));
        matching
    }
}

// Mirrors SQLite's NOCASE collation, which folds ASCII only.
fn compare_names(a: &str, b: &str) -> Ordering {
    a.bytes()
        .map(|c| c.to_ascii_lowercase())
        .cmp(b.bytes().map(|c| c.to_ascii_lowercase()))
}
