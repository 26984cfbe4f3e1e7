//! Persisted display preferences.
//!
//! Three scalar preferences survive restarts: the list sort order, whether
//! completed tasks are hidden, and the UI language. They are stored one key
//! per field so updating one never clobbers another.
//!
//! | Key             | Value                                   | Default        |
//! |-----------------|-----------------------------------------|----------------|
//! | `taskSort`      | [`TaskSort::as_str`]                    | `BY_DATE_ASC`  |
//! | `hideCompleted` | `true` / `false`                        | `false`        |
//! | `language`      | locale code, `def` for the system locale | `def`          |

use futures::Stream;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use thiserror::Error;

/// Storage key for the sort order
pub const SORT_KEY: &str = "taskSort";

/// Storage key for the hide-completed flag
pub const HIDE_COMPLETED_KEY: &str = "hideCompleted";

/// Storage key for the language code
pub const LANGUAGE_KEY: &str = "language";

/// Errors from the settings store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    /// The underlying storage could not be read or written
    #[error("Settings storage error: {0}")]
    Storage(String),
}

/// Error returned when a persisted sort name is not recognized
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown sort order: {0}")]
pub struct ParseTaskSortError(String);

/// Order of the task list
///
/// Two dimensions (name, creation date) times two directions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskSort {
    /// Name, A to Z
    NameAscending,
    /// Name, Z to A
    NameDescending,
    /// Creation date, oldest first
    #[default]
    DateAscending,
    /// Creation date, newest first
    DateDescending,
}

impl TaskSort {
    /// Every sort order, in menu order
    pub const ALL: [Self; 4] = [
        Self::NameAscending,
        Self::NameDescending,
        Self::DateAscending,
        Self::DateDescending,
    ];

    /// Name persisted under [`SORT_KEY`]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NameAscending => "BY_NAME_ASC",
            Self::NameDescending => "BY_NAME_DESC",
            Self::DateAscending => "BY_DATE_ASC",
            Self::DateDescending => "BY_DATE_DESC",
        }
    }
}

impl fmt::Display for TaskSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskSort {
    type Err = ParseTaskSortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BY_NAME_ASC" | "BY_NAME" => Ok(Self::NameAscending),
            "BY_NAME_DESC" => Ok(Self::NameDescending),
            "BY_DATE_ASC" | "BY_DATE" => Ok(Self::DateAscending),
            "BY_DATE_DESC" => Ok(Self::DateDescending),
            other => Err(ParseTaskSortError(other.to_string())),
        }
    }
}

/// UI language preference
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    /// Follow the device locale
    #[default]
    System,
    /// Explicit locale code such as `en` or `tr`
    Locale(String),
}

impl Language {
    /// Persisted sentinel for [`Language::System`]
    pub const SYSTEM_CODE: &'static str = "def";

    /// Parses a persisted value; empty and `def` mean the system locale
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "" | Self::SYSTEM_CODE => Self::System,
            other => Self::Locale(other.to_string()),
        }
    }

    /// Value persisted under [`LANGUAGE_KEY`]
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::System => Self::SYSTEM_CODE,
            Self::Locale(code) => code,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Snapshot of all preferences
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    /// List order
    pub sort: TaskSort,
    /// Hide completed tasks from the list
    pub hide_completed: bool,
    /// UI language
    pub language: Language,
}

impl Preferences {
    /// Builds preferences from raw stored values, defaulting missing or
    /// unreadable ones
    #[must_use]
    pub fn from_stored(sort: Option<&str>, hide_completed: Option<&str>, language: Option<&str>) -> Self {
        let sort = match sort.map(str::parse::<TaskSort>) {
            Some(Ok(sort)) => sort,
            Some(Err(error)) => {
                tracing::warn!(%error, "Ignoring stored sort order");
                TaskSort::default()
            },
            None => TaskSort::default(),
        };
        let hide_completed = hide_completed
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(false);
        let language = language.map(Language::from_code).unwrap_or_default();

        Self {
            sort,
            hide_completed,
            language,
        }
    }
}

/// Live stream of preference snapshots
pub type PreferencesStream = Pin<Box<dyn Stream<Item = Preferences> + Send>>;

/// Key-value store for [`Preferences`]
///
/// # Dyn Compatibility
///
/// Methods return `Pin<Box<dyn Future>>` so the store can be shared as
/// `Arc<dyn SettingsStore>` and captured by effects.
pub trait SettingsStore: Send + Sync {
    /// Stream of preferences: the current value first, then one per change
    ///
    /// Read failures are not surfaced; the stream yields defaults instead.
    fn observe(&self) -> PreferencesStream;

    /// The current preferences
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Storage`] if the storage cannot be read.
    fn current(&self) -> Pin<Box<dyn Future<Output = Result<Preferences, SettingsError>> + Send + '_>>;

    /// Persist the sort order
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Storage`] if the write fails.
    fn update_sort(&self, sort: TaskSort) -> Pin<Box<dyn Future<Output = Result<(), SettingsError>> + Send + '_>>;

    /// Persist the hide-completed flag
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Storage`] if the write fails.
    fn update_hide_completed(
        &self,
        hide_completed: bool,
    ) -> Pin<Box<dyn Future<Output = Result<(), SettingsError>> + Send + '_>>;

    /// Persist the language
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Storage`] if the write fails.
    fn update_language(
        &self,
        language: Language,
    ) -> Pin<Box<dyn Future<Output = Result<(), SettingsError>> + Send + '_>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_names_round_trip() {
        for sort in TaskSort::ALL {
            assert_eq!(sort.as_str().parse::<TaskSort>(), Ok(sort));
        }
    }

    #[test]
    fn legacy_sort_names_parse() {
        assert_eq!("BY_DATE".parse::<TaskSort>(), Ok(TaskSort::DateAscending));
        assert_eq!("BY_NAME".parse::<TaskSort>(), Ok(TaskSort::NameAscending));
        assert!("BY_COLOR".parse::<TaskSort>().is_err());
    }

    #[test]
    fn language_sentinel() {
        assert_eq!(Language::from_code("def"), Language::System);
        assert_eq!(Language::from_code(""), Language::System);
        assert_eq!(Language::from_code("tr"), Language::Locale("tr".to_string()));
        assert_eq!(Language::System.code(), "def");
    }

    #[test]
    fn missing_values_default() {
        let preferences = Preferences::from_stored(None, None, None);

        assert_eq!(preferences, Preferences::default());
        assert_eq!(preferences.sort, TaskSort::DateAscending);
        assert!(!preferences.hide_completed);
        assert_eq!(preferences.language, Language::System);
    }

    #[test]
    fn unreadable_values_default() {
        let preferences = Preferences::from_stored(Some("SIDEWAYS"), Some("maybe"), Some("en"));

        assert_eq!(preferences.sort, TaskSort::DateAscending);
        assert!(!preferences.hide_completed);
        assert_eq!(preferences.language, Language::Locale("en".to_string()));
    }
}
