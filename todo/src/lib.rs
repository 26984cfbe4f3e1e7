//! Todo list controllers and application wiring.
//!
//! Three screens, each a reducer driven by a runtime `Store`:
//!
//! - [`list`]: the task list with live query, search, sort and hide-completed
//!   menus, delete with a timed undo, and confirmed bulk deletes
//! - [`add`]: the add-task form
//! - [`edit`]: the edit-task form
//!
//! Controllers talk to storage only through the
//! [`TodoStore`](tasklist_core::todo_store::TodoStore) and
//! [`SettingsStore`](tasklist_core::settings::SettingsStore) traits, passed
//! in explicitly.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tasklist::{AddTodoController, TodoListController, TodoListOptions};
//! use tasklist_core::environment::SystemClock;
//! use tasklist_sqlite::SqliteDatabase;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = SqliteDatabase::in_memory().await?;
//! let todos = Arc::new(db.todo_store());
//! let settings = Arc::new(db.settings_store());
//!
//! let add = AddTodoController::new(todos.clone(), Arc::new(SystemClock));
//! add.name_changed("Buy milk").await?;
//! add.save_and_wait(Duration::from_secs(1)).await?;
//!
//! let list = TodoListController::new(todos, settings, TodoListOptions::default());
//! let state = list.activate_and_wait(Duration::from_secs(1)).await?;
//! assert_eq!(state.todos.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod add;
pub mod config;
pub mod edit;
pub mod input;
pub mod list;

// Re-export commonly used types
pub use add::{AddTodoController, AddTodoSideEffect, AddTodoState};
pub use config::Config;
pub use edit::{EditTodoController, EditTodoSideEffect, EditTodoState};
pub use input::InputError;
pub use list::{
    PreferenceRefresh, TodoListController, TodoListOptions, TodoListSideEffect, TodoListState,
};
