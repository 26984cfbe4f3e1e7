//! Task list screen: live query, search, menus, delete with undo.

mod controller;
mod reducer;
mod types;

pub use controller::TodoListController;
pub use reducer::{TodoListEnvironment, TodoListReducer};
pub use types::{
    ParsePreferenceRefreshError, PreferenceRefresh, TodoListAction, TodoListOptions,
    TodoListSideEffect, TodoListState, TODOS_QUERY, UNDO_WINDOW,
};
