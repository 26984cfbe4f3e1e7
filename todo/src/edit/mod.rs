//! Edit-task form.

mod controller;
mod reducer;
mod types;

pub use controller::EditTodoController;
pub use reducer::{EditTodoEnvironment, EditTodoReducer};
pub use types::{format_timestamp, EditTodoAction, EditTodoSideEffect, EditTodoState};
