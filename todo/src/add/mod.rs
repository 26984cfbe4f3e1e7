//! Add-task form.

mod controller;
mod reducer;
mod types;

pub use controller::AddTodoController;
pub use reducer::{AddTodoEnvironment, AddTodoReducer};
pub use types::{AddTodoAction, AddTodoSideEffect, AddTodoState};
