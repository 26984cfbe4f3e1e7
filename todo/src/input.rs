//! Form input validation shared by the add and edit screens.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a form could not be saved
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputError {
    /// The name is empty or whitespace-only
    #[error("Task name cannot be empty")]
    EmptyName,
}

impl InputError {
    /// Checks a task name as typed into a form
    ///
    /// # Errors
    ///
    /// Returns [`InputError::EmptyName`] for an empty or whitespace-only name.
    pub fn check_name(name: &str) -> Result<(), Self> {
        if name.trim().is_empty() {
            return Err(Self::EmptyName);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_names_fail() {
        assert_eq!(InputError::check_name(""), Err(InputError::EmptyName));
        assert_eq!(InputError::check_name(" \n\t"), Err(InputError::EmptyName));
        assert_eq!(InputError::check_name(" milk "), Ok(()));
    }
}
