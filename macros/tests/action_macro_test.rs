//! Tests for #[derive(Action)] macro

use tasklist_core::task::TaskId;
use tasklist_macros::Action;

#[derive(Action, Clone, Debug, PartialEq)]
enum EditAction {
    #[intent]
    NameChanged {
        name: String,
    },

    #[intent]
    SaveRequested,

    #[feedback]
    Saved(TaskId),

    #[feedback]
    SaveFailed {
        error: String,
    },

    Unmarked,
}

#[test]
fn test_is_intent() {
    let action = EditAction::NameChanged {
        name: "Buy milk".to_string(),
    };
    assert!(action.is_intent());
    assert!(!action.is_feedback());
    assert!(EditAction::SaveRequested.is_intent());
}

#[test]
fn test_is_feedback() {
    let action = EditAction::Saved(TaskId::new(1));
    assert!(action.is_feedback());
    assert!(!action.is_intent());

    let action = EditAction::SaveFailed {
        error: "disk full".to_string(),
    };
    assert!(action.is_feedback());
}

#[test]
fn test_unmarked_variant_is_neither() {
    assert!(!EditAction::Unmarked.is_intent());
    assert!(!EditAction::Unmarked.is_feedback());
}

#[test]
fn test_name() {
    assert_eq!(EditAction::SaveRequested.name(), "SaveRequested");
    assert_eq!(EditAction::Saved(TaskId::new(3)).name(), "Saved");
    assert_eq!(
        EditAction::NameChanged {
            name: String::new()
        }
        .name(),
        "NameChanged"
    );
}
