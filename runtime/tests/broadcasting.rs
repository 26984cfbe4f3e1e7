//! Integration tests for Store action broadcasting
//!
//! Observers see every effect-produced action after the reducer handled it,
//! which is what controllers rely on to wait for a save to land.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use std::time::Duration;
use tasklist_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
use tasklist_runtime::{Store, StoreConfig, StoreError};
use tokio::sync::broadcast::error::TryRecvError;

// ============================================================================
// Test Fixtures
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum TestAction {
    /// Save a named item (takes a few milliseconds)
    Save { name: String },
    /// Save finished
    Saved { name: String, total: u32 },
    /// Save rejected
    SaveFailed { name: String },
    /// Simple increment command
    Increment,
    /// Incremented feedback
    Incremented { value: u32 },
}

#[derive(Debug, Clone, Default)]
struct TestState {
    counter: u32,
    saved: Vec<String>,
}

#[derive(Clone)]
struct TestEnvironment;

#[derive(Clone)]
struct TestReducer;

impl Reducer for TestReducer {
    type State = TestState;
    type Action = TestAction;
    type Environment = TestEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            TestAction::Save { name } => {
                let total = u32::try_from(state.saved.len()).unwrap_or(u32::MAX) + 1;
                smallvec![Effect::Future(Box::pin(async move {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    if name.trim().is_empty() {
                        Some(TestAction::SaveFailed { name })
                    } else {
                        Some(TestAction::Saved { name, total })
                    }
                }))]
            },
            TestAction::Saved { name, .. } => {
                state.saved.push(name);
                smallvec![Effect::None]
            },
            TestAction::SaveFailed { .. } | TestAction::Incremented { .. } => {
                smallvec![Effect::None]
            },
            TestAction::Increment => {
                state.counter += 1;
                let value = state.counter;
                smallvec![Effect::Future(Box::pin(async move {
                    Some(TestAction::Incremented { value })
                }))]
            },
        }
    }
}

fn store() -> Store<TestState, TestAction, TestEnvironment, TestReducer> {
    Store::new(TestState::default(), TestReducer, TestEnvironment)
}

fn count_available(rx: &mut tokio::sync::broadcast::Receiver<TestAction>) -> usize {
    let mut count = 0;
    loop {
        match rx.try_recv() {
            Ok(_) => count += 1,
            Err(TryRecvError::Lagged(_)) => {},
            Err(TryRecvError::Empty | TryRecvError::Closed) => return count,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn send_and_wait_for_returns_matching_feedback() {
    let store = store();

    let result = store
        .send_and_wait_for(
            TestAction::Save {
                name: "Buy milk".to_string(),
            },
            |action| matches!(action, TestAction::Saved { .. } | TestAction::SaveFailed { .. }),
            Duration::from_secs(1),
        )
        .await
        .unwrap();

    assert_eq!(
        result,
        TestAction::Saved {
            name: "Buy milk".to_string(),
            total: 1
        }
    );
}

#[tokio::test]
async fn observed_action_is_already_reduced() {
    let store = store();

    store
        .send_and_wait_for(
            TestAction::Save {
                name: "Walk the dog".to_string(),
            },
            |action| matches!(action, TestAction::Saved { .. }),
            Duration::from_secs(1),
        )
        .await
        .unwrap();

    let saved = store.state(|s| s.saved.clone()).await;
    assert_eq!(saved, vec!["Walk the dog".to_string()]);
}

#[tokio::test]
async fn send_and_wait_for_times_out() {
    let store = store();

    let result = store
        .send_and_wait_for(
            TestAction::Save {
                name: "   ".to_string(),
            },
            |action| matches!(action, TestAction::Saved { .. }),
            Duration::from_millis(50),
        )
        .await;

    assert!(matches!(result, Err(StoreError::Timeout)));
}

#[tokio::test]
async fn concurrent_waiters_get_their_own_result() {
    let store = store();

    let mut handles = vec![];
    for name in ["a", "b", "c"] {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store
                .send_and_wait_for(
                    TestAction::Save {
                        name: name.to_string(),
                    },
                    move |action| matches!(action, TestAction::Saved { name: saved, .. } if saved == name),
                    Duration::from_secs(2),
                )
                .await
        }));
    }

    for handle in handles {
        let result = handle.await.expect("Task panicked");
        assert!(result.is_ok());
    }

    let mut saved = store.state(|s| s.saved.clone()).await;
    saved.sort();
    assert_eq!(saved, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn every_subscriber_sees_every_action() {
    let store = store();
    let mut rx1 = store.subscribe_actions();
    let mut rx2 = store.subscribe_actions();

    let mut first = store.send(TestAction::Increment).await.unwrap();
    let mut second = store.send(TestAction::Increment).await.unwrap();
    first.wait().await;
    second.wait().await;
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(count_available(&mut rx1), 2);
    assert_eq!(count_available(&mut rx2), 2);
}

#[tokio::test]
async fn lagging_subscriber_does_not_block_store() {
    let config = StoreConfig::default().with_broadcast_capacity(4);
    let store = Store::with_config(TestState::default(), TestReducer, TestEnvironment, config);
    let mut rx = store.subscribe_actions();

    for _ in 0..20 {
        store.send(TestAction::Increment).await.ok();
    }
    tokio::time::sleep(Duration::from_millis(100)).await;

    let received = count_available(&mut rx);
    assert!(received > 0);
    assert!(received < 20);
    assert_eq!(store.state(|s| s.counter).await, 20);
}
