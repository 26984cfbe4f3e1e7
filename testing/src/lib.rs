//! # Tasklist Testing
//!
//! Testing utilities and helpers for tasklist controllers.
//!
//! This crate provides:
//! - A fixed [`Clock`] for deterministic timestamps
//! - [`ReducerTest`], a Given-When-Then harness for reducers
//! - In-memory [`TodoStore`](tasklist_core::todo_store::TodoStore) and
//!   [`SettingsStore`](tasklist_core::settings::SettingsStore) with failure injection
//! - Async helpers for waiting on broadcast actions and eventual conditions
//!
//! ## Example
//!
//! ```ignore
//! use tasklist_testing::{test_clock, InMemoryTodoStore};
//!
//! #[tokio::test]
//! async fn adds_a_task() {
//!     let todos = InMemoryTodoStore::new();
//!     let controller = AddTodoController::new(env_with(todos.clone(), test_clock()));
//!
//!     controller.name_changed("Buy milk").await?;
//!     controller.save().await?;
//!
//!     assert_eq!(todos.len(), 1);
//! }
//! ```

use chrono::{DateTime, Utc};
use tasklist_core::environment::Clock;


/// In-memory store implementations
pub mod stores;

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use chrono::TimeZone;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use tasklist_testing::mocks::FixedClock;
    /// use tasklist_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Instant returned by [`test_clock`]: 2025-06-15 12:00:00 UTC
    #[must_use]
    pub fn test_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0)
            .single()
            .unwrap_or_default()
    }

    /// Create a default fixed clock for tests (see [`test_time`])
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(test_time())
    }
}

/// Test helpers and utilities
pub mod helpers {
    use std::future::Future;
    use std::time::Duration;
    use tokio::sync::broadcast;

    /// Install a `tracing` subscriber that writes through the test harness
    ///
    /// Safe to call from every test; only the first call installs it.
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
            )
            .with_test_writer()
            .try_init();
    }

    /// Wait for the first broadcast action matching `predicate`
    ///
    /// Returns `None` on timeout or when the channel closes. Lagged
    /// receivers skip ahead and keep waiting.
    pub async fn wait_for<A, F>(
        rx: &mut broadcast::Receiver<A>,
        predicate: F,
        timeout: Duration,
    ) -> Option<A>
    where
        A: Clone,
        F: Fn(&A) -> bool,
    {
        tokio::time::timeout(timeout, async {
            loop {
                match rx.recv().await {
                    Ok(action) if predicate(&action) => return Some(action),
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {},
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        })
        .await
        .ok()
        .flatten()
    }

    /// Poll `condition` every few milliseconds until it holds or `timeout` elapses
    ///
    /// Returns whether the condition was met.
    pub async fn eventually<F, Fut>(timeout: Duration, mut condition: F) -> bool
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if condition().await {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

/// Property-based testing utilities
///
/// Strategies for domain types.
pub mod properties {
    use chrono::{Duration, TimeZone, Utc};
    use proptest::prelude::*;
    use tasklist_core::settings::TaskSort;
    use tasklist_core::task::Task;

    /// Any of the four sort orders
    pub fn any_sort() -> impl Strategy<Value = TaskSort> {
        proptest::sample::select(TaskSort::ALL.to_vec())
    }

    /// Task names drawn from a small alphabet so filters hit often
    pub fn task_name() -> impl Strategy<Value = String> {
        "[a-cA-C][a-cA-C ]{0,7}"
    }

    /// Unsaved tasks with creation times within one hour
    pub fn unsaved_task() -> impl Strategy<Value = Task> {
        (task_name(), any::<bool>(), any::<bool>(), 0i64..3600).prop_map(
            |(name, important, completed, seconds)| {
                let base = Utc
                    .with_ymd_and_hms(2025, 6, 15, 12, 0, 0)
                    .single()
                    .unwrap_or_default();
                Task::new(name, important, base + Duration::seconds(seconds))
                    .with_completed(completed)
            },
        )
    }
}

// Re-export commonly used items
pub use mocks::{test_clock, test_time, FixedClock};
pub use reducer_test::{assertions, ReducerTest};
pub use stores::{InMemorySettingsStore, InMemoryTodoStore};

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
        assert_eq!(time1, test_time());
    }

    #[tokio::test]
    async fn wait_for_skips_unmatched() {
        let (tx, mut rx) = tokio::sync::broadcast::channel(8);
        tx.send(1).ok();
        tx.send(2).ok();

        let found = helpers::wait_for(&mut rx, |n| *n == 2, Duration::from_millis(50)).await;
        assert_eq!(found, Some(2));

        let missing = helpers::wait_for(&mut rx, |n| *n == 3, Duration::from_millis(20)).await;
        assert_eq!(missing, None);
    }

    #[tokio::test]
    async fn eventually_gives_up() {
        let met = helpers::eventually(Duration::from_millis(20), || async { false }).await;
        assert!(!met);
    }
}
