//! # Tasklist Runtime
//!
//! Runtime implementation for tasklist controllers.
//!
//! This crate provides the Store runtime that coordinates reducer execution
//! and effect handling, plus the one-shot side-effect channel controllers
//! use to notify the presentation layer.
//!
//! ## Core Components
//!
//! - **Store**: The runtime that manages state and executes effects
//! - **Effect Executor**: Executes effect descriptions and feeds actions back to reducers
//! - **Cancellation**: Effects started under an [`EffectId`] can be replaced or aborted
//! - **Side effects**: [`side_effect::channel`] for notifications such as "offer undo"
//! - **Serial queue**: [`serial::SerialQueue`] keeps store writes in issue order
//!
//! ## Example
//!
//! ```ignore
//! use tasklist_runtime::Store;
//!
//! let store = Store::new(
//!     TodoListState::default(),
//!     TodoListReducer::new(),
//!     environment,
//! );
//!
//! // Send an action
//! store.send(TodoListAction::Activate).await?;
//!
//! // Read state
//! let todos = store.state(|s| s.todos.clone()).await;
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tasklist_core::effect::{Effect, EffectId};
use tasklist_core::reducer::Reducer;
use tokio::sync::{watch, RwLock};
use tokio::task::AbortHandle;

pub use error::StoreError;

/// Effect work that must finish in the order it was issued
pub mod serial;

/// One-shot notifications from controllers to the presentation layer
pub mod side_effect;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug)]
    pub enum StoreError {
        /// An effect execution failed
        ///
        /// This error is logged but does not halt the store.
        /// Effects are fire-and-forget operations.
        #[error("Effect execution failed: {0}")]
        EffectFailed(String),

        /// A spawned effect task panicked or was aborted
        #[error("Effect task failed: {0}")]
        TaskJoinError(#[from] tokio::task::JoinError),

        /// Store is shutting down and not accepting new actions
        ///
        /// This error is returned when `send()` is called after shutdown initiated.
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        ///
        /// Some effects were still running when the timeout elapsed.
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),

        /// Timeout waiting for an action or for effects to finish
        #[error("Timeout waiting for action")]
        Timeout,

        /// Action broadcast channel closed
        #[error("Action broadcast channel closed")]
        ChannelClosed,
    }
}

/// Configuration for Store behavior
///
/// # Example
///
/// ```ignore
/// let config = StoreConfig::default()
///     .with_broadcast_capacity(128)
///     .with_shutdown_timeout(Duration::from_secs(5));
///
/// let store = Store::with_config(state, reducer, env, config);
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Capacity of the action broadcast channel
    pub broadcast_capacity: usize,
    /// Default timeout for graceful shutdown
    pub default_shutdown_timeout: Duration,
}

impl StoreConfig {
    /// Set the action broadcast capacity
    #[must_use]
    pub const fn with_broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity;
        self
    }

    /// Set the default shutdown timeout
    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.default_shutdown_timeout = timeout;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: 64,
            default_shutdown_timeout: Duration::from_secs(30),
        }
    }
}

/// Handle for tracking effect completion
///
/// Returned by [`Store::send()`] to allow waiting for the effects of that
/// action to complete. Effects produced by feedback actions are not tracked.
///
/// Live queries never complete on their own, so do not wait on the handle
/// of an action that opens one; observe actions with
/// [`Store::subscribe_actions`] instead.
///
/// # Example
///
/// ```ignore
/// let mut handle = store.send(AddTodoAction::SaveRequested).await?;
/// handle.wait_with_timeout(Duration::from_secs(5)).await?;
/// // The insert has finished
/// ```
#[derive(Clone)]
pub struct EffectHandle {
    effects: Arc<AtomicUsize>,
    completion: watch::Receiver<()>,
}

impl EffectHandle {
    /// Create a new effect handle plus the tracking used by effect execution
    fn new() -> (Self, EffectTracking) {
        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(());

        let handle = Self {
            effects: Arc::clone(&counter),
            completion: rx,
        };

        let tracking = EffectTracking {
            counter,
            notifier: Arc::new(tx),
        };

        (handle, tracking)
    }

    /// Create a handle that's already complete
    #[must_use]
    pub fn completed() -> Self {
        let (handle, _tracking) = Self::new();
        handle
    }

    /// Number of tracked effects still running
    #[must_use]
    pub fn pending(&self) -> usize {
        self.effects.load(Ordering::SeqCst)
    }

    /// Wait for all tracked effects to complete
    pub async fn wait(&mut self) {
        while self.effects.load(Ordering::SeqCst) > 0 {
            if self.completion.changed().await.is_err() {
                break;
            }
        }
    }

    /// Wait for all tracked effects to complete with a timeout
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if the timeout expires before all effects complete.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), StoreError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| StoreError::Timeout)
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("pending_effects", &self.effects.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Internal: Effect tracking context passed through effect execution
#[derive(Clone)]
struct EffectTracking {
    counter: Arc<AtomicUsize>,
    notifier: Arc<watch::Sender<()>>,
}

impl EffectTracking {
    /// Tracking that nobody waits on (nested cancellable effects)
    fn detached() -> Self {
        EffectHandle::new().1
    }

    /// Increment the effect counter (effect started)
    fn increment(&self) {
        self.counter.fetch_add(1, Ordering::SeqCst);
    }

    /// Decrement the effect counter (effect completed)
    fn decrement(&self) {
        if self.counter.fetch_sub(1, Ordering::SeqCst) == 1 {
            // Counter reached zero, notify waiters
            let _ = self.notifier.send(());
        }
    }
}

/// Internal: RAII guard that decrements effect counter on drop
///
/// Runs when the effect finishes, panics, or is aborted.
struct DecrementGuard(EffectTracking);

impl Drop for DecrementGuard {
    fn drop(&mut self) {
        self.0.decrement();
    }
}

/// Guard that decrements an atomic counter on drop (for shutdown tracking)
struct AtomicCounterGuard(Arc<AtomicUsize>);

impl Drop for AtomicCounterGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Internal: a cancellable effect currently running
struct InFlight {
    token: u64,
    abort: AbortHandle,
}

/// Internal: cancellable effects keyed by id
#[derive(Clone, Default)]
struct Cancellations {
    in_flight: Arc<Mutex<HashMap<EffectId, InFlight>>>,
    next_token: Arc<AtomicU64>,
}

impl Cancellations {
    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<EffectId, InFlight>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_token(&self) -> u64 {
        self.next_token.fetch_add(1, Ordering::Relaxed)
    }

    /// Abort the effect running under `id`; returns whether one was running
    fn cancel(&self, id: EffectId) -> bool {
        let previous = self.lock().remove(&id);
        previous.is_some_and(|entry| {
            entry.abort.abort();
            true
        })
    }

    /// Forget `id` if it still refers to the effect identified by `token`
    fn finish(&self, id: EffectId, token: u64) {
        let mut in_flight = self.lock();
        if in_flight.get(&id).is_some_and(|entry| entry.token == token) {
            in_flight.remove(&id);
        }
    }

    fn cancel_all(&self) -> usize {
        let drained: Vec<InFlight> = self.lock().drain().map(|(_, entry)| entry).collect();
        for entry in &drained {
            entry.abort.abort();
        }
        drained.len()
    }

    fn is_running(&self, id: EffectId) -> bool {
        self.lock().contains_key(&id)
    }
}

/// Store module - The runtime for reducers
///
/// Store runtime for coordinating reducer execution and effect handling.
pub mod store {
    use super::{
        Arc, AtomicBool, AtomicCounterGuard, AtomicUsize, Cancellations, DecrementGuard,
        Duration, Effect, EffectHandle, EffectId, EffectTracking, InFlight, Ordering, Reducer,
        RwLock, StoreConfig, StoreError,
    };
    use futures::StreamExt;
    use std::future::Future;
    use std::pin::Pin;
    use tokio::sync::{broadcast, watch};
    use tokio::task::JoinHandle;

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (behind `RwLock` for concurrent access)
    /// 2. Reducer (controller logic)
    /// 3. Environment (injected dependencies)
    /// 4. Effect execution (with feedback loop and cancellation)
    ///
    /// Reductions are serialized by the state lock: one action is reduced
    /// at a time, in arrival order.
    ///
    /// # Type Parameters
    ///
    /// - `S`: State type
    /// - `A`: Action type
    /// - `E`: Environment type
    /// - `R`: Reducer implementation
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<S>>,
        reducer: R,
        environment: E,
        shutdown: Arc<AtomicBool>,
        pending_effects: Arc<AtomicUsize>,
        cancellations: Cancellations,
        default_shutdown_timeout: Duration,
        /// Every action produced by an effect, published after it was reduced.
        action_broadcast: broadcast::Sender<A>,
        /// Bumped after every reduction.
        state_version: Arc<watch::Sender<u64>>,
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        A: Send + Clone + 'static,
        S: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self::with_config(initial_state, reducer, environment, StoreConfig::default())
        }

        /// Create a new store with custom configuration
        #[must_use]
        pub fn with_config(
            initial_state: S,
            reducer: R,
            environment: E,
            config: StoreConfig,
        ) -> Self {
            let (action_broadcast, _) = broadcast::channel(config.broadcast_capacity.max(1));
            let (state_version, _) = watch::channel(0);

            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer,
                environment,
                shutdown: Arc::new(AtomicBool::new(false)),
                pending_effects: Arc::new(AtomicUsize::new(0)),
                cancellations: Cancellations::default(),
                default_shutdown_timeout: config.default_shutdown_timeout,
                action_broadcast,
                state_version: Arc::new(state_version),
            }
        }

        /// Send an action to the store
        ///
        /// Reduces the action under the state write lock, then starts the
        /// returned effects in the background.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] once shutdown has begun.
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError>
        where
            R: Clone,
            E: Clone,
        {
            if self.shutdown.load(Ordering::Acquire) {
                tracing::warn!("Rejected action: store is shutting down");
                metrics::counter!("store.shutdown.rejected_actions").increment(1);
                return Err(StoreError::ShutdownInProgress);
            }

            metrics::counter!("store.commands.total").increment(1);

            let (handle, tracking) = EffectHandle::new();

            let effects = {
                let mut state = self.state.write().await;
                tracing::trace!("Acquired write lock on state");

                let start = std::time::Instant::now();
                let effects = self.reducer.reduce(&mut *state, action, &self.environment);
                metrics::histogram!("store.reducer.duration_seconds")
                    .record(start.elapsed().as_secs_f64());

                effects
            };

            self.state_version.send_modify(|version| *version += 1);

            tracing::trace!("Executing {} effects", effects.len());
            for effect in effects {
                self.execute_effect_internal(effect, &tracking);
            }

            Ok(handle)
        }

        /// Send an action and wait for a matching feedback action
        ///
        /// Subscribes before sending, so a fast effect cannot be missed.
        ///
        /// # Errors
        ///
        /// - [`StoreError::Timeout`] if no matching action arrives in time
        /// - [`StoreError::ChannelClosed`] if the broadcast channel closed
        /// - [`StoreError::ShutdownInProgress`] if the store is shutting down
        pub async fn send_and_wait_for<F>(
            &self,
            action: A,
            predicate: F,
            timeout: Duration,
        ) -> Result<A, StoreError>
        where
            R: Clone,
            E: Clone,
            F: Fn(&A) -> bool,
        {
            let mut rx = self.action_broadcast.subscribe();

            self.send(action).await?;

            tokio::time::timeout(timeout, async {
                loop {
                    match rx.recv().await {
                        Ok(action) if predicate(&action) => return Ok(action),
                        Ok(_) => {},
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "Action observer lagged");
                        },
                        Err(broadcast::error::RecvError::Closed) => {
                            return Err(StoreError::ChannelClosed);
                        },
                    }
                }
            })
            .await
            .map_err(|_| StoreError::Timeout)?
        }

        /// Subscribe to actions produced by effects
        ///
        /// Each action is published after the reducer processed it, so the
        /// state read right after receiving it already reflects it.
        #[must_use]
        pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
            self.action_broadcast.subscribe()
        }

        /// Subscribe to state changes
        ///
        /// The value is a counter bumped after every reduction; read the
        /// state itself with [`Store::state`].
        #[must_use]
        pub fn state_changes(&self) -> watch::Receiver<u64> {
            self.state_version.subscribe()
        }

        /// Read the current state through a projection
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&*state)
        }

        /// Returns true if an effect is running under `id`
        #[must_use]
        pub fn is_running(&self, id: EffectId) -> bool {
            self.cancellations.is_running(id)
        }

        /// Gracefully shut down the store
        ///
        /// Rejects new actions, aborts every cancellable effect (live
        /// queries, timers), then waits for the remaining effects.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if effects are still
        /// running when `timeout` elapses.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
            tracing::info!("Initiating graceful shutdown");
            metrics::counter!("store.shutdown.initiated").increment(1);

            self.shutdown.store(true, Ordering::Release);

            let cancelled = self.cancellations.cancel_all();
            if cancelled > 0 {
                tracing::debug!(cancelled, "Cancelled in-flight effects");
            }

            let start = std::time::Instant::now();
            let poll_interval = Duration::from_millis(10);

            loop {
                let pending = self.pending_effects.load(Ordering::Acquire);

                if pending == 0 {
                    tracing::info!("All effects completed, shutdown successful");
                    return Ok(());
                }

                if start.elapsed() >= timeout {
                    tracing::error!(pending_effects = pending, "Shutdown timeout");
                    metrics::counter!("store.shutdown.timeout").increment(1);
                    return Err(StoreError::ShutdownTimeout(pending));
                }

                tokio::time::sleep(poll_interval).await;
            }
        }

        /// Shut down with the configured default timeout
        ///
        /// # Errors
        ///
        /// See [`Store::shutdown`].
        pub async fn close(&self) -> Result<(), StoreError> {
            self.shutdown(self.default_shutdown_timeout).await
        }

        /// Reduce an effect-produced action, then publish it to observers
        async fn feed_back(&self, action: A) -> Result<EffectHandle, StoreError>
        where
            R: Clone,
            E: Clone,
        {
            let handle = self.send(action.clone()).await?;
            let _ = self.action_broadcast.send(action);
            Ok(handle)
        }

        fn execute_effect_internal(&self, effect: Effect<A>, tracking: &EffectTracking)
        where
            R: Clone,
            E: Clone,
        {
            match effect {
                Effect::None => {
                    metrics::counter!("store.effects.executed", "type" => "none").increment(1);
                },
                Effect::Parallel(effects) => {
                    metrics::counter!("store.effects.executed", "type" => "parallel").increment(1);
                    for effect in effects {
                        self.execute_effect_internal(effect, tracking);
                    }
                },
                Effect::Cancel(id) => {
                    self.cancel(id);
                },
                Effect::Cancellable { id, effect } => {
                    metrics::counter!("store.effects.executed", "type" => "cancellable").increment(1);
                    let _ = self.spawn_cancellable(id, *effect, tracking);
                },
                effect => {
                    metrics::counter!("store.effects.executed", "type" => effect_type(&effect))
                        .increment(1);
                    let _ = self.spawn_tracked(effect, tracking);
                },
            }
        }

        fn cancel(&self, id: EffectId) {
            if self.cancellations.cancel(id) {
                tracing::debug!(%id, "Cancelled effect");
                metrics::counter!("store.effects.cancelled").increment(1);
            }
        }

        fn spawn_tracked(&self, effect: Effect<A>, tracking: &EffectTracking) -> JoinHandle<()>
        where
            R: Clone,
            E: Clone,
        {
            tracking.increment();
            let guard = DecrementGuard(tracking.clone());

            self.pending_effects.fetch_add(1, Ordering::SeqCst);
            let pending_guard = AtomicCounterGuard(Arc::clone(&self.pending_effects));

            let run = self.run(effect);
            tokio::spawn(async move {
                let _guard = guard;
                let _pending_guard = pending_guard;
                run.await;
            })
        }

        /// Start `effect` under `id`, aborting whatever ran under it before
        fn spawn_cancellable(
            &self,
            id: EffectId,
            effect: Effect<A>,
            tracking: &EffectTracking,
        ) -> JoinHandle<()>
        where
            R: Clone,
            E: Clone,
        {
            let token = self.cancellations.next_token();

            // Holding the registry lock across spawn keeps the new task from
            // finishing (and unregistering) before it is registered.
            let mut in_flight = self.cancellations.lock();
            if let Some(previous) = in_flight.remove(&id) {
                previous.abort.abort();
                tracing::debug!(%id, "Replaced in-flight effect");
                metrics::counter!("store.effects.cancelled").increment(1);
            }

            tracking.increment();
            let guard = DecrementGuard(tracking.clone());

            self.pending_effects.fetch_add(1, Ordering::SeqCst);
            let pending_guard = AtomicCounterGuard(Arc::clone(&self.pending_effects));

            let run = self.run(effect);
            let cancellations = self.cancellations.clone();
            let handle = tokio::spawn(async move {
                let _guard = guard;
                let _pending_guard = pending_guard;
                run.await;
                cancellations.finish(id, token);
            });

            in_flight.insert(
                id,
                InFlight {
                    token,
                    abort: handle.abort_handle(),
                },
            );

            handle
        }

        /// Execute an effect to completion within the current task
        fn run(&self, effect: Effect<A>) -> Pin<Box<dyn Future<Output = ()> + Send>>
        where
            R: Clone,
            E: Clone,
        {
            let store = self.clone();

            Box::pin(async move {
                match effect {
                    Effect::None => {},
                    Effect::Future(fut) => {
                        if let Some(action) = fut.await {
                            tracing::trace!("Effect::Future produced an action");
                            let _ = store.feed_back(action).await;
                        }
                    },
                    Effect::Delay { duration, action } => {
                        tokio::time::sleep(duration).await;
                        tracing::trace!("Effect::Delay elapsed");
                        let _ = store.feed_back(*action).await;
                    },
                    Effect::Stream(mut stream) => {
                        while let Some(action) = stream.next().await {
                            if store.feed_back(action).await.is_err() {
                                tracing::debug!("Store rejected stream item, ending stream");
                                break;
                            }
                        }
                        tracing::trace!("Effect::Stream ended");
                    },
                    Effect::Parallel(effects) => {
                        let runs = effects.into_iter().map(|effect| store.run(effect));
                        futures::future::join_all(runs).await;
                    },
                    Effect::Sequential(effects) => {
                        for effect in effects {
                            store.run(effect).await;
                        }
                    },
                    Effect::Cancellable { id, effect } => {
                        let tracking = EffectTracking::detached();
                        let _ = store.spawn_cancellable(id, *effect, &tracking).await;
                    },
                    Effect::Cancel(id) => store.cancel(id),
                }
            })
        }
    }

    const fn effect_type<A>(effect: &Effect<A>) -> &'static str {
        match effect {
            Effect::None => "none",
            Effect::Parallel(_) => "parallel",
            Effect::Sequential(_) => "sequential",
            Effect::Delay { .. } => "delay",
            Effect::Future(_) => "future",
            Effect::Stream(_) => "stream",
            Effect::Cancellable { .. } => "cancellable",
            Effect::Cancel(_) => "cancel",
        }
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Clone,
        E: Clone,
    {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                reducer: self.reducer.clone(),
                environment: self.environment.clone(),
                shutdown: Arc::clone(&self.shutdown),
                pending_effects: Arc::clone(&self.pending_effects),
                cancellations: self.cancellations.clone(),
                default_shutdown_timeout: self.default_shutdown_timeout,
                action_broadcast: self.action_broadcast.clone(),
                state_version: Arc::clone(&self.state_version),
            }
        }
    }
}

// Re-export for convenience
pub use store::Store;
