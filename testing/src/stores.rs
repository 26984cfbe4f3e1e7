//! In-memory store implementations for fast, deterministic tests.
//!
//! - [`InMemoryTodoStore`]: `BTreeMap`-backed task storage with live queries
//! - [`InMemorySettingsStore`]: preferences held in a `watch` channel
//!
//! Both can be switched into a failing mode to exercise error paths, and
//! task writes can be slowed down to exercise effect ordering.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Test utilities document panics where critical

use std::collections::{BTreeMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tasklist_core::settings::{
    Language, Preferences, PreferencesStream, SettingsError, SettingsStore, TaskSort,
};
use tasklist_core::task::{Task, TaskId, TaskQuery};
use tasklist_core::todo_store::{validate_name, Result, TaskStream, TodoStore, TodoStoreError};
use tokio::sync::watch;

#[derive(Debug, Default)]
struct Tasks {
    rows: BTreeMap<TaskId, Task>,
    last_id: i64,
}

/// In-memory todo store for fast, deterministic testing.
///
/// Identities start at 1 and are never reused. Every committed change wakes
/// all open queries, which then re-evaluate [`TaskQuery::apply`].
///
/// # Example
///
/// ```
/// use tasklist_testing::InMemoryTodoStore;
/// use tasklist_core::task::Task;
/// use tasklist_core::todo_store::TodoStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = InMemoryTodoStore::new();
/// let id = store.insert(Task::new("Buy milk", false, chrono::Utc::now())).await?;
///
/// assert_eq!(store.len(), 1);
/// assert!(store.task(id).is_some());
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct InMemoryTodoStore {
    tasks: Arc<RwLock<Tasks>>,
    changes: Arc<watch::Sender<u64>>,
    failing: Arc<AtomicBool>,
    write_delays: Arc<Mutex<VecDeque<Duration>>>,
}

impl InMemoryTodoStore {
    /// Create a new empty store
    #[must_use]
    pub fn new() -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            tasks: Arc::new(RwLock::new(Tasks::default())),
            changes: Arc::new(changes),
            failing: Arc::new(AtomicBool::new(false)),
            write_delays: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Hold the next writes back before they commit, one delay per write
    ///
    /// Writes are insert, update and the deletes, counted in the order they
    /// are called. Writes past the end of `delays` commit at once.
    pub fn delay_next_writes(&self, delays: impl IntoIterator<Item = Duration>) {
        self.write_delays.lock().unwrap().extend(delays);
    }

    /// Make every operation fail with `Database` until switched back
    ///
    /// Open queries yield an error at their next wake-up and resume once the
    /// store works again and another change happens.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of stored tasks
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.read().unwrap().rows.len()
    }

    /// Check if the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All tasks in identity order
    #[must_use]
    pub fn tasks(&self) -> Vec<Task> {
        self.tasks.read().unwrap().rows.values().cloned().collect()
    }

    /// A single task, read synchronously
    #[must_use]
    pub fn task(&self, id: TaskId) -> Option<Task> {
        self.tasks.read().unwrap().rows.get(&id).cloned()
    }

    /// Number of committed changes so far
    #[must_use]
    pub fn change_count(&self) -> u64 {
        *self.changes.borrow()
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(TodoStoreError::Database("storage unavailable".to_string()));
        }
        Ok(())
    }

    fn next_delay(&self) -> Option<Duration> {
        self.write_delays.lock().unwrap().pop_front()
    }

    fn notify(&self) {
        self.changes.send_modify(|n| *n += 1);
    }

    fn snapshot(&self, query: &TaskQuery) -> Result<Vec<Task>> {
        self.check()?;
        Ok(query.apply(self.tasks()))
    }

    fn insert_now(&self, task: Task) -> Result<TaskId> {
        validate_name(&task.name)?;
        self.check()?;
        let id = {
            let mut tasks = self.tasks.write().unwrap();
            tasks.last_id += 1;
            let id = TaskId::new(tasks.last_id);
            tasks.rows.insert(id, task.with_id(id));
            id
        };
        tracing::debug!(%id, "Inserted task");
        self.notify();
        Ok(id)
    }

    fn update_now(&self, task: Task) -> Result<()> {
        validate_name(&task.name)?;
        self.check()?;
        {
            let mut tasks = self.tasks.write().unwrap();
            let row = tasks
                .rows
                .get_mut(&task.id)
                .ok_or(TodoStoreError::NotFound(task.id))?;
            row.name = task.name;
            row.important = task.important;
            row.completed = task.completed;
        }
        self.notify();
        Ok(())
    }

    fn remove_where(&self, pred: impl Fn(&Task) -> bool) -> Result<u64> {
        self.check()?;
        let removed = {
            let mut tasks = self.tasks.write().unwrap();
            let before = tasks.rows.len();
            tasks.rows.retain(|_, task| !pred(task));
            before - tasks.rows.len()
        };
        if removed > 0 {
            self.notify();
        }
        Ok(removed as u64)
    }
}

impl Default for InMemoryTodoStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TodoStore for InMemoryTodoStore {
    fn query(&self, query: TaskQuery) -> TaskStream {
        let store = self.clone();
        let mut changes = self.changes.subscribe();

        Box::pin(async_stream::stream! {
            loop {
                yield store.snapshot(&query);
                if changes.changed().await.is_err() {
                    break;
                }
            }
        })
    }

    fn insert(&self, task: Task) -> Pin<Box<dyn Future<Output = Result<TaskId>> + Send + '_>> {
        let delay = self.next_delay();
        Box::pin(async move {
            pause(delay).await;
            self.insert_now(task)
        })
    }

    fn update(&self, task: Task) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let delay = self.next_delay();
        Box::pin(async move {
            pause(delay).await;
            self.update_now(task)
        })
    }

    fn delete(&self, task: Task) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let delay = self.next_delay();
        Box::pin(async move {
            pause(delay).await;
            self.remove_where(|t| t.id == task.id).map(|_| ())
        })
    }

    fn delete_all_completed(&self) -> Pin<Box<dyn Future<Output = Result<u64>> + Send + '_>> {
        let delay = self.next_delay();
        Box::pin(async move {
            pause(delay).await;
            self.remove_where(|t| t.completed)
        })
    }

    fn delete_all(&self) -> Pin<Box<dyn Future<Output = Result<u64>> + Send + '_>> {
        let delay = self.next_delay();
        Box::pin(async move {
            pause(delay).await;
            self.remove_where(|_| true)
        })
    }

    fn get(&self, id: TaskId) -> Pin<Box<dyn Future<Output = Result<Option<Task>>> + Send + '_>> {
        Box::pin(async move {
            self.check()?;
            Ok(self.task(id))
        })
    }
}

async fn pause(delay: Option<Duration>) {
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
}

/// In-memory settings store for fast, deterministic testing.
///
/// Reads and writes can fail independently: failing reads make `current()`
/// return an error and `observe()` yield defaults; failing writes reject
/// every `update_*`.
#[derive(Clone, Debug)]
pub struct InMemorySettingsStore {
    preferences: Arc<watch::Sender<Preferences>>,
    failing_reads: Arc<AtomicBool>,
    failing_writes: Arc<AtomicBool>,
}

impl InMemorySettingsStore {
    /// Create a store holding the default preferences
    #[must_use]
    pub fn new() -> Self {
        Self::with_preferences(Preferences::default())
    }

    /// Create a store holding `preferences`
    #[must_use]
    pub fn with_preferences(preferences: Preferences) -> Self {
        let (preferences, _) = watch::channel(preferences);
        Self {
            preferences: Arc::new(preferences),
            failing_reads: Arc::new(AtomicBool::new(false)),
            failing_writes: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Make reads fail until switched back
    pub fn set_failing_reads(&self, failing: bool) {
        self.failing_reads.store(failing, Ordering::SeqCst);
    }

    /// Make writes fail until switched back
    pub fn set_failing_writes(&self, failing: bool) {
        self.failing_writes.store(failing, Ordering::SeqCst);
    }

    /// The stored preferences, read synchronously
    #[must_use]
    pub fn snapshot(&self) -> Preferences {
        self.preferences.borrow().clone()
    }

    fn read(&self) -> std::result::Result<Preferences, SettingsError> {
        if self.failing_reads.load(Ordering::SeqCst) {
            return Err(SettingsError::Storage("preferences unreadable".to_string()));
        }
        Ok(self.snapshot())
    }

    fn write(
        &self,
        apply: impl FnOnce(&mut Preferences),
    ) -> std::result::Result<(), SettingsError> {
        if self.failing_writes.load(Ordering::SeqCst) {
            return Err(SettingsError::Storage("preferences not writable".to_string()));
        }
        self.preferences.send_modify(apply);
        Ok(())
    }
}

impl Default for InMemorySettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsStore for InMemorySettingsStore {
    fn observe(&self) -> PreferencesStream {
        let store = self.clone();
        let mut changes = self.preferences.subscribe();

        Box::pin(async_stream::stream! {
            loop {
                yield store.read().unwrap_or_default();
                if changes.changed().await.is_err() {
                    break;
                }
            }
        })
    }

    fn current(
        &self,
    ) -> Pin<Box<dyn Future<Output = std::result::Result<Preferences, SettingsError>> + Send + '_>>
    {
        Box::pin(async move { self.read() })
    }

    fn update_sort(
        &self,
        sort: TaskSort,
    ) -> Pin<Box<dyn Future<Output = std::result::Result<(), SettingsError>> + Send + '_>> {
        Box::pin(async move { self.write(|p| p.sort = sort) })
    }

    fn update_hide_completed(
        &self,
        hide_completed: bool,
    ) -> Pin<Box<dyn Future<Output = std::result::Result<(), SettingsError>> + Send + '_>> {
        Box::pin(async move { self.write(|p| p.hide_completed = hide_completed) })
    }

    fn update_language(
        &self,
        language: Language,
    ) -> Pin<Box<dyn Future<Output = std::result::Result<(), SettingsError>> + Send + '_>> {
        Box::pin(async move { self.write(|p| p.language = language) })
    }
}
