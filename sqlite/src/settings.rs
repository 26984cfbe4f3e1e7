//! `preferences` table access.

use sqlx::sqlite::SqlitePool;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tasklist_core::settings::{
    Language, Preferences, PreferencesStream, SettingsError, SettingsStore, TaskSort,
    HIDE_COMPLETED_KEY, LANGUAGE_KEY, SORT_KEY,
};
use tokio::sync::watch;

/// SQLite-backed [`SettingsStore`].
///
/// Each preference is its own row in `preferences(key, value)`, so a write
/// touches exactly one key.
#[derive(Clone, Debug)]
pub struct SqliteSettingsStore {
    pool: SqlitePool,
    changes: Arc<watch::Sender<u64>>,
}

impl SqliteSettingsStore {
    /// Create a store over an already migrated pool
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            pool,
            changes: Arc::new(changes),
        }
    }

    async fn load(&self) -> Result<Preferences, SettingsError> {
        let rows: Vec<(String, String)> = sqlx::query_as("SELECT key, value FROM preferences")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| SettingsError::Storage(e.to_string()))?;

        let values: HashMap<String, String> = rows.into_iter().collect();
        Ok(Preferences::from_stored(
            values.get(SORT_KEY).map(String::as_str),
            values.get(HIDE_COMPLETED_KEY).map(String::as_str),
            values.get(LANGUAGE_KEY).map(String::as_str),
        ))
    }

    #[tracing::instrument(skip(self))]
    async fn put(&self, key: &'static str, value: String) -> Result<(), SettingsError> {
        sqlx::query(
            "INSERT INTO preferences (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(&value)
        .execute(&self.pool)
        .await
        .map_err(|e| SettingsError::Storage(e.to_string()))?;

        tracing::info!("Preference saved");
        self.changes.send_modify(|n| *n += 1);
        Ok(())
    }
}

impl SettingsStore for SqliteSettingsStore {
    fn observe(&self) -> PreferencesStream {
        let store = self.clone();
        let mut changes = self.changes.subscribe();

        Box::pin(async_stream::stream! {
            loop {
                match store.load().await {
                    Ok(preferences) => yield preferences,
                    Err(error) => {
                        tracing::warn!(%error, "Reading preferences failed, using defaults");
                        yield Preferences::default();
                    },
                }

                if changes.changed().await.is_err() {
                    break;
                }
            }
        })
    }

    fn current(&self) -> Pin<Box<dyn Future<Output = Result<Preferences, SettingsError>> + Send + '_>> {
        Box::pin(self.load())
    }

    fn update_sort(&self, sort: TaskSort) -> Pin<Box<dyn Future<Output = Result<(), SettingsError>> + Send + '_>> {
        Box::pin(self.put(SORT_KEY, sort.as_str().to_string()))
    }

    fn update_hide_completed(
        &self,
        hide_completed: bool,
    ) -> Pin<Box<dyn Future<Output = Result<(), SettingsError>> + Send + '_>> {
        Box::pin(self.put(HIDE_COMPLETED_KEY, hide_completed.to_string()))
    }

    fn update_language(
        &self,
        language: Language,
    ) -> Pin<Box<dyn Future<Output = Result<(), SettingsError>> + Send + '_>> {
        Box::pin(self.put(LANGUAGE_KEY, language.code().to_string()))
    }
}
