//! SQLite persistence for tasklist.
//!
//! This crate provides the embedded-database implementations of the storage
//! traits from `tasklist-core`:
//!
//! - [`SqliteTodoStore`]: tasks with live queries
//! - [`SqliteSettingsStore`]: display preferences, one row per key
//!
//! Both share one connection pool, opened through [`SqliteDatabase`]. Live
//! queries are driven by in-process change notifications, so every writer
//! must go through the stores handed out by the same `SqliteDatabase`.
//!
//! # Example
//!
//! ```no_run
//! use tasklist_sqlite::SqliteDatabase;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let database = SqliteDatabase::connect("sqlite://tasklist.db", 4).await?;
//! let todos = database.todo_store();
//! let settings = database.settings_store();
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use thiserror::Error;

mod settings;
mod todos;

pub use settings::SqliteSettingsStore;
pub use todos::SqliteTodoStore;

/// Errors opening or migrating the database
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// The connection string is malformed or the database cannot be opened
    #[error("Failed to connect to {url}: {source}")]
    Connect {
        /// Connection string that failed
        url: String,
        /// Driver error
        #[source]
        source: sqlx::Error,
    },

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Connection pool plus the stores sharing it
#[derive(Clone, Debug)]
pub struct SqliteDatabase {
    pool: SqlitePool,
    todos: SqliteTodoStore,
    settings: SqliteSettingsStore,
}

impl SqliteDatabase {
    /// Open (creating if missing) the database at `database_url` and bring
    /// its schema up to date.
    ///
    /// In-memory databases (`sqlite::memory:`) live only as long as their
    /// connection, so they are pinned to a single pooled connection that is
    /// never recycled.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::Connect`] if the URL is invalid or the file
    /// cannot be opened, [`DatabaseError::Migrate`] if the schema cannot be
    /// created.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, DatabaseError> {
        let connect_error = |source| DatabaseError::Connect {
            url: database_url.to_string(),
            source,
        };

        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(connect_error)?
            .create_if_missing(true);

        let pool_options = if is_in_memory(database_url) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections.max(1))
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(connect_error)?;

        let database = Self::from_pool(pool);
        database.migrate().await?;

        tracing::info!(url = database_url, "Database ready");
        Ok(database)
    }

    /// Open a fresh private in-memory database
    ///
    /// # Errors
    ///
    /// See [`SqliteDatabase::connect`].
    pub async fn in_memory() -> Result<Self, DatabaseError> {
        Self::connect("sqlite::memory:", 1).await
    }

    /// Wrap an existing pool without migrating it
    #[must_use]
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self {
            todos: SqliteTodoStore::new(pool.clone()),
            settings: SqliteSettingsStore::new(pool.clone()),
            pool,
        }
    }

    /// Create the `tasks` and `preferences` tables if they don't exist
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::Migrate`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), DatabaseError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// The task store backed by this database
    #[must_use]
    pub fn todo_store(&self) -> SqliteTodoStore {
        self.todos.clone()
    }

    /// The settings store backed by this database
    #[must_use]
    pub fn settings_store(&self) -> SqliteSettingsStore {
        self.settings.clone()
    }

    /// Get the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close every pooled connection
    ///
    /// Subsequent store operations fail with a database error.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_in_memory_urls() {
        assert!(is_in_memory("sqlite::memory:"));
        assert!(is_in_memory("sqlite://file:tasks?mode=memory&cache=shared"));
        assert!(!is_in_memory("sqlite://tasklist.db"));
    }
}
