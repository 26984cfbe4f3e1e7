//! `tasks` table access and live queries.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tasklist_core::settings::TaskSort;
use tasklist_core::task::{Task, TaskId, TaskQuery};
use tasklist_core::todo_store::{validate_name, Result, TaskStream, TodoStore, TodoStoreError};
use tokio::sync::watch;

/// SQLite-backed [`TodoStore`].
///
/// Filtering and ordering happen in SQL: the name filter is a `LIKE`
/// (ASCII case-insensitive in SQLite) and names sort with `COLLATE NOCASE`.
/// Ties always break by ascending id.
///
/// Clones share the pool and the change counter; open queries re-run after
/// every write made through any clone.
#[derive(Clone, Debug)]
pub struct SqliteTodoStore {
    pool: SqlitePool,
    changes: Arc<watch::Sender<u64>>,
}

#[derive(sqlx::FromRow)]
struct TaskRow {
    id: i64,
    name: String,
    important: bool,
    completed: bool,
    created_at: i64,
}

impl From<TaskRow> for Task {
    fn from(row: TaskRow) -> Self {
        Self {
            id: TaskId::new(row.id),
            name: row.name,
            important: row.important,
            completed: row.completed,
            created_at: DateTime::<Utc>::from_timestamp_millis(row.created_at).unwrap_or_default(),
        }
    }
}

fn db_error(e: sqlx::Error) -> TodoStoreError {
    TodoStoreError::Database(e.to_string())
}

const fn order_by(sort: TaskSort) -> &'static str {
    match sort {
        TaskSort::NameAscending => "name COLLATE NOCASE ASC, id ASC",
        TaskSort::NameDescending => "name COLLATE NOCASE DESC, id ASC",
        TaskSort::DateAscending => "created_at ASC, id ASC",
        TaskSort::DateDescending => "created_at DESC, id ASC",
    }
}

/// `%text%` with LIKE wildcards in `text` escaped by `\`
fn like_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

impl SqliteTodoStore {
    /// Create a store over an already migrated pool
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            pool,
            changes: Arc::new(changes),
        }
    }

    fn notify(&self) {
        self.changes.send_modify(|n| *n += 1);
    }

    #[tracing::instrument(skip(self), level = "trace")]
    async fn fetch(&self, query: &TaskQuery) -> Result<Vec<Task>> {
        let sql = format!(
            "SELECT id, name, important, completed, created_at FROM tasks
             WHERE (completed = 0 OR ?1 = 0) AND name LIKE ?2 ESCAPE '\\'
             ORDER BY {}",
            order_by(query.sort)
        );

        let rows: Vec<TaskRow> = sqlx::query_as(&sql)
            .bind(query.hide_completed)
            .bind(like_pattern(&query.text))
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(rows.into_iter().map(Task::from).collect())
    }

    #[tracing::instrument(skip(self, task), fields(name = %task.name))]
    async fn insert_task(&self, task: Task) -> Result<TaskId> {
        validate_name(&task.name)?;

        let result = sqlx::query(
            "INSERT INTO tasks (name, important, completed, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&task.name)
        .bind(task.important)
        .bind(task.completed)
        .bind(task.created_at.timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        let id = TaskId::new(result.last_insert_rowid());
        tracing::debug!(%id, "Inserted task");
        metrics::counter!("tasklist.todos.writes", "op" => "insert").increment(1);

        self.notify();
        Ok(id)
    }

    #[tracing::instrument(skip(self, task), fields(id = %task.id))]
    async fn update_task(&self, task: Task) -> Result<()> {
        validate_name(&task.name)?;

        let result = sqlx::query(
            "UPDATE tasks SET name = ?1, important = ?2, completed = ?3 WHERE id = ?4",
        )
        .bind(&task.name)
        .bind(task.important)
        .bind(task.completed)
        .bind(task.id.get())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(TodoStoreError::NotFound(task.id));
        }
        metrics::counter!("tasklist.todos.writes", "op" => "update").increment(1);

        self.notify();
        Ok(())
    }

    async fn delete_where(&self, op: &'static str, sql: &str, id: Option<i64>) -> Result<u64> {
        let mut statement = sqlx::query(sql);
        if let Some(id) = id {
            statement = statement.bind(id);
        }

        let removed = statement
            .execute(&self.pool)
            .await
            .map_err(db_error)?
            .rows_affected();

        tracing::debug!(op, removed, "Deleted tasks");
        if removed > 0 {
            metrics::counter!("tasklist.todos.writes", "op" => op).increment(1);
            self.notify();
        }
        Ok(removed)
    }

    async fn find(&self, id: TaskId) -> Result<Option<Task>> {
        let row: Option<TaskRow> = sqlx::query_as(
            "SELECT id, name, important, completed, created_at FROM tasks WHERE id = ?1",
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(Task::from))
    }
}

impl TodoStore for SqliteTodoStore {
    fn query(&self, query: TaskQuery) -> TaskStream {
        let store = self.clone();
        let mut changes = self.changes.subscribe();

        Box::pin(async_stream::stream! {
            loop {
                let snapshot = store.fetch(&query).await;
                if let Err(error) = &snapshot {
                    tracing::error!(%error, "Live query failed");
                }
                yield snapshot;

                if changes.changed().await.is_err() {
                    break;
                }
            }
        })
    }

    fn insert(&self, task: Task) -> Pin<Box<dyn Future<Output = Result<TaskId>> + Send + '_>> {
        Box::pin(self.insert_task(task))
    }

    fn update(&self, task: Task) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(self.update_task(task))
    }

    fn delete(&self, task: Task) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.delete_where("delete", "DELETE FROM tasks WHERE id = ?1", Some(task.id.get()))
                .await
                .map(|_| ())
        })
    }

    fn delete_all_completed(&self) -> Pin<Box<dyn Future<Output = Result<u64>> + Send + '_>> {
        Box::pin(self.delete_where(
            "delete_completed",
            "DELETE FROM tasks WHERE completed = 1",
            None,
        ))
    }

    fn delete_all(&self) -> Pin<Box<dyn Future<Output = Result<u64>> + Send + '_>> {
        Box::pin(self.delete_where("delete_all", "DELETE FROM tasks", None))
    }

    fn get(&self, id: TaskId) -> Pin<Box<dyn Future<Output = Result<Option<Task>>> + Send + '_>> {
        Box::pin(self.find(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(""), "%%");
        assert_eq!(like_pattern("milk"), "%milk%");
        assert_eq!(like_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }

    #[test]
    fn every_sort_breaks_ties_by_id() {
        for sort in TaskSort::ALL {
            assert!(order_by(sort).ends_with("id ASC"));
        }
    }
}
