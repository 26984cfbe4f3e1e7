//! `tasklist` command-line front end.
//!
//! Every command drives the same controllers a graphical front end would,
//! against the SQLite database named by `TASKLIST_DATABASE_URL`.

use anyhow::{anyhow, bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::sync::Arc;
use std::time::Duration;
use tasklist::config::DEFAULT_LOG_LEVEL;
use tasklist::edit::format_timestamp;
use tasklist::list::TodoListAction;
use tasklist::{
    AddTodoController, AddTodoSideEffect, Config, EditTodoController, EditTodoSideEffect,
    TodoListController, TodoListSideEffect,
};
use tasklist_core::environment::SystemClock;
use tasklist_core::settings::{Language, SettingsStore, TaskSort};
use tasklist_core::task::{Task, TaskId};
use tasklist_core::todo_store::TodoStore;
use tasklist_runtime::EffectHandle;
use tasklist_sqlite::SqliteDatabase;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How long a command waits for the store
const EFFECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(name = "tasklist", version, about = "A small to-do list")]
struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show tasks using the stored sort order and hide-completed setting
    List {
        /// Only tasks whose name contains this text (case-insensitive)
        #[arg(long, short)]
        search: Option<String>,
    },
    /// Add a task
    Add {
        /// Task name
        name: String,
        /// Flag the task as important
        #[arg(long)]
        important: bool,
    },
    /// Change a task's name or importance
    Edit {
        /// Task id
        id: i64,
        /// New name
        #[arg(long)]
        name: Option<String>,
        /// New importance
        #[arg(long, action = ArgAction::Set)]
        important: Option<bool>,
    },
    /// Mark a task completed
    Done {
        /// Task id
        id: i64,
    },
    /// Mark a task not completed
    Undone {
        /// Task id
        id: i64,
    },
    /// Delete a task
    Delete {
        /// Task id
        id: i64,
        /// Restore it again right away (the restored task gets a new id)
        #[arg(long)]
        undo: bool,
    },
    /// Delete every completed task
    ClearCompleted,
    /// Delete every task
    ClearAll,
    /// Store the list sort order
    Sort {
        /// New order
        #[arg(value_enum)]
        order: SortArg,
    },
    /// Store whether completed tasks are hidden
    HideCompleted {
        /// `true` or `false`
        #[arg(action = ArgAction::Set)]
        hide: bool,
    },
    /// Store the UI language (`def` for the system default)
    Language {
        /// Locale code
        code: String,
    },
    /// Show stored preferences
    Prefs,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SortArg {
    NameAsc,
    NameDesc,
    DateAsc,
    DateDesc,
}

impl From<SortArg> for TaskSort {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::NameAsc => Self::NameAscending,
            SortArg::NameDesc => Self::NameDescending,
            SortArg::DateAsc => Self::DateAscending,
            SortArg::DateDesc => Self::DateDescending,
        }
    }
}

/// Stores and settings shared by every command
struct App {
    config: Config,
    todos: Arc<dyn TodoStore>,
    settings: Arc<dyn SettingsStore>,
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env();
    config.validate().context("Invalid configuration")?;
    tracing::debug!(database = %config.database.url, "Configuration loaded");

    let db = SqliteDatabase::connect(&config.database.url, config.database.max_connections)
        .await
        .with_context(|| format!("Failed to open database {}", config.database.url))?;

    let app = App {
        todos: Arc::new(db.todo_store()),
        settings: Arc::new(db.settings_store()),
        json: cli.json,
        config,
    };

    let result = app.run(cli.command).await;
    db.close().await;
    result
}

async fn settle(mut handle: EffectHandle) -> Result<()> {
    handle
        .wait_with_timeout(EFFECT_TIMEOUT)
        .await
        .context("Timed out waiting for the database")
}

impl App {
    async fn run(&self, command: Command) -> Result<()> {
        match command {
            Command::List { search } => self.list(search).await,
            Command::Add { name, important } => self.add(name, important).await,
            Command::Edit {
                id,
                name,
                important,
            } => self.edit(id, name, important).await,
            Command::Done { id } => self.set_completed(id, true).await,
            Command::Undone { id } => self.set_completed(id, false).await,
            Command::Delete { id, undo } => self.delete(id, undo).await,
            Command::ClearCompleted => self.clear(false).await,
            Command::ClearAll => self.clear(true).await,
            Command::Sort { order } => self.sort(order.into()).await,
            Command::HideCompleted { hide } => self.hide_completed(hide).await,
            Command::Language { code } => {
                let language = Language::from_code(&code);
                self.settings.update_language(language.clone()).await?;
                println!("Language set to {language}");
                Ok(())
            },
            Command::Prefs => self.prefs().await,
        }
    }

    fn list_controller(&self) -> TodoListController {
        TodoListController::new(
            Arc::clone(&self.todos),
            Arc::clone(&self.settings),
            self.config.list_options(),
        )
    }

    async fn find(&self, id: i64) -> Result<Task> {
        self.todos
            .get(TaskId::new(id))
            .await?
            .ok_or_else(|| anyhow!("No task with id {id}"))
    }

    fn print_tasks(&self, tasks: &[Task]) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(tasks)?);
            return Ok(());
        }
        if tasks.is_empty() {
            println!("No tasks");
        }
        for task in tasks {
            println!(
                "{:>4}  [{}] {} {}  ({})",
                task.id.get(),
                if task.completed { "x" } else { " " },
                if task.important { "!" } else { " " },
                task.name,
                format_timestamp(task.created_at, &self.config.timestamp_format),
            );
        }
        Ok(())
    }

    async fn list(&self, search: Option<String>) -> Result<()> {
        let list = self.list_controller();
        if let Some(search) = search {
            list.query_changed(search).await?;
        }
        let state = list.activate_and_wait(EFFECT_TIMEOUT).await?;
        list.close().await?;

        if let Some(error) = state.last_error {
            bail!("Could not load tasks: {error}");
        }
        if !self.json {
            println!(
                "Sorted {}, completed tasks {}",
                state.sort,
                if state.hide_completed { "hidden" } else { "shown" }
            );
        }
        self.print_tasks(&state.todos)
    }

    async fn add(&self, name: String, important: bool) -> Result<()> {
        let add = AddTodoController::new(Arc::clone(&self.todos), Arc::new(SystemClock));
        add.name_changed(name).await?;
        add.important_changed(important).await?;

        match add.save_and_wait(EFFECT_TIMEOUT).await? {
            AddTodoSideEffect::TodoAdded { id } => {
                println!("Added task {id}");
                Ok(())
            },
            AddTodoSideEffect::InvalidInput(error) => bail!(error),
            AddTodoSideEffect::StorageFailed { message } => bail!("Could not add task: {message}"),
        }
    }

    async fn edit(&self, id: i64, name: Option<String>, important: Option<bool>) -> Result<()> {
        let task = self.find(id).await?;
        let edit = EditTodoController::new(Arc::clone(&self.todos), task, &self.config.timestamp_format);
        if let Some(name) = name {
            edit.name_changed(name).await?;
        }
        if let Some(important) = important {
            edit.important_changed(important).await?;
        }

        match edit.save_and_wait(EFFECT_TIMEOUT).await? {
            EditTodoSideEffect::TodoUpdated { task } => self.print_tasks(&[task]),
            EditTodoSideEffect::InvalidInput(error) => bail!(error),
            EditTodoSideEffect::StorageFailed { message } => bail!("Could not update task: {message}"),
        }
    }

    async fn set_completed(&self, id: i64, completed: bool) -> Result<()> {
        let task = self.find(id).await?;
        let list = self.list_controller();
        settle(list.task_checked(task, completed).await?).await?;

        let state = list.state().await;
        list.close().await?;
        if let Some(error) = state.last_error {
            bail!("Could not update task: {error}");
        }
        println!("Task {id} marked {}", if completed { "completed" } else { "not completed" });
        Ok(())
    }

    async fn delete(&self, id: i64, undo: bool) -> Result<()> {
        let task = self.find(id).await?;
        let list = self.list_controller();
        list.activate_and_wait(EFFECT_TIMEOUT).await?;
        settle(list.delete_task(task).await?).await?;

        match list.next_side_effect(EFFECT_TIMEOUT).await {
            Some(TodoListSideEffect::TaskDeleted { task, .. }) => {
                println!("Deleted task {} ({})", task.id, task.name);
            },
            Some(TodoListSideEffect::StorageFailed { message }) => bail!("Could not delete task: {message}"),
            other => bail!("Unexpected outcome of delete: {other:?}"),
        }

        if undo {
            let outcome = list
                .send_and_wait_for(
                    TodoListAction::UndoDelete,
                    |a| {
                        matches!(
                            a,
                            TodoListAction::TaskRestored { .. } | TodoListAction::StorageFailed { .. }
                        )
                    },
                    EFFECT_TIMEOUT,
                )
                .await?;
            match outcome {
                TodoListAction::TaskRestored { id } => println!("Restored as task {id}"),
                other => bail!("Could not restore task: {other:?}"),
            }
        }

        list.close().await?;
        Ok(())
    }

    async fn clear(&self, everything: bool) -> Result<()> {
        let list = self.list_controller();
        if everything {
            list.delete_all_dialog_shown().await?;
        } else {
            list.delete_completed_dialog_shown().await?;
        }

        let confirm = match list.next_side_effect(EFFECT_TIMEOUT).await {
            Some(TodoListSideEffect::ConfirmDeleteAll) => list.delete_all_confirmed().await?,
            Some(TodoListSideEffect::ConfirmDeleteCompleted) => list.delete_completed_confirmed().await?,
            other => bail!("Unexpected confirmation request: {other:?}"),
        };
        settle(confirm).await?;

        let state = list.state().await;
        list.close().await?;
        if let Some(error) = state.last_error {
            bail!("Could not delete tasks: {error}");
        }
        println!("{}", if everything { "Deleted all tasks" } else { "Deleted completed tasks" });
        Ok(())
    }

    async fn sort(&self, sort: TaskSort) -> Result<()> {
        let list = self.list_controller();
        settle(list.sort_selected(sort).await?).await?;

        let state = list.state().await;
        list.close().await?;
        if let Some(error) = state.last_error {
            bail!("Could not save sort order: {error}");
        }
        println!("Sort order set to {sort}");
        Ok(())
    }

    async fn hide_completed(&self, hide: bool) -> Result<()> {
        let list = self.list_controller();
        let state = list.activate_and_wait(EFFECT_TIMEOUT).await?;
        if state.hide_completed != hide {
            settle(list.hide_completed_toggled().await?).await?;
        }

        let state = list.state().await;
        list.close().await?;
        if let Some(error) = state.last_error {
            bail!("Could not save setting: {error}");
        }
        println!("Completed tasks {}", if hide { "hidden" } else { "shown" });
        Ok(())
    }

    async fn prefs(&self) -> Result<()> {
        let preferences = self.settings.current().await?;
        if self.json {
            println!("{}", serde_json::to_string_pretty(&preferences)?);
        } else {
            println!("sort:           {}", preferences.sort);
            println!("hide completed: {}", preferences.hide_completed);
            println!("language:       {}", preferences.language);
        }
        Ok(())
    }
}
