//! Integration tests for long-lived cancellable streams
//!
//! Models a live query: a stream driven by a change counter, reopened under
//! the same id whenever its parameter changes. Results from a replaced
//! stream must never overwrite the newer one.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tasklist_core::{
    effect::{Effect, EffectId},
    reducer::Reducer,
    smallvec, SmallVec,
};
use tasklist_runtime::Store;
use tokio::sync::watch;

const QUERY: EffectId = EffectId::new("query");

#[derive(Clone, Debug, PartialEq)]
enum QueryAction {
    Open { prefix: String },
    Close,
    Results { generation: u64, rows: Vec<String> },
}

#[derive(Clone, Debug, Default)]
struct QueryState {
    generation: u64,
    rows: Vec<String>,
    emissions: usize,
}

#[derive(Clone)]
struct QueryEnv {
    rows: Arc<std::sync::Mutex<Vec<String>>>,
    changes: Arc<watch::Sender<u64>>,
}

impl QueryEnv {
    fn new(rows: &[&str]) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            rows: Arc::new(std::sync::Mutex::new(
                rows.iter().map(ToString::to_string).collect(),
            )),
            changes: Arc::new(changes),
        }
    }

    fn push(&self, row: &str) {
        self.rows.lock().unwrap().push(row.to_string());
        self.changes.send_modify(|n| *n += 1);
    }
}

#[derive(Clone)]
struct QueryReducer;

impl Reducer for QueryReducer {
    type State = QueryState;
    type Action = QueryAction;
    type Environment = QueryEnv;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            QueryAction::Open { prefix } => {
                state.generation += 1;
                let generation = state.generation;
                let rows = Arc::clone(&env.rows);
                let changes = env.changes.subscribe();

                let snapshots = futures::stream::unfold(
                    (changes, true),
                    move |(mut changes, first)| {
                        let rows = Arc::clone(&rows);
                        let prefix = prefix.clone();
                        async move {
                            if !first && changes.changed().await.is_err() {
                                return None;
                            }
                            let matching: Vec<String> = rows
                                .lock()
                                .unwrap()
                                .iter()
                                .filter(|r| r.starts_with(&prefix))
                                .cloned()
                                .collect();
                            Some((matching, (changes, false)))
                        }
                    },
                )
                .map(move |rows| QueryAction::Results { generation, rows });

                smallvec![Effect::Stream(Box::pin(snapshots)).cancellable(QUERY)]
            },
            QueryAction::Close => smallvec![Effect::Cancel(QUERY)],
            QueryAction::Results { generation, rows } => {
                if generation == state.generation {
                    state.rows = rows;
                    state.emissions += 1;
                }
                smallvec![Effect::None]
            },
        }
    }
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

#[tokio::test]
async fn emits_initial_snapshot_then_on_change() {
    let env = QueryEnv::new(&["apple", "banana"]);
    let store = Store::new(QueryState::default(), QueryReducer, env.clone());

    store
        .send(QueryAction::Open {
            prefix: String::new(),
        })
        .await
        .unwrap();
    settle().await;
    assert_eq!(store.state(|s| s.rows.len()).await, 2);

    env.push("cherry");
    settle().await;
    assert_eq!(store.state(|s| s.rows.len()).await, 3);
    assert_eq!(store.state(|s| s.emissions).await, 2);
}

#[tokio::test]
async fn reopening_replaces_previous_stream() {
    let env = QueryEnv::new(&["apple", "avocado", "banana"]);
    let store = Store::new(QueryState::default(), QueryReducer, env.clone());

    store
        .send(QueryAction::Open {
            prefix: "a".to_string(),
        })
        .await
        .unwrap();
    store
        .send(QueryAction::Open {
            prefix: "b".to_string(),
        })
        .await
        .unwrap();
    settle().await;

    env.push("apricot");
    settle().await;

    let rows = store.state(|s| s.rows.clone()).await;
    assert_eq!(rows, vec!["banana".to_string()]);
    assert!(store.is_running(QUERY));
}

#[tokio::test]
async fn close_stops_emissions() {
    let env = QueryEnv::new(&["apple"]);
    let store = Store::new(QueryState::default(), QueryReducer, env.clone());

    store
        .send(QueryAction::Open {
            prefix: String::new(),
        })
        .await
        .unwrap();
    settle().await;
    store.send(QueryAction::Close).await.unwrap();
    settle().await;
    let emissions = store.state(|s| s.emissions).await;

    env.push("banana");
    settle().await;

    assert_eq!(store.state(|s| s.emissions).await, emissions);
    assert_eq!(store.state(|s| s.rows.len()).await, 1);
    assert!(!store.is_running(QUERY));
}

#[tokio::test]
async fn shutdown_ends_live_stream() {
    let env = QueryEnv::new(&["apple"]);
    let store = Store::new(QueryState::default(), QueryReducer, env);

    store
        .send(QueryAction::Open {
            prefix: String::new(),
        })
        .await
        .unwrap();
    settle().await;

    store.shutdown(Duration::from_secs(1)).await.unwrap();
    assert!(!store.is_running(QUERY));
}
