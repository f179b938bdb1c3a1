//! Optimistic store backed by the SQLite collaborator.

use std::sync::Arc;

use chrono::NaiveDate;
use seeme_core::{
    parse_date, Config, CyclePolicy, DayState, OptimisticLogStore, SqliteRemote, StoreError,
};
use tempfile::TempDir;

fn d(s: &str) -> NaiveDate {
    parse_date(s).unwrap()
}

fn open(dir: &TempDir, config: &Config) -> OptimisticLogStore<SqliteRemote> {
    let remote = SqliteRemote::open_at(&dir.path().join("seeme.db")).unwrap();
    OptimisticLogStore::new(Arc::new(remote), config.store_options())
        .with_clock(|| d("2024-05-10"))
}

#[tokio::test]
async fn commits_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let config = Config::default();

    let store = open(&dir, &config);
    let habit = store.create_habit("Stretch", true).await.unwrap();
    store.apply_commit(&habit.id, d("2024-05-09")).await.unwrap();
    store.apply_commit(&habit.id, d("2024-05-10")).await.unwrap();
    store.apply_commit(&habit.id, d("2024-05-10")).await.unwrap();
    drop(store);

    let store = open(&dir, &config);
    assert_eq!(store.load_all().await.unwrap(), 1);
    assert_eq!(
        store.day_state(&habit.id, d("2024-05-09")),
        Some(DayState::Committed)
    );
    assert_eq!(
        store.day_state(&habit.id, d("2024-05-10")),
        Some(DayState::Skipped)
    );
}

#[tokio::test]
async fn binary_policy_deletes_rows() {
    let dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.commit.policy = CyclePolicy::Binary;

    let store = open(&dir, &config);
    let habit = store.create_habit("Floss", false).await.unwrap();
    store.apply_commit(&habit.id, d("2024-05-10")).await.unwrap();
    let outcome = store.apply_commit(&habit.id, d("2024-05-10")).await.unwrap();
    assert_eq!(outcome.state(), DayState::Empty);

    let fresh = store.reconcile(&habit.id).await.unwrap().unwrap();
    assert!(fresh.logs.is_empty());
}

#[tokio::test]
async fn deleted_habit_is_gone_after_reconcile() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir, &Config::default());
    let habit = store.create_habit("Journal", true).await.unwrap();
    store.apply_commit(&habit.id, d("2024-05-01")).await.unwrap();

    store.delete_habit(&habit.id).await.unwrap();
    assert!(store.habit(&habit.id).is_none());
    assert_eq!(store.reconcile(&habit.id).await.unwrap(), None);
    assert_eq!(
        store.apply_commit(&habit.id, d("2024-05-01")).await.unwrap_err(),
        StoreError::HabitNotFound(habit.id.clone())
    );
}
