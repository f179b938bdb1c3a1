//! Optimistic log store.
//!
//! Owns the in-memory habit snapshot and mediates every mutation of it.
//! A commit is applied locally first, then sent to the remote collaborator;
//! if the remote fails, only the affected (habit, date) entry is restored.
//!
//! ## Ordering
//!
//! Operations on one (habit, date) key run one at a time, in call order.
//! A commit arriving while another is in flight on the same key waits for
//! it and cycles from the state it left behind. Different keys never wait
//! on each other.
//!
//! ## Rollback policy
//!
//! Failed remote operations are reverted per key, never by reloading the
//! whole habit. Because a key has at most one operation in flight, the
//! restored value is exactly what the key held before that operation.
//! Full reconciliation with the remote is an explicit call
//! ([`OptimisticLogStore::reconcile`] / [`OptimisticLogStore::load_all`]).

mod keyed;

use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{Local, NaiveDate, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::error::{RemoteError, StoreError};
use crate::events::StoreEvent;
use crate::habit::{
    cycle, CommitStatus, CyclePolicy, DayState, Habit, HabitId, Operation, Transition,
};
use crate::remote::{dispatch, RemoteLogStore};
use keyed::{KeyedLocks, Slot};

const EVENT_CAPACITY: usize = 64;

type LogKey = (HabitId, NaiveDate);
type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

/// Behaviour switches for the store, usually built from
/// [`Config::store_options`](crate::storage::Config::store_options).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    pub policy: CyclePolicy,
    pub allow_future_dates: bool,
    /// Remote calls still pending after this long count as failed.
    pub remote_timeout: Option<Duration>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            policy: CyclePolicy::TriState,
            allow_future_dates: false,
            remote_timeout: Some(Duration::from_millis(5000)),
        }
    }
}

/// How a commit resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommitOutcome {
    /// The remote accepted the operation; local state already matched.
    Confirmed { state: DayState, operation: Operation },
    /// The remote failed; the entry was restored to `state`.
    RolledBack {
        state: DayState,
        operation: Operation,
        error: RemoteError,
    },
}

impl CommitOutcome {
    /// State of the day once the commit resolved.
    pub fn state(&self) -> DayState {
        match self {
            CommitOutcome::Confirmed { state, .. } | CommitOutcome::RolledBack { state, .. } => {
                *state
            }
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, CommitOutcome::Confirmed { .. })
    }
}

/// How a visibility change resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum VisibilityOutcome {
    Confirmed { is_public: bool },
    RolledBack { is_public: bool, error: RemoteError },
}

impl VisibilityOutcome {
    pub fn is_public(&self) -> bool {
        match self {
            VisibilityOutcome::Confirmed { is_public }
            | VisibilityOutcome::RolledBack { is_public, .. } => *is_public,
        }
    }
}

/// Owned habit snapshot with optimistic, per-key sequenced mutations.
pub struct OptimisticLogStore<R: ?Sized> {
    remote: Arc<R>,
    options: StoreOptions,
    habits: RwLock<IndexMap<HabitId, Habit>>,
    day_locks: KeyedLocks<LogKey>,
    habit_locks: KeyedLocks<HabitId>,
    events: broadcast::Sender<StoreEvent>,
    clock: Clock,
}

/// A commit applied locally and not yet settled remotely.
///
/// Dropping it unsettled reverts the entry, so an abandoned commit never
/// leaves unconfirmed state behind.
struct PendingCommit<'a, R: ?Sized> {
    store: &'a OptimisticLogStore<R>,
    key: LogKey,
    previous: DayState,
    transition: Transition,
    guard: Option<OwnedMutexGuard<()>>,
    settled: bool,
}

impl<R: ?Sized> Drop for PendingCommit<'_, R> {
    fn drop(&mut self) {
        if !self.settled {
            self.store.write_day(&self.key.0, self.key.1, self.previous);
        }
        self.guard.take();
        self.store.day_locks.release(&self.key);
    }
}

enum Start<'a, R: ?Sized> {
    Ready(Result<PendingCommit<'a, R>, StoreError>),
    Queued(Slot),
}

// Snapshot access. Locks here are never held across an await.
impl<R: ?Sized> OptimisticLogStore<R> {
    fn read_habits(&self) -> RwLockReadGuard<'_, IndexMap<HabitId, Habit>> {
        self.habits.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_habits(&self) -> RwLockWriteGuard<'_, IndexMap<HabitId, Habit>> {
        self.habits.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_day(&self, habit_id: &HabitId, date: NaiveDate, state: DayState) {
        if let Some(habit) = self.write_habits().get_mut(habit_id) {
            habit.set_day_state(date, state);
        }
    }

    fn swap_visibility(&self, habit_id: &HabitId, is_public: bool) -> Option<bool> {
        self.write_habits()
            .get_mut(habit_id)
            .map(|habit| std::mem::replace(&mut habit.is_public, is_public))
    }

    fn replace_local(&self, habit: Habit) {
        let mut habits = self.write_habits();
        match habits.get_mut(&habit.id) {
            Some(existing) => *existing = habit,
            None => {
                habits.shift_insert(0, habit.id.clone(), habit);
            }
        }
    }

    fn emit(&self, event: StoreEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    /// Copy of one habit as currently displayed.
    pub fn habit(&self, habit_id: &HabitId) -> Option<Habit> {
        self.read_habits().get(habit_id).cloned()
    }

    /// Copy of every habit, in display order (newest first).
    pub fn snapshot(&self) -> Vec<Habit> {
        self.read_habits().values().cloned().collect()
    }

    /// Current local state of one day, `None` if the habit is unknown.
    pub fn day_state(&self, habit_id: &HabitId, date: NaiveDate) -> Option<DayState> {
        self.read_habits()
            .get(habit_id)
            .map(|habit| habit.day_state(date))
    }

    /// Whether a commit on this day is still waiting for the remote.
    pub fn is_pending(&self, habit_id: &HabitId, date: NaiveDate) -> bool {
        self.day_locks.is_busy(&(habit_id.clone(), date))
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// Reference date used for future-date checks.
    pub fn today(&self) -> NaiveDate {
        (self.clock)()
    }

    /// Receive store events (optimistic applies, confirmations, rollbacks).
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }
}

impl<R> OptimisticLogStore<R>
where
    R: RemoteLogStore + ?Sized,
{
    pub fn new(remote: Arc<R>, options: StoreOptions) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            remote,
            options,
            habits: RwLock::new(IndexMap::new()),
            day_locks: KeyedLocks::new(),
            habit_locks: KeyedLocks::new(),
            events,
            clock: Arc::new(|| Local::now().date_naive()),
        }
    }

    /// Replace the source of "today" (local calendar date by default).
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> NaiveDate + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    pub fn remote(&self) -> &Arc<R> {
        &self.remote
    }

    async fn call_remote<T, F>(&self, call: F) -> Result<T, RemoteError>
    where
        F: Future<Output = Result<T, RemoteError>> + Send,
        T: Send,
    {
        match self.options.remote_timeout {
            Some(limit) => tokio::time::timeout(limit, call).await?,
            None => call.await,
        }
    }

    /// Cycle the state of one day and sync it to the remote.
    ///
    /// When no other commit is in flight on the same day, the local change
    /// is made during this call, before the returned future is polled; the
    /// future then performs the remote operation. Otherwise the future first
    /// waits for the earlier commit and cycles from its resolved state.
    ///
    /// Remote failures are not errors: the entry is restored and the
    /// outcome says so. `Err` is only returned for requests that were never
    /// applied (unknown habit, future date).
    pub fn apply_commit(
        &self,
        habit_id: &HabitId,
        date: NaiveDate,
    ) -> impl Future<Output = Result<CommitOutcome, StoreError>> + Send + '_ {
        let key: LogKey = (habit_id.clone(), date);
        let slot = self.day_locks.slot(&key);
        let start = match slot.clone().try_lock_owned() {
            Ok(guard) => {
                drop(slot);
                Start::Ready(self.begin_commit(guard, &key))
            }
            Err(_) => Start::Queued(slot),
        };

        async move {
            let begun = match start {
                Start::Ready(begun) => begun,
                Start::Queued(slot) => {
                    debug!(habit_id = %key.0, date = %key.1, "commit queued behind in-flight operation");
                    let guard = slot.lock_owned().await;
                    self.begin_commit(guard, &key)
                }
            };
            match begun {
                Ok(pending) => Ok(self.finish_commit(pending).await),
                Err(e) => Err(e),
            }
        }
    }

    fn begin_commit(
        &self,
        guard: OwnedMutexGuard<()>,
        key: &LogKey,
    ) -> Result<PendingCommit<'_, R>, StoreError> {
        let (habit_id, date) = (&key.0, key.1);

        let applied = self.validate_commit(habit_id, date).and_then(|()| {
            let mut habits = self.write_habits();
            let habit = habits
                .get_mut(habit_id)
                .ok_or_else(|| StoreError::HabitNotFound(habit_id.clone()))?;
            let previous = habit.day_state(date);
            let transition = cycle(previous, self.options.policy);
            habit.set_day_state(date, transition.next);
            Ok((previous, transition))
        });

        let (previous, transition) = match applied {
            Ok(applied) => applied,
            Err(e) => {
                drop(guard);
                self.day_locks.release(key);
                return Err(e);
            }
        };

        debug!(
            habit_id = %habit_id,
            date = %date,
            from = %previous,
            to = %transition.next,
            operation = transition.operation.name(),
            "optimistic commit applied"
        );
        self.emit(StoreEvent::CommitApplied {
            habit_id: habit_id.clone(),
            date,
            state: transition.next,
            operation: transition.operation,
            at: Utc::now(),
        });

        Ok(PendingCommit {
            store: self,
            key: key.clone(),
            previous,
            transition,
            guard: Some(guard),
            settled: false,
        })
    }

    fn validate_commit(&self, habit_id: &HabitId, date: NaiveDate) -> Result<(), StoreError> {
        if !self.read_habits().contains_key(habit_id) {
            return Err(StoreError::HabitNotFound(habit_id.clone()));
        }
        let today = self.today();
        if !self.options.allow_future_dates && date > today {
            return Err(StoreError::FutureDate { date, today });
        }
        Ok(())
    }

    async fn finish_commit(&self, mut pending: PendingCommit<'_, R>) -> CommitOutcome {
        let (habit_id, date) = pending.key.clone();
        let Transition { next, operation } = pending.transition;

        let result = match self
            .call_remote(dispatch(&*self.remote, &habit_id, date, operation))
            .await
        {
            Err(err) if err.is_conflict() => match operation {
                Operation::Create(status) => {
                    if self.remote_holds(&habit_id, date, status).await {
                        warn!(habit_id = %habit_id, date = %date, error = %err, "duplicate create matches remote row");
                        Ok(())
                    } else {
                        Err(err)
                    }
                }
                _ => Err(err),
            },
            other => other,
        };

        let outcome = match result {
            Ok(()) => CommitOutcome::Confirmed {
                state: next,
                operation,
            },
            Err(err) => {
                self.write_day(&habit_id, date, pending.previous);
                warn!(
                    habit_id = %habit_id,
                    date = %date,
                    operation = operation.name(),
                    restored = %pending.previous,
                    error = %err,
                    "remote commit failed, entry restored"
                );
                self.emit(StoreEvent::CommitRolledBack {
                    habit_id: habit_id.clone(),
                    date,
                    restored: pending.previous,
                    error: err.to_string(),
                    at: Utc::now(),
                });
                CommitOutcome::RolledBack {
                    state: pending.previous,
                    operation,
                    error: err,
                }
            }
        };

        if outcome.is_confirmed() {
            self.emit(StoreEvent::CommitConfirmed {
                habit_id,
                date,
                state: next,
                at: Utc::now(),
            });
        }
        pending.settled = true;
        outcome
    }

    /// Whether the remote row for `date` already carries `status`.
    async fn remote_holds(
        &self,
        habit_id: &HabitId,
        date: NaiveDate,
        status: CommitStatus,
    ) -> bool {
        match self
            .call_remote(self.remote.fetch_habit_with_logs(habit_id))
            .await
        {
            Ok(habit) => habit.logs.get(&date) == Some(&status),
            Err(err) => {
                warn!(habit_id = %habit_id, date = %date, error = %err, "could not read remote row after conflict");
                false
            }
        }
    }

    /// Make a habit public or private, optimistically.
    pub async fn set_visibility(
        &self,
        habit_id: &HabitId,
        is_public: bool,
    ) -> Result<VisibilityOutcome, StoreError> {
        let guard = self.habit_locks.slot(habit_id).lock_owned().await;

        let Some(previous) = self.swap_visibility(habit_id, is_public) else {
            drop(guard);
            self.habit_locks.release(habit_id);
            return Err(StoreError::HabitNotFound(habit_id.clone()));
        };

        let result = self
            .call_remote(self.remote.set_habit_visibility(habit_id, is_public))
            .await;
        let outcome = match result {
            Ok(()) => VisibilityOutcome::Confirmed { is_public },
            Err(err) => {
                self.swap_visibility(habit_id, previous);
                warn!(habit_id = %habit_id, error = %err, "visibility change failed, reverted");
                self.emit(StoreEvent::VisibilityRolledBack {
                    habit_id: habit_id.clone(),
                    restored: previous,
                    error: err.to_string(),
                    at: Utc::now(),
                });
                VisibilityOutcome::RolledBack {
                    is_public: previous,
                    error: err,
                }
            }
        };

        drop(guard);
        self.habit_locks.release(habit_id);
        Ok(outcome)
    }

    /// Create a habit remotely, then show it first in the snapshot.
    pub async fn create_habit(&self, title: &str, is_public: bool) -> Result<Habit, StoreError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(StoreError::EmptyTitle);
        }
        let habit = self
            .call_remote(self.remote.create_habit(title, is_public))
            .await?;
        self.replace_local(habit.clone());
        info!(habit_id = %habit.id, "habit created");
        Ok(habit)
    }

    /// Delete a habit remotely, then drop it and its logs locally.
    pub async fn delete_habit(&self, habit_id: &HabitId) -> Result<(), StoreError> {
        self.call_remote(self.remote.delete_habit(habit_id)).await?;
        self.write_habits().shift_remove(habit_id);
        info!(habit_id = %habit_id, "habit deleted");
        Ok(())
    }

    /// Replace the whole snapshot with the remote listing.
    pub async fn load_all(&self) -> Result<usize, StoreError> {
        let habits = self.call_remote(self.remote.fetch_habits()).await?;
        let count = habits.len();
        *self.write_habits() = habits
            .into_iter()
            .map(|habit| (habit.id.clone(), habit))
            .collect();
        debug!(habits = count, "snapshot loaded");
        self.emit(StoreEvent::SnapshotLoaded {
            habits: count,
            at: Utc::now(),
        });
        Ok(count)
    }

    /// Replace one habit with its remote copy.
    ///
    /// Returns `None` and drops the habit locally if it no longer exists
    /// remotely.
    pub async fn reconcile(&self, habit_id: &HabitId) -> Result<Option<Habit>, StoreError> {
        match self
            .call_remote(self.remote.fetch_habit_with_logs(habit_id))
            .await
        {
            Ok(habit) => {
                self.replace_local(habit.clone());
                info!(habit_id = %habit_id, "habit reconciled");
                self.emit(StoreEvent::HabitReconciled {
                    habit_id: habit_id.clone(),
                    at: Utc::now(),
                });
                Ok(Some(habit))
            }
            Err(RemoteError::NotFound(_)) => {
                self.write_habits().shift_remove(habit_id);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Fetch a habit for a public link without touching the snapshot.
    ///
    /// Private or missing habits both yield `None`.
    pub async fn fetch_public(&self, habit_id: &HabitId) -> Result<Option<Habit>, StoreError> {
        match self
            .call_remote(self.remote.fetch_habit_with_logs(habit_id))
            .await
        {
            Ok(habit) if habit.is_public => Ok(Some(habit)),
            Ok(_) | Err(RemoteError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::habit::{parse_date, DayLog};
    use crate::remote::{InMemoryRemote, RemoteCall};

    const TODAY: &str = "2024-01-10";

    fn d(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    async fn setup(
        options: StoreOptions,
    ) -> (Arc<InMemoryRemote>, OptimisticLogStore<InMemoryRemote>, HabitId) {
        let remote = Arc::new(InMemoryRemote::new());
        let id = HabitId::from_string("h1");
        remote.seed(Habit::new(id.clone(), "Read", true));
        let store = OptimisticLogStore::new(remote.clone(), options).with_clock(|| d(TODAY));
        store.load_all().await.unwrap();
        (remote, store, id)
    }

    fn mutations(remote: &InMemoryRemote) -> Vec<RemoteCall> {
        remote
            .calls()
            .into_iter()
            .filter(|call| !matches!(call, RemoteCall::FetchHabits | RemoteCall::FetchHabit { .. }))
            .collect()
    }

    #[tokio::test]
    async fn commit_is_visible_before_remote_resolves() {
        let (remote, store, id) = setup(StoreOptions::default()).await;
        let date = d(TODAY);
        remote.pause();

        let pending = store.apply_commit(&id, date);
        assert_eq!(store.day_state(&id, date), Some(DayState::Committed));
        assert!(store.is_pending(&id, date));
        assert!(remote.habit(&id).unwrap().logs.is_empty());

        remote.resume();
        let outcome = pending.await.unwrap();
        assert_eq!(
            outcome,
            CommitOutcome::Confirmed {
                state: DayState::Committed,
                operation: Operation::Create(CommitStatus::Committed),
            }
        );
        assert!(!store.is_pending(&id, date));
        assert_eq!(
            remote.habit(&id).unwrap().day_state(date),
            DayState::Committed
        );
    }

    #[tokio::test]
    async fn readers_see_optimistic_state_while_in_flight() {
        let (remote, store, id) = setup(StoreOptions::default()).await;
        let date = d(TODAY);
        remote.pause();

        let (outcome, ()) = tokio::join!(store.apply_commit(&id, date), async {
            tokio::task::yield_now().await;
            assert!(store.is_pending(&id, date));
            assert_eq!(store.day_state(&id, date), Some(DayState::Committed));
            assert!(mutations(&remote).is_empty());
            remote.resume();
        });
        assert!(outcome.unwrap().is_confirmed());
    }

    #[tokio::test]
    async fn failed_create_restores_empty() {
        let (remote, store, id) = setup(StoreOptions::default()).await;
        let mut events = store.subscribe();
        let date = d(TODAY);
        remote.fail_next(RemoteError::Failure("offline".into()));

        let outcome = store.apply_commit(&id, date).await.unwrap();
        assert_eq!(outcome.state(), DayState::Empty);
        assert!(matches!(
            outcome,
            CommitOutcome::RolledBack {
                error: RemoteError::Failure(_),
                ..
            }
        ));
        assert_eq!(store.day_state(&id, date), Some(DayState::Empty));
        assert!(!store.is_pending(&id, date));

        let mut saw_rollback = false;
        while let Ok(event) = events.try_recv() {
            if let StoreEvent::CommitRolledBack { restored, .. } = event {
                assert_eq!(restored, DayState::Empty);
                saw_rollback = true;
            }
        }
        assert!(saw_rollback);
    }

    #[tokio::test]
    async fn failed_status_change_restores_committed() {
        let (remote, store, id) = setup(StoreOptions::default()).await;
        let date = d("2024-01-09");
        store.apply_commit(&id, date).await.unwrap();
        remote.fail_next(RemoteError::Failure("500".into()));

        let outcome = store.apply_commit(&id, date).await.unwrap();
        assert_eq!(outcome.state(), DayState::Committed);
        assert_eq!(store.day_state(&id, date), Some(DayState::Committed));
        assert_eq!(
            remote.habit(&id).unwrap().day_state(date),
            DayState::Committed
        );
    }

    #[tokio::test]
    async fn timeout_counts_as_failure() {
        let remote = Arc::new(InMemoryRemote::new().with_latency(Duration::from_millis(200)));
        let id = HabitId::from_string("slow");
        remote.seed(Habit::new(id.clone(), "Slow", true));
        let options = StoreOptions {
            remote_timeout: Some(Duration::from_millis(20)),
            ..StoreOptions::default()
        };
        let store = OptimisticLogStore::new(remote.clone(), options).with_clock(|| d(TODAY));
        store.replace_local(remote.habit(&id).unwrap());

        let outcome = store.apply_commit(&id, d(TODAY)).await.unwrap();
        assert!(matches!(
            outcome,
            CommitOutcome::RolledBack {
                error: RemoteError::Timeout,
                ..
            }
        ));
        assert_eq!(store.day_state(&id, d(TODAY)), Some(DayState::Empty));
    }

    #[tokio::test]
    async fn rapid_commits_on_one_day_are_sequenced() {
        let (remote, store, id) = setup(StoreOptions::default()).await;
        let date = d(TODAY);
        remote.pause();

        let first = store.apply_commit(&id, date);
        let second = store.apply_commit(&id, date);
        // the second waits for the first before touching local state
        assert_eq!(store.day_state(&id, date), Some(DayState::Committed));

        remote.resume();
        let (a, b) = tokio::join!(first, second);
        assert_eq!(a.unwrap().state(), DayState::Committed);
        assert_eq!(b.unwrap().state(), DayState::Skipped);

        assert_eq!(
            mutations(&remote),
            vec![
                RemoteCall::CreateLog {
                    habit_id: id.clone(),
                    date,
                    status: CommitStatus::Committed,
                },
                RemoteCall::UpdateLogStatus {
                    habit_id: id.clone(),
                    date,
                    status: CommitStatus::Skipped,
                },
            ]
        );
        assert_eq!(store.day_state(&id, date), Some(DayState::Skipped));
        assert_eq!(remote.habit(&id).unwrap().day_state(date), DayState::Skipped);
        assert!(!store.is_pending(&id, date));
    }

    #[tokio::test]
    async fn three_rapid_commits_return_to_empty() {
        let (remote, store, id) = setup(StoreOptions::default()).await;
        let date = d(TODAY);

        let (a, b, c) = tokio::join!(
            store.apply_commit(&id, date),
            store.apply_commit(&id, date),
            store.apply_commit(&id, date),
        );
        assert_eq!(a.unwrap().state(), DayState::Committed);
        assert_eq!(b.unwrap().state(), DayState::Skipped);
        assert_eq!(c.unwrap().state(), DayState::Empty);
        assert_eq!(store.day_state(&id, date), Some(DayState::Empty));
        assert!(remote.habit(&id).unwrap().logs.is_empty());
    }

    #[tokio::test]
    async fn queued_commit_cycles_from_rolled_back_state() {
        let (remote, store, id) = setup(StoreOptions::default()).await;
        let date = d(TODAY);
        remote.fail_next(RemoteError::Failure("flaky".into()));

        let (a, b) = tokio::join!(store.apply_commit(&id, date), store.apply_commit(&id, date));
        assert_eq!(a.unwrap().state(), DayState::Empty);
        // the second commit starts again from Empty, not from the stale Committed
        assert_eq!(b.unwrap().state(), DayState::Committed);
        assert_eq!(
            remote.habit(&id).unwrap().day_state(date),
            DayState::Committed
        );
    }

    #[tokio::test]
    async fn other_days_are_not_blocked() {
        let (remote, store, id) = setup(StoreOptions::default()).await;
        remote.pause();

        let first = store.apply_commit(&id, d("2024-01-09"));
        let second = store.apply_commit(&id, d("2024-01-10"));
        assert_eq!(store.day_state(&id, d("2024-01-09")), Some(DayState::Committed));
        assert_eq!(store.day_state(&id, d("2024-01-10")), Some(DayState::Committed));

        remote.resume();
        let (a, b) = tokio::join!(first, second);
        assert!(a.unwrap().is_confirmed());
        assert!(b.unwrap().is_confirmed());
    }

    #[tokio::test]
    async fn duplicate_create_is_absorbed() {
        let (remote, store, id) = setup(StoreOptions::default()).await;
        let date = d(TODAY);
        // another writer created the row after our snapshot was loaded
        remote.seed(Habit::new(id.clone(), "Read", true).with_logs([DayLog::new(
            date,
            CommitStatus::Committed,
        )]));

        let outcome = store.apply_commit(&id, date).await.unwrap();
        assert!(outcome.is_confirmed());
        assert_eq!(store.day_state(&id, date), Some(DayState::Committed));
    }

    #[tokio::test]
    async fn duplicate_create_with_other_status_rolls_back() {
        let (remote, store, id) = setup(StoreOptions::default()).await;
        let date = d(TODAY);
        remote.seed(Habit::new(id.clone(), "Read", true).with_logs([DayLog::new(
            date,
            CommitStatus::Skipped,
        )]));

        let outcome = store.apply_commit(&id, date).await.unwrap();
        assert!(matches!(
            outcome,
            CommitOutcome::RolledBack {
                state: DayState::Empty,
                error: RemoteError::Conflict(_),
                ..
            }
        ));
        assert_eq!(store.day_state(&id, date), Some(DayState::Empty));
        assert_eq!(remote.habit(&id).unwrap().day_state(date), DayState::Skipped);

        // an explicit reconcile then adopts the remote row
        store.reconcile(&id).await.unwrap();
        assert_eq!(store.day_state(&id, date), Some(DayState::Skipped));
    }

    #[tokio::test]
    async fn duplicate_create_rolls_back_when_remote_unreadable() {
        let (remote, store, id) = setup(StoreOptions::default()).await;
        let date = d(TODAY);
        remote.seed(Habit::new(id.clone(), "Read", true).with_logs([DayLog::new(
            date,
            CommitStatus::Committed,
        )]));
        // the create conflicts, then the follow-up read fails
        remote.fail_next(RemoteError::Conflict("exists".into()));
        remote.fail_next(RemoteError::Failure("offline".into()));

        let outcome = store.apply_commit(&id, date).await.unwrap();
        assert_eq!(outcome.state(), DayState::Empty);
        assert_eq!(store.day_state(&id, date), Some(DayState::Empty));
    }

    #[tokio::test]
    async fn future_dates_are_rejected_without_side_effects() {
        let (remote, store, id) = setup(StoreOptions::default()).await;
        let err = store.apply_commit(&id, d("2024-01-11")).await.unwrap_err();
        assert_eq!(
            err,
            StoreError::FutureDate {
                date: d("2024-01-11"),
                today: d(TODAY),
            }
        );
        assert!(mutations(&remote).is_empty());
        assert!(!store.is_pending(&id, d("2024-01-11")));
    }

    #[tokio::test]
    async fn future_dates_allowed_when_configured() {
        let options = StoreOptions {
            allow_future_dates: true,
            ..StoreOptions::default()
        };
        let (_remote, store, id) = setup(options).await;
        let outcome = store.apply_commit(&id, d("2024-02-01")).await.unwrap();
        assert_eq!(outcome.state(), DayState::Committed);
    }

    #[tokio::test]
    async fn unknown_habit_is_an_error() {
        let (remote, store, _id) = setup(StoreOptions::default()).await;
        let ghost = HabitId::from_string("ghost");
        let err = store.apply_commit(&ghost, d(TODAY)).await.unwrap_err();
        assert_eq!(err, StoreError::HabitNotFound(ghost.clone()));
        assert!(mutations(&remote).is_empty());
        assert!(!store.is_pending(&ghost, d(TODAY)));
    }

    #[tokio::test]
    async fn binary_policy_toggles_back_to_empty() {
        let options = StoreOptions {
            policy: CyclePolicy::Binary,
            ..StoreOptions::default()
        };
        let (remote, store, id) = setup(options).await;
        let date = d(TODAY);

        assert_eq!(
            store.apply_commit(&id, date).await.unwrap().state(),
            DayState::Committed
        );
        let outcome = store.apply_commit(&id, date).await.unwrap();
        assert_eq!(
            outcome,
            CommitOutcome::Confirmed {
                state: DayState::Empty,
                operation: Operation::Delete,
            }
        );
        assert!(remote.habit(&id).unwrap().logs.is_empty());
    }

    #[tokio::test]
    async fn abandoned_commit_is_reverted() {
        let (remote, store, id) = setup(StoreOptions::default()).await;
        let date = d(TODAY);
        remote.pause();

        let pending = store.apply_commit(&id, date);
        assert_eq!(store.day_state(&id, date), Some(DayState::Committed));
        drop(pending);

        assert_eq!(store.day_state(&id, date), Some(DayState::Empty));
        assert!(!store.is_pending(&id, date));
    }

    #[tokio::test]
    async fn visibility_rolls_back_on_failure() {
        let (remote, store, id) = setup(StoreOptions::default()).await;
        remote.fail_next(RemoteError::Failure("denied".into()));

        let outcome = store.set_visibility(&id, false).await.unwrap();
        assert!(outcome.is_public());
        assert!(matches!(outcome, VisibilityOutcome::RolledBack { .. }));
        assert!(store.habit(&id).unwrap().is_public);

        let outcome = store.set_visibility(&id, false).await.unwrap();
        assert_eq!(outcome, VisibilityOutcome::Confirmed { is_public: false });
        assert!(!store.habit(&id).unwrap().is_public);
        assert!(!remote.habit(&id).unwrap().is_public);
    }

    #[tokio::test]
    async fn create_and_delete_habits() {
        let (remote, store, id) = setup(StoreOptions::default()).await;

        assert_eq!(
            store.create_habit("   ", true).await.unwrap_err(),
            StoreError::EmptyTitle
        );

        let created = store.create_habit("  Walk  ", false).await.unwrap();
        assert_eq!(created.title, "Walk");
        let order: Vec<_> = store.snapshot().into_iter().map(|h| h.id).collect();
        assert_eq!(order, vec![created.id.clone(), id.clone()]);

        store.apply_commit(&created.id, d(TODAY)).await.unwrap();
        store.delete_habit(&created.id).await.unwrap();
        assert!(store.habit(&created.id).is_none());
        assert!(remote.habit(&created.id).is_none());
    }

    #[tokio::test]
    async fn failed_create_habit_leaves_snapshot_alone() {
        let (remote, store, _id) = setup(StoreOptions::default()).await;
        remote.fail_next(RemoteError::Failure("offline".into()));
        let err = store.create_habit("Swim", true).await.unwrap_err();
        assert!(matches!(err, StoreError::Remote(RemoteError::Failure(_))));
        assert_eq!(store.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn reconcile_replaces_local_copy() {
        let (remote, store, id) = setup(StoreOptions::default()).await;
        remote.seed(Habit::new(id.clone(), "Read more", false).with_logs([DayLog::new(
            d("2024-01-08"),
            CommitStatus::Skipped,
        )]));

        let habit = store.reconcile(&id).await.unwrap().unwrap();
        assert_eq!(habit.title, "Read more");
        assert_eq!(store.habit(&id).unwrap(), habit);

        remote.delete_habit(&id).await.unwrap();
        assert_eq!(store.reconcile(&id).await.unwrap(), None);
        assert!(store.habit(&id).is_none());
    }

    #[tokio::test]
    async fn fetch_public_hides_private_habits() {
        let (remote, store, id) = setup(StoreOptions::default()).await;
        assert!(store.fetch_public(&id).await.unwrap().is_some());

        remote.set_habit_visibility(&id, false).await.unwrap();
        assert!(store.fetch_public(&id).await.unwrap().is_none());
        assert!(store
            .fetch_public(&HabitId::from_string("nope"))
            .await
            .unwrap()
            .is_none());
    }
}
