//! Remote collaborator boundary.
//!
//! The engine never talks to a backend directly. Everything it needs from
//! the hosted store goes through [`RemoteLogStore`]; adapters translate row
//! presence into [`DayState`](crate::habit::DayState) and backend error codes
//! into [`RemoteError`].

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::RemoteError;
use crate::habit::{CommitStatus, DayLog, Habit, HabitId, Operation};

pub use memory::{InMemoryRemote, RemoteCall};
pub use sqlite::SqliteRemote;

/// Row-level CRUD consumed by the optimistic store.
#[async_trait]
pub trait RemoteLogStore: Send + Sync {
    /// Insert a log row. Fails with `Conflict` if one exists for the date.
    async fn create_log(
        &self,
        habit_id: &HabitId,
        date: NaiveDate,
        status: CommitStatus,
    ) -> Result<DayLog, RemoteError>;

    /// Change the status of an existing log row.
    async fn update_log_status(
        &self,
        habit_id: &HabitId,
        date: NaiveDate,
        status: CommitStatus,
    ) -> Result<(), RemoteError>;

    /// Remove the log row for a date. Removing a missing row succeeds.
    async fn delete_log(&self, habit_id: &HabitId, date: NaiveDate) -> Result<(), RemoteError>;

    /// Full habit with every log, used for reconciliation.
    async fn fetch_habit_with_logs(&self, habit_id: &HabitId) -> Result<Habit, RemoteError>;

    /// Every habit visible to the current user, with logs.
    async fn fetch_habits(&self) -> Result<Vec<Habit>, RemoteError>;

    /// Create a habit and return it as stored.
    async fn create_habit(&self, title: &str, is_public: bool) -> Result<Habit, RemoteError>;

    /// Flip the public/private flag of a habit.
    async fn set_habit_visibility(
        &self,
        habit_id: &HabitId,
        is_public: bool,
    ) -> Result<(), RemoteError>;

    /// Delete a habit together with all of its logs.
    async fn delete_habit(&self, habit_id: &HabitId) -> Result<(), RemoteError>;
}

/// Issue the collaborator call matching a cycle operation.
pub async fn dispatch<R>(
    remote: &R,
    habit_id: &HabitId,
    date: NaiveDate,
    operation: Operation,
) -> Result<(), RemoteError>
where
    R: RemoteLogStore + ?Sized,
{
    match operation {
        Operation::Create(status) => remote.create_log(habit_id, date, status).await.map(|_| ()),
        Operation::SetStatus(status) => remote.update_log_status(habit_id, date, status).await,
        Operation::Delete => remote.delete_log(habit_id, date).await,
    }
}
