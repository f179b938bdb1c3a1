//! Store events broadcast to subscribers.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::habit::{DayState, HabitId, Operation};

/// Every state change in the store produces an Event.
/// UI layers subscribe to them for feedback such as toasts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StoreEvent {
    /// Local snapshot changed ahead of the remote call.
    CommitApplied {
        habit_id: HabitId,
        date: NaiveDate,
        state: DayState,
        operation: Operation,
        at: DateTime<Utc>,
    },
    /// Remote accepted the operation.
    CommitConfirmed {
        habit_id: HabitId,
        date: NaiveDate,
        state: DayState,
        at: DateTime<Utc>,
    },
    /// Remote rejected the operation; the entry was restored.
    CommitRolledBack {
        habit_id: HabitId,
        date: NaiveDate,
        restored: DayState,
        error: String,
        at: DateTime<Utc>,
    },
    /// Visibility change failed remotely and was reverted.
    VisibilityRolledBack {
        habit_id: HabitId,
        restored: bool,
        error: String,
        at: DateTime<Utc>,
    },
    /// Habit replaced by the remote copy.
    HabitReconciled {
        habit_id: HabitId,
        at: DateTime<Utc>,
    },
    /// Whole snapshot replaced by the remote listing.
    SnapshotLoaded {
        habits: usize,
        at: DateTime<Utc>,
    },
}
