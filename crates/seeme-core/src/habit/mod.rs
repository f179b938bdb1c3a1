//! Habit data model.
//!
//! A habit owns at most one [`DayLog`] per calendar date. A day without a
//! log is `Empty`; that state is synthesized and never stored.

pub mod cycle;
pub mod streak;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;

pub use cycle::{cycle, CyclePolicy, Operation, Transition};
pub use streak::{compute_streak, summarize, StreakSummary};

/// Textual date format used by every adapter (`YYYY-MM-DD`).
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Opaque habit identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HabitId(String);

impl HabitId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: &str) -> Self {
        Self(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for HabitId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HabitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status of a stored log row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitStatus {
    Committed,
    Skipped,
}

impl CommitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitStatus::Committed => "committed",
            CommitStatus::Skipped => "skipped",
        }
    }
}

impl FromStr for CommitStatus {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "committed" => Ok(CommitStatus::Committed),
            "skipped" => Ok(CommitStatus::Skipped),
            other => Err(EngineError::InvalidState(other.to_string())),
        }
    }
}

/// The three externally observable states of one day of one habit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayState {
    #[default]
    Empty,
    Committed,
    Skipped,
}

impl DayState {
    /// The stored status backing this state, `None` for `Empty`.
    pub fn status(&self) -> Option<CommitStatus> {
        match self {
            DayState::Empty => None,
            DayState::Committed => Some(CommitStatus::Committed),
            DayState::Skipped => Some(CommitStatus::Skipped),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DayState::Empty => "empty",
            DayState::Committed => "committed",
            DayState::Skipped => "skipped",
        }
    }
}

impl From<Option<CommitStatus>> for DayState {
    fn from(status: Option<CommitStatus>) -> Self {
        match status {
            None => DayState::Empty,
            Some(CommitStatus::Committed) => DayState::Committed,
            Some(CommitStatus::Skipped) => DayState::Skipped,
        }
    }
}

impl From<CommitStatus> for DayState {
    fn from(status: CommitStatus) -> Self {
        DayState::from(Some(status))
    }
}

impl FromStr for DayState {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "empty" => Ok(DayState::Empty),
            "committed" => Ok(DayState::Committed),
            "skipped" => Ok(DayState::Skipped),
            other => Err(EngineError::InvalidState(other.to_string())),
        }
    }
}

impl fmt::Display for DayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored record that a habit was explicitly marked on a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayLog {
    pub date: NaiveDate,
    pub status: CommitStatus,
}

impl DayLog {
    pub fn new(date: NaiveDate, status: CommitStatus) -> Self {
        Self { date, status }
    }
}

/// A user-defined recurring activity and its day logs.
///
/// Logs are keyed by date, so the one-log-per-day invariant holds by
/// construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Habit {
    pub id: HabitId,
    pub title: String,
    pub is_public: bool,
    #[serde(default)]
    pub logs: BTreeMap<NaiveDate, CommitStatus>,
}

impl Habit {
    pub fn new(id: HabitId, title: impl Into<String>, is_public: bool) -> Self {
        Self {
            id,
            title: title.into(),
            is_public,
            logs: BTreeMap::new(),
        }
    }

    /// Builder-style helper used when rebuilding a habit from rows.
    pub fn with_logs(mut self, logs: impl IntoIterator<Item = DayLog>) -> Self {
        for log in logs {
            self.logs.insert(log.date, log.status);
        }
        self
    }

    pub fn day_state(&self, date: NaiveDate) -> DayState {
        DayState::from(self.logs.get(&date).copied())
    }

    /// Set the entry for `date` so that it reads back as `state`.
    ///
    /// `Empty` removes the entry.
    pub fn set_day_state(&mut self, date: NaiveDate, state: DayState) {
        match state.status() {
            Some(status) => {
                self.logs.insert(date, status);
            }
            None => {
                self.logs.remove(&date);
            }
        }
    }

    pub fn day_logs(&self) -> impl Iterator<Item = DayLog> + '_ {
        self.logs
            .iter()
            .map(|(date, status)| DayLog::new(*date, *status))
    }
}

/// Parse a `YYYY-MM-DD` string.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).ok()
}
