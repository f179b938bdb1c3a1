//! In-process collaborator.
//!
//! Backs demos and tests. Failures can be scripted with
//! [`InMemoryRemote::fail_next`], and [`InMemoryRemote::pause`] holds every
//! call at the door until [`InMemoryRemote::resume`], which lets callers
//! observe the store while an operation is in flight.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use super::RemoteLogStore;
use crate::error::RemoteError;
use crate::habit::{CommitStatus, DayLog, Habit, HabitId};

/// One call that reached the in-memory backend, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum RemoteCall {
    CreateLog {
        habit_id: HabitId,
        date: NaiveDate,
        status: CommitStatus,
    },
    UpdateLogStatus {
        habit_id: HabitId,
        date: NaiveDate,
        status: CommitStatus,
    },
    DeleteLog {
        habit_id: HabitId,
        date: NaiveDate,
    },
    FetchHabit {
        habit_id: HabitId,
    },
    FetchHabits,
    CreateHabit {
        title: String,
    },
    SetVisibility {
        habit_id: HabitId,
        is_public: bool,
    },
    DeleteHabit {
        habit_id: HabitId,
    },
}

#[derive(Default)]
struct State {
    habits: HashMap<HabitId, Habit>,
    order: Vec<HabitId>,
    failures: VecDeque<RemoteError>,
    calls: Vec<RemoteCall>,
}

/// Collaborator keeping its rows in memory.
pub struct InMemoryRemote {
    state: Mutex<State>,
    gate: watch::Sender<bool>,
    latency: Option<Duration>,
}

impl InMemoryRemote {
    pub fn new() -> Self {
        let (gate, _) = watch::channel(false);
        Self {
            state: Mutex::new(State::default()),
            gate,
            latency: None,
        }
    }

    /// Delay every call by `latency` before it is applied.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Insert a habit as if it already existed remotely.
    pub fn seed(&self, habit: Habit) {
        let mut state = self.lock();
        if !state.habits.contains_key(&habit.id) {
            state.order.push(habit.id.clone());
        }
        state.habits.insert(habit.id.clone(), habit);
    }

    /// Make the next call fail with `error`. Queued failures are consumed in order.
    pub fn fail_next(&self, error: RemoteError) {
        self.lock().failures.push_back(error);
    }

    /// Hold every subsequent call until [`resume`](Self::resume).
    pub fn pause(&self) {
        self.gate.send_replace(true);
    }

    pub fn resume(&self) {
        self.gate.send_replace(false);
    }

    /// Current remote copy of a habit.
    pub fn habit(&self, habit_id: &HabitId) -> Option<Habit> {
        self.lock().habits.get(habit_id).cloned()
    }

    /// Calls that were applied, in order.
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn enter(&self, call: RemoteCall) -> Result<MutexGuard<'_, State>, RemoteError> {
        let mut gate = self.gate.subscribe();
        loop {
            let paused = *gate.borrow_and_update();
            if !paused {
                break;
            }
            gate.changed()
                .await
                .map_err(|e| RemoteError::Failure(e.to_string()))?;
        }
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.lock();
        state.calls.push(call);
        match state.failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(state),
        }
    }
}

impl Default for InMemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

fn missing(habit_id: &HabitId) -> RemoteError {
    RemoteError::NotFound(format!("habit {habit_id}"))
}

#[async_trait]
impl RemoteLogStore for InMemoryRemote {
    async fn create_log(
        &self,
        habit_id: &HabitId,
        date: NaiveDate,
        status: CommitStatus,
    ) -> Result<DayLog, RemoteError> {
        let mut state = self
            .enter(RemoteCall::CreateLog {
                habit_id: habit_id.clone(),
                date,
                status,
            })
            .await?;
        let habit = state.habits.get_mut(habit_id).ok_or_else(|| missing(habit_id))?;
        if habit.logs.contains_key(&date) {
            return Err(RemoteError::Conflict(format!(
                "log for {habit_id} on {date} already exists"
            )));
        }
        habit.logs.insert(date, status);
        Ok(DayLog::new(date, status))
    }

    async fn update_log_status(
        &self,
        habit_id: &HabitId,
        date: NaiveDate,
        status: CommitStatus,
    ) -> Result<(), RemoteError> {
        let mut state = self
            .enter(RemoteCall::UpdateLogStatus {
                habit_id: habit_id.clone(),
                date,
                status,
            })
            .await?;
        let habit = state.habits.get_mut(habit_id).ok_or_else(|| missing(habit_id))?;
        match habit.logs.get_mut(&date) {
            Some(existing) => {
                *existing = status;
                Ok(())
            }
            None => Err(RemoteError::NotFound(format!("log for {habit_id} on {date}"))),
        }
    }

    async fn delete_log(&self, habit_id: &HabitId, date: NaiveDate) -> Result<(), RemoteError> {
        let mut state = self
            .enter(RemoteCall::DeleteLog {
                habit_id: habit_id.clone(),
                date,
            })
            .await?;
        if let Some(habit) = state.habits.get_mut(habit_id) {
            habit.logs.remove(&date);
        }
        Ok(())
    }

    async fn fetch_habit_with_logs(&self, habit_id: &HabitId) -> Result<Habit, RemoteError> {
        let state = self
            .enter(RemoteCall::FetchHabit {
                habit_id: habit_id.clone(),
            })
            .await?;
        state.habits.get(habit_id).cloned().ok_or_else(|| missing(habit_id))
    }

    async fn fetch_habits(&self) -> Result<Vec<Habit>, RemoteError> {
        let state = self.enter(RemoteCall::FetchHabits).await?;
        // newest first, like the dashboard query
        Ok(state
            .order
            .iter()
            .rev()
            .filter_map(|id| state.habits.get(id).cloned())
            .collect())
    }

    async fn create_habit(&self, title: &str, is_public: bool) -> Result<Habit, RemoteError> {
        let mut state = self
            .enter(RemoteCall::CreateHabit {
                title: title.to_string(),
            })
            .await?;
        let habit = Habit::new(HabitId::new(), title, is_public);
        state.order.push(habit.id.clone());
        state.habits.insert(habit.id.clone(), habit.clone());
        Ok(habit)
    }

    async fn set_habit_visibility(
        &self,
        habit_id: &HabitId,
        is_public: bool,
    ) -> Result<(), RemoteError> {
        let mut state = self
            .enter(RemoteCall::SetVisibility {
                habit_id: habit_id.clone(),
                is_public,
            })
            .await?;
        let habit = state.habits.get_mut(habit_id).ok_or_else(|| missing(habit_id))?;
        habit.is_public = is_public;
        Ok(())
    }

    async fn delete_habit(&self, habit_id: &HabitId) -> Result<(), RemoteError> {
        let mut state = self
            .enter(RemoteCall::DeleteHabit {
                habit_id: habit_id.clone(),
            })
            .await?;
        state.habits.remove(habit_id);
        state.order.retain(|id| id != habit_id);
        Ok(())
    }
}
