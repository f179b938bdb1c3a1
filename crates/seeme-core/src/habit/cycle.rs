//! Day-state transition function.
//!
//! ## Tri-state policy
//!
//! ```text
//! Empty --Create(committed)--> Committed --SetStatus(skipped)--> Skipped --Delete--> Empty
//! ```
//!
//! ## Binary policy
//!
//! ```text
//! Empty --Create(committed)--> Committed --Delete--> Empty
//! Skipped --Delete--> Empty
//! ```
//!
//! `cycle` is pure: no I/O and no clock, so the whole table is covered by
//! unit tests.

use serde::{Deserialize, Serialize};

use super::{CommitStatus, DayState};

/// How repeated taps move through day states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CyclePolicy {
    /// Empty -> Committed -> Skipped -> Empty
    #[default]
    TriState,
    /// Empty <-> Committed ("single tap = done")
    Binary,
}

/// Storage operation matching a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "status", rename_all = "snake_case")]
pub enum Operation {
    /// Insert a new row with the given status
    Create(CommitStatus),
    /// Change the status of the existing row
    SetStatus(CommitStatus),
    /// Remove the row, leaving the day empty
    Delete,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Create(_) => "create",
            Operation::SetStatus(_) => "set_status",
            Operation::Delete => "delete",
        }
    }
}

/// Result of one cycle step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub next: DayState,
    pub operation: Operation,
}

/// Compute the next state and the storage operation that produces it.
pub fn cycle(current: DayState, policy: CyclePolicy) -> Transition {
    let (next, operation) = match (policy, current) {
        (_, DayState::Empty) => (
            DayState::Committed,
            Operation::Create(CommitStatus::Committed),
        ),
        (CyclePolicy::TriState, DayState::Committed) => (
            DayState::Skipped,
            Operation::SetStatus(CommitStatus::Skipped),
        ),
        (CyclePolicy::Binary, DayState::Committed) => (DayState::Empty, Operation::Delete),
        (_, DayState::Skipped) => (DayState::Empty, Operation::Delete),
    };
    Transition { next, operation }
}
