//! Streak derivation from day logs.
//!
//! A streak is never stored. It is recomputed from the committed dates of a
//! habit and a reference date ("today"). The chain survives while today is
//! still open, so a streak ending yesterday counts, but one full missed day
//! resets it to zero.

use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::{CommitStatus, DayLog};

/// Aggregate streak numbers for one habit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StreakSummary {
    /// Consecutive committed days ending at or right before the reference date
    pub current: u32,
    /// Longest run of consecutive committed days up to the reference date
    pub longest: u32,
    /// Number of committed days up to the reference date
    pub total_committed: u32,
    /// Most recent committed date up to the reference date
    pub last_committed: Option<NaiveDate>,
}

fn committed_dates<I>(logs: I, reference: NaiveDate) -> BTreeSet<NaiveDate>
where
    I: IntoIterator<Item = DayLog>,
{
    logs.into_iter()
        .filter(|log| log.status == CommitStatus::Committed && log.date <= reference)
        .map(|log| log.date)
        .collect()
}

fn current_from(dates: &BTreeSet<NaiveDate>, reference: NaiveDate) -> u32 {
    let Some(&latest) = dates.iter().next_back() else {
        return 0;
    };
    if latest != reference && latest != reference - Duration::days(1) {
        return 0;
    }

    let mut streak = 0;
    let mut day = latest;
    while dates.contains(&day) {
        streak += 1;
        match day.pred_opt() {
            Some(prev) => day = prev,
            None => break,
        }
    }
    streak
}

/// Current consecutive-commitment count as of `reference`.
///
/// Only the set of committed dates matters, so the input order is
/// irrelevant and duplicates are harmless.
pub fn compute_streak<I>(logs: I, reference: NaiveDate) -> u32
where
    I: IntoIterator<Item = DayLog>,
{
    current_from(&committed_dates(logs, reference), reference)
}

/// Current streak plus longest run, total and last committed date.
pub fn summarize<I>(logs: I, reference: NaiveDate) -> StreakSummary
where
    I: IntoIterator<Item = DayLog>,
{
    let dates = committed_dates(logs, reference);

    let mut longest = 0u32;
    let mut run = 0u32;
    let mut prev: Option<NaiveDate> = None;
    for &date in &dates {
        run = match prev {
            Some(p) if (date - p).num_days() == 1 => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        prev = Some(date);
    }

    StreakSummary {
        current: current_from(&dates, reference),
        longest,
        total_committed: dates.len() as u32,
        last_committed: dates.iter().next_back().copied(),
    }
}
