//! Read-only projections of the habit snapshot for rendering.
//!
//! Nothing here mutates or stores anything: cards are recomputed from the
//! current habits and a reference date every time they are asked for.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::habit::{summarize, DayState, Habit, HabitId};

/// Range of days a card shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DisplayWindow {
    Month { year: i32, month: u32 },
    Day { date: NaiveDate },
}

impl DisplayWindow {
    /// The month containing `date`.
    pub fn month_of(date: NaiveDate) -> Self {
        DisplayWindow::Month {
            year: date.year(),
            month: date.month(),
        }
    }

    fn first_day(&self) -> Option<NaiveDate> {
        match *self {
            DisplayWindow::Month { year, month } => NaiveDate::from_ymd_opt(year, month, 1),
            DisplayWindow::Day { date } => Some(date),
        }
    }

    fn last_day(&self) -> Option<NaiveDate> {
        match *self {
            DisplayWindow::Month { year, month } => {
                let next = if month == 12 {
                    NaiveDate::from_ymd_opt(year + 1, 1, 1)
                } else {
                    NaiveDate::from_ymd_opt(year, month + 1, 1)
                };
                next.and_then(|d| d.pred_opt())
            }
            DisplayWindow::Day { date } => Some(date),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub state: DayState,
    pub is_today: bool,
    /// After the reference date; not interactive in the grid.
    pub is_future: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WindowStats {
    pub total_days: u32,
    pub committed_days: u32,
    pub skipped_days: u32,
}

impl WindowStats {
    /// Committed days as a percentage of the days shown, 0.0 - 100.0.
    pub fn commit_rate(&self) -> f64 {
        if self.total_days == 0 {
            return 0.0;
        }
        f64::from(self.committed_days) * 100.0 / f64::from(self.total_days)
    }
}

/// Days of one window, laid out for a Monday-first grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthCalendar {
    pub year: i32,
    pub month: u32,
    /// Empty cells before the first day so it lands in its weekday column.
    pub leading_blanks: u32,
    pub days: Vec<CalendarDay>,
    pub stats: WindowStats,
}

/// Everything needed to render one habit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitCard {
    pub id: HabitId,
    pub title: String,
    pub is_public: bool,
    pub streak: u32,
    pub longest_streak: u32,
    pub total_committed: u32,
    pub today_state: DayState,
    pub calendar: MonthCalendar,
}

/// Build the calendar of `habit` for `window`.
///
/// An invalid month (e.g. 13) yields an empty calendar.
pub fn calendar(habit: &Habit, today: NaiveDate, window: DisplayWindow) -> MonthCalendar {
    let (Some(first), Some(last)) = (window.first_day(), window.last_day()) else {
        let (year, month) = match window {
            DisplayWindow::Month { year, month } => (year, month),
            DisplayWindow::Day { date } => (date.year(), date.month()),
        };
        return MonthCalendar {
            year,
            month,
            leading_blanks: 0,
            days: Vec::new(),
            stats: WindowStats::default(),
        };
    };

    let days: Vec<CalendarDay> = first
        .iter_days()
        .take_while(|date| *date <= last)
        .map(|date| CalendarDay {
            date,
            state: habit.day_state(date),
            is_today: date == today,
            is_future: date > today,
        })
        .collect();

    let mut stats = WindowStats {
        total_days: days.len() as u32,
        ..WindowStats::default()
    };
    for day in &days {
        match day.state {
            DayState::Committed => stats.committed_days += 1,
            DayState::Skipped => stats.skipped_days += 1,
            DayState::Empty => {}
        }
    }

    MonthCalendar {
        year: first.year(),
        month: first.month(),
        leading_blanks: first.weekday().num_days_from_monday(),
        days,
        stats,
    }
}

/// Project one habit.
pub fn habit_card(habit: &Habit, today: NaiveDate, window: DisplayWindow) -> HabitCard {
    let summary = summarize(habit.day_logs(), today);
    HabitCard {
        id: habit.id.clone(),
        title: habit.title.clone(),
        is_public: habit.is_public,
        streak: summary.current,
        longest_streak: summary.longest,
        total_committed: summary.total_committed,
        today_state: habit.day_state(today),
        calendar: calendar(habit, today, window),
    }
}

/// Project every habit, keeping snapshot order.
pub fn cards(habits: &[Habit], today: NaiveDate, window: DisplayWindow) -> Vec<HabitCard> {
    habits
        .iter()
        .map(|habit| habit_card(habit, today, window))
        .collect()
}

/// Like [`cards`], restricted to public habits.
pub fn public_cards(habits: &[Habit], today: NaiveDate, window: DisplayWindow) -> Vec<HabitCard> {
    habits
        .iter()
        .filter(|habit| habit.is_public)
        .map(|habit| habit_card(habit, today, window))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::habit::{parse_date, CommitStatus, DayLog};

    fn d(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn habit(id: &str, is_public: bool, logs: &[(&str, CommitStatus)]) -> Habit {
        Habit::new(HabitId::from_string(id), id, is_public)
            .with_logs(logs.iter().map(|(date, status)| DayLog::new(d(date), *status)))
    }

    #[test]
    fn month_grid_starts_on_monday() {
        let h = habit("a", true, &[]);
        // 2024-01-01 is a Monday, 2024-02-01 a Thursday, 2024-09-01 a Sunday
        let jan = calendar(&h, d("2024-01-15"), DisplayWindow::Month { year: 2024, month: 1 });
        assert_eq!(jan.leading_blanks, 0);
        assert_eq!(jan.days.len(), 31);

        let feb = calendar(&h, d("2024-01-15"), DisplayWindow::Month { year: 2024, month: 2 });
        assert_eq!(feb.leading_blanks, 3);
        assert_eq!(feb.days.len(), 29);

        let sep = calendar(&h, d("2024-01-15"), DisplayWindow::Month { year: 2024, month: 9 });
        assert_eq!(sep.leading_blanks, 6);
    }

    #[test]
    fn december_ends_on_the_31st() {
        let h = habit("a", true, &[]);
        let dec = calendar(&h, d("2024-12-31"), DisplayWindow::Month { year: 2024, month: 12 });
        assert_eq!(dec.days.last().unwrap().date, d("2024-12-31"));
        assert!(dec.days.last().unwrap().is_today);
    }

    #[test]
    fn days_carry_state_and_flags() {
        let h = habit(
            "a",
            true,
            &[
                ("2024-03-04", CommitStatus::Committed),
                ("2024-03-05", CommitStatus::Skipped),
            ],
        );
        let cal = calendar(&h, d("2024-03-05"), DisplayWindow::Month { year: 2024, month: 3 });
        let day = |n: usize| cal.days[n - 1];

        assert_eq!(day(4).state, DayState::Committed);
        assert_eq!(day(5).state, DayState::Skipped);
        assert!(day(5).is_today);
        assert!(!day(5).is_future);
        assert!(day(6).is_future);
        assert_eq!(day(6).state, DayState::Empty);
        assert_eq!(
            cal.stats,
            WindowStats {
                total_days: 31,
                committed_days: 1,
                skipped_days: 1,
            }
        );
    }

    #[test]
    fn invalid_month_is_empty() {
        let h = habit("a", true, &[]);
        let cal = calendar(&h, d("2024-03-05"), DisplayWindow::Month { year: 2024, month: 13 });
        assert!(cal.days.is_empty());
        assert_eq!(cal.stats.commit_rate(), 0.0);
    }

    #[test]
    fn day_window_holds_one_day() {
        let h = habit("a", true, &[("2024-03-05", CommitStatus::Committed)]);
        let cal = calendar(&h, d("2024-03-05"), DisplayWindow::Day { date: d("2024-03-05") });
        assert_eq!(cal.days.len(), 1);
        assert_eq!(cal.days[0].state, DayState::Committed);
        assert_eq!(cal.stats.commit_rate(), 100.0);
    }

    #[test]
    fn card_derives_streak_and_today() {
        let h = habit(
            "a",
            false,
            &[
                ("2024-01-01", CommitStatus::Committed),
                ("2024-01-02", CommitStatus::Committed),
                ("2024-01-03", CommitStatus::Committed),
                ("2024-01-05", CommitStatus::Committed),
            ],
        );
        let card = habit_card(&h, d("2024-01-05"), DisplayWindow::month_of(d("2024-01-05")));
        assert_eq!(card.streak, 1);
        assert_eq!(card.longest_streak, 3);
        assert_eq!(card.total_committed, 4);
        assert_eq!(card.today_state, DayState::Committed);
        assert!(!card.is_public);
    }

    #[test]
    fn public_cards_filter_private_habits() {
        let habits = vec![habit("pub", true, &[]), habit("priv", false, &[])];
        let window = DisplayWindow::month_of(d("2024-01-05"));

        assert_eq!(cards(&habits, d("2024-01-05"), window).len(), 2);
        let public = public_cards(&habits, d("2024-01-05"), window);
        assert_eq!(public.len(), 1);
        assert_eq!(public[0].id, HabitId::from_string("pub"));
    }
}
