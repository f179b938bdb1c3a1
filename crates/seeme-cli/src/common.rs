//! Helpers shared by the commands.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use seeme_core::view::CalendarDay;
use seeme_core::{
    parse_date, Config, DayState, DisplayWindow, HabitCard, OptimisticLogStore, SqliteRemote,
};
use tracing::debug;

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

pub type Store = OptimisticLogStore<SqliteRemote>;

/// Open the local database and load every habit into a fresh store.
pub async fn open_store() -> Result<Store, Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let remote = SqliteRemote::open()?;
    let store = OptimisticLogStore::new(Arc::new(remote), config.store_options());
    let habits = store.load_all().await?;
    debug!(habits, policy = ?store.options().policy, "store opened");
    Ok(store)
}

/// clap value parser for `YYYY-MM`.
pub fn parse_month(s: &str) -> Result<DisplayWindow, String> {
    let first = parse_date(&format!("{s}-01"))
        .ok_or_else(|| format!("expected YYYY-MM, got '{s}'"))?;
    Ok(DisplayWindow::Month {
        year: first.year(),
        month: first.month(),
    })
}

/// clap value parser for `YYYY-MM-DD`.
pub fn parse_day(s: &str) -> Result<NaiveDate, String> {
    parse_date(s).ok_or_else(|| format!("expected YYYY-MM-DD, got '{s}'"))
}

fn mark(day: &CalendarDay) -> char {
    match day.state {
        DayState::Committed => 'x',
        DayState::Skipped => '~',
        DayState::Empty if day.is_future => ' ',
        DayState::Empty => '.',
    }
}

/// Plain-text rendering of a card: header, streak line and month grid.
pub fn print_card(card: &HabitCard) {
    let visibility = if card.is_public { "public" } else { "private" };
    println!("{}  [{visibility}]  {}", card.title, card.id);
    println!(
        "streak {} (longest {}, {} days total)  today: {}",
        card.streak, card.longest_streak, card.total_committed, card.today_state
    );

    let cal = &card.calendar;
    println!("{:04}-{:02}", cal.year, cal.month);
    println!(" Mo  Tu  We  Th  Fr  Sa  Su");
    let mut line = "    ".repeat(cal.leading_blanks as usize);
    let mut column = cal.leading_blanks;
    for day in &cal.days {
        let today = if day.is_today { '>' } else { ' ' };
        line.push_str(&format!("{today}{:>2}{}", day.date.day(), mark(day)));
        column += 1;
        if column % 7 == 0 {
            println!("{}", line.trim_end());
            line.clear();
        }
    }
    if !line.is_empty() {
        println!("{}", line.trim_end());
    }
}
