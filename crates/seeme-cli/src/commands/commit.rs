use chrono::NaiveDate;
use clap::Args;
use seeme_core::{CommitOutcome, HabitId};

use crate::common::{open_store, parse_day, CliResult};

#[derive(Args)]
pub struct CommitArgs {
    /// Habit ID
    pub id: String,
    /// Day to cycle (YYYY-MM-DD, default: today)
    #[arg(long, value_parser = parse_day)]
    pub date: Option<NaiveDate>,
}

pub async fn run(args: CommitArgs) -> CliResult {
    let store = open_store().await?;
    let id = HabitId::from_string(&args.id);
    let date = args.date.unwrap_or_else(|| store.today());

    match store.apply_commit(&id, date).await? {
        CommitOutcome::Confirmed { state, .. } => println!("{date} {state}"),
        CommitOutcome::RolledBack { state, error, .. } => {
            eprintln!("warning: could not save, kept previous state ({error})");
            println!("{date} {state}");
        }
    }
    Ok(())
}
