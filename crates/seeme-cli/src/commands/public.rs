use clap::Args;
use seeme_core::view::habit_card;
use seeme_core::{DisplayWindow, HabitId};

use crate::common::{open_store, parse_month, print_card, CliResult};

#[derive(Args)]
pub struct PublicArgs {
    /// Habit ID
    pub id: String,
    /// Month to show (YYYY-MM, default: current month)
    #[arg(long, value_parser = parse_month)]
    pub month: Option<DisplayWindow>,
    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: PublicArgs) -> CliResult {
    let store = open_store().await?;
    let today = store.today();
    let id = HabitId::from_string(&args.id);

    let habit = store
        .fetch_public(&id)
        .await?
        .ok_or_else(|| format!("Habit not found or private: {id}"))?;
    let window = args.month.unwrap_or_else(|| DisplayWindow::month_of(today));
    let card = habit_card(&habit, today, window);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&card)?);
    } else {
        print_card(&card);
    }
    Ok(())
}
