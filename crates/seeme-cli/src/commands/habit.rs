//! Habit management commands for CLI.

use clap::{Subcommand, ValueEnum};
use seeme_core::view::{cards, habit_card};
use seeme_core::{DisplayWindow, HabitId, VisibilityOutcome};

use crate::common::{open_store, parse_month, print_card, CliResult};

#[derive(Clone, Copy, ValueEnum)]
pub enum Visibility {
    Public,
    Private,
}

#[derive(Subcommand)]
pub enum HabitAction {
    /// Create a new habit
    Add {
        /// Habit title
        title: String,
        /// Hide the habit from its public link
        #[arg(long)]
        private: bool,
    },
    /// List habits with streaks, newest first
    List {
        /// Month to show (YYYY-MM, default: current month)
        #[arg(long, value_parser = parse_month)]
        month: Option<DisplayWindow>,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Show one habit
    Show {
        /// Habit ID
        id: String,
        /// Month to show (YYYY-MM, default: current month)
        #[arg(long, value_parser = parse_month)]
        month: Option<DisplayWindow>,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Make a habit public or private
    Visibility {
        /// Habit ID
        id: String,
        visibility: Visibility,
    },
    /// Delete a habit and all its logs
    Remove {
        /// Habit ID
        id: String,
    },
}

pub async fn run(action: HabitAction) -> CliResult {
    let store = open_store().await?;
    let today = store.today();

    match action {
        HabitAction::Add { title, private } => {
            let habit = store.create_habit(&title, !private).await?;
            println!("Habit created: {}", habit.id);
        }
        HabitAction::List { month, json } => {
            let window = month.unwrap_or_else(|| DisplayWindow::month_of(today));
            let cards = cards(&store.snapshot(), today, window);
            if json {
                println!("{}", serde_json::to_string_pretty(&cards)?);
            } else if cards.is_empty() {
                println!("No habits yet. Create one with `seeme habit add <title>`.");
            } else {
                for card in &cards {
                    print_card(card);
                    println!();
                }
            }
        }
        HabitAction::Show { id, month, json } => {
            let id = HabitId::from_string(&id);
            let habit = store
                .habit(&id)
                .ok_or_else(|| format!("Habit not found: {id}"))?;
            let window = month.unwrap_or_else(|| DisplayWindow::month_of(today));
            let card = habit_card(&habit, today, window);
            if json {
                println!("{}", serde_json::to_string_pretty(&card)?);
            } else {
                print_card(&card);
            }
        }
        HabitAction::Visibility { id, visibility } => {
            let id = HabitId::from_string(&id);
            let is_public = matches!(visibility, Visibility::Public);
            match store.set_visibility(&id, is_public).await? {
                VisibilityOutcome::Confirmed { is_public } => {
                    println!("{}", if is_public { "public" } else { "private" });
                }
                VisibilityOutcome::RolledBack { error, .. } => {
                    return Err(format!("visibility not changed: {error}").into());
                }
            }
        }
        HabitAction::Remove { id } => {
            let id = HabitId::from_string(&id);
            if store.habit(&id).is_none() {
                return Err(format!("Habit not found: {id}").into());
            }
            store.delete_habit(&id).await?;
            println!("Habit deleted: {id}");
        }
    }
    Ok(())
}
