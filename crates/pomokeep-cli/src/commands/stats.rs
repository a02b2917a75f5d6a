use clap::Subcommand;
use pomokeep_core::{Config, SilentChime};
use serde_json::json;

use super::{print_json, CliResult, Session};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Today's focus time and completed pomodoros
    Today,
    /// Focus seconds per day for the last N days, oldest first
    Days {
        #[arg(default_value = "7")]
        n: u32,
    },
    /// Recent sessions, newest first
    History {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Today, this week and history size in one object
    Summary,
    /// Delete all statistics and history
    Clear,
}

pub fn run(action: StatsAction, config: &Config) -> CliResult {
    let session = Session::open(config, Box::new(SilentChime))?;
    let ledger = session.engine.ledger();

    match action {
        StatsAction::Today => {
            print_json(&json!({
                "focus_secs": ledger.today_seconds(),
                "completed_pomodoros": ledger.completed_today(),
            }))?;
        }
        StatsAction::Days { n } => print_json(&ledger.last_n_days(n))?,
        StatsAction::History { limit } => {
            let mut history = ledger.history();
            if let Some(limit) = limit {
                history.truncate(limit);
            }
            print_json(&history)?;
        }
        StatsAction::Summary => print_json(&ledger.summary())?,
        StatsAction::Clear => {
            ledger.clear();
            println!("statistics cleared");
        }
    }

    session.close()
}
