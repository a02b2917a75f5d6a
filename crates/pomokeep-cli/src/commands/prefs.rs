use clap::builder::BoolishValueParser;
use clap::Subcommand;
use pomokeep_core::storage::{MAX_DURATION_MIN, MIN_DURATION_MIN};
use pomokeep_core::{Config, SilentChime, ThemeMode, TimerStatus};

use super::{print_json, print_outcome, CliResult, Session};

#[derive(Subcommand)]
pub enum PrefsAction {
    /// Print all preferences
    Show,
    /// Set the focus duration in minutes (only while idle)
    Focus { minutes: u32 },
    /// Set the break duration in minutes
    Break { minutes: u32 },
    /// Set the theme: system, light or dark
    Theme { mode: ThemeMode },
    /// Turn the completion chime on or off
    Sound {
        #[arg(action = clap::ArgAction::Set, value_parser = BoolishValueParser::new())]
        enabled: bool,
    },
}

pub fn run(action: PrefsAction, config: &Config) -> CliResult {
    let mut session = Session::open(config, Box::new(SilentChime))?;
    let engine = &mut session.engine;

    match action {
        PrefsAction::Show => print_json(&engine.preferences().values())?,
        PrefsAction::Focus { minutes } => {
            if engine.status() != TimerStatus::Idle {
                return Err("focus duration can only change while the timer is idle".into());
            }
            let event = engine
                .set_focus_duration(minutes)
                .ok_or_else(|| out_of_range(minutes))?;
            print_outcome(engine, Some(event))?;
        }
        PrefsAction::Break { minutes } => {
            let event = engine
                .set_break_duration(minutes)
                .ok_or_else(|| out_of_range(minutes))?;
            print_outcome(engine, Some(event))?;
        }
        PrefsAction::Theme { mode } => {
            engine.preferences().set_theme(mode);
            print_json(&engine.preferences().values())?;
        }
        PrefsAction::Sound { enabled } => {
            engine.preferences().set_sound_enabled(enabled);
            print_json(&engine.preferences().values())?;
        }
    }

    session.close()
}

fn out_of_range(minutes: u32) -> String {
    format!("{minutes} is outside {MIN_DURATION_MIN}..={MAX_DURATION_MIN} minutes")
}
