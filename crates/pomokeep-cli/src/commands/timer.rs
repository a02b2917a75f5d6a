use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use clap::Subcommand;
use pomokeep_core::{
    Chime, ChimeError, Config, Event, LifecycleEvent, Store, TimerEngine, TimerService,
    TimerStatus,
};
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{print_json, print_outcome, save_parked, CliResult, Session};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Print current timer state as JSON
    Status,
    /// Start or resume the current session
    Start,
    /// Pause the running session
    Pause,
    /// Reset to an idle focus session
    Reset,
    /// Abandon the current session and switch to the other type
    Skip,
    /// Start the break after a completed focus session
    StartBreak,
    /// Tag the current session
    Label {
        /// Free text; empty clears the label
        #[arg(default_value = "")]
        text: String,
    },
    /// Stay attached and print events as they happen
    Run {
        /// Start the session right away
        #[arg(long)]
        start: bool,
    },
}

/// Rings the terminal bell.
struct TerminalBell;

impl Chime for TerminalBell {
    fn play(&self) -> Result<(), ChimeError> {
        let mut err = std::io::stderr();
        err.write_all(b"\x07")
            .and_then(|()| err.flush())
            .map_err(|e| ChimeError(e.to_string()))
    }
}

pub fn run(action: TimerAction, config: &Config) -> CliResult {
    let mut session = Session::open(config, Box::new(TerminalBell))?;

    let event = match action {
        TimerAction::Run { start } => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            let (engine, store) = session.into_parts();
            return runtime.block_on(attach(engine, store, config, start));
        }
        TimerAction::Status => {
            // Catches a session that ended since the last invocation.
            let refreshed = session
                .engine
                .tick_token()
                .and_then(|token| session.engine.tick(token));
            if let Some(done @ Event::TimerCompleted { .. }) = refreshed {
                print_json(&done)?;
            }
            None
        }
        TimerAction::Start => session.engine.start(),
        TimerAction::Pause => session.engine.pause(),
        TimerAction::Reset => session.engine.reset(),
        TimerAction::Skip => session.engine.skip_to_next(),
        TimerAction::StartBreak => session.engine.start_break(),
        TimerAction::Label { text } => session.engine.set_label(&text),
    };
    print_outcome(&session.engine, event)?;
    session.close()
}

const RUN_HELP: &str = "commands: s=start p=pause r=reset n=skip b=break l <text>=label q=quit";

async fn attach(
    engine: TimerEngine,
    store: Arc<Store>,
    config: &Config,
    start: bool,
) -> CliResult {
    let period = Duration::from_secs(config.timer.tick_interval_secs);
    let service = TimerService::new(engine, period).await;
    let mut events = service.subscribe();

    if start {
        service.command(TimerEngine::start).await;
    }
    print_json(&service.query(TimerEngine::snapshot).await)?;
    eprintln!("{RUN_HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            received = events.recv() => match received {
                Ok(event) => print_line(&event)?,
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    tracing::debug!(skipped = n, "event output lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let line = line.trim();
                let (cmd, rest) = line.split_once(' ').unwrap_or((line, ""));
                let event = match cmd {
                    "s" | "start" => service.command(TimerEngine::start).await,
                    "p" | "pause" => service.command(TimerEngine::pause).await,
                    "r" | "reset" => service.command(TimerEngine::reset).await,
                    "n" | "skip" => service.command(TimerEngine::skip_to_next).await,
                    "b" | "break" => service.command(TimerEngine::start_break).await,
                    "l" | "label" => service.command(|e| e.set_label(rest)).await,
                    "bg" => service.lifecycle(LifecycleEvent::Backgrounded).await,
                    "fg" => service.lifecycle(LifecycleEvent::Foregrounded).await,
                    "q" | "quit" => break,
                    "" => None,
                    _ => {
                        eprintln!("{RUN_HELP}");
                        continue;
                    }
                };
                if event.is_none() {
                    print_line(&service.query(TimerEngine::snapshot).await)?;
                }
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    service.shutdown().await;
    let status = service.view().await.status;
    if status == TimerStatus::Running {
        eprintln!("session still running; it will be picked up next time");
    }
    save_parked(&store, service.query(TimerEngine::parked).await)?;
    service.query(|e| e.flush()).await?;
    Ok(())
}

fn print_line(event: &Event) -> CliResult {
    println!("{}", serde_json::to_string(event)?);
    Ok(())
}
