use std::sync::Arc;

use pomokeep_core::{Chime, Config, Event, ParkedSession, Store, SystemClock, TimerEngine};
use serde::Serialize;

pub mod config;
pub mod prefs;
pub mod stats;
pub mod timer;

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Where a paused, idle or completed session waits for the next invocation.
const PARKED_KEY: &str = "cli_parked_session";

/// The engine for one CLI invocation.
pub struct Session {
    pub engine: TimerEngine,
    store: Arc<Store>,
}

impl Session {
    /// Open the store and build the engine. Building runs crash recovery,
    /// so a session that ran out while nothing was watching is credited
    /// here. Otherwise the session the previous invocation left behind is
    /// put back.
    pub fn open(
        config: &Config,
        chime: Box<dyn Chime>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let store = Arc::new(Store::open()?);
        let mut engine =
            TimerEngine::new(store.clone(), Arc::new(SystemClock), chime, config.ledger);
        if let Some(event) = engine.recovery() {
            tracing::info!(?event, "recovered timer state");
        } else if let Some(parked) = store.get_json::<ParkedSession>(PARKED_KEY) {
            engine.restore_parked(parked);
        }
        Ok(Self { engine, store })
    }

    /// Keep the session for the next invocation and flush the store.
    pub fn close(self) -> CliResult {
        let Self { engine, store } = self;
        save_parked(&store, engine.parked())?;
        engine.flush()?;
        Ok(())
    }

    pub fn into_parts(self) -> (TimerEngine, Arc<Store>) {
        (self.engine, self.store)
    }
}

/// A running session is covered by the engine's own snapshot, so only a
/// stopped one is kept here.
pub fn save_parked(store: &Store, parked: Option<ParkedSession>) -> CliResult {
    match parked {
        Some(parked) => store.set_json(PARKED_KEY, &parked)?,
        None => store.remove(PARKED_KEY),
    }
    Ok(())
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print what a command produced, or the current state when it was a no-op.
pub fn print_outcome(engine: &TimerEngine, event: Option<Event>) -> CliResult {
    match event {
        Some(event) => print_json(&event),
        None => print_json(&engine.snapshot()),
    }
}
