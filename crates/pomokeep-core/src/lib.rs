//! # Pomokeep Core Library
//!
//! This library provides the core logic for the Pomokeep Pomodoro timer.
//! Every operation is reachable from the standalone CLI; any other front end
//! is a thin layer over the same engine.
//!
//! ## Architecture
//!
//! - **Timer Engine**: A wall-clock-anchored state machine. Remaining time
//!   is derived from an absolute end time, and the caller drives `tick()`
//!   for progress updates (or lets [`TimerService`] do it)
//! - **Statistics**: Per-day focus seconds, the completed-today counter and
//!   a bounded session history
//! - **Storage**: SQLite-backed key-value store with an in-memory read cache,
//!   plus TOML configuration for tunables
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: Core timer state machine
//! - [`StatsLedger`]: Durable statistics
//! - [`Store`]: Key-value persistence
//! - [`Config`]: Application configuration management

pub mod clock;
pub mod error;
pub mod events;
pub mod stats;
pub mod storage;
pub mod timer;

pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use events::Event;
pub use stats::{DailyStats, SessionRecord, StatsLedger, StatsSummary};
pub use storage::{Config, PreferenceValues, Preferences, Store, ThemeMode};
pub use timer::{
    Chime, ChimeError, LifecycleEvent, ParkedSession, SessionType, SilentChime, TickToken,
    TimerEngine, TimerService, TimerStatus, TimerView,
};
