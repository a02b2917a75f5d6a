//! Timer engine implementation.
//!
//! The timer engine is a wall-clock-anchored state machine. It does not use
//! internal threads - the host calls `tick()` with the current [`TickToken`]
//! about once a second, or lets `TimerService` do it.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused
//!            |
//!            v
//!        Completed -> (start_break | skip_to_next | reset) -> Idle
//! ```
//!
//! Remaining time is never decremented. While running the engine keeps the
//! absolute end time, and every query derives `max(0, end - now)` from the
//! injected clock, so missed ticks, suspension and process death cannot
//! introduce drift.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new(store, clock, Box::new(SilentChime), LedgerConfig::default());
//! engine.start();
//! // In a loop:
//! if let Some(token) = engine.tick_token() {
//!     engine.tick(token); // Some(Event::TimerCompleted { .. }) when the session ends
//! }
//! ```

use std::sync::Arc;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::chime::{BackgroundChime, Chime};
use super::session::{ceil_secs, floor_secs, SessionType, TimerSession, TimerStatus};
use super::snapshot::PersistedTimerSnapshot;
use crate::clock::{Clock, Timestamp};
use crate::events::Event;
use crate::stats::{SessionRecord, StatsLedger};
use crate::storage::{LedgerConfig, Preferences, Store, MAX_DURATION_MIN};

/// Host lifecycle signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleEvent {
    Backgrounded,
    Foregrounded,
}

/// Identifies one run of periodic ticking. Any transition that starts or
/// stops ticking invalidates earlier tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickToken(u64);

#[derive(Debug, Default)]
struct Ticker {
    generation: u64,
    active: bool,
}

impl Ticker {
    fn restart(&mut self, backgrounded: bool) {
        self.generation = self.generation.wrapping_add(1);
        self.active = !backgrounded;
    }

    fn stop(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.active = false;
    }
}

/// Everything a front end renders, derived at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerView {
    pub status: TimerStatus,
    pub session_type: SessionType,
    pub remaining_secs: u64,
    pub total_secs: u64,
    pub progress: f64,
    pub label: String,
    pub end_time: Option<Timestamp>,
    pub completed_pomodoros_today: u32,
    pub total_focus_secs_today: u64,
    pub at: Timestamp,
}

/// A session that is not running, in a form a front end can keep between
/// process runs. Running sessions are covered by the persisted snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParkedSession {
    pub status: TimerStatus,
    pub session_type: SessionType,
    pub total_secs: u64,
    pub remaining_ms: i64,
    #[serde(default)]
    pub label: String,
}

/// Core timer engine.
pub struct TimerEngine {
    session: TimerSession,
    store: Arc<Store>,
    prefs: Preferences,
    ledger: StatsLedger,
    clock: Arc<dyn Clock>,
    chime: Box<dyn Chime>,
    ticker: Ticker,
    backgrounded: bool,
    recovery: Option<Event>,
}

impl TimerEngine {
    /// Build the engine and run crash recovery against the store.
    ///
    /// `chime` is moved to its own thread; completion never waits on it.
    ///
    /// Starts `Idle/Focus` with the saved focus duration unless a running
    /// session snapshot is found, in which case that session is either
    /// resumed or, if its end time has passed, finalized right away.
    pub fn new(
        store: Arc<Store>,
        clock: Arc<dyn Clock>,
        chime: Box<dyn Chime>,
        ledger_config: LedgerConfig,
    ) -> Self {
        let prefs = Preferences::new(store.clone());
        let ledger = StatsLedger::new(store.clone(), clock.clone(), ledger_config);
        let session = TimerSession::idle(SessionType::Focus, prefs.focus_minutes());

        let mut engine = Self {
            session,
            store,
            prefs,
            ledger,
            clock,
            chime: Box::new(BackgroundChime::spawn(chime)),
            ticker: Ticker::default(),
            backgrounded: false,
            recovery: None,
        };
        engine.recovery = engine.recover();
        engine
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn status(&self) -> TimerStatus {
        self.session.status
    }

    pub fn session_type(&self) -> SessionType {
        self.session.session_type
    }

    pub fn session(&self) -> &TimerSession {
        &self.session
    }

    pub fn remaining(&self) -> Duration {
        self.session.remaining_at(self.clock.now())
    }

    /// Remaining whole seconds, rounded up.
    pub fn remaining_secs(&self) -> u64 {
        ceil_secs(self.remaining())
    }

    pub fn total_duration(&self) -> Duration {
        self.session.total
    }

    pub fn total_secs(&self) -> u64 {
        floor_secs(self.session.total)
    }

    /// 0.0 .. 1.0 progress within the current session.
    pub fn progress(&self) -> f64 {
        self.session.progress_at(self.clock.now())
    }

    pub fn label(&self) -> &str {
        &self.session.label
    }

    pub fn completed_pomodoros_today(&self) -> u32 {
        self.ledger.completed_today()
    }

    pub fn total_focus_seconds_today(&self) -> u64 {
        self.ledger.today_seconds()
    }

    pub fn stats_for_last_n_days(&self, n: u32) -> std::collections::BTreeMap<String, u64> {
        self.ledger.last_n_days(n)
    }

    pub fn session_history(&self) -> Vec<SessionRecord> {
        self.ledger.history()
    }

    pub fn ledger(&self) -> &StatsLedger {
        &self.ledger
    }

    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    /// The event produced by crash recovery at construction, if any.
    pub fn recovery(&self) -> Option<&Event> {
        self.recovery.as_ref()
    }

    pub fn view(&self) -> TimerView {
        let now = self.clock.now();
        TimerView {
            status: self.session.status,
            session_type: self.session.session_type,
            remaining_secs: ceil_secs(self.session.remaining_at(now)),
            total_secs: floor_secs(self.session.total),
            progress: self.session.progress_at(now),
            label: self.session.label.clone(),
            end_time: self.session.end_time,
            completed_pomodoros_today: self.ledger.completed_today(),
            total_focus_secs_today: self.ledger.today_seconds(),
            at: now,
        }
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot(self.view())
    }

    /// The current session when it is not running.
    pub fn parked(&self) -> Option<ParkedSession> {
        if self.session.status == TimerStatus::Running {
            return None;
        }
        Some(ParkedSession {
            status: self.session.status,
            session_type: self.session.session_type,
            total_secs: floor_secs(self.session.total),
            remaining_ms: self.session.remaining.num_milliseconds().max(0),
            label: self.session.label.clone(),
        })
    }

    /// Put back a session taken with [`TimerEngine::parked`]. Only applies
    /// to a fresh idle engine; a session restored from the running snapshot
    /// takes precedence. Returns whether the session was applied.
    pub fn restore_parked(&mut self, parked: ParkedSession) -> bool {
        if self.session.status != TimerStatus::Idle || self.recovery.is_some() {
            return false;
        }
        if parked.status == TimerStatus::Running
            || !(1..=u64::from(MAX_DURATION_MIN) * 60).contains(&parked.total_secs)
        {
            tracing::warn!(?parked, "ignoring unusable parked session");
            return false;
        }
        let total = Duration::seconds(parked.total_secs as i64);
        let remaining = Duration::milliseconds(parked.remaining_ms).clamp(Duration::zero(), total);
        let remaining = match parked.status {
            TimerStatus::Completed => Duration::zero(),
            _ => remaining,
        };

        self.session = TimerSession {
            status: parked.status,
            session_type: parked.session_type,
            total,
            remaining,
            end_time: None,
            label: parked.label,
        };
        tracing::debug!(status = ?parked.status, "restored parked session");
        true
    }

    /// Block until every queued store write is on disk.
    ///
    /// # Errors
    /// Returns an error if the store's writer thread has stopped.
    pub fn flush(&self) -> crate::error::Result<()> {
        self.store.flush()
    }

    /// Token for the current run of periodic ticking; `None` when the host
    /// should not tick (not running, or backgrounded).
    pub fn tick_token(&self) -> Option<TickToken> {
        (self.session.status == TimerStatus::Running && self.ticker.active)
            .then_some(TickToken(self.ticker.generation))
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn set_focus_duration(&mut self, minutes: u32) -> Option<Event> {
        if self.session.status != TimerStatus::Idle {
            return None;
        }
        if let Err(e) = self.prefs.set_focus_minutes(minutes) {
            tracing::debug!("ignoring focus duration: {e}");
            return None;
        }
        if self.session.session_type == SessionType::Focus {
            self.apply_idle_duration(minutes);
        }
        Some(Event::DurationChanged {
            session_type: SessionType::Focus,
            minutes,
            at: self.clock.now(),
        })
    }

    pub fn set_break_duration(&mut self, minutes: u32) -> Option<Event> {
        if let Err(e) = self.prefs.set_break_minutes(minutes) {
            tracing::debug!("ignoring break duration: {e}");
            return None;
        }
        if self.session.status == TimerStatus::Idle && self.session.session_type == SessionType::Break {
            self.apply_idle_duration(minutes);
        }
        Some(Event::DurationChanged {
            session_type: SessionType::Break,
            minutes,
            at: self.clock.now(),
        })
    }

    pub fn set_label(&mut self, text: &str) -> Option<Event> {
        self.session.label = text.trim().to_string();
        if self.session.status == TimerStatus::Running {
            self.persist_snapshot();
        }
        Some(Event::LabelChanged {
            label: self.session.label.clone(),
            at: self.clock.now(),
        })
    }

    pub fn start(&mut self) -> Option<Event> {
        match self.session.status {
            TimerStatus::Idle | TimerStatus::Paused => {
                let now = self.clock.now();
                let remaining = self.session.remaining_at(now);
                let end_time = now + remaining;
                self.session.end_time = Some(end_time);
                self.session.status = TimerStatus::Running;
                self.persist_snapshot();
                self.ticker.restart(self.backgrounded);
                tracing::debug!(
                    session_type = self.session.session_type.as_str(),
                    remaining_secs = ceil_secs(remaining),
                    "timer started"
                );
                Some(Event::TimerStarted {
                    session_type: self.session.session_type,
                    duration_secs: floor_secs(self.session.total),
                    remaining_secs: ceil_secs(remaining),
                    end_time,
                    at: now,
                })
            }
            TimerStatus::Running | TimerStatus::Completed => None,
        }
    }

    /// Pausing a session whose end time has already passed completes it
    /// instead; the completion event is returned.
    pub fn pause(&mut self) -> Option<Event> {
        if self.session.status != TimerStatus::Running {
            return None;
        }
        if let Some(done) = self.settle() {
            return Some(done);
        }
        let now = self.clock.now();
        let remaining = self.session.remaining_at(now);
        self.session.remaining = remaining;
        self.session.end_time = None;
        self.session.status = TimerStatus::Paused;
        PersistedTimerSnapshot::clear(&self.store);
        self.ticker.stop();
        tracing::debug!(remaining_secs = ceil_secs(remaining), "timer paused");
        Some(Event::TimerPaused {
            remaining_secs: ceil_secs(remaining),
            at: now,
        })
    }

    /// Back to `Idle/Focus`. Elapsed focus time of an unfinished session is
    /// credited; break time never is.
    pub fn reset(&mut self) -> Option<Event> {
        self.settle();
        let now = self.clock.now();
        let credited = match (self.session.status, self.session.session_type) {
            (TimerStatus::Running | TimerStatus::Paused, SessionType::Focus) => {
                floor_secs(self.session.elapsed_at(now))
            }
            _ => 0,
        };
        self.ledger.add_focus_seconds(credited);

        self.session = TimerSession::idle(SessionType::Focus, self.prefs.focus_minutes());
        PersistedTimerSnapshot::clear(&self.store);
        self.ticker.stop();
        tracing::debug!(credited, "timer reset");
        Some(Event::TimerReset {
            credited_focus_secs: credited,
            at: now,
        })
    }

    /// Abandon the current session and move to the other session type, idle.
    pub fn skip_to_next(&mut self) -> Option<Event> {
        self.settle();
        let from = self.session.session_type;
        let to = from.other();
        self.session = TimerSession::idle(to, self.minutes_for(to));
        PersistedTimerSnapshot::clear(&self.store);
        self.ticker.stop();
        tracing::debug!(from = from.as_str(), to = to.as_str(), "skipped");
        Some(Event::TimerSkipped {
            from,
            to,
            at: self.clock.now(),
        })
    }

    /// After a completed focus session: set up the break and start it.
    pub fn start_break(&mut self) -> Option<Event> {
        if self.session.status != TimerStatus::Completed
            || self.session.session_type != SessionType::Focus
        {
            return None;
        }
        self.session = TimerSession::idle(SessionType::Break, self.prefs.break_minutes());
        self.start()
    }

    /// Periodic refresh. A stale token is a no-op.
    pub fn tick(&mut self, token: TickToken) -> Option<Event> {
        if self.tick_token() != Some(token) {
            return None;
        }
        self.sync()
    }

    pub fn handle_lifecycle(&mut self, event: LifecycleEvent) -> Option<Event> {
        match event {
            LifecycleEvent::Backgrounded => {
                self.backgrounded = true;
                if self.session.status == TimerStatus::Running {
                    self.ticker.stop();
                    self.persist_snapshot();
                    tracing::debug!("backgrounded; ticking suspended");
                }
                None
            }
            LifecycleEvent::Foregrounded => {
                self.backgrounded = false;
                let event = self.sync();
                if self.session.status == TimerStatus::Running {
                    self.ticker.restart(false);
                }
                event
            }
        }
    }

    /// Pick up a persisted running session. Safe to call repeatedly: a
    /// finalized snapshot is cleared before any statistics are written, so
    /// completion is credited at most once.
    pub fn recover(&mut self) -> Option<Event> {
        let Some(snapshot) = PersistedTimerSnapshot::load(&self.store) else {
            if PersistedTimerSnapshot::exists(&self.store) {
                PersistedTimerSnapshot::clear(&self.store);
            }
            return None;
        };

        let now = self.clock.now();
        let total = Duration::seconds(snapshot.total_secs as i64);
        let mut end_time = snapshot.end_time;
        if end_time - now > total {
            tracing::warn!("snapshot ends further out than its duration; clamping");
            end_time = now + total;
        }

        self.session = TimerSession {
            status: TimerStatus::Running,
            session_type: snapshot.session_type,
            total,
            remaining: total,
            end_time: Some(end_time),
            label: snapshot.label,
        };

        if end_time <= now {
            tracing::info!("recovered session already ended; finalizing");
            return Some(self.finalize(now, true));
        }

        self.ticker.restart(self.backgrounded);
        let remaining_secs = ceil_secs(end_time - now);
        tracing::info!(remaining_secs, "recovered running session");
        Some(Event::TimerRestored {
            session_type: self.session.session_type,
            remaining_secs,
            at: now,
        })
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Recompute from the end time; finalize if due.
    fn sync(&mut self) -> Option<Event> {
        if self.session.status != TimerStatus::Running {
            return None;
        }
        let now = self.clock.now();
        let remaining = self.session.remaining_at(now);
        if remaining <= Duration::zero() {
            return Some(self.finalize(now, false));
        }
        Some(Event::TimerTicked {
            remaining_secs: ceil_secs(remaining),
            progress: self.session.progress_at(now),
            at: now,
        })
    }

    /// Finalize a running session whose end time has passed.
    fn settle(&mut self) -> Option<Event> {
        if self.session.status == TimerStatus::Running
            && self.session.remaining_at(self.clock.now()) <= Duration::zero()
        {
            return self.sync();
        }
        None
    }

    fn finalize(&mut self, now: Timestamp, recovered: bool) -> Event {
        PersistedTimerSnapshot::clear(&self.store);
        self.ticker.stop();
        self.session.status = TimerStatus::Completed;
        self.session.end_time = None;
        self.session.remaining = Duration::zero();

        let total_secs = floor_secs(self.session.total);
        let minutes = u32::try_from((total_secs + 30) / 60).unwrap_or(u32::MAX);
        match self.session.session_type {
            SessionType::Focus => {
                self.ledger.add_focus_seconds(total_secs);
                self.ledger.increment_completed_today();
                self.ledger
                    .record_session(minutes, SessionType::Focus, Some(self.session.label.as_str()));
            }
            SessionType::Break => {
                self.ledger.record_session(minutes, SessionType::Break, None);
            }
        }

        if self.prefs.sound_enabled() {
            if let Err(e) = self.chime.play() {
                tracing::warn!("{e}");
            }
        }

        tracing::info!(
            session_type = self.session.session_type.as_str(),
            total_secs,
            recovered,
            "session completed"
        );
        Event::TimerCompleted {
            session_type: self.session.session_type,
            duration_secs: total_secs,
            recovered,
            at: now,
        }
    }

    fn persist_snapshot(&self) {
        let Some(end_time) = self.session.end_time else {
            return;
        };
        PersistedTimerSnapshot {
            end_time,
            total_secs: floor_secs(self.session.total),
            session_type: self.session.session_type,
            label: self.session.label.clone(),
        }
        .save(&self.store);
    }

    fn apply_idle_duration(&mut self, minutes: u32) {
        self.session.total = Duration::minutes(i64::from(minutes));
        self.session.remaining = self.session.total;
    }

    fn minutes_for(&self, session_type: SessionType) -> u32 {
        match session_type {
            SessionType::Focus => self.prefs.focus_minutes(),
            SessionType::Break => self.prefs.break_minutes(),
        }
    }
}
