use serde::{Deserialize, Serialize};

use crate::clock::Timestamp;
use crate::timer::{SessionType, TimerView};

/// Every state change the engine makes produces an Event.
/// Front ends poll for them or subscribe through `TimerService`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        session_type: SessionType,
        duration_secs: u64,
        remaining_secs: u64,
        end_time: Timestamp,
        at: Timestamp,
    },
    TimerPaused {
        remaining_secs: u64,
        at: Timestamp,
    },
    /// Periodic refresh while running.
    TimerTicked {
        remaining_secs: u64,
        progress: f64,
        at: Timestamp,
    },
    TimerCompleted {
        session_type: SessionType,
        duration_secs: u64,
        /// True when the session ran out while the process was not alive.
        recovered: bool,
        at: Timestamp,
    },
    /// A running session was picked back up from its persisted snapshot.
    TimerRestored {
        session_type: SessionType,
        remaining_secs: u64,
        at: Timestamp,
    },
    TimerReset {
        credited_focus_secs: u64,
        at: Timestamp,
    },
    TimerSkipped {
        from: SessionType,
        to: SessionType,
        at: Timestamp,
    },
    DurationChanged {
        session_type: SessionType,
        minutes: u32,
        at: Timestamp,
    },
    LabelChanged {
        label: String,
        at: Timestamp,
    },
    StateSnapshot(TimerView),
}

impl Event {
    /// Whether this event ends periodic ticking.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Event::TimerTicked { .. })
    }
}
