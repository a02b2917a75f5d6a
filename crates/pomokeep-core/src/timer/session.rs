use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::clock::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerStatus {
    Idle,
    Running,
    Paused,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionType {
    Focus,
    Break,
}

impl SessionType {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionType::Focus => "focus",
            SessionType::Break => "break",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "focus" => Some(SessionType::Focus),
            "break" => Some(SessionType::Break),
            _ => None,
        }
    }

    pub fn other(self) -> Self {
        match self {
            SessionType::Focus => SessionType::Break,
            SessionType::Break => SessionType::Focus,
        }
    }
}

/// The live session the engine owns.
///
/// `end_time` is `Some` exactly when `status` is `Running`; `remaining` is
/// then stale and [`TimerSession::remaining_at`] derives the real value.
#[derive(Debug, Clone, PartialEq)]
pub struct TimerSession {
    pub status: TimerStatus,
    pub session_type: SessionType,
    pub total: Duration,
    pub(crate) remaining: Duration,
    pub end_time: Option<Timestamp>,
    pub label: String,
}

impl TimerSession {
    pub fn idle(session_type: SessionType, minutes: u32) -> Self {
        let total = Duration::minutes(i64::from(minutes.max(1)));
        Self {
            status: TimerStatus::Idle,
            session_type,
            total,
            remaining: total,
            end_time: None,
            label: String::new(),
        }
    }

    /// Remaining time at `now`, never negative.
    pub fn remaining_at(&self, now: Timestamp) -> Duration {
        match (self.status, self.end_time) {
            (TimerStatus::Running, Some(end)) => (end - now).max(Duration::zero()),
            _ => self.remaining.max(Duration::zero()),
        }
    }

    /// Elapsed part of the session at `now`.
    pub fn elapsed_at(&self, now: Timestamp) -> Duration {
        (self.total - self.remaining_at(now)).max(Duration::zero())
    }

    /// Fraction of the session done at `now`, in `0.0..=1.0`.
    pub fn progress_at(&self, now: Timestamp) -> f64 {
        let total_ms = self.total.num_milliseconds();
        if total_ms <= 0 {
            return 0.0;
        }
        let done = self.elapsed_at(now).num_milliseconds() as f64 / total_ms as f64;
        done.clamp(0.0, 1.0)
    }
}

/// Whole seconds left, rounded up so a fresh 25:00 session reads 1500 and
/// the display only reaches 0 at completion.
pub fn ceil_secs(d: Duration) -> u64 {
    let ms = d.num_milliseconds().max(0);
    ((ms + 999) / 1000) as u64
}

/// Whole seconds, rounded down.
pub fn floor_secs(d: Duration) -> u64 {
    d.num_seconds().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};

    #[test]
    fn idle_session_has_full_remaining() {
        let s = TimerSession::idle(SessionType::Focus, 25);
        let now = ManualClock::at_date(2024, 1, 1).now();
        assert_eq!(ceil_secs(s.remaining_at(now)), 1500);
        assert_eq!(s.progress_at(now), 0.0);
    }

    #[test]
    fn running_remaining_is_clamped_at_zero() {
        let clock = ManualClock::at_date(2024, 1, 1);
        let mut s = TimerSession::idle(SessionType::Break, 5);
        s.status = TimerStatus::Running;
        s.end_time = Some(clock.now() + Duration::seconds(10));
        clock.advance_secs(60);
        assert_eq!(s.remaining_at(clock.now()), Duration::zero());
        assert_eq!(s.progress_at(clock.now()), 1.0);
    }

    #[test]
    fn rounding_helpers() {
        assert_eq!(ceil_secs(Duration::milliseconds(1)), 1);
        assert_eq!(ceil_secs(Duration::milliseconds(-5)), 0);
        assert_eq!(floor_secs(Duration::milliseconds(1999)), 1);
    }

    #[test]
    fn session_type_strings() {
        assert_eq!(SessionType::parse("focus"), Some(SessionType::Focus));
        assert_eq!(SessionType::parse(SessionType::Break.as_str()), Some(SessionType::Break));
        assert_eq!(SessionType::parse("nap"), None);
        assert_eq!(SessionType::Focus.other(), SessionType::Break);
    }
}
