//! Integration tests for crash recovery.
//!
//! Each test writes through a file-backed store, drops it as a killed
//! process would, and rebuilds the engine from the same database.

use std::path::Path;
use std::sync::Arc;

use pomokeep_core::storage::LedgerConfig;
use pomokeep_core::timer::PersistedTimerSnapshot;
use pomokeep_core::{
    Event, ManualClock, SessionType, SilentChime, Store, TimerEngine, TimerStatus,
};

fn open_engine(path: &Path, clock: &ManualClock) -> TimerEngine {
    let store = Arc::new(Store::open_path(path).unwrap());
    TimerEngine::new(
        store,
        Arc::new(clock.clone()),
        Box::new(SilentChime),
        LedgerConfig::default(),
    )
}

#[test]
fn test_running_session_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("pomokeep.db");
    let clock = ManualClock::at_date(2024, 7, 1);

    {
        let mut engine = open_engine(&db, &clock);
        engine.set_label("review");
        engine.start();
        clock.advance_secs(300);
    }

    clock.advance_secs(200);
    let engine = open_engine(&db, &clock);
    assert!(matches!(
        engine.recovery(),
        Some(Event::TimerRestored {
            session_type: SessionType::Focus,
            remaining_secs: 1000,
            ..
        })
    ));
    assert_eq!(engine.status(), TimerStatus::Running);
    assert_eq!(engine.label(), "review");
    assert!(engine.tick_token().is_some());
}

#[test]
fn test_overdue_snapshot_is_finalized_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("pomokeep.db");
    let clock = ManualClock::at_date(2024, 7, 1);

    {
        let mut engine = open_engine(&db, &clock);
        engine.start();
    }

    clock.advance_secs(3 * 3600);
    {
        let mut engine = open_engine(&db, &clock);
        assert!(matches!(
            engine.recovery(),
            Some(Event::TimerCompleted { recovered: true, .. })
        ));
        assert_eq!(engine.status(), TimerStatus::Completed);
        assert!(engine.recover().is_none());
        assert!(engine.recover().is_none());
        assert_eq!(engine.total_focus_seconds_today(), 1500);
        assert_eq!(engine.completed_pomodoros_today(), 1);
    }

    let engine = open_engine(&db, &clock);
    assert!(engine.recovery().is_none());
    assert_eq!(engine.status(), TimerStatus::Idle);
    assert_eq!(engine.total_focus_seconds_today(), 1500);
    assert_eq!(engine.completed_pomodoros_today(), 1);
    assert_eq!(engine.session_history().len(), 1);
}

#[test]
fn test_paused_session_is_not_recovered() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("pomokeep.db");
    let clock = ManualClock::at_date(2024, 7, 1);

    {
        let mut engine = open_engine(&db, &clock);
        engine.start();
        clock.advance_secs(60);
        engine.pause();
    }

    let engine = open_engine(&db, &clock);
    assert!(engine.recovery().is_none());
    assert_eq!(engine.status(), TimerStatus::Idle);
    assert_eq!(engine.total_focus_seconds_today(), 0);
}

#[test]
fn test_corrupt_snapshot_is_discarded() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("pomokeep.db");
    let clock = ManualClock::at_date(2024, 7, 1);

    {
        let store = Store::open_path(&db).unwrap();
        store.set_string("timer_end_time", "not a time");
        store.set_int("timer_total_duration", 1500);
    }

    {
        let engine = open_engine(&db, &clock);
        assert!(engine.recovery().is_none());
        assert_eq!(engine.status(), TimerStatus::Idle);
    }

    let store = Store::open_path(&db).unwrap();
    assert!(!PersistedTimerSnapshot::exists(&store));
    assert!(!store.contains("timer_total_duration"));
}

#[test]
fn test_end_time_beyond_duration_is_clamped() {
    let clock = ManualClock::at_date(2024, 7, 1);
    let store = Arc::new(Store::open_memory());
    PersistedTimerSnapshot {
        end_time: pomokeep_core::Clock::now(&clock) + chrono::Duration::hours(5),
        total_secs: 600,
        session_type: SessionType::Break,
        label: String::new(),
    }
    .save(&store);

    let engine = TimerEngine::new(
        store,
        Arc::new(clock.clone()),
        Box::new(SilentChime),
        LedgerConfig::default(),
    );
    assert_eq!(engine.session_type(), SessionType::Break);
    assert_eq!(engine.remaining_secs(), 600);
}

#[test]
fn test_recovered_break_credits_no_focus_time() {
    let clock = ManualClock::at_date(2024, 7, 1);
    let store = Arc::new(Store::open_memory());
    PersistedTimerSnapshot {
        end_time: pomokeep_core::Clock::now(&clock) - chrono::Duration::minutes(1),
        total_secs: 300,
        session_type: SessionType::Break,
        label: String::new(),
    }
    .save(&store);

    let engine = TimerEngine::new(
        store,
        Arc::new(clock.clone()),
        Box::new(SilentChime),
        LedgerConfig::default(),
    );
    assert!(matches!(
        engine.recovery(),
        Some(Event::TimerCompleted {
            session_type: SessionType::Break,
            recovered: true,
            ..
        })
    ));
    assert_eq!(engine.total_focus_seconds_today(), 0);
    assert_eq!(engine.completed_pomodoros_today(), 0);
    assert_eq!(engine.session_history().len(), 1);
}
