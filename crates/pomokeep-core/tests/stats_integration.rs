//! Integration tests for the statistics ledger across date changes.

use std::sync::Arc;

use pomokeep_core::storage::LedgerConfig;
use pomokeep_core::{
    Clock, Event, ManualClock, SessionType, SilentChime, StatsLedger, Store, TimerEngine,
};

fn complete_focus(engine: &mut TimerEngine, clock: &ManualClock) {
    engine.start();
    clock.advance_secs(engine.total_secs() as i64);
    let token = engine.tick_token().unwrap();
    assert!(matches!(engine.tick(token), Some(Event::TimerCompleted { .. })));
    engine.reset();
}

#[test]
fn test_counter_rolls_over_but_history_keeps_yesterday() {
    let clock = ManualClock::at_date(2024, 8, 5);
    let mut engine = TimerEngine::new(
        Arc::new(Store::open_memory()),
        Arc::new(clock.clone()),
        Box::new(SilentChime),
        LedgerConfig::default(),
    );

    complete_focus(&mut engine, &clock);
    complete_focus(&mut engine, &clock);
    assert_eq!(engine.completed_pomodoros_today(), 2);
    assert_eq!(engine.total_focus_seconds_today(), 3000);

    clock.advance_secs(24 * 3600);
    assert_eq!(engine.completed_pomodoros_today(), 0);
    assert_eq!(engine.total_focus_seconds_today(), 0);

    let days = engine.stats_for_last_n_days(2);
    let expected: Vec<(&str, u64)> = vec![("2024-08-05", 3000), ("2024-08-06", 0)];
    assert_eq!(
        days.iter().map(|(k, v)| (k.as_str(), *v)).collect::<Vec<_>>(),
        expected
    );

    complete_focus(&mut engine, &clock);
    assert_eq!(engine.completed_pomodoros_today(), 1);
}

#[test]
fn test_retention_window_drops_old_days() {
    let clock = ManualClock::at_date(2024, 1, 1);
    let ledger = StatsLedger::new(
        Arc::new(Store::open_memory()),
        Arc::new(clock.clone()),
        LedgerConfig {
            retention_days: 3,
            history_limit: 100,
        },
    );

    ledger.add_focus_seconds(10);
    clock.advance_secs(24 * 3600);
    ledger.add_focus_seconds(20);
    clock.advance_secs(2 * 24 * 3600);
    ledger.add_focus_seconds(30);

    let days = ledger.last_n_days(5);
    assert_eq!(days.get("2024-01-01"), Some(&0));
    assert_eq!(days.get("2024-01-02"), Some(&20));
    assert_eq!(days.get("2024-01-04"), Some(&30));
    assert_eq!(ledger.summary().week_focus_secs, 50);
}

#[test]
fn test_history_is_capped_newest_first() {
    let clock = ManualClock::at_date(2024, 3, 3);
    let ledger = StatsLedger::new(
        Arc::new(Store::open_memory()),
        Arc::new(clock.clone()),
        LedgerConfig {
            retention_days: 30,
            history_limit: 5,
        },
    );

    for minutes in 1..=8 {
        ledger.record_session(minutes, SessionType::Focus, Some("loop"));
        clock.advance_secs(60);
    }

    let history = ledger.history();
    assert_eq!(history.len(), 5);
    let minutes: Vec<u32> = history.iter().map(|r| r.duration_minutes).collect();
    assert_eq!(minutes, vec![8, 7, 6, 5, 4]);
    assert!(history[0].timestamp > history[4].timestamp);
    assert!(history[0].timestamp <= clock.now());
}

#[test]
fn test_malformed_stats_read_as_empty() {
    let clock = ManualClock::at_date(2024, 3, 3);
    let store = Arc::new(Store::open_memory());
    store.set_string("daily_stats", "{not json");
    store.set_string("session_history", "[{\"bogus\":true}]");
    let ledger = StatsLedger::new(store, Arc::new(clock), LedgerConfig::default());

    assert_eq!(ledger.today_seconds(), 0);
    assert!(ledger.history().is_empty());

    ledger.add_focus_seconds(42);
    assert_eq!(ledger.today_seconds(), 42);
}
