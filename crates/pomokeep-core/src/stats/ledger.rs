//! Per-day focus totals, the completed-pomodoro counter and the session log.
//!
//! The ledger is the only writer of these records. Every date is the
//! clock's calendar date at call time, formatted as `YYYY-MM-DD`.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, NaiveDate};

use super::records::{DailyStats, SessionRecord, StatsSummary};
use crate::clock::{date_key, parse_date_key, Clock};
use crate::storage::{keys, LedgerConfig, Store};
use crate::timer::SessionType;

#[derive(Clone)]
pub struct StatsLedger {
    store: Arc<Store>,
    clock: Arc<dyn Clock>,
    config: LedgerConfig,
}

impl StatsLedger {
    pub fn new(store: Arc<Store>, clock: Arc<dyn Clock>, config: LedgerConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    pub fn config(&self) -> LedgerConfig {
        self.config
    }

    // ── Daily focus totals ───────────────────────────────────────────

    /// Add `secs` to today's bucket, then drop buckets outside retention.
    pub fn add_focus_seconds(&self, secs: u64) {
        if secs == 0 {
            return;
        }
        let today = self.clock.today();
        let mut stats = self.daily_stats();
        let bucket = stats.entry(date_key(today)).or_insert(0);
        *bucket = bucket.saturating_add(secs);
        self.prune(&mut stats, today);
        tracing::debug!(secs, today = %today, "credited focus time");
        self.save_daily_stats(&stats);
    }

    pub fn today_seconds(&self) -> u64 {
        let key = date_key(self.clock.today());
        self.daily_stats().get(&key).copied().unwrap_or(0)
    }

    /// Totals for the last `n` days including today, oldest first. Days with
    /// no focus time read as 0.
    pub fn last_n_days(&self, n: u32) -> BTreeMap<String, u64> {
        let today = self.clock.today();
        let stats = self.daily_stats();
        (0..i64::from(n))
            .rev()
            .filter_map(|back| today.checked_sub_signed(Duration::days(back)))
            .map(|date| {
                let key = date_key(date);
                let secs = stats.get(&key).copied().unwrap_or(0);
                (key, secs)
            })
            .collect()
    }

    // ── Completed-pomodoro counter ───────────────────────────────────

    pub fn completed_today(&self) -> u32 {
        let today = date_key(self.clock.today());
        if self.store.get_string(keys::COMPLETED_DATE).as_deref() != Some(today.as_str()) {
            if self.store.contains(keys::COMPLETED_TODAY) {
                tracing::debug!(today = %today, "date rolled over; completed counter reset");
            }
            self.store.set_int(keys::COMPLETED_TODAY, 0);
            self.store.set_string(keys::COMPLETED_DATE, &today);
            return 0;
        }
        self.store
            .get_int(keys::COMPLETED_TODAY)
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(0)
    }

    /// Returns the new count.
    pub fn increment_completed_today(&self) -> u32 {
        let next = self.completed_today().saturating_add(1);
        self.store.set_int(keys::COMPLETED_TODAY, i64::from(next));
        next
    }

    // ── Session history ──────────────────────────────────────────────

    /// Prepend a record stamped now; the log keeps the newest
    /// `history_limit` entries.
    pub fn record_session(&self, duration_minutes: u32, session_type: SessionType, label: Option<&str>) {
        let label = match session_type {
            SessionType::Focus => label
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string),
            SessionType::Break => None,
        };
        let record = SessionRecord {
            timestamp: self.clock.now(),
            duration_minutes,
            session_type,
            label,
        };

        let mut history = self.history();
        history.insert(0, record);
        history.truncate(self.config.history_limit);
        if let Err(e) = self.store.set_json(keys::SESSION_HISTORY, &history) {
            tracing::warn!("failed to encode session history: {e}");
        }
    }

    /// Newest first. Entries that fail to decode are skipped.
    pub fn history(&self) -> Vec<SessionRecord> {
        let Some(raw) = self.store.get_json::<Vec<serde_json::Value>>(keys::SESSION_HISTORY) else {
            return Vec::new();
        };
        raw.into_iter()
            .filter_map(|value| match serde_json::from_value::<SessionRecord>(value) {
                Ok(rec) => Some(rec),
                Err(e) => {
                    tracing::warn!("skipping malformed session record: {e}");
                    None
                }
            })
            .collect()
    }

    // ── Aggregates ───────────────────────────────────────────────────

    pub fn summary(&self) -> StatsSummary {
        let last_7_days = self.last_n_days(7);
        StatsSummary {
            today_focus_secs: self.today_seconds(),
            completed_pomodoros_today: self.completed_today(),
            week_focus_secs: last_7_days.values().sum(),
            last_7_days,
            history_len: self.history().len(),
        }
    }

    /// Forget all statistics and history.
    pub fn clear(&self) {
        for key in [
            keys::DAILY_STATS,
            keys::COMPLETED_TODAY,
            keys::COMPLETED_DATE,
            keys::SESSION_HISTORY,
        ] {
            self.store.remove(key);
        }
        tracing::info!("statistics cleared");
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn daily_stats(&self) -> DailyStats {
        self.store
            .get_json::<DailyStats>(keys::DAILY_STATS)
            .unwrap_or_default()
    }

    fn save_daily_stats(&self, stats: &DailyStats) {
        if let Err(e) = self.store.set_json(keys::DAILY_STATS, stats) {
            tracing::warn!("failed to encode daily stats: {e}");
        }
    }

    /// Keep the last `retention_days` calendar days (today included) and any
    /// future-dated bucket left behind by a clock change. Unparseable keys go.
    fn prune(&self, stats: &mut DailyStats, today: NaiveDate) {
        let retention = i64::from(self.config.retention_days);
        stats.retain(|key, _| match parse_date_key(key) {
            Some(date) => (today - date).num_days() < retention,
            None => false,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn ledger() -> (StatsLedger, ManualClock, Arc<Store>) {
        let clock = ManualClock::at_date(2024, 6, 10);
        let store = Arc::new(Store::open_memory());
        let ledger = StatsLedger::new(store.clone(), Arc::new(clock.clone()), LedgerConfig::default());
        (ledger, clock, store)
    }

    #[test]
    fn focus_seconds_accumulate_per_day() {
        let (ledger, clock, _) = ledger();
        ledger.add_focus_seconds(600);
        ledger.add_focus_seconds(300);
        assert_eq!(ledger.today_seconds(), 900);

        clock.advance(Duration::days(1));
        assert_eq!(ledger.today_seconds(), 0);
        ledger.add_focus_seconds(60);

        let days = ledger.last_n_days(2);
        assert_eq!(days.get("2024-06-10"), Some(&900));
        assert_eq!(days.get("2024-06-11"), Some(&60));
    }

    #[test]
    fn last_n_days_fills_missing_with_zero() {
        let (ledger, _, _) = ledger();
        let days = ledger.last_n_days(3);
        assert_eq!(
            days.into_iter().collect::<Vec<_>>(),
            vec![
                ("2024-06-08".to_string(), 0),
                ("2024-06-09".to_string(), 0),
                ("2024-06-10".to_string(), 0),
            ]
        );
        assert!(ledger.last_n_days(0).is_empty());
    }

    #[test]
    fn writes_prune_beyond_retention() {
        let (ledger, clock, store) = ledger();
        ledger.add_focus_seconds(100);
        clock.advance(Duration::days(29));
        ledger.add_focus_seconds(1);
        assert!(store.get_string(keys::DAILY_STATS).unwrap().contains("2024-06-10"));

        clock.advance(Duration::days(1));
        ledger.add_focus_seconds(1);
        let raw = store.get_string(keys::DAILY_STATS).unwrap();
        assert!(!raw.contains("2024-06-10"));
        assert!(raw.contains("2024-07-09"));
    }

    #[test]
    fn malformed_daily_stats_read_as_empty() {
        let (ledger, _, store) = ledger();
        store.set_string(keys::DAILY_STATS, "[oops");
        assert_eq!(ledger.today_seconds(), 0);
        ledger.add_focus_seconds(5);
        assert_eq!(ledger.today_seconds(), 5);
    }

    #[test]
    fn completed_counter_resets_on_new_day() {
        let (ledger, clock, _) = ledger();
        assert_eq!(ledger.increment_completed_today(), 1);
        assert_eq!(ledger.increment_completed_today(), 2);
        assert_eq!(ledger.completed_today(), 2);

        clock.advance(Duration::days(1));
        assert_eq!(ledger.completed_today(), 0);
        assert_eq!(ledger.increment_completed_today(), 1);
    }

    #[test]
    fn history_is_newest_first_and_capped() {
        let clock = ManualClock::at_date(2024, 6, 10);
        let store = Arc::new(Store::open_memory());
        let config = LedgerConfig {
            retention_days: 30,
            history_limit: 3,
        };
        let ledger = StatsLedger::new(store, Arc::new(clock.clone()), config);

        for minutes in 1..=5 {
            ledger.record_session(minutes, SessionType::Focus, Some("deep work"));
            clock.advance_secs(60);
        }
        let history = ledger.history();
        assert_eq!(history.len(), 3);
        assert_eq!(
            history.iter().map(|r| r.duration_minutes).collect::<Vec<_>>(),
            vec![5, 4, 3]
        );
    }

    #[test]
    fn break_records_never_carry_labels() {
        let (ledger, _, _) = ledger();
        ledger.record_session(5, SessionType::Break, Some("ignored"));
        ledger.record_session(25, SessionType::Focus, Some("   "));
        let history = ledger.history();
        assert_eq!(history[0].label, None);
        assert_eq!(history[1].label, None);
        assert_eq!(history[1].session_type, SessionType::Break);
    }

    #[test]
    fn malformed_history_entries_are_skipped() {
        let (ledger, _, store) = ledger();
        store.set_string(
            keys::SESSION_HISTORY,
            r#"[{"bogus":true},{"timestamp":"2024-06-10T08:00:00Z","durationMinutes":25,"type":"focus"}]"#,
        );
        let history = ledger.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].duration_minutes, 25);
    }

    #[test]
    fn summary_and_clear() {
        let (ledger, _, _) = ledger();
        ledger.add_focus_seconds(1500);
        ledger.increment_completed_today();
        ledger.record_session(25, SessionType::Focus, None);

        let summary = ledger.summary();
        assert_eq!(summary.today_focus_secs, 1500);
        assert_eq!(summary.week_focus_secs, 1500);
        assert_eq!(summary.completed_pomodoros_today, 1);
        assert_eq!(summary.history_len, 1);
        assert_eq!(summary.last_7_days.len(), 7);

        ledger.clear();
        let summary = ledger.summary();
        assert_eq!(summary.today_focus_secs, 0);
        assert_eq!(summary.completed_pomodoros_today, 0);
        assert_eq!(summary.history_len, 0);
    }
}
