//! Durable mirror of a running session.
//!
//! Four kv keys hold the snapshot. `timer_end_time` marks presence: it is
//! written last and removed first, so a torn write leaves either the old
//! snapshot or none.

use chrono::DateTime;

use super::SessionType;
use crate::clock::Timestamp;
use crate::storage::{keys, Store, MAX_DURATION_MIN};

const MAX_TOTAL_SECS: i64 = MAX_DURATION_MIN as i64 * 60;

#[derive(Debug, Clone, PartialEq)]
pub struct PersistedTimerSnapshot {
    pub end_time: Timestamp,
    pub total_secs: u64,
    pub session_type: SessionType,
    pub label: String,
}

impl PersistedTimerSnapshot {
    /// Read the snapshot. A malformed one is logged and treated as absent.
    pub fn load(store: &Store) -> Option<Self> {
        let raw_end = store.get_string(keys::SNAPSHOT_END_TIME)?;

        let end_time = match DateTime::parse_from_rfc3339(&raw_end) {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(value = %raw_end, "discarding timer snapshot with bad end time: {e}");
                return None;
            }
        };
        let total_secs = match store.get_int(keys::SNAPSHOT_TOTAL_SECS) {
            Some(secs) if (1..=MAX_TOTAL_SECS).contains(&secs) => secs as u64,
            other => {
                tracing::warn!(?other, "discarding timer snapshot with bad duration");
                return None;
            }
        };
        let session_type = store
            .get_string(keys::SNAPSHOT_SESSION_TYPE)
            .and_then(|s| SessionType::parse(&s))
            .unwrap_or_else(|| {
                tracing::warn!("timer snapshot has no session type; assuming focus");
                SessionType::Focus
            });
        let label = store.get_string(keys::SNAPSHOT_LABEL).unwrap_or_default();

        Some(Self {
            end_time,
            total_secs,
            session_type,
            label,
        })
    }

    pub fn save(&self, store: &Store) {
        store.set_int(
            keys::SNAPSHOT_TOTAL_SECS,
            i64::try_from(self.total_secs).unwrap_or(i64::MAX),
        );
        store.set_string(keys::SNAPSHOT_SESSION_TYPE, self.session_type.as_str());
        store.set_string(keys::SNAPSHOT_LABEL, &self.label);
        store.set_string(keys::SNAPSHOT_END_TIME, &self.end_time.to_rfc3339());
    }

    pub fn clear(store: &Store) {
        store.remove(keys::SNAPSHOT_END_TIME);
        store.remove(keys::SNAPSHOT_TOTAL_SECS);
        store.remove(keys::SNAPSHOT_SESSION_TYPE);
        store.remove(keys::SNAPSHOT_LABEL);
    }

    pub fn exists(store: &Store) -> bool {
        store.contains(keys::SNAPSHOT_END_TIME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};

    fn sample() -> PersistedTimerSnapshot {
        PersistedTimerSnapshot {
            end_time: ManualClock::at_date(2024, 2, 3).now(),
            total_secs: 1500,
            session_type: SessionType::Focus,
            label: "thesis".into(),
        }
    }

    #[test]
    fn save_load_clear() {
        let store = Store::open_memory();
        assert!(PersistedTimerSnapshot::load(&store).is_none());

        sample().save(&store);
        assert!(PersistedTimerSnapshot::exists(&store));
        assert_eq!(PersistedTimerSnapshot::load(&store), Some(sample()));
        assert_eq!(
            store.get_string(keys::SNAPSHOT_END_TIME).as_deref(),
            Some("2024-02-03T09:00:00+00:00")
        );

        PersistedTimerSnapshot::clear(&store);
        assert!(!PersistedTimerSnapshot::exists(&store));
        assert!(!store.contains(keys::SNAPSHOT_LABEL));
    }

    #[test]
    fn malformed_snapshot_reads_as_absent() {
        let store = Store::open_memory();
        sample().save(&store);
        store.set_string(keys::SNAPSHOT_END_TIME, "yesterday-ish");
        assert!(PersistedTimerSnapshot::load(&store).is_none());

        sample().save(&store);
        store.set_int(keys::SNAPSHOT_TOTAL_SECS, 0);
        assert!(PersistedTimerSnapshot::load(&store).is_none());

        store.set_int(keys::SNAPSHOT_TOTAL_SECS, i64::MAX);
        assert!(PersistedTimerSnapshot::load(&store).is_none());
    }

    #[test]
    fn missing_label_reads_as_empty() {
        let store = Store::open_memory();
        sample().save(&store);
        store.remove(keys::SNAPSHOT_LABEL);
        assert_eq!(PersistedTimerSnapshot::load(&store).unwrap().label, "");
    }
}
