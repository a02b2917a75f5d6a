use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::clock::Timestamp;
use crate::timer::SessionType;

/// Focus seconds per `YYYY-MM-DD` date key.
pub type DailyStats = BTreeMap<String, u64>;

/// One finished session in the history log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub timestamp: Timestamp,
    pub duration_minutes: u32,
    #[serde(rename = "type")]
    pub session_type: SessionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Aggregate view for dashboards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSummary {
    pub today_focus_secs: u64,
    pub completed_pomodoros_today: u32,
    /// Date key → focus seconds, oldest first, seven days including today.
    pub last_7_days: BTreeMap<String, u64>,
    pub week_focus_secs: u64,
    pub history_len: usize,
}
