//! Stable key names in the kv store.
//!
//! These are read back by older and newer builds alike; renaming one loses
//! the user's data.

pub const FOCUS_DURATION_MIN: &str = "timer_duration";
pub const BREAK_DURATION_MIN: &str = "break_duration";
pub const THEME_MODE: &str = "theme_mode";
pub const SOUND_ENABLED: &str = "sound_enabled";

pub const DAILY_STATS: &str = "daily_stats";
pub const COMPLETED_TODAY: &str = "completed_pomodoros_today";
pub const COMPLETED_DATE: &str = "completed_pomodoros_date";
pub const SESSION_HISTORY: &str = "session_history";

pub const SNAPSHOT_END_TIME: &str = "timer_end_time";
pub const SNAPSHOT_TOTAL_SECS: &str = "timer_total_duration";
pub const SNAPSHOT_SESSION_TYPE: &str = "timer_session_type";
pub const SNAPSHOT_LABEL: &str = "timer_session_label";
