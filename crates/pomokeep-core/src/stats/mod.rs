//! Statistics ledger: daily focus totals, completed-pomodoro counter and
//! the bounded session history.

mod ledger;
mod records;

pub use ledger::StatsLedger;
pub use records::{DailyStats, SessionRecord, StatsSummary};
