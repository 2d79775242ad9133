use chrono::NaiveDate;
use serde::Serialize;

use super::usage::{DailyLedger, UsageRecord};

/// Summary of one day's ledger, built by core code and rendered by the CLI.
#[derive(Debug, Clone, Serialize)]
pub struct DayReport {
    pub date: NaiveDate,
    pub calls: usize,
    pub day_cost: f64,
    pub records: Vec<UsageRecord>,
}

impl DayReport {
    pub fn from_ledger(date: NaiveDate, ledger: DailyLedger) -> Self {
        Self {
            date,
            calls: ledger.usage_track.len(),
            day_cost: ledger.day_cost,
            records: ledger.usage_track,
        }
    }
}
