use serde::{Deserialize, Serialize};

/// Token and cost figures observed for one completed model call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CallUsage {
    pub total_tokens: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    /// Cost of the call in USD.
    pub total_cost: f64,
}

impl CallUsage {
    /// Builds an observation from a prompt/completion split, deriving the
    /// total. The derived total saturates rather than overflowing.
    pub fn from_split(prompt_tokens: u64, completion_tokens: u64, total_cost: f64) -> Self {
        Self {
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
            prompt_tokens,
            completion_tokens,
            total_cost,
        }
    }
}

/// One persisted ledger entry. Serialized field names match the historical
/// file format and must not change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    #[serde(rename = "Total Tokens")]
    pub total_tokens: u64,
    #[serde(rename = "Prompt Tokens")]
    pub prompt_tokens: u64,
    #[serde(rename = "Completion Tokens")]
    pub completion_tokens: u64,
    #[serde(rename = "Total Cost (USD)")]
    pub total_cost: f64,
    /// Local wall clock at capture, "HH:MM:SS".
    #[serde(rename = "Time Stamp")]
    pub time_stamp: String,
}

impl UsageRecord {
    pub fn from_usage(usage: &CallUsage, time_stamp: String) -> Self {
        Self {
            total_tokens: usage.total_tokens,
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_cost: usage.total_cost,
            time_stamp,
        }
    }
}

/// On-disk shape of one day's ledger file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyLedger {
    pub usage_track: Vec<UsageRecord>,
    pub day_cost: f64,
}

impl DailyLedger {
    /// Appends a record and folds its cost into the day total. All records
    /// enter through here so `day_cost` stays the sum of `usage_track`.
    pub fn push(&mut self, record: UsageRecord) {
        self.day_cost += record.total_cost;
        self.usage_track.push(record);
    }
}
