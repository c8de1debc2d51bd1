use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Running token and cost counters across all completion calls.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageRecord {
    pub total_calls: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub total_cost: f64,
    pub monthly_cost: f64,
    /// `YYYY-MM` (UTC) that `monthly_cost` belongs to.
    pub month: String,
    pub last_used: Option<i64>,
}

pub fn month_key(now: DateTime<Utc>) -> String {
    now.format("%Y-%m").to_string()
}

impl UsageRecord {
    /// Zeroes the monthly cost when `now` falls in a different month than
    /// the stored one. Returns whether a rollover happened.
    pub fn roll_month(&mut self, now: DateTime<Utc>) -> bool {
        let current = month_key(now);
        if self.month == current {
            return false;
        }
        self.monthly_cost = 0.0;
        self.month = current;
        true
    }

    pub fn record(&mut self, input_tokens: u64, output_tokens: u64, cost: f64, now: DateTime<Utc>) {
        self.roll_month(now);
        self.total_calls += 1;
        self.input_tokens += input_tokens;
        self.output_tokens += output_tokens;
        self.total_tokens += input_tokens + output_tokens;
        self.total_cost += cost;
        self.monthly_cost += cost;
        self.last_used = Some(now.timestamp_millis());
    }
}
