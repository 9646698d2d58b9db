// Archived traffic deltas and bucketed query results

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One archived delta for one service. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub name: String,
    pub upload: u64,
    pub download: u64,
}

/// Summed deltas for one (bucket, service) group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficTotals {
    pub upload: u64,
    pub download: u64,
}

/// bucket label -> service name -> totals. Labels sort chronologically.
pub type BucketedHistory = BTreeMap<String, BTreeMap<String, TrafficTotals>>;

/// Time range selector for history queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryRange {
    /// Last 24 hours, hourly buckets.
    #[default]
    Short,
    /// Last 30 days, daily buckets.
    Medium,
    /// Last 365 days, monthly buckets.
    Long,
}

impl HistoryRange {
    /// Parse a query selector (e.g. "short", "24h", "day").
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "short" | "24h" | "day" => Some(HistoryRange::Short),
            "medium" | "30d" | "month" => Some(HistoryRange::Medium),
            "long" | "1y" | "year" => Some(HistoryRange::Long),
            _ => None,
        }
    }

    /// Length of the look-back window in milliseconds.
    pub fn window_ms(self) -> i64 {
        const HOUR_MS: i64 = 60 * 60 * 1000;
        match self {
            HistoryRange::Short => 24 * HOUR_MS,
            HistoryRange::Medium => 30 * 24 * HOUR_MS,
            HistoryRange::Long => 365 * 24 * HOUR_MS,
        }
    }

    /// strftime pattern producing the bucket label (hour / day / month).
    pub fn bucket_format(self) -> &'static str {
        match self {
            HistoryRange::Short => "%Y-%m-%d %H:00",
            HistoryRange::Medium => "%Y-%m-%d",
            HistoryRange::Long => "%Y-%m",
        }
    }
}
