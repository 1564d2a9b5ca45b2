//! Report types produced by the reflection aggregator
//!
//! Averages are `None` when nothing contributed to them; such fields are
//! omitted from the JSON rather than sent as `0` or `null`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::MoodEntry;

/// Totals over every entry in the report range
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean_mood: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean_anxiety: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean_energy: Option<f64>,
    /// Share of entries marked as felt safe, 0..=100
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub felt_safe_percent: Option<f64>,
}

/// One calendar day of the report series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBucket {
    pub date: NaiveDate,
    pub count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean_mood: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean_anxiety: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean_energy: Option<f64>,
    /// Number of that day's entries marked as felt safe (not a percentage)
    pub felt_safe_count: usize,
}

impl DailyBucket {
    /// A day with no entries
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            count: 0,
            mean_mood: None,
            mean_anxiety: None,
            mean_energy: None,
            felt_safe_count: 0,
        }
    }
}

/// Rolling N-day report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// First day of the range (inclusive)
    pub from: NaiveDate,
    /// Last day of the range (inclusive)
    pub to: NaiveDate,
    /// Number of days covered, after clamping
    pub days: u32,
    pub summary: ReportSummary,
    /// Entries in range, newest first
    pub entries: Vec<MoodEntry>,
    /// One bucket per day in range, oldest first
    pub daily: Vec<DailyBucket>,
}
