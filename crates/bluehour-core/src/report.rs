//! Reflection aggregator
//!
//! Turns a user's check-ins into a rolling N-day [`Report`]: totals over the
//! whole range plus one bucket per calendar day. Pure; the caller picks the
//! reference day.

use bluehour_api::{DailyBucket, MoodEntry, Report, ReportSummary};
use bluehour_util::{each_day, trailing_days};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Build the report for the `days` days ending at `reference`.
///
/// `days` is clamped to `1..=MAX_TRAILING_DAYS`, and `Report::days` is the
/// number of buckets actually produced. Entries outside the range are
/// ignored; duplicates are kept.
pub fn aggregate(entries: &[MoodEntry], days: i64, reference: NaiveDate) -> Report {
    let (from, to) = trailing_days(reference, days);

    let mut in_range: Vec<MoodEntry> = entries
        .iter()
        .filter(|e| e.entry_date >= from && e.entry_date <= to)
        .cloned()
        .collect();
    in_range.sort_by(|a, b| {
        b.entry_date
            .cmp(&a.entry_date)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });

    let summary = summarize(&in_range);

    let mut by_day: BTreeMap<NaiveDate, Vec<&MoodEntry>> = BTreeMap::new();
    for entry in &in_range {
        by_day.entry(entry.entry_date).or_default().push(entry);
    }

    let daily: Vec<DailyBucket> = each_day(from, to)
        .map(|date| match by_day.get(&date) {
            Some(day_entries) => bucket(date, day_entries),
            None => DailyBucket::empty(date),
        })
        .collect();

    Report {
        from,
        to,
        days: u32::try_from(daily.len()).unwrap_or(u32::MAX),
        summary,
        entries: in_range,
        daily,
    }
}

fn summarize(entries: &[MoodEntry]) -> ReportSummary {
    if entries.is_empty() {
        return ReportSummary::default();
    }

    let count = entries.len();
    let safe = entries.iter().filter(|e| e.felt_safe).count();

    ReportSummary {
        count,
        mean_mood: mean(entries.iter().map(|e| e.mood.get())),
        mean_anxiety: mean(entries.iter().map(|e| e.anxiety.get())),
        mean_energy: mean(entries.iter().map(|e| e.energy.get())),
        felt_safe_percent: Some(100.0 * safe as f64 / count as f64),
    }
}

fn bucket(date: NaiveDate, entries: &[&MoodEntry]) -> DailyBucket {
    DailyBucket {
        date,
        count: entries.len(),
        mean_mood: mean(entries.iter().map(|e| e.mood.get())),
        mean_anxiety: mean(entries.iter().map(|e| e.anxiety.get())),
        mean_energy: mean(entries.iter().map(|e| e.energy.get())),
        felt_safe_count: entries.iter().filter(|e| e.felt_safe).count(),
    }
}

fn mean(values: impl Iterator<Item = u8>) -> Option<f64> {
    let (sum, n) = values.fold((0u64, 0u64), |(sum, n), v| (sum + u64::from(v), n + 1));
    (n > 0).then(|| sum as f64 / n as f64)
}
