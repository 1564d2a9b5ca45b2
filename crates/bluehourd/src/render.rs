//! Plain-text rendering of a report for the terminal

use bluehour_api::{
    Report, format_day_label, format_felt_safe_ratio, format_percent, format_scale,
};
use std::fmt::Write;

pub fn render_report(report: &Report, name: &str) -> String {
    let mut out = String::new();
    let summary = &report.summary;

    let _ = writeln!(
        out,
        "Reflection for {name}: {} to {} ({} days)",
        format_day_label(report.from),
        format_day_label(report.to),
        report.days
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "  Check-ins:  {}", summary.count);
    let _ = writeln!(out, "  Mood:       {}", format_scale(summary.mean_mood));
    let _ = writeln!(out, "  Anxiety:    {}", format_scale(summary.mean_anxiety));
    let _ = writeln!(out, "  Energy:     {}", format_scale(summary.mean_energy));
    let _ = writeln!(out, "  Felt safe:  {}", format_percent(summary.felt_safe_percent));
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "  {:<12} {:>5}  {:>7}  {:>7}  {:>7}  {:>5}",
        "Day", "Count", "Mood", "Anxiety", "Energy", "Safe"
    );

    for day in &report.daily {
        let _ = writeln!(
            out,
            "  {:<12} {:>5}  {:>7}  {:>7}  {:>7}  {:>5}",
            format_day_label(day.date),
            day.count,
            format_scale(day.mean_mood),
            format_scale(day.mean_anxiety),
            format_scale(day.mean_energy),
            format_felt_safe_ratio(day.felt_safe_count, day.count)
        );
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use bluehour_api::{DailyBucket, ReportSummary};
    use chrono::NaiveDate;

    #[test]
    fn renders_summary_and_days() {
        let jan = |d| NaiveDate::from_ymd_opt(2025, 1, d).unwrap();
        let report = Report {
            from: jan(4),
            to: jan(5),
            days: 2,
            summary: ReportSummary {
                count: 2,
                mean_mood: Some(6.5),
                mean_anxiety: Some(3.0),
                mean_energy: Some(5.0),
                felt_safe_percent: Some(50.0),
            },
            entries: vec![],
            daily: vec![
                DailyBucket::empty(jan(4)),
                DailyBucket {
                    date: jan(5),
                    count: 2,
                    mean_mood: Some(6.5),
                    mean_anxiety: Some(3.0),
                    mean_energy: Some(5.0),
                    felt_safe_count: 1,
                },
            ],
        };

        let text = render_report(&report, "Alice");
        assert!(text.starts_with("Reflection for Alice: Sat, Jan 4 to Sun, Jan 5 (2 days)"));
        assert!(text.contains("Mood:       6.5/10"));
        assert!(text.contains("Felt safe:  50%"));
        assert!(text.contains("1/2"));
        assert_eq!(text.lines().count(), 11);
    }

    #[test]
    fn empty_report_uses_placeholders() {
        let day = NaiveDate::from_ymd_opt(2025, 1, 5).unwrap();
        let report = Report {
            from: day,
            to: day,
            days: 1,
            summary: ReportSummary::default(),
            entries: vec![],
            daily: vec![DailyBucket::empty(day)],
        };

        let text = render_report(&report, "Alice");
        assert!(text.contains("Mood:       —"));
        assert!(text.contains("Felt safe:  —"));
    }
}
