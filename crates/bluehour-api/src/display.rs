//! Formatting of report values for people

use chrono::NaiveDate;

use crate::Scale;

/// Shown in place of a value that has no data behind it
pub const PLACEHOLDER: &str = "—";

/// Mean on the 1-10 scale, one decimal, e.g. `6.5/10`
pub fn format_scale(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.1}/{}", v, Scale::MAX),
        None => PLACEHOLDER.to_string(),
    }
}

/// Whole-number percentage, e.g. `67%`
pub fn format_percent(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{}%", v.round() as i64),
        None => PLACEHOLDER.to_string(),
    }
}

/// Short day label, e.g. `Mon, Jan 5`
pub fn format_day_label(date: NaiveDate) -> String {
    date.format("%a, %b %-d").to_string()
}

/// Day-level felt-safe ratio, e.g. `2/3`
pub fn format_felt_safe_ratio(felt_safe: usize, count: usize) -> String {
    if count == 0 {
        PLACEHOLDER.to_string()
    } else {
        format!("{felt_safe}/{count}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_formatting() {
        assert_eq!(format_scale(Some(6.0)), "6.0/10");
        assert_eq!(format_scale(Some(6.666)), "6.7/10");
        assert_eq!(format_scale(None), "—");
    }

    #[test]
    fn percent_formatting() {
        assert_eq!(format_percent(Some(100.0)), "100%");
        assert_eq!(format_percent(Some(66.666)), "67%");
        assert_eq!(format_percent(None), "—");
    }

    #[test]
    fn day_label() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        assert_eq!(format_day_label(date), "Mon, Jan 5");
    }

    #[test]
    fn felt_safe_ratio() {
        assert_eq!(format_felt_safe_ratio(2, 3), "2/3");
        assert_eq!(format_felt_safe_ratio(0, 0), "—");
    }
}
