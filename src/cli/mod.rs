pub mod category;
pub mod doctor;
pub mod export;
pub mod goal;
pub mod import;
pub mod progress;
pub mod reset;
pub mod stats;
pub mod task;
pub mod top;
pub mod watch;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};

use goalpost::config::GoalpostConfig;
use goalpost::planner::Planner;

/// Open the configured database behind a planner.
pub fn open_planner(config: &GoalpostConfig) -> Result<Planner> {
    Planner::open(config.clone()).context("failed to open goal database")
}

/// Parse a command-line date: RFC 3339, or a bare `YYYY-MM-DD` taken as
/// midnight UTC.
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    bail!("invalid date '{s}': expected YYYY-MM-DD or RFC 3339")
}

/// Fold a `--field VALUE` / `--clear-field` pair into an update slot:
/// `None` leaves the field alone, `Some(None)` clears it.
pub fn set_or_clear<T>(value: Option<T>, clear: bool) -> Option<Option<T>> {
    match (value, clear) {
        (Some(value), _) => Some(Some(value)),
        (None, true) => Some(None),
        (None, false) => None,
    }
}

/// Render a 0-100 progress value as a fixed-width bar.
pub fn progress_bar(progress: u8) -> String {
    const WIDTH: usize = 20;
    let filled = (usize::from(progress.min(100)) * WIDTH + 50) / 100;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(WIDTH - filled))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_dates_and_rfc3339() {
        let a = parse_datetime("2026-03-01").unwrap();
        let b = parse_datetime("2026-03-01T00:00:00Z").unwrap();
        assert_eq!(a, b);
        assert!(parse_datetime("next tuesday").is_err());
    }

    #[test]
    fn set_or_clear_slots() {
        assert_eq!(set_or_clear(Some(1), false), Some(Some(1)));
        assert_eq!(set_or_clear::<i32>(None, true), Some(None));
        assert_eq!(set_or_clear::<i32>(None, false), None);
    }

    #[test]
    fn bar_widths() {
        assert_eq!(progress_bar(0), format!("[{}]", "-".repeat(20)));
        assert_eq!(progress_bar(100), format!("[{}]", "#".repeat(20)));
        assert_eq!(progress_bar(50).matches('#').count(), 10);
    }
}
