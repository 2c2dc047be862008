//! The fixed "now" every window cutoff and daily average is measured from.

use chrono::{DateTime, Datelike, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

/// Cap on the number of elapsed days used to average monthly activity
const MAX_AVERAGING_DAYS: u32 = 30;

/// Format of human-facing timestamps in checkpoints and reports
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A time bucket activity is counted in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Window {
    Daily,
    Weekly,
    Monthly,
    AllTime,
}

impl Window {
    /// How many days back from the reference date the window reaches, if bounded.
    #[must_use]
    pub const fn span_days(self) -> Option<u64> {
        match self {
            Self::Daily => Some(1),
            Self::Weekly => Some(7),
            Self::Monthly => Some(30),
            Self::AllTime => None,
        }
    }
}

/// The fixed "now" every date of one crawl is bucketed against.
///
/// Captured once per logical crawl and persisted with the checkpoint, so a
/// resumed run applies the identical cutoffs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceTime {
    captured_at: DateTime<Utc>,
    today: NaiveDate,
}

impl ReferenceTime {
    /// Capture the current instant, using the local calendar date as "today".
    #[must_use]
    pub fn now() -> Self {
        let captured_at = Utc::now();
        Self {
            captured_at,
            today: captured_at.with_timezone(&Local).date_naive(),
        }
    }

    #[must_use]
    pub const fn new(captured_at: DateTime<Utc>, today: NaiveDate) -> Self {
        Self { captured_at, today }
    }

    #[must_use]
    pub const fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    #[must_use]
    pub const fn today(&self) -> NaiveDate {
        self.today
    }

    /// Earliest date that still falls inside `window`, or `None` when unbounded.
    #[must_use]
    pub fn cutoff(&self, window: Window) -> Option<NaiveDate> {
        window
            .span_days()
            .map(|days| self.today.checked_sub_days(chrono::Days::new(days)).unwrap_or(NaiveDate::MIN))
    }

    /// Whether `date` counts towards `window`; the cutoff day itself is included.
    #[must_use]
    pub fn contains(&self, window: Window, date: NaiveDate) -> bool {
        self.cutoff(window).is_none_or(|cutoff| date >= cutoff)
    }

    /// Days elapsed in the current month, capped at 30 and never zero.
    #[must_use]
    pub fn averaging_days(&self) -> u32 {
        self.today.day().clamp(1, MAX_AVERAGING_DAYS)
    }

    /// Local wall-clock rendering of the captured instant.
    #[must_use]
    pub fn timestamp(&self) -> String {
        self.captured_at.with_timezone(&Local).format(TIMESTAMP_FORMAT).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reference(today: &str) -> ReferenceTime {
        let today = NaiveDate::parse_from_str(today, "%Y-%m-%d").unwrap();
        ReferenceTime::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(), today)
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_cutoffs() {
        let r = reference("2024-03-15");
        assert_eq!(r.cutoff(Window::Daily), Some(date("2024-03-14")));
        assert_eq!(r.cutoff(Window::Weekly), Some(date("2024-03-08")));
        assert_eq!(r.cutoff(Window::Monthly), Some(date("2024-02-14")));
        assert_eq!(r.cutoff(Window::AllTime), None);
    }

    #[test]
    fn test_cutoff_day_is_inclusive() {
        let r = reference("2024-03-15");
        assert!(r.contains(Window::Daily, date("2024-03-14")));
        assert!(!r.contains(Window::Daily, date("2024-03-13")));
        assert!(r.contains(Window::Weekly, date("2024-03-08")));
        assert!(!r.contains(Window::Weekly, date("2024-03-07")));
    }

    #[test]
    fn test_all_time_contains_everything() {
        let r = reference("2024-03-15");
        assert!(r.contains(Window::AllTime, date("1999-01-01")));
    }

    #[test]
    fn test_future_dates_fall_in_every_window() {
        let r = reference("2024-03-15");
        assert!(r.contains(Window::Daily, date("2024-03-16")));
    }

    #[test]
    fn test_averaging_days() {
        assert_eq!(reference("2024-03-01").averaging_days(), 1);
        assert_eq!(reference("2024-03-17").averaging_days(), 17);
        assert_eq!(reference("2024-03-31").averaging_days(), 30);
    }

    #[test]
    fn test_window_names() {
        assert_eq!(Window::AllTime.to_string(), "all_time");
        assert_eq!(serde_json::to_string(&Window::Daily).unwrap(), r#""daily""#);
    }

    #[test]
    fn test_serde_round_trip_preserves_cutoffs() {
        let r = reference("2024-03-15");
        let json = serde_json::to_string(&r).unwrap();
        let back: ReferenceTime = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
        assert_eq!(back.cutoff(Window::Monthly), r.cutoff(Window::Monthly));
    }
}
