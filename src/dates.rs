//! JST calendar helpers.
//!
//! Every date the job handles is a JST calendar day. Closing timestamps coming
//! back from the task store carry their own offset and are compared against a
//! half-open `[start, end)` window in fixed `+09:00`.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Asia::Tokyo;

/// Wire format of every date the job sends or receives.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Today's date in Asia/Tokyo.
pub fn jst_today(now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&Tokyo).date_naive()
}

/// The day a scheduled run reports on: yesterday in JST.
pub fn default_target_date(now: DateTime<Utc>) -> NaiveDate {
    jst_today(now) - Duration::days(1)
}

/// Parse a `YYYY-MM-DD` calendar date. Anything with a time component is rejected.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT).ok()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn is_monday(date: NaiveDate) -> bool {
    date.weekday() == Weekday::Mon
}

/// Parse a closing timestamp as stored upstream.
///
/// Accepts RFC 3339 (`2026-01-22T09:00:00.000+09:00`) and bare dates, which
/// count as JST midnight of that day. Returns `None` for anything else.
pub fn parse_closing_timestamp(value: &str) -> Option<DateTime<FixedOffset>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(ts);
    }
    parse_date(trimmed).map(jst_midnight)
}

/// Midnight of `date` in Tokyo. Tokyo has no DST, so the UTC instant is always 15:00 the day before.
fn jst_midnight(date: NaiveDate) -> DateTime<FixedOffset> {
    let utc = date.and_time(NaiveTime::MIN) - Duration::hours(9);
    Tokyo.from_utc_datetime(&utc).fixed_offset()
}

/// Half-open JST window `[start, end)` covering one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClosingWindow {
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
}

impl ClosingWindow {
    /// Window covering `day` itself.
    pub fn for_day(day: NaiveDate) -> Self {
        Self {
            start: jst_midnight(day),
            end: jst_midnight(day + Duration::days(1)),
        }
    }

    /// Window covering the day before `run_date`.
    pub fn preceding(run_date: NaiveDate) -> Self {
        Self::for_day(run_date - Duration::days(1))
    }

    pub fn contains(&self, ts: &DateTime<FixedOffset>) -> bool {
        *ts >= self.start && *ts < self.end
    }

    /// `true` when `raw` parses and falls inside the window.
    pub fn contains_raw(&self, raw: Option<&str>) -> bool {
        raw.and_then(parse_closing_timestamp)
            .is_some_and(|ts| self.contains(&ts))
    }

    pub fn start_rfc3339(&self) -> String {
        self.start.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
    }

    pub fn end_rfc3339(&self) -> String {
        self.end.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
    }
}

/// Whole days between a `since` date and `today`, or `None` if `since` is unparseable.
pub fn days_since(since: &str, today: NaiveDate) -> Option<i64> {
    let trimmed = since.trim();
    let since_date = parse_date(trimmed)
        .or_else(|| parse_closing_timestamp(trimmed).map(|ts| ts.with_timezone(&Tokyo).date_naive()))?;
    Some((today - since_date).num_days())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    #[test]
    fn preceding_window_covers_previous_jst_day() {
        let window = ClosingWindow::preceding(date("2026-01-23"));
        assert_eq!(window.start_rfc3339(), "2026-01-22T00:00:00+09:00");
        assert_eq!(window.end_rfc3339(), "2026-01-23T00:00:00+09:00");
    }

    #[test]
    fn window_includes_same_day_and_excludes_older() {
        let window = ClosingWindow::preceding(date("2026-01-23"));
        assert!(window.contains_raw(Some("2026-01-22T09:00:00+09:00")));
        assert!(!window.contains_raw(Some("2026-01-16T09:00:00+09:00")));
        assert!(!window.contains_raw(None));
    }

    #[test]
    fn window_end_is_exclusive() {
        let window = ClosingWindow::for_day(date("2026-01-22"));
        assert!(window.contains_raw(Some("2026-01-22T00:00:00+09:00")));
        assert!(window.contains_raw(Some("2026-01-22T23:59:59.999+09:00")));
        assert!(!window.contains_raw(Some("2026-01-23T00:00:00+09:00")));
    }

    #[test]
    fn window_compares_across_offsets() {
        let window = ClosingWindow::for_day(date("2026-01-22"));
        // 2026-01-21T15:00Z is 2026-01-22T00:00 JST
        assert!(window.contains_raw(Some("2026-01-21T15:00:00Z")));
        assert!(!window.contains_raw(Some("2026-01-21T14:59:59Z")));
    }

    #[test]
    fn bare_date_counts_as_jst_midnight() {
        let window = ClosingWindow::for_day(date("2026-01-22"));
        assert!(window.contains_raw(Some("2026-01-22")));
        assert!(!window.contains_raw(Some("2026-01-21")));
        assert!(!window.contains_raw(Some("not a date")));
        assert!(!window.contains_raw(Some("")));
    }

    #[test]
    fn default_target_is_yesterday_in_tokyo() {
        // 2026-01-22T16:00Z is already 2026-01-23 01:00 in Tokyo
        let now = "2026-01-22T16:00:00Z".parse::<DateTime<Utc>>().unwrap();
        assert_eq!(jst_today(now), date("2026-01-23"));
        assert_eq!(default_target_date(now), date("2026-01-22"));
    }

    #[test]
    fn parse_date_rejects_time_component() {
        assert!(parse_date("2026-01-22T00:00:00").is_none());
        assert!(parse_date("2026/01/22").is_none());
        assert_eq!(format_date(date("2026-01-22")), "2026-01-22");
    }

    #[test]
    fn days_since_counts_whole_days() {
        let today = date("2026-01-23");
        assert_eq!(days_since("2026-01-20", today), Some(3));
        assert_eq!(days_since("2026-01-23T08:00:00+09:00", today), Some(0));
        assert_eq!(days_since("garbage", today), None);
    }

    #[test]
    fn monday_detection() {
        assert!(is_monday(date("2026-01-19")));
        assert!(!is_monday(date("2026-01-20")));
    }
}
