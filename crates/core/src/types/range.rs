//! Report date-range keywords.
//!
//! Summary, export, and chart endpoints accept a `range` keyword that maps to
//! a window over `created_at`. Every keyword except `yesterday` is open-ended
//! at "now"; `yesterday` is the local previous day, midnight to midnight.

use chrono::{DateTime, Duration, Local, NaiveDateTime, NaiveTime, TimeZone, Utc};

/// A report date-range keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportRange {
    /// Last 24 hours (`1d`).
    OneDay,
    /// Last 48 hours (`2d`).
    TwoDays,
    /// Last 7 days (`week` or `7d`).
    Week,
    /// Last 30 days (`month` or `30d`).
    Month,
    /// Last 365 days (`year` or `365d`).
    Year,
    /// The previous local calendar day, midnight to midnight.
    Yesterday,
}

impl ReportRange {
    /// Parse a range keyword, case-insensitively. Unknown keywords yield
    /// `None` and callers treat them as "no range filter".
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "1d" => Some(Self::OneDay),
            "2d" => Some(Self::TwoDays),
            "week" | "7d" => Some(Self::Week),
            "month" | "30d" => Some(Self::Month),
            "year" | "365d" => Some(Self::Year),
            "yesterday" => Some(Self::Yesterday),
            _ => None,
        }
    }

    /// Resolve the range to a `[start, end)` window ending at `now`.
    ///
    /// Returns `(start, None)` for windows that are open-ended at "now" and
    /// `(start, Some(end))` for `yesterday`, the only window bounded at both
    /// ends.
    #[must_use]
    pub fn window_ending(self, now: DateTime<Local>) -> (DateTime<Utc>, Option<DateTime<Utc>>) {
        let days_back = |days: i64| (now.with_timezone(&Utc) - Duration::days(days), None);

        match self {
            Self::OneDay => days_back(1),
            Self::TwoDays => days_back(2),
            Self::Week => days_back(7),
            Self::Month => days_back(30),
            Self::Year => days_back(365),
            Self::Yesterday => {
                let midnight_today = now.date_naive().and_time(NaiveTime::MIN);
                let midnight_yesterday = midnight_today - Duration::days(1);
                (
                    local_to_utc(midnight_yesterday),
                    Some(local_to_utc(midnight_today)),
                )
            }
        }
    }
}

/// Map a naive local timestamp to UTC, taking the earliest interpretation
/// around DST transitions. Falls back to reading the timestamp as UTC when
/// the local clock skips it entirely.
fn local_to_utc(naive: NaiveDateTime) -> DateTime<Utc> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map_or_else(|| naive.and_utc(), |dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn fixed_now() -> DateTime<Local> {
        // 2024-03-20 15:30:00 local
        Local
            .from_local_datetime(
                &NaiveDateTime::parse_from_str("2024-03-20 15:30:00", "%Y-%m-%d %H:%M:%S").unwrap(),
            )
            .earliest()
            .unwrap()
    }

    #[test]
    fn test_parse_keywords_and_aliases() {
        assert_eq!(ReportRange::parse("1d"), Some(ReportRange::OneDay));
        assert_eq!(ReportRange::parse("2d"), Some(ReportRange::TwoDays));
        assert_eq!(ReportRange::parse("week"), Some(ReportRange::Week));
        assert_eq!(ReportRange::parse("7d"), Some(ReportRange::Week));
        assert_eq!(ReportRange::parse("MONTH"), Some(ReportRange::Month));
        assert_eq!(ReportRange::parse("30d"), Some(ReportRange::Month));
        assert_eq!(ReportRange::parse("year"), Some(ReportRange::Year));
        assert_eq!(ReportRange::parse("365d"), Some(ReportRange::Year));
        assert_eq!(ReportRange::parse("yesterday"), Some(ReportRange::Yesterday));
        assert_eq!(ReportRange::parse("fortnight"), None);
    }

    #[test]
    fn test_day_ranges_are_open_ended() {
        let now = fixed_now();
        let (start, end) = ReportRange::Week.window_ending(now);
        assert_eq!(start, now.with_timezone(&Utc) - Duration::days(7));
        assert!(end.is_none());
    }

    #[test]
    fn test_yesterday_is_bounded_both_ends() {
        let now = fixed_now();
        let (start, end) = ReportRange::Yesterday.window_ending(now);
        let end = end.expect("yesterday has an upper bound");

        assert_eq!(end - start, Duration::days(1));
        // The window ends at today's local midnight, before "now".
        assert!(end <= now.with_timezone(&Utc));
        // And it covers a moment 24h ago.
        assert!(start <= now.with_timezone(&Utc) - Duration::days(1));
    }
}
