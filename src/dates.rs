//! Date parsing and display in the viewer's time zone.

use std::fmt::Display;

use chrono::{
    DateTime, Duration, Local, LocalResult, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc,
};

/// `Oct 6, 2024, 3:07 PM`
const DISPLAY_FORMAT: &str = "%b %-d, %Y, %-I:%M %p";

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse a date-like string into `tz`.
///
/// Accepts RFC 3339, RFC 2822, ISO date-times without an offset (read as
/// wall-clock time in `tz`) and bare ISO dates (read as UTC midnight).
pub fn parse_date_in<Tz: TimeZone>(input: &str, tz: &Tz) -> Option<DateTime<Tz>> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(tz));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(input) {
        return Some(dt.with_timezone(tz));
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return resolve_wall_clock(&naive, tz);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        let midnight = date.and_hms_opt(0, 0, 0)?;
        return Some(Utc.from_utc_datetime(&midnight).with_timezone(tz));
    }

    None
}

/// Wall-clock time in `tz`. A time skipped by a forward transition is read
/// with the offset in effect just before it, landing after the gap.
fn resolve_wall_clock<Tz: TimeZone>(naive: &NaiveDateTime, tz: &Tz) -> Option<DateTime<Tz>> {
    match tz.from_local_datetime(naive) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => {
            let before = tz
                .offset_from_utc_datetime(&naive.checked_sub_signed(Duration::days(1))?)
                .fix();
            let shift = Duration::seconds(i64::from(before.local_minus_utc()));
            let utc = naive.checked_sub_signed(shift)?;
            Some(tz.from_utc_datetime(&utc))
        }
    }
}

/// Format `input` for display in `tz`, or an empty string if it does not parse.
pub fn format_date_in<Tz>(input: &str, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    parse_date_in(input, tz)
        .map(|dt| dt.format(DISPLAY_FORMAT).to_string())
        .unwrap_or_default()
}

/// [`format_date_in`] using the server's local zone.
pub fn format_date_local(input: &str) -> String {
    format_date_in(input, &Local)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    #[test]
    fn test_rfc3339_in_utc() {
        assert_eq!(
            format_date_in("2024-10-06T15:07:00Z", &Utc),
            "Oct 6, 2024, 3:07 PM"
        );
    }

    #[test]
    fn test_rfc3339_converted_to_viewer_zone() {
        let eastern = FixedOffset::west_opt(4 * 3600).unwrap();
        assert_eq!(
            format_date_in("2024-10-06T15:07:00+00:00", &eastern),
            "Oct 6, 2024, 11:07 AM"
        );
    }

    #[test]
    fn test_crosses_midnight_into_previous_day() {
        let pacific = FixedOffset::west_opt(7 * 3600).unwrap();
        assert_eq!(
            format_date_in("2024-01-01T03:30:00Z", &pacific),
            "Dec 31, 2023, 8:30 PM"
        );
    }

    #[test]
    fn test_midnight_and_noon() {
        assert_eq!(format_date_in("2024-03-09T00:05:00Z", &Utc), "Mar 9, 2024, 12:05 AM");
        assert_eq!(format_date_in("2024-03-09T12:00:00Z", &Utc), "Mar 9, 2024, 12:00 PM");
    }

    #[test]
    fn test_rfc2822() {
        assert_eq!(
            format_date_in("Mon, 09 Dec 2024 12:00:00 GMT", &Utc),
            "Dec 9, 2024, 12:00 PM"
        );
    }

    #[test]
    fn test_naive_datetime_is_wall_clock_in_viewer_zone() {
        let eastern = FixedOffset::west_opt(5 * 3600).unwrap();
        assert_eq!(
            format_date_in("2024-11-20T19:45:00", &eastern),
            "Nov 20, 2024, 7:45 PM"
        );
    }

    #[test]
    fn test_bare_date_is_utc_midnight() {
        assert_eq!(format_date_in("2024-07-04", &Utc), "Jul 4, 2024, 12:00 AM");

        let eastern = FixedOffset::west_opt(4 * 3600).unwrap();
        assert_eq!(format_date_in("2024-07-04", &eastern), "Jul 3, 2024, 8:00 PM");
    }

    #[test]
    fn test_fractional_seconds_and_whitespace() {
        assert_eq!(
            format_date_in("  2024-10-06T15:07:59.123456+00:00 ", &Utc),
            "Oct 6, 2024, 3:07 PM"
        );
    }

    #[test]
    fn test_unparseable_is_empty() {
        assert_eq!(format_date_in("not-a-date", &Utc), "");
        assert_eq!(format_date_in("", &Utc), "");
        assert_eq!(format_date_in("2024-13-45", &Utc), "");
    }

    /// US Eastern around the 2024-03-10 spring-forward transition.
    #[derive(Debug, Clone, Copy)]
    struct SpringForward;

    impl SpringForward {
        fn switch_utc() -> NaiveDateTime {
            NaiveDate::from_ymd_opt(2024, 3, 10)
                .unwrap()
                .and_hms_opt(7, 0, 0)
                .unwrap()
        }

        fn est() -> FixedOffset {
            FixedOffset::west_opt(5 * 3600).unwrap()
        }

        fn edt() -> FixedOffset {
            FixedOffset::west_opt(4 * 3600).unwrap()
        }
    }

    impl TimeZone for SpringForward {
        type Offset = FixedOffset;

        fn from_offset(_: &FixedOffset) -> Self {
            SpringForward
        }

        fn offset_from_local_date(&self, local: &NaiveDate) -> LocalResult<FixedOffset> {
            self.offset_from_local_datetime(&local.and_hms_opt(0, 0, 0).unwrap())
        }

        fn offset_from_local_datetime(&self, local: &NaiveDateTime) -> LocalResult<FixedOffset> {
            let gap_start = Self::switch_utc() - Duration::hours(5);
            let gap_end = gap_start + Duration::hours(1);
            if *local < gap_start {
                LocalResult::Single(Self::est())
            } else if *local >= gap_end {
                LocalResult::Single(Self::edt())
            } else {
                LocalResult::None
            }
        }

        fn offset_from_utc_date(&self, utc: &NaiveDate) -> FixedOffset {
            self.offset_from_utc_datetime(&utc.and_hms_opt(0, 0, 0).unwrap())
        }

        fn offset_from_utc_datetime(&self, utc: &NaiveDateTime) -> FixedOffset {
            if *utc < Self::switch_utc() {
                Self::est()
            } else {
                Self::edt()
            }
        }
    }

    #[test]
    fn test_wall_clock_in_dst_gap_moves_forward() {
        assert_eq!(
            format_date_in("2024-03-10T02:30:00", &SpringForward),
            "Mar 10, 2024, 3:30 AM"
        );
        assert_eq!(
            format_date_in("2024-03-10T01:59:00", &SpringForward),
            "Mar 10, 2024, 1:59 AM"
        );
        assert_eq!(
            format_date_in("2024-03-10T03:00:00", &SpringForward),
            "Mar 10, 2024, 3:00 AM"
        );
    }

    #[test]
    fn test_local_formatting_smoke() {
        assert_eq!(format_date_local("not-a-date"), "");
        assert!(!format_date_local("2024-10-06T15:07:00Z").is_empty());
    }
}
