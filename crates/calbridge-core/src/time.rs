//! Time handling for the bridge.
//!
//! [`LocalZone`] interprets timezone-less wall-clock strings in the single
//! configured zone, [`parse_range_bound`] reads the offset-bearing bounds of a
//! range query, and [`TimeWindow`] carries the UTC interval handed to the
//! calendar store.

use chrono::{
    DateTime, Duration, FixedOffset, LocalResult, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc,
};
use chrono_tz::Tz;
use thiserror::Error;

/// Errors produced while interpreting time inputs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeError {
    /// The string is not a date-time in an accepted form.
    #[error("invalid date-time '{input}': {reason}")]
    InvalidDateTime { input: String, reason: String },

    /// The IANA zone identifier is not known.
    #[error("unknown timezone '{0}'")]
    UnknownTimezone(String),
}

impl TimeError {
    fn invalid(input: &str, reason: impl Into<String>) -> Self {
        Self::InvalidDateTime {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// Wall-clock forms accepted for local and offset-less inputs.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Offset-bearing forms that RFC 3339 parsing rejects (missing seconds).
const OFFSET_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M%:z", "%Y-%m-%dT%H:%M%z", "%Y-%m-%d %H:%M%:z"];

fn parse_naive(input: &str) -> Result<NaiveDateTime, TimeError> {
    let trimmed = input.trim();
    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(dt);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date.and_time(chrono::NaiveTime::MIN));
    }
    Err(TimeError::invalid(
        input,
        "expected YYYY-MM-DDTHH:MM[:SS] without offset",
    ))
}

/// The process-wide zone used to interpret local wall-clock times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalZone(Tz);

impl LocalZone {
    /// Resolves an IANA zone identifier such as `America/Chicago`.
    pub fn from_name(name: &str) -> Result<Self, TimeError> {
        name.trim()
            .parse::<Tz>()
            .map(Self)
            .map_err(|_| TimeError::UnknownTimezone(name.to_string()))
    }

    /// Returns the IANA identifier, used as the `TZID` of encoded events.
    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    /// Interprets a timezone-less date-time string as wall-clock time here.
    ///
    /// Accepts `YYYY-MM-DDTHH:MM`, optional seconds and fractional seconds,
    /// a space in place of `T`, or a bare date (midnight). Strings carrying an
    /// offset are rejected.
    pub fn to_instant(&self, local: &str) -> Result<DateTime<Tz>, TimeError> {
        parse_naive(local).map(|naive| self.attach(naive))
    }

    /// Attaches this zone to a naive wall-clock time.
    ///
    /// A repeated wall-clock time (DST fall-back) resolves to the earlier
    /// instant. A skipped one (DST spring-forward) keeps the offset that was
    /// in force before the transition.
    pub fn attach(&self, naive: NaiveDateTime) -> DateTime<Tz> {
        match self.0.from_local_datetime(&naive) {
            LocalResult::Single(dt) => dt,
            LocalResult::Ambiguous(earliest, _) => earliest,
            LocalResult::None => {
                let before = self
                    .0
                    .from_utc_datetime(&(naive - Duration::days(1)))
                    .offset()
                    .fix();
                let utc = naive - Duration::seconds(i64::from(before.local_minus_utc()));
                self.0.from_utc_datetime(&utc)
            }
        }
    }
}

impl Default for LocalZone {
    fn default() -> Self {
        Self(chrono_tz::America::Chicago)
    }
}

impl std::fmt::Display for LocalZone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Parses one bound of a range query into an absolute instant.
///
/// The offset of the input is preserved; a trailing `Z` means UTC. A bound
/// without any offset is read as UTC.
pub fn parse_range_bound(input: &str) -> Result<DateTime<FixedOffset>, TimeError> {
    let trimmed = input.trim();
    let normalized = match trimmed.strip_suffix(['Z', 'z']) {
        Some(rest) => format!("{rest}+00:00"),
        None => trimmed.to_string(),
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(&normalized) {
        return Ok(dt);
    }
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&normalized, format) {
            return Ok(dt);
        }
    }

    parse_naive(trimmed)
        .map(|naive| naive.and_utc().fixed_offset())
        .map_err(|_| TimeError::invalid(input, "expected an ISO-8601 date-time"))
}

/// A UTC interval used to query the calendar store.
///
/// Inverted or empty windows are kept as given; the store decides what
/// they match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    /// Start of the window.
    pub start: DateTime<Utc>,
    /// End of the window.
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Builds a window from bounds expressed in any zone.
    pub fn from_bounds<A: TimeZone, B: TimeZone>(start: &DateTime<A>, end: &DateTime<B>) -> Self {
        Self::new(start.with_timezone(&Utc), end.with_timezone(&Utc))
    }

    /// Window reaching `days` before and after `now`.
    pub fn around(now: DateTime<Utc>, days: i64) -> Self {
        let span = Duration::days(days);
        Self::new(now - span, now + span)
    }

    pub fn is_inverted(&self) -> bool {
        self.start > self.end
    }

    /// Checks whether an event spanning `[start, end)` overlaps the window.
    ///
    /// Zero-length events overlap when they sit inside `[start, end)`.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        if start == end {
            return self.start <= start && start < self.end;
        }
        start < self.end && end > self.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    fn chicago() -> LocalZone {
        LocalZone::from_name("America/Chicago").unwrap()
    }

    mod local_zone {
        use super::*;

        #[test]
        fn resolves_known_zone() {
            let zone = LocalZone::from_name("Europe/Paris").unwrap();
            assert_eq!(zone.name(), "Europe/Paris");
            assert_eq!(zone.to_string(), "Europe/Paris");
        }

        #[test]
        fn rejects_unknown_zone() {
            let err = LocalZone::from_name("Mars/Olympus").unwrap_err();
            assert_eq!(err, TimeError::UnknownTimezone("Mars/Olympus".into()));
        }

        #[test]
        fn default_is_chicago() {
            assert_eq!(LocalZone::default(), chicago());
        }

        #[test]
        fn standup_is_central_daylight_time() {
            let start = chicago().to_instant("2025-08-10T09:00").unwrap();
            assert_eq!(start.to_rfc3339(), "2025-08-10T09:00:00-05:00");
            assert_eq!(start.with_timezone(&Utc), utc(2025, 8, 10, 14, 0, 0));
        }

        #[test]
        fn wall_clock_is_preserved() {
            let zone = chicago();
            for input in ["2025-01-15T08:30", "2025-07-04T23:59:59", "2024-02-29T00:00"] {
                let instant = zone.to_instant(input).unwrap();
                let back = instant.naive_local();
                assert_eq!(back, parse_naive(input).unwrap(), "input {input}");
            }
        }

        #[test]
        fn winter_uses_standard_offset() {
            let start = chicago().to_instant("2025-01-15T09:00:00").unwrap();
            assert_eq!(start.to_rfc3339(), "2025-01-15T09:00:00-06:00");
        }

        #[test]
        fn accepts_space_separator_and_bare_date() {
            let zone = chicago();
            assert_eq!(
                zone.to_instant("2025-08-10 09:00").unwrap(),
                zone.to_instant("2025-08-10T09:00").unwrap()
            );
            assert_eq!(
                zone.to_instant("2025-08-10").unwrap().to_rfc3339(),
                "2025-08-10T00:00:00-05:00"
            );
        }

        #[test]
        fn rejects_malformed_and_offset_inputs() {
            let zone = chicago();
            for input in ["", "tomorrow", "2025-13-01T09:00", "2025-08-10T09:00Z", "10/08/2025"] {
                assert!(
                    matches!(zone.to_instant(input), Err(TimeError::InvalidDateTime { .. })),
                    "input {input:?}"
                );
            }
        }

        #[test]
        fn ambiguous_time_takes_earlier_instant() {
            // 01:30 happens twice on 2025-11-02 in Chicago.
            let instant = chicago().to_instant("2025-11-02T01:30").unwrap();
            assert_eq!(instant.to_rfc3339(), "2025-11-02T01:30:00-05:00");
        }

        #[test]
        fn skipped_time_keeps_previous_offset() {
            // 02:30 does not exist on 2025-03-09 in Chicago.
            let instant = chicago().to_instant("2025-03-09T02:30").unwrap();
            assert_eq!(instant.with_timezone(&Utc), utc(2025, 3, 9, 8, 30, 0));
        }
    }

    mod range_bound {
        use super::*;

        #[test]
        fn accepts_zulu_suffix() {
            let dt = parse_range_bound("2025-08-01T00:00:00Z").unwrap();
            assert_eq!(dt.offset().local_minus_utc(), 0);
            assert_eq!(dt.with_timezone(&Utc), utc(2025, 8, 1, 0, 0, 0));
        }

        #[test]
        fn preserves_offset() {
            let dt = parse_range_bound("2025-08-10T09:00:00-05:00").unwrap();
            assert_eq!(dt.offset().local_minus_utc(), -5 * 3600);
            assert_eq!(dt.with_timezone(&Utc), utc(2025, 8, 10, 14, 0, 0));
        }

        #[test]
        fn accepts_minutes_only_with_offset() {
            let dt = parse_range_bound("2025-08-10T09:00+02:00").unwrap();
            assert_eq!(dt.with_timezone(&Utc), utc(2025, 8, 10, 7, 0, 0));
        }

        #[test]
        fn offsetless_bound_is_utc() {
            let dt = parse_range_bound("2025-08-10T09:00:00").unwrap();
            assert_eq!(dt.with_timezone(&Utc), utc(2025, 8, 10, 9, 0, 0));
            let date = parse_range_bound("2025-08-10").unwrap();
            assert_eq!(date.with_timezone(&Utc), utc(2025, 8, 10, 0, 0, 0));
        }

        #[test]
        fn rejects_garbage() {
            let err = parse_range_bound("not-a-date").unwrap_err();
            assert!(err.to_string().contains("not-a-date"));
        }
    }

    mod time_window {
        use super::*;

        #[test]
        fn from_bounds_converts_to_utc() {
            let start = parse_range_bound("2025-08-10T09:00:00-05:00").unwrap();
            let end = parse_range_bound("2025-08-10T16:00:00Z").unwrap();
            let window = TimeWindow::from_bounds(&start, &end);
            assert_eq!(window.start, utc(2025, 8, 10, 14, 0, 0));
            assert_eq!(window.end, utc(2025, 8, 10, 16, 0, 0));
            assert!(!window.is_inverted());
        }

        #[test]
        fn around_spans_both_directions() {
            let now = utc(2025, 6, 1, 12, 0, 0);
            let window = TimeWindow::around(now, 180);
            assert_eq!(window.start, now - Duration::days(180));
            assert_eq!(window.end, now + Duration::days(180));
        }

        #[test]
        fn inverted_window_is_kept() {
            let window = TimeWindow::new(utc(2025, 2, 5, 17, 0, 0), utc(2025, 2, 5, 9, 0, 0));
            assert!(window.is_inverted());
            assert!(!window.overlaps(utc(2025, 2, 5, 10, 0, 0), utc(2025, 2, 5, 11, 0, 0)));
        }

        #[test]
        fn overlaps() {
            let window = TimeWindow::new(utc(2025, 2, 5, 9, 0, 0), utc(2025, 2, 5, 17, 0, 0));

            assert!(window.overlaps(utc(2025, 2, 5, 10, 0, 0), utc(2025, 2, 5, 11, 0, 0)));
            assert!(window.overlaps(utc(2025, 2, 5, 8, 0, 0), utc(2025, 2, 5, 10, 0, 0)));
            assert!(window.overlaps(utc(2025, 2, 5, 8, 0, 0), utc(2025, 2, 5, 18, 0, 0)));

            // Touching edges do not overlap
            assert!(!window.overlaps(utc(2025, 2, 5, 8, 0, 0), utc(2025, 2, 5, 9, 0, 0)));
            assert!(!window.overlaps(utc(2025, 2, 5, 17, 0, 0), utc(2025, 2, 5, 18, 0, 0)));

            // Zero-length
            assert!(window.overlaps(utc(2025, 2, 5, 9, 0, 0), utc(2025, 2, 5, 9, 0, 0)));
            assert!(!window.overlaps(utc(2025, 2, 5, 17, 0, 0), utc(2025, 2, 5, 17, 0, 0)));
        }
    }
}
