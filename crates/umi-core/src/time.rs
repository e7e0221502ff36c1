//! Time intervals for slots and busy periods.
//!
//! [`TimeInterval`] is the single time primitive of the availability engine:
//! candidate slots and busy periods pulled from calendars are both
//! half-open `[start, end)` ranges in UTC.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Returned when an interval would not satisfy `start < end`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("interval start {start} is not before end {end}")]
pub struct EmptyIntervalError {
    /// Rejected start.
    pub start: DateTime<Utc>,
    /// Rejected end.
    pub end: DateTime<Utc>,
}

/// A half-open time range `[start, end)` in UTC.
///
/// Construction enforces `start < end`, including when deserializing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "IntervalBounds")]
pub struct TimeInterval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

#[derive(Deserialize)]
struct IntervalBounds {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TryFrom<IntervalBounds> for TimeInterval {
    type Error = EmptyIntervalError;

    fn try_from(bounds: IntervalBounds) -> Result<Self, Self::Error> {
        Self::new(bounds.start, bounds.end)
    }
}

impl TimeInterval {
    /// Creates an interval, rejecting empty or inverted ranges.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, EmptyIntervalError> {
        if start < end {
            Ok(Self { start, end })
        } else {
            Err(EmptyIntervalError { start, end })
        }
    }

    /// Creates an interval from a start and a positive duration.
    pub fn from_duration(
        start: DateTime<Utc>,
        duration: Duration,
    ) -> Result<Self, EmptyIntervalError> {
        Self::new(start, start + duration)
    }

    /// Inclusive start.
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Exclusive end.
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Length of the interval.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Length in whole minutes.
    pub fn duration_minutes(&self) -> i64 {
        self.duration().num_minutes()
    }

    /// Standard half-open overlap: touching endpoints do not overlap.
    pub fn overlaps(&self, other: &TimeInterval) -> bool {
        self.start < other.end && self.end > other.start
    }

    /// Smallest interval covering both `self` and `other`.
    pub fn span(&self, other: &TimeInterval) -> TimeInterval {
        TimeInterval {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// A timestamp as written, before any time zone is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedTime {
    /// RFC 3339 with an offset or `Z`.
    Instant(DateTime<Utc>),
    /// Wall-clock date-time without an offset.
    Local(NaiveDateTime),
    /// A bare date.
    Date(NaiveDate),
}

impl ParsedTime {
    /// Reads wall-clock values in `tz`; dates become local midnight.
    ///
    /// Returns `None` for a local time skipped by a DST transition.
    pub fn resolve(&self, tz: Tz) -> Option<DateTime<Utc>> {
        match *self {
            Self::Instant(dt) => Some(dt),
            Self::Local(naive) => resolve_local(&naive, tz),
            Self::Date(date) => resolve_local(&date.and_hms_opt(0, 0, 0)?, tz),
        }
    }
}

/// Parses an ISO-8601 timestamp without resolving it.
///
/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM[:SS[.f]]` and `YYYY-MM-DD`.
pub fn parse_time(raw: &str) -> Option<ParsedTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(ParsedTime::Instant(dt.with_timezone(&Utc)));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
    {
        return Some(ParsedTime::Local(naive));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(ParsedTime::Date)
}

/// The instant of a wall-clock time in `tz`, the earlier one when ambiguous.
pub fn resolve_local(naive: &NaiveDateTime, tz: Tz) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parses an ISO-8601 timestamp into UTC.
///
/// See [`parse_time`] for the accepted forms; wall-clock values are read in
/// `tz`.
pub fn parse_datetime(raw: &str, tz: Tz) -> Option<DateTime<Utc>> {
    parse_time(raw)?.resolve(tz)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 5, h, min, 0).unwrap()
    }

    fn interval(sh: u32, sm: u32, eh: u32, em: u32) -> TimeInterval {
        TimeInterval::new(utc(sh, sm), utc(eh, em)).unwrap()
    }

    #[test]
    fn rejects_empty_and_inverted() {
        assert!(TimeInterval::new(utc(10, 0), utc(10, 0)).is_err());
        let err = TimeInterval::new(utc(11, 0), utc(10, 0)).unwrap_err();
        assert_eq!(err.start, utc(11, 0));
        assert!(TimeInterval::from_duration(utc(10, 0), Duration::zero()).is_err());
    }

    #[test]
    fn duration_in_minutes() {
        assert_eq!(interval(9, 0, 10, 0).duration_minutes(), 60);
        assert_eq!(interval(13, 0, 14, 30).duration(), Duration::minutes(90));
    }

    #[test]
    fn overlap_cases() {
        let busy = interval(10, 0, 11, 0);

        assert!(interval(10, 0, 11, 0).overlaps(&busy));
        assert!(interval(9, 30, 10, 30).overlaps(&busy));
        assert!(interval(10, 30, 11, 30).overlaps(&busy));
        assert!(interval(9, 0, 12, 0).overlaps(&busy));
        assert!(interval(10, 15, 10, 45).overlaps(&busy));

        // Touching boundaries
        assert!(!interval(9, 0, 10, 0).overlaps(&busy));
        assert!(!interval(11, 0, 12, 0).overlaps(&busy));
    }

    #[test]
    fn span_covers_both() {
        let a = interval(9, 0, 10, 0);
        let b = interval(15, 0, 16, 0);
        assert_eq!(a.span(&b), interval(9, 0, 16, 0));
    }

    #[test]
    fn parses_offsets_naive_and_dates() {
        let ny = chrono_tz::America::New_York;
        assert_eq!(parse_datetime("2025-02-05T09:00:00Z", ny), Some(utc(9, 0)));
        assert_eq!(
            parse_datetime("2025-02-05T10:00:00+01:00", Tz::UTC),
            Some(utc(9, 0))
        );
        assert_eq!(parse_datetime("2025-02-05T04:00:00", ny), Some(utc(9, 0)));
        assert_eq!(
            parse_datetime("2025-02-05T04:00:00.250", ny),
            Some(utc(9, 0) + Duration::milliseconds(250))
        );
        assert_eq!(parse_datetime("2025-02-05T09:30", Tz::UTC), Some(utc(9, 30)));
        assert_eq!(parse_datetime("2025-02-05", ny), Some(utc(5, 0)));
        assert_eq!(parse_datetime("tomorrow", ny), None);
        // 02:30 does not exist in New York on this day
        assert_eq!(parse_datetime("2025-03-09T02:30:00", ny), None);
    }

    #[test]
    fn parsed_time_keeps_its_form() {
        assert!(matches!(parse_time("2025-02-05T09:30"), Some(ParsedTime::Local(_))));
        assert!(matches!(parse_time("2025-02-05"), Some(ParsedTime::Date(_))));
        assert_eq!(
            parse_time("2025-02-05T09:00:00Z"),
            Some(ParsedTime::Instant(utc(9, 0)))
        );
        // 01:30 happens twice in New York on this day
        let ny = chrono_tz::America::New_York;
        let twice = parse_time("2025-11-02T01:30:00").unwrap();
        assert_eq!(
            twice.resolve(ny),
            Some(Utc.with_ymd_and_hms(2025, 11, 2, 5, 30, 0).unwrap())
        );
    }

    #[test]
    fn deserialize_enforces_invariant() {
        let ok: TimeInterval = serde_json::from_str(
            r#"{"start":"2025-02-05T09:00:00Z","end":"2025-02-05T10:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(ok, interval(9, 0, 10, 0));

        let bad = serde_json::from_str::<TimeInterval>(
            r#"{"start":"2025-02-05T10:00:00Z","end":"2025-02-05T09:00:00Z"}"#,
        );
        assert!(bad.is_err());
    }
}
