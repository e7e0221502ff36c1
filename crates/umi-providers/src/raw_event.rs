//! Raw event type from calendar providers.
//!
//! [`RawEvent`] is an event as a provider hands it over, before its times
//! are resolved against the configured time zone and it becomes a busy
//! period (see [`crate::normalize`]).

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use umi_core::{ParsedTime, parse_time};

/// The time specification for a raw event.
///
/// Providers return an instant with an offset, a wall-clock time without
/// one, or a bare date for all-day events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum RawEventTime {
    /// An absolute instant.
    DateTime(DateTime<Utc>),
    /// A wall-clock time with no offset.
    Floating(NaiveDateTime),
    /// An all-day date.
    Date(NaiveDate),
}

impl RawEventTime {
    /// Parses a provider time string, with the grammar of
    /// [`umi_core::parse_time`].
    pub fn parse(raw: &str) -> Option<Self> {
        parse_time(raw).map(Self::from)
    }

    /// Returns true if this is an all-day event time.
    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::Date(_))
    }

    /// Resolves to an instant, reading wall-clock values in `tz`.
    ///
    /// Dates resolve to local midnight. Returns `None` for a wall-clock time
    /// skipped by a DST transition.
    pub fn resolve(&self, tz: Tz) -> Option<DateTime<Utc>> {
        ParsedTime::from(*self).resolve(tz)
    }

    /// Renders the time for display, instants in `tz`.
    pub fn display_in(&self, tz: Tz) -> String {
        match self {
            Self::DateTime(dt) => dt.with_timezone(&tz).to_rfc3339(),
            Self::Floating(naive) => naive.format("%Y-%m-%dT%H:%M:%S").to_string(),
            Self::Date(date) => date.format("%Y-%m-%d").to_string(),
        }
    }
}

impl From<ParsedTime> for RawEventTime {
    fn from(parsed: ParsedTime) -> Self {
        match parsed {
            ParsedTime::Instant(dt) => Self::DateTime(dt),
            ParsedTime::Local(naive) => Self::Floating(naive),
            ParsedTime::Date(date) => Self::Date(date),
        }
    }
}

impl From<RawEventTime> for ParsedTime {
    fn from(time: RawEventTime) -> Self {
        match time {
            RawEventTime::DateTime(dt) => Self::Instant(dt),
            RawEventTime::Floating(naive) => Self::Local(naive),
            RawEventTime::Date(date) => Self::Date(date),
        }
    }
}

impl From<DateTime<Utc>> for RawEventTime {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::DateTime(dt)
    }
}

/// A raw calendar event from a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Unique identifier for the event within the provider.
    pub id: String,
    /// When the event starts.
    pub start: RawEventTime,
    /// When the event ends.
    pub end: RawEventTime,
    /// The event title.
    pub summary: Option<String>,
    /// The event status (`confirmed`, `tentative`, `cancelled`).
    pub status: Option<String>,
    /// A direct link to the event in the calendar UI.
    pub html_link: Option<String>,
}

impl RawEvent {
    /// Creates a new raw event with the minimum required fields.
    pub fn new(id: impl Into<String>, start: RawEventTime, end: RawEventTime) -> Self {
        Self {
            id: id.into(),
            start,
            end,
            summary: None,
            status: None,
            html_link: None,
        }
    }

    /// Returns the title, falling back to `Busy` when absent or blank.
    pub fn effective_title(&self) -> &str {
        self.summary
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or("Busy")
    }

    /// Returns true if the event is cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.status
            .as_ref()
            .is_some_and(|s| s.eq_ignore_ascii_case("cancelled"))
    }

    /// Returns true if this is an all-day event.
    pub fn is_all_day(&self) -> bool {
        self.start.is_all_day()
    }

    /// Builder method to set the summary.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Builder method to set the status.
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Builder method to set the HTML link.
    pub fn with_html_link(mut self, html_link: impl Into<String>) -> Self {
        self.html_link = Some(html_link.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_each_shape() {
        assert!(matches!(
            RawEventTime::parse("2025-02-05T10:00:00-05:00"),
            Some(RawEventTime::DateTime(_))
        ));
        assert!(matches!(
            RawEventTime::parse("2025-02-05T10:00:00Z"),
            Some(RawEventTime::DateTime(_))
        ));
        assert!(matches!(
            RawEventTime::parse("2025-02-05T10:00:00.500"),
            Some(RawEventTime::Floating(_))
        ));
        assert!(matches!(
            RawEventTime::parse("2025-02-05"),
            Some(RawEventTime::Date(_))
        ));
        assert_eq!(RawEventTime::parse("soon"), None);
    }

    #[test]
    fn agrees_with_core_parser() {
        let ny = chrono_tz::America::New_York;
        for raw in ["2025-02-05T10:00", "2025-02-05T10:00:00Z", "2025-02-05", "2025-13-01"] {
            assert_eq!(
                RawEventTime::parse(raw).and_then(|t| t.resolve(ny)),
                umi_core::parse_datetime(raw, ny),
                "{raw}"
            );
        }
        assert!(matches!(
            RawEventTime::parse("2025-02-05T10:00"),
            Some(RawEventTime::Floating(_))
        ));
    }

    #[test]
    fn resolves_in_zone() {
        let ny = chrono_tz::America::New_York;
        let floating = RawEventTime::parse("2025-02-05T10:00:00").unwrap();
        assert_eq!(
            floating.resolve(ny),
            Some(Utc.with_ymd_and_hms(2025, 2, 5, 15, 0, 0).unwrap())
        );

        let date = RawEventTime::parse("2025-02-05").unwrap();
        assert!(date.is_all_day());
        assert_eq!(
            date.resolve(ny),
            Some(Utc.with_ymd_and_hms(2025, 2, 5, 5, 0, 0).unwrap())
        );

        let absolute = RawEventTime::parse("2025-02-05T10:00:00+01:00").unwrap();
        assert_eq!(
            absolute.resolve(ny),
            Some(Utc.with_ymd_and_hms(2025, 2, 5, 9, 0, 0).unwrap())
        );
    }

    #[test]
    fn display_keeps_dates_and_converts_instants() {
        let ny = chrono_tz::America::New_York;
        let absolute = RawEventTime::from(Utc.with_ymd_and_hms(2025, 2, 5, 15, 0, 0).unwrap());
        assert_eq!(absolute.display_in(ny), "2025-02-05T10:00:00-05:00");
        assert_eq!(
            RawEventTime::parse("2025-02-05").unwrap().display_in(ny),
            "2025-02-05"
        );
    }

    #[test]
    fn title_and_status() {
        let at = RawEventTime::from(Utc.with_ymd_and_hms(2025, 2, 5, 15, 0, 0).unwrap());
        let event = RawEvent::new("e1", at, at);
        assert_eq!(event.effective_title(), "Busy");
        assert!(!event.is_cancelled());

        let event = event.with_summary("Standup").with_status("CANCELLED");
        assert_eq!(event.effective_title(), "Standup");
        assert!(event.is_cancelled());
    }
}
