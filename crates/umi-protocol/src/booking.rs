//! Meeting booking requests.

use std::sync::LazyLock;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use regex::Regex;
use serde::{Deserialize, Serialize};
use umi_core::{TimeInterval, parse_datetime};

use crate::error::{ValidationError, ValidationResult};

/// Meeting length used when `duration_minutes` is absent.
pub const DEFAULT_DURATION_MINUTES: i64 = 60;
/// Shortest bookable meeting.
pub const MIN_DURATION_MINUTES: i64 = 15;
/// Longest bookable meeting.
pub const MAX_DURATION_MINUTES: i64 = 480;
/// Longest accepted summary, in characters.
pub const MAX_SUMMARY_CHARS: usize = 200;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid regex"));

/// Body of `POST /api/calendar/book`, as sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookMeetingRequest {
    /// Meeting start, ISO-8601.
    #[serde(default)]
    pub start_time: Option<String>,
    /// Meeting length in minutes.
    #[serde(default)]
    pub duration_minutes: Option<i64>,
    /// Event title.
    #[serde(default)]
    pub summary: Option<String>,
    /// Event body.
    #[serde(default)]
    pub description: Option<String>,
    /// Guests to invite.
    #[serde(default)]
    pub attendees: Option<Vec<String>>,
}

/// A booking that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedBooking {
    /// When the meeting takes place.
    pub interval: TimeInterval,
    /// Trimmed title.
    pub summary: String,
    /// Body, if any.
    pub description: Option<String>,
    /// Guest emails.
    pub attendees: Vec<String>,
}

impl ValidatedBooking {
    /// Meeting length.
    pub fn duration_minutes(&self) -> i64 {
        self.interval.duration_minutes()
    }
}

impl BookMeetingRequest {
    /// Checks the request against `now`.
    ///
    /// Naive start times are read in `tz`.
    pub fn validate(&self, now: DateTime<Utc>, tz: Tz) -> ValidationResult<ValidatedBooking> {
        let raw_start = self
            .start_time
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or(ValidationError::missing("start_time"))?;
        let start = parse_datetime(raw_start, tz).ok_or_else(|| {
            ValidationError::invalid("start_time", format!("`{raw_start}` is not ISO-8601"))
        })?;
        if start < now {
            return Err(ValidationError::invalid(
                "start_time",
                "cannot book meetings in the past",
            ));
        }

        let minutes = self.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES);
        if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&minutes) {
            return Err(ValidationError::invalid(
                "duration_minutes",
                format!("must be between {MIN_DURATION_MINUTES} and {MAX_DURATION_MINUTES}"),
            ));
        }
        let interval = TimeInterval::from_duration(start, Duration::minutes(minutes))
            .map_err(|e| ValidationError::invalid("duration_minutes", e.to_string()))?;

        let summary = self
            .summary
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(ValidationError::missing("summary"))?;
        if summary.chars().count() > MAX_SUMMARY_CHARS {
            return Err(ValidationError::invalid(
                "summary",
                format!("must be at most {MAX_SUMMARY_CHARS} characters"),
            ));
        }

        let attendees = self.attendees.clone().unwrap_or_default();
        if let Some(bad) = attendees.iter().find(|a| !is_valid_email(a)) {
            return Err(ValidationError::invalid(
                "attendees",
                format!("`{bad}` is not a valid email"),
            ));
        }

        Ok(ValidatedBooking {
            interval,
            summary: summary.to_string(),
            description: self.description.clone().filter(|d| !d.trim().is_empty()),
            attendees,
        })
    }
}

/// Loose address check: one `@`, no whitespace, a dot in the domain.
pub fn is_valid_email(candidate: &str) -> bool {
    EMAIL_RE.is_match(candidate)
}

/// The created event as echoed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedEvent {
    /// Provider event id.
    pub id: String,
    /// Title.
    pub summary: String,
    /// Start, ISO-8601.
    pub start: String,
    /// End, ISO-8601.
    pub end: String,
    /// Link to the event in the provider UI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_link: Option<String>,
}

/// Body returned after a successful booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookMeetingResponse {
    /// Confirmation message.
    pub message: String,
    /// What was created.
    pub event: CreatedEvent,
    /// Calendar the event was created on.
    pub calendar_email: String,
    /// Meeting length.
    pub duration_minutes: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 5, 8, 30, 0).unwrap()
    }

    fn request(start: &str) -> BookMeetingRequest {
        BookMeetingRequest {
            start_time: Some(start.to_string()),
            summary: Some("Intro call".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_to_one_hour() {
        let booking = request("2025-02-05T10:00:00Z").validate(now(), Tz::UTC).unwrap();
        assert_eq!(booking.duration_minutes(), 60);
        assert_eq!(
            booking.interval.end(),
            Utc.with_ymd_and_hms(2025, 2, 5, 11, 0, 0).unwrap()
        );
        assert!(booking.attendees.is_empty());
        assert_eq!(booking.description, None);
    }

    #[test]
    fn naive_start_read_in_zone() {
        let booking = request("2025-02-05T09:00:00")
            .validate(now(), chrono_tz::America::New_York)
            .unwrap();
        assert_eq!(
            booking.interval.start(),
            Utc.with_ymd_and_hms(2025, 2, 5, 14, 0, 0).unwrap()
        );
    }

    #[test]
    fn rejects_past_and_garbage_start() {
        let past = request("2025-02-05T08:00:00Z").validate(now(), Tz::UTC);
        assert_eq!(past.unwrap_err().field(), "start_time");

        let garbage = request("next tuesday").validate(now(), Tz::UTC);
        assert_eq!(garbage.unwrap_err().field(), "start_time");

        let missing = BookMeetingRequest::default().validate(now(), Tz::UTC);
        assert_eq!(missing, Err(ValidationError::missing("start_time")));
    }

    #[test]
    fn duration_bounds() {
        for (minutes, ok) in [(14, false), (15, true), (480, true), (481, false)] {
            let mut req = request("2025-02-05T10:00:00Z");
            req.duration_minutes = Some(minutes);
            assert_eq!(req.validate(now(), Tz::UTC).is_ok(), ok, "{minutes} minutes");
        }
    }

    #[test]
    fn summary_rules() {
        let mut req = request("2025-02-05T10:00:00Z");
        req.summary = Some("   ".to_string());
        assert_eq!(
            req.validate(now(), Tz::UTC),
            Err(ValidationError::missing("summary"))
        );

        req.summary = Some("x".repeat(201));
        assert_eq!(req.validate(now(), Tz::UTC).unwrap_err().field(), "summary");

        req.summary = Some("é".repeat(200));
        assert!(req.validate(now(), Tz::UTC).is_ok());
    }

    #[test]
    fn attendee_emails_checked() {
        let mut req = request("2025-02-05T10:00:00Z");
        req.attendees = Some(vec!["ada@example.com".to_string(), "nope".to_string()]);
        let err = req.validate(now(), Tz::UTC).unwrap_err();
        assert_eq!(err.field(), "attendees");
        assert!(err.to_string().contains("nope"));

        assert!(is_valid_email("first.last+tag@sub.example.org"));
        assert!(!is_valid_email("a b@example.com"));
        assert!(!is_valid_email("a@example"));
    }
}
