//! Response bodies and query parameters of the calendar API.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use umi_core::{AvailabilityResult, CandidateSlot};

use crate::error::{ValidationError, ValidationResult};

/// Horizon used when `days` is not given.
pub const DEFAULT_DAYS: u32 = 7;

/// Largest accepted `days`.
pub const MAX_DAYS: u32 = 60;

/// Formats an instant in `tz` as ISO-8601 with offset.
pub fn format_instant(dt: DateTime<Utc>, tz: Tz) -> String {
    dt.with_timezone(&tz).to_rfc3339()
}

/// Parses the `days` query parameter, defaulting to [`DEFAULT_DAYS`].
pub fn parse_days(raw: Option<&str>) -> ValidationResult<u32> {
    parse_days_or(raw, DEFAULT_DAYS)
}

/// Parses the `days` query parameter with a deployment-specific default.
pub fn parse_days_or(raw: Option<&str>, default: u32) -> ValidationResult<u32> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(default);
    };
    let days: i64 = raw
        .parse()
        .map_err(|_| ValidationError::invalid("days", format!("`{raw}` is not an integer")))?;
    if !(1..=i64::from(MAX_DAYS)).contains(&days) {
        return Err(ValidationError::invalid(
            "days",
            format!("must be between 1 and {MAX_DAYS}"),
        ));
    }
    Ok(days as u32)
}

/// Query string of the availability endpoints.
///
/// `days` stays a string so a malformed value is reported as a validation
/// error rather than a generic extractor rejection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AvailabilityQuery {
    /// Horizon in days.
    #[serde(default)]
    pub days: Option<String>,
    /// Restrict to one calendar (single-calendar endpoint only).
    #[serde(default)]
    pub email: Option<String>,
    /// Owner of the calendar (single-calendar endpoint only).
    #[serde(default)]
    pub user: Option<String>,
}

impl AvailabilityQuery {
    /// Parsed horizon.
    pub fn days(&self) -> ValidationResult<u32> {
        parse_days(self.days.as_deref())
    }

    /// Parsed horizon, `default` when absent.
    pub fn days_or(&self, default: u32) -> ValidationResult<u32> {
        parse_days_or(self.days.as_deref(), default)
    }
}

/// One free slot on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotBody {
    /// Slot start, ISO-8601.
    pub start: String,
    /// Slot end, ISO-8601.
    pub end: String,
    /// Slot length.
    pub duration_minutes: i64,
}

impl SlotBody {
    /// Renders a slot in the active time zone.
    pub fn from_slot(slot: &CandidateSlot, tz: Tz) -> Self {
        Self {
            start: format_instant(slot.start(), tz),
            end: format_instant(slot.end(), tz),
            duration_minutes: slot.duration_minutes(),
        }
    }
}

/// What happened when one calendar was queried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CalendarOutcome {
    /// Busy periods were retrieved.
    Ok {
        /// Number of busy periods contributed.
        busy_periods: usize,
    },
    /// Retrieval failed; the calendar contributed nothing.
    Failed {
        /// Why it failed.
        reason: String,
    },
}

impl CalendarOutcome {
    /// Returns true for a failed retrieval.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Per-calendar line of the availability response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarReport {
    /// Calendar account email.
    pub email: String,
    /// Retrieval outcome.
    #[serde(flatten)]
    pub outcome: CalendarOutcome,
}

/// Body of `GET /api/calendar/all-availability`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    /// Free slots, chronological.
    pub available_slots: Vec<SlotBody>,
    /// Count of `available_slots`.
    pub total_slots: usize,
    /// Calendars attempted, failed ones included.
    pub calendars_processed: usize,
    /// Zone the working hours were read in.
    pub time_zone: String,
    /// Per-calendar outcomes, in store order.
    pub calendars: Vec<CalendarReport>,
}

impl AvailabilityResponse {
    /// Builds the response from an aggregation result.
    pub fn new(result: &AvailabilityResult, tz: Tz, calendars: Vec<CalendarReport>) -> Self {
        Self {
            available_slots: result
                .available_slots
                .iter()
                .map(|slot| SlotBody::from_slot(slot, tz))
                .collect(),
            total_slots: result.total_slots(),
            calendars_processed: result.calendars_processed,
            time_zone: result.time_zone.to_string(),
            calendars,
        }
    }
}

/// A busy interval of a single calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyEvent {
    /// Provider event id.
    pub id: String,
    /// Event title, `Busy` when untitled.
    pub summary: String,
    /// Start, ISO-8601.
    pub start: String,
    /// End, ISO-8601.
    pub end: String,
}

/// Body of `GET /api/calendar/availability`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarAvailabilityResponse {
    /// Calendar account email.
    pub email: String,
    /// Whether it is its owner's primary calendar.
    pub is_primary: bool,
    /// Provider calendar id.
    pub calendar_id: String,
    /// Raw busy intervals of this calendar.
    pub events: Vec<BusyEvent>,
    /// Free slots given only this calendar.
    pub available_slots: Vec<SlotBody>,
    /// Count of `available_slots`.
    pub total_slots: usize,
    /// Zone the working hours were read in.
    pub time_zone: String,
}

/// An event as listed by the admin events endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSummary {
    /// Provider event id.
    pub id: String,
    /// Title.
    pub summary: String,
    /// Start, ISO-8601 (date only for all-day events).
    pub start: String,
    /// End, ISO-8601 (date only for all-day events).
    pub end: String,
    /// Provider status, e.g. `confirmed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Link to the event in the provider UI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_link: Option<String>,
}

/// One calendar of the admin events listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvents {
    /// Calendar account email.
    pub email: String,
    /// Whether it is its owner's primary calendar.
    pub is_primary: bool,
    /// Provider calendar id.
    pub calendar_id: String,
    /// Owner.
    pub user: String,
    /// Events, when retrieval succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<EventSummary>>,
    /// Failure message, when retrieval failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Body of `GET /api/calendar/events`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventsResponse {
    /// Number of stored calendars.
    pub calendars_found: usize,
    /// Per-calendar listing.
    pub calendars: Vec<CalendarEvents>,
}

/// Body of `POST /api/calendar/set-primary`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetPrimaryRequest {
    /// Calendar account email.
    #[serde(default)]
    pub email: Option<String>,
    /// Owner; when omitted the email must identify a single calendar.
    #[serde(default)]
    pub user: Option<String>,
}

impl SetPrimaryRequest {
    /// The non-blank email.
    pub fn email(&self) -> ValidationResult<&str> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or(ValidationError::missing("email"))
    }
}

/// A plain `{"message": ...}` body, optionally echoing an email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Human-readable message.
    pub message: String,
    /// Email the message refers to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl MessageResponse {
    /// Creates a message body.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            email: None,
        }
    }

    /// Builder: attach an email.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Body of the health endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `ok` while the process serves requests.
    pub status: String,
}

impl HealthResponse {
    /// The healthy body.
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

/// Body of the version endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionResponse {
    /// Crate version.
    pub version: String,
}

/// Machine-readable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Bad request input.
    ValidationError,
    /// Missing or wrong API key.
    Unauthorized,
    /// No such calendar.
    NotFound,
    /// Anything else.
    InternalError,
}

impl ErrorCode {
    /// Returns a human-readable description of the error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::ValidationError => "The request was invalid",
            Self::Unauthorized => "Invalid or missing API key",
            Self::NotFound => "Requested resource not found",
            Self::InternalError => "An internal error occurred",
        }
    }
}

/// Error body returned with every non-2xx status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable message.
    pub error: String,
    /// Error category.
    pub code: ErrorCode,
    /// Underlying cause; only filled in debug deployments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    /// Creates an error body.
    pub fn new(code: ErrorCode, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code,
            details: None,
        }
    }

    /// Builder: attach details.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}
