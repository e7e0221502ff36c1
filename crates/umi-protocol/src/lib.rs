//! Request and response types of the UMI HTTP API.
//!
//! Everything that crosses the wire lives here: query parsing, booking
//! validation, and the JSON bodies returned by the server. Validation
//! failures are reported as [`ValidationError`], which the server maps to
//! HTTP 400.
//!
//! # Example
//!
//! ```rust
//! use umi_protocol::parse_days;
//!
//! assert_eq!(parse_days(None).unwrap(), 7);
//! assert!(parse_days(Some("61")).is_err());
//! ```

mod booking;
mod error;
mod types;

pub use booking::{
    BookMeetingRequest, BookMeetingResponse, CreatedEvent, DEFAULT_DURATION_MINUTES,
    MAX_DURATION_MINUTES, MAX_SUMMARY_CHARS, MIN_DURATION_MINUTES, ValidatedBooking,
    is_valid_email,
};
pub use error::{ValidationError, ValidationResult};
pub use types::{
    AvailabilityQuery, AvailabilityResponse, BusyEvent, CalendarAvailabilityResponse,
    CalendarEvents, CalendarOutcome, CalendarReport, DEFAULT_DAYS, ErrorCode, ErrorResponse,
    EventSummary, EventsResponse, HealthResponse, MAX_DAYS, MessageResponse, SetPrimaryRequest,
    SlotBody, VersionResponse, format_instant, parse_days,
    parse_days_or,
};
