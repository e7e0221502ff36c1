//! CalendarProvider trait definition.
//!
//! A [`CalendarProvider`] is one connected calendar: it lists the events in
//! a window and, when the backend allows it, creates new ones.

use std::future::Future;
use std::pin::Pin;

use chrono_tz::Tz;
use umi_core::TimeInterval;

use crate::error::{ProviderError, ProviderResult};
use crate::raw_event::RawEvent;

/// A boxed future for async trait methods.
///
/// Keeps the trait object-safe so the server can hold `Box<dyn CalendarProvider>`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// An event to be created on a calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    /// When the event takes place.
    pub interval: TimeInterval,
    /// Title.
    pub summary: String,
    /// Body.
    pub description: Option<String>,
    /// Guests to invite; the backend notifies them.
    pub attendees: Vec<String>,
    /// Zone the event times are written in.
    pub time_zone: Tz,
}

impl NewEvent {
    /// Creates an event with no description or guests.
    pub fn new(interval: TimeInterval, summary: impl Into<String>) -> Self {
        Self {
            interval,
            summary: summary.into(),
            description: None,
            attendees: Vec::new(),
            time_zone: Tz::UTC,
        }
    }

    /// Builder method to set the description.
    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    /// Builder method to set the guests.
    pub fn with_attendees(mut self, attendees: Vec<String>) -> Self {
        self.attendees = attendees;
        self
    }

    /// Builder method to set the time zone.
    pub fn with_time_zone(mut self, tz: Tz) -> Self {
        self.time_zone = tz;
        self
    }
}

/// One connected calendar.
///
/// Implementations must be `Send + Sync`: the aggregator polls several
/// providers concurrently from one task.
pub trait CalendarProvider: Send + Sync {
    /// Identity used in logs and reports, usually the account email.
    fn name(&self) -> &str;

    /// Backend calendar id.
    fn calendar_id(&self) -> &str;

    /// Lists the events overlapping `window`, pagination included.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` on network errors, authentication failures, etc.
    fn list_events(&self, window: TimeInterval) -> BoxFuture<'_, ProviderResult<Vec<RawEvent>>>;

    /// Creates an event and returns it as stored by the backend.
    ///
    /// The default implementation reports an unsupported operation.
    fn create_event(&self, _event: NewEvent) -> BoxFuture<'_, ProviderResult<RawEvent>> {
        Box::pin(async {
            Err(ProviderError::unsupported(
                "event creation is not supported by this provider",
            ))
        })
    }
}

/// A provider that always returns an error.
///
/// Stands in for a calendar whose credentials could not be loaded, so the
/// failure is reported through the normal per-calendar path.
#[derive(Debug)]
pub struct ErrorProvider {
    name: String,
    calendar_id: String,
    error: ProviderError,
}

impl ErrorProvider {
    /// Creates a new error provider.
    pub fn new(name: impl Into<String>, calendar_id: impl Into<String>, error: ProviderError) -> Self {
        Self {
            name: name.into(),
            calendar_id: calendar_id.into(),
            error,
        }
    }

    fn error(&self) -> ProviderError {
        self.error.detached().with_calendar(&self.name)
    }
}

impl CalendarProvider for ErrorProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn calendar_id(&self) -> &str {
        &self.calendar_id
    }

    fn list_events(&self, _window: TimeInterval) -> BoxFuture<'_, ProviderResult<Vec<RawEvent>>> {
        let error = self.error();
        Box::pin(async move { Err(error) })
    }

    fn create_event(&self, _event: NewEvent) -> BoxFuture<'_, ProviderResult<RawEvent>> {
        let error = self.error();
        Box::pin(async move { Err(error) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;
    use chrono::{Duration, TimeZone, Utc};

    fn window() -> TimeInterval {
        let start = Utc.with_ymd_and_hms(2025, 2, 5, 9, 0, 0).unwrap();
        TimeInterval::from_duration(start, Duration::hours(8)).unwrap()
    }

    struct ReadOnly;

    impl CalendarProvider for ReadOnly {
        fn name(&self) -> &str {
            "ro@example.com"
        }

        fn calendar_id(&self) -> &str {
            "primary"
        }

        fn list_events(&self, _window: TimeInterval) -> BoxFuture<'_, ProviderResult<Vec<RawEvent>>> {
            Box::pin(async { Ok(Vec::new()) })
        }
    }

    #[test]
    fn new_event_builder() {
        let event = NewEvent::new(window(), "Intro")
            .with_description(Some("hello".to_string()))
            .with_attendees(vec!["a@example.com".to_string()])
            .with_time_zone(chrono_tz::Europe::Paris);

        assert_eq!(event.summary, "Intro");
        assert_eq!(event.description.as_deref(), Some("hello"));
        assert_eq!(event.attendees.len(), 1);
        assert_eq!(event.time_zone, chrono_tz::Europe::Paris);
    }

    #[tokio::test]
    async fn create_event_unsupported_by_default() {
        let err = ReadOnly
            .create_event(NewEvent::new(window(), "x"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::Unsupported);
        assert!(ReadOnly.list_events(window()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn error_provider_returns_error() {
        let provider = ErrorProvider::new(
            "broken@example.com",
            "primary",
            ProviderError::credentials("missing fields: token"),
        );

        assert_eq!(provider.name(), "broken@example.com");
        assert_eq!(provider.calendar_id(), "primary");

        let err = provider.list_events(window()).await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::CredentialError);
        assert_eq!(err.calendar(), Some("broken@example.com"));
        assert!(err.to_string().contains("missing fields: token"));
    }
}
