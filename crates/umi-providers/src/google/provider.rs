//! Google Calendar provider implementation.
//!
//! This module implements the [`CalendarProvider`] trait for one connected
//! Google account.

use tracing::debug;
use umi_core::TimeInterval;

use crate::error::ProviderResult;
use crate::provider::{BoxFuture, CalendarProvider, NewEvent};
use crate::raw_event::RawEvent;

use super::client::GoogleCalendarClient;
use super::config::GoogleConfig;
use super::credentials::GoogleCredentials;

/// Google Calendar provider.
#[derive(Debug)]
pub struct GoogleProvider {
    email: String,
    calendar_id: String,
    client: GoogleCalendarClient,
}

impl GoogleProvider {
    /// Creates a provider for `calendar_id` of the account `email`.
    pub fn new(
        email: impl Into<String>,
        calendar_id: impl Into<String>,
        credentials: GoogleCredentials,
        config: GoogleConfig,
    ) -> ProviderResult<Self> {
        let email = email.into();
        let client = GoogleCalendarClient::new(credentials, config)
            .map_err(|e| e.with_calendar(&email))?;
        Ok(Self {
            email,
            calendar_id: calendar_id.into(),
            client,
        })
    }
}

impl CalendarProvider for GoogleProvider {
    fn name(&self) -> &str {
        &self.email
    }

    fn calendar_id(&self) -> &str {
        &self.calendar_id
    }

    fn list_events(&self, window: TimeInterval) -> BoxFuture<'_, ProviderResult<Vec<RawEvent>>> {
        Box::pin(async move {
            debug!(calendar = %self.email, "listing events");
            self.client
                .list_events(&self.calendar_id, window)
                .await
                .map_err(|e| e.with_calendar(&self.email))
        })
    }

    fn create_event(&self, event: NewEvent) -> BoxFuture<'_, ProviderResult<RawEvent>> {
        Box::pin(async move {
            debug!(calendar = %self.email, summary = %event.summary, "creating event");
            self.client
                .insert_event(&self.calendar_id, &event)
                .await
                .map_err(|e| e.with_calendar(&self.email))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;
    use chrono::{Duration, TimeZone, Utc};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credentials() -> GoogleCredentials {
        GoogleCredentials {
            token: "t".to_string(),
            refresh_token: "r".to_string(),
            token_uri: "http://127.0.0.1:1/token".to_string(),
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            scopes: Vec::new(),
        }
    }

    fn window() -> TimeInterval {
        let start = Utc.with_ymd_and_hms(2025, 2, 5, 9, 0, 0).unwrap();
        TimeInterval::from_duration(start, Duration::hours(8)).unwrap()
    }

    #[test]
    fn invalid_config_names_calendar() {
        let config = GoogleConfig::default().with_api_base("nope");
        let err = GoogleProvider::new("ada@example.com", "primary", credentials(), config)
            .unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ConfigurationError);
        assert_eq!(err.calendar(), Some("ada@example.com"));
    }

    #[tokio::test]
    async fn errors_carry_calendar_identity() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendars/primary/events"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let config = GoogleConfig::default().with_api_base(server.uri());
        let provider =
            GoogleProvider::new("ada@example.com", "primary", credentials(), config)
                .unwrap();
        assert_eq!(provider.name(), "ada@example.com");

        let err = provider.list_events(window()).await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ServerError);
        assert!(err.to_string().starts_with("[ada@example.com]"));
    }
}
