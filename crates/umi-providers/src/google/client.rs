//! Google Calendar API client.
//!
//! Low-level HTTP access to the events collection of one account: listing
//! with pagination and event creation. The stored access token is sent as
//! is; a rejected token fails the request as an authentication error.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use umi_core::TimeInterval;

use crate::error::{ProviderError, ProviderResult};
use crate::provider::NewEvent;
use crate::raw_event::{RawEvent, RawEventTime};

use super::config::GoogleConfig;
use super::credentials::GoogleCredentials;

/// Google Calendar API client for one account.
pub struct GoogleCalendarClient {
    http_client: reqwest::Client,
    config: GoogleConfig,
    access_token: String,
}

impl std::fmt::Debug for GoogleCalendarClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleCalendarClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl GoogleCalendarClient {
    /// Creates a client authenticated with `credentials`.
    pub fn new(credentials: GoogleCredentials, config: GoogleConfig) -> ProviderResult<Self> {
        config.validate()?;
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| {
                ProviderError::configuration(format!("failed to create HTTP client: {}", e))
                    .with_source(e)
            })?;

        Ok(Self {
            http_client,
            access_token: credentials.token,
            config,
        })
    }

    /// Lists the events of `calendar_id` overlapping `window`.
    ///
    /// Recurring events are expanded server-side; cancelled ones are dropped.
    pub async fn list_events(
        &self,
        calendar_id: &str,
        window: TimeInterval,
    ) -> ProviderResult<Vec<RawEvent>> {
        let mut all_events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .list_events_page(calendar_id, window, page_token.as_deref())
                .await?;

            all_events.extend(page.items.into_iter().filter_map(convert_event));

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(calendar = calendar_id, "fetched {} events", all_events.len());
        Ok(all_events)
    }

    async fn list_events_page(
        &self,
        calendar_id: &str,
        window: TimeInterval,
        page_token: Option<&str>,
    ) -> ProviderResult<EventListResponse> {
        let url = self.config.events_url(calendar_id);

        let response = self
            .send(|token| {
                let mut request = self.http_client.get(&url).bearer_auth(token).query(&[
                    ("timeMin", window.start().to_rfc3339()),
                    ("timeMax", window.end().to_rfc3339()),
                    ("singleEvents", "true".to_string()),
                    ("orderBy", "startTime".to_string()),
                ]);
                if let Some(page_token) = page_token {
                    request = request.query(&[("pageToken", page_token)]);
                }
                request
            })
            .await?;

        parse_body(check_status(response).await?).await
    }

    /// Creates an event and notifies its attendees.
    pub async fn insert_event(&self, calendar_id: &str, event: &NewEvent) -> ProviderResult<RawEvent> {
        let url = self.config.events_url(calendar_id);
        let body = ApiEventBody::from(event);

        let response = self
            .send(|token| {
                self.http_client
                    .post(&url)
                    .bearer_auth(token)
                    .query(&[("sendUpdates", "all")])
                    .json(&body)
            })
            .await?;

        let created: ApiEvent = parse_body(check_status(response).await?).await?;
        convert_event(created)
            .ok_or_else(|| ProviderError::invalid_response("created event has no id or times"))
    }

    /// Sends a request authenticated with the stored access token.
    async fn send<F>(&self, build: F) -> ProviderResult<reqwest::Response>
    where
        F: FnOnce(&str) -> reqwest::RequestBuilder,
    {
        build(&self.access_token).send().await.map_err(request_error)
    }
}

fn request_error(e: reqwest::Error) -> ProviderError {
    let error = if e.is_timeout() {
        ProviderError::timeout("request timeout")
    } else if e.is_connect() {
        ProviderError::network(format!("connection failed: {}", e))
    } else {
        ProviderError::network(format!("request failed: {}", e))
    };
    error.with_source(e)
}

async fn check_status(response: reqwest::Response) -> ProviderResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());
        return Err(ProviderError::rate_limited(format!(
            "rate limit exceeded{}",
            retry_after
                .map(|s| format!(", retry after {} seconds", s))
                .unwrap_or_default()
        )));
    }

    let body = response.text().await.unwrap_or_default();
    Err(match status {
        reqwest::StatusCode::UNAUTHORIZED => {
            ProviderError::authentication("access token expired or invalid")
        }
        reqwest::StatusCode::FORBIDDEN => ProviderError::authorization("access denied to calendar"),
        reqwest::StatusCode::NOT_FOUND => ProviderError::not_found("calendar not found"),
        reqwest::StatusCode::BAD_REQUEST => {
            ProviderError::bad_request(format!("API rejected request: {}", body))
        }
        _ => ProviderError::server(format!("API error ({}): {}", status, body)),
    })
}

async fn parse_body<T: for<'de> Deserialize<'de>>(response: reqwest::Response) -> ProviderResult<T> {
    let body = response
        .text()
        .await
        .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;
    serde_json::from_str(&body).map_err(|e| {
        ProviderError::invalid_response(format!("failed to parse response: {}", e)).with_source(e)
    })
}

/// Converts a Google Calendar API event to a RawEvent.
fn convert_event(event: ApiEvent) -> Option<RawEvent> {
    if event.status.as_deref() == Some("cancelled") {
        return None;
    }

    let id = event.id?;
    let Some(start) = event.start.parse() else {
        warn!(event = %id, "event has no usable start time");
        return None;
    };
    let Some(end) = event.end.parse() else {
        warn!(event = %id, "event has no usable end time");
        return None;
    };

    let mut raw_event = RawEvent::new(id, start, end);
    raw_event.summary = event.summary;
    raw_event.status = event.status;
    raw_event.html_link = event.html_link;
    Some(raw_event)
}

/// Response from the events.list endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    #[serde(default)]
    items: Vec<ApiEvent>,
    next_page_token: Option<String>,
}

/// A single event from the Google Calendar API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEvent {
    id: Option<String>,
    summary: Option<String>,
    #[serde(default)]
    start: ApiEventTime,
    #[serde(default)]
    end: ApiEventTime,
    html_link: Option<String>,
    status: Option<String>,
}

/// Event time from the API.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiEventTime {
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    time_zone: Option<String>,
}

impl ApiEventTime {
    fn parse(&self) -> Option<RawEventTime> {
        self.date_time
            .as_deref()
            .or(self.date.as_deref())
            .and_then(RawEventTime::parse)
    }
}

#[derive(Debug, Serialize)]
struct ApiAttendee {
    email: String,
}

/// Request body of events.insert.
#[derive(Debug, Serialize)]
struct ApiEventBody {
    summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    start: ApiEventTime,
    end: ApiEventTime,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attendees: Vec<ApiAttendee>,
}

impl From<&NewEvent> for ApiEventBody {
    fn from(event: &NewEvent) -> Self {
        let tz = event.time_zone;
        let at = |instant: chrono::DateTime<chrono::Utc>| ApiEventTime {
            date: None,
            date_time: Some(instant.with_timezone(&tz).to_rfc3339()),
            time_zone: Some(tz.name().to_string()),
        };
        Self {
            summary: event.summary.clone(),
            description: event.description.clone(),
            start: at(event.interval.start()),
            end: at(event.interval.end()),
            attendees: event
                .attendees
                .iter()
                .map(|email| ApiAttendee {
                    email: email.clone(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;
    use chrono::{Duration, TimeZone, Utc};
    use wiremock::matchers::{body_partial_json, header, method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credentials(server: &MockServer) -> GoogleCredentials {
        GoogleCredentials {
            token: "old".to_string(),
            refresh_token: "refresh".to_string(),
            token_uri: format!("{}/token", server.uri()),
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            scopes: vec!["https://www.googleapis.com/auth/calendar".to_string()],
        }
    }

    fn client(server: &MockServer) -> GoogleCalendarClient {
        let config = GoogleConfig::default().with_api_base(server.uri());
        GoogleCalendarClient::new(credentials(server), config).unwrap()
    }

    fn window() -> TimeInterval {
        let start = Utc.with_ymd_and_hms(2025, 2, 5, 9, 0, 0).unwrap();
        TimeInterval::from_duration(start, Duration::days(1)).unwrap()
    }

    fn event_json(id: &str, start: &str, end: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "summary": format!("Event {id}"),
            "start": { "dateTime": start },
            "end": { "dateTime": end },
            "status": "confirmed"
        })
    }

    #[test]
    fn debug_hides_access_token() {
        let config = GoogleConfig::default();
        let credentials = GoogleCredentials {
            token: "ya29.secret".to_string(),
            refresh_token: "refresh".to_string(),
            token_uri: "https://oauth2.googleapis.com/token".to_string(),
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            scopes: Vec::new(),
        };
        let client = GoogleCalendarClient::new(credentials, config).unwrap();
        assert!(!format!("{client:?}").contains("ya29"));
    }

    #[test]
    fn parse_all_day_event() {
        let json = r#"{
            "id": "event1",
            "summary": "All Day Event",
            "start": { "date": "2024-03-15" },
            "end": { "date": "2024-03-16" }
        }"#;

        let event: ApiEvent = serde_json::from_str(json).unwrap();
        let raw = convert_event(event).unwrap();
        assert!(raw.is_all_day());
    }

    #[test]
    fn event_without_times_is_dropped() {
        let event: ApiEvent = serde_json::from_str(r#"{"id": "e", "start": {}}"#).unwrap();
        assert!(convert_event(event).is_none());
    }

    #[test]
    fn insert_body_uses_zone() {
        let start = Utc.with_ymd_and_hms(2025, 2, 5, 15, 0, 0).unwrap();
        let interval = TimeInterval::from_duration(start, Duration::minutes(30)).unwrap();
        let event = NewEvent::new(interval, "Intro")
            .with_attendees(vec!["a@example.com".to_string()])
            .with_time_zone(chrono_tz::America::New_York);

        let body = serde_json::to_value(ApiEventBody::from(&event)).unwrap();
        assert_eq!(body["start"]["dateTime"], "2025-02-05T10:00:00-05:00");
        assert_eq!(body["end"]["timeZone"], "America/New_York");
        assert_eq!(body["attendees"][0]["email"], "a@example.com");
        assert!(body.get("description").is_none());
    }

    #[tokio::test]
    async fn follows_pagination_and_skips_cancelled() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/calendars/primary/events"))
            .and(query_param("singleEvents", "true"))
            .and(query_param("orderBy", "startTime"))
            .and(query_param_is_missing("pageToken"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [
                    event_json("a", "2025-02-05T10:00:00Z", "2025-02-05T11:00:00Z"),
                    {
                        "id": "gone",
                        "status": "cancelled",
                        "start": { "dateTime": "2025-02-05T12:00:00Z" },
                        "end": { "dateTime": "2025-02-05T13:00:00Z" }
                    }
                ],
                "nextPageToken": "p2"
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/calendars/primary/events"))
            .and(query_param("pageToken", "p2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [event_json("b", "2025-02-05T14:00:00Z", "2025-02-05T15:00:00Z")]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let events = client(&server).list_events("primary", window()).await.unwrap();
        let ids: Vec<_> = events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(events[0].summary.as_deref(), Some("Event a"));
    }

    #[tokio::test]
    async fn rejected_token_is_authentication_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/calendars/primary/events"))
            .and(header("authorization", "Bearer old"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        // The token endpoint is never consulted.
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = client(&server).list_events("primary", window()).await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::AuthenticationFailed);
        assert_eq!(err.message(), "access token expired or invalid");
    }

    #[tokio::test]
    async fn maps_error_statuses() {
        let cases = [
            (403, ProviderErrorCode::AuthorizationFailed),
            (404, ProviderErrorCode::NotFound),
            (429, ProviderErrorCode::RateLimited),
            (500, ProviderErrorCode::ServerError),
        ];
        for (status, code) in cases {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(status))
                .mount(&server)
                .await;

            let err = client(&server).list_events("primary", window()).await.unwrap_err();
            assert_eq!(err.code(), code, "status {status}");
        }
    }

    #[tokio::test]
    async fn malformed_body_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = client(&server).list_events("primary", window()).await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::InvalidResponse);
    }

    #[tokio::test]
    async fn inserts_event_and_notifies_attendees() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/calendars/primary/events"))
            .and(query_param("sendUpdates", "all"))
            .and(body_partial_json(serde_json::json!({
                "summary": "Intro",
                "start": { "dateTime": "2025-02-05T10:00:00+00:00" },
                "attendees": [{ "email": "guest@example.com" }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "created-1",
                "summary": "Intro",
                "start": { "dateTime": "2025-02-05T10:00:00Z" },
                "end": { "dateTime": "2025-02-05T11:00:00Z" },
                "htmlLink": "https://calendar.google.com/event?eid=1",
                "status": "confirmed"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let start = Utc.with_ymd_and_hms(2025, 2, 5, 10, 0, 0).unwrap();
        let event = NewEvent::new(TimeInterval::from_duration(start, Duration::hours(1)).unwrap(), "Intro")
            .with_attendees(vec!["guest@example.com".to_string()]);

        let created = client(&server).insert_event("primary", &event).await.unwrap();
        assert_eq!(created.id, "created-1");
        assert_eq!(
            created.html_link.as_deref(),
            Some("https://calendar.google.com/event?eid=1")
        );
    }
}
