//! HTTP routes.
//!
//! Every route shares one [`AppState`]. Handlers stay thin: they validate
//! the request, pick calendars from the store, ask the [`Aggregator`] or a
//! provider, and shape the answer with the `umi-protocol` bodies.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router, middleware};
use chrono::{DateTime, Utc};
use tracing::info;
use umi_core::{TimeInterval, compute_availability, grid_window};
use umi_protocol::{
    AvailabilityQuery, AvailabilityResponse, BookMeetingRequest, BookMeetingResponse, BusyEvent,
    CalendarAvailabilityResponse, CalendarEvents, CreatedEvent, EventSummary, EventsResponse,
    HealthResponse, MessageResponse, SetPrimaryRequest, SlotBody, VersionResponse,
    format_instant,
};
use umi_providers::{CalendarProvider, CredentialCipher, NewEvent, RawEvent, normalize_events};

use crate::aggregator::Aggregator;
use crate::config::ServerConfig;
use crate::error::{ApiError, ServerError, ServerResult};
use crate::factory::{GoogleFactory, ProviderFactory};
use crate::middleware::{require_admin_key, require_api_key, trace_request};
use crate::store::{CredentialStore, StoredCalendar};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Source of the current time.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// State shared by every request.
#[derive(Clone)]
pub struct AppState {
    /// Runtime configuration.
    pub config: Arc<ServerConfig>,
    /// Connected calendars.
    pub store: Arc<CredentialStore>,
    /// Opens providers for stored calendars.
    pub factory: Arc<dyn ProviderFactory>,
    clock: Clock,
}

impl AppState {
    /// Creates the state from its parts.
    pub fn new(
        config: ServerConfig,
        store: Arc<CredentialStore>,
        factory: Arc<dyn ProviderFactory>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            factory,
            clock: Arc::new(Utc::now),
        }
    }

    /// Opens the store and builds the Google factory described by `config`.
    pub async fn open(config: ServerConfig) -> ServerResult<Self> {
        config.validate()?;
        let cipher = CredentialCipher::from_base64_key(&config.encryption_key)
            .map_err(|e| ServerError::config(format!("encryption_key: {e}")))?;
        let store = CredentialStore::open(&config.store_path).await?;
        let factory = GoogleFactory::new(cipher, config.google.clone());
        Ok(Self::new(config, Arc::new(store), Arc::new(factory)))
    }

    /// Builder: replace the clock.
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// The current time.
    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    fn aggregator(&self) -> Aggregator {
        Aggregator::from_config(&self.config)
    }

    fn connect_all(&self, calendars: &[StoredCalendar]) -> Vec<Box<dyn CalendarProvider>> {
        calendars.iter().map(|c| self.factory.connect(c)).collect()
    }

    fn unexpected(&self, message: &str, cause: impl std::fmt::Display) -> ApiError {
        ApiError::unexpected(message, cause, self.config.debug)
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("store", &self.store.path())
            .finish_non_exhaustive()
    }
}

/// Builds the router.
pub fn router(state: AppState) -> Router {
    let calendar = Router::new()
        .route("/all-availability", get(all_availability))
        .route("/availability", get(calendar_availability))
        .route("/set-primary", post(set_primary))
        .route("/book", post(book_meeting))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key));

    let admin = Router::new()
        .route("/events", get(list_events))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin_key));

    Router::new()
        .route("/", get(welcome))
        .route("/api/health/", get(health))
        .route("/api/version", get(version))
        .nest("/api/calendar", calendar.merge(admin))
        .layer(middleware::from_fn(trace_request))
        .with_state(state)
}

async fn welcome() -> Json<MessageResponse> {
    Json(MessageResponse::new(format!("welcome to UMI-OS v{VERSION}")))
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        version: VERSION.to_string(),
    })
}

fn query_of(query: Result<Query<AvailabilityQuery>, QueryRejection>) -> Result<AvailabilityQuery, ApiError> {
    query
        .map(|Query(q)| q)
        .map_err(|e| ApiError::MalformedBody(e.body_text()))
}

fn body_of<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(b)| b)
        .map_err(|e| ApiError::MalformedBody(e.body_text()))
}

async fn all_availability(
    State(state): State<AppState>,
    query: Result<Query<AvailabilityQuery>, QueryRejection>,
) -> Result<Json<AvailabilityResponse>, ApiError> {
    let query = query_of(query)?;
    let days = query.days_or(state.config.default_days)?;

    let calendars = state.store.list().await;
    let providers = state.connect_all(&calendars);
    let grid = state.config.grid(days);
    let aggregation = state
        .aggregator()
        .availability(&grid, state.now(), &providers)
        .await
        .map_err(|e| state.unexpected("Failed to compute availability", e))?;

    info!(
        days,
        calendars = aggregation.result.calendars_processed,
        slots = aggregation.result.total_slots(),
        "computed availability"
    );
    Ok(Json(AvailabilityResponse::new(
        &aggregation.result,
        state.config.time_zone,
        aggregation.calendars,
    )))
}

async fn calendar_availability(
    State(state): State<AppState>,
    query: Result<Query<AvailabilityQuery>, QueryRejection>,
) -> Result<Json<CalendarAvailabilityResponse>, ApiError> {
    let query = query_of(query)?;
    let days = query.days_or(state.config.default_days)?;
    let user = query.user.as_deref();

    let calendar = match query.email.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
        Some(email) => state.store.lookup(user, email).await?,
        None => state
            .store
            .primary(user)
            .await
            .ok_or_else(|| ServerError::calendar_not_found("primary"))?,
    };

    let tz = state.config.time_zone;
    let now = state.now();
    let grid = state.config.grid(days);
    let candidates = grid
        .candidate_slots(now)
        .map_err(|e| state.unexpected("Failed to compute availability", e))?;

    let busy = match grid_window(&candidates) {
        Some(window) => {
            let provider = state.factory.connect(&calendar);
            let fetch = state.aggregator().fetch_one(provider.as_ref(), window).await;
            let events = fetch
                .result
                .map_err(|e| state.unexpected("Failed to fetch calendar events", e))?;
            normalize_events(&events, tz)
        }
        None => Vec::new(),
    };

    let intervals: Vec<TimeInterval> = busy.iter().map(|b| b.interval).collect();
    let result = compute_availability(&grid, now, &intervals, 1)
        .map_err(|e| state.unexpected("Failed to compute availability", e))?;

    Ok(Json(CalendarAvailabilityResponse {
        email: calendar.email,
        is_primary: calendar.is_primary,
        calendar_id: calendar.calendar_id,
        events: busy
            .into_iter()
            .map(|b| BusyEvent {
                id: b.id,
                summary: b.summary,
                start: format_instant(b.interval.start(), tz),
                end: format_instant(b.interval.end(), tz),
            })
            .collect(),
        available_slots: result
            .available_slots
            .iter()
            .map(|slot| SlotBody::from_slot(slot, tz))
            .collect(),
        total_slots: result.total_slots(),
        time_zone: result.time_zone.to_string(),
    }))
}

async fn set_primary(
    State(state): State<AppState>,
    body: Result<Json<SetPrimaryRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let body = body_of(body)?;
    let email = body.email()?;
    let calendar = state.store.set_primary(body.user.as_deref(), email).await?;
    Ok(Json(
        MessageResponse::new(format!("Calendar {} set as primary", calendar.email))
            .with_email(calendar.email),
    ))
}

async fn book_meeting(
    State(state): State<AppState>,
    body: Result<Json<BookMeetingRequest>, JsonRejection>,
) -> Result<Json<BookMeetingResponse>, ApiError> {
    let tz = state.config.time_zone;
    let booking = body_of(body)?.validate(state.now(), tz)?;

    let calendar = state
        .store
        .primary(None)
        .await
        .ok_or_else(|| ApiError::NotFound("No primary calendar set in the system".to_string()))?;

    let duration_minutes = booking.duration_minutes();
    let event = NewEvent::new(booking.interval, booking.summary)
        .with_description(booking.description)
        .with_attendees(booking.attendees)
        .with_time_zone(tz);

    let provider = state.factory.connect(&calendar);
    let created = provider
        .create_event(event)
        .await
        .map_err(|e| state.unexpected("Failed to create event", e))?;

    info!(calendar = %calendar.email, event = %created.id, "booked meeting");
    Ok(Json(BookMeetingResponse {
        message: "Event created successfully".to_string(),
        event: created_event(&created, tz),
        calendar_email: calendar.email,
        duration_minutes,
    }))
}

fn created_event(raw: &RawEvent, tz: chrono_tz::Tz) -> CreatedEvent {
    CreatedEvent {
        id: raw.id.clone(),
        summary: raw.effective_title().to_string(),
        start: raw.start.display_in(tz),
        end: raw.end.display_in(tz),
        html_link: raw.html_link.clone(),
    }
}

fn event_summary(raw: &RawEvent, tz: chrono_tz::Tz) -> EventSummary {
    EventSummary {
        id: raw.id.clone(),
        summary: raw.effective_title().to_string(),
        start: raw.start.display_in(tz),
        end: raw.end.display_in(tz),
        status: raw.status.clone(),
        html_link: raw.html_link.clone(),
    }
}

async fn list_events(
    State(state): State<AppState>,
    query: Result<Query<AvailabilityQuery>, QueryRejection>,
) -> Result<Json<EventsResponse>, ApiError> {
    let query = query_of(query)?;
    let days = query.days_or(state.config.default_days)?;
    let tz = state.config.time_zone;

    let window = TimeInterval::from_duration(state.now(), chrono::Duration::days(i64::from(days)))
        .map_err(|e| state.unexpected("Failed to list events", e))?;

    let calendars = state.store.list().await;
    let providers = state.connect_all(&calendars);
    let fetches = state.aggregator().fetch_events(&providers, window).await;

    let listed = calendars
        .into_iter()
        .zip(fetches)
        .map(|(calendar, fetch)| {
            let (events, error) = match fetch.result {
                Ok(events) => (
                    Some(events.iter().map(|e| event_summary(e, tz)).collect()),
                    None,
                ),
                Err(e) => (None, Some(format!("Failed to process calendar: {}", e.message()))),
            };
            CalendarEvents {
                email: calendar.email,
                is_primary: calendar.is_primary,
                calendar_id: calendar.calendar_id,
                user: calendar.user,
                events,
                error,
            }
        })
        .collect::<Vec<_>>();

    Ok(Json(EventsResponse {
        calendars_found: listed.len(),
        calendars: listed,
    }))
}
