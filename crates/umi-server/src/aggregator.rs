//! Concurrent collection of busy periods across calendars.
//!
//! Calendars are queried through an ordered buffered stream: at most
//! `concurrency` fetches run at once, each bounded by its own timeout, and the
//! outcomes come back in the order the providers were given. A failing
//! calendar is logged and reported but never aborts the others.

use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use futures_util::{StreamExt, stream};
use tracing::{debug, warn};
use umi_core::{AvailabilityResult, GridError, SlotGrid, TimeInterval, compute_availability, grid_window};
use umi_protocol::{CalendarOutcome, CalendarReport};
use umi_providers::{
    BusyPeriod, CalendarProvider, ProviderError, ProviderResult, RawEvent, normalize_events,
};

use crate::config::ServerConfig;

/// The answer of one calendar.
#[derive(Debug)]
pub struct CalendarFetch {
    /// Provider name, the account email.
    pub email: String,
    /// Raw events, or why they could not be listed.
    pub result: ProviderResult<Vec<RawEvent>>,
}

/// Availability across a set of calendars.
#[derive(Debug)]
pub struct Aggregation {
    /// Free slots and counters.
    pub result: AvailabilityResult,
    /// One line per calendar, in provider order.
    pub calendars: Vec<CalendarReport>,
    /// Busy periods of the calendars that answered.
    pub busy: Vec<BusyPeriod>,
}

/// Fans calendar queries out and folds their answers into availability.
#[derive(Debug, Clone, Copy)]
pub struct Aggregator {
    concurrency: usize,
    timeout: Duration,
    time_zone: Tz,
}

impl Aggregator {
    /// Creates an aggregator.
    pub fn new(concurrency: usize, timeout: Duration, time_zone: Tz) -> Self {
        Self {
            concurrency: concurrency.max(1),
            timeout,
            time_zone,
        }
    }

    /// Creates an aggregator from the server settings.
    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(
            config.fetch_concurrency,
            config.calendar_timeout,
            config.time_zone,
        )
    }

    /// Lists the events of every provider within `window`.
    pub async fn fetch_events(
        &self,
        providers: &[Box<dyn CalendarProvider>],
        window: TimeInterval,
    ) -> Vec<CalendarFetch> {
        // Collected first: a lazy `map` over `&self` makes the caller's future non-Send.
        let fetches: Vec<_> = providers
            .iter()
            .map(|p| self.fetch_one(p.as_ref(), window))
            .collect();
        stream::iter(fetches)
            .buffered(self.concurrency)
            .collect()
            .await
    }

    /// Lists the events of one provider, bounded by the per-calendar timeout.
    pub async fn fetch_one(
        &self,
        provider: &dyn CalendarProvider,
        window: TimeInterval,
    ) -> CalendarFetch {
        let email = provider.name().to_string();
        let result = match tokio::time::timeout(self.timeout, provider.list_events(window)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::timeout(format!(
                "no answer within {}s",
                self.timeout.as_secs_f64()
            ))
            .with_calendar(&email)),
        };
        match &result {
            Ok(events) => debug!(calendar = %email, events = events.len(), "fetched events"),
            Err(e) => warn!(calendar = %email, error = %e, "calendar fetch failed"),
        }
        CalendarFetch { email, result }
    }

    /// Computes the free slots of `grid` given every provider's busy time.
    ///
    /// The fetch window spans the grid's candidate slots. Failed calendars
    /// contribute nothing but are counted in `calendars_processed`.
    pub async fn availability(
        &self,
        grid: &SlotGrid,
        now: DateTime<Utc>,
        providers: &[Box<dyn CalendarProvider>],
    ) -> Result<Aggregation, GridError> {
        let candidates = grid.candidate_slots(now)?;
        let fetches = match grid_window(&candidates) {
            Some(window) => self.fetch_events(providers, window).await,
            None => Vec::new(),
        };

        let mut busy = Vec::new();
        let mut calendars = Vec::with_capacity(fetches.len());
        for fetch in fetches {
            let outcome = match fetch.result {
                Ok(events) => {
                    let periods = normalize_events(&events, self.time_zone);
                    let outcome = CalendarOutcome::Ok {
                        busy_periods: periods.len(),
                    };
                    busy.extend(periods);
                    outcome
                }
                Err(e) => CalendarOutcome::Failed {
                    reason: e.message().to_string(),
                },
            };
            calendars.push(CalendarReport {
                email: fetch.email,
                outcome,
            });
        }

        let intervals: Vec<TimeInterval> = busy.iter().map(|b| b.interval).collect();
        let result = compute_availability(grid, now, &intervals, providers.len())?;
        Ok(Aggregation {
            result,
            calendars,
            busy,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use umi_providers::BoxFuture;

    struct FakeProvider {
        name: &'static str,
        delay: Duration,
        events: Result<Vec<RawEvent>, &'static str>,
    }

    impl FakeProvider {
        fn busy(name: &'static str, events: Vec<RawEvent>) -> Box<dyn CalendarProvider> {
            Box::new(Self {
                name,
                delay: Duration::ZERO,
                events: Ok(events),
            })
        }

        fn failing(name: &'static str) -> Box<dyn CalendarProvider> {
            Box::new(Self {
                name,
                delay: Duration::ZERO,
                events: Err("token revoked"),
            })
        }

        fn slow(name: &'static str, delay: Duration, events: Vec<RawEvent>) -> Box<dyn CalendarProvider> {
            Box::new(Self {
                name,
                delay,
                events: Ok(events),
            })
        }
    }

    impl CalendarProvider for FakeProvider {
        fn name(&self) -> &str {
            self.name
        }

        fn calendar_id(&self) -> &str {
            "primary"
        }

        fn list_events(&self, _window: TimeInterval) -> BoxFuture<'_, ProviderResult<Vec<RawEvent>>> {
            Box::pin(async move {
                if !self.delay.is_zero() {
                    tokio::time::sleep(self.delay).await;
                }
                self.events
                    .clone()
                    .map_err(|m| ProviderError::authentication(m).with_calendar(self.name))
            })
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 5, 8, 30, 0).unwrap()
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 5, h, m, 0).unwrap()
    }

    fn event(id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> RawEvent {
        RawEvent::new(id, start.into(), end.into())
    }

    fn aggregator() -> Aggregator {
        Aggregator::new(4, Duration::from_secs(10), Tz::UTC)
    }

    fn starts(aggregation: &Aggregation) -> Vec<u32> {
        use chrono::Timelike;
        aggregation
            .result
            .available_slots
            .iter()
            .map(|s| s.start().hour())
            .collect()
    }

    #[tokio::test]
    async fn lunch_blocks_two_slots() {
        let providers = vec![FakeProvider::busy(
            "ada@example.com",
            vec![event("lunch", at(13, 0), at(14, 30))],
        )];
        let aggregation = aggregator()
            .availability(&SlotGrid::new(1), now(), &providers)
            .await
            .unwrap();

        assert_eq!(aggregation.result.candidates_generated, 8);
        assert_eq!(aggregation.result.total_slots(), 6);
        assert_eq!(starts(&aggregation), [9, 10, 11, 12, 15, 16]);
        assert_eq!(aggregation.busy.len(), 1);
    }

    #[tokio::test]
    async fn failing_calendar_is_isolated() {
        let providers = vec![
            FakeProvider::failing("a@example.com"),
            FakeProvider::busy("b@example.com", vec![event("1", at(9, 0), at(10, 0))]),
        ];
        let aggregation = aggregator()
            .availability(&SlotGrid::new(1), now(), &providers)
            .await
            .unwrap();

        assert_eq!(aggregation.result.calendars_processed, 2);
        assert_eq!(aggregation.result.total_slots(), 7);
        assert_eq!(
            aggregation.calendars,
            [
                CalendarReport {
                    email: "a@example.com".to_string(),
                    outcome: CalendarOutcome::Failed {
                        reason: "token revoked".to_string()
                    },
                },
                CalendarReport {
                    email: "b@example.com".to_string(),
                    outcome: CalendarOutcome::Ok { busy_periods: 1 },
                },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn outcomes_follow_provider_order() {
        let providers = vec![
            FakeProvider::slow("slow@example.com", Duration::from_secs(3), Vec::new()),
            FakeProvider::slow("fast@example.com", Duration::from_millis(10), Vec::new()),
        ];
        let window = TimeInterval::new(at(9, 0), at(17, 0)).unwrap();
        let fetches = aggregator().fetch_events(&providers, window).await;

        let emails: Vec<_> = fetches.iter().map(|f| f.email.as_str()).collect();
        assert_eq!(emails, ["slow@example.com", "fast@example.com"]);
        assert!(fetches.iter().all(|f| f.result.is_ok()));
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_calendar_times_out() {
        let providers = vec![
            FakeProvider::slow(
                "stuck@example.com",
                Duration::from_secs(60),
                vec![event("all-day", at(9, 0), at(17, 0))],
            ),
            FakeProvider::busy("ok@example.com", Vec::new()),
        ];
        let aggregation = aggregator()
            .availability(&SlotGrid::new(1), now(), &providers)
            .await
            .unwrap();

        assert_eq!(aggregation.result.total_slots(), 8);
        assert!(aggregation.calendars[0].outcome.is_failed());
        assert!(!aggregation.calendars[1].outcome.is_failed());
    }

    #[tokio::test]
    async fn identical_inputs_give_identical_results() {
        let providers = vec![FakeProvider::busy(
            "ada@example.com",
            vec![event("1", at(11, 30), at(12, 0))],
        )];
        let first = aggregator()
            .availability(&SlotGrid::new(3), now(), &providers)
            .await
            .unwrap();
        let second = aggregator()
            .availability(&SlotGrid::new(3), now(), &providers)
            .await
            .unwrap();
        assert_eq!(first.result, second.result);
    }

    #[tokio::test]
    async fn no_calendars_means_everything_free() {
        let aggregation = aggregator()
            .availability(&SlotGrid::new(2), now(), &[])
            .await
            .unwrap();
        assert_eq!(aggregation.result.total_slots(), 16);
        assert_eq!(aggregation.result.calendars_processed, 0);
        assert!(aggregation.calendars.is_empty());
    }

    #[tokio::test]
    async fn availability_runs_on_spawned_task() {
        let providers = vec![
            FakeProvider::busy("ada@example.com", vec![event("lunch", at(13, 0), at(14, 30))]),
            FakeProvider::failing("bob@example.com"),
        ];
        let handle = tokio::spawn(async move {
            let aggregator = aggregator();
            let grid = SlotGrid::new(1);
            aggregator.availability(&grid, now(), &providers).await
        });
        let aggregation = handle.await.unwrap().unwrap();
        assert_eq!(aggregation.result.total_slots(), 6);
        assert_eq!(aggregation.result.calendars_processed, 2);
    }
}
