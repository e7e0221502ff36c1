//! RawEvent to busy period conversion.
//!
//! Each provider event becomes a [`BusyPeriod`]: its two times resolved to
//! UTC (wall-clock values read in the configured time zone) and checked to
//! form a non-empty interval. Cancelled events never block time.

use chrono_tz::Tz;
use tracing::warn;
use umi_core::TimeInterval;

use crate::raw_event::RawEvent;

/// A resolved event that blocks time on a calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusyPeriod {
    /// Provider event id.
    pub id: String,
    /// Event title, `Busy` when untitled.
    pub summary: String,
    /// The blocked range.
    pub interval: TimeInterval,
    /// Whether it came from an all-day event.
    pub all_day: bool,
}

/// Converts a [`RawEvent`] to a [`BusyPeriod`].
///
/// Returns `None` for cancelled events and for events whose times do not
/// resolve to a non-empty interval.
pub fn normalize_event(raw: &RawEvent, tz: Tz) -> Option<BusyPeriod> {
    if raw.is_cancelled() {
        return None;
    }

    let (Some(start), Some(end)) = (raw.start.resolve(tz), raw.end.resolve(tz)) else {
        warn!(event = %raw.id, "event time does not exist in {}", tz.name());
        return None;
    };

    let interval = TimeInterval::new(start, end)
        .map_err(|e| warn!(event = %raw.id, error = %e, "skipping event"))
        .ok()?;

    Some(BusyPeriod {
        id: raw.id.clone(),
        summary: raw.effective_title().to_string(),
        interval,
        all_day: raw.is_all_day(),
    })
}

/// Converts a batch of raw events, dropping the ones that do not block time.
pub fn normalize_events(raw_events: &[RawEvent], tz: Tz) -> Vec<BusyPeriod> {
    raw_events
        .iter()
        .filter_map(|raw| normalize_event(raw, tz))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw_event::RawEventTime;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 5, h, m, 0).unwrap()
    }

    fn sample_raw_event() -> RawEvent {
        RawEvent::new("evt-123", at(13, 0).into(), at(14, 30).into()).with_summary("Lunch")
    }

    #[test]
    fn normalizes_timed_event() {
        let busy = normalize_event(&sample_raw_event(), Tz::UTC).unwrap();
        assert_eq!(busy.id, "evt-123");
        assert_eq!(busy.summary, "Lunch");
        assert_eq!(busy.interval.start(), at(13, 0));
        assert_eq!(busy.interval.duration_minutes(), 90);
        assert!(!busy.all_day);
    }

    #[test]
    fn all_day_event_spans_local_day() {
        let raw = RawEvent::new(
            "evt-day",
            RawEventTime::parse("2025-02-05").unwrap(),
            RawEventTime::parse("2025-02-06").unwrap(),
        );
        let busy = normalize_event(&raw, chrono_tz::America::New_York).unwrap();
        assert!(busy.all_day);
        assert_eq!(busy.summary, "Busy");
        assert_eq!(busy.interval.start(), at(5, 0));
        assert_eq!(busy.interval.duration_minutes(), 24 * 60);
    }

    #[test]
    fn skips_inverted_event() {
        let raw = RawEvent::new("evt-bad", at(14, 0).into(), at(13, 0).into());
        assert_eq!(normalize_event(&raw, Tz::UTC), None);
    }

    #[test]
    fn filters_cancelled_events() {
        let events = vec![
            sample_raw_event(),
            RawEvent::new("evt-cancelled", at(9, 0).into(), at(10, 0).into())
                .with_status("cancelled"),
        ];

        let normalized = normalize_events(&events, Tz::UTC);

        assert_eq!(normalized.len(), 1);
        assert_eq!(normalized[0].id, "evt-123");
    }
}
